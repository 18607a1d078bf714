use crate::{config::SubgraphConfig, errors::FetchError};
use anyhow::{Context, Result};
use reqwest::{
    Client,
    header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue, USER_AGENT},
};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};
use utils::errors::HTTP_CLIENT_BUILD_FAILED;

pub mod models;
pub mod query;

use models::{GraphqlResponse, ProposalsData, SubgraphProposal};
use query::{INTROSPECTED_TYPES, IntrospectionData, ProposalQuery, SchemaInfo, introspection_query};

/// Client for the Aave Governance V3 subgraph behind The Graph gateway.
pub struct SubgraphClient {
    client: Client,
    endpoint: String,
    timeout: Duration,
    query: ProposalQuery,
}

impl SubgraphClient {
    pub fn new(config: &SubgraphConfig) -> Result<Self> {
        let timeout = Duration::from_secs(config.timeout_secs);

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(USER_AGENT, HeaderValue::from_static("aave-proposal/0.1"));
        if let Some(api_key) = &config.api_key {
            let value = HeaderValue::from_str(&format!("Bearer {api_key}"))
                .context("GRAPH_API_KEY contains invalid header characters")?;
            headers.insert(AUTHORIZATION, value);
        }

        let client = Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()
            .context(HTTP_CLIENT_BUILD_FAILED)?;

        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            timeout,
            query: ProposalQuery::default(),
        })
    }

    pub fn set_query(&mut self, query: ProposalQuery) {
        self.query = query;
    }

    /// Fetches the single proposal matching `proposal_id`.
    #[instrument(name = "fetch_proposal", skip(self))]
    pub async fn fetch_proposal(&self, proposal_id: &str) -> Result<SubgraphProposal, FetchError> {
        let query = self.query.build(proposal_id);
        debug!(query = %query, "Querying subgraph");

        let data: ProposalsData = self.execute(&query).await?;

        let proposal = data
            .proposals
            .into_iter()
            .next()
            .ok_or_else(|| FetchError::NotFound(proposal_id.to_string()))?;

        info!(proposal_id = %proposal.proposal_id, state = ?proposal.state, "Fetched proposal from subgraph");
        Ok(proposal)
    }

    /// Looks up the optional proposal types one by one. Failures only mark a type as unknown.
    #[instrument(name = "introspect_schema", skip(self))]
    pub async fn introspect(&self) -> SchemaInfo {
        let mut schema = SchemaInfo::default();

        for type_name in INTROSPECTED_TYPES {
            let info = match self
                .execute::<IntrospectionData>(&introspection_query(type_name))
                .await
            {
                Ok(data) => data.type_info,
                Err(e) => {
                    warn!(type_name, error = %e, "Introspection failed");
                    None
                }
            };
            schema.types.push((type_name.to_string(), info));
        }

        schema
    }

    async fn execute<T>(&self, query: &str) -> Result<T, FetchError>
    where
        T: DeserializeOwned,
    {
        let response = self
            .client
            .post(&self.endpoint)
            .json(&serde_json::json!({ "query": query }))
            .send()
            .await
            .map_err(|e| FetchError::from_reqwest(e, self.timeout))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| FetchError::from_reqwest(e, self.timeout))?;

        if !status.is_success() {
            return Err(FetchError::Transport(format!("HTTP {status}: {body}")));
        }

        let envelope: GraphqlResponse<T> =
            serde_json::from_str(&body).map_err(|e| FetchError::Decode(e.to_string()))?;

        if let Some(errors) = envelope.errors.filter(|errors| !errors.is_empty()) {
            return Err(FetchError::Query(
                errors.into_iter().map(|e| e.message).collect(),
            ));
        }

        envelope
            .data
            .ok_or_else(|| FetchError::Decode("response has neither data nor errors".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::{Matcher, Server};

    fn client_for(url: String) -> SubgraphClient {
        SubgraphClient::new(&SubgraphConfig {
            endpoint: url,
            api_key: Some("test-key".to_string()),
            timeout_secs: 5,
        })
        .unwrap()
    }

    #[tokio::test]
    async fn test_fetch_proposal() {
        let mut server = Server::new_async().await;
        let api = client_for(server.url());

        let mock = server
            .mock("POST", "/")
            .match_header("authorization", "Bearer test-key")
            .match_body(Matcher::Regex("proposalId".to_string()))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"
                {
                    "data": {
                        "proposals": [
                            {
                                "proposalId": "411",
                                "state": 2,
                                "creator": "0xcreator",
                                "ipfsHash": "0xabc",
                                "votingDuration": "604800",
                                "proposalMetadata": { "title": "Test", "rawContent": "body" },
                                "votes": { "forVotes": "15000000000000000000", "againstVotes": "0" }
                            }
                        ]
                    }
                }
            "#,
            )
            .create_async()
            .await;

        let proposal = api.fetch_proposal("411").await.unwrap();

        assert_eq!(proposal.proposal_id, "411");
        assert_eq!(proposal.title(), Some("Test"));
        assert_eq!(proposal.voting_duration, Some(604800));

        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_empty_result_is_not_found() {
        let mut server = Server::new_async().await;
        let api = client_for(server.url());

        let _mock = server
            .mock("POST", "/")
            .with_status(200)
            .with_body(r#"{ "data": { "proposals": [] } }"#)
            .create_async()
            .await;

        let err = api.fetch_proposal("999").await.unwrap_err();
        assert!(matches!(err, FetchError::NotFound(id) if id == "999"));
    }

    #[tokio::test]
    async fn test_graphql_errors_are_reported() {
        let mut server = Server::new_async().await;
        let api = client_for(server.url());

        let _mock = server
            .mock("POST", "/")
            .with_status(200)
            .with_body(
                r#"{ "errors": [ { "message": "Type `Proposal` has no field `foo`" }, { "message": "second" } ] }"#,
            )
            .create_async()
            .await;

        let err = api.fetch_proposal("1").await.unwrap_err();
        match err {
            FetchError::Query(messages) => {
                assert_eq!(messages.len(), 2);
                assert!(messages[0].contains("no field"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_http_failure_is_transport_error() {
        let mut server = Server::new_async().await;
        let api = client_for(server.url());

        let _mock = server
            .mock("POST", "/")
            .with_status(502)
            .with_body("bad gateway")
            .create_async()
            .await;

        let err = api.fetch_proposal("1").await.unwrap_err();
        assert!(matches!(err, FetchError::Transport(msg) if msg.contains("502")));
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_transport_error() {
        let api = client_for("http://127.0.0.1:1".to_string());
        let err = api.fetch_proposal("1").await.unwrap_err();
        assert!(matches!(err, FetchError::Transport(_) | FetchError::Timeout(_)));
    }

    #[tokio::test]
    async fn test_introspect_tolerates_failures() {
        let mut server = Server::new_async().await;
        let api = client_for(server.url());

        let _transactions = server
            .mock("POST", "/")
            .match_body(Matcher::Regex("IntrospectProposalTransactions".to_string()))
            .with_status(200)
            .with_body(
                r#"{ "data": { "__type": { "name": "ProposalTransactions", "kind": "OBJECT", "fields": [
                    { "name": "active", "description": null, "type": { "name": "TransactionData", "kind": "OBJECT", "ofType": null } }
                ] } } }"#,
            )
            .create_async()
            .await;

        let mut failing = Vec::new();
        for pattern in [
            r"IntrospectProposal \{",
            "IntrospectProposalMetadata",
            "IntrospectProposalVotes",
            "IntrospectVotingConfig",
        ] {
            failing.push(
                server
                    .mock("POST", "/")
                    .match_body(Matcher::Regex(pattern.to_string()))
                    .with_status(500)
                    .create_async()
                    .await,
            );
        }

        let schema = api.introspect().await;

        assert_eq!(schema.types.len(), INTROSPECTED_TYPES.len());
        assert!(schema.get("Proposal").is_none());
        assert!(schema.get("ProposalTransactions").is_some());

        let query = schema.proposal_query();
        assert!(query.include_transactions);
        assert!(query.voting_config_fields.is_none());
    }
}
