use anyhow::Result;
use chrono::{DateTime, Utc};
use std::time::Duration;
use tracing::{info, instrument};

pub mod config;
pub mod discussion;
pub mod errors;
pub mod input;
pub mod metadata;
pub mod onchain;
pub mod report;
pub mod subgraph;
pub mod timing;

use config::AppConfig;
use discussion::{DiscussionExtractor, ExtractionInput};
use errors::AppError;
use metadata::{MetadataClient, metadata_title};
use onchain::{AlloyProposalReader, ProposalReader};
use report::ProposalReport;
use subgraph::{SubgraphClient, query::SchemaInfo};
use timing::{ResolveContext, TimingResolver};

/// Runs one lookup end to end: normalize, query the subgraph, enrich from IPFS, resolve timing, find the forum thread.
pub struct ProposalFetcher {
    subgraph: SubgraphClient,
    metadata: MetadataClient,
    resolver: TimingResolver,
    discussion: DiscussionExtractor,
}

impl ProposalFetcher {
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let readers = AlloyProposalReader::for_chains(&config.onchain.chains)?;
        Ok(Self::new(
            SubgraphClient::new(&config.subgraph)?,
            MetadataClient::new(&config.ipfs)?,
            readers,
            Duration::from_secs(config.onchain.timeout_secs),
        ))
    }

    pub fn new(
        subgraph: SubgraphClient,
        metadata: MetadataClient,
        readers: Vec<Box<dyn ProposalReader>>,
        chain_timeout: Duration,
    ) -> Self {
        Self {
            subgraph,
            metadata,
            resolver: TimingResolver::with_default_sources(readers, chain_timeout),
            discussion: DiscussionExtractor::default(),
        }
    }

    /// Checks the input, then shapes the subgraph query after the live schema.
    #[instrument(name = "introspect", skip(self))]
    pub async fn introspect(&mut self, input: &str) -> Result<SchemaInfo, AppError> {
        input::normalize_proposal_id(input)?;

        let schema = self.subgraph.introspect().await;
        let query = schema.proposal_query();
        info!(?query, "Using introspected query shape");
        self.subgraph.set_query(query);

        Ok(schema)
    }

    #[instrument(name = "fetch_report", skip(self, now))]
    pub async fn fetch(&self, input: &str, now: DateTime<Utc>) -> Result<ProposalReport, AppError> {
        let proposal_id = input::normalize_proposal_id(input)?;
        info!(proposal_id = %proposal_id, "Fetching proposal");

        let proposal = self.subgraph.fetch_proposal(&proposal_id).await?;

        let metadata = match proposal.ipfs_hash.as_deref() {
            Some(pointer) => self.metadata.fetch(pointer).await,
            None => None,
        };

        let timing = self
            .resolver
            .resolve(&ResolveContext {
                proposal: &proposal,
                metadata: metadata.as_ref(),
                now,
            })
            .await;

        let discussion_url = self.discussion.extract_first(&ExtractionInput {
            metadata: metadata.as_ref(),
            raw_content: proposal.raw_content(),
        });

        let metadata_title = metadata
            .as_ref()
            .and_then(metadata_title)
            .map(String::from);

        Ok(ProposalReport {
            proposal,
            metadata_title,
            timing,
            discussion_url,
        })
    }
}
