use serde::{Deserialize, Deserializer};
use serde_json::Value;
use std::fmt;

/// Envelope returned by every GraphQL request.
#[derive(Deserialize, Debug)]
pub struct GraphqlResponse<T> {
    pub data: Option<T>,
    pub errors: Option<Vec<GraphqlError>>,
}

#[derive(Deserialize, Debug, Clone)]
pub struct GraphqlError {
    pub message: String,
}

#[derive(Deserialize, Debug)]
pub struct ProposalsData {
    #[serde(default)]
    pub proposals: Vec<SubgraphProposal>,
}

/// A proposal as indexed by the Aave Governance V3 subgraph.
#[derive(Deserialize, Debug, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct SubgraphProposal {
    #[serde(deserialize_with = "de_string")]
    pub proposal_id: String,
    #[serde(default, deserialize_with = "de_opt_i64")]
    pub state: Option<i64>,
    #[serde(default)]
    pub creator: Option<String>,
    #[serde(default, deserialize_with = "de_opt_i64")]
    pub access_level: Option<i64>,
    #[serde(default)]
    pub ipfs_hash: Option<String>,
    #[serde(default, deserialize_with = "de_opt_u64")]
    pub voting_duration: Option<u64>,
    #[serde(default)]
    pub proposal_metadata: Option<ProposalMetadata>,
    #[serde(default)]
    pub votes: Option<VotesField>,
    #[serde(default)]
    pub transactions: Option<ProposalTransactions>,
    #[serde(default)]
    pub voting_config: Option<VotingConfig>,
}

impl SubgraphProposal {
    pub fn proposal_state(&self) -> Option<ProposalState> {
        self.state.map(ProposalState::from_raw)
    }

    pub fn title(&self) -> Option<&str> {
        self.proposal_metadata
            .as_ref()
            .and_then(|m| m.title.as_deref())
            .filter(|t| !t.trim().is_empty())
    }

    pub fn raw_content(&self) -> Option<&str> {
        self.proposal_metadata
            .as_ref()
            .and_then(|m| m.raw_content.as_deref())
    }

    pub fn tally(&self) -> ProposalVotes {
        match &self.votes {
            Some(VotesField::One(votes)) => votes.clone(),
            Some(VotesField::Many(votes)) => votes.first().cloned().unwrap_or_default(),
            None => ProposalVotes::default(),
        }
    }

    /// Timestamp of the on-chain transition into the active state.
    pub fn activated_at(&self) -> Option<u64> {
        self.transactions
            .as_ref()
            .and_then(|t| t.active.as_ref())
            .and_then(|tx| tx.timestamp)
            .filter(|ts| *ts > 0)
    }

    pub fn created_at(&self) -> Option<u64> {
        self.transactions
            .as_ref()
            .and_then(|t| t.created.as_ref())
            .and_then(|tx| tx.timestamp)
            .filter(|ts| *ts > 0)
    }

    pub fn cooldown_before_voting_start(&self) -> Option<u64> {
        self.voting_config
            .as_ref()
            .and_then(|c| c.cooldown_before_voting_start)
            .filter(|cooldown| *cooldown > 0)
    }

    pub fn known_voting_duration(&self) -> Option<u64> {
        self.voting_duration.filter(|d| *d > 0)
    }
}

#[derive(Deserialize, Debug, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct ProposalMetadata {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub raw_content: Option<String>,
}

/// The subgraph has exposed `votes` both as an object and as a list.
#[derive(Deserialize, Debug, Clone)]
#[serde(untagged)]
pub enum VotesField {
    One(ProposalVotes),
    Many(Vec<ProposalVotes>),
}

/// Raw tallies in the token's smallest unit.
#[derive(Deserialize, Debug, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct ProposalVotes {
    #[serde(default, deserialize_with = "de_opt_string")]
    pub for_votes: Option<String>,
    #[serde(default, deserialize_with = "de_opt_string")]
    pub against_votes: Option<String>,
}

#[derive(Deserialize, Debug, Clone, Default)]
pub struct ProposalTransactions {
    #[serde(default)]
    pub created: Option<TransactionData>,
    #[serde(default)]
    pub active: Option<TransactionData>,
    #[serde(default)]
    pub queued: Option<TransactionData>,
    #[serde(default)]
    pub executed: Option<TransactionData>,
    #[serde(default)]
    pub failed: Option<TransactionData>,
    #[serde(default)]
    pub canceled: Option<TransactionData>,
}

#[derive(Deserialize, Debug, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct TransactionData {
    #[serde(default, deserialize_with = "de_opt_u64")]
    pub timestamp: Option<u64>,
    #[serde(default, deserialize_with = "de_opt_u64")]
    pub block_number: Option<u64>,
}

#[derive(Deserialize, Debug, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct VotingConfig {
    #[serde(default, deserialize_with = "de_opt_u64")]
    pub cooldown_before_voting_start: Option<u64>,
    #[serde(default, deserialize_with = "de_opt_u64")]
    pub voting_duration: Option<u64>,
}

/// Aave Governance V3 proposal lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProposalState {
    Null,
    Created,
    Active,
    Queued,
    Executed,
    Failed,
    Cancelled,
    Expired,
    Unknown(i64),
}

impl ProposalState {
    pub fn from_raw(value: i64) -> Self {
        match value {
            0 => ProposalState::Null,
            1 => ProposalState::Created,
            2 => ProposalState::Active,
            3 => ProposalState::Queued,
            4 => ProposalState::Executed,
            5 => ProposalState::Failed,
            6 => ProposalState::Cancelled,
            7 => ProposalState::Expired,
            other => ProposalState::Unknown(other),
        }
    }
}

impl fmt::Display for ProposalState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProposalState::Null => write!(f, "Null"),
            ProposalState::Created => write!(f, "Created"),
            ProposalState::Active => write!(f, "Active"),
            ProposalState::Queued => write!(f, "Queued"),
            ProposalState::Executed => write!(f, "Executed"),
            ProposalState::Failed => write!(f, "Failed"),
            ProposalState::Cancelled => write!(f, "Cancelled"),
            ProposalState::Expired => write!(f, "Expired"),
            ProposalState::Unknown(value) => write!(f, "Unknown({value})"),
        }
    }
}

// The subgraph serializes BigInt fields as strings; older deployments used numbers.

fn value_to_string(value: Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn de_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    value_to_string(value).ok_or_else(|| serde::de::Error::custom("expected string or number"))
}

fn de_opt_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Value>::deserialize(deserializer)?.and_then(value_to_string))
}

fn de_opt_u64<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(de_opt_string(deserializer)?.and_then(|s| s.trim().parse::<u64>().ok()))
}

fn de_opt_i64<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(de_opt_string(deserializer)?.and_then(|s| s.trim().parse::<i64>().ok()))
}
