use super::{OnChainDetails, ResolveContext, TimingEvidence, TimingSource, TimingSourceKind};
use crate::{
    errors::ValidationError,
    onchain::{ProposalReader, validate},
    subgraph::models::ProposalState,
};
use alloy::primitives::U256;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, info, warn};

const START_ALIASES: [&str; 4] = ["start", "startTime", "created", "createdAt"];
const END_ALIASES: [&str; 3] = ["end", "endTime", "endsAt"];

/// `None` when the window does not fit in signed unix seconds.
fn window(activation: u64, duration: u64, source: TimingSourceKind) -> Option<TimingEvidence> {
    let end = activation.checked_add(duration)?;
    Some(TimingEvidence::Complete {
        activation: i64::try_from(activation).ok()?,
        end: i64::try_from(end).ok()?,
        source,
        onchain: None,
    })
}

/// `transactions.active.timestamp` plus the voting duration.
pub struct ActivatedEvent;

#[async_trait]
impl TimingSource for ActivatedEvent {
    fn kind(&self) -> TimingSourceKind {
        TimingSourceKind::ActivatedEvent
    }

    async fn attempt(&self, ctx: &ResolveContext<'_>) -> Option<TimingEvidence> {
        let activated = ctx.proposal.activated_at()?;
        let duration = ctx.proposal.known_voting_duration()?;
        debug!(activated, duration, "Using activation transaction timestamp");
        window(activated, duration, self.kind())
    }
}

/// `transactions.created.timestamp + votingConfig.cooldownBeforeVotingStart`, plus the voting duration.
pub struct CreatedPlusCooldown;

#[async_trait]
impl TimingSource for CreatedPlusCooldown {
    fn kind(&self) -> TimingSourceKind {
        TimingSourceKind::CreatedPlusCooldown
    }

    async fn attempt(&self, ctx: &ResolveContext<'_>) -> Option<TimingEvidence> {
        let created = ctx.proposal.created_at()?;
        let cooldown = ctx.proposal.cooldown_before_voting_start()?;
        let duration = ctx.proposal.known_voting_duration()?;
        debug!(created, cooldown, duration, "Using creation timestamp plus cooldown");
        window(created.checked_add(cooldown)?, duration, self.kind())
    }
}

/// Reads the governance contract chain by chain. The first chain returning this proposal with a voting window wins.
pub struct OnChain {
    readers: Vec<Box<dyn ProposalReader>>,
    timeout: Duration,
}

impl OnChain {
    pub fn new(readers: Vec<Box<dyn ProposalReader>>, timeout: Duration) -> Self {
        Self { readers, timeout }
    }
}

#[async_trait]
impl TimingSource for OnChain {
    fn kind(&self) -> TimingSourceKind {
        TimingSourceKind::OnChain
    }

    async fn attempt(&self, ctx: &ResolveContext<'_>) -> Option<TimingEvidence> {
        let requested = match ctx.proposal.proposal_id.parse::<U256>() {
            Ok(id) => id,
            Err(e) => {
                warn!(proposal_id = %ctx.proposal.proposal_id, error = %e, "Proposal ID is not a uint256");
                return None;
            }
        };

        for reader in &self.readers {
            let chain = reader.chain();

            let proposal = match tokio::time::timeout(self.timeout, reader.get_proposal(requested)).await {
                Ok(Ok(proposal)) => proposal,
                Ok(Err(e)) => {
                    warn!(chain = %chain.name, error = ?e, "Contract call failed, trying next chain");
                    continue;
                }
                Err(_) => {
                    warn!(chain = %chain.name, timeout = ?self.timeout, "Contract call timed out, trying next chain");
                    continue;
                }
            };

            match validate(requested, &proposal) {
                Ok(()) => {
                    info!(chain = %chain.name, "Found proposal on chain");
                    return Some(TimingEvidence::Complete {
                        // uint40 on chain, always in range.
                        activation: proposal.start_time as i64,
                        end: proposal.end_time as i64,
                        source: self.kind(),
                        onchain: Some(OnChainDetails {
                            chain: chain.label().to_string(),
                            executed: proposal.executed,
                            canceled: proposal.canceled,
                        }),
                    });
                }
                Err(e @ ValidationError::IdMismatch { .. }) => {
                    warn!(chain = %chain.name, error = %e, "Proposal belongs to another chain");
                }
                Err(e @ ValidationError::ZeroTimestamps { .. }) => {
                    info!(chain = %chain.name, error = %e, "Proposal has no voting window on this chain");
                }
            }
        }

        None
    }
}

/// Start and end fields in the IPFS metadata, under any of their usual names.
pub struct Metadata;

#[async_trait]
impl TimingSource for Metadata {
    fn kind(&self) -> TimingSourceKind {
        TimingSourceKind::Metadata
    }

    async fn attempt(&self, ctx: &ResolveContext<'_>) -> Option<TimingEvidence> {
        let metadata = ctx.metadata?;
        let start = first_timestamp(metadata, &START_ALIASES);
        let end = first_timestamp(metadata, &END_ALIASES);

        match (start, end) {
            (Some(activation), Some(end)) => Some(TimingEvidence::Complete {
                activation,
                end,
                source: self.kind(),
                onchain: None,
            }),
            _ => {
                debug!(?start, ?end, "Metadata has no usable timestamp pair");
                None
            }
        }
    }
}

fn first_timestamp(metadata: &Value, aliases: &[&str]) -> Option<i64> {
    aliases
        .iter()
        .filter_map(|alias| metadata.get(*alias))
        .find_map(parse_metadata_timestamp)
}

/// Epoch seconds as a number or numeric string, or an RFC 3339, `YYYY-MM-DD HH:MM:SS` or `YYYY-MM-DD` date.
pub fn parse_metadata_timestamp(value: &Value) -> Option<i64> {
    let seconds = match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Value::String(s) => parse_timestamp_str(s.trim()),
        _ => None,
    }?;

    (seconds > 0).then_some(seconds)
}

fn parse_timestamp_str(s: &str) -> Option<i64> {
    if let Ok(seconds) = s.parse::<i64>() {
        return Some(seconds);
    }
    if let Ok(seconds) = s.parse::<f64>() {
        return seconds.is_finite().then_some(seconds as i64);
    }
    if let Ok(date) = DateTime::parse_from_rfc3339(s) {
        return Some(date.timestamp());
    }
    if let Ok(date) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
        return Some(date.and_utc().timestamp());
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|date| date.and_utc().timestamp())
}

/// Known duration without a known start.
pub struct DurationEstimate;

#[async_trait]
impl TimingSource for DurationEstimate {
    fn kind(&self) -> TimingSourceKind {
        TimingSourceKind::DurationEstimate
    }

    async fn attempt(&self, ctx: &ResolveContext<'_>) -> Option<TimingEvidence> {
        ctx.proposal
            .known_voting_duration()
            .map(|duration| TimingEvidence::DurationOnly { duration })
    }
}

/// Cancelled proposals never opened for voting.
pub struct Cancelled;

#[async_trait]
impl TimingSource for Cancelled {
    fn kind(&self) -> TimingSourceKind {
        TimingSourceKind::Cancelled
    }

    async fn attempt(&self, ctx: &ResolveContext<'_>) -> Option<TimingEvidence> {
        (ctx.proposal.proposal_state() == Some(ProposalState::Cancelled))
            .then_some(TimingEvidence::Cancelled)
    }
}
