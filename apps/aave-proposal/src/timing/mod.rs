use crate::{onchain::ProposalReader, subgraph::models::SubgraphProposal};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use std::{fmt, time::Duration};
use tracing::{info, instrument};

pub mod sources;

pub use sources::parse_metadata_timestamp;

/// Inputs every timing source may look at. `now` is injected so results are reproducible.
pub struct ResolveContext<'a> {
    pub proposal: &'a SubgraphProposal,
    pub metadata: Option<&'a Value>,
    pub now: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimingSourceKind {
    ActivatedEvent,
    CreatedPlusCooldown,
    OnChain,
    Metadata,
    DurationEstimate,
    Cancelled,
    Unavailable,
}

impl fmt::Display for TimingSourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            TimingSourceKind::ActivatedEvent => "subgraph activation transaction",
            TimingSourceKind::CreatedPlusCooldown => "subgraph creation + cooldown",
            TimingSourceKind::OnChain => "on-chain contract read",
            TimingSourceKind::Metadata => "IPFS metadata",
            TimingSourceKind::DurationEstimate => "voting duration estimate",
            TimingSourceKind::Cancelled => "proposal state (cancelled)",
            TimingSourceKind::Unavailable => "none",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OnChainDetails {
    pub chain: String,
    pub executed: bool,
    pub canceled: bool,
}

/// What one source knows about the voting window. Timestamps are unix seconds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TimingEvidence {
    Complete {
        activation: i64,
        end: i64,
        source: TimingSourceKind,
        onchain: Option<OnChainDetails>,
    },
    DurationOnly {
        duration: u64,
    },
    Cancelled,
}

#[async_trait]
pub trait TimingSource: Send + Sync {
    fn kind(&self) -> TimingSourceKind;

    /// `None` passes the decision to the next source.
    async fn attempt(&self, ctx: &ResolveContext<'_>) -> Option<TimingEvidence>;
}

/// Display-ready timing for the report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimingResult {
    pub start_display: String,
    pub end_display: String,
    pub remaining_display: String,
    pub source: TimingSourceKind,
    pub onchain: Option<OnChainDetails>,
}

impl TimingResult {
    fn from_evidence(evidence: TimingEvidence, now: DateTime<Utc>) -> Self {
        match evidence {
            TimingEvidence::Complete {
                activation,
                end,
                source,
                onchain,
            } => Self {
                start_display: format_timestamp(activation),
                end_display: format_timestamp(end),
                remaining_display: format_time_remaining(end - now.timestamp()),
                source,
                onchain,
            },
            TimingEvidence::DurationOnly { duration } => Self {
                start_display: "N/A (exact start time unavailable)".to_string(),
                end_display: format!(
                    "Voting duration: ~{}d {}h {}m (exact times unavailable)",
                    duration / 86_400,
                    (duration % 86_400) / 3_600,
                    (duration % 3_600) / 60
                ),
                remaining_display: "Unknown (cannot calculate without start time)".to_string(),
                source: TimingSourceKind::DurationEstimate,
                onchain: None,
            },
            TimingEvidence::Cancelled => Self {
                start_display: "N/A (proposal was cancelled before voting started)".to_string(),
                end_display: "N/A (proposal was cancelled before voting started)".to_string(),
                remaining_display: "N/A (proposal cancelled)".to_string(),
                source: TimingSourceKind::Cancelled,
                onchain: None,
            },
        }
    }

    fn unavailable() -> Self {
        Self {
            start_display: "N/A (timing data unavailable)".to_string(),
            end_display: "N/A (timing data unavailable)".to_string(),
            remaining_display: "N/A (cannot calculate)".to_string(),
            source: TimingSourceKind::Unavailable,
            onchain: None,
        }
    }
}

/// Priority-ordered waterfall over timing sources. The first source with an answer wins; later ones are never run.
pub struct TimingResolver {
    sources: Vec<Box<dyn TimingSource>>,
}

impl TimingResolver {
    pub fn new(sources: Vec<Box<dyn TimingSource>>) -> Self {
        Self { sources }
    }

    pub fn with_default_sources(readers: Vec<Box<dyn ProposalReader>>, chain_timeout: Duration) -> Self {
        Self::new(vec![
            Box::new(sources::ActivatedEvent),
            Box::new(sources::CreatedPlusCooldown),
            Box::new(sources::OnChain::new(readers, chain_timeout)),
            Box::new(sources::Metadata),
            Box::new(sources::DurationEstimate),
            Box::new(sources::Cancelled),
        ])
    }

    #[instrument(name = "resolve_timing", skip_all, fields(proposal_id = %ctx.proposal.proposal_id))]
    pub async fn resolve(&self, ctx: &ResolveContext<'_>) -> TimingResult {
        for source in &self.sources {
            if let Some(evidence) = source.attempt(ctx).await {
                info!(source = %source.kind(), "Timing resolved");
                return TimingResult::from_evidence(evidence, ctx.now);
            }
        }

        info!("No timing source had data");
        TimingResult::unavailable()
    }
}

fn plural(count: i64, unit: &str) -> String {
    if count == 1 {
        format!("{count} {unit}")
    } else {
        format!("{count} {unit}s")
    }
}

/// Truncated to the two largest units, e.g. `3 days, 4 hours`.
pub fn format_time_remaining(seconds: i64) -> String {
    if seconds <= 0 {
        return "Ended".to_string();
    }

    let days = seconds / 86_400;
    let hours = (seconds % 86_400) / 3_600;
    let minutes = (seconds % 3_600) / 60;
    let secs = seconds % 60;

    if days > 0 {
        format!("{}, {}", plural(days, "day"), plural(hours, "hour"))
    } else if hours > 0 {
        format!("{}, {}", plural(hours, "hour"), plural(minutes, "minute"))
    } else if minutes > 0 {
        format!("{}, {}", plural(minutes, "minute"), plural(secs, "second"))
    } else {
        plural(secs, "second")
    }
}

pub fn format_timestamp(seconds: i64) -> String {
    DateTime::from_timestamp(seconds, 0)
        .map(|date| date.format("%Y-%m-%d %H:%M:%S UTC").to_string())
        .unwrap_or_else(|| format!("Invalid timestamp ({seconds})"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::ChainConfig,
        onchain::OnChainProposal,
        subgraph::models::{ProposalState, SubgraphProposal},
    };
    use alloy::primitives::{Address, U256};
    use anyhow::{Result, anyhow};
    use chrono::TimeZone;
    use serde_json::json;
    use std::sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    };

    enum Behavior {
        Fail,
        Hang,
        Return { id: u64, start: u64, end: u64 },
    }

    struct FakeReader {
        chain: ChainConfig,
        behavior: Behavior,
        calls: Arc<AtomicUsize>,
    }

    impl FakeReader {
        fn boxed(name: &str, behavior: Behavior) -> (Box<dyn ProposalReader>, Arc<AtomicUsize>) {
            let calls = Arc::new(AtomicUsize::new(0));
            let reader = FakeReader {
                chain: ChainConfig {
                    name: name.to_string(),
                    display_name: None,
                    contract_address: Address::ZERO.to_string(),
                    rpc_url: "http://127.0.0.1:1".to_string(),
                },
                behavior,
                calls: calls.clone(),
            };
            (Box::new(reader), calls)
        }
    }

    #[async_trait]
    impl ProposalReader for FakeReader {
        fn chain(&self) -> &ChainConfig {
            &self.chain
        }

        async fn get_proposal(&self, _proposal_id: U256) -> Result<OnChainProposal> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match self.behavior {
                Behavior::Fail => Err(anyhow!("connection refused")),
                Behavior::Hang => {
                    tokio::time::sleep(Duration::from_secs(60)).await;
                    Err(anyhow!("unreachable"))
                }
                Behavior::Return { id, start, end } => Ok(OnChainProposal {
                    id: U256::from(id),
                    creator: Address::ZERO,
                    start_time: start,
                    end_time: end,
                    for_votes: U256::ZERO,
                    against_votes: U256::ZERO,
                    state: 2,
                    executed: true,
                    canceled: false,
                }),
            }
        }
    }

    fn proposal(value: serde_json::Value) -> SubgraphProposal {
        serde_json::from_value(value).unwrap()
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 5, 0, 0, 0).unwrap()
    }

    #[test]
    fn test_format_time_remaining() {
        assert_eq!(format_time_remaining(-5), "Ended");
        assert_eq!(format_time_remaining(0), "Ended");
        assert_eq!(format_time_remaining(90_000), "1 day, 1 hour");
        assert_eq!(format_time_remaining(3 * 86_400), "3 days, 0 hours");
        assert_eq!(format_time_remaining(2 * 3_600 + 59 * 60 + 59), "2 hours, 59 minutes");
        assert_eq!(format_time_remaining(61), "1 minute, 1 second");
        assert_eq!(format_time_remaining(45), "45 seconds");
    }

    #[test]
    fn test_format_timestamp() {
        assert_eq!(format_timestamp(1_704_067_200), "2024-01-01 00:00:00 UTC");
    }

    #[tokio::test]
    async fn test_activation_event_wins_and_chain_is_never_read() {
        let p = proposal(json!({
            "proposalId": "411",
            "state": 2,
            "votingDuration": "259200",
            "transactions": { "active": { "timestamp": "1704067200" } }
        }));
        let (reader, calls) = FakeReader::boxed(
            "ethereum",
            Behavior::Return { id: 411, start: 1, end: 2 },
        );
        let resolver = TimingResolver::with_default_sources(vec![reader], Duration::from_secs(1));

        let result = resolver
            .resolve(&ResolveContext { proposal: &p, metadata: None, now: now() })
            .await;

        assert_eq!(result.source, TimingSourceKind::ActivatedEvent);
        assert_eq!(result.start_display, "2024-01-01 00:00:00 UTC");
        assert_eq!(result.end_display, "2024-01-04 00:00:00 UTC");
        assert_eq!(result.remaining_display, "Ended");
        assert!(result.onchain.is_none());
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_out_of_range_activation_falls_through() {
        let p = proposal(json!({
            "proposalId": "411",
            "votingDuration": "604800",
            "transactions": { "active": { "timestamp": "18446744073709551615" } }
        }));
        let resolver = TimingResolver::with_default_sources(Vec::new(), Duration::from_secs(1));

        let result = resolver
            .resolve(&ResolveContext { proposal: &p, metadata: None, now: now() })
            .await;

        assert_eq!(result.source, TimingSourceKind::DurationEstimate);
        assert!(!result.start_display.contains("1969"));
    }

    #[tokio::test]
    async fn test_created_plus_cooldown() {
        let p = proposal(json!({
            "proposalId": "411",
            "votingDuration": 604800,
            "transactions": { "created": { "timestamp": "1703980800" } },
            "votingConfig": { "cooldownBeforeVotingStart": "86400" }
        }));
        let resolver = TimingResolver::with_default_sources(Vec::new(), Duration::from_secs(1));

        let result = resolver
            .resolve(&ResolveContext { proposal: &p, metadata: None, now: now() })
            .await;

        assert_eq!(result.source, TimingSourceKind::CreatedPlusCooldown);
        assert_eq!(result.start_display, "2024-01-01 00:00:00 UTC");
        assert_eq!(result.end_display, "2024-01-08 00:00:00 UTC");
        assert_eq!(result.remaining_display, "3 days, 0 hours");
    }

    #[tokio::test]
    async fn test_chain_waterfall_skips_invalid_answers() {
        let p = proposal(json!({ "proposalId": "411", "state": 2 }));
        let (mismatch, mismatch_calls) =
            FakeReader::boxed("ethereum", Behavior::Return { id: 7, start: 1, end: 2 });
        let (unstarted, unstarted_calls) =
            FakeReader::boxed("polygon", Behavior::Return { id: 411, start: 0, end: 0 });
        let (valid, valid_calls) = FakeReader::boxed(
            "avalanche",
            Behavior::Return { id: 411, start: 1_704_067_200, end: 1_704_672_000 },
        );
        let (extra, extra_calls) = FakeReader::boxed("arbitrum", Behavior::Fail);

        let resolver = TimingResolver::with_default_sources(
            vec![mismatch, unstarted, valid, extra],
            Duration::from_secs(1),
        );
        let result = resolver
            .resolve(&ResolveContext { proposal: &p, metadata: None, now: now() })
            .await;

        assert_eq!(result.source, TimingSourceKind::OnChain);
        assert_eq!(result.end_display, "2024-01-08 00:00:00 UTC");
        assert_eq!(
            result.onchain,
            Some(OnChainDetails {
                chain: "avalanche".to_string(),
                executed: true,
                canceled: false,
            })
        );
        assert_eq!(mismatch_calls.load(Ordering::SeqCst), 1);
        assert_eq!(unstarted_calls.load(Ordering::SeqCst), 1);
        assert_eq!(valid_calls.load(Ordering::SeqCst), 1);
        assert_eq!(extra_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_hanging_chain_times_out_and_metadata_is_used() {
        let p = proposal(json!({ "proposalId": "411", "votingDuration": "604800" }));
        let metadata = json!({ "startTime": 1_704_067_200, "endTime": "2024-01-08T00:00:00Z" });
        let (hang, hang_calls) = FakeReader::boxed("ethereum", Behavior::Hang);
        let (fail, fail_calls) = FakeReader::boxed("polygon", Behavior::Fail);

        let resolver =
            TimingResolver::with_default_sources(vec![hang, fail], Duration::from_millis(50));
        let result = resolver
            .resolve(&ResolveContext { proposal: &p, metadata: Some(&metadata), now: now() })
            .await;

        assert_eq!(result.source, TimingSourceKind::Metadata);
        assert_eq!(result.start_display, "2024-01-01 00:00:00 UTC");
        assert_eq!(result.remaining_display, "3 days, 0 hours");
        assert_eq!(hang_calls.load(Ordering::SeqCst), 1);
        assert_eq!(fail_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_duration_only_estimate() {
        let p = proposal(json!({ "proposalId": "411", "state": 6, "votingDuration": "183900" }));
        let metadata = json!({ "start": "2024-01-01" });
        let resolver = TimingResolver::with_default_sources(Vec::new(), Duration::from_secs(1));

        let result = resolver
            .resolve(&ResolveContext { proposal: &p, metadata: Some(&metadata), now: now() })
            .await;

        assert_eq!(result.source, TimingSourceKind::DurationEstimate);
        assert_eq!(
            result.end_display,
            "Voting duration: ~2d 3h 5m (exact times unavailable)"
        );
        assert_eq!(
            result.remaining_display,
            "Unknown (cannot calculate without start time)"
        );
    }

    #[tokio::test]
    async fn test_terminal_fallbacks() {
        let resolver = TimingResolver::with_default_sources(Vec::new(), Duration::from_secs(1));

        let cancelled = proposal(json!({ "proposalId": "9", "state": 6 }));
        assert_eq!(cancelled.proposal_state(), Some(ProposalState::Cancelled));
        let result = resolver
            .resolve(&ResolveContext { proposal: &cancelled, metadata: None, now: now() })
            .await;
        assert_eq!(result.source, TimingSourceKind::Cancelled);
        assert_eq!(result.remaining_display, "N/A (proposal cancelled)");

        let unknown = proposal(json!({ "proposalId": "9", "state": 1 }));
        let result = resolver
            .resolve(&ResolveContext { proposal: &unknown, metadata: None, now: now() })
            .await;
        assert_eq!(result, TimingResult::unavailable());
    }
}
