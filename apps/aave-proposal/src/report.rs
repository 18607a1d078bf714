use crate::{
    subgraph::{models::SubgraphProposal, query::SchemaInfo},
    timing::TimingResult,
};
use alloy::primitives::U256;
use std::fmt;

const TOKEN_DECIMALS: u64 = 18;
const RULE: &str = "==================================================";

/// Everything the report shows, already merged from every source.
#[derive(Debug, Clone)]
pub struct ProposalReport {
    pub proposal: SubgraphProposal,
    pub metadata_title: Option<String>,
    pub timing: TimingResult,
    pub discussion_url: Option<String>,
}

impl ProposalReport {
    pub fn title(&self) -> &str {
        self.proposal
            .title()
            .or(self.metadata_title.as_deref())
            .unwrap_or("N/A")
    }

    pub fn state_label(&self) -> String {
        self.proposal
            .proposal_state()
            .map(|state| state.to_string())
            .unwrap_or_else(|| "N/A".to_string())
    }
}

pub fn render_report(report: &ProposalReport) -> String {
    report.to_string()
}

impl fmt::Display for ProposalReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let p = &self.proposal;
        let tally = p.tally();
        let timing = &self.timing;

        let duration = match p.voting_duration {
            Some(seconds) => format!("{} ({seconds} seconds)", format_duration(Some(seconds))),
            None => "N/A".to_string(),
        };

        writeln!(f, "{RULE}")?;
        writeln!(f, "Aave Governance Proposal #{}", p.proposal_id)?;
        writeln!(f, "{RULE}")?;
        writeln!(f, "Title:         {}", self.title())?;
        writeln!(f, "State:         {}", self.state_label())?;
        writeln!(f, "Creator:       {}", p.creator.as_deref().unwrap_or("N/A"))?;
        writeln!(
            f,
            "IPFS Hash:     {}",
            p.ipfs_hash.as_deref().filter(|h| !h.is_empty()).unwrap_or("N/A")
        )?;
        writeln!(
            f,
            "Discussion:    {}",
            self.discussion_url
                .as_deref()
                .unwrap_or("N/A (not found in metadata)")
        )?;
        writeln!(
            f,
            "Votes:         For {} AAVE | Against {} AAVE",
            format_token_amount(tally.for_votes.as_deref()),
            format_token_amount(tally.against_votes.as_deref())
        )?;
        writeln!(f, "Duration:      {duration}")?;
        writeln!(f, "Started:       {}", timing.start_display)?;
        writeln!(f, "Ends:          {}", timing.end_display)?;
        writeln!(f, "Time Left:     {}", timing.remaining_display)?;
        writeln!(f, "Timing Source: {}", timing.source)?;

        if let Some(onchain) = &timing.onchain {
            writeln!(f, "Chain:         {}", onchain.chain)?;
            writeln!(f, "Executed:      {}", yes_no(onchain.executed))?;
            writeln!(f, "Canceled:      {}", yes_no(onchain.canceled))?;
        }

        writeln!(f, "{RULE}")
    }
}

/// Field listing for each introspected type, `(not available)` for types the schema lacks.
pub fn render_schema(schema: &SchemaInfo) -> String {
    SchemaListing(schema).to_string()
}

struct SchemaListing<'a>(&'a SchemaInfo);

impl fmt::Display for SchemaListing<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (name, info) in &self.0.types {
            writeln!(f, "{name}:")?;
            match info {
                Some(info) if !info.field_list().is_empty() => {
                    for field in info.field_list() {
                        writeln!(f, "  - {}: {}", field.name, field.type_ref.display_name())?;
                    }
                }
                Some(_) => writeln!(f, "  (no fields)")?,
                None => writeln!(f, "  (not available)")?,
            }
        }
        Ok(())
    }
}

fn yes_no(value: bool) -> &'static str {
    if value { "Yes" } else { "No" }
}

/// Whole tokens from a raw 18-decimal amount, truncated, with thousands separators.
pub fn format_token_amount(raw: Option<&str>) -> String {
    let Some(raw) = raw.map(str::trim).filter(|r| !r.is_empty()) else {
        return "0".to_string();
    };

    match raw.parse::<U256>() {
        Ok(amount) => {
            let whole = amount / U256::from(10u64).pow(U256::from(TOKEN_DECIMALS));
            group_thousands(&whole.to_string())
        }
        Err(_) => "N/A".to_string(),
    }
}

fn group_thousands(digits: &str) -> String {
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }
    grouped
}

/// `7 days`, `1 day, 2 hours, 30 minutes`; sub-minute durations fall back to seconds.
pub fn format_duration(seconds: Option<u64>) -> String {
    let Some(seconds) = seconds.filter(|s| *s > 0) else {
        return "N/A".to_string();
    };

    let parts: Vec<String> = [
        (seconds / 86_400, "day"),
        ((seconds % 86_400) / 3_600, "hour"),
        ((seconds % 3_600) / 60, "minute"),
    ]
    .into_iter()
    .filter(|(count, _)| *count > 0)
    .map(|(count, unit)| {
        if count == 1 {
            format!("{count} {unit}")
        } else {
            format!("{count} {unit}s")
        }
    })
    .collect();

    if parts.is_empty() {
        format!("{seconds} seconds")
    } else {
        parts.join(", ")
    }
}
