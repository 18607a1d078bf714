use crate::errors::InputError;
use once_cell::sync::Lazy;
use regex::Regex;

static DIGITS: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[0-9]+$").expect("valid regex"));

// Order matters: the first pattern that captures wins.
static URL_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"(?i)proposalId[=:]([0-9]+)",
        r"(?i)/proposal/\?.*proposalId=([0-9]+)",
        r"(?i)/governance/v3/proposal/\?.*proposalId=([0-9]+)",
        r"(?i)/governance/([0-9]+)",
        r"(?i)/t/[^/]+/([0-9]+)",
        r"(?i)proposal[/\-]([0-9]+)",
    ]
    .iter()
    .map(|pattern| Regex::new(pattern).expect("valid regex"))
    .collect()
});

pub const SUPPORTED_FORMATS: [&str; 4] = [
    "Proposal ID: 411",
    "URL: https://app.aave.com/governance/v3/proposal/?proposalId=411",
    "URL: https://app.aave.com/governance/411",
    "URL: https://governance.aave.com/t/slug/411",
];

/// Turns a proposal ID or one of the known Aave URL shapes into a bare decimal ID.
pub fn normalize_proposal_id(input: &str) -> Result<String, InputError> {
    let trimmed = input.trim();

    if DIGITS.is_match(trimmed) {
        return Ok(trimmed.to_string());
    }

    URL_PATTERNS
        .iter()
        .find_map(|pattern| {
            pattern
                .captures(trimmed)
                .and_then(|captures| captures.get(1))
                .map(|id| id.as_str().to_string())
        })
        .ok_or_else(|| InputError::NotAnIdentifier(input.to_string()))
}
