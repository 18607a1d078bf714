use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use tracing::debug;

static FORUM_URL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)https?://(?:www\.)?governance\.aave\.com/t/[^\s<>"']+"#)
        .expect("valid regex")
});

const METADATA_FIELDS: [&str; 9] = [
    "discussions",
    "discussion",
    "discussionUrl",
    "discussion_url",
    "forumLink",
    "forum_link",
    "link",
    "reference",
    "referenceUrl",
];

const RAW_CONTENT_FIELDS: [&str; 7] = [
    "discussion",
    "discussionUrl",
    "discussion_url",
    "link",
    "reference",
    "body",
    "description",
];

/// Everything the extractor may scan for forum links.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExtractionInput<'a> {
    pub metadata: Option<&'a Value>,
    pub raw_content: Option<&'a str>,
}

/// One place a discussion link may hide. Rules only produce text; matching happens once, afterwards.
pub trait ExtractionRule: Send + Sync {
    fn name(&self) -> &'static str;

    fn candidates(&self, input: &ExtractionInput<'_>) -> Vec<String>;
}

pub struct MetadataFields;

pub struct WholeMetadata;

pub struct RawContentText;

pub struct RawContentJson;

impl ExtractionRule for MetadataFields {
    fn name(&self) -> &'static str {
        "metadata_fields"
    }

    fn candidates(&self, input: &ExtractionInput<'_>) -> Vec<String> {
        input
            .metadata
            .map(|metadata| string_fields(metadata, &METADATA_FIELDS))
            .unwrap_or_default()
    }
}

impl ExtractionRule for WholeMetadata {
    fn name(&self) -> &'static str {
        "whole_metadata"
    }

    fn candidates(&self, input: &ExtractionInput<'_>) -> Vec<String> {
        let mut strings = Vec::new();
        if let Some(metadata) = input.metadata {
            collect_strings(metadata, &mut strings);
        }
        strings
    }
}

// Decoded string values at any depth.
fn collect_strings(value: &Value, out: &mut Vec<String>) {
    match value {
        Value::String(text) => out.push(text.clone()),
        Value::Array(items) => items.iter().for_each(|item| collect_strings(item, out)),
        Value::Object(map) => map.values().for_each(|item| collect_strings(item, out)),
        _ => {}
    }
}

impl ExtractionRule for RawContentText {
    fn name(&self) -> &'static str {
        "raw_content_text"
    }

    fn candidates(&self, input: &ExtractionInput<'_>) -> Vec<String> {
        input
            .raw_content
            .map(|raw| vec![raw.to_string()])
            .unwrap_or_default()
    }
}

impl ExtractionRule for RawContentJson {
    fn name(&self) -> &'static str {
        "raw_content_json"
    }

    fn candidates(&self, input: &ExtractionInput<'_>) -> Vec<String> {
        input
            .raw_content
            .and_then(|raw| serde_json::from_str::<Value>(raw).ok())
            .filter(Value::is_object)
            .map(|parsed| string_fields(&parsed, &RAW_CONTENT_FIELDS))
            .unwrap_or_default()
    }
}

fn string_fields(value: &Value, fields: &[&str]) -> Vec<String> {
    fields
        .iter()
        .filter_map(|field| value.get(*field).and_then(Value::as_str))
        .map(String::from)
        .collect()
}

/// Drops the query string, then the fragment, then a single trailing slash.
pub fn normalize_url(url: &str) -> String {
    let url = url.split('?').next().unwrap_or(url);
    let url = url.split('#').next().unwrap_or(url);
    url.strip_suffix('/').unwrap_or(url).to_string()
}

pub struct DiscussionExtractor {
    rules: Vec<Box<dyn ExtractionRule>>,
}

impl Default for DiscussionExtractor {
    fn default() -> Self {
        Self::new(vec![
            Box::new(MetadataFields),
            Box::new(WholeMetadata),
            Box::new(RawContentText),
            Box::new(RawContentJson),
        ])
    }
}

impl DiscussionExtractor {
    pub fn new(rules: Vec<Box<dyn ExtractionRule>>) -> Self {
        Self { rules }
    }

    /// Normalized forum links in rule order, first occurrence kept.
    pub fn extract_all(&self, input: &ExtractionInput<'_>) -> Vec<String> {
        let mut found: Vec<String> = Vec::new();

        for rule in &self.rules {
            for candidate in rule.candidates(input) {
                for m in FORUM_URL.find_iter(&candidate) {
                    let url = normalize_url(m.as_str());
                    if !found.contains(&url) {
                        debug!(rule = rule.name(), url = %url, "Found discussion link");
                        found.push(url);
                    }
                }
            }
        }

        found
    }

    pub fn extract_first(&self, input: &ExtractionInput<'_>) -> Option<String> {
        self.extract_all(input).into_iter().next()
    }
}
