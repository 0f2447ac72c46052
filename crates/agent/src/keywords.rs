//! Whole-word keyword matching

use regex::Regex;

use crate::AgentError;

/// Compile `terms` into one case-insensitive word-boundary alternation
///
/// Terms are trimmed and lowercased, longest first so a phrase wins over
/// its own substrings. Inner spaces match any run of whitespace. Returns
/// `None` when no usable term remains.
pub(crate) fn phrase_pattern<I, S>(terms: I) -> Result<Option<Regex>, AgentError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut terms: Vec<String> = terms
        .into_iter()
        .map(|s| s.as_ref().trim().to_lowercase())
        .filter(|s| !s.is_empty())
        .collect();
    terms.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));
    terms.dedup();

    if terms.is_empty() {
        return Ok(None);
    }

    let alternation = terms
        .iter()
        .map(|t| regex::escape(t).replace(' ', r"\s+"))
        .collect::<Vec<_>>()
        .join("|");
    Regex::new(&format!(r"(?i)\b(?:{})\b", alternation))
        .map(Some)
        .map_err(|e| AgentError::Knowledge(format!("Invalid keyword list: {}", e)))
}

/// Matches configured exit keywords as whole words
#[derive(Debug, Clone, Default)]
pub struct ExitMatcher {
    pattern: Option<Regex>,
}

impl ExitMatcher {
    pub fn new<I, S>(keywords: I) -> Result<Self, AgentError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Ok(Self {
            pattern: phrase_pattern(keywords)?,
        })
    }

    /// Whether `input` mentions any exit keyword
    pub fn matches(&self, input: &str) -> bool {
        self.pattern
            .as_ref()
            .map_or(false, |pattern| pattern.is_match(input))
    }
}
