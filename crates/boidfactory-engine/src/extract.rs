//! Reduces noisy generator output to the embedded document.
//!
//! Models wrap the page in commentary, code fences, or reasoning traces. The
//! artifact is the text from the first opening marker through the first
//! closing marker after it, both inclusive. Markers match
//! case-insensitively. If the closing marker never appears the document
//! runs to the end of the output; with no opening marker the result is empty.

use boidfactory_config::DocumentConfig;
use regex::{Regex, RegexBuilder};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("document marker must not be empty")]
    EmptyMarker,

    #[error("invalid document marker '{marker}': {source}")]
    Marker {
        marker: String,
        #[source]
        source: regex::Error,
    },
}

#[derive(Debug, Clone)]
pub struct ArtifactExtractor {
    open: Regex,
    close: Regex,
}

impl ArtifactExtractor {
    pub fn new(open_marker: &str, close_marker: &str) -> Result<Self, ExtractError> {
        Ok(Self {
            open: marker_regex(open_marker)?,
            close: marker_regex(close_marker)?,
        })
    }

    pub fn from_config(config: &DocumentConfig) -> Result<Self, ExtractError> {
        Self::new(&config.open_marker, &config.close_marker)
    }

    /// The embedded document, or `""` when there is none.
    ///
    /// Idempotent: extracting from an extracted document returns it unchanged.
    #[must_use]
    pub fn extract<'a>(&self, raw: &'a str) -> &'a str {
        let Some(open) = self.open.find(raw) else {
            return "";
        };
        let rest = &raw[open.start()..];
        let body_from = open.end() - open.start();
        match self.close.find_at(rest, body_from) {
            Some(close) => &rest[..close.end()],
            None => rest,
        }
    }
}

fn marker_regex(marker: &str) -> Result<Regex, ExtractError> {
    if marker.is_empty() {
        return Err(ExtractError::EmptyMarker);
    }
    RegexBuilder::new(&regex::escape(marker))
        .case_insensitive(true)
        .build()
        .map_err(|source| ExtractError::Marker {
            marker: marker.to_string(),
            source,
        })
}
