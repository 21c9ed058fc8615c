//! Installed model catalog and random sampling.

use rand::Rng;
use rand::seq::SliceRandom;
use thiserror::Error;

/// Substrings (case-insensitive) marking models that cannot generate text.
const EXCLUDED_MARKERS: &[&str] = &["embed", "rerank"];

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CatalogError {
    #[error("no text-generation models are installed")]
    Empty,

    #[error("requested {requested} random models but only {available} are eligible")]
    NotEnough { requested: usize, available: usize },
}

/// Models reported by the generator's listing command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModelCatalog {
    models: Vec<String>,
}

impl ModelCatalog {
    /// Parse listing output: a header row, then one model per line with the
    /// name in the first column. Embedding and reranking models are dropped.
    #[must_use]
    pub fn parse_list_output(listing: &str) -> Self {
        let models = listing
            .lines()
            .skip(1)
            .filter_map(|line| line.split_whitespace().next())
            .filter(|name| {
                let lower = name.to_ascii_lowercase();
                !EXCLUDED_MARKERS.iter().any(|m| lower.contains(m))
            })
            .map(str::to_string)
            .collect();
        Self { models }
    }

    #[must_use]
    pub fn models(&self) -> &[String] {
        &self.models
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }

    /// Pick `count` distinct models.
    pub fn sample<R: Rng + ?Sized>(&self, count: usize, rng: &mut R) -> Result<Vec<String>, CatalogError> {
        if self.models.is_empty() {
            return Err(CatalogError::Empty);
        }
        if count > self.models.len() {
            return Err(CatalogError::NotEnough {
                requested: count,
                available: self.models.len(),
            });
        }
        Ok(self.models.choose_multiple(rng, count).cloned().collect())
    }
}
