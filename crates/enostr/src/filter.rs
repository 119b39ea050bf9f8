use serde::{Deserialize, Serialize};

use crate::{Note, Pubkey};

/// A NIP-01 subscription filter. Unset fields are left out of the JSON.
#[derive(Serialize, Deserialize, Debug, Eq, PartialEq, Clone, Default)]
pub struct Filter {
    #[serde(skip_serializing_if = "Option::is_none")]
    authors: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    kinds: Option<Vec<u64>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    since: Option<u64>, // unix timestamp seconds
    #[serde(skip_serializing_if = "Option::is_none")]
    until: Option<u64>, // unix timestamp seconds
    #[serde(skip_serializing_if = "Option::is_none")]
    limit: Option<u32>,
}

impl Filter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn authors(mut self, authors: &[Pubkey]) -> Self {
        self.authors = Some(authors.iter().map(Pubkey::hex).collect());
        self
    }

    pub fn kinds(mut self, kinds: Vec<u64>) -> Self {
        self.kinds = Some(kinds);
        self
    }

    pub fn since(mut self, since: u64) -> Self {
        self.since = Some(since);
        self
    }

    pub fn until(mut self, until: u64) -> Self {
        self.until = Some(until);
        self
    }

    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Relays are untrusted, so results are checked against the filter
    /// again on our side. `limit` is not a property of a single note.
    pub fn matches(&self, note: &Note) -> bool {
        if let Some(authors) = &self.authors {
            let author = note.pubkey.hex();
            if !authors.iter().any(|a| *a == author) {
                return false;
            }
        }

        if let Some(kinds) = &self.kinds {
            if !kinds.contains(&note.kind) {
                return false;
            }
        }

        if self.since.is_some_and(|since| note.created_at < since) {
            return false;
        }

        if self.until.is_some_and(|until| note.created_at > until) {
            return false;
        }

        true
    }

    pub fn json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}
