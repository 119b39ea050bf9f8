use chrono::{NaiveDate, NaiveTime};
use enostr::{Filter, Pubkey, RelayUrl};
use hashbrown::HashSet;
use tracing::debug;

use crate::{Error, Result};

/// What the caller asked for, exactly as they typed it.
#[derive(Debug, Clone, Default)]
pub struct FetchRequest {
    pub author: String,
    /// inclusive, unix seconds
    pub since: Option<u64>,
    /// inclusive, unix seconds
    pub until: Option<u64>,
    pub kind: Option<u64>,
    pub relays: Vec<String>,
}

/// A request that passed validation: canonical author, at least one relay.
#[derive(Debug, Clone)]
pub struct ValidatedRequest {
    pub author: Pubkey,
    pub relays: Vec<RelayUrl>,
    pub since: Option<u64>,
    pub until: Option<u64>,
    pub kind: Option<u64>,
}

impl FetchRequest {
    pub fn new(author: impl Into<String>, relays: Vec<String>) -> Self {
        Self {
            author: author.into(),
            relays,
            ..Default::default()
        }
    }

    pub fn since(mut self, since: u64) -> Self {
        self.since = Some(since);
        self
    }

    pub fn until(mut self, until: u64) -> Self {
        self.until = Some(until);
        self
    }

    pub fn kind(mut self, kind: u64) -> Self {
        self.kind = Some(kind);
        self
    }

    /// Checks the request before any network activity happens.
    ///
    /// Relay strings without a websocket scheme are dropped silently, as are
    /// duplicates. Only an empty result is an error. `since <= until` is the
    /// caller's business.
    pub fn validate(&self) -> Result<ValidatedRequest> {
        let input = self.author.trim();
        if input.is_empty() {
            return Err(Error::MissingAuthor);
        }

        let author = Pubkey::parse(input).map_err(|source| Error::InvalidAuthor {
            input: input.to_owned(),
            source,
        })?;

        let mut seen = HashSet::new();
        let mut relays = Vec::with_capacity(self.relays.len());
        for relay in &self.relays {
            match RelayUrl::new(relay) {
                Ok(url) => {
                    if seen.insert(url.clone()) {
                        relays.push(url);
                    }
                }
                Err(err) => debug!("dropping relay '{relay}': {err}"),
            }
        }

        if relays.is_empty() {
            return Err(Error::NoRelays);
        }

        Ok(ValidatedRequest {
            author,
            relays,
            since: self.since,
            until: self.until,
            kind: self.kind,
        })
    }
}

impl ValidatedRequest {
    pub fn filter(&self) -> Filter {
        let mut filter = Filter::new().authors(&[self.author]);

        if let Some(kind) = self.kind {
            filter = filter.kinds(vec![kind]);
        }

        if let Some(since) = self.since {
            filter = filter.since(since);
        }

        if let Some(until) = self.until {
            filter = filter.until(until);
        }

        filter
    }
}

/// First second of `date` in UTC.
pub fn day_start(date: NaiveDate) -> u64 {
    date.and_time(NaiveTime::MIN).and_utc().timestamp().max(0) as u64
}

/// Last second of `date` in UTC, for inclusive day ranges.
pub fn day_end(date: NaiveDate) -> u64 {
    day_start(date) + 86_399
}
