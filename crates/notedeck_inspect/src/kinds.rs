//! Display names for note kinds.
//!
//! [`KindNames`] is built once at startup and never changes afterwards.
//! Names discovered while fetching go into a [`KindNameCache`] owned by
//! whoever runs the fetch, and [`KindNamer`] looks at both.

use std::collections::BTreeMap;
use std::ops::RangeInclusive;
use std::path::Path;
use std::sync::{PoisonError, RwLock};

use enostr::Note;
use hashbrown::HashMap;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::{Error, Result};

/// Kind of NIP-89 application handler announcements.
pub const HANDLER_INFORMATION: u64 = 31990;

const MAX_NAME_LEN: usize = 48;

const KNOWN_KINDS: &[(u64, &str)] = &[
    (0, "User Metadata"),
    (1, "Short Text Note"),
    (2, "Recommend Relay"),
    (3, "Follows"),
    (4, "Encrypted Direct Messages"),
    (5, "Event Deletion Request"),
    (6, "Repost"),
    (7, "Reaction"),
    (8, "Badge Award"),
    (9, "Chat Message"),
    (10, "Group Chat Threaded Reply"),
    (11, "Thread"),
    (12, "Group Thread Reply"),
    (13, "Seal"),
    (14, "Direct Message"),
    (15, "File Message"),
    (16, "Generic Repost"),
    (17, "Reaction to a Website"),
    (20, "Picture"),
    (21, "Video Event"),
    (22, "Short-form Portrait Video"),
    (40, "Channel Creation"),
    (41, "Channel Metadata"),
    (42, "Channel Message"),
    (43, "Channel Hide Message"),
    (44, "Channel Mute User"),
    (62, "Request to Vanish"),
    (64, "Chess (PGN)"),
    (818, "Merge Requests"),
    (1018, "Poll Response"),
    (1021, "Bid"),
    (1022, "Bid Confirmation"),
    (1040, "OpenTimestamps"),
    (1059, "Gift Wrap"),
    (1063, "File Metadata"),
    (1068, "Poll"),
    (1111, "Comment"),
    (1311, "Live Chat Message"),
    (1617, "Patches"),
    (1621, "Issues"),
    (1622, "Git Replies"),
    (1971, "Problem Tracker"),
    (1984, "Reporting"),
    (1985, "Label"),
    (1986, "Relay Reviews"),
    (1987, "AI Embeddings"),
    (2003, "Torrent"),
    (2004, "Torrent Comment"),
    (2022, "Coinjoin Pool"),
    (4550, "Community Post Approval"),
    (7000, "Job Feedback"),
    (7374, "Reserved Cashu Wallet Tokens"),
    (7375, "Cashu Wallet Tokens"),
    (7376, "Cashu Wallet History"),
    (9041, "Zap Goal"),
    (9321, "Nutzap"),
    (9734, "Zap Request"),
    (9735, "Zap"),
    (9802, "Highlights"),
    (10000, "Mute List"),
    (10001, "Pin List"),
    (10002, "Relay List Metadata"),
    (10003, "Bookmark List"),
    (10004, "Communities List"),
    (10005, "Public Chats List"),
    (10006, "Blocked Relays List"),
    (10007, "Search Relays List"),
    (10009, "User Groups"),
    (10015, "Interests List"),
    (10019, "Nutzap Mint Recommendation"),
    (10030, "User Emoji List"),
    (10050, "DM Relay List"),
    (10063, "User Server List"),
    (10096, "File Storage Server List"),
    (13194, "Wallet Info"),
    (21000, "Lightning Pub RPC"),
    (22242, "Client Authentication"),
    (23194, "Wallet Request"),
    (23195, "Wallet Response"),
    (24133, "Nostr Connect"),
    (24242, "Blossom Authorization"),
    (27235, "HTTP Auth"),
    (30000, "Follow Sets"),
    (30001, "Generic Lists"),
    (30002, "Relay Sets"),
    (30003, "Bookmark Sets"),
    (30004, "Curation Sets"),
    (30005, "Video Sets"),
    (30007, "Kind Mute Sets"),
    (30008, "Profile Badges"),
    (30009, "Badge Definition"),
    (30015, "Interest Sets"),
    (30017, "Marketplace Stall"),
    (30018, "Marketplace Product"),
    (30019, "Marketplace UI/UX"),
    (30020, "Auction Product"),
    (30023, "Long-form Content"),
    (30024, "Draft Long-form Content"),
    (30030, "Emoji Sets"),
    (30040, "Curated Publication Index"),
    (30041, "Curated Publication Content"),
    (30063, "Release Artifact Sets"),
    (30078, "Application-specific Data"),
    (30311, "Live Event"),
    (30315, "User Statuses"),
    (30388, "Slide Set"),
    (30402, "Classified Listing"),
    (30403, "Draft Classified Listing"),
    (30617, "Repository Announcement"),
    (30618, "Repository State"),
    (30818, "Wiki Article"),
    (30819, "Wiki Redirect"),
    (31234, "Draft Event"),
    (31388, "Link Set"),
    (31890, "Feed"),
    (31922, "Date-Based Calendar Event"),
    (31923, "Time-Based Calendar Event"),
    (31924, "Calendar"),
    (31925, "Calendar Event RSVP"),
    (31989, "Handler Recommendation"),
    (HANDLER_INFORMATION, "Handler Information"),
    (34550, "Community Definition"),
    (38383, "Peer-to-peer Order"),
];

const KNOWN_RANGES: &[(RangeInclusive<u64>, &str)] = &[
    (1630..=1633, "Git Status"),
    (5000..=5999, "Job Request"),
    (6000..=6999, "Job Result"),
    (9000..=9030, "Group Control Event"),
    (39000..=39009, "Group Metadata"),
];

/// Whether `name` looks like a kind name and not like junk scraped from a
/// web page.
pub fn is_plausible_name(name: &str) -> bool {
    let name = name.trim();
    if name.is_empty() || name.chars().count() > MAX_NAME_LEN {
        return false;
    }

    let lower = name.to_ascii_lowercase();
    if lower.contains("://") || lower.starts_with("www.") || lower.contains("http") {
        return false;
    }

    !name
        .chars()
        .any(|c| c.is_control() || matches!(c, '<' | '>' | '{' | '}' | '[' | ']' | '|'))
}

/// The immutable kind -> name table.
#[derive(Debug, Clone)]
pub struct KindNames {
    names: HashMap<u64, String>,
}

impl Default for KindNames {
    fn default() -> Self {
        Self {
            names: KNOWN_KINDS
                .iter()
                .map(|(kind, name)| (*kind, (*name).to_owned()))
                .collect(),
        }
    }
}

impl KindNames {
    /// A table built only from `entries`. Implausible names are skipped.
    pub fn from_entries(entries: impl IntoIterator<Item = (u64, String)>) -> Self {
        let mut names = HashMap::new();
        for (kind, name) in entries {
            if is_plausible_name(&name) {
                names.insert(kind, name.trim().to_owned());
            } else {
                warn!("ignoring implausible name for kind {kind}: {name:?}");
            }
        }
        Self { names }
    }

    /// The curated table with `entries` layered on top.
    pub fn with_overrides(mut self, entries: impl IntoIterator<Item = (u64, String)>) -> Self {
        self.names.extend(Self::from_entries(entries).names);
        self
    }

    /// Curated table plus overrides from a JSON object file such as
    /// `{"30023": "Article"}`.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let raw: BTreeMap<String, String> = serde_json::from_str(&contents)
            .map_err(|err| Error::KindNames(format!("{}: {err}", path.display())))?;

        let mut entries = Vec::with_capacity(raw.len());
        for (kind, name) in raw {
            let kind = kind.trim().parse::<u64>().map_err(|_| {
                Error::KindNames(format!("{}: '{kind}' is not a kind number", path.display()))
            })?;
            entries.push((kind, name));
        }

        debug!("loaded {} kind names from {}", entries.len(), path.display());
        Ok(Self::default().with_overrides(entries))
    }

    pub fn get(&self, kind: u64) -> Option<&str> {
        self.names.get(&kind).map(String::as_str).or_else(|| {
            KNOWN_RANGES
                .iter()
                .find(|(range, _)| range.contains(&kind))
                .map(|(_, name)| *name)
        })
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

#[derive(Deserialize)]
struct HandlerMetadata {
    display_name: Option<String>,
    name: Option<String>,
}

/// Names learned from the notes of one fetch.
#[derive(Debug, Default)]
pub struct KindNameCache {
    learned: RwLock<HashMap<u64, String>>,
}

impl KindNameCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Learn which application handles a kind from NIP-89 handler notes.
    /// Returns how many new kinds were learned. Handlers with broken
    /// metadata are skipped.
    pub fn learn_from_handlers(&self, notes: &[Note]) -> usize {
        let mut learned = self.learned.write().unwrap_or_else(PoisonError::into_inner);
        let mut count = 0;

        for note in notes.iter().filter(|n| n.kind == HANDLER_INFORMATION) {
            let metadata: HandlerMetadata = match serde_json::from_str(&note.content) {
                Ok(metadata) => metadata,
                Err(err) => {
                    debug!("handler {} has unreadable metadata: {err}", note.id);
                    continue;
                }
            };

            let Some(app) = metadata
                .display_name
                .filter(|n| is_plausible_name(n))
                .or(metadata.name.filter(|n| is_plausible_name(n)))
            else {
                continue;
            };

            for kind in note.tag_values("k").filter_map(|k| k.trim().parse::<u64>().ok()) {
                if let hashbrown::hash_map::Entry::Vacant(entry) = learned.entry(kind) {
                    entry.insert(app.trim().to_owned());
                    count += 1;
                }
            }
        }

        count
    }

    pub fn get(&self, kind: u64) -> Option<String> {
        self.learned
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&kind)
            .cloned()
    }
}

/// Resolves kind names. Never fails.
#[derive(Debug, Default)]
pub struct KindNamer {
    names: KindNames,
    cache: KindNameCache,
}

impl KindNamer {
    pub fn new(names: KindNames) -> Self {
        Self {
            names,
            cache: KindNameCache::new(),
        }
    }

    pub fn cache(&self) -> &KindNameCache {
        &self.cache
    }

    pub fn name_of(&self, kind: u64) -> String {
        if let Some(name) = self.names.get(kind) {
            return name.to_owned();
        }

        match self.cache.get(kind) {
            Some(app) => format!("Kind {kind} ({app})"),
            None => format!("Kind {kind}"),
        }
    }
}
