use std::cmp::{Ordering, Reverse};
use std::collections::BTreeMap;

use enostr::Note;
use serde::Serialize;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct KindStats {
    pub total: usize,
    pub unique_kinds: usize,
}

/// Notes grouped by kind, each group newest first.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Classified {
    pub groups: BTreeMap<u64, Vec<Note>>,
    pub stats: KindStats,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum KindSelection {
    #[default]
    All,
    Kind(u64),
}

impl From<Option<u64>> for KindSelection {
    fn from(kind: Option<u64>) -> Self {
        kind.map_or(KindSelection::All, KindSelection::Kind)
    }
}

/// Newest first. Equal timestamps fall back to the id so the order is stable
/// across runs no matter which relay answered first.
fn newest_first(a: &Note, b: &Note) -> Ordering {
    (Reverse(a.created_at), a.id).cmp(&(Reverse(b.created_at), b.id))
}

pub fn classify(notes: &[Note]) -> Classified {
    let mut groups: BTreeMap<u64, Vec<Note>> = BTreeMap::new();
    for note in notes {
        groups.entry(note.kind).or_default().push(note.clone());
    }

    for group in groups.values_mut() {
        group.sort_by(newest_first);
    }

    let stats = KindStats {
        total: notes.len(),
        unique_kinds: groups.len(),
    };

    Classified { groups, stats }
}

impl Classified {
    pub fn is_empty(&self) -> bool {
        self.stats.total == 0
    }

    /// Read side view for display. A single kind is returned as is, `All`
    /// merges every group back into one newest first list.
    pub fn select(&self, selection: KindSelection) -> Vec<&Note> {
        match selection {
            KindSelection::Kind(kind) => self
                .groups
                .get(&kind)
                .map(|group| group.iter().collect())
                .unwrap_or_default(),
            KindSelection::All => {
                let mut all: Vec<&Note> = self.groups.values().flatten().collect();
                all.sort_by(|a, b| newest_first(a, b));
                all
            }
        }
    }
}
