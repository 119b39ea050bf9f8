use std::sync::{Mutex, MutexGuard, PoisonError};

use enostr::{Note, NoteId};
use hashbrown::{hash_map::Entry, HashMap};

/// Notes from every relay session of one fetch, keyed by id.
///
/// The first copy of an id wins. The presence check and the insert happen
/// under the same lock, so two relays delivering the same note at the same
/// moment still produce a single entry.
#[derive(Default)]
pub struct MergeStore {
    notes: Mutex<HashMap<NoteId, Note>>,
}

impl MergeStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn notes(&self) -> MutexGuard<'_, HashMap<NoteId, Note>> {
        // a panicking session can't leave the map half written
        self.notes.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Stores a note not seen before and returns the count taken under the
    /// same lock. `None` for an id already present.
    pub fn insert(&self, note: Note) -> Option<usize> {
        let mut notes = self.notes();
        match notes.entry(note.id) {
            Entry::Occupied(_) => return None,
            Entry::Vacant(entry) => {
                entry.insert(note);
            }
        }
        Some(notes.len())
    }

    pub fn count(&self) -> usize {
        self.notes().len()
    }

    pub fn is_empty(&self) -> bool {
        self.count() == 0
    }

    /// Snapshot of every stored note, in no particular order.
    pub fn all(&self) -> Vec<Note> {
        self.notes().values().cloned().collect()
    }
}
