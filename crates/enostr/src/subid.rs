use std::hash::{Hash, Hasher};
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct SubId {
    /// A subscription id description used for debugging,
    /// since all subids are simply uuids by default for privacy
    description: String,
    id: String,
}

impl PartialEq for SubId {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for SubId {}

impl SubId {
    /// Create a subscription id that is a random uuid. A
    /// description is specified for debugging purposes
    pub fn new(description: impl Into<String>) -> Self {
        let id = Uuid::new_v4().to_string();
        Self {
            description: description.into(),
            id,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.id
    }

    pub fn matches(&self, other: &str) -> bool {
        self.id == other
    }
}

impl std::fmt::Display for SubId {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        // we don't really care to display the underlying uuid...
        write!(f, "SubId('{}', {}...)", self.description, abbrev_str(&self.id, 8))
    }
}

impl Hash for SubId {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

fn abbrev_str(s: &str, len: usize) -> &str {
    match s.char_indices().nth(len) {
        Some((end, _)) => &s[..end],
        None => s,
    }
}
