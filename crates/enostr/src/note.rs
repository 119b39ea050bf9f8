use crate::{Error, Pubkey};

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::hash::{Hash, Hasher};

#[derive(Clone, Copy, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct NoteId([u8; 32]);

impl fmt::Debug for NoteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.hex())
    }
}

impl fmt::Display for NoteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.hex())
    }
}

impl NoteId {
    pub fn new(bytes: [u8; 32]) -> Self {
        NoteId(bytes)
    }

    pub fn bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn hex(&self) -> String {
        hex::encode(self.bytes())
    }

    pub fn from_hex(hex_str: &str) -> Result<Self, Error> {
        Ok(NoteId(hex::decode(hex_str)?.as_slice().try_into()?))
    }
}

/// A nostr event as delivered by a relay.
///
/// Two notes are equal when their ids are equal. The id is derived from the
/// event content, so whichever relay delivered a copy is irrelevant.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Note {
    /// 32-bytes sha256 of the the serialized event data
    pub id: NoteId,
    /// 32-bytes hex-encoded public key of the event creator
    pub pubkey: Pubkey,
    /// unix timestamp in seconds
    pub created_at: u64,
    pub kind: u64,
    #[serde(default)]
    pub tags: Vec<Vec<String>>,
    /// arbitrary string
    #[serde(default)]
    pub content: String,
    /// signatures are checked upstream, we only carry them along
    #[serde(default)]
    pub sig: String,
}

impl Hash for Note {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.0.hash(state);
    }
}

impl PartialEq for Note {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Note {}

impl Note {
    pub fn from_json(s: &str) -> Result<Self, Error> {
        serde_json::from_str(s).map_err(Into::into)
    }

    /// Pull the note out of a full `["EVENT", <subid>, <note>]` relay frame.
    pub fn from_relay_event(frame: &str) -> Result<Self, Error> {
        let (tag, _subid, note): (String, String, Note) = serde_json::from_str(frame)?;
        if tag != "EVENT" {
            return Err(Error::DecodeFailed(format!("expected EVENT frame, got {tag}")));
        }
        Ok(note)
    }

    /// Values of every tag named `name`, ie. the `k` in `["k", "1"]`.
    pub fn tag_values<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.tags
            .iter()
            .filter(move |tag| tag.first().map(String::as_str) == Some(name))
            .filter_map(|tag| tag.get(1).map(String::as_str))
    }
}

impl Serialize for NoteId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.hex())
    }
}

impl<'de> Deserialize<'de> for NoteId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        NoteId::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EVENT: &str = r#"["EVENT", "sub", {"id":"70b10f70c1318967eddf12527799411b1a9780ad9c43858f5e5fcd45486a13a5","pubkey":"379e863e8357163b5bce5d2688dc4f1dcc2d505222fb8d74db600f30535dfdfe","created_at":1612809991,"kind":1,"tags":[["k","1"],["p","abc"]],"content":"test","sig":"273a9cd5d11455590f4359500bccb7a89428262b96b3ea87a756b770964472f8c3e87f5d5e64d8d2e859a71462a3f477b554565c4f2f326cb01dd7620db71502"}]"#;

    #[test]
    fn parses_relay_event_frame() {
        let note = Note::from_relay_event(EVENT).expect("note");
        assert_eq!(
            note.id.hex(),
            "70b10f70c1318967eddf12527799411b1a9780ad9c43858f5e5fcd45486a13a5"
        );
        assert_eq!(note.created_at, 1612809991);
        assert_eq!(note.kind, 1);
        assert_eq!(note.content, "test");
        assert_eq!(note.tag_values("k").collect::<Vec<_>>(), vec!["1"]);
    }

    #[test]
    fn rejects_frame_without_note() {
        assert!(Note::from_relay_event(r#"["EVENT","sub"]"#).is_err());
        assert!(Note::from_relay_event(r#"["EVENT","sub",{"id":"zz"}]"#).is_err());
    }

    #[test]
    fn notes_compare_by_id() {
        let a = Note::from_relay_event(EVENT).expect("note");
        let mut b = a.clone();
        b.content = "edited by a sloppy relay".to_owned();
        assert_eq!(a, b);
    }

    #[test]
    fn short_note_id_is_rejected() {
        assert!(NoteId::from_hex("abcd").is_err());
    }
}
