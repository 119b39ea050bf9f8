use crate::{Error, Result};

#[derive(Debug, Eq, PartialEq)]
pub struct CommandResult<'a> {
    event_id: &'a str,
    status: bool,
    message: &'a str,
}

impl<'a> CommandResult<'a> {
    pub fn event_id(&self) -> &'a str {
        self.event_id
    }

    pub fn status(&self) -> bool {
        self.status
    }

    pub fn message(&self) -> &'a str {
        self.message
    }
}

#[derive(Debug, Eq, PartialEq)]
pub enum RelayMessage<'a> {
    OK(CommandResult<'a>),
    Eose(&'a str),
    /// subscription id, then the full frame so callers can decode the note
    Event(&'a str, &'a str),
    Notice(&'a str),
    /// subscription id and the relay's reason for closing it
    Closed(&'a str, &'a str),
}

impl<'a> RelayMessage<'a> {
    pub fn eose(subid: &'a str) -> Self {
        RelayMessage::Eose(subid)
    }

    pub fn notice(msg: &'a str) -> Self {
        RelayMessage::Notice(msg)
    }

    pub fn ok(event_id: &'a str, status: bool, message: &'a str) -> Self {
        RelayMessage::OK(CommandResult {
            event_id,
            status,
            message,
        })
    }

    pub fn event(ev: &'a str, sub_id: &'a str) -> Self {
        RelayMessage::Event(sub_id, ev)
    }

    pub fn closed(sub_id: &'a str, reason: &'a str) -> Self {
        RelayMessage::Closed(sub_id, reason)
    }

    pub fn from_json(msg: &'a str) -> Result<RelayMessage<'a>> {
        if msg.is_empty() {
            return Err(Error::Empty);
        }

        // make sure we can inspect the begning of the message below ...
        if msg.len() < 12 {
            return Err(Error::DecodeFailed("message too short".into()));
        }

        // Notice
        // Relay response format: ["NOTICE", <message>]
        if msg.starts_with("[\"NOTICE\",") {
            let start = if msg.as_bytes().get(10).copied() == Some(b' ') {
                12
            } else {
                11
            };
            let end = msg.len() - 2;
            return msg
                .get(start..end)
                .map(Self::notice)
                .ok_or_else(|| Error::DecodeFailed("Invalid NOTICE format".into()));
        }

        // Event
        // Relay response format: ["EVENT", <subscription id>, <event JSON>]
        if msg.starts_with("[\"EVENT\"") {
            let mut start = 9;
            while let Some(&b' ') = msg.as_bytes().get(start) {
                start += 1; // Move past optional spaces
            }
            if let Some(comma_index) = msg.get(start..).and_then(|rest| rest.find(',')) {
                let subid_end = start + comma_index;
                let subid = msg[start..subid_end].trim().trim_matches('"');
                return Ok(Self::event(msg, subid));
            } else {
                return Err(Error::DecodeFailed("Invalid EVENT format".into()));
            }
        }

        // EOSE (NIP-15)
        // Relay response format: ["EOSE", <subscription_id>]
        if msg.starts_with("[\"EOSE\",") {
            let start = if msg.as_bytes().get(8).copied() == Some(b' ') {
                10 // Skip space after the comma
            } else {
                9 // Start immediately after the comma
            };

            if let Some(end_bracket_index) = msg.rfind(']') {
                let end = end_bracket_index - 1; // Account for space before bracket
                if let Some(subid) = msg.get(start..end).filter(|_| start < end) {
                    let subid = subid.trim().trim_matches('"').trim();
                    return Ok(RelayMessage::eose(subid));
                }
            }
            return Err(Error::DecodeFailed(
                "Invalid subscription ID or format".into(),
            ));
        }

        // CLOSED (NIP-01)
        // Relay response format: ["CLOSED", <subscription_id>, <message>]
        if msg.starts_with("[\"CLOSED\",") {
            return Self::parse_closed(&msg[10..]);
        }

        // OK (NIP-20)
        // Relay response format: ["OK",<event_id>, <true|false>, <message>]
        if msg.starts_with("[\"OK\",") && msg.len() >= 78 {
            let (Some(event_id), Some(booly)) = (msg.get(7..71), msg.get(73..)) else {
                return Err(Error::DecodeFailed("Invalid OK format".into()));
            };
            let status: bool = if booly.starts_with("true") {
                true
            } else if booly.starts_with("false") {
                false
            } else {
                return Err(Error::DecodeFailed("bad boolean value".into()));
            };
            let message_start = msg
                .rfind(',')
                .ok_or_else(|| Error::DecodeFailed("missing OK message".into()))?
                + 1;
            let message = msg
                .get(message_start..msg.len() - 2)
                .unwrap_or_default()
                .trim()
                .trim_matches('"');
            return Ok(Self::ok(event_id, status, message));
        }

        Err(Error::DecodeFailed(format!(
            "unrecognized message type: '{msg}'"
        )))
    }

    fn parse_closed(rest: &'a str) -> Result<RelayMessage<'a>> {
        let invalid = || Error::DecodeFailed("Invalid CLOSED format".into());

        let rest = rest.trim_start();
        let rest = rest.strip_prefix('"').ok_or_else(invalid)?;
        let subid_end = rest.find('"').ok_or_else(invalid)?;
        let subid = &rest[..subid_end];

        let tail = rest[subid_end + 1..].trim_start();
        let reason = match tail.strip_prefix(',') {
            Some(reason) => reason
                .trim_end()
                .trim_end_matches(']')
                .trim()
                .trim_matches('"'),
            None => "",
        };

        Ok(Self::closed(subid, reason))
    }
}
