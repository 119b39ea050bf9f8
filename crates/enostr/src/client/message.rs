use crate::{Error, Filter, Note};
use serde_json::json;

/// Messages sent by clients, received by relays
#[derive(Debug)]
pub enum ClientMessage {
    Event(Note),
    Req {
        sub_id: String,
        filters: Vec<Filter>,
    },
    Close {
        sub_id: String,
    },
}

impl ClientMessage {
    pub fn event(note: Note) -> Self {
        ClientMessage::Event(note)
    }

    pub fn req(sub_id: String, filters: Vec<Filter>) -> Self {
        ClientMessage::Req { sub_id, filters }
    }

    pub fn close(sub_id: String) -> Self {
        ClientMessage::Close { sub_id }
    }

    pub fn to_json(&self) -> Result<String, Error> {
        Ok(match self {
            Self::Event(note) => format!("[\"EVENT\",{}]", serde_json::to_string(note)?),
            Self::Req { sub_id, filters } => {
                if filters.is_empty() {
                    format!("[\"REQ\",\"{}\",{{}}]", sub_id)
                } else {
                    let filters_json_str: Result<Vec<String>, Error> = filters
                        .iter()
                        .map(|f| f.json().map_err(Into::<Error>::into))
                        .collect();
                    format!("[\"REQ\",\"{}\",{}]", sub_id, filters_json_str?.join(","))
                }
            }
            Self::Close { sub_id } => json!(["CLOSE", sub_id]).to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Pubkey;
    use pretty_assertions::assert_eq;

    #[test]
    fn req_with_single_filter() {
        let pk = Pubkey::new([3; 32]);
        let msg = ClientMessage::req("abc".to_owned(), vec![Filter::new().authors(&[pk])]);
        assert_eq!(
            msg.to_json().expect("json"),
            format!("[\"REQ\",\"abc\",{{\"authors\":[\"{}\"]}}]", pk.hex())
        );
    }

    #[test]
    fn req_without_filters_sends_empty_object() {
        let msg = ClientMessage::req("abc".to_owned(), vec![]);
        assert_eq!(msg.to_json().expect("json"), "[\"REQ\",\"abc\",{}]");
    }

    #[test]
    fn close_frame() {
        let msg = ClientMessage::close("abc".to_owned());
        assert_eq!(msg.to_json().expect("json"), "[\"CLOSE\",\"abc\"]");
    }
}
