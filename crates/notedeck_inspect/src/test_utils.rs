//! Scripted relays for unit tests.
//!
//! A [`ScriptedTransport`] hands out in-memory channels that answer a REQ
//! with a fixed list of notes followed by a scripted ending.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use enostr::ewebsock::{WsEvent, WsMessage};
use enostr::{ClientMessage, Note, NoteId, Pubkey, RelayUrl, Wakeup, WsChannel, WsTransport};

pub fn author() -> Pubkey {
    Pubkey::new([0xaa; 32])
}

pub fn test_note(id: u8, kind: u64, created_at: u64) -> Note {
    Note {
        id: NoteId::new([id; 32]),
        pubkey: author(),
        created_at,
        kind,
        tags: vec![],
        content: format!("note {id}"),
        sig: String::new(),
    }
}

#[derive(Clone, Debug)]
enum Ending {
    Eose,
    Silent,
    Closed(String),
    SocketError(String),
}

#[derive(Clone, Debug)]
pub struct RelayScript {
    notes: Vec<Note>,
    garbage: Vec<String>,
    ending: Ending,
    refuse: Option<String>,
}

impl RelayScript {
    fn new(notes: Vec<Note>, ending: Ending) -> Self {
        Self {
            notes,
            garbage: vec![],
            ending,
            refuse: None,
        }
    }

    pub fn eose(notes: Vec<Note>) -> Self {
        Self::new(notes, Ending::Eose)
    }

    /// Opens, accepts the REQ, never answers.
    pub fn silent() -> Self {
        Self::new(vec![], Ending::Silent)
    }

    pub fn silent_after(notes: Vec<Note>) -> Self {
        Self::new(notes, Ending::Silent)
    }

    pub fn closed(notes: Vec<Note>, reason: &str) -> Self {
        Self::new(notes, Ending::Closed(reason.to_owned()))
    }

    pub fn socket_error(notes: Vec<Note>, err: &str) -> Self {
        Self::new(notes, Ending::SocketError(err.to_owned()))
    }

    pub fn refuse(err: &str) -> Self {
        Self {
            refuse: Some(err.to_owned()),
            ..Self::silent()
        }
    }

    /// Send a raw text frame before the notes.
    pub fn with_garbage(mut self, frame: &str) -> Self {
        self.garbage.push(frame.to_owned());
        self
    }
}

#[derive(Default, Debug)]
struct ChannelLog {
    sent: Vec<String>,
    closed: usize,
}

type Logs = Arc<Mutex<HashMap<RelayUrl, ChannelLog>>>;

#[derive(Default, Clone)]
pub struct ScriptedTransport {
    scripts: HashMap<RelayUrl, RelayScript>,
    logs: Logs,
}

fn key(url: &str) -> RelayUrl {
    RelayUrl::new(url).expect("scripted relay url")
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn relay(mut self, url: &str, script: RelayScript) -> Self {
        self.scripts.insert(key(url), script);
        self
    }

    /// Frames the client sent to `url`.
    pub fn sent(&self, url: &str) -> Vec<String> {
        let logs = self.logs.lock().expect("logs");
        logs.get(&key(url))
            .map(|log| log.sent.clone())
            .unwrap_or_default()
    }

    pub fn closed_count(&self, url: &str) -> usize {
        let logs = self.logs.lock().expect("logs");
        logs.get(&key(url)).map_or(0, |log| log.closed)
    }
}

impl WsTransport for ScriptedTransport {
    fn connect(&self, url: &RelayUrl, wakeup: Wakeup) -> enostr::Result<Box<dyn WsChannel>> {
        let script = self
            .scripts
            .get(url)
            .cloned()
            .ok_or_else(|| enostr::Error::Generic(format!("no script for {url}")))?;

        if let Some(err) = script.refuse {
            return Err(enostr::Error::Generic(err));
        }

        self.logs
            .lock()
            .expect("logs")
            .entry(url.clone())
            .or_default();

        Ok(Box::new(ScriptedChannel {
            url: url.clone(),
            script,
            queue: VecDeque::from([WsEvent::Opened]),
            open: true,
            wakeup,
            logs: self.logs.clone(),
        }))
    }
}

struct ScriptedChannel {
    url: RelayUrl,
    script: RelayScript,
    queue: VecDeque<WsEvent>,
    open: bool,
    wakeup: Wakeup,
    logs: Logs,
}

impl ScriptedChannel {
    fn text(&mut self, frame: String) {
        self.queue.push_back(WsEvent::Message(WsMessage::Text(frame)));
    }

    fn answer_req(&mut self, sub_id: &str) {
        for frame in self.script.garbage.clone() {
            self.text(frame);
        }

        for note in self.script.notes.clone() {
            let note = serde_json::to_string(&note).expect("note json");
            self.text(format!("[\"EVENT\",\"{sub_id}\",{note}]"));
        }

        match self.script.ending.clone() {
            Ending::Eose => self.text(format!("[\"EOSE\",\"{sub_id}\"]")),
            Ending::Closed(reason) => self.text(format!("[\"CLOSED\",\"{sub_id}\",\"{reason}\"]")),
            Ending::SocketError(err) => self.queue.push_back(WsEvent::Error(err)),
            Ending::Silent => {}
        }

        (self.wakeup)();
    }
}

impl WsChannel for ScriptedChannel {
    fn url(&self) -> &RelayUrl {
        &self.url
    }

    fn send(&mut self, msg: &ClientMessage) {
        if !self.open {
            return;
        }

        let json = msg.to_json().expect("client message json");
        if let Some(log) = self.logs.lock().expect("logs").get_mut(&self.url) {
            log.sent.push(json);
        }

        if let ClientMessage::Req { sub_id, .. } = msg {
            self.answer_req(sub_id);
        }
    }

    fn try_recv(&mut self) -> Option<WsEvent> {
        if !self.open {
            return None;
        }
        self.queue.pop_front()
    }

    fn close(&mut self) {
        if !self.open {
            return;
        }
        self.open = false;
        if let Some(log) = self.logs.lock().expect("logs").get_mut(&self.url) {
            log.closed += 1;
        }
    }
}
