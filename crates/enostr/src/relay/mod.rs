use ewebsock::{Options, WsEvent, WsMessage, WsReceiver, WsSender};

use crate::{ClientMessage, Filter, Result};
use std::fmt;
use std::hash::{Hash, Hasher};
use tracing::{debug, error};

pub mod message;
pub mod url;

pub use self::url::RelayUrl;

/// Called from the socket thread whenever something is waiting in the
/// receiver.
pub type Wakeup = Box<dyn Fn() + Send + Sync + 'static>;

/// Opens websocket channels. The production implementation is
/// [`WebsocketTransport`]; tests plug in scripted channels.
pub trait WsTransport: Send + Sync + 'static {
    fn connect(&self, url: &RelayUrl, wakeup: Wakeup) -> Result<Box<dyn WsChannel>>;
}

/// One open connection to one relay.
pub trait WsChannel: Send {
    fn url(&self) -> &RelayUrl;

    fn send(&mut self, msg: &ClientMessage);

    /// Next buffered socket event, without blocking.
    fn try_recv(&mut self) -> Option<WsEvent>;

    /// Releases the socket. Safe to call more than once.
    fn close(&mut self);

    fn subscribe(&mut self, subid: String, filters: Vec<Filter>) {
        debug!("sending '{}' subscription to {}: {:?}", subid, self.url(), filters);
        self.send(&ClientMessage::req(subid, filters));
    }

    fn unsubscribe(&mut self, subid: String) {
        self.send(&ClientMessage::close(subid));
    }
}

#[derive(Default, Clone, Copy, Debug)]
pub struct WebsocketTransport;

impl WsTransport for WebsocketTransport {
    fn connect(&self, url: &RelayUrl, wakeup: Wakeup) -> Result<Box<dyn WsChannel>> {
        Ok(Box::new(Relay::new(url.clone(), wakeup)?))
    }
}

pub struct Relay {
    pub url: RelayUrl,
    sender: Option<WsSender>,
    receiver: WsReceiver,
}

impl fmt::Debug for Relay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Relay")
            .field("url", &self.url)
            .field("open", &self.sender.is_some())
            .finish()
    }
}

impl Hash for Relay {
    fn hash<H: Hasher>(&self, state: &mut H) {
        // Hashes the Relay by hashing the URL
        self.url.hash(state);
    }
}

impl PartialEq for Relay {
    fn eq(&self, other: &Self) -> bool {
        self.url == other.url
    }
}

impl Eq for Relay {}

impl Relay {
    pub fn new(url: RelayUrl, wakeup: impl Fn() + Send + Sync + 'static) -> Result<Self> {
        let (sender, receiver) =
            ewebsock::connect_with_wakeup(url.as_str(), Options::default(), wakeup)?;

        Ok(Self {
            url,
            sender: Some(sender),
            receiver,
        })
    }
}

impl WsChannel for Relay {
    fn url(&self) -> &RelayUrl {
        &self.url
    }

    fn send(&mut self, msg: &ClientMessage) {
        let Some(sender) = &mut self.sender else {
            debug!("dropping message to closed relay {}", self.url);
            return;
        };

        let json = match msg.to_json() {
            Ok(json) => {
                debug!("sending {} to {}", json, self.url);
                json
            }
            Err(e) => {
                error!("error serializing json for filter: {e}");
                return;
            }
        };

        sender.send(WsMessage::Text(json));
    }

    fn try_recv(&mut self) -> Option<WsEvent> {
        let event = self.receiver.try_recv()?;

        match &event {
            WsEvent::Error(err) => {
                debug!("{}: {}", self.url, err);
            }
            WsEvent::Message(WsMessage::Ping(bs)) => {
                debug!("pong {}", &self.url);
                if let Some(sender) = &mut self.sender {
                    sender.send(WsMessage::Pong(bs.to_owned()));
                }
            }
            _ => {}
        }

        Some(event)
    }

    fn close(&mut self) {
        // dropping the sender shuts the socket thread down
        if self.sender.take().is_some() {
            debug!("closing connection to {}", self.url);
        }
    }
}

impl Drop for Relay {
    fn drop(&mut self) {
        self.close();
    }
}
