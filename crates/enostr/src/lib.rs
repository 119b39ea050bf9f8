mod client;
mod error;
mod filter;
mod note;
mod pubkey;
mod relay;
mod subid;

pub use client::ClientMessage;
pub use error::Error;
pub use ewebsock;
pub use filter::Filter;
pub use note::{Note, NoteId};
pub use pubkey::{normalize, Pubkey};
pub use relay::message::RelayMessage;
pub use relay::{
    Relay, RelayUrl, WebsocketTransport, Wakeup, WsChannel, WsTransport,
};
pub use subid::SubId;

pub type Result<T> = std::result::Result<T, error::Error>;
