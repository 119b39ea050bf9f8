use std::io;

/// Request level failures. Anything that goes wrong with an individual relay
/// is absorbed by the fetcher and only shows up in the liveness counts.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("an author pubkey is required")]
    MissingAuthor,

    #[error("invalid author '{input}': {source}")]
    InvalidAuthor {
        input: String,
        #[source]
        source: enostr::Error,
    },

    #[error("no usable relays, relay urls must start with ws:// or wss://")]
    NoRelays,

    #[error("invalid kind names file: {0}")]
    KindNames(String),

    #[error("io error: {0}")]
    Io(#[from] io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}
