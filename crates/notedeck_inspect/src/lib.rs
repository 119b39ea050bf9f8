pub mod args;
pub mod classify;
mod error;
pub mod fanout;
pub mod kinds;
pub mod label;
pub mod liveness;
pub mod render;
pub mod request;
pub mod session;
pub mod store;

#[cfg(test)]
mod test_utils;

pub use args::{Args, DEFAULT_RELAYS};
pub use classify::{classify, Classified, KindSelection, KindStats};
pub use error::Error;
pub use fanout::{FetchOptions, FetchOutcome, Fetcher};
pub use kinds::{KindNameCache, KindNamer, KindNames};
pub use liveness::{FetchObserver, Liveness, LivenessSnapshot, NoopObserver};
pub use request::{FetchRequest, ValidatedRequest};
pub use session::{EndpointSession, SessionOutcome, SessionState, Settlement, SESSION_TIMEOUT};
pub use store::MergeStore;

pub type Result<T> = std::result::Result<T, error::Error>;
