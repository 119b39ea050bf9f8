use std::fmt::{self, Display};

use url::Url;

use crate::Error;

const SCHEMES: [&str; 2] = ["wss://", "ws://"];

/// A relay address that starts with a websocket scheme.
///
/// The scheme prefix is the only thing we validate. Anything after it is
/// canonicalized when it parses as a url and kept verbatim otherwise.
#[derive(Eq, PartialEq, Hash, Clone, Debug, PartialOrd, Ord)]
pub struct RelayUrl {
    url: String,
}

impl RelayUrl {
    pub fn new(url: &str) -> Result<Self, Error> {
        let url = url.trim();
        if !has_websocket_scheme(url) {
            return Err(Error::InvalidRelayUrl(url.to_owned()));
        }

        Ok(Self {
            url: canonicalize_url(url.to_owned()),
        })
    }

    pub fn as_str(&self) -> &str {
        &self.url
    }
}

impl Display for RelayUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.url)
    }
}

impl From<RelayUrl> for String {
    fn from(value: RelayUrl) -> Self {
        value.url
    }
}

fn has_websocket_scheme(url: &str) -> bool {
    SCHEMES.iter().any(|scheme| {
        url.get(..scheme.len())
            .is_some_and(|prefix| prefix.eq_ignore_ascii_case(scheme))
    })
}

// standardize the format (ie, trailing slashes)
fn canonicalize_url(url: String) -> String {
    match Url::parse(&url) {
        Ok(parsed_url) => parsed_url.to_string(),
        Err(_) => url, // If parsing fails, return the original URL.
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_websocket_schemes() {
        assert!(RelayUrl::new("wss://relay.damus.io").is_ok());
        assert!(RelayUrl::new("ws://127.0.0.1:7777").is_ok());
        assert!(RelayUrl::new("WSS://nos.lol").is_ok());
    }

    #[test]
    fn rejects_other_schemes() {
        assert!(RelayUrl::new("https://relay.damus.io").is_err());
        assert!(RelayUrl::new("relay.damus.io").is_err());
        assert!(RelayUrl::new("").is_err());
        assert!(RelayUrl::new("wss:/relay.damus.io").is_err());
    }

    #[test]
    fn canonicalizes_trailing_slash_and_case() {
        let a = RelayUrl::new("wss://Relay.Damus.io").expect("url");
        let b = RelayUrl::new("wss://relay.damus.io/").expect("url");
        assert_eq!(a, b);
        assert_eq!(a.as_str(), "wss://relay.damus.io/");
    }
}
