//! Server endpoint parsing and scheme/port normalization.
//!
//! Normalization happens once, when the connection is constructed; every
//! later handshake attempt reuses the resolved endpoint as-is.

use thiserror::Error;
use url::Url;

/// Errors from endpoint parsing.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EndpointError {
    /// The URL could not be parsed.
    #[error("invalid endpoint url: {message}")]
    Invalid {
        /// Details from the URL parser.
        message: String,
    },

    /// The URL has no host component.
    #[error("endpoint url has no host")]
    MissingHost,
}

/// A resolved server endpoint.
///
/// Secure schemes (`https`, `wss`) normalize to a secure WebSocket endpoint
/// with default port 443; every other scheme normalizes to an insecure one
/// with default port 80. An explicit port in the URL always wins.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    secure: bool,
    host: String,
    port: u16,
    path_and_query: String,
}

impl Endpoint {
    /// Parse and normalize an endpoint URL.
    ///
    /// # Errors
    ///
    /// [`EndpointError`] when the URL is malformed or has no host.
    pub fn parse(raw: &str) -> Result<Self, EndpointError> {
        let parsed = Url::parse(raw).map_err(|err| EndpointError::Invalid {
            message: err.to_string(),
        })?;
        let secure = matches!(parsed.scheme(), "https" | "wss");
        let host = parsed
            .host_str()
            .ok_or(EndpointError::MissingHost)?
            .to_string();
        let port = parsed.port().unwrap_or(if secure { 443 } else { 80 });

        let mut path_and_query = parsed.path().to_string();
        if let Some(query) = parsed.query() {
            path_and_query.push('?');
            path_and_query.push_str(query);
        }

        Ok(Self {
            secure,
            host,
            port,
            path_and_query,
        })
    }

    /// Whether the endpoint uses the secure transport scheme.
    pub fn is_secure(&self) -> bool {
        self.secure
    }

    /// Host name or address.
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Resolved port.
    pub fn port(&self) -> u16 {
        self.port
    }

    /// `host:port`, as sent in the handshake `Host` header.
    pub fn authority(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Render the normalized `ws`/`wss` URL for the handshake request.
    pub fn url(&self) -> String {
        let scheme = if self.secure { "wss" } else { "ws" };
        format!("{}://{}:{}{}", scheme, self.host, self.port, self.path_and_query)
    }
}

impl std::fmt::Display for Endpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.url())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wss_defaults_to_secure_443() {
        let endpoint = Endpoint::parse("wss://chat.example.com/socket").expect("parse");
        assert!(endpoint.is_secure());
        assert_eq!(endpoint.port(), 443);
        assert_eq!(endpoint.url(), "wss://chat.example.com:443/socket");
    }

    #[test]
    fn https_normalizes_to_secure_websocket() {
        let endpoint = Endpoint::parse("https://chat.example.com").expect("parse");
        assert!(endpoint.is_secure());
        assert_eq!(endpoint.port(), 443);
        assert!(endpoint.url().starts_with("wss://"));
    }

    #[test]
    fn plain_schemes_default_to_insecure_80() {
        for raw in ["ws://chat.example.com", "http://chat.example.com"] {
            let endpoint = Endpoint::parse(raw).expect("parse");
            assert!(!endpoint.is_secure());
            assert_eq!(endpoint.port(), 80);
        }
    }

    #[test]
    fn explicit_port_wins() {
        let endpoint = Endpoint::parse("wss://chat.example.com:9443/socket").expect("parse");
        assert!(endpoint.is_secure());
        assert_eq!(endpoint.port(), 9443);
    }

    #[test]
    fn path_and_query_are_preserved() {
        let endpoint =
            Endpoint::parse("ws://chat.example.com/socket/v2?session=abc").expect("parse");
        assert_eq!(endpoint.url(), "ws://chat.example.com:80/socket/v2?session=abc");
    }

    #[test]
    fn malformed_url_is_rejected() {
        assert!(matches!(
            Endpoint::parse("not a url"),
            Err(EndpointError::Invalid { .. })
        ));
    }

    #[test]
    fn authority_includes_resolved_port() {
        let endpoint = Endpoint::parse("wss://chat.example.com").expect("parse");
        assert_eq!(endpoint.authority(), "chat.example.com:443");
    }
}
