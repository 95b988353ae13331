//! Route table types fed to the credential proxy on startup.

use serde::{Deserialize, Serialize};

/// How the agent authenticates against a route's loopback port.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "style", rename_all = "snake_case")]
pub enum AuthStyle {
    /// `Authorization: Bearer <session-token>`.
    Bearer,
    /// A custom header name carrying the session token.
    Header {
        /// Header name the agent is configured to send the token under.
        name: String,
    },
}

impl AuthStyle {
    /// The header name used for this auth style.
    #[must_use]
    pub fn header_name(&self) -> &str {
        match self {
            AuthStyle::Bearer => "authorization",
            AuthStyle::Header { name } => name,
        }
    }
}

/// One credential proxy route: a loopback port the agent talks to in place
/// of a real upstream, with the real credential injected on relay.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Route {
    /// Loopback port the proxy listens on for this route.
    pub loopback_port: u16,
    /// Upstream host (FQDN) this route relays to over TLS.
    pub upstream_host: String,
    /// The real provider credential, injected on the upstream leg only.
    pub real_key: String,
    /// Auth style the agent uses to authenticate to the loopback port.
    pub auth_style: AuthStyle,
    /// Session token the agent presents in place of the real credential.
    pub session_token: String,
}

/// The full route table, supplied as a single JSON line on standard input.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct RouteTable {
    /// Routes this proxy instance serves.
    pub routes: Vec<Route>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bearer_header_name_is_authorization() {
        assert_eq!(AuthStyle::Bearer.header_name(), "authorization");
    }

    #[test]
    fn custom_header_name_is_preserved() {
        let style = AuthStyle::Header {
            name: "x-session-token".to_owned(),
        };
        assert_eq!(style.header_name(), "x-session-token");
    }

    #[test]
    fn route_table_roundtrips_through_json() {
        let table = RouteTable {
            routes: vec![Route {
                loopback_port: 18080,
                upstream_host: "api.anthropic.com".to_owned(),
                real_key: "sk-real".to_owned(),
                auth_style: AuthStyle::Header {
                    name: "x-api-key".to_owned(),
                },
                session_token: "sess-token".to_owned(),
            }],
        };
        let json = serde_json::to_string(&table).unwrap();
        let parsed: RouteTable = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.routes[0].loopback_port, 18080);
    }
}
