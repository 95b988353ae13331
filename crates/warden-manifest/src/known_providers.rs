//! The built-in known-provider table.
//!
//! A manifest declaring one of these provider ids cannot redirect its
//! upstream domain or claim its conventional env-var name for another
//! provider — see invariants 7 and 8 in [`crate::validate`].

use crate::types::{KnownAuthStyle, KnownProvider};

/// Every provider the supervisor recognizes by built-in routing metadata.
pub const KNOWN_PROVIDERS: &[KnownProvider] = &[
    KnownProvider {
        id: "anthropic",
        domain: "api.anthropic.com",
        env_var: "ANTHROPIC_API_KEY",
        base_url_env_var: Some("ANTHROPIC_BASE_URL"),
        auth_style: KnownAuthStyle::Header("x-api-key"),
    },
    KnownProvider {
        id: "openai",
        domain: "api.openai.com",
        env_var: "OPENAI_API_KEY",
        base_url_env_var: Some("OPENAI_BASE_URL"),
        auth_style: KnownAuthStyle::Bearer,
    },
];

/// Look up a known provider by id.
#[must_use]
pub fn lookup(provider_id: &str) -> Option<&'static KnownProvider> {
    KNOWN_PROVIDERS.iter().find(|p| p.id == provider_id)
}

/// Whether any known provider's token or base-url env-var equals `name`.
#[must_use]
pub fn is_reserved_env_var(name: &str) -> bool {
    KNOWN_PROVIDERS
        .iter()
        .any(|p| p.env_var == name || p.base_url_env_var == Some(name))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn anthropic_is_known() {
        let p = lookup("anthropic").unwrap();
        assert_eq!(p.domain, "api.anthropic.com");
        assert_eq!(p.auth_style, KnownAuthStyle::Header("x-api-key"));
    }

    #[test]
    fn unknown_provider_returns_none() {
        assert!(lookup("evil").is_none());
    }

    #[test]
    fn reserved_env_vars_cover_both_known_providers() {
        assert!(is_reserved_env_var("ANTHROPIC_API_KEY"));
        assert!(is_reserved_env_var("OPENAI_BASE_URL"));
        assert!(!is_reserved_env_var("CUSTOM_API_KEY"));
    }
}
