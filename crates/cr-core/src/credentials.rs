//! Credential resolution capability: credential sourcing is polymorphic.
//! The core only knows provider names and the environment variable names it
//! *asks about* — discovery (env / keychain / on-disk config) is an external
//! collaborator's job.
//!
//! Grounded in `at-intelligence::api_profiles::ApiProfile` (`has_api_key`,
//! `default_api_key_env`), generalized from "one profile per provider" to
//! an opaque `resolve(provider) -> token` capability so `cr-proxy` never
//! has to know how a token was found.

/// Environment variable names the core asks the resolver about. Naming the
/// constants (rather than sprinkling the literal strings) keeps `cr-proxy`'s
/// calls to `resolve_credentials` self-documenting.
pub const BLOCKRUN_WALLET_KEY: &str = "BLOCKRUN_WALLET_KEY";
pub const ANTHROPIC_API_KEY: &str = "ANTHROPIC_API_KEY";
pub const OPENAI_API_KEY: &str = "OPENAI_API_KEY";
pub const CLAUDE_CODE_OAUTH_TOKEN: &str = "CLAUDE_CODE_OAUTH_TOKEN";

/// Capability the core depends on but never implements the discovery
/// strategy for. `POST /reload` calls `invalidate()` to signal the
/// collaborator to drop any cached credential state.
pub trait CredentialResolver: Send + Sync {
    /// Resolve a bearer/API token for the named provider ("anthropic",
    /// "openai", "google", "deepseek", ...). `None` means no credential is
    /// currently available.
    fn resolve(&self, provider: &str) -> Option<String>;

    /// Invalidate any cached resolution state. No-op for resolvers that
    /// don't cache.
    fn invalidate(&self) {}
}

/// A resolver that reads directly from process environment variables. This
/// is the simplest possible implementation of the capability — real
/// deployments may layer keychain or on-disk config lookups ahead of it,
/// which is explicitly out of scope for the core (see SPEC_FULL.md).
#[derive(Debug, Default, Clone)]
pub struct EnvCredentialResolver;

impl EnvCredentialResolver {
    pub fn new() -> Self {
        Self
    }

    fn env_var_for(provider: &str) -> Option<&'static str> {
        match provider {
            "anthropic" => Some(ANTHROPIC_API_KEY),
            "openai" => Some(OPENAI_API_KEY),
            _ => None,
        }
    }
}

impl CredentialResolver for EnvCredentialResolver {
    fn resolve(&self, provider: &str) -> Option<String> {
        let var = Self::env_var_for(provider)?;
        std::env::var(var).ok().filter(|v| !v.is_empty())
    }
}
