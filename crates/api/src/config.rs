//! Configuration loaded from the process environment

use flowaudit_billing::{StripeConfig, DEFAULT_FREE_AUDIT_LIMIT};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
    #[error("{name} is invalid: {reason}")]
    Invalid { name: &'static str, reason: String },
}

/// How identity tokens are verified
#[derive(Clone)]
pub enum AuthKey {
    /// RS256 public key (PEM) published by the identity provider
    RsaPem(String),
    /// HS256 shared secret, for local development and tests
    Secret(String),
}

impl std::fmt::Debug for AuthKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuthKey::RsaPem(_) => f.write_str("AuthKey::RsaPem([REDACTED])"),
            AuthKey::Secret(_) => f.write_str("AuthKey::Secret([REDACTED])"),
        }
    }
}

#[derive(Clone)]
pub struct Config {
    pub database_url: String,
    /// Direct connection for migrations (bypasses a transaction pooler)
    pub database_direct_url: Option<String>,
    pub bind_address: String,
    /// Public URL of the web app, used for billing redirects
    pub app_url: String,
    pub allowed_origins: Vec<String>,
    pub run_migrations: bool,
    pub auth_key: AuthKey,
    pub auth_issuer: Option<String>,
    pub openai_api_key: String,
    pub openai_base_url: String,
    pub pro_model: String,
    pub free_model: String,
    pub free_audit_limit: i64,
    pub enable_billing: bool,
    /// Present only when every Stripe variable is set
    pub stripe: Option<StripeConfig>,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("database_url", &"[REDACTED]")
            .field("bind_address", &self.bind_address)
            .field("app_url", &self.app_url)
            .field("allowed_origins", &self.allowed_origins)
            .field("run_migrations", &self.run_migrations)
            .field("auth_key", &self.auth_key)
            .field("auth_issuer", &self.auth_issuer)
            .field("openai_api_key", &"[REDACTED]")
            .field("openai_base_url", &self.openai_base_url)
            .field("pro_model", &self.pro_model)
            .field("free_model", &self.free_model)
            .field("free_audit_limit", &self.free_audit_limit)
            .field("enable_billing", &self.enable_billing)
            .field("stripe", &self.stripe)
            .finish()
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from an arbitrary variable source. Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        let require = |name: &'static str| get(name).ok_or(ConfigError::Missing(name));

        let auth_key = match (get("CLERK_JWT_KEY"), get("AUTH_JWT_SECRET")) {
            (Some(pem), _) => AuthKey::RsaPem(pem.replace("\\n", "\n")),
            (None, Some(secret)) => AuthKey::Secret(secret),
            (None, None) => return Err(ConfigError::Missing("CLERK_JWT_KEY or AUTH_JWT_SECRET")),
        };

        let free_audit_limit = match get("FREE_AUDIT_LIMIT") {
            Some(raw) => raw.trim().parse::<i64>().ok().filter(|n| *n >= 0).ok_or_else(|| {
                ConfigError::Invalid {
                    name: "FREE_AUDIT_LIMIT",
                    reason: format!("expected a non-negative integer, got {:?}", raw),
                }
            })?,
            None => DEFAULT_FREE_AUDIT_LIMIT,
        };

        let stripe = match (
            get("STRIPE_SECRET_KEY"),
            get("STRIPE_WEBHOOK_SECRET"),
            get("STRIPE_PRO_PRICE_ID"),
        ) {
            (Some(secret_key), Some(webhook_secret), Some(pro_price_id)) => Some(StripeConfig {
                secret_key,
                webhook_secret,
                pro_price_id,
            }),
            _ => None,
        };

        Ok(Self {
            database_url: require("DATABASE_URL")?,
            database_direct_url: get("DATABASE_DIRECT_URL"),
            bind_address: get("BIND_ADDRESS").unwrap_or_else(|| "0.0.0.0:8080".to_string()),
            app_url: get("APP_URL")
                .unwrap_or_else(|| "http://localhost:3000".to_string())
                .trim_end_matches('/')
                .to_string(),
            allowed_origins: get("ALLOWED_ORIGINS")
                .unwrap_or_else(|| "http://localhost:3000,http://127.0.0.1:3000".to_string())
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
            run_migrations: parse_bool(get("RUN_MIGRATIONS"), true),
            auth_key,
            auth_issuer: get("AUTH_JWT_ISSUER"),
            openai_api_key: require("OPENAI_API_KEY")?,
            openai_base_url: get("OPENAI_BASE_URL")
                .unwrap_or_else(|| "https://api.openai.com/v1".to_string())
                .trim_end_matches('/')
                .to_string(),
            pro_model: get("PRO_MODEL").unwrap_or_else(|| "gpt-4o".to_string()),
            free_model: get("FREE_MODEL").unwrap_or_else(|| "gpt-4o-mini".to_string()),
            free_audit_limit,
            enable_billing: parse_bool(get("ENABLE_BILLING"), true),
            stripe,
        })
    }
}

fn parse_bool(value: Option<String>, default: bool) -> bool {
    match value.as_deref().map(str::trim).map(str::to_ascii_lowercase).as_deref() {
        Some("1" | "true" | "yes" | "on") => true,
        Some("0" | "false" | "no" | "off") => false,
        _ => default,
    }
}
