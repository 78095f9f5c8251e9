//! Application configuration loaded from environment variables.

use crate::error::{LedgerError, Result};

#[derive(Debug, Clone, Default)]
pub struct Config {
    /// Paystack secret key. Payment commands are disabled when absent.
    pub paystack_secret_key: Option<String>,
    /// Callback URL handed to the gateway on charge initialization.
    pub paystack_callback_url: Option<String>,
    /// Identities allowed to perform administrative operations.
    pub admin_emails: Vec<String>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let admin_emails = match env_var("ADMIN_EMAILS") {
            Ok(raw) => raw
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect(),
            Err(_) => Vec::new(),
        };
        Ok(Config {
            paystack_secret_key: env_var("PAYSTACK_SECRET_KEY").ok(),
            paystack_callback_url: env_var("PAYSTACK_CALLBACK_URL").ok(),
            admin_emails,
        })
    }
}

fn env_var(key: &str) -> Result<String> {
    std::env::var(key).map_err(|_| LedgerError::Validation(format!("missing env var: {key}")))
}
