//! Paystack gateway adapter.
//!
//! The core works in major currency units; everything crossing this boundary
//! is in the gateway's minor unit (kobo). Transport and protocol failures
//! both surface as `Upstream` errors; retry policy belongs to the caller.

use crate::domain::ports::{
    ChargeInit, ChargeRequest, ChargeStatus, ChargeVerification, PaymentGateway,
};
use crate::domain::program::ProgramId;
use crate::error::{LedgerError, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use tracing::debug;

const DEFAULT_BASE_URL: &str = "https://api.paystack.co";
const REQUEST_TIMEOUT_SECS: u64 = 30;

pub struct PaystackGateway {
    client: Client,
    secret_key: String,
    base_url: String,
    callback_url: Option<String>,
}

impl PaystackGateway {
    pub fn new(secret_key: &str, callback_url: Option<&str>) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| LedgerError::Upstream(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            secret_key: secret_key.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            callback_url: callback_url.map(str::to_string),
        })
    }

    /// Points the adapter at a different endpoint (test servers).
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }
}

// ── Gateway response shapes ──────────────────────────────

#[derive(Debug, Deserialize)]
struct InitializeResponse {
    data: InitializeData,
}

#[derive(Debug, Deserialize)]
struct InitializeData {
    authorization_url: String,
    access_code: String,
    reference: String,
}

#[derive(Debug, Deserialize)]
struct VerifyResponse {
    data: VerifyData,
}

#[derive(Debug, Deserialize)]
struct VerifyData {
    status: String,
    amount: i64,
    paid_at: Option<DateTime<Utc>>,
    metadata: VerifyMetadata,
}

#[derive(Debug, Deserialize)]
struct VerifyMetadata {
    program_id: String,
}

fn parse_status(status: &str) -> ChargeStatus {
    match status {
        "success" => ChargeStatus::Success,
        "failed" => ChargeStatus::Failed,
        "abandoned" => ChargeStatus::Abandoned,
        "pending" => ChargeStatus::Pending,
        _ => ChargeStatus::Unknown,
    }
}

#[async_trait]
impl PaymentGateway for PaystackGateway {
    async fn initialize_charge(&self, request: ChargeRequest) -> Result<ChargeInit> {
        let mut body = json!({
            "email": request.email,
            "amount": request.amount_minor,
            "currency": "NGN",
            "reference": request.reference,
            "metadata": {
                "program_id": request.program_id.to_string(),
                "learner_id": request.learner_id,
            },
        });
        if let Some(callback_url) = &self.callback_url {
            body["callback_url"] = json!(callback_url);
        }

        debug!(reference = %request.reference, amount_minor = request.amount_minor, "initializing charge");
        let response = self
            .client
            .post(format!("{}/transaction/initialize", self.base_url))
            .bearer_auth(&self.secret_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| LedgerError::Upstream(format!("charge initialization failed: {e}")))?;

        if !response.status().is_success() {
            return Err(LedgerError::Upstream(format!(
                "charge initialization failed with status {}",
                response.status()
            )));
        }

        let parsed: InitializeResponse = response
            .json()
            .await
            .map_err(|e| LedgerError::Upstream(format!("malformed initialization response: {e}")))?;
        Ok(ChargeInit {
            authorization_url: parsed.data.authorization_url,
            access_code: parsed.data.access_code,
            reference: parsed.data.reference,
        })
    }

    async fn verify_charge(&self, reference: &str) -> Result<ChargeVerification> {
        let response = self
            .client
            .get(format!("{}/transaction/verify/{reference}", self.base_url))
            .bearer_auth(&self.secret_key)
            .send()
            .await
            .map_err(|e| LedgerError::Upstream(format!("charge verification failed: {e}")))?;

        if !response.status().is_success() {
            return Err(LedgerError::Upstream(format!(
                "charge verification failed with status {}",
                response.status()
            )));
        }

        let parsed: VerifyResponse = response
            .json()
            .await
            .map_err(|e| LedgerError::Upstream(format!("malformed verification response: {e}")))?;
        let program_id: ProgramId = parsed.data.metadata.program_id.parse()?;
        Ok(ChargeVerification {
            status: parse_status(&parsed.data.status),
            amount_minor: parsed.data.amount,
            paid_at: parsed.data.paid_at.unwrap_or_else(Utc::now),
            program_id,
        })
    }
}

/// Stand-in gateway for deployments without a configured secret key.
///
/// Sweeps and reporting never touch the gateway; payment commands against
/// this adapter fail with an `Upstream` error instead of panicking at
/// startup.
pub struct DisabledGateway;

#[async_trait]
impl PaymentGateway for DisabledGateway {
    async fn initialize_charge(&self, _request: ChargeRequest) -> Result<ChargeInit> {
        Err(LedgerError::Upstream(
            "payment gateway is not configured".to_string(),
        ))
    }

    async fn verify_charge(&self, _reference: &str) -> Result<ChargeVerification> {
        Err(LedgerError::Upstream(
            "payment gateway is not configured".to_string(),
        ))
    }
}
