//! Outbound client for the payment provider's transaction initialization.
//!
//! The provider later confirms the charge through the signed webhook; the
//! metadata sent here is what comes back in that event.

use std::time::Duration;

use engine::Money;
use serde::{Deserialize, Serialize};
use serde_json::json;
use thiserror::Error;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("provider rejected the request: {0}")]
    Rejected(String),
}

/// Hosted checkout handed back to the user.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FundingInit {
    pub authorization_url: String,
    pub access_code: String,
    pub reference: String,
}

#[derive(Deserialize)]
struct Envelope {
    status: bool,
    #[serde(default)]
    message: String,
    data: Option<FundingInit>,
}

#[derive(Clone, Debug)]
pub struct PaymentProvider {
    client: reqwest::Client,
    base_url: String,
    secret_key: String,
}

impl PaymentProvider {
    pub fn new(
        base_url: impl Into<String>,
        secret_key: impl Into<String>,
    ) -> Result<Self, ProviderError> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            secret_key: secret_key.into(),
        })
    }

    /// Start a wallet top-up of `amount` for `user_id`.
    pub async fn initialize_funding(
        &self,
        user_id: i64,
        username: &str,
        email: &str,
        amount: Money,
    ) -> Result<FundingInit, ProviderError> {
        let body = json!({
            "email": email,
            "amount": amount.minor(),
            "metadata": {
                "user_id": user_id,
                "transaction_type": "credit",
                "category": "fund",
                "username": username,
                "description": format!("Wallet funding of {amount}"),
            }
        });

        let envelope: Envelope = self
            .client
            .post(format!("{}/transaction/initialize", self.base_url))
            .bearer_auth(&self.secret_key)
            .json(&body)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        match envelope {
            Envelope {
                status: true,
                data: Some(init),
                ..
            } => {
                tracing::info!(user_id, reference = %init.reference, "funding initialized");
                Ok(init)
            }
            Envelope { message, .. } => Err(ProviderError::Rejected(message)),
        }
    }
}
