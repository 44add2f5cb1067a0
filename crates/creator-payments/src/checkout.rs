//! Paystack Checkout
//!
//! Initializes hosted Paystack transactions. The creator is sent to the
//! returned authorization URL; the charge is confirmed later by webhook.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::time::Duration;

use crate::error::{PaymentError, Result};
use crate::plan::Plan;

/// Default Paystack API base
pub const DEFAULT_BASE_URL: &str = "https://api.paystack.co";

/// Domain used for placeholder customer emails
pub const PLACEHOLDER_EMAIL_DOMAIN: &str = "creatorpay.app";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// Anything that can open a hosted checkout
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Start a transaction and return where to send the payer
    async fn initialize(&self, request: &CheckoutRequest) -> Result<CheckoutSession>;

    /// Gateway name for logs and health output
    fn name(&self) -> &'static str;
}

/// Request to start a checkout
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CheckoutRequest {
    /// Chat user paying
    pub subscriber_id: String,

    pub plan: Plan,

    /// Payer email; a placeholder is derived from the id when absent
    #[serde(default)]
    pub email: Option<String>,

    /// Where Paystack redirects after payment
    #[serde(default)]
    pub callback_url: Option<String>,
}

impl CheckoutRequest {
    pub fn new(subscriber_id: impl Into<String>, plan: Plan) -> Self {
        Self {
            subscriber_id: subscriber_id.into(),
            plan,
            email: None,
            callback_url: None,
        }
    }

    #[must_use]
    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    #[must_use]
    pub fn with_callback_url(mut self, url: impl Into<String>) -> Self {
        self.callback_url = Some(url.into());
        self
    }

    /// Email sent to Paystack
    pub fn customer_email(&self) -> String {
        match self.email.as_deref().map(str::trim) {
            Some(email) if !email.is_empty() => email.to_string(),
            _ => format!("user{}@{PLACEHOLDER_EMAIL_DOMAIN}", self.subscriber_id),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.subscriber_id.trim().is_empty() {
            return Err(PaymentError::InvalidRequest("missing subscriber id".into()));
        }
        Ok(())
    }

    /// JSON body for `transaction/initialize`
    pub fn initialize_body(&self, reference: &str) -> serde_json::Value {
        let mut body = json!({
            "email": self.customer_email(),
            "amount": self.plan.pricing().amount_kobo,
            "reference": reference,
            "metadata": {
                "telegram_id": self.subscriber_id,
                "plan": self.plan.as_str(),
            },
        });

        if let Some(url) = &self.callback_url {
            body["callback_url"] = json!(url);
        }

        body
    }
}

/// An initialized transaction
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutSession {
    /// Gateway transaction reference
    pub reference: String,

    /// URL to send the payer to
    pub authorization_url: String,

    pub plan: Plan,

    pub amount_kobo: i64,
}

/// Paystack response envelope
#[derive(Debug, Deserialize)]
struct Envelope<T> {
    status: bool,
    #[serde(default)]
    message: String,
    data: Option<T>,
}

#[derive(Debug, Deserialize)]
struct InitializeData {
    authorization_url: String,
}

/// Paystack API client
pub struct PaystackClient {
    http: reqwest::Client,
    secret_key: String,
    base_url: String,
}

impl PaystackClient {
    /// Create a client against the live API
    pub fn new(secret_key: impl Into<String>) -> Result<Self> {
        Self::with_base_url(secret_key, DEFAULT_BASE_URL)
    }

    /// Create a client against another base URL
    pub fn with_base_url(secret_key: impl Into<String>, base_url: impl Into<String>) -> Result<Self> {
        let secret_key = secret_key.into();
        if secret_key.trim().is_empty() {
            return Err(PaymentError::Config("Paystack secret key is empty".into()));
        }

        let http = reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build()?;

        Ok(Self {
            http,
            secret_key,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl PaymentGateway for PaystackClient {
    async fn initialize(&self, request: &CheckoutRequest) -> Result<CheckoutSession> {
        request.validate()?;

        let reference = uuid::Uuid::new_v4().to_string();
        let url = format!("{}/transaction/initialize", self.base_url);

        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.secret_key)
            .json(&request.initialize_body(&reference))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(status = %status, body = %body, "Paystack init failed");
            return Err(PaymentError::Gateway(format!("initialize returned {status}")));
        }

        let envelope: Envelope<InitializeData> = response.json().await?;
        let data = match envelope {
            Envelope {
                status: true,
                data: Some(data),
                ..
            } => data,
            Envelope { message, .. } => {
                tracing::error!(message = %message, "Paystack init rejected");
                return Err(PaymentError::Gateway(message));
            }
        };

        tracing::info!(
            reference = %reference,
            subscriber_id = %request.subscriber_id,
            plan = %request.plan,
            "Initialized Paystack transaction"
        );

        Ok(CheckoutSession {
            reference,
            authorization_url: data.authorization_url,
            plan: request.plan,
            amount_kobo: request.plan.pricing().amount_kobo,
        })
    }

    fn name(&self) -> &'static str {
        "paystack"
    }
}
