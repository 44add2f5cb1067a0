//! HTTP Handlers

use axum::{
    Json,
    body::Bytes,
    extract::{Path, Query, State, rejection::JsonRejection},
    http::{HeaderMap, StatusCode},
};
use chrono::Utc;
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use creator_bot::{BotAction, Button, Reply, Update, render};
use creator_payments::{
    CheckoutRequest, CheckoutSession, EntitlementStatus, PaymentError, PaymentGateway, PaymentRecord, Plan,
    SIGNATURE_HEADER, SubscriberStore, WebhookHandler, gate,
};
use pricing_core::{AudienceSignals, PricingError, RangeQuote, SingleQuote};

use crate::state::AppState;

// ============================================================================
// Response Types
// ============================================================================

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub payments_configured: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gateway: Option<&'static str>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

pub type ApiError = (StatusCode, Json<ErrorResponse>);

fn api_error(status: StatusCode, code: &str, error: impl Into<String>, detail: Option<&str>) -> ApiError {
    (
        status,
        Json(ErrorResponse {
            error: error.into(),
            code: code.into(),
            detail: detail.map(String::from),
        }),
    )
}

fn bad_json(rejection: &JsonRejection) -> ApiError {
    api_error(
        StatusCode::BAD_REQUEST,
        "INVALID_REQUEST",
        rejection.body_text(),
        Some("invalid_input"),
    )
}

fn pricing_error(err: &PricingError) -> ApiError {
    if err.is_caller_error() {
        api_error(StatusCode::BAD_REQUEST, "INVALID_REQUEST", err.user_message(), Some(err.code()))
    } else {
        tracing::error!(error = %err, "Pricing failed");
        api_error(
            StatusCode::INTERNAL_SERVER_ERROR,
            "PRICING_ERROR",
            err.user_message(),
            Some(err.code()),
        )
    }
}

fn payment_error(err: &PaymentError) -> ApiError {
    let status = match err {
        PaymentError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
        PaymentError::Gateway(_) | PaymentError::Network(_) => StatusCode::BAD_GATEWAY,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    tracing::error!(error = %err, "Payment request failed");
    api_error(status, "PAYMENT_ERROR", err.user_message(), None)
}

fn payments_disabled() -> ApiError {
    api_error(
        StatusCode::SERVICE_UNAVAILABLE,
        "PAYMENTS_DISABLED",
        "Payments not configured",
        None,
    )
}

/// Accept an id sent as either a JSON string or number
fn flexible_id<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::String(s)) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

// ============================================================================
// Pricing
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct PricingRequestBody {
    #[serde(default)]
    pub followers: Option<u64>,
    #[serde(default)]
    pub avg_views: Option<u64>,
    #[serde(default)]
    pub engagement_rate: Option<f64>,
    pub platform: String,
    pub niche: String,
    /// Entitlement is looked up by this id; absent means FREE
    #[serde(default, deserialize_with = "flexible_id")]
    pub telegram_id: Option<String>,
}

impl PricingRequestBody {
    const fn signals(&self) -> AudienceSignals {
        AudienceSignals::new(self.followers, self.avg_views, self.engagement_rate)
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PricingResponse {
    pub mode: String,
    pub platform: String,
    pub niche: String,
    pub recommended_amount: u64,
    pub minimum_amount: u64,
    #[serde(with = "rust_decimal::serde::float")]
    pub recommended_amount_usd: Decimal,
    pub whitelist_amount: Option<u64>,
    #[serde(with = "rust_decimal::serde::float_option")]
    pub whitelist_amount_usd: Option<Decimal>,
    pub usage_months: u32,
    pub is_pro: bool,
}

impl From<SingleQuote> for PricingResponse {
    fn from(quote: SingleQuote) -> Self {
        Self {
            mode: quote.basis.mode.as_str().into(),
            platform: quote.basis.platform,
            niche: quote.basis.niche,
            recommended_amount: quote.recommended_amount,
            minimum_amount: quote.minimum_amount,
            recommended_amount_usd: quote.recommended_amount_usd,
            whitelist_amount: quote.whitelist.map(|w| w.amount),
            whitelist_amount_usd: quote.whitelist.map(|w| w.amount_usd),
            usage_months: quote.basis.usage_months,
            is_pro: quote.basis.is_pro,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RangeResponse {
    pub mode: String,
    pub platform: String,
    pub niche: String,
    pub range_low: u64,
    pub range_mid: u64,
    pub range_high: u64,
    #[serde(with = "rust_decimal::serde::float")]
    pub range_mid_usd: Decimal,
    pub whitelist_amount: Option<u64>,
    #[serde(with = "rust_decimal::serde::float_option")]
    pub whitelist_amount_usd: Option<Decimal>,
    pub usage_months: u32,
    pub is_pro: bool,
}

impl From<RangeQuote> for RangeResponse {
    fn from(quote: RangeQuote) -> Self {
        Self {
            mode: quote.basis.mode.as_str().into(),
            platform: quote.basis.platform,
            niche: quote.basis.niche,
            range_low: quote.range_low,
            range_mid: quote.range_mid,
            range_high: quote.range_high,
            range_mid_usd: quote.range_mid_usd,
            whitelist_amount: quote.whitelist.map(|w| w.amount),
            whitelist_amount_usd: quote.whitelist.map(|w| w.amount_usd),
            usage_months: quote.basis.usage_months,
            is_pro: quote.basis.is_pro,
        }
    }
}

fn caller_is_pro(state: &AppState, telegram_id: Option<&str>) -> Result<bool, ApiError> {
    let Some(id) = telegram_id else {
        return Ok(false);
    };
    let record = state.subscribers.get(id).map_err(|e| payment_error(&e))?;
    Ok(gate::is_entitled(record.as_ref(), Utc::now()))
}

/// Single-figure quote
pub async fn calculate_price(
    State(state): State<AppState>,
    payload: Result<Json<PricingRequestBody>, JsonRejection>,
) -> Result<Json<PricingResponse>, ApiError> {
    let Json(body) = payload.map_err(|e| bad_json(&e))?;
    let is_pro = caller_is_pro(&state, body.telegram_id.as_deref())?;

    let quote = state
        .engine
        .calculate(&body.signals(), &body.platform, &body.niche, is_pro)
        .map_err(|e| pricing_error(&e))?;

    Ok(Json(quote.into()))
}

/// Low / mid / high quote
pub async fn calculate_range(
    State(state): State<AppState>,
    payload: Result<Json<PricingRequestBody>, JsonRejection>,
) -> Result<Json<RangeResponse>, ApiError> {
    let Json(body) = payload.map_err(|e| bad_json(&e))?;
    let is_pro = caller_is_pro(&state, body.telegram_id.as_deref())?;

    let quote = state
        .engine
        .calculate_range(&body.signals(), &body.platform, &body.niche, is_pro)
        .map_err(|e| pricing_error(&e))?;

    Ok(Json(quote.into()))
}

// ============================================================================
// Subscribers
// ============================================================================

#[derive(Debug, Serialize, Deserialize)]
pub struct SubscriberStatusResponse {
    pub subscriber_id: String,
    pub is_pro: bool,
    pub status: EntitlementStatus,
}

/// Entitlement for one subscriber
pub async fn subscriber_status(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<SubscriberStatusResponse>, ApiError> {
    let record = state.subscribers.get(&id).map_err(|e| payment_error(&e))?;
    let status = gate::evaluate(record.as_ref(), Utc::now());

    Ok(Json(SubscriberStatusResponse {
        subscriber_id: id,
        is_pro: status.is_active(),
        status,
    }))
}

// ============================================================================
// Paystack
// ============================================================================

#[derive(Debug, Default, Deserialize)]
pub struct InitMetadata {
    #[serde(default, deserialize_with = "flexible_id")]
    pub telegram_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct PaystackInitRequest {
    #[serde(default, deserialize_with = "flexible_id")]
    pub telegram_id: Option<String>,
    #[serde(default)]
    pub metadata: Option<InitMetadata>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub plan: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PaystackInitResponse {
    pub authorization_url: String,
    pub reference: String,
}

/// Initialize with the gateway, then remember the pending payment
async fn start_checkout(
    state: &AppState,
    subscriber_id: &str,
    plan: Plan,
    email: Option<String>,
) -> Result<CheckoutSession, PaymentError> {
    let gateway = state
        .gateway
        .as_ref()
        .ok_or_else(|| PaymentError::Config("payments not configured".into()))?;

    let mut request = CheckoutRequest::new(subscriber_id, plan);
    request.email = email;
    request.callback_url.clone_from(&state.callback_url);

    let session = gateway.initialize(&request).await?;
    state.subscribers.record_pending(&PaymentRecord::pending(
        session.reference.clone(),
        subscriber_id,
        plan,
        session.amount_kobo,
        Utc::now(),
    ))?;

    Ok(session)
}

/// Start a Paystack checkout
pub async fn paystack_init(
    State(state): State<AppState>,
    payload: Result<Json<PaystackInitRequest>, JsonRejection>,
) -> Result<Json<PaystackInitResponse>, ApiError> {
    if state.gateway.is_none() {
        return Err(payments_disabled());
    }

    let Json(body) = payload.map_err(|e| bad_json(&e))?;

    let subscriber_id = body
        .telegram_id
        .or_else(|| body.metadata.and_then(|m| m.telegram_id))
        .ok_or_else(|| api_error(StatusCode::BAD_REQUEST, "INVALID_REQUEST", "Missing telegram_id", None))?;

    let plan = match body.plan.as_deref() {
        Some(raw) => raw.parse::<Plan>().map_err(|e| payment_error(&e))?,
        None => Plan::Pro,
    };

    let session = start_checkout(&state, &subscriber_id, plan, body.email)
        .await
        .map_err(|e| payment_error(&e))?;

    Ok(Json(PaystackInitResponse {
        authorization_url: session.authorization_url,
        reference: session.reference,
    }))
}

#[derive(Debug, Serialize, Deserialize)]
pub struct WebhookResponse {
    pub status: String,
}

/// Paystack webhook
pub async fn paystack_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<WebhookResponse>, ApiError> {
    let secret = state.webhook_secret.as_deref().ok_or_else(payments_disabled)?;

    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| {
            api_error(
                StatusCode::BAD_REQUEST,
                "MISSING_SIGNATURE",
                "Missing Paystack signature",
                None,
            )
        })?;

    let outcome = WebhookHandler::new(state.subscribers.clone())
        .process(secret, &body, signature, Utc::now())
        .map_err(|e| match e {
            PaymentError::WebhookSignature(_) => {
                tracing::warn!(error = %e, "Webhook signature failed");
                api_error(StatusCode::BAD_REQUEST, "INVALID_SIGNATURE", "Invalid Paystack signature", None)
            }
            PaymentError::WebhookParse(_) => api_error(StatusCode::BAD_REQUEST, "INVALID_PAYLOAD", e.to_string(), None),
            _ => {
                tracing::error!(error = %e, "Webhook processing error");
                api_error(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "WEBHOOK_ERROR",
                    "Webhook processing failed",
                    None,
                )
            }
        })?;

    Ok(Json(WebhookResponse {
        status: outcome.status().into(),
    }))
}

#[derive(Debug, Deserialize)]
pub struct CallbackQuery {
    #[serde(default)]
    pub reference: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CallbackResponse {
    pub status: &'static str,
    pub reference: Option<String>,
    pub message: &'static str,
}

/// Landing page after the hosted checkout
///
/// Entitlement is granted by the webhook, not here.
pub async fn paystack_callback(Query(query): Query<CallbackQuery>) -> Json<CallbackResponse> {
    Json(CallbackResponse {
        status: "received",
        reference: query.reference,
        message: "Payment received. Return to the chat and type /status.",
    })
}

// ============================================================================
// Bot
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct BotUpdateRequest {
    #[serde(default, deserialize_with = "flexible_id")]
    pub chat_id: Option<String>,
    #[serde(default)]
    pub command: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub callback: Option<String>,
}

impl BotUpdateRequest {
    fn into_update(self) -> Option<Update> {
        let chat_id = self.chat_id?;
        if let Some(command) = self.command {
            Some(Update::Command { chat_id, command })
        } else if let Some(data) = self.callback {
            Some(Update::Callback { chat_id, data })
        } else if let Some(text) = self.text {
            // "/start" typed as text is still a command
            if text.trim_start().starts_with('/') {
                Some(Update::Command { chat_id, command: text })
            } else {
                Some(Update::Text { chat_id, text })
            }
        } else {
            None
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct BotUpdateResponse {
    pub replies: Vec<Reply>,
}

/// Feed one chat update to the bot
pub async fn bot_update(
    State(state): State<AppState>,
    payload: Result<Json<BotUpdateRequest>, JsonRejection>,
) -> Result<Json<BotUpdateResponse>, ApiError> {
    let Json(body) = payload.map_err(|e| bad_json(&e))?;
    let update = body.into_update().ok_or_else(|| {
        api_error(
            StatusCode::BAD_REQUEST,
            "INVALID_REQUEST",
            "chat_id and one of command, text or callback are required",
            None,
        )
    })?;

    let replies = state.bot.handle(&update, Utc::now()).map_err(|e| {
        tracing::error!(error = %e, "Bot update failed");
        api_error(StatusCode::INTERNAL_SERVER_ERROR, "BOT_ERROR", e.user_message(), None)
    })?;

    let mut out = Vec::with_capacity(replies.len() + 1);
    for reply in replies {
        let action = reply.action;
        out.push(reply);

        if let Some(BotAction::Checkout { plan }) = action {
            out.push(checkout_reply(&state, update.chat_id(), plan).await);
        }
    }

    Ok(Json(BotUpdateResponse { replies: out }))
}

async fn checkout_reply(state: &AppState, chat_id: &str, plan: Plan) -> Reply {
    match start_checkout(state, chat_id, plan, None).await {
        Ok(session) => Reply::text(render::pay_link(plan))
            .with_buttons(vec![vec![Button::link("💳 Pay with Paystack", session.authorization_url)]]),
        Err(PaymentError::Config(_)) => Reply::text("⚠️ Payments are not available right now."),
        Err(err) => {
            tracing::error!(chat_id = %chat_id, plan = %plan, error = %err, "Checkout from chat failed");
            Reply::text("❌ Payment initialization failed.\nPlease try again shortly.")
        }
    }
}

// ============================================================================
// Health
// ============================================================================

/// Health check endpoint
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
        payments_configured: state.gateway.is_some(),
        gateway: state.gateway.as_ref().map(|g| g.name()),
    })
}
