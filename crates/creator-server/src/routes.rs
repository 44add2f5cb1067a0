//! Router

use axum::{
    Router,
    routing::{get, post},
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::handlers::{
    bot_update, calculate_price, calculate_range, health_check, paystack_callback, paystack_init, paystack_webhook,
    subscriber_status,
};
use crate::state::AppState;

/// Build the application router
pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any);

    Router::new()
        // Health
        .route("/health", get(health_check))
        // Pricing
        .route("/pricing/calculate", post(calculate_price))
        .route("/pricing/range", post(calculate_range))
        // Subscribers
        .route("/subscribers/{id}/status", get(subscriber_status))
        // Payments
        .route("/paystack/init", post(paystack_init))
        .route("/paystack/webhook", post(paystack_webhook))
        .route("/paystack/callback", get(paystack_callback))
        // Chat
        .route("/bot/updates", post(bot_update))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use axum::{
        body::{Body, to_bytes},
        http::{Request, StatusCode},
    };
    use serde_json::{Value, json};
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tower::ServiceExt;

    use creator_bot::{Bot, MemoryIntakeStore, MemorySessionStore};
    use creator_payments::{
        CheckoutRequest, CheckoutSession, MemorySubscriberStore, PaymentError, PaymentGateway, PaymentStatus,
        SIGNATURE_HEADER, SubscriberStore, webhook,
    };
    use pricing_core::PricingEngine;

    const SECRET: &str = "sk_test_webhook";

    /// Gateway that never leaves the process
    struct FakeGateway {
        calls: AtomicUsize,
        fail: bool,
    }

    #[async_trait]
    impl PaymentGateway for FakeGateway {
        async fn initialize(&self, request: &CheckoutRequest) -> creator_payments::Result<CheckoutSession> {
            if self.fail {
                return Err(PaymentError::Gateway("declined".into()));
            }
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(CheckoutSession {
                reference: format!("ref-{n}"),
                authorization_url: format!("https://checkout.test/{n}"),
                plan: request.plan,
                amount_kobo: request.plan.pricing().amount_kobo,
            })
        }

        fn name(&self) -> &'static str {
            "fake"
        }
    }

    struct TestApp {
        router: Router,
        subscribers: Arc<MemorySubscriberStore>,
    }

    fn app_with(gateway: Option<FakeGateway>) -> TestApp {
        let engine = Arc::new(PricingEngine::default());
        let subscribers = Arc::new(MemorySubscriberStore::new());
        let bot = Bot::new(
            engine.clone(),
            subscribers.clone(),
            Arc::new(MemorySessionStore::new()),
            Arc::new(MemoryIntakeStore::new()),
        );
        let configured = gateway.is_some();

        let state = AppState {
            engine,
            subscribers: subscribers.clone(),
            gateway: gateway.map(|g| Arc::new(g) as Arc<dyn PaymentGateway>),
            webhook_secret: configured.then(|| SECRET.to_string()),
            callback_url: None,
            bot: Arc::new(bot),
        };

        TestApp {
            router: build_router(state),
            subscribers,
        }
    }

    fn app() -> TestApp {
        app_with(Some(FakeGateway {
            calls: AtomicUsize::new(0),
            fail: false,
        }))
    }

    async fn send(router: &Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, body)
    }

    fn post_json(uri: &str, body: &Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    fn signed_webhook(body: &Value) -> Request<Body> {
        let raw = body.to_string();
        let signature = webhook::sign(SECRET, raw.as_bytes()).unwrap();
        Request::builder()
            .method("POST")
            .uri("/paystack/webhook")
            .header("content-type", "application/json")
            .header(SIGNATURE_HEADER, signature)
            .body(Body::from(raw))
            .unwrap()
    }

    fn charge_success(reference: &str, telegram_id: &str) -> Value {
        json!({
            "event": "charge.success",
            "data": {
                "reference": reference,
                "amount": 1_000_000,
                "metadata": { "telegram_id": telegram_id, "plan": "PRO" }
            }
        })
    }

    fn scenario_one() -> Value {
        json!({
            "followers": 50_000,
            "avg_views": 12_000,
            "engagement_rate": 0.08,
            "platform": "instagram",
            "niche": "tech",
            "telegram_id": "42"
        })
    }

    #[tokio::test]
    async fn test_health() {
        let app = app();
        let (status, body) = send(&app.router, get("/health")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["payments_configured"], true);
        assert_eq!(body["gateway"], "fake");
    }

    #[tokio::test]
    async fn test_free_quote_has_null_whitelist() {
        let app = app();
        let (status, body) = send(&app.router, post_json("/pricing/calculate", &scenario_one())).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["mode"], "full");
        assert_eq!(body["recommended_amount"], 1_000_000);
        assert_eq!(body["minimum_amount"], 500_000);
        assert_eq!(body["recommended_amount_usd"], 769.23);
        assert!(body["whitelist_amount"].is_null());
        assert!(body["whitelist_amount_usd"].is_null());
        assert_eq!(body["usage_months"], 3);
        assert_eq!(body["is_pro"], false);
    }

    #[tokio::test]
    async fn test_paid_subscriber_gets_whitelist() {
        let app = app();
        let (status, body) = send(&app.router, signed_webhook(&charge_success("ref-x", "42"))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "activated");

        let (_, body) = send(&app.router, post_json("/pricing/calculate", &scenario_one())).await;
        assert_eq!(body["is_pro"], true);
        assert_eq!(body["whitelist_amount"], 2_000_000);
        assert_eq!(body["whitelist_amount_usd"], 1538.46);
    }

    #[tokio::test]
    async fn test_insufficient_data_is_400() {
        let app = app();
        let request = json!({ "platform": "youtube", "niche": "finance", "engagement_rate": 0.05 });
        let (status, body) = send(&app.router, post_json("/pricing/calculate", &request)).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["detail"], "insufficient_data");
    }

    #[tokio::test]
    async fn test_malformed_input_is_400() {
        let app = app();

        let negative = json!({ "followers": -5, "platform": "tiktok", "niche": "general" });
        let (status, _) = send(&app.router, post_json("/pricing/calculate", &negative)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let engagement = json!({ "followers": 5_000, "engagement_rate": 1.5, "platform": "tiktok", "niche": "general" });
        let (status, body) = send(&app.router, post_json("/pricing/calculate", &engagement)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["detail"], "invalid_input");

        let missing_platform = json!({ "followers": 5_000, "niche": "general" });
        let (status, _) = send(&app.router, post_json("/pricing/calculate", &missing_platform)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_range_endpoint() {
        let app = app();
        let (status, body) = send(&app.router, post_json("/pricing/range", &scenario_one())).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["range_low"], 750_000);
        assert_eq!(body["range_mid"], 1_000_000);
        assert_eq!(body["range_high"], 1_250_000);
        assert_eq!(body["is_pro"], false);
        assert!(body["whitelist_amount"].is_null());
    }

    #[tokio::test]
    async fn test_range_endpoint_for_paid_subscriber() {
        let app = app();
        let (status, _) = send(&app.router, signed_webhook(&charge_success("ref-range", "42"))).await;
        assert_eq!(status, StatusCode::OK);

        let (status, body) = send(&app.router, post_json("/pricing/range", &scenario_one())).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["is_pro"], true);
        assert_eq!(body["range_mid"], 1_000_000);
        assert_eq!(body["whitelist_amount"], 2_000_000);
        assert_eq!(body["whitelist_amount_usd"], 1538.46);
    }

    #[tokio::test]
    async fn test_init_records_pending_payment() {
        let app = app();
        let request = json!({ "metadata": { "telegram_id": 42 } });
        let (status, body) = send(&app.router, post_json("/paystack/init", &request)).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["authorization_url"], "https://checkout.test/0");

        let payment = app.subscribers.get_payment("ref-0").unwrap().unwrap();
        assert_eq!(payment.subscriber_id, "42");
        assert_eq!(payment.status, PaymentStatus::Pending);
        assert_eq!(payment.amount_kobo, 1_000_000);
    }

    #[tokio::test]
    async fn test_init_errors() {
        let app = app();
        let (status, _) = send(&app.router, post_json("/paystack/init", &json!({}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = send(
            &app.router,
            post_json("/paystack/init", &json!({ "telegram_id": "42", "plan": "gold" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let disabled = app_with(None);
        let (status, body) = send(&disabled.router, post_json("/paystack/init", &json!({ "telegram_id": "42" }))).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["code"], "PAYMENTS_DISABLED");

        let failing = app_with(Some(FakeGateway {
            calls: AtomicUsize::new(0),
            fail: true,
        }));
        let (status, _) = send(&failing.router, post_json("/paystack/init", &json!({ "telegram_id": "42" }))).await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
    }

    #[tokio::test]
    async fn test_webhook_rejects_bad_signatures() {
        let app = app();
        let body = charge_success("ref-1", "42");

        let unsigned = post_json("/paystack/webhook", &body);
        let (status, response) = send(&app.router, unsigned).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(response["code"], "MISSING_SIGNATURE");

        let forged = Request::builder()
            .method("POST")
            .uri("/paystack/webhook")
            .header(SIGNATURE_HEADER, "ab".repeat(64))
            .body(Body::from(body.to_string()))
            .unwrap();
        let (status, response) = send(&app.router, forged).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(response["code"], "INVALID_SIGNATURE");

        assert!(app.subscribers.get("42").unwrap().is_none());
    }

    #[tokio::test]
    async fn test_webhook_is_idempotent() {
        let app = app();
        let body = charge_success("ref-1", "42");

        let (_, first) = send(&app.router, signed_webhook(&body)).await;
        let expiry = app.subscribers.get("42").unwrap().unwrap().entitlement_expires_at;
        let (_, second) = send(&app.router, signed_webhook(&body)).await;

        assert_eq!(first["status"], "activated");
        assert_eq!(second["status"], "already_processed");
        assert_eq!(app.subscribers.get("42").unwrap().unwrap().entitlement_expires_at, expiry);

        let (_, ignored) = send(&app.router, signed_webhook(&json!({ "event": "transfer.failed" }))).await;
        assert_eq!(ignored["status"], "ignored");
    }

    #[tokio::test]
    async fn test_subscriber_status() {
        let app = app();
        let (_, body) = send(&app.router, get("/subscribers/42/status")).await;
        assert_eq!(body["is_pro"], false);
        assert_eq!(body["status"]["state"], "no_record");

        send(&app.router, signed_webhook(&charge_success("ref-1", "42"))).await;
        let (_, body) = send(&app.router, get("/subscribers/42/status")).await;
        assert_eq!(body["is_pro"], true);
        assert_eq!(body["status"]["state"], "active");
    }

    #[tokio::test]
    async fn test_bot_upgrade_attaches_pay_link() {
        let app = app();
        let update = json!({ "chat_id": 42, "callback": "upgrade_pro" });
        let (status, body) = send(&app.router, post_json("/bot/updates", &update)).await;

        assert_eq!(status, StatusCode::OK);
        let replies = body["replies"].as_array().unwrap();
        assert_eq!(replies.len(), 2);
        assert_eq!(replies[0]["action"]["type"], "checkout");
        assert_eq!(replies[1]["buttons"][0][0]["url"], "https://checkout.test/0");
        assert!(app.subscribers.get_payment("ref-0").unwrap().is_some());
    }

    #[tokio::test]
    async fn test_bot_conversation_over_http() {
        let app = app();
        let steps = [
            json!({ "chat_id": "7", "text": "/start" }),
            json!({ "chat_id": "7", "text": "50k" }),
            json!({ "chat_id": "7", "callback": "platform_tiktok" }),
        ];
        for step in &steps {
            let (status, _) = send(&app.router, post_json("/bot/updates", step)).await;
            assert_eq!(status, StatusCode::OK);
        }

        let (_, body) = send(
            &app.router,
            post_json("/bot/updates", &json!({ "chat_id": "7", "callback": "niche_other" })),
        )
        .await;
        let quote = body["replies"][1]["text"].as_str().unwrap();
        assert!(quote.contains("₦800,000"));

        let (status, _) = send(&app.router, post_json("/bot/updates", &json!({ "chat_id": "7" }))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_callback_landing() {
        let app = app();
        let (status, body) = send(&app.router, get("/paystack/callback?reference=ref-9&trxref=ref-9")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["reference"], "ref-9");
    }
}
