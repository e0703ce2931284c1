use async_trait::async_trait;
use axum::{
    body::{to_bytes, Body},
    http::{Method, Request, StatusCode},
    Router,
};
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use lazy_onboard::{
    adapters::random_code,
    api::{create_router, AppState},
    domain::{Agent, DelegatedAddress, Deployment, TelegramLink, TradingPreferences, WalletId},
    error::{OnboardError, Result},
    persistence::{MemoryIdentityStore, MemoryLinkCodeStore},
    platform::{BotControlPlane, BotIdentity, Clock, IdentityStore, LinkCodeStore},
    services::{IdempotencyGuard, IdentityResolver, LinkBrokerSettings},
};
use serde_json::{json, Value};
use std::sync::{
    atomic::{AtomicI64, Ordering},
    Arc,
};
use tower::ServiceExt;
use uuid::Uuid;

const WALLET: &str = "0xAbC123";

struct FakeBot {
    username: Option<&'static str>,
}

#[async_trait]
impl BotControlPlane for FakeBot {
    async fn get_self_identity(&self) -> Result<BotIdentity> {
        match self.username {
            Some(username) => Ok(BotIdentity {
                id: 7,
                username: username.to_string(),
            }),
            None => Err(OnboardError::Upstream("getMe unavailable".into())),
        }
    }

    fn generate_opaque_code(&self) -> Result<String> {
        Ok(random_code(10))
    }
}

/// Identity store whose reads always fail
struct BrokenStore;

#[async_trait]
impl IdentityStore for BrokenStore {
    async fn find_lazy_agent(&self, _: &WalletId) -> Result<Option<Agent>> {
        Err(OnboardError::Internal("pool timed out".into()))
    }
    async fn find_attached_link(&self, _: Uuid) -> Result<Option<TelegramLink>> {
        Err(OnboardError::Internal("pool timed out".into()))
    }
    async fn find_standalone_link(&self, _: &WalletId) -> Result<Option<TelegramLink>> {
        Err(OnboardError::Internal("pool timed out".into()))
    }
    async fn find_latest_deployment(&self, _: Uuid, _: &WalletId) -> Result<Option<Deployment>> {
        Err(OnboardError::Internal("pool timed out".into()))
    }
    async fn find_delegated_address(&self, _: &WalletId) -> Result<Option<DelegatedAddress>> {
        Err(OnboardError::Internal("pool timed out".into()))
    }
    async fn insert_telegram_link(&self, _: &TelegramLink) -> Result<()> {
        Err(OnboardError::Internal("pool timed out".into()))
    }
}

struct TestContext {
    app: Router,
    state: AppState,
    identity: MemoryIdentityStore,
    codes: MemoryLinkCodeStore,
    clock_offset: Arc<AtomicI64>,
}

impl TestContext {
    fn new() -> Self {
        Self::with_bot(FakeBot {
            username: Some("OnboardBot"),
        })
    }

    fn with_bot(bot: FakeBot) -> Self {
        let clock_offset = Arc::new(AtomicI64::new(0));
        let offset = clock_offset.clone();
        let clock: Clock = Arc::new(move || {
            Utc::now() + ChronoDuration::seconds(offset.load(Ordering::SeqCst))
        });

        let identity = MemoryIdentityStore::new();
        let codes = MemoryLinkCodeStore::with_clock(clock);
        let state = AppState::new(
            Arc::new(identity.clone()),
            Arc::new(codes.clone()),
            Arc::new(bot),
            LinkBrokerSettings::default(),
        );

        Self {
            app: create_router(state.clone()),
            state,
            identity,
            codes,
            clock_offset,
        }
    }

    fn advance(&self, by: ChronoDuration) {
        self.clock_offset
            .fetch_add(by.num_seconds(), Ordering::SeqCst);
    }

    fn guard(&self) -> IdempotencyGuard {
        IdempotencyGuard::new(IdentityResolver::new(Arc::new(self.identity.clone())))
    }

    async fn status(&self, wallet: &str) -> (StatusCode, Value) {
        let uri = format!("/api/lazy-trading/setup-status?userWallet={}", wallet);
        request_json(&self.app, Method::GET, &uri, None).await
    }

    async fn generate(&self, body: Value) -> (StatusCode, Value) {
        request_json(
            &self.app,
            Method::POST,
            "/api/lazy-trading/generate-link-code",
            Some(body.to_string()),
        )
        .await
    }

    async fn seed_agent(&self) -> Uuid {
        let agent = Agent {
            id: Uuid::new_v4(),
            creator_wallet: WALLET.to_string(),
            name: format!("Lazy Trader - {}", WALLET),
            venue: "OSTIUM".into(),
            status: "PRIVATE".into(),
            created_at: Utc::now(),
        };
        let id = agent.id;
        self.identity.insert_agent(agent).await.unwrap();
        id
    }

    async fn seed_deployment(&self, agent_id: Uuid, prefs: TradingPreferences, at: DateTime<Utc>) {
        self.identity
            .insert_deployment(Deployment {
                id: Uuid::new_v4(),
                agent_id,
                user_wallet: WALLET.to_string(),
                status: "ACTIVE".into(),
                enabled_venues: vec!["OSTIUM".into()],
                preferences: prefs,
                started_at: at,
            })
            .await
            .unwrap();
    }
}

fn telegram_link(telegram_user_id: i64) -> TelegramLink {
    TelegramLink {
        id: Uuid::new_v4(),
        telegram_user_id,
        telegram_username: Some("lazy_user".into()),
        first_name: Some("Lazy".into()),
        last_name: None,
        is_active: true,
        lazy_trader: true,
        user_wallet: None,
        agent_id: None,
        created_at: Utc::now(),
    }
}

async fn request(app: &Router, method: Method, uri: &str, body: Option<String>) -> (StatusCode, String) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(payload) => builder
            .header("content-type", "application/json")
            .body(Body::from(payload))
            .expect("failed to build json request"),
        None => builder
            .body(Body::empty())
            .expect("failed to build empty request"),
    };

    let response = app
        .clone()
        .oneshot(request)
        .await
        .expect("router request failed");
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("failed to read response body");
    (status, String::from_utf8_lossy(&bytes).to_string())
}

async fn request_json(
    app: &Router,
    method: Method,
    uri: &str,
    body: Option<String>,
) -> (StatusCode, Value) {
    let (status, text) = request(app, method, uri, body).await;
    let value = serde_json::from_str(&text).unwrap_or(Value::Null);
    (status, value)
}

#[tokio::test]
async fn new_wallet_starts_at_wallet_step() {
    let ctx = TestContext::new();

    let (status, body) = ctx.status(WALLET).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["hasSetup"], false);
    assert_eq!(body["step"], "wallet");
    for key in [
        "agent",
        "telegramUser",
        "deployment",
        "tradingPreferences",
        "delegatedAddress",
    ] {
        assert!(body[key].is_null(), "{} should be null", key);
    }
}

#[tokio::test]
async fn setup_status_requires_wallet() {
    let ctx = TestContext::new();

    let (status, body) =
        request_json(&ctx.app, Method::GET, "/api/lazy-trading/setup-status", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "userWallet is required");

    let (status, body) = ctx.status("%20%20").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn wrong_methods_are_rejected() {
    let ctx = TestContext::new();

    let (status, _) = request(
        &ctx.app,
        Method::POST,
        "/api/lazy-trading/setup-status?userWallet=0xabc",
        None,
    )
    .await;
    assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);

    let (status, _) = request(
        &ctx.app,
        Method::GET,
        "/api/lazy-trading/generate-link-code",
        None,
    )
    .await;
    assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);

    let (status, _) = request(
        &ctx.app,
        Method::DELETE,
        "/api/lazy-trading/generate-link-code",
        None,
    )
    .await;
    assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
}

#[tokio::test]
async fn generate_rejects_bad_bodies() {
    let ctx = TestContext::new();

    let (status, body) = request_json(
        &ctx.app,
        Method::POST,
        "/api/lazy-trading/generate-link-code",
        Some("not json".to_string()),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());

    let (status, body) = ctx.generate(json!({})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "userWallet is required");

    let (status, body) = ctx.generate(json!({ "userWallet": 42 })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "userWallet must be a string");

    let (status, _) = request(
        &ctx.app,
        Method::POST,
        "/api/lazy-trading/generate-link-code",
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn standalone_flow_reaches_preferences() {
    let ctx = TestContext::new();

    let (status, body) = ctx.generate(json!({ "userWallet": WALLET })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["alreadyLinked"], false);
    assert_eq!(body["handle"], "OnboardBot");
    assert_eq!(body["expiresInSeconds"], 600);

    let code = body["code"].as_str().unwrap().to_string();
    assert!(code.starts_with("LT"));
    assert_eq!(code.len(), 12);
    assert_eq!(
        body["deepLink"],
        format!("https://t.me/OnboardBot?start={}", code)
    );

    // The exchange path redeems the code, then records the link.
    let wallet = ctx
        .state
        .link_broker
        .resolve_code(&code)
        .await
        .unwrap()
        .expect("code should resolve");
    assert_eq!(wallet.as_str(), "0xabc123");
    ctx.guard()
        .record_link(&wallet, &telegram_link(5001))
        .await
        .unwrap();

    let (status, body) = ctx.status(WALLET).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["hasSetup"], true);
    assert_eq!(body["step"], "preferences");
    assert_eq!(body["telegramUser"]["telegramUserId"], 5001);
    assert!(body["agent"].is_null());
    assert!(body["deployment"].is_null());
    assert!(body["tradingPreferences"].is_null());
    assert!(body["delegatedAddress"].is_null());

    let (status, body) = ctx.generate(json!({ "userWallet": WALLET })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["alreadyLinked"], true);
    assert_eq!(body["telegramUser"]["telegramUserId"], 5001);
    assert!(body["agentId"].is_null());
    assert!(body.get("code").is_none());
}

#[tokio::test]
async fn agent_flow_walks_every_step() {
    let ctx = TestContext::new();
    let agent_id = ctx.seed_agent().await;
    ctx.identity
        .upsert_delegated_address(DelegatedAddress {
            user_wallet: WALLET.to_string(),
            address: "0xdelegate".into(),
            created_at: Utc::now(),
        })
        .await
        .unwrap();

    let (_, body) = ctx.status(WALLET).await;
    assert_eq!(body["step"], "telegram");
    assert_eq!(body["hasSetup"], true);
    assert_eq!(body["agent"]["id"], agent_id.to_string());
    assert_eq!(body["delegatedAddress"]["address"], "0xdelegate");

    let link = telegram_link(6001);
    let wallet = WalletId::normalize(WALLET).unwrap();
    ctx.guard().record_link(&wallet, &link).await.unwrap();
    ctx.identity.attach_link(link.id, agent_id).await.unwrap();

    let (_, body) = ctx.status(WALLET).await;
    assert_eq!(body["step"], "preferences");
    assert_eq!(body["telegramUser"]["agentId"], agent_id.to_string());

    let (_, body) = ctx.generate(json!({ "userWallet": WALLET })).await;
    assert_eq!(body["alreadyLinked"], true);
    assert_eq!(body["agentId"], agent_id.to_string());

    let prefs = TradingPreferences {
        risk_tolerance: 80,
        trade_frequency: 30,
        social_sentiment_weight: 60,
        price_momentum_focus: 40,
        market_rank_priority: 20,
    };
    ctx.seed_deployment(agent_id, TradingPreferences::default(), Utc::now() - ChronoDuration::days(1))
        .await;
    ctx.seed_deployment(agent_id, prefs, Utc::now()).await;

    let (_, body) = ctx.status(WALLET).await;
    assert_eq!(body["step"], "ostium");
    assert_eq!(body["tradingPreferences"]["riskTolerance"], 80);
    assert_eq!(body["tradingPreferences"]["marketRankPriority"], 20);
    assert_eq!(body["deployment"]["riskTolerance"], 80);
}

#[tokio::test]
async fn codes_expire_after_ttl() {
    let ctx = TestContext::new();

    let (_, body) = ctx.generate(json!({ "userWallet": WALLET })).await;
    let code = body["code"].as_str().unwrap().to_string();

    ctx.advance(ChronoDuration::minutes(9));
    assert!(ctx.state.link_broker.resolve_code(&code).await.unwrap().is_some());

    ctx.advance(ChronoDuration::minutes(2));
    assert!(ctx.state.link_broker.resolve_code(&code).await.unwrap().is_none());
    assert!(ctx.codes.get(&code).await.unwrap().is_none());
}

#[tokio::test]
async fn repeated_generation_keeps_earlier_codes_valid() {
    let ctx = TestContext::new();

    let (_, first) = ctx.generate(json!({ "userWallet": WALLET })).await;
    let (_, second) = ctx.generate(json!({ "userWallet": "  0xabc123 " })).await;
    assert_ne!(first["code"], second["code"]);

    for body in [&first, &second] {
        let code = body["code"].as_str().unwrap();
        let wallet = ctx.state.link_broker.resolve_code(code).await.unwrap();
        assert_eq!(wallet.map(WalletId::into_inner).as_deref(), Some("0xabc123"));
    }
}

#[tokio::test]
async fn bot_lookup_failure_uses_default_handle() {
    let ctx = TestContext::with_bot(FakeBot { username: None });

    let (status, body) = ctx.generate(json!({ "userWallet": WALLET })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["handle"], "LazyTradingBot");
    assert!(body["deepLink"]
        .as_str()
        .unwrap()
        .starts_with("https://t.me/LazyTradingBot?start=LT"));
}

#[tokio::test]
async fn store_failures_surface_generic_500() {
    let state = AppState::new(
        Arc::new(BrokenStore),
        Arc::new(MemoryLinkCodeStore::new()),
        Arc::new(FakeBot {
            username: Some("OnboardBot"),
        }),
        LinkBrokerSettings::default(),
    );
    let app = create_router(state);

    let (status, body) = request_json(
        &app,
        Method::GET,
        "/api/lazy-trading/setup-status?userWallet=0xabc",
        None,
    )
    .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "Internal server error");

    let (status, body) = request_json(
        &app,
        Method::POST,
        "/api/lazy-trading/generate-link-code",
        Some(json!({ "userWallet": "0xabc" }).to_string()),
    )
    .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "Internal server error");
}

#[tokio::test]
async fn health_reports_uptime() {
    let ctx = TestContext::new();

    let (status, body) = request_json(&ctx.app, Method::GET, "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert!(body["uptimeSeconds"].as_i64().unwrap() >= 0);
    assert!(body["timestamp"].is_string());
}
