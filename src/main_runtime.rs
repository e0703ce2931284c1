use lazy_onboard::adapters::{PostgresStore, RedisLinkCodeStore, TelegramBotClient};
use lazy_onboard::api::AppState;
use lazy_onboard::config::{AppConfig, LoggingConfig};
use lazy_onboard::error::Result;
use lazy_onboard::persistence::{MemoryIdentityStore, MemoryLinkCodeStore};
use lazy_onboard::platform::LinkCodeStore;
use lazy_onboard::services::LinkBrokerSettings;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;

const MEMORY_PURGE_INTERVAL: Duration = Duration::from_secs(60);

pub fn init_logging(config: &LoggingConfig) {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!("{},lazy_onboard=debug,sqlx=warn", config.level))
    });

    // File logging is opt-in through LAZY_LOG_DIR.
    //
    // `tracing_appender::rolling::daily` panics if it can't create the initial
    // log file, so writability is checked first.
    let log_dir = std::env::var("LAZY_LOG_DIR").ok();
    let file_layer = log_dir.as_deref().and_then(|dir| {
        let probe = std::path::Path::new(dir).join(".lazy_onboard_write_test");
        let writable = std::fs::create_dir_all(dir).is_ok()
            && std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(&probe)
                .is_ok();
        if !writable {
            eprintln!(
                "Warning: Could not write to log directory {}, file logging disabled",
                dir
            );
            return None;
        }
        let _ = std::fs::remove_file(&probe);

        let file_appender = tracing_appender::rolling::daily(dir, "lazy-onboard.log");
        let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

        // The guard flushes on drop; it lives for the rest of the process.
        Box::leak(Box::new(guard));

        Some(
            tracing_subscriber::fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(false)
                .with_target(true),
        )
    });

    let (plain_layer, json_layer) = if config.json {
        (
            None,
            Some(tracing_subscriber::fmt::layer().json().with_target(true)),
        )
    } else {
        (
            Some(
                tracing_subscriber::fmt::layer()
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_file(false)
                    .with_line_number(false),
            ),
            None,
        )
    };

    let file_logging_enabled = file_layer.is_some();
    tracing_subscriber::registry()
        .with(filter)
        .with(plain_layer)
        .with(json_layer)
        .with(file_layer)
        .init();

    if file_logging_enabled {
        eprintln!(
            "Logging to: {}/lazy-onboard.log",
            log_dir.unwrap_or_default()
        );
    }
}

pub fn init_logging_simple() {
    // Minimal logging for one-shot CLI commands
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::WARN)
        .try_init();
}

/// Wire stores, bot client and services from configuration
pub async fn build_state(config: &AppConfig, memory: bool) -> Result<AppState> {
    let bot = Arc::new(TelegramBotClient::from_config(&config.telegram)?);
    if config.telegram.bot_token.is_none() {
        warn!(
            "telegram.bot_token is not set; deep links will use @{}",
            config.telegram.default_handle
        );
    }
    let settings = LinkBrokerSettings::from_config(config);

    if memory {
        info!("Using in-memory stores");
        return Ok(AppState::new(
            Arc::new(MemoryIdentityStore::new()),
            memory_code_store(),
            bot,
            settings,
        ));
    }

    let store = PostgresStore::new(&config.database.url, config.database.max_connections).await?;
    let codes: Arc<dyn LinkCodeStore> = match config.link_codes.redis_url.as_deref() {
        Some(url) => Arc::new(RedisLinkCodeStore::connect(url, &config.link_codes.key_prefix).await?),
        None => {
            warn!("link_codes.redis_url is not set; link codes are local to this process");
            memory_code_store()
        }
    };

    Ok(AppState::new(Arc::new(store.clone()), codes, bot, settings).with_database(store))
}

/// In-process code store with a background sweep of expired entries
fn memory_code_store() -> Arc<dyn LinkCodeStore> {
    let codes = MemoryLinkCodeStore::new();
    let sweeper = codes.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(MEMORY_PURGE_INTERVAL);
        loop {
            interval.tick().await;
            let purged = sweeper.purge_expired();
            if purged > 0 {
                debug!(purged, "Purged expired link codes");
            }
        }
    });
    Arc::new(codes)
}

pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => error!("Failed to install SIGTERM handler: {}", e),
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("Shutdown signal received");
}
