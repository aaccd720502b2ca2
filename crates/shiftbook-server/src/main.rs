#![forbid(unsafe_code)]

use shiftbook_server::{
    build_router, validate_startup_config, AppConfig, AppState, HttpSheetsBackend,
    HttpSheetsConfig, RetryPolicy, SheetCacheConfig, SheetCacheManager, SheetRepository,
};
use std::env;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn env_bool(name: &str, default: bool) -> bool {
    env::var(name)
        .ok()
        .and_then(|v| match v.as_str() {
            "1" | "true" | "TRUE" | "yes" | "YES" => Some(true),
            "0" | "false" | "FALSE" | "no" | "NO" => Some(false),
            _ => None,
        })
        .unwrap_or(default)
}

fn env_u64(name: &str, default: u64) -> u64 {
    env::var(name)
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .unwrap_or(default)
}

fn env_usize(name: &str, default: usize) -> usize {
    env::var(name)
        .ok()
        .and_then(|v| v.parse::<usize>().ok())
        .unwrap_or(default)
}

fn env_duration_ms(name: &str, default_ms: u64) -> Duration {
    Duration::from_millis(env_u64(name, default_ms))
}

async fn wait_for_shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        let mut sigterm = signal(SignalKind::terminate()).expect("register SIGTERM");
        let mut sigint = signal(SignalKind::interrupt()).expect("register SIGINT");
        tokio::select! {
            _ = sigterm.recv() => {}
            _ = sigint.recv() => {}
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if env_bool("SHIFTBOOK_LOG_JSON", true) {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }
}

fn config_from_env() -> Result<AppConfig, String> {
    let bind_addr = env::var("SHIFTBOOK_BIND")
        .unwrap_or_else(|_| "0.0.0.0:8080".to_string())
        .parse()
        .map_err(|e| format!("invalid SHIFTBOOK_BIND: {e}"))?;

    let sheets = HttpSheetsConfig {
        base_url: env::var("SHIFTBOOK_SHEETS_BASE_URL").unwrap_or_else(|_| {
            "https://sheets.googleapis.com/v4/spreadsheets".to_string()
        }),
        work_spreadsheet_id: env::var("SHIFTBOOK_WORK_SPREADSHEET_ID").unwrap_or_default(),
        sales_spreadsheet_id: env::var("SHIFTBOOK_SALES_SPREADSHEET_ID").unwrap_or_default(),
        auth_bearer: env::var("SHIFTBOOK_SHEETS_TOKEN").ok().filter(|t| !t.is_empty()),
        retry: RetryPolicy {
            max_attempts: env_usize("SHIFTBOOK_RETRY_MAX_ATTEMPTS", 4),
            base_backoff_ms: env_u64("SHIFTBOOK_RETRY_BASE_BACKOFF_MS", 120),
        },
        request_timeout: env_duration_ms("SHIFTBOOK_REQUEST_TIMEOUT_MS", 15_000),
    };

    Ok(AppConfig {
        bind_addr,
        sheets,
        cache: SheetCacheConfig {
            ttl: env_duration_ms("SHIFTBOOK_CACHE_TTL_MS", 30_000),
            max_entries: env_usize("SHIFTBOOK_CACHE_MAX_ENTRIES", 32),
        },
        session_secret: env::var("SHIFTBOOK_SESSION_SECRET").unwrap_or_default(),
        session_ttl: env_duration_ms("SHIFTBOOK_SESSION_TTL_MS", 12 * 60 * 60 * 1000),
        skip_readiness_probe: env_bool("SHIFTBOOK_SKIP_READINESS_PROBE", false),
    })
}

#[tokio::main]
async fn main() -> Result<(), String> {
    init_tracing();

    let cfg = config_from_env()?;
    validate_startup_config(&cfg)?;

    let backend = Arc::new(HttpSheetsBackend::new(cfg.sheets.clone()));
    let cache = Arc::new(SheetCacheManager::new(backend, cfg.cache.clone()));
    let repo = Arc::new(SheetRepository::new(cache));
    let bind_addr = cfg.bind_addr;
    let skip_probe = cfg.skip_readiness_probe;
    let state = AppState::new(repo.clone(), cfg);

    if skip_probe {
        state.ready.store(true, Ordering::Relaxed);
    } else {
        match repo.accounts().await {
            Ok(snapshot) => {
                info!(accounts = snapshot.rows.len().saturating_sub(1), "accounts sheet reachable");
                state.ready.store(true, Ordering::Relaxed);
            }
            Err(e) => {
                warn!(error = %e, "accounts sheet unreachable at startup, serving unready");
            }
        }
    }

    let app = build_router(state);
    let listener = TcpListener::bind(bind_addr)
        .await
        .map_err(|e| format!("bind {bind_addr} failed: {e}"))?;
    info!(%bind_addr, "shiftbook-server listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            wait_for_shutdown_signal().await;
            info!("shutdown signal received");
        })
        .await
        .map_err(|e| format!("server error: {e}"))?;
    Ok(())
}
