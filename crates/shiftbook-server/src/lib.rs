#![forbid(unsafe_code)]
//! Shiftbook HTTP service: spreadsheet-backed shift tracking for drivers.
//! Drivers log in with an employee id, start and end shifts against the
//! month roster, and the service keeps the workbooks (roster, sales ledger,
//! loaner list) as the only source of truth.

use axum::routing::{get, post};
use axum::Router;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

pub mod auth;
pub mod cache;
pub mod config;
mod error;
mod http;
pub mod sheets;
pub mod store;

pub use cache::{SheetCacheConfig, SheetCacheManager};
pub use config::{validate_startup_config, AppConfig};
pub use error::{ApiError, ApiErrorCode};
pub use sheets::SheetRepository;
pub use store::{
    FakeSheetStore, HttpSheetsBackend, HttpSheetsConfig, RetryPolicy, SheetDoc,
    SheetStoreBackend, StoreError,
};

pub const CRATE_NAME: &str = "shiftbook-server";

#[derive(Clone)]
pub struct AppState {
    pub repo: Arc<SheetRepository>,
    pub cfg: Arc<AppConfig>,
    pub ready: Arc<AtomicBool>,
}

impl AppState {
    pub fn new(repo: Arc<SheetRepository>, cfg: AppConfig) -> Self {
        Self {
            repo,
            cfg: Arc::new(cfg),
            ready: Arc::new(AtomicBool::new(false)),
        }
    }
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/v1/login", post(http::login))
        .route("/v1/logout", post(http::logout))
        .route("/v1/password", post(http::change_password))
        .route("/v1/calendar", get(http::calendar))
        .route("/v1/work/start", get(http::work_start_prefill).post(http::work_start))
        .route("/v1/work/end", get(http::work_end_prefill).post(http::work_end))
        .route("/v1/work/status/:day", post(http::set_day_status))
        .route("/v1/history", get(http::history))
        .route("/v1/loaners", get(http::loaners))
        .route("/v1/loaners/apply", post(http::apply_loaner))
        .route("/healthz", get(http::healthz))
        .route("/readyz", get(http::readyz))
        .with_state(state)
}
