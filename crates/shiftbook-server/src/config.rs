// SPDX-License-Identifier: Apache-2.0

use crate::cache::SheetCacheConfig;
use crate::store::HttpSheetsConfig;
use std::net::SocketAddr;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind_addr: SocketAddr,
    pub sheets: HttpSheetsConfig,
    pub cache: SheetCacheConfig,
    pub session_secret: String,
    pub session_ttl: Duration,
    /// Skip the startup accounts fetch that gates readiness.
    pub skip_readiness_probe: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            sheets: HttpSheetsConfig::default(),
            cache: SheetCacheConfig::default(),
            session_secret: String::new(),
            session_ttl: Duration::from_secs(12 * 60 * 60),
            skip_readiness_probe: false,
        }
    }
}

/// Startup contract: refuse to boot with a config that can only fail later.
pub fn validate_startup_config(cfg: &AppConfig) -> Result<(), String> {
    if cfg.sheets.work_spreadsheet_id.trim().is_empty() {
        return Err("work spreadsheet id must not be empty".to_string());
    }
    if cfg.sheets.sales_spreadsheet_id.trim().is_empty() {
        return Err("sales spreadsheet id must not be empty".to_string());
    }
    if cfg.session_secret.trim().is_empty() {
        return Err("session secret must not be empty".to_string());
    }
    if cfg.session_ttl.is_zero() {
        return Err("session ttl must be positive".to_string());
    }
    if cfg.sheets.retry.max_attempts == 0 {
        return Err("retry max attempts must be at least 1".to_string());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid() -> AppConfig {
        let mut cfg = AppConfig::default();
        cfg.sheets.work_spreadsheet_id = "work-id".to_string();
        cfg.sheets.sales_spreadsheet_id = "sales-id".to_string();
        cfg.session_secret = "secret".to_string();
        cfg
    }

    #[test]
    fn valid_config_passes() {
        assert!(validate_startup_config(&valid()).is_ok());
    }

    #[test]
    fn empty_ids_and_secret_are_rejected() {
        let mut cfg = valid();
        cfg.sheets.work_spreadsheet_id = " ".to_string();
        assert!(validate_startup_config(&cfg).is_err());

        let mut cfg = valid();
        cfg.sheets.sales_spreadsheet_id = String::new();
        assert!(validate_startup_config(&cfg).is_err());

        let mut cfg = valid();
        cfg.session_secret = String::new();
        assert!(validate_startup_config(&cfg).is_err());

        let mut cfg = valid();
        cfg.sheets.retry.max_attempts = 0;
        assert!(validate_startup_config(&cfg).is_err());
    }
}
