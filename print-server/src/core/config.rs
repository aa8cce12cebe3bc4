use std::path::PathBuf;
use std::str::FromStr;

use crab_printer::CodePage;

/// Job store backend selected by `PRINT_STORE`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StoreBackend {
    #[default]
    Sqlite,
    /// Process memory, nothing survives a restart
    Memory,
}

impl FromStr for StoreBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sqlite" => Ok(StoreBackend::Sqlite),
            "memory" => Ok(StoreBackend::Memory),
            other => Err(format!("unknown store backend: {other}")),
        }
    }
}

/// Print server configuration
///
/// # Environment variables
///
/// Every value can be overridden by an environment variable:
///
/// | Variable | Default | Meaning |
/// |----------|---------|---------|
/// | WORK_DIR | ./data | working directory (database, logs) |
/// | HTTP_PORT | 3000 | HTTP port |
/// | DATABASE_URL | WORK_DIR/database/print_jobs.db | explicit sqlite URL |
/// | PRINT_DISPATCH_ENABLED | true | runtime switch of the dispatch endpoints |
/// | RECEIPT_WIDTH | 48 | characters per line |
/// | RECEIPT_FEED_LINES | 3 | paper feed before the cut |
/// | RECEIPT_CODE_PAGE | wpc1252 | wpc1252 or gbk |
/// | COMMAND_MEDIA_TYPE | application/vnd.star.starprnt | content type of composed receipts |
/// | CATEGORY_ORDER_PATH | - | JSON category ordering table |
/// | STATS_WINDOW_SECS | 86400 | window of the inspection aggregates |
/// | LIST_LIMIT | 50 | default inspection page size (max 500) |
/// | PRINT_STORE | sqlite | sqlite or memory |
/// | LOG_LEVEL | info | log level when RUST_LOG is unset |
/// | LOG_DIR | - | daily rolling log files |
/// | ENVIRONMENT | development | deployment environment |
///
/// Unparsable values fall back to the default.
///
/// # Example
///
/// ```ignore
/// WORK_DIR=/data/print HTTP_PORT=8080 PRINT_STORE=memory cargo run
/// ```
#[derive(Debug, Clone)]
pub struct Config {
    /// Working directory (database, logs)
    pub work_dir: String,
    /// HTTP API port
    pub http_port: u16,
    /// Explicit sqlite URL, overrides the WORK_DIR database
    pub database_url: Option<String>,
    /// Runtime switch; when off every dispatch endpoint answers 404
    pub print_dispatch_enabled: bool,
    /// Characters per receipt line
    pub receipt_width: usize,
    /// Lines fed before the cut
    pub receipt_feed_lines: u8,
    pub receipt_code_page: CodePage,
    /// Content type recorded for composed receipts
    pub command_media_type: String,
    pub category_order_path: Option<String>,
    pub stats_window_secs: u64,
    pub list_limit: u32,
    pub print_store: StoreBackend,
    pub log_level: String,
    pub log_dir: Option<String>,
    /// Environment: development | staging | production
    pub environment: String,
}

/// Upper bound of the inspection page size
pub const MAX_LIST_LIMIT: u32 = 500;

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary key lookup
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let var = |key: &str| non_blank(&lookup, key);

        Self {
            work_dir: var("WORK_DIR").unwrap_or_else(|| "./data".into()),
            http_port: parsed(&lookup, "HTTP_PORT").unwrap_or(3000),
            database_url: var("DATABASE_URL"),
            print_dispatch_enabled: var("PRINT_DISPATCH_ENABLED")
                .and_then(|v| parse_bool(&v))
                .unwrap_or(true),
            receipt_width: parsed(&lookup, "RECEIPT_WIDTH")
                .filter(|w: &usize| *w > 0)
                .unwrap_or(48),
            receipt_feed_lines: parsed(&lookup, "RECEIPT_FEED_LINES").unwrap_or(3),
            receipt_code_page: parsed(&lookup, "RECEIPT_CODE_PAGE").unwrap_or_default(),
            command_media_type: var("COMMAND_MEDIA_TYPE")
                .unwrap_or_else(|| "application/vnd.star.starprnt".into()),
            category_order_path: var("CATEGORY_ORDER_PATH"),
            stats_window_secs: parsed(&lookup, "STATS_WINDOW_SECS").unwrap_or(86_400),
            list_limit: parsed(&lookup, "LIST_LIMIT")
                .map(|l: u32| l.clamp(1, MAX_LIST_LIMIT))
                .unwrap_or(50),
            print_store: parsed(&lookup, "PRINT_STORE").unwrap_or_default(),
            log_level: var("LOG_LEVEL").unwrap_or_else(|| "info".into()),
            log_dir: var("LOG_DIR"),
            environment: var("ENVIRONMENT").unwrap_or_else(|| "development".into()),
        }
    }

    pub fn database_dir(&self) -> PathBuf {
        PathBuf::from(&self.work_dir).join("database")
    }

    /// `WORK_DIR/database/print_jobs.db`
    pub fn database_path(&self) -> PathBuf {
        self.database_dir().join("print_jobs.db")
    }

    /// Create the working directory layout
    pub fn ensure_work_dir_structure(&self) -> std::io::Result<()> {
        std::fs::create_dir_all(self.database_dir())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_env()
    }
}

fn non_blank(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<String> {
    lookup(key).filter(|v| !v.trim().is_empty())
}

fn parsed<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<T> {
    non_blank(lookup, key).and_then(|v| v.trim().parse().ok())
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> Config {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config_from(&[]);

        assert_eq!(config.http_port, 3000);
        assert!(config.print_dispatch_enabled);
        assert_eq!(config.receipt_width, 48);
        assert_eq!(config.receipt_feed_lines, 3);
        assert_eq!(config.receipt_code_page, CodePage::Wpc1252);
        assert_eq!(config.command_media_type, "application/vnd.star.starprnt");
        assert_eq!(config.stats_window_secs, 86_400);
        assert_eq!(config.list_limit, 50);
        assert_eq!(config.print_store, StoreBackend::Sqlite);
        assert!(config.database_url.is_none());
        assert_eq!(config.environment, "development");
        assert_eq!(
            config.database_path(),
            PathBuf::from("./data").join("database").join("print_jobs.db")
        );
    }

    #[test]
    fn test_overrides() {
        let config = config_from(&[
            ("PRINT_DISPATCH_ENABLED", "off"),
            ("RECEIPT_CODE_PAGE", "gbk"),
            ("RECEIPT_WIDTH", "32"),
            ("PRINT_STORE", "Memory"),
            ("LIST_LIMIT", "9000"),
            ("ENVIRONMENT", "production"),
        ]);

        assert!(!config.print_dispatch_enabled);
        assert_eq!(config.receipt_code_page, CodePage::Gbk);
        assert_eq!(config.receipt_width, 32);
        assert_eq!(config.print_store, StoreBackend::Memory);
        assert_eq!(config.list_limit, MAX_LIST_LIMIT);
        assert_eq!(config.environment, "production");
    }

    #[test]
    fn test_garbage_falls_back_to_defaults() {
        let config = config_from(&[
            ("HTTP_PORT", "eighty"),
            ("PRINT_DISPATCH_ENABLED", "maybe"),
            ("RECEIPT_CODE_PAGE", "ebcdic"),
            ("RECEIPT_WIDTH", "0"),
        ]);

        assert_eq!(config.http_port, 3000);
        assert!(config.print_dispatch_enabled);
        assert_eq!(config.receipt_code_page, CodePage::Wpc1252);
        assert_eq!(config.receipt_width, 48);
    }
}
