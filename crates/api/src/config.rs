use std::path::PathBuf;

/// Server configuration loaded from environment variables.
///
/// All fields have sensible defaults suitable for local development.
/// In production, override via environment variables.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `3000`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS` env var.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `120`). Generation
    /// calls block on the upstream model run, which is slow.
    pub request_timeout_secs: u64,
    /// Graceful shutdown timeout in seconds (default: `30`).
    /// Reserved for draining long-running work on shutdown.
    #[allow(dead_code)]
    pub shutdown_timeout_secs: u64,
    /// Upstream API credential. Optional at startup; every generation
    /// or upload call fails with a 500 while it is unset.
    pub fal_key: Option<String>,
    /// Base URL of the synchronous model execution endpoint.
    pub fal_run_base_url: String,
    /// Base URL of the storage REST API.
    pub fal_rest_base_url: String,
    /// Path of the history JSON file.
    pub history_path: PathBuf,
    /// History store item cap.
    pub history_max_items: usize,
    /// History store byte budget.
    pub history_max_bytes: usize,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                 | Default                      |
    /// |-------------------------|------------------------------|
    /// | `HOST`                  | `0.0.0.0`                    |
    /// | `PORT`                  | `3000`                       |
    /// | `CORS_ORIGINS`          | `http://localhost:5173`      |
    /// | `REQUEST_TIMEOUT_SECS`  | `120`                        |
    /// | `SHUTDOWN_TIMEOUT_SECS` | `30`                         |
    /// | `FAL_KEY`               | (unset)                      |
    /// | `FAL_RUN_BASE_URL`      | `https://fal.run`            |
    /// | `FAL_REST_BASE_URL`     | `https://rest.alpha.fal.ai`  |
    /// | `HISTORY_PATH`          | `data/history.json`          |
    /// | `HISTORY_MAX_ITEMS`     | `50`                         |
    /// | `HISTORY_MAX_BYTES`     | `4000000`                    |
    pub fn from_env() -> Self {
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into());

        let port: u16 = std::env::var("PORT")
            .unwrap_or_else(|_| "3000".into())
            .parse()
            .expect("PORT must be a valid u16");

        let cors_origins: Vec<String> = std::env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:5173".into())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let request_timeout_secs: u64 = std::env::var("REQUEST_TIMEOUT_SECS")
            .unwrap_or_else(|_| "120".into())
            .parse()
            .expect("REQUEST_TIMEOUT_SECS must be a valid u64");

        let shutdown_timeout_secs: u64 = std::env::var("SHUTDOWN_TIMEOUT_SECS")
            .unwrap_or_else(|_| "30".into())
            .parse()
            .expect("SHUTDOWN_TIMEOUT_SECS must be a valid u64");

        let fal_key = std::env::var("FAL_KEY")
            .ok()
            .filter(|key| !key.trim().is_empty());

        let fal_run_base_url =
            std::env::var("FAL_RUN_BASE_URL").unwrap_or_else(|_| "https://fal.run".into());

        let fal_rest_base_url = std::env::var("FAL_REST_BASE_URL")
            .unwrap_or_else(|_| "https://rest.alpha.fal.ai".into());

        let history_path: PathBuf = std::env::var("HISTORY_PATH")
            .unwrap_or_else(|_| "data/history.json".into())
            .into();

        let history_max_items: usize = std::env::var("HISTORY_MAX_ITEMS")
            .unwrap_or_else(|_| "50".into())
            .parse()
            .expect("HISTORY_MAX_ITEMS must be a valid usize");

        let history_max_bytes: usize = std::env::var("HISTORY_MAX_BYTES")
            .unwrap_or_else(|_| "4000000".into())
            .parse()
            .expect("HISTORY_MAX_BYTES must be a valid usize");

        Self {
            host,
            port,
            cors_origins,
            request_timeout_secs,
            shutdown_timeout_secs,
            fal_key,
            fal_run_base_url,
            fal_rest_base_url,
            history_path,
            history_max_items,
            history_max_bytes,
        }
    }
}
