use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub engine: EngineConfig,
    pub scratch: ScratchConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Tokio worker threads for the server runtime.
    pub workers: usize,
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
    /// Listen backlog depth passed to the socket.
    pub backlog: u32,
    /// Upper bound on request bodies (uploads included).
    pub max_body_bytes: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Upstream prediction service URL.
    pub endpoint: String,
    /// Model identifier forwarded to the engine and reported by /health.
    pub model: String,
    /// Geofencing toggle forwarded to the engine; policy is engine-side.
    pub geofence: bool,
    /// Caller fields propagated from request instances to response records.
    pub extra_fields: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScratchConfig {
    /// Directory for temporary image files; system temp dir when unset.
    pub dir: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            engine: EngineConfig::default(),
            scratch: ScratchConfig::default(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            workers: 1,
            timeout_secs: 30,
            backlog: 2048,
            max_body_bytes: 50 * 1024 * 1024,
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://127.0.0.1:8501/predict".to_string(),
            model: "kaggle:google/speciesnet/keras/v4.0.0a".to_string(),
            geofence: true,
            extra_fields: Vec::new(),
        }
    }
}

impl Default for ScratchConfig {
    fn default() -> Self {
        Self { dir: None }
    }
}

impl AppConfig {
    /// Load configuration from environment variables and config file
    pub fn load() -> anyhow::Result<Self> {
        let mut config = config::Config::builder();

        // Add default configuration
        config = config.add_source(config::Config::try_from(&AppConfig::default())?);

        // Add config file if it exists
        config = config.add_source(config::File::with_name("config").required(false));

        // Add environment variables with prefix "FAUNA_"
        config = config.add_source(
            config::Environment::with_prefix("FAUNA")
                .separator("_")
                .prefix_separator("_"),
        );

        let config = config.build()?;
        let app_config: AppConfig = config.try_deserialize()?;

        Ok(app_config)
    }

    /// Get the server bind address
    pub fn server_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    /// Scratch directory for temporary image files
    pub fn scratch_dir(&self) -> PathBuf {
        match &self.scratch.dir {
            Some(dir) => PathBuf::from(dir),
            None => std::env::temp_dir().join("fauna-gateway"),
        }
    }
}
