use std::env;
use std::time::Duration;
use url::Url;

/// 2 GiB, the largest dataset accepted for upload.
pub const DEFAULT_MAX_FILE_SIZE: u64 = 2 * 1024 * 1024 * 1024;

/// Longest model description accepted, in characters.
pub const DEFAULT_MAX_DESCRIPTION_CHARS: usize = 500;

/// Runtime configuration shared by the proxy service and the submission client
#[derive(Debug, Clone)]
pub struct ForgeConfig {
    /// Base URL of the external job manager (MANAGER_SERVICE_URL)
    pub manager_url: Option<Url>,

    /// Base URL where the local proxy is reachable (FORGE_API_URL)
    pub forge_api_url: Url,

    /// Maximum dataset size in bytes (default: 2 GiB)
    pub max_file_size: u64,

    /// Maximum description length in characters (default: 500)
    pub max_description_chars: usize,

    /// Explicit HTTP timeout. `None` keeps the client default.
    pub request_timeout: Option<Duration>,

    /// Allowed CORS Origins (comma separated)
    pub allowed_origins: Vec<String>,
}

impl Default for ForgeConfig {
    fn default() -> Self {
        Self {
            manager_url: None,
            forge_api_url: local_url(3000),
            max_file_size: DEFAULT_MAX_FILE_SIZE,
            max_description_chars: DEFAULT_MAX_DESCRIPTION_CHARS,
            request_timeout: None,
            allowed_origins: vec![
                "http://localhost:3000".to_string(),
                "http://127.0.0.1:3000".to_string(),
            ],
        }
    }
}

impl ForgeConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let default = Self::default();

        Self {
            manager_url: env::var("MANAGER_SERVICE_URL")
                .ok()
                .and_then(|v| parse_url("MANAGER_SERVICE_URL", &v)),

            forge_api_url: env::var("FORGE_API_URL")
                .ok()
                .and_then(|v| parse_url("FORGE_API_URL", &v))
                .unwrap_or(default.forge_api_url),

            max_file_size: env::var("MAX_FILE_SIZE")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(default.max_file_size),

            max_description_chars: env::var("MAX_DESCRIPTION_CHARS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(default.max_description_chars),

            request_timeout: env::var("REQUEST_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .map(Duration::from_secs),

            allowed_origins: env::var("ALLOWED_ORIGINS")
                .ok()
                .map(|v| v.split(',').map(|s| s.trim().to_string()).collect())
                .unwrap_or(default.allowed_origins),
        }
    }

    /// Local setup: manager on port 8080, proxy on the given port
    pub fn development(port: u16) -> Self {
        Self {
            manager_url: Some(local_url(8080)),
            forge_api_url: local_url(port),
            allowed_origins: vec![
                format!("http://localhost:{}", port),
                format!("http://127.0.0.1:{}", port),
                "http://localhost:5173".to_string(),
            ],
            ..Self::default()
        }
    }

    /// Builds a reqwest client honoring `request_timeout`
    pub fn http_client(&self) -> reqwest::Result<reqwest::Client> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = self.request_timeout {
            builder = builder.timeout(timeout);
        }
        builder.build()
    }
}

fn local_url(port: u16) -> Url {
    Url::parse(&format!("http://127.0.0.1:{}", port)).expect("loopback URL is valid")
}

fn parse_url(var: &str, value: &str) -> Option<Url> {
    match Url::parse(value.trim()) {
        Ok(url) => Some(url),
        Err(e) => {
            tracing::warn!("Ignoring {}={:?}: {}", var, value, e);
            None
        }
    }
}
