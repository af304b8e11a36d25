use serde::Deserialize;
use std::str::FromStr;

/// Complete GeoAllot configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GeoAllotConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub sync: SyncConfig,
}

/// HTTP server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Allowed CORS origin (`*` for any)
    #[serde(default = "default_cors_origin")]
    pub cors_origin: String,
    /// Maximum accepted `POST /add-plot` body size
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_cors_origin() -> String {
    "*".to_string()
}

fn default_max_body_bytes() -> usize {
    5 * 1024 * 1024 // 5 MB
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors_origin: default_cors_origin(),
            max_body_bytes: default_max_body_bytes(),
        }
    }
}

impl ServerConfig {
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Which plot store backend to open
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    Sqlite,
    Postgis,
}

impl FromStr for StoreBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "sqlite" => Ok(StoreBackend::Sqlite),
            "postgis" | "postgres" => Ok(StoreBackend::Postgis),
            other => Err(format!("unknown store backend '{}'", other)),
        }
    }
}

/// Plot store configuration
#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    #[serde(default = "default_backend")]
    pub backend: StoreBackend,
    #[serde(default = "default_sqlite_path")]
    pub sqlite_path: String,
    #[serde(default = "default_database_url")]
    pub database_url: String,
    /// PostGIS pool size
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// Create the plots table (and PostGIS extension) when missing
    #[serde(default = "default_ensure_schema")]
    pub ensure_schema: bool,
}

fn default_backend() -> StoreBackend {
    StoreBackend::Sqlite
}

fn default_sqlite_path() -> String {
    "geoallot.db".to_string()
}

fn default_database_url() -> String {
    "postgres://localhost:5432/geoallot".to_string()
}

fn default_max_connections() -> u32 {
    10
}

fn default_ensure_schema() -> bool {
    true
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            sqlite_path: default_sqlite_path(),
            database_url: default_database_url(),
            max_connections: default_max_connections(),
            ensure_schema: default_ensure_schema(),
        }
    }
}

/// Which viewer sessions receive a plot change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FanoutPolicy {
    /// Every connected session, whatever it last asked for
    #[default]
    All,
    /// Only sessions whose last-declared type filter matches the plot
    Filtered,
}

impl FromStr for FanoutPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "all" => Ok(FanoutPolicy::All),
            "filtered" => Ok(FanoutPolicy::Filtered),
            other => Err(format!("unknown fan-out policy '{}'", other)),
        }
    }
}

/// Pub/sub fan-out configuration
#[derive(Debug, Clone, Deserialize)]
pub struct SyncConfig {
    /// Outbound messages buffered per viewer session before drops
    #[serde(default = "default_session_queue_capacity")]
    pub session_queue_capacity: usize,
    #[serde(default)]
    pub fanout: FanoutPolicy,
}

fn default_session_queue_capacity() -> usize {
    64
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            session_queue_capacity: default_session_queue_capacity(),
            fanout: FanoutPolicy::default(),
        }
    }
}

impl GeoAllotConfig {
    /// Apply overrides from process environment variables
    pub fn apply_env(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Apply overrides from a variable lookup.
    ///
    /// Recognised variables:
    /// - `PORT`, `HOST`, `CORS_ORIGIN`
    /// - `GEOALLOT_STORE_BACKEND`, `GEOALLOT_SQLITE_PATH`, `GEOALLOT_FANOUT`
    /// - `DATABASE_URL`, or `DATABASE_HOST` together with `DATABASE_USER`,
    ///   `DATABASE_PASSWORD`, `DATABASE_PORT`, `DATABASE_NAME`
    ///
    /// Unparseable values are ignored.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(port) = lookup("PORT").and_then(|v| v.parse().ok()) {
            self.server.port = port;
        }
        if let Some(host) = lookup("HOST") {
            self.server.host = host;
        }
        if let Some(origin) = lookup("CORS_ORIGIN") {
            self.server.cors_origin = origin;
        }
        if let Some(backend) = lookup("GEOALLOT_STORE_BACKEND").and_then(|v| v.parse().ok()) {
            self.store.backend = backend;
        }
        if let Some(path) = lookup("GEOALLOT_SQLITE_PATH") {
            self.store.sqlite_path = path;
        }
        if let Some(fanout) = lookup("GEOALLOT_FANOUT").and_then(|v| v.parse().ok()) {
            self.sync.fanout = fanout;
        }

        if let Some(url) = lookup("DATABASE_URL") {
            self.store.database_url = url;
        } else if let Some(host) = lookup("DATABASE_HOST") {
            let user = lookup("DATABASE_USER").unwrap_or_else(|| "postgres".to_string());
            let user = urlencoding::encode(&user);
            let credentials = match lookup("DATABASE_PASSWORD") {
                Some(password) => format!("{}:{}", user, urlencoding::encode(&password)),
                None => user.into_owned(),
            };
            let port = lookup("DATABASE_PORT").unwrap_or_else(|| "5432".to_string());
            let name = lookup("DATABASE_NAME").unwrap_or_else(|| "geoallot".to_string());
            self.store.database_url = format!("postgres://{}@{}:{}/{}", credentials, host, port, name);
        }
    }
}

/// Load configuration from TOML file
pub fn load_config(path: &str) -> Result<GeoAllotConfig, Box<dyn std::error::Error>> {
    let contents = std::fs::read_to_string(path)?;
    let config: GeoAllotConfig = toml::from_str(&contents)?;
    Ok(config)
}
