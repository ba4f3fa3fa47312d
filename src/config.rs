use serde::Deserialize;

/// Argon2 work factor.
#[derive(Debug, Clone, Deserialize)]
pub struct PasswordConfig {
    pub memory_kib: u32,
    pub iterations: u32,
    pub parallelism: u32,
}

impl Default for PasswordConfig {
    fn default() -> Self {
        Self {
            memory_kib: argon2::Params::DEFAULT_M_COST,
            iterations: argon2::Params::DEFAULT_T_COST,
            parallelism: argon2::Params::DEFAULT_P_COST,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    /// `None` runs the service on the in-memory store.
    pub database_url: Option<String>,
    pub db_max_connections: u32,
    pub db_acquire_timeout_secs: u64,
    pub service_name: String,
    pub max_page_size: i64,
    pub password: PasswordConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".into(),
            port: 8000,
            database_url: None,
            db_max_connections: 10,
            db_acquire_timeout_secs: 5,
            service_name: "catalogia-users-api".into(),
            max_page_size: 1000,
            password: PasswordConfig::default(),
        }
    }
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(get: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let defaults = Self::default();
        let password = PasswordConfig {
            memory_kib: parse_or(&get, "PASSWORD_MEMORY_KIB", defaults.password.memory_kib)?,
            iterations: parse_or(&get, "PASSWORD_ITERATIONS", defaults.password.iterations)?,
            parallelism: parse_or(&get, "PASSWORD_PARALLELISM", defaults.password.parallelism)?,
        };
        let max_page_size = parse_or(&get, "MAX_PAGE_SIZE", defaults.max_page_size)?;
        anyhow::ensure!(max_page_size > 0, "MAX_PAGE_SIZE must be positive");

        Ok(Self {
            host: get("APP_HOST").unwrap_or(defaults.host),
            port: parse_or(&get, "APP_PORT", defaults.port)?,
            database_url: get("DATABASE_URL").filter(|v| !v.trim().is_empty()),
            db_max_connections: parse_or(&get, "DB_MAX_CONNECTIONS", defaults.db_max_connections)?,
            db_acquire_timeout_secs: parse_or(
                &get,
                "DB_ACQUIRE_TIMEOUT_SECS",
                defaults.db_acquire_timeout_secs,
            )?,
            service_name: get("SERVICE_NAME").unwrap_or(defaults.service_name),
            max_page_size,
            password,
        })
    }
}

fn parse_or<T>(get: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> anyhow::Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match get(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|e| anyhow::anyhow!("invalid {}={:?}: {}", key, raw, e)),
        None => Ok(default),
    }
}
