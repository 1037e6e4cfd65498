//! Environment configuration, read once at startup.
//!
//! | Variable | Default |
//! |---|---|
//! | `DATABASE_URL` | required |
//! | `DB_NAME` | database from the URL |
//! | `DB_MAX_CONNECTIONS` | 20 |
//! | `CORS_ORIGINS` | `*` |
//! | `LLM_API_KEY` | unset (AI endpoints answer with an error payload) |
//! | `LLM_BASE_URL` | `https://api.openai.com/v1` |
//! | `LLM_MODEL` | `gpt-5.2` |
//! | `PORT` | 8001 |

const DEFAULT_PORT: u16 = 8001;
const DEFAULT_MAX_CONNECTIONS: u32 = 20;
const DEFAULT_LLM_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_LLM_MODEL: &str = "gpt-5.2";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
    #[error("{var} has an invalid value: {value:?}")]
    Invalid { var: &'static str, value: String },
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    /// Store connection string
    pub url: String,
    /// Overrides the database named in `url`
    pub name: Option<String>,
    pub max_connections: u32,
}

#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub api_key: Option<String>,
    pub base_url: String,
    pub model: String,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub port: u16,
    pub database: DatabaseConfig,
    /// Allowed CORS origins; `*` allows any origin
    pub cors_origins: Vec<String>,
    pub llm: LlmConfig,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let non_empty = |var: &str| {
            lookup(var)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let url = non_empty("DATABASE_URL").ok_or(ConfigError::Missing("DATABASE_URL"))?;

        Ok(Self {
            port: parse_or(non_empty("PORT"), "PORT", DEFAULT_PORT)?,
            database: DatabaseConfig {
                url,
                name: non_empty("DB_NAME"),
                max_connections: parse_or(
                    non_empty("DB_MAX_CONNECTIONS"),
                    "DB_MAX_CONNECTIONS",
                    DEFAULT_MAX_CONNECTIONS,
                )?,
            },
            cors_origins: parse_origins(non_empty("CORS_ORIGINS").as_deref().unwrap_or("*")),
            llm: LlmConfig {
                api_key: non_empty("LLM_API_KEY"),
                base_url: non_empty("LLM_BASE_URL")
                    .unwrap_or_else(|| DEFAULT_LLM_BASE_URL.to_string()),
                model: non_empty("LLM_MODEL").unwrap_or_else(|| DEFAULT_LLM_MODEL.to_string()),
            },
        })
    }
}

fn parse_or<T: std::str::FromStr>(
    value: Option<String>,
    var: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    match value {
        Some(value) => value
            .parse()
            .map_err(|_| ConfigError::Invalid { var, value }),
        None => Ok(default),
    }
}

/// Split a comma-separated origin list, dropping blanks.
pub fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|origin| !origin.is_empty())
        .map(str::to_string)
        .collect()
}
