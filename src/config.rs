use anyhow::{Context, Result, anyhow};
use std::env;
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_COMPLETION_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_MODEL: &str = "gpt-3.5-turbo";
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:5000";
pub const DEFAULT_SEARCH_LIMIT: usize = 5;
pub const DEFAULT_FETCH_CONCURRENCY: usize = 4;
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;

pub const DEFAULT_SYSTEM_PROMPT: &str = "Você é um assistente especialista na documentação interna da empresa. \
Responda à pergunta do usuário usando o contexto fornecido, extraído das páginas da documentação. \
Se o contexto estiver vazio ou não contiver a resposta, responda com base no seu conhecimento geral \
e deixe claro que a informação não veio da documentação.";

/// Credentials and location of the documentation service.
#[derive(Clone)]
pub struct DocsConfig {
    pub base_url: String,
    pub username: String,
    pub api_token: String,
    pub search_limit: usize,
    pub fetch_concurrency: usize,
    pub strip_markup: bool,
}

#[derive(Clone)]
pub struct CompletionConfig {
    pub base_url: String,
    pub api_key: String,
    pub model: String,
    pub system_prompt: String,
}

#[derive(Clone, Debug)]
pub struct Config {
    pub docs: DocsConfig,
    pub completion: CompletionConfig,
    pub http_timeout: Duration,
    pub bind_addr: String,
}

impl Config {
    /// Load configuration from the process environment, reading `.env` first if present.
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_vars()
    }

    /// Same as [`Config::from_env`] but reads a specific dotenv file, which must exist.
    pub fn from_env_file(path: &Path) -> Result<Self> {
        dotenvy::from_path(path)
            .with_context(|| format!("failed to load env file {}", path.display()))?;
        Self::from_vars()
    }

    fn from_vars() -> Result<Self> {
        let docs = DocsConfig {
            base_url: trim_base_url(&get_env("DOCS_BASE_URL")?),
            username: get_env("DOCS_USERNAME")?,
            api_token: get_env("DOCS_API_TOKEN")?,
            search_limit: parse_env_or_default("SEARCH_LIMIT", DEFAULT_SEARCH_LIMIT)?,
            fetch_concurrency: parse_env_or_default(
                "FETCH_CONCURRENCY",
                DEFAULT_FETCH_CONCURRENCY,
            )?,
            strip_markup: parse_env_or_default("STRIP_MARKUP", false)?,
        };
        if docs.search_limit == 0 {
            return Err(anyhow!("SEARCH_LIMIT must be at least 1"));
        }
        if docs.fetch_concurrency == 0 {
            return Err(anyhow!("FETCH_CONCURRENCY must be at least 1"));
        }

        let completion = CompletionConfig {
            base_url: trim_base_url(&get_env_or_default(
                "OPENAI_BASE_URL",
                DEFAULT_COMPLETION_BASE_URL,
            )),
            api_key: get_env("OPENAI_API_KEY")?,
            model: get_env_or_default("OPENAI_MODEL", DEFAULT_MODEL),
            system_prompt: get_env_or_default("SYSTEM_PROMPT", DEFAULT_SYSTEM_PROMPT),
        };

        let timeout_secs = parse_env_or_default("HTTP_TIMEOUT_SECS", DEFAULT_HTTP_TIMEOUT_SECS)?;

        Ok(Config {
            docs,
            completion,
            http_timeout: Duration::from_secs(timeout_secs),
            bind_addr: get_env_or_default("BIND_ADDR", DEFAULT_BIND_ADDR),
        })
    }
}

// Secrets never reach the logs.
impl fmt::Debug for DocsConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DocsConfig")
            .field("base_url", &self.base_url)
            .field("username", &self.username)
            .field("api_token", &"<redacted>")
            .field("search_limit", &self.search_limit)
            .field("fetch_concurrency", &self.fetch_concurrency)
            .field("strip_markup", &self.strip_markup)
            .finish()
    }
}

impl fmt::Debug for CompletionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompletionConfig")
            .field("base_url", &self.base_url)
            .field("api_key", &"<redacted>")
            .field("model", &self.model)
            .finish_non_exhaustive()
    }
}

fn trim_base_url(url: &str) -> String {
    url.trim().trim_end_matches('/').to_string()
}

fn get_env(key: &str) -> Result<String> {
    env::var(key).map_err(|_| anyhow!("Missing required environment variable: {key}"))
}

fn get_env_or_default(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn parse_env_or_default<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("invalid value for {key}: {raw:?}")),
        Err(_) => Ok(default),
    }
}
