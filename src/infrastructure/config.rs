use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::domain::{DomainError, DEFAULT_TOKEN_LIMIT};

pub const DEFAULT_APP_CONFIG_PATH: &str = "config/app.yaml";
pub const DEFAULT_PROMPTS_CONFIG_PATH: &str = "config/prompts.yaml";

#[derive(Debug, Clone, Default)]
pub struct AppConfig {
    pub config: Config,
    pub prompts: PromptsConfig,
}

impl AppConfig {
    /// Loads both YAML files (missing files fall back to defaults) and then
    /// applies environment overrides.
    pub fn load() -> Result<Self, DomainError> {
        let env = |key: &str| std::env::var(key).ok();
        let app_path = env("APP_CONFIG_PATH").unwrap_or_else(|| DEFAULT_APP_CONFIG_PATH.into());
        let prompts_path =
            env("PROMPTS_CONFIG_PATH").unwrap_or_else(|| DEFAULT_PROMPTS_CONFIG_PATH.into());

        let mut config = Self {
            config: read_yaml_or_default(Path::new(&app_path))?,
            prompts: read_yaml_or_default(Path::new(&prompts_path))?,
        };
        config.apply_overrides(env)?;
        Ok(config)
    }

    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), DomainError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(dir) = lookup("DATA_DIR") {
            self.config.data.dir = PathBuf::from(dir);
        }
        if let Some(host) = lookup("SERVER_HOST") {
            self.config.server.host = host;
        }
        if let Some(port) = lookup("SERVER_PORT") {
            self.config.server.port = port
                .parse()
                .map_err(|_| DomainError::configuration(format!("invalid SERVER_PORT: {port}")))?;
        }
        if let Some(model) = lookup("OLLAMA_MODEL") {
            self.config.llm.model = model;
        }
        if let Some(url) = lookup("OLLAMA_API_BASE_URL") {
            self.config.llm.base_url = url;
        }
        self.validate()
    }

    pub fn validate(&self) -> Result<(), DomainError> {
        let c = &self.config;
        if c.rag.top_k == 0 {
            return Err(DomainError::configuration("rag.top_k must be at least 1"));
        }
        if c.memory.token_limit == 0 {
            return Err(DomainError::configuration(
                "memory.token_limit must be at least 1",
            ));
        }
        if c.ingest.chunk_size == 0 {
            return Err(DomainError::configuration(
                "ingest.chunk_size must be at least 1",
            ));
        }
        if c.data.extensions.is_empty() {
            return Err(DomainError::configuration(
                "data.extensions must list at least one file type",
            ));
        }
        if c.credential_env.trim().is_empty() {
            return Err(DomainError::configuration("credential_env must be set"));
        }
        Ok(())
    }
}

fn read_yaml_or_default<T>(path: &Path) -> Result<T, DomainError>
where
    T: for<'de> Deserialize<'de> + Default,
{
    if !path.exists() {
        tracing::debug!(path = %path.display(), "config file not found, using defaults");
        return Ok(T::default());
    }
    let raw = std::fs::read_to_string(path).map_err(|e| {
        DomainError::configuration(format!("failed to read {}: {e}", path.display()))
    })?;
    serde_yaml::from_str(&raw).map_err(|e| {
        DomainError::configuration(format!("failed to parse {}: {e}", path.display()))
    })
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Environment variable holding the parsing service credential.
    pub credential_env: String,
    pub server: ServerConfig,
    pub data: DataConfig,
    pub parser: ParserConfig,
    pub ingest: IngestConfig,
    pub embedding: EmbeddingConfig,
    pub llm: LlmConfig,
    pub rag: RagConfig,
    pub memory: MemoryConfig,
    pub sessions: SessionConfig,
    pub cors: CorsConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            credential_env: "SECRET_API_KEY".to_string(),
            server: ServerConfig::default(),
            data: DataConfig::default(),
            parser: ParserConfig::default(),
            ingest: IngestConfig::default(),
            embedding: EmbeddingConfig::default(),
            llm: LlmConfig::default(),
            rag: RagConfig::default(),
            memory: MemoryConfig::default(),
            sessions: SessionConfig::default(),
            cors: CorsConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 5000,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DataConfig {
    pub dir: PathBuf,
    /// Lower-case extensions, without the dot, that are loaded.
    pub extensions: Vec<String>,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("./data"),
            extensions: ["pdf", "txt", "md", "markdown", "csv", "json", "html", "htm"]
                .into_iter()
                .map(String::from)
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PdfBackend {
    LlamaParse,
    Local,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ParserConfig {
    pub pdf_backend: PdfBackend,
    pub base_url: String,
    pub result_type: String,
    pub poll_interval_ms: u64,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            pdf_backend: PdfBackend::LlamaParse,
            base_url: "https://api.cloud.llamaindex.ai".to_string(),
            result_type: "text".to_string(),
            poll_interval_ms: 1000,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct IngestConfig {
    pub chunk_size: usize,
    /// Upper bound for each parse call and for the whole index build.
    pub timeout_seconds: u64,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            chunk_size: 1024,
            timeout_seconds: 600,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    pub model: String,
    pub dimension: usize,
    pub batch_size: usize,
    pub cache_dir: Option<PathBuf>,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            model: "bge-small-en-v1.5".to_string(),
            dimension: 384,
            batch_size: 64,
            cache_dir: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    pub model: String,
    pub base_url: String,
    pub timeout_seconds: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            model: "llama3".to_string(),
            base_url: "http://localhost:11434".to_string(),
            timeout_seconds: 360,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RagConfig {
    pub top_k: usize,
}

impl Default for RagConfig {
    fn default() -> Self {
        Self { top_k: 2 }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MemoryConfig {
    pub token_limit: usize,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            token_limit: DEFAULT_TOKEN_LIMIT,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub max_sessions: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self { max_sessions: 1024 }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CorsConfig {
    pub allowed_origins: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PromptsConfig {
    pub agent: AgentPrompts,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AgentPrompts {
    pub system: String,
    /// Wraps the retrieved chunks; `{context}` is replaced with them.
    pub context_template: String,
}

impl Default for AgentPrompts {
    fn default() -> Self {
        Self {
            system: "You are a chatbot, able to have normal interactions. \
                     You know a lot about cars and are willing to help people with \
                     diagnostic checks before they bring their car to a mechanic."
                .to_string(),
            context_template: "Context information is below.\n\
                               --------------------\n\
                               {context}\n\
                               --------------------\n"
                .to_string(),
        }
    }
}
