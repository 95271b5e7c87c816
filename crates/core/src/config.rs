//! Configuration management for Handbook.
//!
//! Settings are merged in layers, later layers winning:
//! - Built-in defaults
//! - Config file (`.handbook/config.yaml` or `HANDBOOK_CONFIG`)
//! - Environment variables
//! - Command-line flags
//!
//! Relative paths are resolved against the workspace root.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{AppError, AppResult};
use crate::logging::LogFormat;
use crate::retry::RetryPolicy;

/// Completion providers the answering pipeline can talk to.
pub const COMPLETION_PROVIDERS: [&str; 2] = ["openai", "ollama"];

/// Embedding providers the sync engine and retriever can use.
pub const EMBEDDING_PROVIDERS: [&str; 3] = ["openai", "ollama", "trigram"];

/// Vector index backends.
pub const INDEX_BACKENDS: [&str; 2] = ["qdrant", "memory"];

/// Main application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Path to the workspace root (contains .handbook/)
    pub workspace: PathBuf,

    /// Optional config file path
    pub config_file: Option<PathBuf>,

    /// Root of the document tree (`<department>/<role>/<file>`)
    pub documents_dir: PathBuf,

    /// Location of the processed-files manifest
    pub manifest_path: PathBuf,

    /// Log level override
    pub log_level: Option<String>,

    /// Log line format
    #[serde(skip)]
    pub log_format: LogFormat,

    /// Verbose mode (enables debug logging)
    pub verbose: bool,

    /// Disable colored output
    pub no_color: bool,

    pub llm: CompletionSettings,
    pub embedding: EmbeddingSettings,
    pub index: IndexSettings,
    pub chunking: ChunkingSettings,
    pub retrieval: RetrievalSettings,
    pub timeouts: TimeoutSettings,
    pub answering: AnsweringSettings,
}

/// Completion model settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CompletionSettings {
    pub provider: String,
    pub model: String,
    pub endpoint: Option<String>,
    pub api_key_env: String,
    pub temperature: f32,
    pub max_tokens: Option<u32>,
}

impl Default for CompletionSettings {
    fn default() -> Self {
        Self {
            provider: "openai".to_string(),
            model: "gpt-4o".to_string(),
            endpoint: None,
            api_key_env: "OPENAI_API_KEY".to_string(),
            temperature: 0.1,
            max_tokens: None,
        }
    }
}

/// Embedding model settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EmbeddingSettings {
    pub provider: String,
    pub model: String,
    pub dimensions: usize,
    pub endpoint: Option<String>,
    pub api_key_env: String,
    pub batch_size: usize,
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self {
            provider: "openai".to_string(),
            model: "text-embedding-3-small".to_string(),
            dimensions: 1536,
            endpoint: None,
            api_key_env: "OPENAI_API_KEY".to_string(),
            batch_size: 64,
        }
    }
}

/// Vector index settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct IndexSettings {
    /// "qdrant" or "memory"
    pub backend: String,
    pub url: String,
    pub api_key_env: String,
    pub collection: String,
}

impl Default for IndexSettings {
    fn default() -> Self {
        Self {
            backend: "qdrant".to_string(),
            url: "http://localhost:6334".to_string(),
            api_key_env: "QDRANT_API_KEY".to_string(),
            collection: "handbook".to_string(),
        }
    }
}

/// Chunking parameters, in characters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ChunkingSettings {
    pub size: usize,
    pub overlap: usize,
    pub max_file_bytes: u64,
}

impl Default for ChunkingSettings {
    fn default() -> Self {
        Self {
            size: 1000,
            overlap: 200,
            max_file_bytes: 50 * 1024 * 1024,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RetrievalSettings {
    pub top_k: usize,
}

impl Default for RetrievalSettings {
    fn default() -> Self {
        Self { top_k: 4 }
    }
}

/// Deadlines for calls to external capabilities, in seconds.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TimeoutSettings {
    pub embedding_secs: u64,
    pub index_secs: u64,
    pub completion_secs: u64,
    pub retry_attempts: u32,
}

impl Default for TimeoutSettings {
    fn default() -> Self {
        Self {
            embedding_secs: 30,
            index_secs: 15,
            completion_secs: 60,
            retry_attempts: 3,
        }
    }
}

impl TimeoutSettings {
    pub fn embedding(&self) -> Duration {
        Duration::from_secs(self.embedding_secs)
    }

    pub fn index(&self) -> Duration {
        Duration::from_secs(self.index_secs)
    }

    pub fn completion(&self) -> Duration {
        Duration::from_secs(self.completion_secs)
    }

    /// Retry policy for transient provider failures.
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.retry_attempts.max(1),
            ..RetryPolicy::default()
        }
    }
}

/// Settings for the answering path.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AnsweringSettings {
    /// Policy statement injected into every prompt
    pub core_values: String,

    /// Roles a requester may hold; empty accepts any non-empty role
    pub known_roles: Vec<String>,

    /// Maximum answers computed concurrently by the queue
    pub workers: usize,
}

impl Default for AnsweringSettings {
    fn default() -> Self {
        Self {
            core_values: String::new(),
            known_roles: Vec::new(),
            workers: 4,
        }
    }
}

/// Full configuration file structure.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
struct ConfigFile {
    documents: Option<PathSection>,
    manifest: Option<PathSection>,
    llm: Option<CompletionSettings>,
    embedding: Option<EmbeddingSettings>,
    index: Option<IndexSettings>,
    chunking: Option<ChunkingSettings>,
    retrieval: Option<RetrievalSettings>,
    timeouts: Option<TimeoutSettings>,
    answering: Option<AnsweringSettings>,
    logging: Option<LoggingSection>,
}

#[derive(Debug, Clone, Deserialize)]
struct PathSection {
    path: PathBuf,
}

#[derive(Debug, Clone, Deserialize)]
struct LoggingSection {
    level: Option<String>,
    color: Option<bool>,
    format: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            workspace: std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            config_file: None,
            documents_dir: PathBuf::from("documents"),
            manifest_path: PathBuf::from("data/processed_files.json"),
            log_level: None,
            log_format: LogFormat::Pretty,
            verbose: false,
            no_color: false,
            llm: CompletionSettings::default(),
            embedding: EmbeddingSettings::default(),
            index: IndexSettings::default(),
            chunking: ChunkingSettings::default(),
            retrieval: RetrievalSettings::default(),
            timeouts: TimeoutSettings::default(),
            answering: AnsweringSettings::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from defaults, the config file and the environment.
    ///
    /// `workspace` and `config_file` come from the command line and take
    /// precedence over `HANDBOOK_WORKSPACE` / `HANDBOOK_CONFIG`.
    ///
    /// Environment variables:
    /// - `HANDBOOK_WORKSPACE`, `HANDBOOK_CONFIG`
    /// - `HANDBOOK_DOCUMENTS`, `HANDBOOK_MANIFEST`
    /// - `HANDBOOK_PROVIDER`, `HANDBOOK_MODEL`
    /// - `HANDBOOK_CORE_VALUES`
    /// - `QDRANT_URL`, `QDRANT_COLLECTION_NAME`
    /// - `RUST_LOG`, `NO_COLOR`
    ///
    /// # Example
    /// ```no_run
    /// use handbook_core::config::AppConfig;
    ///
    /// let config = AppConfig::load(None, None).expect("Failed to load config");
    /// println!("Documents: {:?}", config.documents_root());
    /// ```
    pub fn load(workspace: Option<PathBuf>, config_file: Option<PathBuf>) -> AppResult<Self> {
        let mut config = Self::default();

        if let Some(ws) = workspace.or_else(|| env_path("HANDBOOK_WORKSPACE")) {
            config.workspace = ws;
        }
        config.config_file = config_file.or_else(|| env_path("HANDBOOK_CONFIG"));

        if !config.workspace.exists() {
            return Err(AppError::Config(format!(
                "Workspace directory does not exist: {:?}",
                config.workspace
            )));
        }

        let config_path = match config.config_file {
            Some(ref cf) => cf.clone(),
            None => config.handbook_dir().join("config.yaml"),
        };

        if config_path.exists() {
            config.merge_yaml(&config_path)?;
        } else if config.config_file.is_some() {
            return Err(AppError::Config(format!(
                "Config file not found: {:?}",
                config_path
            )));
        }

        config.apply_env();
        Ok(config)
    }

    /// Merge a YAML configuration file into this config.
    fn merge_yaml(&mut self, path: &Path) -> AppResult<()> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            AppError::Config(format!("Failed to read config file {:?}: {}", path, e))
        })?;

        let file: ConfigFile = serde_yaml::from_str(&contents).map_err(|e| {
            AppError::Config(format!("Failed to parse config file {:?}: {}", path, e))
        })?;

        if let Some(documents) = file.documents {
            self.documents_dir = documents.path;
        }
        if let Some(manifest) = file.manifest {
            self.manifest_path = manifest.path;
        }
        if let Some(llm) = file.llm {
            self.llm = llm;
        }
        if let Some(embedding) = file.embedding {
            self.embedding = embedding;
        }
        if let Some(index) = file.index {
            self.index = index;
        }
        if let Some(chunking) = file.chunking {
            self.chunking = chunking;
        }
        if let Some(retrieval) = file.retrieval {
            self.retrieval = retrieval;
        }
        if let Some(timeouts) = file.timeouts {
            self.timeouts = timeouts;
        }
        if let Some(answering) = file.answering {
            self.answering = answering;
        }
        if let Some(logging) = file.logging {
            if let Some(level) = logging.level {
                self.log_level = Some(level);
            }
            if let Some(color) = logging.color {
                self.no_color = !color;
            }
            if let Some(format) = logging.format {
                self.log_format = LogFormat::parse(&format)?;
            }
        }

        tracing::debug!("Merged config file {:?}", path);
        Ok(())
    }

    fn apply_env(&mut self) {
        if let Some(dir) = env_path("HANDBOOK_DOCUMENTS") {
            self.documents_dir = dir;
        }
        if let Some(path) = env_path("HANDBOOK_MANIFEST") {
            self.manifest_path = path;
        }
        if let Ok(provider) = std::env::var("HANDBOOK_PROVIDER") {
            self.llm.provider = provider;
        }
        if let Ok(model) = std::env::var("HANDBOOK_MODEL") {
            self.llm.model = model;
        }
        if let Ok(values) = std::env::var("HANDBOOK_CORE_VALUES") {
            self.answering.core_values = values;
        }
        if let Ok(url) = std::env::var("QDRANT_URL") {
            self.index.url = url;
        }
        if let Ok(collection) = std::env::var("QDRANT_COLLECTION_NAME") {
            self.index.collection = collection;
        }
        if let Ok(level) = std::env::var("RUST_LOG") {
            self.log_level = Some(level);
        }
        if std::env::var("NO_COLOR").is_ok() {
            self.no_color = true;
        }
    }

    /// Apply CLI overrides to the configuration.
    pub fn with_overrides(
        mut self,
        provider: Option<String>,
        model: Option<String>,
        log_level: Option<String>,
        verbose: bool,
        no_color: bool,
        log_json: bool,
    ) -> Self {
        if let Some(provider) = provider {
            self.llm.provider = provider;
        }

        if let Some(model) = model {
            self.llm.model = model;
        }

        if let Some(log_level) = log_level {
            self.log_level = Some(log_level);
        }

        if verbose {
            self.verbose = true;
            if self.log_level.is_none() {
                self.log_level = Some("debug".to_string());
            }
        }

        if no_color {
            self.no_color = true;
        }

        if log_json {
            self.log_format = LogFormat::Json;
        }

        self
    }

    /// Get the path to the .handbook directory.
    pub fn handbook_dir(&self) -> PathBuf {
        self.workspace.join(".handbook")
    }

    /// Ensure the .handbook directory exists.
    pub fn ensure_handbook_dir(&self) -> AppResult<()> {
        let handbook_dir = self.handbook_dir();
        if !handbook_dir.exists() {
            std::fs::create_dir_all(&handbook_dir).map_err(|e| {
                AppError::Config(format!("Failed to create .handbook directory: {}", e))
            })?;
        }
        Ok(())
    }

    /// Absolute root of the document tree.
    pub fn documents_root(&self) -> PathBuf {
        self.resolve(&self.documents_dir)
    }

    /// Absolute location of the manifest file.
    pub fn manifest_file(&self) -> PathBuf {
        self.resolve(&self.manifest_path)
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.workspace.join(path)
        }
    }

    /// Read a secret from the named environment variable.
    pub fn resolve_secret(env_var: &str) -> Option<String> {
        std::env::var(env_var).ok().filter(|v| !v.trim().is_empty())
    }

    /// Validate settings needed by every command.
    pub fn validate(&self) -> AppResult<()> {
        if !COMPLETION_PROVIDERS.contains(&self.llm.provider.as_str()) {
            return Err(AppError::Config(format!(
                "Unknown completion provider: {}. Supported: {}",
                self.llm.provider,
                COMPLETION_PROVIDERS.join(", ")
            )));
        }

        if !EMBEDDING_PROVIDERS.contains(&self.embedding.provider.as_str()) {
            return Err(AppError::Config(format!(
                "Unknown embedding provider: {}. Supported: {}",
                self.embedding.provider,
                EMBEDDING_PROVIDERS.join(", ")
            )));
        }

        if !INDEX_BACKENDS.contains(&self.index.backend.as_str()) {
            return Err(AppError::Config(format!(
                "Unknown index backend: {}. Supported: {}",
                self.index.backend,
                INDEX_BACKENDS.join(", ")
            )));
        }

        if self.index.collection.trim().is_empty() {
            return Err(AppError::Config(
                "Collection name must not be empty (QDRANT_COLLECTION_NAME)".to_string(),
            ));
        }

        if self.index.backend == "qdrant" && self.index.url.trim().is_empty() {
            return Err(AppError::Config(
                "Qdrant backend requires a URL (QDRANT_URL)".to_string(),
            ));
        }

        if self.embedding.dimensions == 0 || self.embedding.batch_size == 0 {
            return Err(AppError::Config(
                "Embedding dimensions and batch size must be positive".to_string(),
            ));
        }

        if self.chunking.size == 0 || self.chunking.overlap >= self.chunking.size {
            return Err(AppError::Config(format!(
                "Chunk overlap ({}) must be smaller than chunk size ({})",
                self.chunking.overlap, self.chunking.size
            )));
        }

        if self.retrieval.top_k == 0 {
            return Err(AppError::Config("topK must be at least 1".to_string()));
        }

        if self.answering.workers == 0 {
            return Err(AppError::Config(
                "At least one answer worker is required".to_string(),
            ));
        }

        if self.timeouts.embedding_secs == 0
            || self.timeouts.index_secs == 0
            || self.timeouts.completion_secs == 0
        {
            return Err(AppError::Config("Timeouts must be positive".to_string()));
        }

        if self.embedding.provider == "openai" {
            require_secret(&self.embedding.api_key_env)?;
        }

        Ok(())
    }

    /// Additional checks for commands that generate answers.
    pub fn validate_answering(&self) -> AppResult<()> {
        self.validate()?;

        if self.answering.core_values.trim().is_empty() {
            return Err(AppError::Config(
                "Core values policy is not configured (HANDBOOK_CORE_VALUES)".to_string(),
            ));
        }

        if self.llm.provider == "openai" {
            require_secret(&self.llm.api_key_env)?;
        }

        Ok(())
    }
}

fn env_path(name: &str) -> Option<PathBuf> {
    std::env::var(name).ok().map(PathBuf::from)
}

fn require_secret(env_var: &str) -> AppResult<()> {
    if AppConfig::resolve_secret(env_var).is_none() {
        return Err(AppError::Config(format!(
            "API key not found in environment variable: {}",
            env_var
        )));
    }
    Ok(())
}
