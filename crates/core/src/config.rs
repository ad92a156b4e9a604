//! Configuration management for the support desk.
//!
//! This module handles loading and merging configuration from multiple sources:
//! - Built-in defaults
//! - Config files (.support/config.yaml)
//! - Environment variables
//! - Command-line flags
//!
//! The configuration is workspace-centric, with most state stored in `.support/`.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::error::{AppError, AppResult};

/// Providers the synthesis boundary knows how to talk to.
pub const KNOWN_PROVIDERS: [&str; 2] = ["gemini", "ollama"];

/// Environment variable holding the Gemini key when no provider config overrides it.
pub const DEFAULT_GEMINI_KEY_ENV: &str = "GOOGLE_API_KEY";

/// Main application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Path to the workspace root (contains .support/)
    pub workspace: PathBuf,

    /// Optional config file path
    pub config_file: Option<PathBuf>,

    /// Active synthesis provider ("gemini" or "ollama")
    pub provider: String,

    /// Model identifier for the active provider
    pub model: String,

    /// API key override (SUPPORT_API_KEY)
    pub api_key: Option<String>,

    /// Log level override
    pub log_level: Option<String>,

    /// Verbose mode (enables debug logging)
    pub verbose: bool,

    /// Disable colored output
    pub no_color: bool,

    /// Emit logs as JSON lines
    pub log_json: bool,

    /// LLM provider configurations
    pub llm: Option<LlmConfig>,

    /// Query routing settings
    pub routing: RoutingConfig,

    /// Synthesis boundary settings
    pub synthesis: SynthesisConfig,

    /// Knowledge store locations
    pub storage: StorageConfig,
}

/// LLM configuration from config.yaml.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    #[serde(rename = "activeProvider")]
    pub active_provider: String,

    pub providers: HashMap<String, ProviderConfig>,
}

/// Provider-specific configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ProviderConfig {
    Gemini {
        #[serde(rename = "apiKeyEnv")]
        api_key_env: String,
        model: String,
        endpoint: Option<String>,
    },
    Ollama {
        endpoint: String,
        model: String,
    },
}

impl ProviderConfig {
    pub fn model(&self) -> &str {
        match self {
            Self::Gemini { model, .. } => model,
            Self::Ollama { model, .. } => model,
        }
    }

    pub fn endpoint(&self) -> Option<&str> {
        match self {
            Self::Gemini { endpoint, .. } => endpoint.as_deref(),
            Self::Ollama { endpoint, .. } => Some(endpoint),
        }
    }
}

/// Query routing settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RoutingConfig {
    /// Substrings that mark a query as policy-domain
    pub policy_keywords: Vec<String>,

    /// Number of policy chunks requested when the caller does not say
    pub default_results: usize,

    /// Tickets rendered per customer in the synthesis prompt
    pub max_tickets_in_prompt: usize,
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            policy_keywords: [
                "policy",
                "policies",
                "faq",
                "refund",
                "return",
                "shipping",
                "delivery",
                "payment",
                "exchange",
                "warranty",
                "guarantee",
                "privacy",
                "terms",
                "condition",
                "cancellation",
                "guidelines",
                "procedure",
            ]
            .iter()
            .map(|k| k.to_string())
            .collect(),
            default_results: 5,
            max_tickets_in_prompt: 3,
        }
    }
}

/// Synthesis boundary settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SynthesisConfig {
    /// Deadline for a single synthesis attempt
    pub timeout_secs: u64,

    /// Attempts before surfacing SynthesisUnavailable (1 = no retry)
    pub max_attempts: u32,

    /// First backoff delay; doubles after each failed attempt
    pub initial_backoff_ms: u64,

    pub temperature: f32,

    pub max_tokens: Option<u32>,
}

impl Default for SynthesisConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            max_attempts: 3,
            initial_backoff_ms: 500,
            temperature: 0.7,
            max_tokens: None,
        }
    }
}

/// Knowledge store locations, relative to the workspace unless absolute.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StorageConfig {
    pub directory_path: PathBuf,
    pub index_path: PathBuf,
    pub chunk_size: usize,
    pub chunk_overlap: usize,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            directory_path: PathBuf::from(".support/customers.sqlite"),
            index_path: PathBuf::from(".support/policies.sqlite"),
            chunk_size: 1000,
            chunk_overlap: 200,
        }
    }
}

/// Full configuration file structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct ConfigFile {
    llm: Option<LlmConfig>,
    workspace: Option<WorkspaceConfig>,
    logging: Option<LoggingConfig>,
    routing: Option<RoutingConfig>,
    synthesis: Option<SynthesisConfig>,
    storage: Option<StorageConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct WorkspaceConfig {
    path: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct LoggingConfig {
    level: Option<String>,
    color: Option<bool>,
    json: Option<bool>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            workspace: std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            config_file: None,
            provider: "gemini".to_string(),
            model: "gemini-2.5-flash".to_string(),
            api_key: None,
            log_level: None,
            verbose: false,
            no_color: false,
            log_json: false,
            llm: None,
            routing: RoutingConfig::default(),
            synthesis: SynthesisConfig::default(),
            storage: StorageConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from defaults, the YAML file and environment variables.
    ///
    /// Environment variables:
    /// - `SUPPORT_WORKSPACE`: Override workspace path
    /// - `SUPPORT_CONFIG`: Path to config file
    /// - `SUPPORT_PROVIDER`: Synthesis provider
    /// - `SUPPORT_MODEL`: Model identifier
    /// - `SUPPORT_API_KEY`: API key
    /// - `RUST_LOG`: Log level
    /// - `NO_COLOR`: Disable colored output
    ///
    /// # Example
    /// ```no_run
    /// use support_core::config::AppConfig;
    ///
    /// let config = AppConfig::load().expect("Failed to load config");
    /// println!("Workspace: {:?}", config.workspace);
    /// ```
    pub fn load() -> AppResult<Self> {
        let mut config = Self::default();

        if let Ok(workspace) = std::env::var("SUPPORT_WORKSPACE") {
            config.workspace = PathBuf::from(workspace);
        }

        if let Ok(config_file) = std::env::var("SUPPORT_CONFIG") {
            config.config_file = Some(PathBuf::from(config_file));
        }

        if !config.workspace.exists() {
            return Err(AppError::Config(format!(
                "Workspace directory does not exist: {:?}",
                config.workspace
            )));
        }

        let config_path = config.config_path();
        if config_path.exists() {
            config = config.merge_yaml(&config_path)?;
        }

        // Environment variables override YAML config
        if let Ok(provider) = std::env::var("SUPPORT_PROVIDER") {
            config.provider = provider;
        }

        if let Ok(model) = std::env::var("SUPPORT_MODEL") {
            config.model = model;
        }

        if let Ok(key) = std::env::var("SUPPORT_API_KEY") {
            config.api_key = Some(key);
        }

        if let Ok(level) = std::env::var("RUST_LOG") {
            config.log_level = Some(level);
        }

        if std::env::var("NO_COLOR").is_ok() {
            config.no_color = true;
        }

        Ok(config)
    }

    /// The YAML file this config reads: `config_file` if set, else
    /// `<workspace>/.support/config.yaml`.
    pub fn config_path(&self) -> PathBuf {
        match self.config_file {
            Some(ref cf) => cf.clone(),
            None => self.workspace.join(".support/config.yaml"),
        }
    }

    /// Point the config at another workspace or config file and merge that
    /// YAML file, if it exists.
    pub fn relocate(
        mut self,
        workspace: Option<PathBuf>,
        config_file: Option<PathBuf>,
    ) -> AppResult<Self> {
        if let Some(workspace) = workspace {
            if !workspace.exists() {
                return Err(AppError::Config(format!(
                    "Workspace directory does not exist: {:?}",
                    workspace
                )));
            }
            self.workspace = workspace;
        }
        if config_file.is_some() {
            self.config_file = config_file;
        }

        let config_path = self.config_path();
        if config_path.exists() {
            self.merge_yaml(&config_path)
        } else {
            Ok(self)
        }
    }

    /// Merge YAML configuration file into this config.
    pub fn merge_yaml(&self, path: &Path) -> AppResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            AppError::Config(format!("Failed to read config file {:?}: {}", path, e))
        })?;

        self.merge_yaml_str(&contents)
            .map_err(|e| AppError::Config(format!("Failed to parse config file {:?}: {}", path, e)))
    }

    fn merge_yaml_str(&self, contents: &str) -> Result<Self, serde_yaml::Error> {
        let config_file: ConfigFile = serde_yaml::from_str(contents)?;
        let mut result = self.clone();

        if let Some(path) = config_file.workspace.and_then(|ws| ws.path) {
            result.workspace = PathBuf::from(path);
        }

        if let Some(logging) = config_file.logging {
            if let Some(level) = logging.level {
                result.log_level = Some(level);
            }
            if let Some(color) = logging.color {
                result.no_color = !color;
            }
            if let Some(json) = logging.json {
                result.log_json = json;
            }
        }

        if let Some(llm) = config_file.llm {
            result.provider = llm.active_provider.clone();
            if let Some(provider_config) = llm.providers.get(&llm.active_provider) {
                result.model = provider_config.model().to_string();
            }
            result.llm = Some(llm);
        }

        if let Some(routing) = config_file.routing {
            result.routing = routing;
        }

        if let Some(synthesis) = config_file.synthesis {
            result.synthesis = synthesis;
        }

        if let Some(storage) = config_file.storage {
            result.storage = storage;
        }

        Ok(result)
    }

    /// Apply CLI overrides to the configuration.
    ///
    /// CLI flags take precedence over environment variables and the file.
    #[allow(clippy::too_many_arguments)]
    pub fn with_overrides(
        mut self,
        workspace: Option<PathBuf>,
        config_file: Option<PathBuf>,
        provider: Option<String>,
        model: Option<String>,
        log_level: Option<String>,
        verbose: bool,
        no_color: bool,
        log_json: bool,
    ) -> Self {
        if let Some(workspace) = workspace {
            self.workspace = workspace;
        }

        if let Some(config_file) = config_file {
            self.config_file = Some(config_file);
        }

        if let Some(provider) = provider {
            self.provider = provider;
        }

        if let Some(model) = model {
            self.model = model;
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
            self.log_json = true;
        }

        self
    }

    /// Get the path to the .support directory.
    pub fn support_dir(&self) -> PathBuf {
        self.workspace.join(".support")
    }

    /// Ensure the .support directory exists.
    pub fn ensure_support_dir(&self) -> AppResult<()> {
        let support_dir = self.support_dir();
        if !support_dir.exists() {
            std::fs::create_dir_all(&support_dir).map_err(|e| {
                AppError::Config(format!("Failed to create .support directory: {}", e))
            })?;
        }
        Ok(())
    }

    /// Customer directory database path, resolved against the workspace.
    pub fn directory_path(&self) -> PathBuf {
        self.resolve(&self.storage.directory_path)
    }

    /// Policy index database path, resolved against the workspace.
    pub fn index_path(&self) -> PathBuf {
        self.resolve(&self.storage.index_path)
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.workspace.join(path)
        }
    }

    /// Get a provider's configuration block, if the file declared one.
    pub fn get_provider_config(&self, provider: &str) -> Option<&ProviderConfig> {
        self.llm.as_ref().and_then(|llm| llm.providers.get(provider))
    }

    /// Endpoint override for the active provider.
    pub fn provider_endpoint(&self) -> Option<&str> {
        self.get_provider_config(&self.provider)
            .and_then(|pc| pc.endpoint())
    }

    /// Resolve the API key for a provider.
    ///
    /// `SUPPORT_API_KEY` wins; otherwise the provider's `apiKeyEnv`
    /// (Gemini defaults to `GOOGLE_API_KEY`).
    pub fn resolve_api_key(&self, provider: &str) -> Option<String> {
        if let Some(ref key) = self.api_key {
            return Some(key.clone());
        }

        let env_var = match self.get_provider_config(provider) {
            Some(ProviderConfig::Gemini { api_key_env, .. }) => Some(api_key_env.clone()),
            Some(ProviderConfig::Ollama { .. }) => None,
            None if provider == "gemini" => Some(DEFAULT_GEMINI_KEY_ENV.to_string()),
            None => None,
        };

        env_var
            .and_then(|var| std::env::var(var).ok())
            .filter(|key| !key.trim().is_empty())
    }

    /// Validate configuration for the active provider.
    ///
    /// Called once at startup; a missing credential is fatal for the
    /// lifetime of the process.
    pub fn validate(&self) -> AppResult<()> {
        let provider = self.provider.as_str();

        if !KNOWN_PROVIDERS.contains(&provider) {
            return Err(AppError::Config(format!(
                "Unknown provider: {}. Supported: {}",
                provider,
                KNOWN_PROVIDERS.join(", ")
            )));
        }

        if provider == "gemini" && self.resolve_api_key(provider).is_none() {
            let env_var = match self.get_provider_config(provider) {
                Some(ProviderConfig::Gemini { api_key_env, .. }) => api_key_env.as_str(),
                _ => DEFAULT_GEMINI_KEY_ENV,
            };
            return Err(AppError::ConfigurationMissing(format!(
                "{} not set. Export your Gemini API key or set SUPPORT_API_KEY.",
                env_var
            )));
        }

        if self.model.trim().is_empty() {
            return Err(AppError::ConfigurationMissing(format!(
                "No model configured for provider {}",
                provider
            )));
        }

        if self.routing.default_results == 0 {
            return Err(AppError::Config(
                "routing.defaultResults must be at least 1".to_string(),
            ));
        }

        if self.synthesis.max_attempts == 0 {
            return Err(AppError::Config(
                "synthesis.maxAttempts must be at least 1".to_string(),
            ));
        }

        if self.synthesis.timeout_secs == 0 {
            return Err(AppError::Config(
                "synthesis.timeoutSecs must be at least 1".to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn ollama_config() -> AppConfig {
        AppConfig {
            provider: "ollama".to_string(),
            model: "llama3.2".to_string(),
            ..AppConfig::default()
        }
    }

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.provider, "gemini");
        assert_eq!(config.model, "gemini-2.5-flash");
        assert_eq!(config.routing.default_results, 5);
        assert_eq!(config.synthesis.max_attempts, 3);
        assert!(config.routing.policy_keywords.contains(&"refund".to_string()));
        assert!(!config.verbose);
    }

    #[test]
    fn test_support_dir() {
        let config = AppConfig::default();
        assert!(config.support_dir().ends_with(".support"));
    }

    #[test]
    fn test_storage_paths_resolve_against_workspace() {
        let mut config = AppConfig::default();
        config.workspace = PathBuf::from("/srv/desk");
        assert_eq!(
            config.directory_path(),
            PathBuf::from("/srv/desk/.support/customers.sqlite")
        );

        config.storage.index_path = PathBuf::from("/var/lib/policies.sqlite");
        assert_eq!(config.index_path(), PathBuf::from("/var/lib/policies.sqlite"));
    }

    #[test]
    fn test_relocate_reads_workspace_config() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join(".support")).unwrap();
        std::fs::write(
            dir.path().join(".support/config.yaml"),
            "routing:\n  defaultResults: 8\n",
        )
        .unwrap();

        let config = AppConfig::default()
            .relocate(Some(dir.path().to_path_buf()), None)
            .unwrap();
        assert_eq!(config.workspace, dir.path());
        assert_eq!(config.routing.default_results, 8);

        let missing = AppConfig::default().relocate(Some(dir.path().join("nope")), None);
        assert!(matches!(missing, Err(AppError::Config(_))));
    }

    #[test]
    fn test_with_overrides() {
        let config = AppConfig::default();
        let overridden = config.with_overrides(
            None,
            None,
            Some("ollama".to_string()),
            Some("mistral".to_string()),
            None,
            true,
            false,
            true,
        );

        assert_eq!(overridden.provider, "ollama");
        assert_eq!(overridden.model, "mistral");
        assert!(overridden.verbose);
        assert!(overridden.log_json);
        assert_eq!(overridden.log_level, Some("debug".to_string()));
    }

    #[test]
    fn test_merge_yaml() {
        let yaml = r#"
llm:
  activeProvider: ollama
  providers:
    ollama:
      endpoint: "http://gpu-box:11434"
      model: "llama3.1"
routing:
  policyKeywords: ["refund", "shipping"]
  defaultResults: 3
synthesis:
  timeoutSecs: 10
  maxAttempts: 2
logging:
  level: debug
  color: false
"#;
        let merged = AppConfig::default().merge_yaml_str(yaml).unwrap();
        assert_eq!(merged.provider, "ollama");
        assert_eq!(merged.model, "llama3.1");
        assert_eq!(merged.provider_endpoint(), Some("http://gpu-box:11434"));
        assert_eq!(merged.routing.policy_keywords, vec!["refund", "shipping"]);
        assert_eq!(merged.routing.default_results, 3);
        assert_eq!(merged.routing.max_tickets_in_prompt, 3);
        assert_eq!(merged.synthesis.timeout_secs, 10);
        assert_eq!(merged.synthesis.initial_backoff_ms, 500);
        assert_eq!(merged.log_level, Some("debug".to_string()));
        assert!(merged.no_color);
    }

    #[test]
    fn test_merge_yaml_file_reports_path() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.yaml");
        std::fs::write(&path, "routing: [not, a, map").unwrap();

        let err = AppConfig::default().merge_yaml(&path).unwrap_err();
        assert!(matches!(err, AppError::Config(_)));
        assert!(err.to_string().contains("config.yaml"));
    }

    #[test]
    fn test_validate_unknown_provider() {
        let mut config = AppConfig::default();
        config.provider = "unknown".to_string();
        assert!(matches!(config.validate(), Err(AppError::Config(_))));
    }

    #[test]
    fn test_validate_ollama() {
        assert!(ollama_config().validate().is_ok());
    }

    #[test]
    fn test_validate_gemini_without_key_is_missing_configuration() {
        let mut config = AppConfig::default();
        config.llm = Some(LlmConfig {
            active_provider: "gemini".to_string(),
            providers: HashMap::from([(
                "gemini".to_string(),
                ProviderConfig::Gemini {
                    api_key_env: "SUPPORT_TEST_KEY_THAT_IS_NEVER_SET".to_string(),
                    model: "gemini-2.5-flash".to_string(),
                    endpoint: None,
                },
            )]),
        });

        let err = config.validate().unwrap_err();
        assert!(matches!(err, AppError::ConfigurationMissing(_)));
        assert!(err
            .to_string()
            .contains("SUPPORT_TEST_KEY_THAT_IS_NEVER_SET"));
    }

    #[test]
    fn test_validate_gemini_with_explicit_key() {
        let mut config = AppConfig::default();
        config.api_key = Some("test-key".to_string());
        assert!(config.validate().is_ok());
        assert_eq!(config.resolve_api_key("gemini"), Some("test-key".to_string()));
    }

    #[test]
    fn test_validate_rejects_zero_limits() {
        let mut config = ollama_config();
        config.routing.default_results = 0;
        assert!(config.validate().is_err());

        let mut config = ollama_config();
        config.synthesis.max_attempts = 0;
        assert!(config.validate().is_err());
    }
}
