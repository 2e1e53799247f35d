//! Configuration loading and backend selection.
//!
//! One explicit `Config` value is constructed at startup and passed by
//! reference into the orchestrator, sandbox, and registry
//! constructors. Nothing here is global.

use crate::error::{ConfigError, CoreResult};
use redscout_provider::google::GoogleProvider;
use redscout_provider::local::LocalProvider;
use redscout_provider::openai::OpenAiProvider;
use redscout_provider::{Backend, BoxedLanguageModel};
use redscout_sandbox::SandboxConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Environment variable holding the Google API key.
pub const GOOGLE_API_KEY_VAR: &str = "GOOGLE_API_KEY";
/// Environment variable holding the OpenAI API key.
pub const OPENAI_API_KEY_VAR: &str = "OPENAI_API_KEY";

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Reasoning backend selection and tuning.
    pub agent: AgentConfig,
    /// Sandbox image, network, and resource settings.
    pub runtime: SandboxConfig,
}

/// Reasoning backend configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    /// Which backend to use. An unrecognized value fails at load,
    /// before any sandbox is created.
    pub source: Backend,

    /// Model identifier for the Google backend.
    pub google_model: String,

    /// Model identifier for the OpenAI backend.
    pub openai_model: String,

    /// Path to the local model weights. Required when `source` is
    /// `local`.
    pub local_model_path: Option<PathBuf>,

    /// OpenAI-compatible endpoint serving the local model.
    pub local_endpoint: String,

    /// Hard cap on reasoning iterations per run.
    pub max_iterations: u32,

    /// Phrases that mark the assessment as finished, matched
    /// case-insensitively against assistant content.
    pub termination_phrases: Vec<String>,

    /// Whether proposed tool calls require operator review.
    pub review: bool,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            source: Backend::Google,
            google_model: "gemini-2.0-flash".to_string(),
            openai_model: "gpt-4o-mini".to_string(),
            local_model_path: None,
            local_endpoint: redscout_provider::local::DEFAULT_ENDPOINT.to_string(),
            max_iterations: 10,
            termination_phrases: vec!["assessment complete".to_string()],
            review: true,
        }
    }
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ConfigError::NotFound {
                    path: path.display().to_string(),
                }
            } else {
                ConfigError::Invalid {
                    path: path.display().to_string(),
                    message: e.to_string(),
                }
            }
        })?;

        let config: Config = toml::from_str(&raw).map_err(|e| ConfigError::Invalid {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a file if it exists, otherwise fall back to defaults.
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        match Self::load(path) {
            Err(ConfigError::NotFound { .. }) => {
                let config = Self::default();
                config.validate()?;
                Ok(config)
            }
            other => other,
        }
    }

    /// Validate cross-field constraints.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.agent.source == Backend::Local {
            match &self.agent.local_model_path {
                Some(path) if !path.as_os_str().is_empty() => {}
                _ => return Err(ConfigError::MissingModelPath),
            }
        }
        if self.agent.max_iterations == 0 {
            return Err(ConfigError::validation("max_iterations must be at least 1"));
        }
        // The memory bound is a hard invariant of the sandbox; a limit
        // that cannot be parsed must not degrade to an unbounded
        // container.
        if self.runtime.memory_bytes().is_none() {
            return Err(ConfigError::validation(format!(
                "unparseable sandbox memory limit: {:?}",
                self.runtime.memory_limit
            )));
        }
        Ok(())
    }

    /// Resolve the configured backend into a reasoning model.
    ///
    /// Runs before any sandbox exists; every failure here is a
    /// ConfigurationError.
    pub fn build_model(&self) -> CoreResult<BoxedLanguageModel> {
        self.validate()?;
        let model: BoxedLanguageModel = match self.agent.source {
            Backend::Google => {
                let key = std::env::var(GOOGLE_API_KEY_VAR).unwrap_or_default();
                Arc::new(
                    GoogleProvider::new(&key, &self.agent.google_model).map_err(|e| {
                        ConfigError::validation(format!("google backend: {}", e))
                    })?,
                )
            }
            Backend::OpenAi => {
                let key = std::env::var(OPENAI_API_KEY_VAR).unwrap_or_default();
                Arc::new(
                    OpenAiProvider::new(&key, &self.agent.openai_model).map_err(|e| {
                        ConfigError::validation(format!("openai backend: {}", e))
                    })?,
                )
            }
            Backend::Local => {
                // validate() guarantees the path is present.
                let path = self
                    .agent
                    .local_model_path
                    .as_deref()
                    .ok_or(ConfigError::MissingModelPath)?;
                Arc::new(LocalProvider::new(path, &self.agent.local_endpoint))
            }
        };
        Ok(model)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_config(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.agent.source, Backend::Google);
        assert_eq!(config.agent.max_iterations, 10);
        assert_eq!(config.runtime.image(), "redscout/runtime:latest");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_full_file() {
        let file = write_config(
            r#"
            [agent]
            source = "openai"
            openai_model = "gpt-4o"
            max_iterations = 25
            termination_phrases = ["assessment complete", "nothing further"]
            review = false

            [runtime]
            image_name = "custom/image"
            image_tag = "v2"
            network_name = "isolated"
            memory_limit = "1g"
            container_prefix = "scan-"
            "#,
        );

        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.agent.source, Backend::OpenAi);
        assert_eq!(config.agent.openai_model, "gpt-4o");
        assert_eq!(config.agent.max_iterations, 25);
        assert!(!config.agent.review);
        assert_eq!(config.runtime.image(), "custom/image:v2");
        assert_eq!(config.runtime.container_name("x"), "scan-x");
    }

    #[test]
    fn test_unsupported_backend_is_fatal_at_load() {
        let file = write_config("[agent]\nsource = \"skynet\"\n");
        let err = Config::load(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { .. }));
    }

    #[test]
    fn test_local_backend_requires_model_path() {
        let file = write_config("[agent]\nsource = \"local\"\n");
        let err = Config::load(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::MissingModelPath));
    }

    #[test]
    fn test_local_backend_with_path_builds() {
        let file = write_config(
            "[agent]\nsource = \"local\"\nlocal_model_path = \"/models/scout-7b.gguf\"\n",
        );
        let config = Config::load(file.path()).unwrap();
        let model = config.build_model().unwrap();
        assert_eq!(model.provider_id(), "local");
        assert_eq!(model.model_id(), "scout-7b");
    }

    #[test]
    fn test_missing_file_falls_back_to_defaults() {
        let config = Config::load_or_default(Path::new("/nonexistent/redscout.toml")).unwrap();
        assert_eq!(config.agent.source, Backend::Google);
    }

    #[test]
    fn test_zero_iteration_cap_rejected() {
        let file = write_config("[agent]\nmax_iterations = 0\n");
        assert!(Config::load(file.path()).is_err());
    }

    #[test]
    fn test_unparseable_memory_limit_rejected_at_load() {
        let file = write_config("[runtime]\nmemory_limit = \"lots\"\n");
        let err = Config::load(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Validation { .. }));
        assert!(err.to_string().contains("memory limit"));
    }

    #[test]
    fn test_byte_suffix_memory_limit_accepted() {
        let file = write_config("[runtime]\nmemory_limit = \"512mb\"\n");
        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.runtime.memory_bytes(), Some(512 * 1024 * 1024));
    }
}
