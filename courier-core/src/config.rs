// courier-core/src/config.rs

//! Configuration structures, credential loading and validation.

use std::path::Path;

use serde::Deserialize;
use url::Url;

use crate::errors::ConfigError;

pub const DEFAULT_MODEL: &str = "llama3.1";
pub const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";
pub const DEFAULT_GRAPH_URL: &str = "https://graph.microsoft.com/v1.0";
pub const DEFAULT_AUTHORITY: &str = "https://login.microsoftonline.com";
pub const DEFAULT_SCOPE: &str = "https://graph.microsoft.com/.default";

pub const CREDENTIAL_VARS: [&str; 3] = ["CLIENT_ID", "CLIENT_SECRET", "TENANT_ID"];

/// App registration secrets used for the client-credentials grant.
#[derive(Clone)]
pub struct Credentials {
    pub client_id: String,
    pub client_secret: String,
    pub tenant_id: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("tenant_id", &self.tenant_id)
            .finish()
    }
}

impl Credentials {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads the three credential values through `lookup`, reporting every
    /// missing name at once. Blank values count as missing.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        let [id_var, secret_var, tenant_var] = CREDENTIAL_VARS;

        match (read(id_var), read(secret_var), read(tenant_var)) {
            (Some(client_id), Some(client_secret), Some(tenant_id)) => Ok(Self {
                client_id,
                client_secret,
                tenant_id,
            }),
            (client_id, client_secret, tenant_id) => {
                let missing = [
                    (id_var, client_id.is_none()),
                    (secret_var, client_secret.is_none()),
                    (tenant_var, tenant_id.is_none()),
                ]
                .into_iter()
                .filter_map(|(name, absent)| absent.then_some(name))
                .collect();
                Err(ConfigError::MissingCredentials(missing))
            }
        }
    }
}

#[derive(Deserialize, Debug, Clone, Default)]
#[serde(default)]
pub struct CourierConfig {
    pub completion: CompletionConfig,
    pub graph: GraphConfig,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct CompletionConfig {
    pub model: String,
    pub base_url: String,
    pub temperature: f64,
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            base_url: DEFAULT_OLLAMA_URL.to_string(),
            temperature: 0.7,
        }
    }
}

#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct GraphConfig {
    pub base_url: String,
    pub authority: String,
    pub scope: String,
    /// Mailbox to act on. `None` routes requests through `/me`.
    pub user: Option<String>,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_GRAPH_URL.to_string(),
            authority: DEFAULT_AUTHORITY.to_string(),
            scope: DEFAULT_SCOPE.to_string(),
            user: None,
        }
    }
}

impl GraphConfig {
    /// Path segment that owns mail and plans: `me` or `users/{user}`.
    pub fn principal_path(&self) -> String {
        match self.user.as_deref().map(str::trim) {
            Some(user) if !user.is_empty() => format!("users/{}", user),
            _ => "me".to_string(),
        }
    }
}

impl CourierConfig {
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: CourierConfig = match toml::from_str(content) {
            Ok(cfg) => cfg,
            Err(e) => {
                tracing::error!(error = %e, "Failed to parse configuration TOML");
                return Err(ConfigError::Parse(e));
            }
        };
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let config = Self::from_toml_str(&content)?;
        tracing::info!(path = %path.display(), "Loaded configuration file.");
        Ok(config)
    }

    /// Applies the `--model` / `--ollama-url` startup parameters on top of the
    /// file values, then re-validates.
    pub fn with_overrides(
        mut self,
        model: Option<String>,
        ollama_url: Option<String>,
    ) -> Result<Self, ConfigError> {
        if let Some(model) = model {
            self.completion.model = model;
        }
        if let Some(url) = ollama_url {
            self.completion.base_url = url;
        }
        self.validate()?;
        Ok(self)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.completion.model.trim().is_empty() {
            return Err(ConfigError::invalid("'completion.model' is empty."));
        }
        if !(0.0..=2.0).contains(&self.completion.temperature) {
            return Err(ConfigError::invalid(format!(
                "'completion.temperature' must be between 0.0 and 2.0, got {}.",
                self.completion.temperature
            )));
        }
        for (key, value) in [
            ("completion.base_url", &self.completion.base_url),
            ("graph.base_url", &self.graph.base_url),
            ("graph.authority", &self.graph.authority),
        ] {
            Url::parse(value).map_err(|e| {
                ConfigError::invalid(format!("Invalid URL for '{}' ('{}'): {}", key, value, e))
            })?;
        }
        if self.graph.scope.trim().is_empty() {
            return Err(ConfigError::invalid("'graph.scope' is empty."));
        }
        Ok(())
    }
}
