//! The JSON settings file.
//!
//! ```json
//! {
//!   "claude": { "api_key": "sk-ant-...", "model": "claude-sonnet-4-0" },
//!   "baseballmcp": { "server": "http://localhost:8000/sse" }
//! }
//! ```

use std::fmt::{self, Display};
use std::path::{Path, PathBuf};
use std::time::Duration;
use std::{env, fs, io};

use mlbchat_anthropic_model::{AnthropicConfig, AnthropicConfigBuilder};
use mlbchat_mcp::{McpConfig, McpConfigBuilder, TransportKind};
use serde::Deserialize;

/// The environment variable that supplies or overrides the API key.
pub const API_KEY_ENV: &str = "ANTHROPIC_API_KEY";

/// The error type for loading and resolving settings.
#[derive(Debug)]
pub enum ConfigError {
    /// The settings file couldn't be read.
    Io(PathBuf, io::Error),
    /// The settings file is not valid.
    Parse(PathBuf, serde_json::Error),
    /// A section the operation needs is absent.
    MissingSection(&'static str),
    /// Neither the file nor the environment has an API key.
    MissingApiKey,
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Io(path, err) => {
                write!(f, "failed to read {}: {err}", path.display())
            }
            ConfigError::Parse(path, err) => {
                write!(f, "invalid settings in {}: {err}", path.display())
            }
            ConfigError::MissingSection("claude") => {
                write!(f, "No credential found for Claude")
            }
            ConfigError::MissingSection(section) => {
                write!(f, "missing `{section}` settings")
            }
            ConfigError::MissingApiKey => write!(
                f,
                "no API key in the settings and {API_KEY_ENV} is not set"
            ),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Io(_, err) => Some(err),
            ConfigError::Parse(_, err) => Some(err),
            _ => None,
        }
    }
}

/// Settings of the whole program.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct Settings {
    /// Chat endpoint settings.
    #[serde(default)]
    pub claude: Option<ClaudeSettings>,
    /// Tool provider settings.
    #[serde(default)]
    pub baseballmcp: Option<McpSettings>,
}

/// Chat endpoint settings.
#[derive(Clone, Deserialize)]
pub struct ClaudeSettings {
    #[serde(default)]
    api_key: Option<String>,
    /// The model to use.
    pub model: String,
    /// Value of the `anthropic-version` header.
    #[serde(default)]
    pub version: Option<String>,
    /// Upper bound of tokens per completion.
    #[serde(default)]
    pub max_tokens: Option<u32>,
    /// Sampling temperature.
    #[serde(default)]
    pub temperature: Option<f32>,
    /// API base URL.
    #[serde(default)]
    pub base_url: Option<String>,
}

impl fmt::Debug for ClaudeSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClaudeSettings")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("model", &self.model)
            .field("version", &self.version)
            .field("max_tokens", &self.max_tokens)
            .field("temperature", &self.temperature)
            .field("base_url", &self.base_url)
            .finish()
    }
}

/// Which MCP transport the server speaks.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum McpTransport {
    /// HTTP+SSE.
    #[default]
    Sse,
    /// Streamable HTTP.
    #[serde(alias = "streamable-http", alias = "http")]
    StreamableHttp,
}

impl From<McpTransport> for TransportKind {
    fn from(transport: McpTransport) -> Self {
        match transport {
            McpTransport::Sse => TransportKind::Sse,
            McpTransport::StreamableHttp => TransportKind::StreamableHttp,
        }
    }
}

/// Tool provider settings.
#[derive(Clone, Debug, Deserialize)]
pub struct McpSettings {
    /// The endpoint URL.
    pub server: String,
    /// The transport, `sse` when absent.
    #[serde(default)]
    pub transport: McpTransport,
    /// Bound of each catalog fetch and tool call, in seconds.
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

impl Settings {
    /// Loads the settings file at `path`.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .map_err(|err| ConfigError::Io(path.to_owned(), err))?;
        let settings = Self::from_json(&content)
            .map_err(|err| ConfigError::Parse(path.to_owned(), err))?;
        debug!("loaded settings from {}: {:?}", path.display(), settings);
        Ok(settings)
    }

    /// Parses settings from a JSON document.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Resolves the chat endpoint configuration.
    ///
    /// The API key in the environment wins over the one in the file.
    pub fn anthropic_config(&self) -> Result<AnthropicConfig, ConfigError> {
        self.anthropic_config_with_env_key(env::var(API_KEY_ENV).ok())
    }

    fn anthropic_config_with_env_key(
        &self,
        env_key: Option<String>,
    ) -> Result<AnthropicConfig, ConfigError> {
        let claude = self
            .claude
            .as_ref()
            .ok_or(ConfigError::MissingSection("claude"))?;
        let api_key = env_key
            .filter(|key| !key.is_empty())
            .or_else(|| claude.api_key.clone())
            .ok_or(ConfigError::MissingApiKey)?;

        let mut builder = AnthropicConfigBuilder::with_api_key(api_key)
            .with_model(&claude.model);
        if let Some(version) = &claude.version {
            builder = builder.with_version(version);
        }
        if let Some(max_tokens) = claude.max_tokens {
            builder = builder.with_max_tokens(max_tokens);
        }
        if let Some(temperature) = claude.temperature {
            builder = builder.with_temperature(temperature);
        }
        if let Some(base_url) = &claude.base_url {
            builder = builder.with_base_url(base_url);
        }
        Ok(builder.build())
    }

    /// Resolves the tool provider configuration.
    pub fn mcp_config(&self) -> Result<McpConfig, ConfigError> {
        let mcp = self
            .baseballmcp
            .as_ref()
            .ok_or(ConfigError::MissingSection("baseballmcp"))?;
        let mut builder = McpConfigBuilder::with_url(&mcp.server)
            .with_transport(mcp.transport.into());
        if let Some(secs) = mcp.timeout_secs {
            builder = builder.with_timeout(Duration::from_secs(secs));
        }
        Ok(builder.build())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_settings() {
        let settings = Settings::from_json(
            r#"{
                "claude": {
                    "api_key": "sk-ant-file",
                    "version": "2023-06-01",
                    "model": "claude-sonnet-4-0",
                    "max_tokens": 2000,
                    "temperature": 0.5
                },
                "baseballmcp": {
                    "server": "http://localhost:8000/mcp",
                    "transport": "streamable_http",
                    "timeout_secs": 5
                }
            }"#,
        )
        .unwrap();

        let config = settings.anthropic_config_with_env_key(None).unwrap();
        assert_eq!(config.model(), "claude-sonnet-4-0");
        assert_eq!(
            config,
            AnthropicConfigBuilder::with_api_key("sk-ant-file")
                .with_model("claude-sonnet-4-0")
                .with_version("2023-06-01")
                .with_max_tokens(2000)
                .with_temperature(0.5)
                .build()
        );

        let mcp = settings.mcp_config().unwrap();
        assert_eq!(mcp.url(), "http://localhost:8000/mcp");
        assert_eq!(mcp.transport(), TransportKind::StreamableHttp);
        assert_eq!(
            mcp,
            McpConfigBuilder::with_url("http://localhost:8000/mcp")
                .with_transport(TransportKind::StreamableHttp)
                .with_timeout(Duration::from_secs(5))
                .build()
        );
    }

    #[test]
    fn test_env_key_wins() {
        let settings = Settings::from_json(
            r#"{ "claude": { "api_key": "from-file", "model": "m" } }"#,
        )
        .unwrap();
        let config = settings
            .anthropic_config_with_env_key(Some("from-env".to_owned()))
            .unwrap();
        assert_eq!(
            config,
            AnthropicConfigBuilder::with_api_key("from-env")
                .with_model("m")
                .build()
        );

        // An empty variable doesn't count.
        let config = settings
            .anthropic_config_with_env_key(Some(String::new()))
            .unwrap();
        assert_eq!(
            config,
            AnthropicConfigBuilder::with_api_key("from-file")
                .with_model("m")
                .build()
        );
    }

    #[test]
    fn test_missing_pieces() {
        let settings = Settings::default();
        assert!(matches!(
            settings.anthropic_config_with_env_key(None),
            Err(ConfigError::MissingSection("claude"))
        ));
        assert!(matches!(
            settings.mcp_config(),
            Err(ConfigError::MissingSection("baseballmcp"))
        ));
        assert_eq!(
            ConfigError::MissingSection("claude").to_string(),
            "No credential found for Claude"
        );

        let settings =
            Settings::from_json(r#"{ "claude": { "model": "m" } }"#).unwrap();
        assert!(matches!(
            settings.anthropic_config_with_env_key(None),
            Err(ConfigError::MissingApiKey)
        ));

        // The model is required.
        assert!(
            Settings::from_json(r#"{ "claude": { "api_key": "k" } }"#).is_err()
        );
    }

    #[test]
    fn test_transport_defaults_to_sse() {
        let settings = Settings::from_json(
            r#"{ "baseballmcp": { "server": "http://localhost:8000/sse" } }"#,
        )
        .unwrap();
        let mcp = settings.mcp_config().unwrap();
        assert_eq!(mcp.transport(), TransportKind::Sse);
    }
}
