//! Configuration management for the NPC voice relay
//!
//! Everything is read from environment variables, optionally seeded from a
//! `.env` file that never overrides the real environment. Only the provider
//! credential has no default, and its absence is reported at first use
//! rather than at startup so `/health` keeps answering.

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use secrecy::SecretString;

use crate::{Error, Result};

/// Default listening port
pub const DEFAULT_PORT: u16 = 3000;

/// Default OpenAI-compatible endpoint root of the provider
pub const DEFAULT_PROVIDER_URL: &str = "https://api.groq.com/openai/v1";

/// Relay configuration
#[derive(Debug)]
pub struct Config {
    /// Port to listen on
    pub port: u16,

    /// Public base URL used to build absolute audio links (no trailing slash)
    pub base_url: String,

    /// Root of the transient file store
    pub data_dir: PathBuf,

    /// Remote provider (transcription and chat)
    pub provider: ProviderConfig,

    /// Speech configuration
    pub voice: VoiceConfig,

    /// Dialogue model configuration
    pub dialogue: DialogueConfig,

    /// Audio retention configuration
    pub store: StoreConfig,

    /// HTTP status paired with the fallback reply when the dialogue call fails
    pub fallback_status: u16,
}

/// Remote provider configuration
#[derive(Debug, Default)]
pub struct ProviderConfig {
    /// API key (`GROQ_API_KEY`)
    pub api_key: Option<SecretString>,

    /// Endpoint root, e.g. `https://api.groq.com/openai/v1`
    pub base_url: String,
}

/// Speech-to-text and text-to-speech configuration
#[derive(Debug, Clone)]
pub struct VoiceConfig {
    /// Transcription model
    pub stt_model: String,

    /// Transcription language (ISO 639-1)
    pub stt_language: String,

    /// Synthesis executable name or path
    pub tts_bin: String,

    /// Upper bound for a single synthesis run
    pub tts_timeout: Duration,
}

impl Default for VoiceConfig {
    fn default() -> Self {
        Self {
            stt_model: "whisper-large-v3".to_string(),
            stt_language: "es".to_string(),
            tts_bin: "edge-tts".to_string(),
            tts_timeout: Duration::from_secs(20),
        }
    }
}

/// Chat model configuration
#[derive(Debug, Clone)]
pub struct DialogueConfig {
    /// Chat model identifier
    pub model: String,

    /// Generated token cap
    pub max_tokens: u32,

    /// Sampling temperature
    pub temperature: f32,

    /// Trailing history turns forwarded to the model
    pub history_limit: usize,
}

impl Default for DialogueConfig {
    fn default() -> Self {
        Self {
            model: "llama-3.3-70b-versatile".to_string(),
            max_tokens: 120,
            temperature: 0.88,
            history_limit: 12,
        }
    }
}

/// Transient file store timing
#[derive(Debug, Clone, Copy)]
pub struct StoreConfig {
    /// How often the sweep runs
    pub sweep_interval: Duration,

    /// Maximum age of a file before the sweep deletes it
    pub retention: Duration,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            sweep_interval: Duration::from_secs(10 * 60),
            retention: Duration::from_secs(5 * 60),
        }
    }
}

impl Config {
    /// Load configuration with CLI overrides
    ///
    /// Precedence is CLI flag, then process environment, then a `.env` file
    /// found in the working directory or one of its parents.
    ///
    /// # Errors
    ///
    /// Returns error if the `.env` file is unreadable or a variable is set
    /// to an unparseable value
    pub fn load_with_options(port: Option<u16>, base_url: Option<&str>) -> Result<Self> {
        let file = read_env_file(dotenvy::dotenv_iter())?;
        Self::from_layers(port, base_url, |key| std::env::var(key).ok(), &file)
    }

    /// Build configuration from CLI overrides, an environment lookup and
    /// variables read from an env file, in that order of precedence
    ///
    /// # Errors
    ///
    /// Returns error if a variable is set to an unparseable value
    pub fn from_layers<F>(
        port: Option<u16>,
        base_url: Option<&str>,
        env: F,
        file: &HashMap<String, String>,
    ) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        Self::from_lookup(|key| {
            let flag = match key {
                "PORT" => port.map(|p| p.to_string()),
                "BASE_URL" => base_url.map(str::to_string),
                _ => None,
            };
            flag.or_else(|| env(key)).or_else(|| file.get(key).cloned())
        })
    }

    /// Build configuration from an arbitrary variable lookup
    ///
    /// # Errors
    ///
    /// Returns error if a variable is set to an unparseable value
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let port = parse_var(&var, "PORT")?.unwrap_or(DEFAULT_PORT);

        let base_url = match var("BASE_URL") {
            Some(raw) => validate_base_url(&raw)?,
            None => format!("http://localhost:{port}"),
        };

        let data_dir = var("NPC_RELAY_DATA_DIR").map_or_else(|| PathBuf::from("public"), PathBuf::from);

        let provider = ProviderConfig {
            api_key: var("GROQ_API_KEY").map(SecretString::from),
            base_url: var("GROQ_BASE_URL")
                .unwrap_or_else(|| DEFAULT_PROVIDER_URL.to_string())
                .trim_end_matches('/')
                .to_string(),
        };

        let voice_defaults = VoiceConfig::default();
        let voice = VoiceConfig {
            stt_model: var("NPC_RELAY_STT_MODEL").unwrap_or(voice_defaults.stt_model),
            stt_language: var("NPC_RELAY_STT_LANGUAGE").unwrap_or(voice_defaults.stt_language),
            tts_bin: var("NPC_RELAY_TTS_BIN").unwrap_or(voice_defaults.tts_bin),
            tts_timeout: voice_defaults.tts_timeout,
        };

        let dialogue = DialogueConfig {
            model: var("NPC_RELAY_LLM_MODEL").unwrap_or_else(|| DialogueConfig::default().model),
            ..DialogueConfig::default()
        };

        let store_defaults = StoreConfig::default();
        let store = StoreConfig {
            sweep_interval: parse_var(&var, "NPC_RELAY_SWEEP_SECS")?
                .map_or(store_defaults.sweep_interval, Duration::from_secs),
            retention: parse_var(&var, "NPC_RELAY_RETENTION_SECS")?
                .map_or(store_defaults.retention, Duration::from_secs),
        };

        if store.sweep_interval.is_zero() {
            return Err(Error::Config("NPC_RELAY_SWEEP_SECS must be positive".to_string()));
        }

        let fallback_status = parse_var(&var, "NPC_RELAY_FALLBACK_STATUS")?.unwrap_or(500);
        if !(100..=599).contains(&fallback_status) {
            return Err(Error::Config(format!(
                "NPC_RELAY_FALLBACK_STATUS must be an HTTP status code, got {fallback_status}"
            )));
        }

        Ok(Self {
            port,
            base_url,
            data_dir,
            provider,
            voice,
            dialogue,
            store,
            fallback_status,
        })
    }

    /// Whether the provider credential is present
    #[must_use]
    pub const fn has_api_key(&self) -> bool {
        self.provider.api_key.is_some()
    }
}

fn parse_var<T, F>(var: &F, key: &str) -> Result<Option<T>>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    var(key)
        .map(|raw| {
            raw.trim()
                .parse()
                .map_err(|e| Error::Config(format!("invalid {key} {raw:?}: {e}")))
        })
        .transpose()
}

/// Collect the pairs of a `.env` file; a missing file yields no variables
///
/// # Errors
///
/// Returns error if the file exists but cannot be read or parsed
pub fn read_env_file<R: std::io::Read>(
    file: std::result::Result<dotenvy::Iter<R>, dotenvy::Error>,
) -> Result<HashMap<String, String>> {
    let iter = match file {
        Ok(iter) => iter,
        Err(e) if e.not_found() => return Ok(HashMap::new()),
        Err(e) => return Err(Error::Config(format!("failed to read .env: {e}"))),
    };

    let vars = iter
        .collect::<std::result::Result<HashMap<_, _>, _>>()
        .map_err(|e| Error::Config(format!("invalid .env: {e}")))?;
    tracing::debug!(count = vars.len(), "loaded variables from .env");

    Ok(vars)
}

fn validate_base_url(raw: &str) -> Result<String> {
    let trimmed = raw.trim().trim_end_matches('/');
    let url = url::Url::parse(trimmed)
        .map_err(|e| Error::Config(format!("invalid BASE_URL {raw:?}: {e}")))?;

    if !matches!(url.scheme(), "http" | "https") {
        return Err(Error::Config(format!(
            "BASE_URL must be http or https, got {}",
            url.scheme()
        )));
    }

    Ok(trimmed.to_string())
}
