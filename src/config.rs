use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::PathBuf;

/// Top-level application configuration
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// Audio capture settings
    pub audio: AudioConfig,
    /// Recording window settings
    pub recording: RecordingConfig,
    /// Transcription endpoint settings
    pub transcription: TranscriptionConfig,
    /// Spoken feedback settings
    pub speech: SpeechConfig,
    /// Logging settings
    pub telemetry: TelemetryConfig,
}

/// Audio capture settings
#[derive(Debug, Deserialize, Clone)]
pub struct AudioConfig {
    /// Target sample rate for transcription payloads (Hz)
    pub sample_rate: u32,
    /// Ring buffer capacity in seconds at the device rate
    pub buffer_secs: usize,
}

/// Recording window settings
#[derive(Debug, Deserialize, Clone)]
pub struct RecordingConfig {
    /// Automatic-stop window in seconds; the timer fires if the user
    /// never stops the recording manually
    pub auto_stop_secs: u64,
}

/// Transcription endpoint settings
#[derive(Debug, Deserialize, Clone)]
pub struct TranscriptionConfig {
    /// Transcription service URL
    pub endpoint: String,
    /// Static bearer credential; falls back to CAMPCARE_TRANSCRIBE_KEY
    #[serde(default)]
    pub api_key: Option<String>,
    /// Multipart field name for the audio part
    pub field_name: String,
}

/// Spoken feedback settings
#[derive(Debug, Deserialize, Clone)]
pub struct SpeechConfig {
    /// Disable to suppress all spoken output
    pub enabled: bool,
}

/// Logging settings
#[derive(Debug, Deserialize, Clone)]
pub struct TelemetryConfig {
    /// Write logs to `log_path` instead of stdout
    pub enabled: bool,
    /// Log file path (supports ~ expansion)
    pub log_path: String,
}

impl Config {
    /// Load config from ~/.campcare-voice.toml, creating it with defaults on first run
    ///
    /// # Errors
    /// Returns error if the file cannot be read, created, or parsed
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;

        if !config_path.exists() {
            Self::create_default(&config_path).context("failed to create default config")?;
        }

        let contents = fs::read_to_string(&config_path).context("failed to read config file")?;

        let config: Self = toml::from_str(&contents).context("failed to parse config TOML")?;

        Ok(config)
    }

    fn config_path() -> Result<PathBuf> {
        let home = std::env::var("HOME").context("HOME environment variable not set")?;
        Ok(PathBuf::from(home).join(".campcare-voice.toml"))
    }

    fn create_default(path: &PathBuf) -> Result<()> {
        let default_config = r#"[audio]
sample_rate = 16000
buffer_secs = 30

[recording]
auto_stop_secs = 5

[transcription]
endpoint = "https://api.campcare.example/v1/transcribe"
field_name = "audio"
# api_key = "..."   # or set CAMPCARE_TRANSCRIBE_KEY

[speech]
enabled = true

[telemetry]
enabled = false
log_path = "~/.campcare-voice/voice.log"
"#;
        fs::write(path, default_config).context("failed to write default config")?;
        Ok(())
    }

    /// Expand ~ in paths to home directory
    ///
    /// # Errors
    /// Returns error if HOME is not set
    pub fn expand_path(path: &str) -> Result<PathBuf> {
        if let Some(stripped) = path.strip_prefix("~/") {
            let home = std::env::var("HOME").context("HOME environment variable not set")?;
            Ok(PathBuf::from(home).join(stripped))
        } else {
            Ok(PathBuf::from(path))
        }
    }
}

impl TranscriptionConfig {
    /// Resolve the credential: explicit key wins, then the environment
    #[must_use]
    pub fn resolve_api_key(&self) -> Option<String> {
        self.api_key
            .clone()
            .or_else(|| std::env::var("CAMPCARE_TRANSCRIBE_KEY").ok())
    }
}
