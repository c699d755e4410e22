use std::process::{Command, Stdio};

/// Text-to-speech capability, fire-and-forget
///
/// No return value is consumed; failures are logged and never interrupt the
/// recording cycle.
#[cfg_attr(test, mockall::automock)]
pub trait SpeechOutput: Send + Sync {
    /// Speak the given text
    fn say(&self, text: &str);
}

/// Speech output that shells out to the platform TTS binary
pub struct CommandSpeech;

impl CommandSpeech {
    fn tts_command(text: &str) -> Command {
        #[cfg(target_os = "macos")]
        {
            let mut cmd = Command::new("say");
            cmd.arg(text);
            cmd
        }
        #[cfg(not(target_os = "macos"))]
        {
            let mut cmd = Command::new("espeak");
            cmd.arg(text);
            cmd
        }
    }
}

impl SpeechOutput for CommandSpeech {
    fn say(&self, text: &str) {
        tracing::debug!(text, "speaking");
        let spawned = Self::tts_command(text)
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn();
        if let Err(e) = spawned {
            tracing::warn!("text-to-speech unavailable: {}", e);
        }
    }
}

/// Speech output that discards all text; used when speech is disabled
pub struct SilentSpeech;

impl SpeechOutput for SilentSpeech {
    fn say(&self, text: &str) {
        tracing::debug!(text, "speech disabled, dropping");
    }
}
