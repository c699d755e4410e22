use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::io::{AsyncBufReadExt, BufReader};

use campcare_voice::audio::CpalCapture;
use campcare_voice::config::Config;
use campcare_voice::controller::{RecordingStatus, VoiceCommandController};
use campcare_voice::navigation::LoggingNavigator;
use campcare_voice::permissions::{PermissionState, SystemMicrophonePermission};
use campcare_voice::speech::{CommandSpeech, SilentSpeech, SpeechOutput};
use campcare_voice::telemetry;
use campcare_voice::transcription::RemoteTranscriber;

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::load()?;

    telemetry::init(config.telemetry.enabled, &config.telemetry.log_path)?;
    tracing::info!("campcare-voice starting");

    let capture = CpalCapture::new(&config.audio).context("audio capture setup failed")?;
    let transcriber = RemoteTranscriber::new(&config.transcription);
    let speech: Arc<dyn SpeechOutput> = if config.speech.enabled {
        Arc::new(CommandSpeech)
    } else {
        Arc::new(SilentSpeech)
    };

    let mut controller = VoiceCommandController::new(
        Box::new(capture),
        Arc::new(transcriber),
        speech,
        Box::new(SystemMicrophonePermission),
        &config.recording,
        config.audio.sample_rate,
    );
    controller.initialize(Arc::new(LoggingNavigator));

    if controller.check_or_request_permission() != PermissionState::Granted {
        anyhow::bail!("microphone permission denied");
    }

    let display_name = std::env::var("USER").unwrap_or_else(|_| "there".to_owned());
    tracing::info!("press Enter to start/stop recording, Ctrl+C to exit");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            line = lines.next_line() => {
                if line.context("stdin read failed")?.is_none() {
                    break;
                }
                match controller.status() {
                    RecordingStatus::Idle => {
                        if let Err(e) = controller.start_recording(&display_name) {
                            tracing::error!("failed to start recording: {}", e);
                        }
                    }
                    RecordingStatus::Recording | RecordingStatus::Stopped => {
                        match controller.stop_recording().await {
                            Ok(command) if !command.is_empty() => {
                                tracing::info!(command = command.as_str(), "cycle complete");
                            }
                            Ok(_) => tracing::info!("cycle ended without a command"),
                            Err(e) => tracing::error!("failed to stop recording: {}", e),
                        }
                    }
                }
            }
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("shutdown signal received");
                break;
            }
        }
    }

    Ok(())
}
