//! Record/transcribe/dispatch lifecycle
//!
//! One recording cycle at a time: acquire the microphone, buffer within a
//! bounded window, submit the capture to the transcription service, resolve
//! the transcript against the phrase catalog, and hand the result to the
//! navigation capability. All failures are converted to spoken feedback
//! here; nothing propagates to the hosting surface and nothing is retried.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::audio::{self, AudioCapture};
use crate::commands::{CommandAction, CommandCatalog, TranscriptCommand};
use crate::config::RecordingConfig;
use crate::error::{Result, VoiceError};
use crate::navigation::Navigator;
use crate::permissions::{MicrophonePermission, PermissionState};
use crate::speech::SpeechOutput;
use crate::transcription::{AudioPayload, Transcriber};

/// Lifecycle state of the active recording session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordingStatus {
    /// No capture in progress
    Idle,
    /// Microphone is hot and buffering
    Recording,
    /// Capture halted, transcription pending
    Stopped,
}

/// Handle for an in-progress recording session
#[derive(Debug, Clone, Copy)]
pub struct SessionHandle {
    /// Monotonic per-controller session id
    pub id: u64,
    /// When capture began
    pub started_at: Instant,
}

struct SessionState {
    status: RecordingStatus,
    id: u64,
    started_at: Option<Instant>,
    /// Pending auto-stop timer; cleared on every transition out of Recording
    timeout: Option<JoinHandle<()>>,
}

/// Owns the record/transcribe/dispatch cycle
///
/// Single-flow by construction: every operation is awaited sequentially by
/// the caller, and the auto-stop timer is the only spawned task. The timer
/// and an explicit `stop_recording` race to stop the same session; the race
/// is resolved under the session mutex by checking status and session id,
/// and the timer handle is aborted on any explicit stop.
pub struct VoiceCommandController {
    state: Arc<Mutex<SessionState>>,
    capture: Arc<Mutex<Box<dyn AudioCapture>>>,
    transcriber: Arc<dyn Transcriber>,
    speech: Arc<dyn SpeechOutput>,
    permission: Box<dyn MicrophonePermission>,
    navigator: Option<Arc<dyn Navigator>>,
    catalog: CommandCatalog,
    permission_state: PermissionState,
    auto_stop: Duration,
    sample_rate: u32,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn capability_fallback() -> String {
    let samples = CommandCatalog::sample_phrases()
        .iter()
        .map(|p| format!("'{p}'"))
        .collect::<Vec<_>>()
        .join(", ");
    format!("Sorry, I didn't catch that. You can say things like {samples}.")
}

impl VoiceCommandController {
    /// Build a controller from its collaborators
    ///
    /// The navigation capability is supplied separately via [`initialize`];
    /// recording operations before that fail with `NotInitialized`.
    ///
    /// [`initialize`]: Self::initialize
    #[must_use]
    pub fn new(
        capture: Box<dyn AudioCapture>,
        transcriber: Arc<dyn Transcriber>,
        speech: Arc<dyn SpeechOutput>,
        permission: Box<dyn MicrophonePermission>,
        recording: &RecordingConfig,
        sample_rate: u32,
    ) -> Self {
        Self {
            state: Arc::new(Mutex::new(SessionState {
                status: RecordingStatus::Idle,
                id: 0,
                started_at: None,
                timeout: None,
            })),
            capture: Arc::new(Mutex::new(capture)),
            transcriber,
            speech,
            permission,
            navigator: None,
            catalog: CommandCatalog::new(),
            permission_state: PermissionState::Unknown,
            auto_stop: Duration::from_secs(recording.auto_stop_secs),
            sample_rate,
        }
    }

    /// Store the navigation capability
    pub fn initialize(&mut self, navigator: Arc<dyn Navigator>) {
        self.navigator = Some(navigator);
    }

    /// Current cached permission state
    #[must_use]
    pub const fn permission_state(&self) -> PermissionState {
        self.permission_state
    }

    /// Query the platform permission, prompting when unknown or re-askable
    ///
    /// May suspend pending the system permission dialog on platforms that
    /// have one; callers must await completion before starting a recording.
    pub fn check_or_request_permission(&mut self) -> PermissionState {
        let resolved = if self.permission_state == PermissionState::Granted {
            PermissionState::Granted
        } else {
            match self.permission.check() {
                PermissionState::Granted => PermissionState::Granted,
                PermissionState::Unknown | PermissionState::Denied => self.permission.request(),
            }
        };

        info!(state = ?resolved, "microphone permission resolved");
        self.permission_state = resolved;
        resolved
    }

    /// Begin a recording cycle
    ///
    /// Speaks a greeting referencing `display_name` and arms the auto-stop
    /// timer. A start while a session is already `Recording` is coalesced:
    /// the call logs a warning and returns the existing session's handle
    /// without touching its timer or state.
    ///
    /// # Errors
    /// `NotInitialized` before [`initialize`](Self::initialize),
    /// `PermissionDenied` without granted permission,
    /// `CaptureAcquisition` if the microphone cannot be activated
    pub fn start_recording(&mut self, display_name: &str) -> Result<SessionHandle> {
        if self.navigator.is_none() {
            return Err(VoiceError::NotInitialized);
        }
        if self.permission_state != PermissionState::Granted {
            return Err(VoiceError::PermissionDenied);
        }

        {
            let state = lock(&self.state);
            if state.status == RecordingStatus::Recording {
                warn!(session = state.id, "start requested while already recording, coalescing");
                return Ok(SessionHandle {
                    id: state.id,
                    started_at: state.started_at.unwrap_or_else(Instant::now),
                });
            }
        }

        // Acquire the microphone before any state transition: an acquisition
        // failure leaves the session Idle with no timer armed
        lock(&self.capture)
            .start()
            .map_err(VoiceError::CaptureAcquisition)?;

        let started_at = Instant::now();
        let session_id = {
            let mut state = lock(&self.state);
            state.id += 1;
            state.status = RecordingStatus::Recording;
            state.started_at = Some(started_at);
            state.id
        };

        info!(session = session_id, "recording started");
        self.speech
            .say(&format!("Hello, {display_name}. How may I assist you today?"));

        let timer = self.arm_auto_stop(session_id);
        lock(&self.state).timeout = Some(timer);

        Ok(SessionHandle {
            id: session_id,
            started_at,
        })
    }

    /// Spawn the auto-stop timer for `session_id`
    ///
    /// When the window elapses and the same session is still Recording, the
    /// capture is halted and discarded, the capability fallback is spoken,
    /// and the session returns to Idle. No transcription call is made on
    /// this path. The whole handler runs under the session mutex so it
    /// cannot interleave with an explicit stop.
    fn arm_auto_stop(&self, session_id: u64) -> JoinHandle<()> {
        let state = Arc::clone(&self.state);
        let capture = Arc::clone(&self.capture);
        let speech = Arc::clone(&self.speech);
        let window = self.auto_stop;

        tokio::spawn(async move {
            tokio::time::sleep(window).await;

            let mut state = lock(&state);
            if state.status != RecordingStatus::Recording || state.id != session_id {
                debug!(session = session_id, "auto-stop timer fired for finished session");
                return;
            }

            info!(session = session_id, "recording window elapsed, discarding capture");
            state.status = RecordingStatus::Idle;
            state.started_at = None;
            state.timeout = None;

            if let Err(e) = lock(&capture).stop() {
                warn!("failed to release capture after timeout: {}", e);
            }

            speech.say(&capability_fallback());
        })
    }

    /// Stop the active recording and run transcription and dispatch
    ///
    /// No-op returning the empty command when no session is `Recording`,
    /// which also covers a manual stop arriving after the auto-stop timer
    /// has already fired. Transport and credential failures end the cycle
    /// with spoken feedback and the empty command; there is no retry.
    ///
    /// # Errors
    /// `NotInitialized` before [`initialize`](Self::initialize)
    pub async fn stop_recording(&mut self) -> Result<TranscriptCommand> {
        if self.navigator.is_none() {
            return Err(VoiceError::NotInitialized);
        }

        let session_id = {
            let mut state = lock(&self.state);
            if state.status != RecordingStatus::Recording {
                debug!("stop requested with no active recording");
                return Ok(TranscriptCommand::empty());
            }

            if let Some(timer) = state.timeout.take() {
                timer.abort();
            }
            state.status = RecordingStatus::Stopped;
            state.id
        };

        let samples = match lock(&self.capture).stop() {
            Ok(samples) => samples,
            Err(e) => {
                warn!(session = session_id, "failed to stop capture: {}", e);
                self.finish_cycle();
                return Ok(TranscriptCommand::empty());
            }
        };

        info!(session = session_id, samples = samples.len(), "submitting transcription");

        let payload = match audio::encode_wav(&samples, self.sample_rate) {
            Ok(data) => AudioPayload::wav(data),
            Err(e) => {
                warn!(session = session_id, "failed to encode capture: {}", e);
                self.finish_cycle();
                return Ok(TranscriptCommand::empty());
            }
        };

        let text = match self.transcriber.transcribe(payload).await {
            Ok(text) => text,
            Err(e) => {
                warn!(session = session_id, "transcription failed: {}", e);
                let notice = match e {
                    VoiceError::TranscriptionRejected { .. } => {
                        "I couldn't verify the transcription service credentials. \
                         Please try again later."
                    }
                    _ => "I couldn't reach the transcription service. Please try again later.",
                };
                self.speech.say(notice);
                self.finish_cycle();
                return Ok(TranscriptCommand::empty());
            }
        };

        let command = TranscriptCommand::normalize(&text);
        info!(session = session_id, command = command.as_str(), "transcript received");

        self.finish_cycle();
        self.dispatch(&command);

        Ok(command)
    }

    /// Resolve a transcript against the catalog and act on it
    ///
    /// A navigation hit invokes `go_to` exactly once; an informational hit
    /// is acknowledged but performs no navigation; a miss speaks the
    /// capability fallback. Dispatch is skipped entirely when the hosting
    /// surface is no longer live.
    pub fn dispatch(&self, command: &TranscriptCommand) {
        if command.is_empty() {
            return;
        }

        let Some(navigator) = &self.navigator else {
            return;
        };

        if !navigator.is_live() {
            warn!(command = command.as_str(), "navigator gone, skipping dispatch");
            return;
        }

        match self.catalog.resolve(command) {
            Some(CommandAction::Navigate(destination)) => {
                info!(screen = destination.screen_name(), "dispatching navigation");
                navigator.go_to(destination.screen_name(), None);
            }
            Some(CommandAction::Informational(topic)) => {
                info!(?topic, "informational request, not actionable");
                self.speech
                    .say("I heard you, but that information isn't available yet.");
            }
            None => {
                debug!(command = command.as_str(), "unrecognized command");
                self.speech.say(&capability_fallback());
            }
        }
    }

    /// Current session status
    #[must_use]
    pub fn status(&self) -> RecordingStatus {
        lock(&self.state).status
    }

    fn finish_cycle(&self) {
        let mut state = lock(&self.state);
        state.status = RecordingStatus::Idle;
        state.started_at = None;
        state.timeout = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::MockAudioCapture;
    use crate::navigation::MockNavigator;
    use crate::permissions::MockMicrophonePermission;
    use crate::speech::MockSpeechOutput;
    use crate::transcription::MockTranscriber;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn recording_config() -> RecordingConfig {
        RecordingConfig { auto_stop_secs: 5 }
    }

    fn granted_permission() -> Box<MockMicrophonePermission> {
        let mut permission = MockMicrophonePermission::new();
        permission
            .expect_check()
            .return_const(PermissionState::Granted);
        Box::new(permission)
    }

    fn quiet_speech() -> Arc<MockSpeechOutput> {
        let mut speech = MockSpeechOutput::new();
        speech.expect_say().return_const(());
        Arc::new(speech)
    }

    fn live_navigator() -> MockNavigator {
        let mut navigator = MockNavigator::new();
        navigator.expect_is_live().return_const(true);
        navigator
    }

    fn idle_capture() -> Box<MockAudioCapture> {
        let mut capture = MockAudioCapture::new();
        capture.expect_start().returning(|| Ok(()));
        capture.expect_stop().returning(|| Ok(vec![0.0_f32; 160]));
        Box::new(capture)
    }

    fn controller_with(
        capture: Box<MockAudioCapture>,
        transcriber: MockTranscriber,
        speech: Arc<MockSpeechOutput>,
        navigator: MockNavigator,
    ) -> VoiceCommandController {
        let mut controller = VoiceCommandController::new(
            capture,
            Arc::new(transcriber),
            speech,
            granted_permission(),
            &recording_config(),
            16000,
        );
        controller.initialize(Arc::new(navigator));
        controller.check_or_request_permission();
        controller
    }

    #[tokio::test]
    async fn test_operations_before_initialize_fail() {
        let mut controller = VoiceCommandController::new(
            idle_capture(),
            Arc::new(MockTranscriber::new()),
            quiet_speech(),
            granted_permission(),
            &recording_config(),
            16000,
        );
        controller.check_or_request_permission();

        assert!(matches!(
            controller.start_recording("Ama"),
            Err(VoiceError::NotInitialized)
        ));
        assert!(matches!(
            controller.stop_recording().await,
            Err(VoiceError::NotInitialized)
        ));
    }

    #[tokio::test]
    async fn test_start_requires_granted_permission() {
        let mut permission = MockMicrophonePermission::new();
        permission
            .expect_check()
            .return_const(PermissionState::Denied);
        permission
            .expect_request()
            .return_const(PermissionState::Denied);

        let mut controller = VoiceCommandController::new(
            idle_capture(),
            Arc::new(MockTranscriber::new()),
            quiet_speech(),
            Box::new(permission),
            &recording_config(),
            16000,
        );
        controller.initialize(Arc::new(live_navigator()));

        assert_eq!(
            controller.check_or_request_permission(),
            PermissionState::Denied
        );
        assert!(matches!(
            controller.start_recording("Ama"),
            Err(VoiceError::PermissionDenied)
        ));
    }

    #[tokio::test]
    async fn test_permission_result_is_cached() {
        let mut permission = MockMicrophonePermission::new();
        permission
            .expect_check()
            .times(1)
            .return_const(PermissionState::Granted);

        let mut controller = VoiceCommandController::new(
            idle_capture(),
            Arc::new(MockTranscriber::new()),
            quiet_speech(),
            Box::new(permission),
            &recording_config(),
            16000,
        );

        // Second call must not hit the platform again
        assert_eq!(
            controller.check_or_request_permission(),
            PermissionState::Granted
        );
        assert_eq!(
            controller.check_or_request_permission(),
            PermissionState::Granted
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_speaks_greeting_with_display_name() {
        let mut speech = MockSpeechOutput::new();
        speech
            .expect_say()
            .withf(|text| text == "Hello, Ama. How may I assist you today?")
            .times(1)
            .return_const(());

        let mut controller = controller_with(
            idle_capture(),
            MockTranscriber::new(),
            Arc::new(speech),
            live_navigator(),
        );

        controller.start_recording("Ama").unwrap();
        assert_eq!(controller.status(), RecordingStatus::Recording);
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_start_is_coalesced() {
        let mut capture = MockAudioCapture::new();
        // Exactly one acquisition regardless of how many starts arrive
        capture.expect_start().times(1).returning(|| Ok(()));
        capture.expect_stop().returning(|| Ok(Vec::new()));

        let mut controller = controller_with(
            Box::new(capture),
            MockTranscriber::new(),
            quiet_speech(),
            live_navigator(),
        );

        let first = controller.start_recording("Ama").unwrap();
        let second = controller.start_recording("Ama").unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(controller.status(), RecordingStatus::Recording);
    }

    #[tokio::test(start_paused = true)]
    async fn test_acquisition_failure_leaves_idle_with_no_timer() {
        let mut capture = MockAudioCapture::new();
        capture
            .expect_start()
            .returning(|| Err(anyhow::anyhow!("device busy")));

        let mut speech = MockSpeechOutput::new();
        // No greeting when acquisition fails
        speech.expect_say().times(0);

        let mut controller = controller_with(
            Box::new(capture),
            MockTranscriber::new(),
            Arc::new(speech),
            live_navigator(),
        );

        let result = controller.start_recording("Ama");
        assert!(matches!(result, Err(VoiceError::CaptureAcquisition(_))));
        assert_eq!(controller.status(), RecordingStatus::Idle);

        // If a timer had been armed it would fire here and call stop()
        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(controller.status(), RecordingStatus::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn test_manual_stop_dispatches_exactly_once() {
        let mut transcriber = MockTranscriber::new();
        transcriber
            .expect_transcribe()
            .times(1)
            .returning(|_| Ok("Take me to settings".to_owned()));

        let mut navigator = live_navigator();
        navigator
            .expect_go_to()
            .withf(|screen, params| screen == "Settings" && params.is_none())
            .times(1)
            .return_const(());

        let mut controller =
            controller_with(idle_capture(), transcriber, quiet_speech(), navigator);

        controller.start_recording("Ama").unwrap();
        let command = controller.stop_recording().await.unwrap();

        assert_eq!(command.as_str(), "take me to settings");
        assert_eq!(controller.status(), RecordingStatus::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unrecognized_transcript_speaks_fallback_and_never_navigates() {
        let mut transcriber = MockTranscriber::new();
        transcriber
            .expect_transcribe()
            .returning(|_| Ok("order me a pizza".to_owned()));

        let fallback_count = Arc::new(AtomicUsize::new(0));
        let counted = Arc::clone(&fallback_count);
        let mut speech = MockSpeechOutput::new();
        speech.expect_say().returning(move |text| {
            if text.contains("You can say things like") {
                counted.fetch_add(1, Ordering::SeqCst);
            }
        });

        let mut navigator = live_navigator();
        navigator.expect_go_to().times(0);

        let mut controller =
            controller_with(idle_capture(), transcriber, Arc::new(speech), navigator);

        controller.start_recording("Ama").unwrap();
        controller.stop_recording().await.unwrap();

        assert_eq!(fallback_count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_auth_rejection_speaks_credential_notice_without_dispatch() {
        let mut transcriber = MockTranscriber::new();
        transcriber
            .expect_transcribe()
            .returning(|_| Err(VoiceError::TranscriptionRejected { status: 401 }));

        let mut speech = MockSpeechOutput::new();
        speech
            .expect_say()
            .withf(|text| text.contains("credentials"))
            .times(1)
            .return_const(());
        speech.expect_say().return_const(()); // greeting

        let mut navigator = live_navigator();
        navigator.expect_go_to().times(0);

        let mut controller =
            controller_with(idle_capture(), transcriber, Arc::new(speech), navigator);

        controller.start_recording("Ama").unwrap();
        let command = controller.stop_recording().await.unwrap();

        assert!(command.is_empty());
        assert_eq!(controller.status(), RecordingStatus::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_discards_capture_without_transcription() {
        let mut capture = MockAudioCapture::new();
        capture.expect_start().times(1).returning(|| Ok(()));
        capture.expect_stop().times(1).returning(|| Ok(Vec::new()));

        let mut transcriber = MockTranscriber::new();
        transcriber.expect_transcribe().times(0);

        let mut navigator = live_navigator();
        navigator.expect_go_to().times(0);

        let mut controller = controller_with(
            Box::new(capture),
            transcriber,
            quiet_speech(),
            navigator,
        );

        controller.start_recording("Kwame").unwrap();
        tokio::time::sleep(Duration::from_secs(6)).await;

        assert_eq!(controller.status(), RecordingStatus::Idle);

        // A stop arriving after the timer fired is a no-op: stop() is not
        // called a second time and nothing is submitted
        let command = controller.stop_recording().await.unwrap();
        assert!(command.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_manual_stop_cancels_timer() {
        let mut capture = MockAudioCapture::new();
        capture.expect_start().times(1).returning(|| Ok(()));
        // A fired timer would call stop() a second time
        capture.expect_stop().times(1).returning(|| Ok(Vec::new()));

        let mut transcriber = MockTranscriber::new();
        transcriber
            .expect_transcribe()
            .times(1)
            .returning(|_| Ok(String::new()));

        let mut controller = controller_with(
            Box::new(capture),
            transcriber,
            quiet_speech(),
            live_navigator(),
        );

        controller.start_recording("Ama").unwrap();
        controller.stop_recording().await.unwrap();

        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(controller.status(), RecordingStatus::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn test_dispatch_skipped_when_navigator_not_live() {
        let mut transcriber = MockTranscriber::new();
        transcriber
            .expect_transcribe()
            .returning(|_| Ok("Take me to settings".to_owned()));

        let mut navigator = MockNavigator::new();
        navigator.expect_is_live().return_const(false);
        navigator.expect_go_to().times(0);

        let mut controller =
            controller_with(idle_capture(), transcriber, quiet_speech(), navigator);

        controller.start_recording("Ama").unwrap();
        controller.stop_recording().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_informational_command_acknowledged_without_navigation() {
        let mut transcriber = MockTranscriber::new();
        transcriber
            .expect_transcribe()
            .returning(|_| Ok("Is my counselor available?".to_owned()));

        let mut speech = MockSpeechOutput::new();
        speech
            .expect_say()
            .withf(|text| text.contains("isn't available yet"))
            .times(1)
            .return_const(());
        speech.expect_say().return_const(()); // greeting

        let mut navigator = live_navigator();
        navigator.expect_go_to().times(0);

        let mut controller =
            controller_with(idle_capture(), transcriber, Arc::new(speech), navigator);

        controller.start_recording("Ama").unwrap();
        controller.stop_recording().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_new_cycle_can_start_after_stop() {
        let mut capture = MockAudioCapture::new();
        capture.expect_start().times(2).returning(|| Ok(()));
        capture.expect_stop().times(2).returning(|| Ok(Vec::new()));

        let mut transcriber = MockTranscriber::new();
        transcriber
            .expect_transcribe()
            .times(2)
            .returning(|_| Ok(String::new()));

        let mut controller = controller_with(
            Box::new(capture),
            transcriber,
            quiet_speech(),
            live_navigator(),
        );

        let first = controller.start_recording("Ama").unwrap();
        controller.stop_recording().await.unwrap();
        let second = controller.start_recording("Ama").unwrap();
        controller.stop_recording().await.unwrap();

        assert!(second.id > first.id);
    }
}
