//! Voice input
//!
//! A [`SpeechRecognizer`] pushes [`RecognizerEvent`]s into a channel; the
//! [`VoiceController`] drains them through a pure transition function:
//!
//! ```text
//!              start                  final result / end / stop
//!   Idle ───────────────▶ Listening ─────────────────────────▶ Idle
//!    ▲                       │
//!    │ end / stop            │ error(code)
//!    └──────────────── Error(code) ◀─┘
//! ```
//!
//! `Unsupported` is terminal and entered only when no recognizer exists.
//!
//! A recognizer session stays open until its `end` arrives, even after an
//! error or a stop. A start requested while the previous session is still
//! open is held back until that `end`, and everything the old session
//! emits before it is dropped.

use std::fmt;

use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::{debug, info, warn};

/// Recognizer error codes
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VoiceErrorCode {
    NoSpeech,
    Aborted,
    AudioCapture,
    Network,
    NotAllowed,
    ServiceNotAllowed,
    LanguageNotSupported,
    Other(String),
}

impl VoiceErrorCode {
    pub fn as_str(&self) -> &str {
        match self {
            VoiceErrorCode::NoSpeech => "no-speech",
            VoiceErrorCode::Aborted => "aborted",
            VoiceErrorCode::AudioCapture => "audio-capture",
            VoiceErrorCode::Network => "network",
            VoiceErrorCode::NotAllowed => "not-allowed",
            VoiceErrorCode::ServiceNotAllowed => "service-not-allowed",
            VoiceErrorCode::LanguageNotSupported => "language-not-supported",
            VoiceErrorCode::Other(code) => code,
        }
    }

    pub fn from_code(code: &str) -> Self {
        match code {
            "no-speech" => VoiceErrorCode::NoSpeech,
            "aborted" => VoiceErrorCode::Aborted,
            "audio-capture" => VoiceErrorCode::AudioCapture,
            "network" => VoiceErrorCode::Network,
            "not-allowed" => VoiceErrorCode::NotAllowed,
            "service-not-allowed" => VoiceErrorCode::ServiceNotAllowed,
            "language-not-supported" => VoiceErrorCode::LanguageNotSupported,
            other => VoiceErrorCode::Other(other.to_string()),
        }
    }
}

impl fmt::Display for VoiceErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Events a recognizer emits
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecognizerEvent {
    Result { transcript: String, is_final: bool },
    Error(VoiceErrorCode),
    End,
}

pub type RecognizerSink = UnboundedSender<RecognizerEvent>;

/// A platform speech recognition engine
///
/// Implementations deliver events to the sink most recently attached and
/// drop them while detached.
pub trait SpeechRecognizer: Send {
    /// Begin a recognition session
    fn start(&mut self) -> Result<(), VoiceErrorCode>;

    /// Finish the session, delivering any pending result
    fn stop(&mut self);

    /// Cancel the session without delivering results
    fn abort(&mut self);

    fn attach(&mut self, sink: RecognizerSink);

    fn detach(&mut self);
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VoiceState {
    Unsupported,
    Idle,
    Listening,
    Error(VoiceErrorCode),
}

impl VoiceState {
    pub fn is_listening(&self) -> bool {
        matches!(self, VoiceState::Listening)
    }
}

/// Inputs to the state machine
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VoiceInput {
    Start,
    Stop,
    Recognized { transcript: String, is_final: bool },
    Failed(VoiceErrorCode),
    Ended,
}

impl From<RecognizerEvent> for VoiceInput {
    fn from(event: RecognizerEvent) -> Self {
        match event {
            RecognizerEvent::Result { transcript, is_final } => VoiceInput::Recognized { transcript, is_final },
            RecognizerEvent::Error(code) => VoiceInput::Failed(code),
            RecognizerEvent::End => VoiceInput::Ended,
        }
    }
}

/// Side effects requested by a transition
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VoiceEffect {
    StartRecognizer,
    StopRecognizer,
    Interim(String),
    Transcript(String),
    Error(VoiceErrorCode),
}

/// Pure transition function
pub fn transition(state: &VoiceState, input: VoiceInput) -> (VoiceState, Vec<VoiceEffect>) {
    use VoiceState::*;

    match (state, input) {
        (Unsupported, _) => (Unsupported, Vec::new()),

        (Idle | Error(_), VoiceInput::Start) => (Listening, vec![VoiceEffect::StartRecognizer]),
        (Listening, VoiceInput::Start) => (Listening, Vec::new()),

        (Listening, VoiceInput::Stop) => (Idle, vec![VoiceEffect::StopRecognizer]),
        (Idle | Error(_), VoiceInput::Stop) => (Idle, Vec::new()),

        (Listening, VoiceInput::Recognized { transcript, is_final: true }) => (
            Idle,
            vec![VoiceEffect::StopRecognizer, VoiceEffect::Transcript(transcript)],
        ),
        (Listening, VoiceInput::Recognized { transcript, is_final: false }) => {
            (Listening, vec![VoiceEffect::Interim(transcript)])
        }
        (Listening, VoiceInput::Failed(code)) => (Error(code.clone()), vec![VoiceEffect::Error(code)]),
        (Listening | Error(_), VoiceInput::Ended) => (Idle, Vec::new()),

        // Stragglers from a session that already finished
        (state, _) => (state.clone(), Vec::new()),
    }
}

/// What the owner of a controller is told about
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VoiceNotice {
    Interim(String),
    Transcript(String),
    Error(VoiceErrorCode),
}

/// Drives a recognizer through the voice state machine
pub struct VoiceController {
    state: VoiceState,
    recognizer: Option<Box<dyn SpeechRecognizer>>,
    sink: RecognizerSink,
    events: UnboundedReceiver<RecognizerEvent>,
    attached: bool,
    /// A recognizer session has started and its `end` has not arrived
    session_open: bool,
    /// A start is waiting for the open session to end
    restart_pending: bool,
}

impl VoiceController {
    /// Message shown in place of the voice control when unsupported
    pub const UNSUPPORTED_MESSAGE: &'static str = "Voice search is not supported on this platform";

    /// `None` yields a permanently unsupported controller
    pub fn new(recognizer: Option<Box<dyn SpeechRecognizer>>) -> Self {
        let (sink, events) = mpsc::unbounded_channel();
        let state = if recognizer.is_some() {
            VoiceState::Idle
        } else {
            info!("No speech recognizer available, voice input disabled");
            VoiceState::Unsupported
        };
        Self {
            state,
            recognizer,
            sink,
            events,
            attached: false,
            session_open: false,
            restart_pending: false,
        }
    }

    pub fn unsupported() -> Self {
        Self::new(None)
    }

    pub fn state(&self) -> &VoiceState {
        &self.state
    }

    pub fn is_supported(&self) -> bool {
        self.state != VoiceState::Unsupported
    }

    pub fn is_listening(&self) -> bool {
        self.state.is_listening()
    }

    pub fn unsupported_message(&self) -> Option<&'static str> {
        (!self.is_supported()).then_some(Self::UNSUPPORTED_MESSAGE)
    }

    pub fn start(&mut self) -> Vec<VoiceNotice> {
        self.apply(VoiceInput::Start)
    }

    pub fn stop(&mut self) -> Vec<VoiceNotice> {
        self.apply(VoiceInput::Stop)
    }

    /// Start when idle, stop when listening
    pub fn toggle(&mut self) -> Vec<VoiceNotice> {
        if self.is_listening() {
            self.stop()
        } else {
            self.start()
        }
    }

    /// Wait for the next recognizer event
    ///
    /// Pends forever for an unsupported controller.
    pub async fn next_event(&mut self) -> Option<RecognizerEvent> {
        self.events.recv().await
    }

    /// Feed one recognizer event through the state machine
    pub fn process(&mut self, event: RecognizerEvent) -> Vec<VoiceNotice> {
        if self.restart_pending {
            if event != RecognizerEvent::End {
                debug!("Dropping {:?} from a finished voice session", event);
                return Vec::new();
            }
            self.session_open = false;
            self.restart_pending = false;
            return self.begin_session();
        }
        if event == RecognizerEvent::End {
            self.session_open = false;
        }
        self.apply(event.into())
    }

    /// Process every event already queued
    pub fn drain_pending(&mut self) -> Vec<VoiceNotice> {
        let mut notices = Vec::new();
        while let Ok(event) = self.events.try_recv() {
            notices.extend(self.process(event));
        }
        notices
    }

    /// Tear down: abort any session and detach from the recognizer
    pub fn unmount(&mut self) {
        let Some(recognizer) = self.recognizer.as_mut() else {
            return;
        };
        if self.state.is_listening() {
            recognizer.abort();
        }
        if self.attached {
            recognizer.detach();
            self.attached = false;
        }
        self.state = VoiceState::Idle;
        self.session_open = false;
        self.restart_pending = false;
        while self.events.try_recv().is_ok() {}
        debug!("Voice controller unmounted");
    }

    fn apply(&mut self, input: VoiceInput) -> Vec<VoiceNotice> {
        let (next, effects) = transition(&self.state, input);
        if next != self.state {
            debug!("Voice {:?} -> {:?}", self.state, next);
        }
        self.state = next;

        let mut notices = Vec::new();
        for effect in effects {
            match effect {
                VoiceEffect::StartRecognizer => {
                    if self.session_open {
                        debug!("Previous voice session still ending, deferring start");
                        self.restart_pending = true;
                    } else {
                        notices.extend(self.begin_session());
                    }
                }
                VoiceEffect::StopRecognizer => {
                    if self.restart_pending {
                        self.restart_pending = false;
                    } else if let Some(recognizer) = self.recognizer.as_mut() {
                        recognizer.stop();
                    }
                }
                VoiceEffect::Interim(text) => notices.push(VoiceNotice::Interim(text)),
                VoiceEffect::Transcript(text) => notices.push(VoiceNotice::Transcript(text)),
                VoiceEffect::Error(code) => notices.push(VoiceNotice::Error(code)),
            }
        }
        notices
    }

    fn begin_session(&mut self) -> Vec<VoiceNotice> {
        match self.start_recognizer() {
            Ok(()) => Vec::new(),
            Err(code) => {
                warn!("Speech recognizer failed to start: {}", code);
                self.apply(VoiceInput::Failed(code))
            }
        }
    }

    fn start_recognizer(&mut self) -> Result<(), VoiceErrorCode> {
        let Some(recognizer) = self.recognizer.as_mut() else {
            return Ok(());
        };
        if !self.attached {
            recognizer.attach(self.sink.clone());
            self.attached = true;
        }
        recognizer.start()?;
        self.session_open = true;
        Ok(())
    }
}

impl Drop for VoiceController {
    fn drop(&mut self) {
        self.unmount();
    }
}


#[cfg(test)]
mod tests {
    use super::testing::ScriptedRecognizer;
    use super::*;

    fn controller() -> (VoiceController, ScriptedRecognizer) {
        let recognizer = ScriptedRecognizer::default();
        (VoiceController::new(Some(Box::new(recognizer.clone()))), recognizer)
    }

    #[test]
    fn test_transition_table() {
        let (s, fx) = transition(&VoiceState::Idle, VoiceInput::Start);
        assert_eq!((s, fx), (VoiceState::Listening, vec![VoiceEffect::StartRecognizer]));

        let (s, fx) = transition(&VoiceState::Listening, VoiceInput::Start);
        assert_eq!((s, fx), (VoiceState::Listening, vec![]));

        let (s, fx) = transition(&VoiceState::Listening, VoiceInput::Failed(VoiceErrorCode::Network));
        assert_eq!(s, VoiceState::Error(VoiceErrorCode::Network));
        assert_eq!(fx, vec![VoiceEffect::Error(VoiceErrorCode::Network)]);

        let (s, _) = transition(&VoiceState::Error(VoiceErrorCode::Network), VoiceInput::Ended);
        assert_eq!(s, VoiceState::Idle);

        let (s, fx) = transition(
            &VoiceState::Idle,
            VoiceInput::Recognized {
                transcript: "late".into(),
                is_final: true,
            },
        );
        assert_eq!((s, fx), (VoiceState::Idle, vec![]));

        let (s, fx) = transition(&VoiceState::Unsupported, VoiceInput::Start);
        assert_eq!((s, fx), (VoiceState::Unsupported, vec![]));
    }

    #[test]
    fn test_final_transcript_emitted_once() {
        let (mut voice, recognizer) = controller();
        assert!(voice.start().is_empty());
        assert!(voice.is_listening());

        recognizer.emit(RecognizerEvent::Result {
            transcript: "hello".into(),
            is_final: false,
        });
        recognizer.emit(RecognizerEvent::Result {
            transcript: "hello world".into(),
            is_final: true,
        });
        recognizer.emit(RecognizerEvent::End);

        let notices = voice.drain_pending();
        assert_eq!(
            notices,
            vec![
                VoiceNotice::Interim("hello".into()),
                VoiceNotice::Transcript("hello world".into()),
            ]
        );
        assert_eq!(*voice.state(), VoiceState::Idle);
        assert_eq!(recognizer.log.lock().unwrap().stops, 1);
    }

    #[test]
    fn test_error_emitted_once_and_never_listening() {
        let (mut voice, recognizer) = controller();
        voice.start();

        recognizer.emit(RecognizerEvent::Error(VoiceErrorCode::Network));
        recognizer.emit(RecognizerEvent::Error(VoiceErrorCode::Network));
        let notices = voice.drain_pending();
        assert_eq!(notices, vec![VoiceNotice::Error(VoiceErrorCode::Network)]);
        assert_eq!(*voice.state(), VoiceState::Error(VoiceErrorCode::Network));
        assert!(!voice.is_listening());

        recognizer.emit(RecognizerEvent::End);
        voice.drain_pending();
        assert_eq!(*voice.state(), VoiceState::Idle);
    }

    #[test]
    fn test_redundant_start_attaches_once() {
        let (mut voice, recognizer) = controller();
        voice.start();
        voice.start();
        voice.stop();
        recognizer.emit(RecognizerEvent::End);
        voice.drain_pending();
        voice.start();

        let log = recognizer.log.lock().unwrap();
        assert_eq!(log.attaches, 1);
        assert_eq!(log.starts, 2);
    }

    #[test]
    fn test_natural_end_returns_to_idle() {
        let (mut voice, recognizer) = controller();
        voice.start();

        recognizer.emit(RecognizerEvent::End);
        assert!(voice.drain_pending().is_empty());
        assert_eq!(*voice.state(), VoiceState::Idle);
        assert_eq!(recognizer.log.lock().unwrap().stops, 0);
    }

    #[test]
    fn test_result_after_stop_is_dropped() {
        let (mut voice, recognizer) = controller();
        voice.start();
        assert!(voice.stop().is_empty());
        assert_eq!(*voice.state(), VoiceState::Idle);
        assert_eq!(recognizer.log.lock().unwrap().stops, 1);

        recognizer.emit(RecognizerEvent::Result {
            transcript: "too late".into(),
            is_final: true,
        });
        recognizer.emit(RecognizerEvent::End);
        assert!(voice.drain_pending().is_empty());
        assert_eq!(*voice.state(), VoiceState::Idle);
    }

    #[test]
    fn test_retry_after_error_waits_for_previous_end() {
        let (mut voice, recognizer) = controller();
        voice.start();
        recognizer.emit(RecognizerEvent::Error(VoiceErrorCode::Network));
        voice.drain_pending();

        assert!(voice.start().is_empty());
        assert!(voice.is_listening());
        assert_eq!(recognizer.log.lock().unwrap().starts, 1);

        recognizer.emit(RecognizerEvent::End);
        recognizer.emit(RecognizerEvent::Result {
            transcript: "hello".into(),
            is_final: true,
        });
        let notices = voice.drain_pending();
        assert_eq!(notices, vec![VoiceNotice::Transcript("hello".into())]);
        assert_eq!(*voice.state(), VoiceState::Idle);
        assert_eq!(recognizer.log.lock().unwrap().starts, 2);

        // The retried session's own end closes it
        recognizer.emit(RecognizerEvent::End);
        voice.drain_pending();
        voice.start();
        assert_eq!(recognizer.log.lock().unwrap().starts, 3);
    }

    #[test]
    fn test_stop_cancels_deferred_start() {
        let (mut voice, recognizer) = controller();
        voice.start();
        recognizer.emit(RecognizerEvent::Error(VoiceErrorCode::NoSpeech));
        voice.drain_pending();

        voice.start();
        voice.stop();
        recognizer.emit(RecognizerEvent::End);
        voice.drain_pending();
        assert_eq!(*voice.state(), VoiceState::Idle);

        let log = recognizer.log.lock().unwrap();
        assert_eq!(log.starts, 1);
        assert_eq!(log.stops, 0);
    }

    #[test]
    fn test_start_failure_enters_error() {
        let (mut voice, recognizer) = controller();
        recognizer.log.lock().unwrap().fail_start = Some(VoiceErrorCode::NotAllowed);

        let notices = voice.toggle();
        assert_eq!(notices, vec![VoiceNotice::Error(VoiceErrorCode::NotAllowed)]);
        assert_eq!(*voice.state(), VoiceState::Error(VoiceErrorCode::NotAllowed));

        // No session opened, so a retry starts right away
        recognizer.log.lock().unwrap().fail_start = None;
        assert!(voice.toggle().is_empty());
        assert!(voice.is_listening());
        assert_eq!(recognizer.log.lock().unwrap().starts, 2);
    }

    #[test]
    fn test_unmount_while_listening_detaches() {
        let (mut voice, recognizer) = controller();
        voice.start();
        assert_eq!(recognizer.listener_count(), 1);

        voice.unmount();
        assert_eq!(recognizer.listener_count(), 0);
        assert_eq!(recognizer.log.lock().unwrap().aborts, 1);
        assert!(!voice.is_listening());
    }

    #[test]
    fn test_unsupported_controller() {
        let mut voice = VoiceController::unsupported();
        assert!(voice.start().is_empty());
        assert_eq!(*voice.state(), VoiceState::Unsupported);
        assert_eq!(voice.unsupported_message(), Some(VoiceController::UNSUPPORTED_MESSAGE));
    }

    #[test]
    fn test_error_codes_roundtrip_names() {
        for name in ["no-speech", "audio-capture", "not-allowed", "network", "aborted"] {
            assert_eq!(VoiceErrorCode::from_code(name).as_str(), name);
        }
        assert_eq!(
            VoiceErrorCode::from_code("bad-grammar"),
            VoiceErrorCode::Other("bad-grammar".into())
        );
    }
}
