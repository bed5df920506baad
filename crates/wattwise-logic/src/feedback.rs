//! Outbound collaborator calls: audio cues and on-screen messages.
//!
//! The engine never plays sound or draws UI itself. It calls a
//! [`GameFeedback`] implementation supplied by the host.

/// Audio and UI feedback sink.
pub trait GameFeedback {
    fn play_sfx(&mut self, name: &str);
    fn play_narration(&mut self, key: &str);
    /// Transient, non-blocking message.
    fn show_message(&mut self, text: &str, is_success: bool, duration_secs: f32);
}

/// Discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct SilentFeedback;

impl GameFeedback for SilentFeedback {
    fn play_sfx(&mut self, _name: &str) {}
    fn play_narration(&mut self, _key: &str) {}
    fn show_message(&mut self, _text: &str, _is_success: bool, _duration_secs: f32) {}
}

/// A single recorded feedback call.
#[derive(Debug, Clone, PartialEq)]
pub enum FeedbackEvent {
    Sfx(String),
    Narration(String),
    Message {
        text: String,
        is_success: bool,
        duration_secs: f32,
    },
}

/// Records every call, for tests and the headless harness.
#[derive(Debug, Default, Clone)]
pub struct RecordingFeedback {
    pub events: Vec<FeedbackEvent>,
}

impl RecordingFeedback {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> Vec<&str> {
        self.events
            .iter()
            .filter_map(|e| match e {
                FeedbackEvent::Message { text, .. } => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }

    pub fn sfx(&self) -> Vec<&str> {
        self.events
            .iter()
            .filter_map(|e| match e {
                FeedbackEvent::Sfx(name) => Some(name.as_str()),
                _ => None,
            })
            .collect()
    }

    pub fn narrations(&self) -> Vec<&str> {
        self.events
            .iter()
            .filter_map(|e| match e {
                FeedbackEvent::Narration(key) => Some(key.as_str()),
                _ => None,
            })
            .collect()
    }

    pub fn has_message_containing(&self, needle: &str) -> bool {
        self.messages().iter().any(|m| m.contains(needle))
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }
}

impl GameFeedback for RecordingFeedback {
    fn play_sfx(&mut self, name: &str) {
        self.events.push(FeedbackEvent::Sfx(name.to_string()));
    }

    fn play_narration(&mut self, key: &str) {
        self.events.push(FeedbackEvent::Narration(key.to_string()));
    }

    fn show_message(&mut self, text: &str, is_success: bool, duration_secs: f32) {
        self.events.push(FeedbackEvent::Message {
            text: text.to_string(),
            is_success,
            duration_secs,
        });
    }
}

/// Feedback raised by UI-event methods that have no sink at hand. Drained
/// into the real sink on the next tick.
#[derive(Debug, Default, Clone)]
pub struct FeedbackQueue {
    pending: Vec<FeedbackEvent>,
}

impl FeedbackQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sfx(&mut self, name: &str) {
        self.pending.push(FeedbackEvent::Sfx(name.to_string()));
    }

    pub fn narration(&mut self, key: &str) {
        self.pending.push(FeedbackEvent::Narration(key.to_string()));
    }

    pub fn message(&mut self, text: impl Into<String>, is_success: bool, duration_secs: f32) {
        self.pending.push(FeedbackEvent::Message {
            text: text.into(),
            is_success,
            duration_secs,
        });
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn clear(&mut self) {
        self.pending.clear();
    }

    /// Send everything queued to `sink`, oldest first.
    pub fn flush(&mut self, sink: &mut dyn GameFeedback) {
        for event in self.pending.drain(..) {
            match event {
                FeedbackEvent::Sfx(name) => sink.play_sfx(&name),
                FeedbackEvent::Narration(key) => sink.play_narration(&key),
                FeedbackEvent::Message {
                    text,
                    is_success,
                    duration_secs,
                } => sink.show_message(&text, is_success, duration_secs),
            }
        }
    }
}
