//! Narrated cutscenes (opening and ending).
//!
//! A scene schedules one task per narration beat plus a final task for the
//! end of the scene. Leaving the scene cancels whatever has not played yet.

use wattwise_logic::config::SceneScript;
use wattwise_logic::feedback::GameFeedback;
use wattwise_logic::timing::TaskQueue;

#[derive(Debug, Clone, PartialEq, Eq)]
enum SceneCue {
    Narration(String),
    End,
}

#[derive(Debug, Default)]
pub struct SceneRunner {
    tasks: TaskQueue<SceneCue>,
    running: bool,
    elapsed: f32,
}

impl SceneRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start `script` from the beginning, dropping any scene in progress.
    pub fn start(&mut self, script: &SceneScript) {
        self.tasks.cancel_all();
        for beat in &script.beats {
            self.tasks
                .schedule(beat.at_secs, SceneCue::Narration(beat.key.clone()));
        }
        self.tasks.schedule(script.duration_secs, SceneCue::End);
        self.running = true;
        self.elapsed = 0.0;
    }

    /// Cancel everything pending. Returns how many cues were dropped.
    pub fn stop(&mut self) -> usize {
        self.running = false;
        self.tasks.cancel_all()
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn elapsed(&self) -> f32 {
        self.elapsed
    }

    /// Advance and play due narration. Returns `true` on the tick the scene
    /// ends.
    pub fn advance(&mut self, dt: f32, feedback: &mut dyn GameFeedback) -> bool {
        if !self.running {
            return false;
        }
        self.elapsed += dt;
        self.tasks.advance(dt);
        while let Some(cue) = self.tasks.pop_due() {
            match cue {
                SceneCue::Narration(key) => feedback.play_narration(&key),
                SceneCue::End => {
                    self.stop();
                    return true;
                }
            }
        }
        false
    }
}
