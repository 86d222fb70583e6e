//! Sound feedback
//!
//! The machine has no speaker here; beeps are emitted as log events.

use crate::core::traits::SoundPlayer;
use tracing::debug;

#[derive(Debug, Default, Clone, Copy)]
pub struct LogSoundPlayer;

impl SoundPlayer for LogSoundPlayer {
    fn beep_success(&self) {
        debug!(sound = "success", "Beep");
    }

    fn beep_error(&self) {
        debug!(sound = "error", "Beep");
    }
}
