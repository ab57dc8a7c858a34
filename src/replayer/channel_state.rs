//! Per-channel playback state

use crate::song::{Effect, Note};

/// What one channel is currently playing.
///
/// Owned by that channel's renderer and never shared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ChannelState {
    current_frame: usize,
    sample: Option<usize>,
    period: u16,
    effect: Effect,
}

impl ChannelState {
    /// A channel that has not been triggered yet (silent).
    pub fn new() -> Self {
        Self::default()
    }

    /// Start `sample` from its first frame.
    pub fn trigger(&mut self, sample: usize, period: u16, effect: Effect) {
        self.current_frame = 0;
        self.sample = Some(sample);
        self.period = period;
        self.effect = effect;
    }

    /// Keep the current sample and pitch, move one frame on, take the new effect.
    pub fn continue_note(&mut self, effect: Effect) {
        self.current_frame += 1;
        self.effect = effect;
    }

    /// Apply a pattern cell: trigger if it names a sample, otherwise continue.
    pub fn apply(&mut self, note: &Note) {
        match note.sample {
            Some(sample) => self.trigger(sample, note.period, note.effect),
            None => self.continue_note(note.effect),
        }
    }

    /// Frames rendered since the active note was triggered
    pub fn current_frame(&self) -> usize {
        self.current_frame
    }

    /// Active sample, `None` before the first trigger
    pub fn sample(&self) -> Option<usize> {
        self.sample
    }

    /// Active pitch period
    pub fn period(&self) -> u16 {
        self.period
    }

    /// Active effect
    pub fn effect(&self) -> Effect {
        self.effect
    }

    /// True once a sample has been triggered
    pub fn is_active(&self) -> bool {
        self.sample.is_some()
    }

    /// Back to the untriggered state
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_is_silent() {
        let state = ChannelState::new();
        assert!(!state.is_active());
        assert_eq!(state.current_frame(), 0);
    }

    #[test]
    fn test_trigger_then_continue() {
        let mut state = ChannelState::new();
        state.apply(&Note::trigger(3, 428));
        assert_eq!(state.sample(), Some(3));
        assert_eq!(state.period(), 428);
        assert_eq!(state.current_frame(), 0);

        let held = Note {
            effect: Effect::SetVolume(32),
            ..Note::EMPTY
        };
        state.apply(&held);
        state.apply(&held);
        assert_eq!(state.current_frame(), 2);
        // period 0 in a continue cell does not change the pitch
        assert_eq!(state.period(), 428);
        assert_eq!(state.sample(), Some(3));
        assert_eq!(state.effect(), Effect::SetVolume(32));
    }

    #[test]
    fn test_retrigger_resets_frame() {
        let mut state = ChannelState::new();
        state.trigger(0, 214, Effect::default());
        state.continue_note(Effect::default());
        state.trigger(1, 107, Effect::default());
        assert_eq!(state.current_frame(), 0);
        assert_eq!(state.sample(), Some(1));
    }

    #[test]
    fn test_continue_before_trigger_stays_silent() {
        let mut state = ChannelState::new();
        state.apply(&Note::EMPTY);
        assert!(!state.is_active());
        state.reset();
        assert_eq!(state, ChannelState::new());
    }
}
