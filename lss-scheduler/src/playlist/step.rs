//! Playlist step: the atomic timed unit of playback

/// Frame interval used when a step does not specify one
pub const DEFAULT_FRAME_MS: u32 = 50;

/// Renderer used when a step does not name one
pub const DEFAULT_RENDERER: &str = "off";

/// One bounded-duration unit of playback
///
/// Position is kept within `0..=length_ms` and resets to zero whenever the
/// step is (re)entered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaylistStep {
    name: String,
    length_ms: u64,
    position_ms: u64,
    /// Preferred frame interval while this step plays
    frame_ms: u32,
    /// Renderer registry key that paints this step's channels
    renderer: String,
    /// Step repeats itself at its end instead of advancing
    looping: bool,
}

impl PlaylistStep {
    pub fn new(name: impl Into<String>, length_ms: u64) -> Self {
        Self {
            name: name.into(),
            length_ms,
            position_ms: 0,
            frame_ms: DEFAULT_FRAME_MS,
            renderer: DEFAULT_RENDERER.to_string(),
            looping: false,
        }
    }

    pub fn with_frame_ms(mut self, frame_ms: u32) -> Self {
        self.frame_ms = frame_ms.max(1);
        self
    }

    pub fn with_renderer(mut self, renderer: impl Into<String>) -> Self {
        self.renderer = renderer.into();
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn length_ms(&self) -> u64 {
        self.length_ms
    }

    pub fn position_ms(&self) -> u64 {
        self.position_ms
    }

    pub fn remaining_ms(&self) -> u64 {
        self.length_ms - self.position_ms
    }

    pub fn frame_ms(&self) -> u32 {
        self.frame_ms
    }

    pub fn renderer(&self) -> &str {
        &self.renderer
    }

    pub fn is_looping(&self) -> bool {
        self.looping
    }

    pub(crate) fn set_looping(&mut self, looping: bool) {
        self.looping = looping;
    }

    /// Reset position to the start of the step
    pub(crate) fn restart(&mut self) {
        self.position_ms = 0;
    }

    /// Move the position forward by `elapsed_ms`.
    ///
    /// Returns `Some(overflow)` once the position reaches the step length,
    /// where `overflow` is the elapsed time not consumed by this step.
    pub(crate) fn advance_by(&mut self, elapsed_ms: u64) -> Option<u64> {
        let target = self.position_ms.saturating_add(elapsed_ms);
        if target >= self.length_ms {
            self.position_ms = self.length_ms;
            Some(target - self.length_ms)
        } else {
            self.position_ms = target;
            None
        }
    }

    /// One-line status, e.g. `0:01.000/0:02.000`
    pub fn status(&self) -> String {
        format!(
            "{}/{}",
            lss_common::human_time::format_show_time(self.position_ms),
            lss_common::human_time::format_show_time(self.length_ms)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_advance_within_step() {
        let mut step = PlaylistStep::new("Intro", 1000);
        assert_eq!(step.advance_by(400), None);
        assert_eq!(step.position_ms(), 400);
        assert_eq!(step.remaining_ms(), 600);
    }

    #[test]
    fn test_advance_reports_overflow_and_clamps() {
        let mut step = PlaylistStep::new("Intro", 1000);
        assert_eq!(step.advance_by(1250), Some(250));
        assert_eq!(step.position_ms(), 1000);

        step.restart();
        assert_eq!(step.position_ms(), 0);
        assert_eq!(step.advance_by(1000), Some(0));
    }

    #[test]
    fn test_defaults_and_builders() {
        let step = PlaylistStep::new("Snow", 500);
        assert_eq!(step.frame_ms(), DEFAULT_FRAME_MS);
        assert_eq!(step.renderer(), DEFAULT_RENDERER);

        let step = step.with_frame_ms(0).with_renderer("fade");
        assert_eq!(step.frame_ms(), 1);
        assert_eq!(step.renderer(), "fade");
        assert_eq!(step.status(), "0:00.000/0:00.500");
    }
}
