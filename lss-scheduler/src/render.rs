//! Step rendering boundary
//!
//! Effect rendering is a separate subsystem; the scheduler only asks a
//! renderer to paint channels `[0, N)` of the frame buffer for a step at a
//! given position. Renderers are looked up by name in a registry so that
//! persisted steps can refer to them.

use crate::error::RenderError;
use std::collections::HashMap;
use std::sync::Arc;

/// Everything a renderer learns about the frame being produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepFrame {
    pub playlist: String,
    pub step: String,
    pub renderer: String,
    pub position_ms: u64,
    pub length_ms: u64,
}

/// Paints one step's output into the channel buffer
pub trait StepRenderer: Send + Sync {
    fn render(&self, frame: &StepFrame, channels: &mut [u8]) -> Result<(), RenderError>;
}

/// All channels off
pub struct Off;

impl StepRenderer for Off {
    fn render(&self, _frame: &StepFrame, channels: &mut [u8]) -> Result<(), RenderError> {
        channels.fill(0);
        Ok(())
    }
}

/// All channels at full intensity
pub struct On;

impl StepRenderer for On {
    fn render(&self, _frame: &StepFrame, channels: &mut [u8]) -> Result<(), RenderError> {
        channels.fill(u8::MAX);
        Ok(())
    }
}

/// Linear ramp from 0 to full across the step
pub struct Fade;

impl StepRenderer for Fade {
    fn render(&self, frame: &StepFrame, channels: &mut [u8]) -> Result<(), RenderError> {
        let level = if frame.length_ms == 0 {
            u8::MAX
        } else {
            let position = u128::from(frame.position_ms.min(frame.length_ms));
            (position * 255 / u128::from(frame.length_ms)) as u8
        };
        channels.fill(level);
        Ok(())
    }
}

/// Name → renderer lookup
#[derive(Clone)]
pub struct RendererRegistry {
    renderers: HashMap<String, Arc<dyn StepRenderer>>,
}

impl RendererRegistry {
    /// Empty registry (no built-ins)
    pub fn empty() -> Self {
        Self {
            renderers: HashMap::new(),
        }
    }

    pub fn register(&mut self, name: impl Into<String>, renderer: Arc<dyn StepRenderer>) {
        self.renderers.insert(name.into(), renderer);
    }

    pub fn contains(&self, name: &str) -> bool {
        self.renderers.contains_key(name)
    }

    /// Resolve the frame's renderer and paint into `channels`
    pub fn render(&self, frame: &StepFrame, channels: &mut [u8]) -> Result<(), RenderError> {
        let renderer = self
            .renderers
            .get(&frame.renderer)
            .ok_or_else(|| RenderError::UnknownRenderer(frame.renderer.clone()))?;
        renderer.render(frame, channels)
    }
}

impl Default for RendererRegistry {
    /// Registry with the built-in `off`, `on` and `fade` renderers
    fn default() -> Self {
        let mut registry = Self::empty();
        registry.register("off", Arc::new(Off));
        registry.register("on", Arc::new(On));
        registry.register("fade", Arc::new(Fade));
        registry
    }
}
