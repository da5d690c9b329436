//! Capabilities the controller consumes but does not own: frame capture,
//! operator events, the clock, and the fallback cycler. Each is a small
//! trait so the driver decides what is real hardware and what is synthetic.
//!
//! ## Rust concepts
//! - Traits as capability seams (dependency injection without a framework)
//! - `Box<dyn Trait>` for runtime-chosen implementations
//! - `Option` as the "nothing pending" sentinel for non-blocking polls

use crate::PanelConfig;
use crate::frame::DisplayBuffer;
use image::{Rgb, RgbImage};
use std::error::Error;
use std::time::{Duration, Instant};

// ── Events ───────────────────────────────────────────────────────────

/// A discrete operator input. Knob events carry the knob id from the ADC
/// board: id 1 is the hue-rotation knob, anything else adjusts fade.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ControlEvent {
    /// Button press; toggles screen-save (debounced at 100 ms).
    Down,
    /// Knob turned up.
    Inc(u8),
    /// Knob turned down.
    Dec(u8),
}

/// Produces pending control events. `poll` must never block: it returns
/// `None` as soon as nothing more is queued for the current tick.
pub trait EventSource {
    fn poll(&mut self) -> Option<ControlEvent>;
}

/// Event source that never yields anything — installations without the
/// control board.
pub struct NullEvents;

impl EventSource for NullEvents {
    fn poll(&mut self) -> Option<ControlEvent> {
        None
    }
}

// ── Frames ───────────────────────────────────────────────────────────

/// Produces one full-color frame per request. Blocking is acceptable but
/// uncontrolled; a stalled source stalls the whole tick loop, so bounded
/// latency has to be enforced inside the source itself.
pub trait FrameSource {
    fn get_frame(&mut self) -> Result<RgbImage, Box<dyn Error>>;
}

/// Camera-less frame source: a bright blob orbiting a dark field. Enough
/// frame-to-frame change to exercise the motion path during bring-up.
pub struct SyntheticSource {
    panel: PanelConfig,
    tick: u32,
}

impl SyntheticSource {
    pub fn new(panel: PanelConfig) -> Self {
        Self { panel, tick: 0 }
    }
}

impl FrameSource for SyntheticSource {
    fn get_frame(&mut self) -> Result<RgbImage, Box<dyn Error>> {
        let mut frame = RgbImage::new(self.panel.cols, self.panel.rows);

        let angle = self.tick as f32 * 0.2;
        let cx = self.panel.cols as f32 / 2.0;
        let cy = self.panel.rows as f32 / 2.0;
        let radius = cy.min(cx) * 0.6;
        let bx = (cx + angle.cos() * radius) as i64;
        let by = (cy + angle.sin() * radius) as i64;

        for (x, y, pixel) in frame.enumerate_pixels_mut() {
            let dx = (x as i64 - bx).abs();
            let dy = (y as i64 - by).abs();
            if dx <= 1 && dy <= 1 {
                *pixel = Rgb([255, 255, 255]);
            }
        }

        self.tick = self.tick.wrapping_add(1);
        Ok(frame)
    }
}

// ── Clock ────────────────────────────────────────────────────────────

/// Monotonic time in seconds. Injected so the movement state machine is
/// testable without sleeping.
pub trait Clock {
    fn now(&self) -> f64;
}

/// Wall clock based on `Instant`, origin at construction.
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> f64 {
        self.origin.elapsed().as_secs_f64()
    }
}

// ── Fallback cycler ──────────────────────────────────────────────────

/// An installation visual: the fallback cycler implements this, and the
/// driver talks to the mirror through the same three calls. Each tick the
/// active art writes the display buffer; `interval` is how long the driver
/// should sleep before the next `refresh`.
pub trait Art {
    fn start(&mut self, buf: &mut DisplayBuffer);
    fn refresh(&mut self, buf: &mut DisplayBuffer) -> Result<(), Box<dyn Error>>;
    fn interval(&self) -> Duration;
}
