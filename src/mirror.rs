//! The per-tick mirror controller: rolling color/fade state, the
//! movement state machine (awake / dreaming / screen-save), and the
//! control overlay.
//!
//! One call to [`Mirror::refresh`] is one tick: drain events, capture
//! a frame, isolate motion by differencing against the previous capture,
//! colorize it with the rolling hue, then either composite it over the
//! decayed previous output (awake) or hand the buffer to the fallback
//! cycler (dreaming).

use crate::config::{ConfigError, MirrorConfig};
use crate::frame::{self, DisplayBuffer, MotionMask};
use crate::rotator::Rotator;
use crate::source::{Art, Clock, ControlEvent, EventSource, FrameSource, SystemClock};
use crate::{Color, PanelConfig, is_running};
use image::{GrayImage, Rgb, RgbImage};
use std::error::Error;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::time::Duration;

/// Width in pixels of each control-overlay bar.
const CONTROL_BAR_WIDTH: u32 = 4;

/// Seconds a button press is ignored after an accepted one.
const BUTTON_DEBOUNCE: f64 = 0.1;

/// Tick period while the mirror is showing.
const SHOWING_INTERVAL: Duration = Duration::from_millis(30);

/// What the driver should do after a tick.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Step {
    Continue,
    /// The termination token was observed; stop the loop.
    Shutdown,
}

pub struct Mirror {
    // Tunables, fixed at construction.
    brightness_threshold: u8,
    movement_timeout: f64,
    control_timeout: f64,
    min_move_count: usize,
    min_sleep: f64,
    min_wake_move: u32,

    // Knob interpolation. One step per panel row.
    panel: PanelConfig,
    control_steps: u32,
    fade_min: f64,
    fade_step: f64,
    hue_rotation_min: f64,
    hue_rotation_step: f64,
    fade_index: u32,
    hue_rotation_index: u32,

    // Rolling per-session state, reset by `start`.
    hue: f64,
    last_orig_frame: Option<GrayImage>,
    last_final: RgbImage,
    last_move: f64,
    last_sleep: f64,
    last_control_time: f64,
    button_debounce: f64,
    move_count: u32,
    showing: bool,
    screen_save: bool,

    // Injected collaborators.
    frames: Box<dyn FrameSource>,
    events: Box<dyn EventSource>,
    rotator: Box<dyn Art>,
    clock: Box<dyn Clock>,
    running: Arc<AtomicBool>,
}

impl Mirror {
    /// Build a controller with every collaborator injected. Validates the
    /// configuration once; the tick path assumes it is well-formed.
    pub fn new(
        panel: PanelConfig,
        config: &MirrorConfig,
        frames: Box<dyn FrameSource>,
        events: Box<dyn EventSource>,
        rotator: Box<dyn Art>,
        clock: Box<dyn Clock>,
        running: Arc<AtomicBool>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;

        let control_steps = panel.rows.max(1);

        tracing::info!("Starting mirror at pid {}", std::process::id());

        Ok(Self {
            brightness_threshold: config.brightness_threshold,
            movement_timeout: config.movement_timeout,
            control_timeout: config.control_timeout,
            min_move_count: config.min_move_count,
            min_sleep: config.min_sleep_time,
            min_wake_move: config.min_wake_move,

            panel,
            control_steps,
            fade_min: config.fade.min,
            fade_step: config.fade.span() / control_steps as f64,
            hue_rotation_min: config.color_rotation.min,
            hue_rotation_step: config.color_rotation.span() / control_steps as f64,
            fade_index: control_steps / 2,
            hue_rotation_index: control_steps / 2,

            hue: 0.0,
            last_orig_frame: None,
            last_final: RgbImage::new(panel.cols, panel.rows),
            last_move: 0.0,
            last_sleep: 0.0,
            last_control_time: 0.0,
            button_debounce: 0.0,
            move_count: 0,
            showing: true,
            screen_save: false,

            frames,
            events,
            rotator,
            clock,
            running,
        })
    }

    /// Standard wiring: real clock, no control board, and the gradient
    /// rotator fed with the precomputed backdrop.
    pub fn with_defaults(
        panel: PanelConfig,
        config: &MirrorConfig,
        frames: Box<dyn FrameSource>,
        running: Arc<AtomicBool>,
    ) -> Result<Self, ConfigError> {
        let background = frame::gradient_background(panel);
        let rotator = Rotator::new(background, config.rotator.clone());
        Self::new(
            panel,
            config,
            frames,
            Box::new(crate::source::NullEvents),
            Box::new(rotator),
            Box::new(SystemClock::new()),
            running,
        )
    }

    // ── Derived knob values ────────────────────────────────────────

    /// Current decay factor, interpolated from the fade knob.
    pub fn fade(&self) -> f64 {
        self.fade_min + self.fade_step * self.fade_index as f64
    }

    /// Current per-tick hue advance, interpolated from the hue knob.
    pub fn hue_rotation(&self) -> f64 {
        self.hue_rotation_min + self.hue_rotation_step * self.hue_rotation_index as f64
    }

    pub fn hue(&self) -> f64 {
        self.hue
    }

    pub fn fade_index(&self) -> u32 {
        self.fade_index
    }

    pub fn hue_rotation_index(&self) -> u32 {
        self.hue_rotation_index
    }

    pub fn move_count(&self) -> u32 {
        self.move_count
    }

    pub fn is_showing(&self) -> bool {
        self.showing
    }

    pub fn is_screen_save(&self) -> bool {
        self.screen_save
    }

    // ── Session lifecycle ──────────────────────────────────────────

    /// Reset per-session state and start the fallback cycler.
    pub fn start(&mut self, buf: &mut DisplayBuffer) {
        self.hue = 0.0;
        self.last_final = RgbImage::new(self.panel.cols, self.panel.rows);
        self.last_move = 0.0;
        self.last_sleep = 0.0;
        self.rotator.start(buf);
        self.showing = true;
        self.last_control_time = 0.0;
        self.move_count = 0;
        self.screen_save = false;
        self.button_debounce = 0.0;
    }

    // ── Events ─────────────────────────────────────────────────────

    /// Drain everything the event source has queued for this tick. Any
    /// event, of any kind, makes the control overlay visible.
    fn receive_events(&mut self) {
        while let Some(event) = self.events.poll() {
            self.last_control_time = self.clock.now();

            match event {
                ControlEvent::Down => {
                    let now = self.clock.now();
                    if now - self.button_debounce >= BUTTON_DEBOUNCE {
                        self.button_debounce = now;
                        self.screen_save = !self.screen_save;
                        if self.screen_save {
                            tracing::info!("Enter screensave mode");
                        } else {
                            tracing::info!("Exit screensave mode");
                            // Let movement detection restart clean.
                            self.last_sleep = 0.0;
                            self.last_move = 0.0;
                        }
                    }
                }
                // The knobs are wired inverted: turning up walks the
                // index down.
                ControlEvent::Inc(id) => {
                    if id == 1 {
                        self.hue_rotation_index = self.hue_rotation_index.saturating_sub(1);
                    } else {
                        self.fade_index = self.fade_index.saturating_sub(1);
                    }
                }
                ControlEvent::Dec(id) => {
                    if id == 1 {
                        self.hue_rotation_index =
                            (self.hue_rotation_index + 1).min(self.control_steps - 1);
                    } else {
                        self.fade_index = (self.fade_index + 1).min(self.control_steps - 1);
                    }
                }
            }
        }
    }

    // ── Control overlay ────────────────────────────────────────────

    /// Two white vertical bars, one per frame edge, whose filled height
    /// tracks the knob indices. Only rendered while an event happened
    /// within `control_timeout`.
    fn render_controls(&self) -> Option<RgbImage> {
        let now = self.clock.now();
        if now - self.last_control_time > self.control_timeout {
            return None;
        }

        let (cols, rows) = (self.panel.cols, self.panel.rows);
        let mut overlay = RgbImage::new(cols, rows);
        fill_bar(&mut overlay, 0, self.fade_index);
        fill_bar(
            &mut overlay,
            cols.saturating_sub(CONTROL_BAR_WIDTH),
            self.hue_rotation_index,
        );
        Some(overlay)
    }

    // ── The tick ───────────────────────────────────────────────────

    /// One tick of the controller. Returns [`Step::Shutdown`] once the
    /// termination token has been observed; capture errors propagate
    /// unchanged to the driver.
    pub fn refresh(&mut self, buf: &mut DisplayBuffer) -> Result<Step, Box<dyn Error>> {
        if !is_running(&self.running) {
            tracing::info!("TERM signal received");
            return Ok(Step::Shutdown);
        }

        self.receive_events();

        // Capture → luminance → panel size.
        let capture = self.frames.get_frame()?;
        let gray = frame::luminance(&capture, self.panel);

        // Differencing isolates motion; the very first tick has nothing
        // to difference against and passes the raw luminance through.
        let diffed = match self.last_orig_frame.take() {
            Some(previous) => frame::amplified_difference(&previous, &gray),
            None => gray.clone(),
        };
        self.last_orig_frame = Some(gray);

        let tint = Color::from_unit_hue(self.hue as f32);
        let image = frame::colorize(&diffed, tint);

        self.hue += self.hue_rotation();
        if self.hue >= 1.0 {
            self.hue -= 1.0;
        }
        if self.hue < 0.0 {
            self.hue += 1.0;
        }

        let faded = frame::faded_copy(&self.last_final, self.fade());
        let mask = MotionMask::from_frame(&image, self.brightness_threshold);
        let movement = mask.moved_pixels() >= self.min_move_count;

        let now = self.clock.now();
        if movement {
            self.last_move = now;
        }
        let seconds_since_movement = now - self.last_move;
        let seconds_since_sleep = now - self.last_sleep;
        let saw_movement = seconds_since_movement < self.movement_timeout
            && seconds_since_sleep >= self.min_sleep;

        if saw_movement {
            self.move_count += 1;
        } else {
            self.move_count = 0;
        }

        // An awake mirror stays awake on any qualifying tick; a sleeping
        // one needs min_wake_move consecutive ones.
        let enough_movement = self.showing || self.move_count >= self.min_wake_move;
        let show_mirror = enough_movement && saw_movement;

        if show_mirror && !self.screen_save {
            if !self.showing {
                tracing::info!("Waking up");
            }
            self.showing = true;
            self.last_final = frame::composite(&mask, &image, &faded);
            buf.copy_from(&self.last_final);
            if let Some(controls) = self.render_controls() {
                buf.or_with(&controls);
            }
        } else {
            if self.showing {
                tracing::info!("Entering dream state");
                buf.clear();
                self.last_sleep = now;
            }
            self.showing = false;
            self.rotator.refresh(buf)?;
        }

        Ok(Step::Continue)
    }

    /// How long the driver should sleep before the next tick. While
    /// dreaming, the fallback cycler runs at its own cadence.
    pub fn interval(&self) -> Duration {
        if self.showing {
            SHOWING_INTERVAL
        } else {
            self.rotator.interval()
        }
    }
}

/// Fill a `CONTROL_BAR_WIDTH`-wide white column growing up from the
/// bottom edge, `height` rows tall.
fn fill_bar(overlay: &mut RgbImage, x0: u32, height: u32) {
    let rows = overlay.height();
    let cols = overlay.width();
    for y in rows.saturating_sub(height)..rows {
        for x in x0..(x0 + CONTROL_BAR_WIDTH).min(cols) {
            overlay.put_pixel(x, y, Rgb([255, 255, 255]));
        }
    }
}
