//! Idle fallback visuals: when the mirror is asleep, slowly pulse the
//! static gradient backdrop. Runs at its own cadence, independent of the
//! mirror's 30 ms tick.

use crate::Color;
use crate::config::RotatorConfig;
use crate::frame::DisplayBuffer;
use crate::source::Art;
use image::RgbImage;
use std::error::Error;
use std::time::Duration;

/// Brightness floor of the pulse; the backdrop never goes fully dark.
const MIN_LEVEL: u32 = 30;

pub struct Rotator {
    config: RotatorConfig,
    background: RgbImage,
    frame: u32,
}

impl Rotator {
    /// `background` is precomputed by the controller at construction
    /// (see [`crate::frame::gradient_background`]).
    pub fn new(background: RgbImage, config: RotatorConfig) -> Self {
        Self {
            config,
            background,
            frame: 0,
        }
    }

    /// Triangle wave between `MIN_LEVEL` and 100 over one pulse period.
    fn brightness(&self) -> u8 {
        let period = self.config.pulse_period.max(2);
        let half = period / 2;
        let phase = self.frame % period;
        let rising = if phase < half { phase } else { period - phase };
        (MIN_LEVEL + (100 - MIN_LEVEL) * rising / half) as u8
    }
}

impl Art for Rotator {
    fn start(&mut self, buf: &mut DisplayBuffer) {
        self.frame = 0;
        buf.clear();
    }

    fn refresh(&mut self, buf: &mut DisplayBuffer) -> Result<(), Box<dyn Error>> {
        let level = self.brightness();
        let mut shaded = self.background.clone();
        for pixel in shaded.pixels_mut() {
            let c = Color::new(pixel[0], pixel[1], pixel[2]).apply_brightness(level);
            *pixel = image::Rgb([c.r, c.g, c.b]);
        }
        buf.copy_from(&shaded);
        self.frame = self.frame.wrapping_add(1);
        Ok(())
    }

    fn interval(&self) -> Duration {
        Duration::from_millis(self.config.interval_ms)
    }
}
