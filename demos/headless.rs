//! # Headless Mirror Example
//!
//! Runs the motion-mirror controller with no panel and no camera: the
//! synthetic blob source feeds it frames, and wake/sleep transitions are
//! printed to the terminal. Handy for checking tuning values off the Pi.
//!
//! ## Run it
//! ```sh
//! cargo run --example headless --no-default-features
//! ```

use mirror_matrix::config::MirrorConfig;
use mirror_matrix::frame::DisplayBuffer;
use mirror_matrix::mirror::{Mirror, Step};
use mirror_matrix::source::SyntheticSource;
use mirror_matrix::{PanelConfig, is_running, setup_signal_handler};
use std::thread;

fn main() {
    tracing_subscriber::fmt().with_target(false).compact().init();

    let panel = PanelConfig::default();
    let config = MirrorConfig::default();
    let running = setup_signal_handler();

    let frames = Box::new(SyntheticSource::new(panel));
    let mut mirror = Mirror::with_defaults(panel, &config, frames, running.clone())
        .expect("default configuration is valid");

    let mut buf = DisplayBuffer::new(panel);
    mirror.start(&mut buf);

    let mut was_showing = mirror.is_showing();

    while is_running(&running) {
        match mirror.refresh(&mut buf) {
            Ok(Step::Continue) => {}
            Ok(Step::Shutdown) => break,
            Err(e) => {
                eprintln!("Tick failed: {e}");
                break;
            }
        }

        if mirror.is_showing() != was_showing {
            was_showing = mirror.is_showing();
            let lit = buf.image().pixels().filter(|p| p[0] > 0).count();
            println!(
                "{} (lit pixels: {lit}, fade: {:.3}, hue rotation: {:.4})",
                if was_showing { "MIRROR" } else { "DREAMING" },
                mirror.fade(),
                mirror.hue_rotation(),
            );
        }

        thread::sleep(mirror.interval());
    }

    println!("\nShutting down cleanly.");
}
