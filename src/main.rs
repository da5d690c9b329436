//! Mirror installation driver.
//!
//! Wires the controller to the physical panel and runs the cooperative
//! tick loop: `refresh` then sleep for `interval()`. The controller never
//! touches hardware or process-wide signal state itself — both live here.
//!
//! ## Usage
//! ```sh
//! sudo ./target/release/mirror-matrix --rows 32 --cols 50 --config mirror.json
//! ```

#[cfg(not(feature = "hardware"))]
fn main() {
    eprintln!("This binary requires the 'hardware' feature (rpi-led-matrix).");
    eprintln!("Build with: cargo build --release");
    eprintln!("Tests can run without it: cargo test --no-default-features");
    eprintln!("For a camera-less dry run, try: cargo run --example headless --no-default-features");
    std::process::exit(1);
}

#[cfg(feature = "hardware")]
fn main() {
    use clap::Parser;
    use mirror_matrix::config::MirrorConfig;
    use mirror_matrix::frame::DisplayBuffer;
    use mirror_matrix::mirror::{Mirror, Step};
    use mirror_matrix::source::SyntheticSource;
    use mirror_matrix::{PanelConfig, create_matrix, is_running, setup_signal_handler};
    use std::path::PathBuf;
    use std::thread;

    /// LED matrix motion-mirror installation
    #[derive(Parser)]
    #[command(name = "mirror-matrix")]
    #[command(about = "Motion-mirror art installation for an RGB LED matrix")]
    #[command(version)]
    struct Args {
        /// Path to a JSON configuration file (defaults apply if omitted)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Number of rows on the LED panel
        #[arg(long, default_value = "32")]
        rows: u32,

        /// Number of columns on the LED panel
        #[arg(long, default_value = "50")]
        cols: u32,
    }

    tracing_subscriber::fmt()
        .with_target(false)
        .with_ansi(false) // Disable ANSI color codes for systemd/journald
        .compact()
        .init();

    let args = Args::parse();
    let panel = PanelConfig::new(args.rows, args.cols);

    let config = match &args.config {
        Some(path) => MirrorConfig::load(path).expect("Failed to load configuration"),
        None => MirrorConfig::default(),
    };

    tracing::info!("Mirror installation v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!("Panel: {}x{}", panel.cols, panel.rows);

    let running = setup_signal_handler();

    // The capture rig plugs in here: anything implementing FrameSource.
    // The synthetic source keeps the installation alive without a camera.
    let frames = Box::new(SyntheticSource::new(panel));

    let mut mirror = Mirror::with_defaults(panel, &config, frames, running.clone())
        .expect("Invalid configuration");

    let matrix = create_matrix(panel).expect("Failed to create matrix");
    let mut canvas = matrix.offscreen_canvas();
    let mut buf = DisplayBuffer::new(panel);

    mirror.start(&mut buf);

    while is_running(&running) {
        match mirror.refresh(&mut buf) {
            Ok(Step::Continue) => {}
            Ok(Step::Shutdown) => break,
            Err(e) => {
                tracing::error!("Tick failed: {e}");
                break;
            }
        }

        for (x, y, pixel) in buf.image().enumerate_pixels() {
            let color = mirror_matrix::Color::new(pixel[0], pixel[1], pixel[2]);
            canvas.set(x as i32, y as i32, &color.into());
        }
        canvas = matrix.swap(canvas);

        thread::sleep(mirror.interval());
    }

    tracing::info!("Shutting down cleanly");
}
