use anyhow::Result;
use clap::Parser;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

use campreview::{
    CameraOpener, FrameListener, ListenerError, PreviewConfig, PreviewDelegate, PreviewSurface,
    RecordingSurface,
};

#[derive(Parser, Debug)]
#[command(name = "campreview")]
#[command(about = "Camera preview lifecycle delegate diagnostic tool")]
#[command(version)]
#[command(long_about = "Runs a preview session against the configured camera backend, \
logging negotiated parameters and frame throughput. Useful for checking parameter \
negotiation and lifecycle behavior without a host application.")]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "campreview.toml", help = "Path to TOML configuration file")]
    config: String,

    /// Enable debug logging (most verbose)
    #[arg(short, long, help = "Enable debug level logging")]
    debug: bool,

    /// Enable verbose logging (info level)
    #[arg(short, long, help = "Enable verbose info level logging")]
    verbose: bool,

    /// Enable quiet mode (errors only)
    #[arg(short, long, help = "Enable quiet mode - only log errors")]
    quiet: bool,

    /// Validate configuration and exit
    #[arg(long, help = "Validate configuration file and exit without running a session")]
    validate_config: bool,

    /// Print default configuration and exit
    #[arg(long, help = "Print default configuration in TOML format and exit")]
    print_config: bool,

    /// Session duration in seconds
    #[arg(long, default_value_t = 5, help = "How long to run the preview session")]
    duration: u64,
}

fn main() -> Result<()> {
    let args = Args::parse();

    if args.print_config {
        println!("{}", PreviewConfig::default_toml()?);
        return Ok(());
    }

    init_logging(&args)?;

    info!("Starting campreview v{}", env!("CARGO_PKG_VERSION"));

    let config = if Path::new(&args.config).exists() {
        PreviewConfig::load_from_file(&args.config).map_err(|e| {
            error!("Failed to load configuration: {}", e);
            e
        })?
    } else {
        info!("No configuration file at {}, using defaults", args.config);
        PreviewConfig::default()
    };

    if args.validate_config {
        match config.validate() {
            Ok(()) => {
                println!("✓ Configuration is valid");
                return Ok(());
            }
            Err(e) => {
                eprintln!("✗ Configuration validation failed: {}", e);
                std::process::exit(1);
            }
        }
    }
    config.validate()?;

    run_session(config, Duration::from_secs(args.duration))
}

struct CountingListener {
    notifications: AtomicU64,
}

impl FrameListener for CountingListener {
    fn on_frame_available(&self) -> Result<(), ListenerError> {
        self.notifications.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }
}

fn run_session(config: PreviewConfig, duration: Duration) -> Result<()> {
    let opener = make_opener();
    let surface = Arc::new(RecordingSurface::new(config.surface.sink_capacity));
    let (width, height) = config.camera.resolution;

    let delegate = PreviewDelegate::new(config, opener, surface.clone() as Arc<dyn PreviewSurface>);
    let listener = Arc::new(CountingListener {
        notifications: AtomicU64::new(0),
    });
    delegate.add_listener(listener.clone());

    info!("Requesting {}x{} preview for {:?}", width, height, duration);
    delegate.on_resume();

    let seconds = duration.as_secs().max(1);
    let mut last_total = 0;
    for second in 1..=seconds {
        std::thread::sleep(Duration::from_secs(1));
        let total = surface.frame_count();
        if total > last_total {
            delegate.call_on_frame_available();
        }
        info!(
            "t={}s: {} frames total ({} this second), negotiated size {:?}",
            second,
            total,
            total - last_total,
            delegate.preview_size()
        );
        last_total = total;
    }

    delegate.on_pause();
    delegate.release();

    info!(
        "Session finished: {} frames, {} listener notifications",
        last_total,
        listener.notifications.load(Ordering::Relaxed)
    );
    Ok(())
}

#[cfg(all(feature = "v4l2", target_os = "linux"))]
fn make_opener() -> Arc<dyn CameraOpener> {
    Arc::new(campreview::V4l2Opener::new())
}

#[cfg(not(all(feature = "v4l2", target_os = "linux")))]
fn make_opener() -> Arc<dyn CameraOpener> {
    info!("No capture backend enabled, using the mock camera");
    Arc::new(campreview::MockCameraOpener::new())
}

fn init_logging(args: &Args) -> Result<()> {
    use tracing_subscriber::{fmt, EnvFilter};

    let log_level = if args.debug {
        "debug"
    } else if args.verbose {
        "info"
    } else if args.quiet {
        "error"
    } else {
        "info"
    };

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("campreview={}", log_level)));

    fmt()
        .with_env_filter(env_filter)
        .with_target(args.debug)
        .with_thread_ids(args.debug)
        .init();

    Ok(())
}
