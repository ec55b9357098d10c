//! Barcode Scanner CLI
//!
//! Drives a scanner screen against a simulated camera and permission
//! subsystem, printing each result notice the way a device would show it.

use barcode_scanner::{
    capture::{FileConfig, MockCameraBackend, Symbology},
    detection::{DetectedCode, MetadataObject},
    lifecycle::{AppNotification, AppNotifier},
    permission::{AuthorizationStatus, MockPermissions},
    Presenter, ScannerScreen,
};
use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// Simulated camera barcode scanner.
#[derive(Debug, Parser)]
#[command(name = "barcode-scanner", version, about)]
struct Cli {
    /// TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Camera permission and hardware situation to simulate.
    #[arg(long, value_enum, default_value_t = Scenario::Authorized)]
    scenario: Scenario,

    /// Number of results to present before exiting.
    #[arg(long)]
    codes: Option<u32>,

    /// Keep scanning until Ctrl-C.
    #[arg(long)]
    continuous: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Scenario {
    /// Camera access already granted.
    Authorized,
    /// First launch; the user grants access at the prompt.
    PromptGrant,
    /// First launch; the user denies access at the prompt.
    PromptDeny,
    /// Access previously denied in settings.
    Denied,
    /// Access granted but no camera attached.
    NoCamera,
}

/// Prints notices to stdout. Results wait for the main loop to dismiss them.
#[derive(Default)]
struct ConsolePresenter {
    pending: Option<DetectedCode>,
    presented: u32,
    camera_unavailable: bool,
}

impl Presenter for ConsolePresenter {
    fn on_barcode_detected(&mut self, code: &DetectedCode) {
        self.presented += 1;
        println!("┌ Scan result #{}\n{}\n└ [Close]", self.presented, code.alert_message());
        self.pending = Some(code.clone());
    }

    fn on_camera_unavailable(&mut self) {
        self.camera_unavailable = true;
        println!("Camera access is disabled. Enable it in Settings to scan barcodes.");
    }
}

const SAMPLE_CODES: &[(Symbology, &str)] = &[
    (Symbology::Ean13, "4006381333931"),
    (Symbology::Code128, "SHIP-2024-0042"),
    (Symbology::Ean8, "96385074"),
    (Symbology::UpcE, "01234565"),
    (Symbology::Itf14, "15400141288763"),
    (Symbology::Code39, "PART-7781"),
];

fn main() {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let cli = Cli::parse();

    info!("Barcode Scanner v{}", barcode_scanner::VERSION);
    info!(scenario = ?cli.scenario, "Simulating camera and permissions");

    let mut file_config = match &cli.config {
        Some(path) => match FileConfig::from_file(path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("Failed to load config: {}", e);
                std::process::exit(1);
            }
        },
        None => FileConfig::default(),
    };
    if let Some(codes) = cli.codes {
        file_config.output.code_count = codes;
    }
    if cli.continuous {
        file_config.output.continuous = true;
    }
    let output = file_config.output.clone();

    let running = Arc::new(AtomicBool::new(true));
    let handler_flag = Arc::clone(&running);
    if let Err(e) = ctrlc::set_handler(move || handler_flag.store(false, Ordering::SeqCst)) {
        warn!(error = %e, "Failed to install Ctrl-C handler");
    }

    let camera = match cli.scenario {
        Scenario::NoCamera => MockCameraBackend::without_device(),
        _ => MockCameraBackend::new(),
    };
    let permissions = match cli.scenario {
        Scenario::Authorized | Scenario::NoCamera => {
            MockPermissions::new(AuthorizationStatus::Authorized)
        }
        Scenario::PromptGrant => MockPermissions::answering(true),
        Scenario::PromptDeny => MockPermissions::answering(false),
        Scenario::Denied => MockPermissions::new(AuthorizationStatus::Denied),
    };
    let notifier = AppNotifier::new();

    let mut screen = match ScannerScreen::new(
        file_config.scanner,
        Arc::new(camera.clone()),
        Arc::new(permissions),
        notifier.clone(),
        ConsolePresenter::default(),
    ) {
        Ok(screen) => screen,
        Err(e) => {
            eprintln!("Failed to create scanner: {}", e);
            std::process::exit(1);
        }
    };

    #[cfg(feature = "metrics")]
    let exporter = barcode_scanner::metrics::MetricsServerConfig::from_output(&output)
        .map(|config| spawn_metrics_server(screen.metrics().clone(), config));

    screen.will_appear();
    settle(&mut screen);

    let interval = Duration::from_millis(output.frame_interval_ms);
    let mut frame: usize = 0;
    let mut backgrounded_once = false;

    while running.load(Ordering::SeqCst) {
        if screen.presenter().camera_unavailable {
            break;
        }
        if !output.continuous && screen.presenter().presented >= output.code_count {
            break;
        }
        if !screen.pipeline().is_prepared() {
            warn!("No camera session; nothing to scan");
            break;
        }

        std::thread::sleep(interval);
        frame += 1;

        // Every third frame has a code in view, sometimes alongside a face.
        let objects = if frame % 3 == 0 {
            let (symbology, value) = SAMPLE_CODES[(frame / 3) % SAMPLE_CODES.len()];
            let mut objects = Vec::new();
            if frame % 2 == 0 {
                objects.push(MetadataObject::Face { face_id: frame as i64 });
            }
            objects.push(MetadataObject::code(symbology, value));
            objects
        } else {
            Vec::new()
        };
        camera.emit(objects);
        settle(&mut screen);

        if screen.presenter_mut().pending.take().is_some() {
            std::thread::sleep(interval);
            screen.result_dismissed();
            settle(&mut screen);

            if !backgrounded_once {
                backgrounded_once = true;
                info!("Simulating app switch");
                notifier.post(AppNotification::WillResignActive);
                notifier.post(AppNotification::DidBecomeActive);
                settle(&mut screen);
            }
        }
    }

    screen.will_disappear();
    settle(&mut screen);

    let snapshot = screen.metrics().snapshot();
    info!(
        forwarded = snapshot.detections_forwarded,
        dropped = snapshot.detections_dropped,
        starts = snapshot.session_starts,
        stops = snapshot.session_stops,
        "Done"
    );

    #[cfg(feature = "metrics")]
    if let Some((shutdown, thread)) = exporter {
        let _ = shutdown.send(());
        if thread.join().is_err() {
            warn!("Metrics exporter thread panicked");
        }
    }
}

fn settle(screen: &mut ScannerScreen<ConsolePresenter>) {
    if let Err(e) = screen.run_until_idle() {
        warn!(error = %e, "Scanner queue unavailable");
    }
}

#[cfg(feature = "metrics")]
fn spawn_metrics_server(
    metrics: barcode_scanner::metrics::ScannerMetrics,
    config: barcode_scanner::metrics::MetricsServerConfig,
) -> (tokio::sync::oneshot::Sender<()>, std::thread::JoinHandle<()>) {
    use barcode_scanner::metrics::MetricsServer;

    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();
    let thread = std::thread::spawn(move || {
        let runtime = match tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()
        {
            Ok(runtime) => runtime,
            Err(e) => {
                warn!(error = %e, "Failed to start metrics runtime");
                return;
            }
        };
        let server = MetricsServer::new(config, metrics);
        let shutdown = async move {
            let _ = shutdown_rx.await;
        };
        if let Err(e) = runtime.block_on(server.run_until(shutdown)) {
            warn!(error = %e, "Metrics server stopped");
        }
    });
    (shutdown_tx, thread)
}
