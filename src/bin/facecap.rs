//! facecap - capture face samples and talk to the verification service.
//!
//! Subcommands:
//! 1. `enroll` captures a fixed-size batch from the camera and registers
//!    an identity with the remote service.
//! 2. `authenticate` captures a single probe and asks the service for a
//!    match.
//! 3. `status` reports how many enrollment samples the service has
//!    buffered for a name.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};

use facecap::config::FacecapConfig;
use facecap::{
    AuthOutcome, CameraConfig, CameraSource, CancelToken, CollectorConfig, EnrollmentOutcome,
    SessionController, UploadClient,
};

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Capture face samples and upload them to a verification service"
)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Capture a batch of samples and enroll an identity.
    Enroll {
        /// Identity label to enroll.
        #[arg(long, env = "FACECAP_NAME")]
        name: String,

        /// Number of frames to capture (overrides config).
        #[arg(long)]
        count: Option<usize>,

        /// Milliseconds between captures (overrides config).
        #[arg(long)]
        interval_ms: Option<u64>,
    },

    /// Capture a single probe and authenticate it.
    Authenticate,

    /// Show the service-side sample buffer for a name.
    Status {
        #[arg(long)]
        name: String,
    },

    /// List the identities enrolled with the service.
    ListUsers,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();
    let cfg = FacecapConfig::load()?;

    let client = UploadClient::new(
        &cfg.server.url,
        cfg.server.batch_timeout,
        cfg.server.probe_timeout,
    )
    .context("configure upload client")?;

    match args.command {
        Command::Enroll {
            name,
            count,
            interval_ms,
        } => enroll(&cfg, client, &name, count, interval_ms),
        Command::Authenticate => authenticate(&cfg, client),
        Command::Status { name } => status(client, &name),
        Command::ListUsers => list_users(client),
    }
}

fn camera(cfg: &FacecapConfig) -> Result<CameraSource> {
    CameraSource::new(CameraConfig {
        url: cfg.camera.url.clone(),
        width: cfg.camera.width,
        height: cfg.camera.height,
    })
    .context("configure camera source")
}

fn enroll(
    cfg: &FacecapConfig,
    client: UploadClient,
    name: &str,
    count: Option<usize>,
    interval_ms: Option<u64>,
) -> Result<()> {
    let collector_config = CollectorConfig {
        target_count: count.unwrap_or(cfg.capture.batch_size),
        interval: interval_ms
            .map(std::time::Duration::from_millis)
            .unwrap_or(cfg.capture.interval),
        quality: cfg.capture.quality,
    };
    let target = collector_config.target_count;

    let cancel = CancelToken::new();
    let handler_token = cancel.clone();
    ctrlc::set_handler(move || {
        handler_token.cancel();
    })
    .expect("error setting Ctrl-C handler");

    let bar = ProgressBar::new(target as u64);
    bar.set_draw_target(ProgressDrawTarget::stderr());
    bar.set_style(
        ProgressStyle::with_template("{bar:40} {pos}/{len} frames")
            .unwrap_or_else(|_| ProgressStyle::default_bar()),
    );

    let mut controller = SessionController::new(camera(cfg)?, client, collector_config);
    log::info!("enrolling '{}' with {} frames", name, target);

    let outcome = controller.enroll(name, &cancel, &mut |frames, _| {
        bar.set_position(frames as u64);
    });
    bar.finish_and_clear();

    match outcome {
        Ok(EnrollmentOutcome::Complete { message }) => {
            println!("{}", message);
            Ok(())
        }
        Ok(EnrollmentOutcome::Rejected { message }) => {
            eprintln!("{}", message);
            std::process::exit(1);
        }
        Ok(EnrollmentOutcome::Cancelled) => {
            eprintln!("Capture cancelled; nothing was uploaded.");
            std::process::exit(1);
        }
        Err(err) => {
            log::debug!("enrollment error detail: {:?}", err);
            eprintln!("{}", err.status_message());
            std::process::exit(1);
        }
    }
}

fn authenticate(cfg: &FacecapConfig, client: UploadClient) -> Result<()> {
    let collector_config = CollectorConfig {
        target_count: 1,
        interval: cfg.capture.interval,
        quality: cfg.capture.quality,
    };
    let mut controller = SessionController::new(camera(cfg)?, client, collector_config);

    match controller.authenticate() {
        Ok(AuthOutcome::Match { intent, message }) => {
            println!("{}", message);
            println!("signed in as {}", intent.identity);
            Ok(())
        }
        Ok(AuthOutcome::NoMatch { message }) => {
            eprintln!("{}", message);
            std::process::exit(1);
        }
        Err(err) => {
            log::debug!("authentication error detail: {:?}", err);
            eprintln!("{}", err.status_message());
            std::process::exit(1);
        }
    }
}

fn status(client: UploadClient, name: &str) -> Result<()> {
    let status = client
        .capture_status(name)
        .with_context(|| format!("query capture status for '{}'", name))?;
    println!(
        "{}: {}/{} samples buffered",
        name, status.images_captured, status.total_needed
    );
    Ok(())
}

fn list_users(client: UploadClient) -> Result<()> {
    let users = client.list_users().context("list enrolled identities")?;
    if users.is_empty() {
        println!("no identities enrolled");
        return Ok(());
    }
    for user in users {
        println!("{}\t{} ({} samples)", user.id, user.name, user.face_count);
    }
    Ok(())
}
