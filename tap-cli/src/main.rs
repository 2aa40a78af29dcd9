//! Reader autodetection command line tool
//!
//! Scans the host's serial ports for Tappy NFC readers, prints every
//! confirmed reader as it is found, then reports a summary.

use std::process::ExitCode;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Result};
use tap_detect::{Detector, DetectorConfig, WaitTimeout};
use tracing::{debug, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const USAGE: &str = "\
Usage: tapscan [OPTIONS]

Scan serial ports for Tappy NFC readers.

Options:
  --timeout-ms <MS>   Per-device handshake wait (default 100)
  --window-ms <MS>    How long to keep the scan open (default 2000)
  --json              Print confirmed devices as JSON descriptors
  -h, --help          Show this help";

/// Parsed command line options
struct Options {
    timeout: Duration,
    window: Duration,
    json: bool,
}

impl Options {
    fn parse(mut args: std::env::Args) -> Result<Option<Self>> {
        // Skip the program name
        args.next();

        let mut options = Options {
            timeout: Duration::from_millis(100),
            window: Duration::from_millis(2_000),
            json: false,
        };

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--timeout-ms" => options.timeout = parse_ms(&arg, args.next())?,
                "--window-ms" => options.window = parse_ms(&arg, args.next())?,
                "--json" => options.json = true,
                "-h" | "--help" => return Ok(None),
                other => bail!("unknown argument '{}'\n\n{}", other, USAGE),
            }
        }

        Ok(Some(options))
    }
}

fn parse_ms(flag: &str, value: Option<String>) -> Result<Duration> {
    let Some(value) = value else {
        bail!("{} requires a value", flag);
    };
    let ms: u64 = value
        .parse()
        .map_err(|_| anyhow::anyhow!("{} expects a millisecond count, got '{}'", flag, value))?;
    Ok(Duration::from_millis(ms))
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tapscan=info,tap_detect=info,tap_protocol=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let Some(options) = Options::parse(std::env::args())? else {
        println!("{}", USAGE);
        return Ok(ExitCode::SUCCESS);
    };

    info!("Scanning serial ports for readers");

    let config = DetectorConfig {
        wait_timeout: WaitTimeout::Bounded(options.timeout),
    };
    let detector = Detector::new(config);

    let found = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&found);
    let json = options.json;
    detector
        .set_confirmed_callback(move |device| {
            counter.fetch_add(1, Ordering::Relaxed);
            if json {
                match serde_json::to_string(device) {
                    Ok(line) => println!("{}", line),
                    Err(e) => debug!("Failed to encode device: {}", e),
                }
            } else {
                println!("Found reader at {}", device.path);
            }
        })
        .await;
    detector
        .set_status_callback(|scanning| debug!("Scanning active: {}", scanning))
        .await;

    detector.scan().await;
    tokio::time::sleep(options.window).await;
    detector.stop().await;

    let count = found.load(Ordering::Relaxed);
    info!("Scan finished: {} reader(s) confirmed", count);

    if count > 0 {
        Ok(ExitCode::SUCCESS)
    } else {
        Ok(ExitCode::FAILURE)
    }
}
