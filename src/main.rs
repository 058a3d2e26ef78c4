use std::{
    collections::BTreeMap,
    fs::{self, OpenOptions},
    io::Write,
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use rand::Rng;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use haystack::{
    accessory::{generate_until_valid, select_devices, DeviceIdentity},
    server::{fetch_and_decrypt, BatchOutcome, HttpRelay, RelayConfig},
};

#[derive(Parser)]
struct CliParser {
    /// Relay that answers report requests.
    #[arg(
        long,
        env = "HAYSTACK_ENDPOINT",
        default_value = RelayConfig::DEFAULT_ENDPOINT,
        global = true
    )]
    endpoint: String,

    /// How many days of reports to request.
    #[arg(
        long,
        env = "HAYSTACK_DAYS",
        default_value_t = RelayConfig::DEFAULT_DAYS,
        global = true
    )]
    days: u32,

    /// Relay request timeout, in seconds.
    #[arg(long, default_value_t = RelayConfig::DEFAULT_TIMEOUT.as_secs(), global = true)]
    timeout: u64,

    /// Log filter to use when RUST_LOG is not set.
    #[arg(long, default_value = "info", global = true)]
    log_level: String,

    /// Command to execute.
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Generate a new accessory key pair and write it to `<NAME>.keys`.
    Generate {
        name: String,
        /// Directory to write the key file to.
        #[arg(long, default_value = ".")]
        out_dir: PathBuf,
        /// Give up after this many rejected keys.
        #[arg(long, default_value_t = 64)]
        attempts: usize,
        /// Also write `<NAME>.json`, a device list for the macless-haystack web app.
        #[arg(long)]
        json: bool,
    },
    /// Fetch and decrypt every report for the given key files and print them as JSON.
    Reports {
        #[arg(required = true)]
        key_files: Vec<PathBuf>,
    },
    /// Print the most recent location of one device, or of all of them.
    Locate {
        /// Device name (the key file's stem), or `all`.
        #[arg(long, default_value = "all")]
        device: String,
        #[arg(required = true)]
        key_files: Vec<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli_args = CliParser::parse();

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&cli_args.log_level))
        .context("invalid log filter")?;
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let config = RelayConfig {
        endpoint: cli_args.endpoint,
        days: cli_args.days,
        timeout: Duration::from_secs(cli_args.timeout),
    };

    match cli_args.command {
        Command::Generate {
            name,
            out_dir,
            attempts,
            json,
        } => {
            let identity = generate_until_valid(&name, attempts)?;
            let path = out_dir.join(format!("{name}.keys"));
            write_secret_file(&path, &identity.to_credential_record())?;
            info!(path = %path.display(), id = identity.id(), "wrote key file");

            if json {
                let app_id = rand::thread_rng().gen_range(1000..999_999);
                let path = out_dir.join(format!("{name}.json"));
                write_secret_file(&path, &identity.to_app_device_list(app_id)?)?;
                info!(path = %path.display(), "wrote device list");
            }

            println!("{}", identity.advertisement_key().to_base64());
        }
        Command::Reports { key_files } => {
            let devices = load_devices(&key_files)?;
            let outcome = fetch(&config, &devices).await?;

            let mut by_name = BTreeMap::new();
            for device in &devices {
                if let Some(records) = outcome.reports().get(device.id()) {
                    by_name.insert(device.name(), records);
                }
            }

            println!("{}", serde_json::to_string_pretty(&by_name)?);
        }
        Command::Locate { device, key_files } => {
            let devices = load_devices(&key_files)?;
            let selected = select_devices(&devices, &device)
                .with_context(|| format!("no key file is named {device:?}"))?;
            let outcome = fetch(&config, selected.iter().copied()).await?;

            for device in selected {
                match outcome.reports().latest(device.id()) {
                    Some(record) => println!(
                        "{}: {:.7}, {:.7} (±{} m) at {}",
                        device.name(),
                        record.latitude(),
                        record.longitude(),
                        record.accuracy_meters(),
                        record.timestamp,
                    ),
                    None => println!("{}: no reports", device.name()),
                }
            }
        }
    }

    Ok(())
}

async fn fetch<'a>(
    config: &RelayConfig,
    devices: impl IntoIterator<Item = &'a DeviceIdentity>,
) -> Result<BatchOutcome> {
    let relay = HttpRelay::new(config)?;
    let outcome = fetch_and_decrypt(devices, &relay, config.days).await?;

    if let Some(errors) = outcome.errors() {
        warn!(skipped = errors.len(), "some reports could not be decrypted");
    }

    Ok(outcome)
}

fn load_devices(paths: &[PathBuf]) -> Result<Vec<DeviceIdentity>> {
    paths
        .iter()
        .map(|path| {
            let name = path
                .file_stem()
                .with_context(|| format!("{} has no file name", path.display()))?
                .to_string_lossy();
            let record = fs::read_to_string(path)
                .with_context(|| format!("failed to read {}", path.display()))?;

            DeviceIdentity::from_credential_record(name, &record)
                .with_context(|| format!("failed to parse {}", path.display()))
        })
        .collect()
}

fn write_secret_file(path: &Path, contents: &str) -> Result<()> {
    let mut options = OpenOptions::new();
    options.write(true).create_new(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }

    let mut file = options
        .open(path)
        .with_context(|| format!("failed to create {}", path.display()))?;
    file.write_all(contents.as_bytes())?;

    Ok(())
}
