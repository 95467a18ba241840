//! nxget - a Nintendo Switch system-update downloader.

use std::fs::File;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

mod run;
mod store;

#[derive(Parser, Debug)]
#[command(name = "nxget", version, about = "Downloads system updates from the firmware CDN")]
struct Cli {
    #[command(flatten)]
    connection: ConnectionArgs,

    /// Verbose logging (disables the progress bar)
    #[arg(short = 'v', long, global = true)]
    verbose: bool,

    /// Write the verbose log to a file instead of stderr
    #[arg(long, value_name = "PATH", global = true)]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Args, Debug)]
struct ConnectionArgs {
    /// Path to the TLS client certificate bundle (PEM)
    #[arg(short = 'c', long, default_value = "nx_tls_client_cert.pem", global = true)]
    cert: PathBuf,

    /// Device ID presented to the CDN
    #[arg(long, default_value = "DEADCAFEBABEBEEF", global = true)]
    device_id: String,

    /// CDN environment tag
    #[arg(long = "environment", default_value = "lp1", global = true)]
    env: String,

    /// Platform tag reported in the user agent
    #[arg(long, default_value = "NX", global = true)]
    platform: String,

    /// Firmware version reported in the user agent
    #[arg(long, default_value = "5.1.0-3", global = true)]
    firmware_version: String,

    /// Use the regional (Tencent) server cluster
    #[arg(short = 't', long, global = true)]
    tencent: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the latest version available on the CDN
    GetInfo,
    /// Download the latest system update
    GetLatest(GetLatestArgs),
}

#[derive(Args, Debug)]
struct GetLatestArgs {
    /// Output directory (defaults to sysupdate-[raw]-version-bn_N)
    #[arg(short = 'o', long = "out")]
    out: Option<PathBuf>,

    /// Path to the decryption keyset
    #[arg(short = 'k', long, default_value_os_t = default_keyset_path())]
    keyset: PathBuf,

    /// Maximum concurrent downloads
    #[arg(short = 'j', long, default_value_t = nxget_fetch::DEFAULT_MAX_JOBS)]
    jobs: usize,

    /// Only download the listed title IDs (comma separated)
    #[arg(long, value_delimiter = ',')]
    titles: Vec<String>,

    /// Download and parse meta containers only
    #[arg(long)]
    only_meta: bool,

    /// Overwrite an existing output directory without asking
    #[arg(short = 'q', long = "ignore-warnings", alias = "no-confirm")]
    ignore_warnings: bool,
}

fn default_keyset_path() -> PathBuf {
    home::home_dir().unwrap_or_default().join(".switch/prod.keys")
}

fn init_tracing(cli: &Cli) -> Result<()> {
    let verbose = cli.verbose || cli.log_file.is_some();
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    let registry = tracing_subscriber::registry().with(filter);
    match &cli.log_file {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("creating log file {}", path.display()))?;
            registry
                .with(
                    tracing_subscriber::fmt::layer()
                        .with_target(false)
                        .with_ansi(false)
                        .with_writer(Arc::new(file)),
                )
                .init();
        }
        None => {
            registry
                .with(tracing_subscriber::fmt::layer().with_target(false).with_writer(std::io::stderr))
                .init();
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(&cli)?;

    match &cli.command {
        Command::GetInfo => run::get_info(&cli).await,
        Command::GetLatest(args) => run::get_latest(&cli, args).await,
    }
}
