use std::env;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand, ValueEnum};
use compreq::{
    ChecksumDigest, ComponentRequest, DecodeOptions, HashAlgorithm, InboundRequest,
    KeyedChecksum, RequestError, Value,
};
use thiserror::Error;
use tracing_subscriber::EnvFilter;

const SECRET_ENV: &str = "COMPREQ_SECRET";

#[derive(Parser, Debug)]
#[command(name = "compreq", version, about = "Inspect captured component update requests")]
struct Cli {
    /// Log filter, e.g. `debug` or `compreq=debug`
    #[arg(long, default_value = "warn", global = true)]
    log: String,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Validate a JSON request body and print its classified action queue
    Decode {
        /// Component name the request is addressed to
        #[arg(long, default_value = "component")]
        component: String,
        #[command(flatten)]
        key: KeyArgs,
        /// Highest sequence index a form key may address
        #[arg(long)]
        max_index: Option<usize>,
        /// Deepest path a form key may describe
        #[arg(long)]
        max_depth: Option<usize>,
        /// Largest body accepted, in bytes
        #[arg(long)]
        max_body_bytes: Option<usize>,
        /// Input file
        file: PathBuf,
    },
    /// Print the checksum of the body's `data` member
    Checksum {
        #[command(flatten)]
        key: KeyArgs,
        /// Input file
        file: PathBuf,
    },
}

#[derive(clap::Args, Debug)]
struct KeyArgs {
    /// Checksum secret; falls back to $COMPREQ_SECRET
    #[arg(long)]
    secret: Option<String>,
    /// Keyed digest algorithm
    #[arg(long, value_enum, default_value = "sha256")]
    digest: DigestAlgorithm,
}

impl KeyArgs {
    fn checksum(&self) -> Result<KeyedChecksum, CliError> {
        let secret = match &self.secret {
            Some(secret) => secret.clone(),
            None => env::var(SECRET_ENV).map_err(|_| CliError::MissingSecret)?,
        };
        Ok(KeyedChecksum::new(self.digest.into(), secret))
    }
}

#[derive(ValueEnum, Copy, Clone, Debug)]
#[clap(rename_all = "lower")]
enum DigestAlgorithm {
    Sha256,
    Blake3,
}

impl From<DigestAlgorithm> for HashAlgorithm {
    fn from(value: DigestAlgorithm) -> Self {
        match value {
            DigestAlgorithm::Sha256 => HashAlgorithm::Sha256,
            DigestAlgorithm::Blake3 => HashAlgorithm::Blake3,
        }
    }
}

#[derive(Debug, Error)]
enum CliError {
    #[error("{}: {0}", .0.kind().as_str())]
    Request(#[from] RequestError),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error("no secret given: pass --secret or set {SECRET_ENV}")]
    MissingSecret,
    #[error("no data member in {0}")]
    MissingData(PathBuf),
    #[error("invalid log filter: {0}")]
    LogFilter(String),
}

fn main() {
    if let Err(err) = run() {
        eprintln!("{err}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), CliError> {
    let cli = Cli::parse();
    init_logging(&cli.log)?;
    match cli.command {
        Commands::Decode {
            component,
            key,
            max_index,
            max_depth,
            max_body_bytes,
            file,
        } => {
            let mut options = DecodeOptions::default();
            if let Some(max_index) = max_index {
                options.max_index = max_index;
            }
            if let Some(max_depth) = max_depth {
                options.max_depth = max_depth;
            }
            if let Some(max_body_bytes) = max_body_bytes {
                options.max_body_bytes = max_body_bytes;
            }
            cmd_decode(&file, &component, &key.checksum()?, &options)
        }
        Commands::Checksum { key, file } => cmd_checksum(&file, &key.checksum()?),
    }
}

fn init_logging(filter: &str) -> Result<(), CliError> {
    let filter = EnvFilter::try_new(filter).map_err(|err| CliError::LogFilter(err.to_string()))?;
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
    Ok(())
}

fn cmd_decode(
    path: &Path,
    component: &str,
    digest: &KeyedChecksum,
    options: &DecodeOptions,
) -> Result<(), CliError> {
    let body = fs::read(path)?;
    let request = InboundRequest::json(path.display().to_string(), body);
    let validated = ComponentRequest::new_with_options(&request, component, digest, options)?;

    let mut out = String::new();
    out.push_str(&format!(
        "component={} id={} epoch={} key={} actions={}\n",
        validated.name(),
        validated.id(),
        validated.epoch(),
        validated.key(),
        validated.actions().len()
    ));
    for (index, action) in validated.actions().iter().enumerate() {
        out.push_str(&format!("action={} kind={}", index, action.kind().as_str()));
        match action.method_call() {
            Some(call) => out.push_str(&format!(
                " method={} args={} kwargs={}",
                call.name,
                call.args.len(),
                call.kwargs.len()
            )),
            None => out.push_str(&format!(" type={}", action.raw().action_type)),
        }
        out.push('\n');
    }
    write_stdout(out.as_bytes())
}

fn cmd_checksum(path: &Path, digest: &KeyedChecksum) -> Result<(), CliError> {
    let bytes = fs::read(path)?;
    let data = match compreq::from_json_slice(&bytes)? {
        Value::Mapping(mut body) => body.remove("data").filter(|data| !data.is_null()),
        _ => None,
    }
    .ok_or_else(|| CliError::MissingData(path.to_path_buf()))?;
    println!("{} {}", digest.algorithm().as_str(), digest.digest(&data));
    Ok(())
}

fn write_stdout(bytes: &[u8]) -> Result<(), CliError> {
    let mut stdout = io::stdout().lock();
    stdout.write_all(bytes)?;
    Ok(())
}
