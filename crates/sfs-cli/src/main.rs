//! sfs: securefs command-line client
//!
//! Account commands:
//!   signup / login           - create an account, or check its credentials
//!
//! File commands (need --user, password from --pass / SFS_PASSWORD / prompt):
//!   put / append / get       - write, extend, and read a named file
//!   rm / ls                  - unbind a name (deleting owned files), list names
//!
//! Sharing:
//!   share --name             - print a capability token for a file
//!   accept --as --code       - bind a received share code under a local name
//!   revoke --name            - rotate the file key, invalidating old tokens
//!
//! Diagnostics:
//!   dump                     - redacted store summary as JSON
//!
//! Errors from the store map to distinct exit codes (see `--help`).

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use secrecy::SecretString;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use sfs_core::config::SfsConfig;
use sfs_core::SfsError;
use sfs_crypto::KdfParams;
use sfs_store::Store;
use sfs_vault::Session;

// ── CLI structure ──────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(
    name = "sfs",
    version,
    about = "securefs: multi-user encrypted file store",
    after_help = "Exit codes: 0 ok, 1 other, 2 usage, 10 validation, 11 duplicate account, \
                  12 authentication, 13 not found, 14 integrity, 15 malformed token, \
                  16 invalid capability, 17 dangling capability, 18 revoked capability, \
                  19 storage, 20 crypto"
)]
struct Cli {
    /// Path to sfs.toml configuration file
    #[arg(long, short = 'c', env = "SFS_CONFIG", default_value = "~/.config/sfs/sfs.toml")]
    config: PathBuf,

    /// Store snapshot path (overrides config [store] path)
    #[arg(long, env = "SFS_STORE")]
    store: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "SFS_LOG")]
    log: Option<String>,

    /// Log format
    #[arg(long)]
    log_format: Option<LogFormat>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, Debug, ValueEnum, PartialEq)]
enum LogFormat {
    Json,
    Text,
}

#[derive(Args, Debug)]
struct Credentials {
    /// Account name
    #[arg(long, short = 'u')]
    user: String,

    /// Account password (prompted for when neither this nor SFS_PASSWORD is set)
    #[arg(long, env = "SFS_PASSWORD", hide_env_values = true)]
    pass: Option<String>,
}

#[derive(Args, Debug)]
#[group(required = true, multiple = false)]
struct Content {
    /// Content given inline
    #[arg(long)]
    data: Option<String>,

    /// Content read from a local file
    #[arg(long)]
    file: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Create an account
    Signup {
        #[command(flatten)]
        creds: Credentials,
    },

    /// Check credentials and show how many files the account holds
    Login {
        #[command(flatten)]
        creds: Credentials,
    },

    /// Store content under a name, replacing any previous binding
    Put {
        #[command(flatten)]
        creds: Credentials,
        #[arg(long, short = 'n')]
        name: String,
        #[command(flatten)]
        content: Content,
    },

    /// Write a file's content to stdout
    Get {
        #[command(flatten)]
        creds: Credentials,
        #[arg(long, short = 'n')]
        name: String,
    },

    /// Append content to an existing file
    Append {
        #[command(flatten)]
        creds: Credentials,
        #[arg(long, short = 'n')]
        name: String,
        #[command(flatten)]
        content: Content,
    },

    /// Print a share token for a file
    Share {
        #[command(flatten)]
        creds: Credentials,
        #[arg(long, short = 'n')]
        name: String,
    },

    /// Bind a share token under a local name
    Accept {
        #[command(flatten)]
        creds: Credentials,
        /// Local name for the shared file
        #[arg(long = "as", short = 'n', visible_alias = "name")]
        name: String,
        /// Share code printed by `sfs share`
        #[arg(long = "code", short = 't', visible_alias = "token")]
        token: String,
    },

    /// Rotate a file's key; previously issued tokens stop working
    Revoke {
        #[command(flatten)]
        creds: Credentials,
        #[arg(long, short = 'n')]
        name: String,
    },

    /// Unbind a name; files this account created are deleted as well
    Rm {
        #[command(flatten)]
        creds: Credentials,
        #[arg(long, short = 'n')]
        name: String,
    },

    /// List the account's file names
    Ls {
        #[command(flatten)]
        creds: Credentials,
    },

    /// Print a redacted summary of the store as JSON
    Dump,
}

// ── Entry point ───────────────────────────────────────────────────────────────

fn main() -> ExitCode {
    let cli = Cli::parse();

    let config_path = expand_tilde(&cli.config);
    let (config, found) = match load_config(&config_path) {
        Ok(loaded) => loaded,
        Err(e) => {
            eprintln!("error: {e:#}");
            return ExitCode::from(1);
        }
    };

    let level = cli.log.clone().unwrap_or_else(|| config.log.level.clone());
    let format = cli
        .log_format
        .or_else(|| LogFormat::from_str(&config.log.format, true).ok())
        .unwrap_or(LogFormat::Text);
    init_logging(&level, format);

    if !found {
        tracing::warn!(
            "config file not found: {}  (using defaults)",
            config_path.display()
        );
    }

    let store_path = expand_tilde(cli.store.as_deref().unwrap_or(&config.store.path));
    tracing::debug!(
        version = env!("CARGO_PKG_VERSION"),
        store = %store_path.display(),
        "sfs starting"
    );

    match run(cli.command, &store_path, &config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::from(exit_code(&e))
        }
    }
}

fn run(command: Commands, store_path: &Path, config: &SfsConfig) -> Result<()> {
    let store = Arc::new(
        Store::open_with_mode(store_path, config.store.file_mode)
            .with_context(|| format!("opening store: {}", store_path.display()))?,
    );

    match command {
        Commands::Signup { creds } => cmd_signup(&store, &creds, &KdfParams::from(&config.kdf)),
        Commands::Login { creds } => {
            let session = open_session(&store, &creds)?;
            println!(
                "logged in as {} ({} files)",
                session.username(),
                session.list_files().len()
            );
            Ok(())
        }
        Commands::Put {
            creds,
            name,
            content,
        } => {
            let data = read_content(&content)?;
            let file_id = open_session(&store, &creds)?.store_file(&name, &data)?;
            println!("stored {name} ({} bytes, id {file_id})", data.len());
            Ok(())
        }
        Commands::Get { creds, name } => {
            let data = open_session(&store, &creds)?.load_file(&name)?;
            let mut out = std::io::stdout().lock();
            out.write_all(&data).context("writing to stdout")?;
            out.flush().context("writing to stdout")
        }
        Commands::Append {
            creds,
            name,
            content,
        } => {
            let data = read_content(&content)?;
            open_session(&store, &creds)?.append_file(&name, &data)?;
            println!("appended {} bytes to {name}", data.len());
            Ok(())
        }
        Commands::Share { creds, name } => {
            println!("{}", open_session(&store, &creds)?.create_share(&name)?);
            Ok(())
        }
        Commands::Accept { creds, name, token } => {
            let file_id = open_session(&store, &creds)?.accept_share(&name, &token)?;
            println!("bound {name} to shared file {file_id}");
            Ok(())
        }
        Commands::Revoke { creds, name } => {
            let chunks = open_session(&store, &creds)?.revoke(&name)?;
            println!("rotated key for {name} ({chunks} chunks re-encrypted)");
            Ok(())
        }
        Commands::Rm { creds, name } => {
            open_session(&store, &creds)?.remove_file(&name)?;
            println!("removed {name}");
            Ok(())
        }
        Commands::Ls { creds } => {
            for name in open_session(&store, &creds)?.list_files() {
                println!("{name}");
            }
            Ok(())
        }
        Commands::Dump => {
            let summary = store.summary()?;
            println!("{}", serde_json::to_string_pretty(&summary)?);
            Ok(())
        }
    }
}

// ── Commands ──────────────────────────────────────────────────────────────────

fn cmd_signup(store: &Store, creds: &Credentials, params: &KdfParams) -> Result<()> {
    let password = password(creds)?;
    sfs_vault::signup(store, &creds.user, &password, params)?;
    println!("created account {}", creds.user);
    Ok(())
}

fn open_session(store: &Arc<Store>, creds: &Credentials) -> Result<Session> {
    let password = password(creds)?;
    Ok(sfs_vault::login(Arc::clone(store), &creds.user, &password)?)
}

/// Password precedence: `--pass` / `SFS_PASSWORD`, then an interactive prompt.
fn password(creds: &Credentials) -> Result<SecretString> {
    match &creds.pass {
        Some(p) => Ok(SecretString::from(p.clone())),
        None => {
            let p = rpassword::prompt_password(format!("password for {}: ", creds.user))
                .context("reading password")?;
            Ok(SecretString::from(p))
        }
    }
}

fn read_content(content: &Content) -> Result<Vec<u8>> {
    match (&content.data, &content.file) {
        (Some(data), _) => Ok(data.as_bytes().to_vec()),
        (None, Some(path)) => {
            std::fs::read(path).with_context(|| format!("reading: {}", path.display()))
        }
        (None, None) => anyhow::bail!("one of --data or --file is required"),
    }
}

/// The exit code of the first `SfsError` in the chain, 1 if there is none.
fn exit_code(err: &anyhow::Error) -> u8 {
    err.chain()
        .find_map(|e| e.downcast_ref::<SfsError>())
        .and_then(|e| u8::try_from(e.exit_code()).ok())
        .unwrap_or(1)
}

// ── Config loading ────────────────────────────────────────────────────────────

/// Load `path`, or defaults when it does not exist. The flag reports whether
/// the file was found.
fn load_config(path: &Path) -> Result<(SfsConfig, bool)> {
    if path.exists() {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading config: {}", path.display()))?;
        let config = toml::from_str(&content)
            .with_context(|| format!("parsing config: {}", path.display()))?;
        Ok((config, true))
    } else {
        Ok((SfsConfig::default(), false))
    }
}

/// Expand `~` in path to the user's home directory
fn expand_tilde(path: &Path) -> PathBuf {
    let s = path.to_string_lossy();
    match s.strip_prefix("~/") {
        Some(rest) => {
            let home = std::env::var("HOME").unwrap_or_default();
            PathBuf::from(home).join(rest)
        }
        None => path.to_path_buf(),
    }
}

fn init_logging(level: &str, format: LogFormat) {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    match format {
        LogFormat::Json => {
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().json().with_writer(std::io::stderr))
                .init();
        }
        LogFormat::Text => {
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().with_writer(std::io::stderr))
                .init();
        }
    }
}
