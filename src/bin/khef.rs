//! khef CLI - passphrase-based single-file encryption
//!
//! Command-line interface for encrypting and decrypting files using
//! XSalsa20Poly1305 with scrypt key derivation.

use std::path::{Path, PathBuf};
use std::process;

use clap::{ArgAction, Parser, Subcommand};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use khef::boundary::{OsBoundary, WriteMode};
use khef::config::{self, Config};
use khef::error::{ErrorKind, KhefError, Result};
use khef::info;
use khef::passphrase::{PassphraseReader, ReaderPassphraseReader, TerminalPassphraseReader};
use khef::workflow::{self, DecryptionWorkflow, EncryptionWorkflow, UpdateWorkflow};

#[derive(Parser)]
#[command(name = "khef")]
#[command(version)]
#[command(about = "Passphrase-based encryption of a single file.", long_about = None)]
struct Cli {
    /// Read passphrase from stdin instead of from terminal
    #[arg(long, global = true)]
    passphrase_stdin: bool,

    /// More log output (repeat for more)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    /// Only log errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    /// Use this config file instead of the default location
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Encrypt a file
    #[command(alias = "e")]
    Encrypt {
        /// File whose contents is to be encrypted
        #[arg(value_name = "SOURCE")]
        source: PathBuf,

        /// Where to write the encrypted file [default: SOURCE.khef]
        #[arg(value_name = "DEST")]
        destination: Option<PathBuf>,

        /// Replace DEST if it already exists
        #[arg(short, long)]
        force: bool,
    },

    /// Decrypt a file
    #[command(alias = "d")]
    Decrypt {
        /// khef file to decrypt
        #[arg(value_name = "SOURCE")]
        source: PathBuf,

        /// Where to write the plaintext [default: SOURCE without .khef]
        #[arg(value_name = "DEST")]
        destination: Option<PathBuf>,

        /// Replace DEST if it already exists
        #[arg(short, long)]
        force: bool,
    },

    /// Update an encrypted file with new content, while validating
    /// that the passphrase is not accidentally changed.
    #[command(alias = "u")]
    Update {
        /// File whose contents is to be encrypted
        #[arg(value_name = "SOURCE")]
        source: PathBuf,

        /// Existing khef file to replace with the encrypted contents
        #[arg(value_name = "CONTAINER")]
        container: PathBuf,
    },

    /// Show primitives, container format and config location
    Info,

    /// Write a default config file
    Init {
        /// Replace an existing config file
        #[arg(short, long)]
        force: bool,
    },
}

fn main() {
    let cli = Cli::parse();

    let config_path = match &cli.config {
        Some(path) => Ok(path.clone()),
        None => config::default_config_path(),
    };
    // init must be able to replace a config that no longer parses.
    let loaded = match (&cli.command, &config_path) {
        (Commands::Init { .. }, _) | (_, Err(_)) => Ok(Config::default()),
        (_, Ok(path)) => Config::load(path),
    };

    let default_level = loaded
        .as_ref()
        .map(|c| c.log.level.clone())
        .unwrap_or_else(|_| "warn".to_string());
    init_logging(cli.verbose, cli.quiet, &default_level);

    let result = loaded.and_then(|config| run(cli, &config, config_path.ok().as_deref()));

    if let Err(e) = result {
        debug!(category = ?e.category, kind = ?e.kind, "command failed");
        let mut msg = e.chain_display();
        if e.kind == Some(ErrorKind::DestinationExists) {
            msg.push_str(" (use --force to replace it)");
        }
        eprintln!("khef: {}", msg);
        process::exit(1);
    }
}

fn run(cli: Cli, config: &Config, config_path: Option<&Path>) -> Result<()> {
    match cli.command {
        Commands::Encrypt {
            source,
            destination,
            force,
        } => {
            let destination = destination.unwrap_or_else(|| {
                workflow::default_encrypt_destination(&source, &config.output.extension)
            });
            let mut boundary = OsBoundary::new(passphrase_reader(cli.passphrase_stdin, true));
            EncryptionWorkflow::new(&mut boundary)
                .write_mode(write_mode(force, config))
                .run(&source, &destination)
        }
        Commands::Decrypt {
            source,
            destination,
            force,
        } => {
            let destination = match destination {
                Some(path) => path,
                None => workflow::default_decrypt_destination(&source, &config.output.extension)?,
            };
            let mut boundary = OsBoundary::new(passphrase_reader(cli.passphrase_stdin, false));
            DecryptionWorkflow::new(&mut boundary)
                .write_mode(write_mode(force, config))
                .run(&source, &destination)
        }
        Commands::Update { source, container } => {
            let mut boundary = OsBoundary::new(passphrase_reader(cli.passphrase_stdin, false));
            UpdateWorkflow::new(&mut boundary).run(&source, &container)
        }
        Commands::Info => {
            print!("{}", info::report(config, config_path));
            Ok(())
        }
        Commands::Init { force } => {
            let path = config_path.ok_or_else(|| {
                KhefError::invariant("config path could not be resolved; pass --config")
            })?;
            Config::default().write(path, force)?;
            println!("{}", path.display());
            Ok(())
        }
    }
}

fn write_mode(force: bool, config: &Config) -> WriteMode {
    if force || config.output.overwrite {
        WriteMode::Replace
    } else {
        WriteMode::CreateNew
    }
}

fn passphrase_reader(use_stdin: bool, confirm: bool) -> Box<dyn PassphraseReader> {
    if use_stdin {
        Box::new(ReaderPassphraseReader::new(Box::new(std::io::stdin())))
    } else if confirm {
        Box::new(TerminalPassphraseReader::with_confirmation())
    } else {
        Box::new(TerminalPassphraseReader::new())
    }
}

/// KHEF_LOG wins, then -q/-v, then the config file.
fn init_logging(verbose: u8, quiet: bool, configured: &str) {
    let level = match (quiet, verbose) {
        (true, _) => "error",
        (false, 0) => configured,
        (false, 1) => "info",
        (false, 2) => "debug",
        (false, _) => "trace",
    };
    let filter = EnvFilter::try_from_env("KHEF_LOG").unwrap_or_else(|_| EnvFilter::new(level));

    // Logs go to stderr; stdout carries command output only.
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
