//! verrou-signer CLI - drive the signing core without hardware.
//!
//! Reads hex-encoded APDUs from stdin, one per line, and prints the
//! hex-encoded reply followed by the status word. Confirmation prompts are
//! shown on stderr and answered interactively, or approved automatically
//! with `--auto-approve`.

use clap::{Parser, ValueEnum};
use directories::ProjectDirs;
use std::io::{self, Write};
use std::path::PathBuf;
use verrou_signer::test_utils::SoftVault;
use verrou_signer::{AppMode, CommandHandler, ConfirmationRequest, Reply, status};
use verrou_storage::FileStore;

#[derive(Parser)]
#[command(name = "verrou-signer")]
#[command(about = "Tezos transaction-signing core, driven over stdin", long_about = None)]
#[command(version)]
struct Cli {
    /// Operating mode
    #[arg(short, long, value_enum, default_value = "wallet")]
    mode: Mode,

    /// Path of the persisted baking record
    #[arg(short = 'd', long = "record-file")]
    record_file: Option<PathBuf>,

    /// Approve every confirmation prompt without asking
    #[arg(short = 'y', long)]
    auto_approve: bool,
}

#[derive(Clone, Copy, ValueEnum)]
enum Mode {
    /// Validator signing (no prompts for authorized baking)
    Baking,
    /// General wallet (every operation is confirmed)
    Wallet,
}

impl From<Mode> for AppMode {
    fn from(mode: Mode) -> Self {
        match mode {
            Mode::Baking => Self::Baking,
            Mode::Wallet => Self::Wallet,
        }
    }
}

fn default_record_file() -> Result<PathBuf, String> {
    let dirs = ProjectDirs::from("", "", "verrou")
        .ok_or_else(|| "Cannot determine a data directory".to_string())?;
    Ok(dirs.data_dir().join("baking_record"))
}

fn show_prompt(request: &ConfirmationRequest) {
    eprintln!("== {}", request.title);
    for field in &request.fields {
        eprintln!("   {}: {}", field.label, field.value);
    }
}

fn ask_decision(auto_approve: bool) -> io::Result<bool> {
    if auto_approve {
        eprintln!("   (auto-approved)");
        return Ok(true);
    }
    eprint!("   Approve? [y/N] ");
    io::stderr().flush()?;
    let mut answer = String::new();
    io::stdin().read_line(&mut answer)?;
    Ok(matches!(answer.trim(), "y" | "Y" | "yes"))
}

fn print_reply(payload: &[u8], status_word: u16) {
    let mut out = hex::encode(payload);
    out.push_str(&hex::encode(status_word.to_be_bytes()));
    println!("{out}");
}

fn run(cli: &Cli) -> Result<(), String> {
    let record_file = match &cli.record_file {
        Some(path) => path.clone(),
        None => default_record_file()?,
    };
    let store =
        FileStore::new(&record_file).map_err(|e| format!("Cannot open record store: {e}"))?;
    let mut handler = CommandHandler::new(cli.mode.into(), SoftVault::new(), store)
        .map_err(|e| format!("Cannot initialize handler: {e}"))?;

    log::info!(
        "verrou-signer {} ready, record file {}",
        verrou_signer::VERSION,
        record_file.display()
    );

    let stdin = io::stdin();
    let mut buffer = String::new();
    loop {
        buffer.clear();
        let read = stdin
            .read_line(&mut buffer)
            .map_err(|e| format!("stdin read failed: {e}"))?;
        if read == 0 {
            break;
        }
        let line = buffer.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let Ok(raw) = hex::decode(line) else {
            eprintln!("!! not valid hex: {line}");
            continue;
        };

        match handler.handle(&raw) {
            Ok(Reply::Ack(payload)) => print_reply(&payload, status::OK),
            Ok(Reply::Pending(request)) => {
                show_prompt(&request);
                let accepted =
                    ask_decision(cli.auto_approve).map_err(|e| format!("prompt failed: {e}"))?;
                match handler.resolve(accepted) {
                    Ok(payload) => print_reply(&payload, status::OK),
                    Err(e) => print_reply(&[], e.status_word()),
                }
            }
            Err(e) => {
                log::debug!("Command failed: {e}");
                print_reply(&[], e.status_word());
            }
        }
    }

    Ok(())
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();

    if let Err(e) = run(&cli) {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
