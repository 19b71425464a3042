//! gatevm CLI: run, inspect and seal gatevm bytecode.

use clap::{Parser, Subcommand};
use gatevm_cli::colors::Palette;
use gatevm_cli::commands::{self, parse_byte, RunSettings};
use gatevm_cli::config::GatevmConfig;
use gatevm_core::mask::{UNLOCK_REG0, UNLOCK_SELECTOR};
use gatevm_vm::program::PACKED_FALLBACK;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(name = "gatevm", version, about = "Tiny bytecode VM with a latched secret")]
struct Cli {
    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Disable ANSI colors
    #[arg(long, global = true)]
    no_color: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Execute a bytecode file (or the embedded program when omitted)
    Run {
        /// Path to the bytecode file
        file: Option<PathBuf>,

        /// Abort after this many instructions
        #[arg(long)]
        max_steps: Option<u64>,

        /// Print every executed instruction to stderr
        #[arg(long)]
        trace: bool,
    },
    /// Disassemble a bytecode file
    Disasm {
        file: PathBuf,

        /// Emit JSON instead of a text listing
        #[arg(long)]
        json: bool,
    },
    /// Mask a plaintext so the unlock CALL reveals it
    Seal {
        text: String,
        #[arg(long, default_value_t = UNLOCK_REG0, value_parser = parse_byte)]
        r0: u8,
        #[arg(long, default_value_t = 0, value_parser = parse_byte)]
        r1: u8,
        #[arg(long, default_value_t = UNLOCK_SELECTOR, value_parser = parse_byte)]
        selector: u8,
    },
    /// Create a gatevm.toml in the current directory
    Init,
}

fn init_logging(verbose: u8) {
    let fallback = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| fallback.into()))
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false),
        )
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = GatevmConfig::load();
    let palette = Palette::new(config.output.color && !cli.no_color);

    let code = match cli.command {
        Commands::Run {
            file,
            max_steps,
            trace,
        } => {
            let settings = RunSettings::resolve(&config, max_steps, trace, cli.no_color);
            commands::cmd_run(file.as_deref(), PACKED_FALLBACK, &settings)
        }
        Commands::Disasm { file, json } => commands::cmd_disasm(&file, json, palette),
        Commands::Seal {
            text,
            r0,
            r1,
            selector,
        } => commands::cmd_seal(&text, r0, r1, selector, palette),
        Commands::Init => commands::cmd_init(palette),
    };
    std::process::exit(code);
}
