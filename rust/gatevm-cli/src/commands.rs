//! Subcommand implementations. Each `cmd_*` returns the process exit status.

use crate::colors::Palette;
use crate::config::{GatevmConfig, CONFIG_FILE};
use gatevm_core::disasm::{listing_json, render_listing};
use gatevm_core::mask::seal_payload;
use gatevm_vm::program::{self, read_capped, LoadError};
use gatevm_vm::vm::{DebugEvent, Machine};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::debug;

#[derive(Debug, Clone, Default)]
pub struct RunSettings {
    pub max_steps: Option<u64>,
    pub trace: bool,
    pub color: bool,
}

impl RunSettings {
    /// Command-line values override the config file.
    pub fn resolve(config: &GatevmConfig, max_steps: Option<u64>, trace: bool, no_color: bool) -> Self {
        Self {
            max_steps: max_steps.or(config.vm.max_steps),
            trace: trace || config.vm.trace,
            color: config.output.color && !no_color,
        }
    }
}

/// The single line a run prints (raw bytes, no newline), plus its exit status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Report {
    pub line: Vec<u8>,
    pub exit_code: i32,
}

pub fn execute_program(code: &[u8], settings: &RunSettings) -> Report {
    let mut vm = Machine::new();
    if let Some(limit) = settings.max_steps {
        vm = vm.with_step_limit(limit);
    }
    if settings.trace {
        let palette = Palette::new(settings.color);
        vm.set_debug_callback(move |event| match event {
            DebugEvent::Step { ip, instruction } => {
                eprintln!("{} {:04x}: {}", palette.gray("trace"), ip, instruction)
            }
            DebugEvent::Unlock { key } => {
                eprintln!("{} latch opened (key 0x{:02x})", palette.cyan("trace"), key)
            }
            DebugEvent::Halt { unlocked } => {
                eprintln!("{} halt (unlocked: {})", palette.gray("trace"), unlocked)
            }
        });
    }

    match vm.execute(code) {
        Ok(outcome) => {
            debug!(steps = vm.steps(), %outcome, "run finished");
            Report {
                line: outcome.report_bytes(),
                exit_code: outcome.exit_code(),
            }
        }
        Err(e) => {
            debug!(ip = vm.ip(), error = ?e, "run aborted");
            Report {
                line: e.to_string().into_bytes(),
                exit_code: e.exit_code(),
            }
        }
    }
}

/// Acquire the program (file first, then `packed`) and run it.
pub fn acquire_and_run(
    file: Option<&Path>,
    packed: &[u8],
    settings: &RunSettings,
) -> Result<Report, LoadError> {
    let program = program::load(file, packed)?;
    debug!(len = program.len(), source = ?program.source(), "program acquired");
    Ok(execute_program(program.as_bytes(), settings))
}

pub fn cmd_run(file: Option<&Path>, packed: &[u8], settings: &RunSettings) -> i32 {
    let report = match acquire_and_run(file, packed, settings) {
        Ok(r) => r,
        Err(e) => {
            eprintln!("{}", e);
            return 1;
        }
    };
    if let Err(e) = write_line(&mut std::io::stdout().lock(), &report.line) {
        eprintln!("error: writing result: {}", e);
        return 1;
    }
    report.exit_code
}

/// Write `line` verbatim followed by a newline.
pub fn write_line(out: &mut impl Write, line: &[u8]) -> std::io::Result<()> {
    out.write_all(line)?;
    out.write_all(b"\n")?;
    out.flush()
}

pub fn disasm_text(code: &[u8], json: bool) -> serde_json::Result<String> {
    if json {
        listing_json(code)
    } else {
        Ok(render_listing(code))
    }
}

pub fn cmd_disasm(file: &Path, json: bool, palette: Palette) -> i32 {
    let code = match read_capped(file) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("{} cannot read file '{}': {}", palette.red("error:"), file.display(), e);
            return 1;
        }
    };
    match disasm_text(&code, json) {
        Ok(text) => {
            println!("{}", text);
            0
        }
        Err(e) => {
            eprintln!("{} {}", palette.red("error:"), e);
            1
        }
    }
}

pub fn seal_text(text: &str, reg0: u8, reg1: u8, selector: u8) -> String {
    let sealed = seal_payload(text.as_bytes(), reg0, reg1, selector);
    format!("// Derived key: 0x{:02x}\n{}", sealed.key, sealed.byte_list())
}

pub fn cmd_seal(text: &str, reg0: u8, reg1: u8, selector: u8, palette: Palette) -> i32 {
    eprintln!("{} {} bytes", palette.status_label("Sealing"), text.len());
    println!("{}", seal_text(text, reg0, reg1, selector));
    0
}

pub fn cmd_init(palette: Palette) -> i32 {
    let path = PathBuf::from(CONFIG_FILE);
    if path.exists() {
        eprintln!(
            "{} {} already exists; not overwriting",
            palette.red("error:"),
            CONFIG_FILE
        );
        return 1;
    }
    match std::fs::write(&path, GatevmConfig::default_template()) {
        Ok(()) => {
            println!("{} {}", palette.green("created"), path.display());
            0
        }
        Err(e) => {
            eprintln!("{} writing {}: {}", palette.red("error:"), CONFIG_FILE, e);
            1
        }
    }
}

/// Parse a byte written as decimal or `0x`-prefixed hex.
pub fn parse_byte(s: &str) -> Result<u8, String> {
    let parsed = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => u8::from_str_radix(hex, 16),
        None => s.parse::<u8>(),
    };
    parsed.map_err(|e| format!("invalid byte '{}': {}", s, e))
}
