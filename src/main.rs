//! LS-8 Emulator - CLI Entry Point
//!
//! `ls8-emu <program>` loads a `.ls8` (or `.asm`) file at address 0 and runs
//! it until HLT. Only PRN output goes to stdout; diagnostics go to stderr.
//!
//! Exit codes:
//! - 0: halted normally
//! - 1: usage error
//! - 2: program file unreadable
//! - 3: malformed program, assembly error or bad config
//! - 4: execution error
//! - 5: cycle limit reached before HLT

use std::io::{self, IsTerminal, Write};
use std::path::{Path, PathBuf};
use std::process;

use clap::error::ErrorKind;
use clap::{ArgAction, Parser};
use tracing::Level;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::prelude::*;

use ls8::{Cpu, LoadError, MachineConfig, Program};

mod exit {
    pub const SUCCESS: i32 = 0;
    pub const USAGE: i32 = 1;
    pub const UNREADABLE: i32 = 2;
    pub const BAD_PROGRAM: i32 = 3;
    pub const EXECUTION: i32 = 4;
    pub const CYCLE_LIMIT: i32 = 5;
}

#[derive(Parser)]
#[command(name = "ls8-emu")]
#[command(version)]
#[command(about = "An emulator for the LS-8 8-bit computer")]
struct Cli {
    /// Path to the program (.ls8 binary text, or .asm source)
    program: PathBuf,

    /// Log every instruction before it executes
    #[arg(short, long)]
    trace: bool,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,

    /// Stop after this many instructions
    #[arg(short, long)]
    max_cycles: Option<u64>,

    /// Machine config file (JSON)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Print a disassembly listing instead of running
    #[arg(long)]
    disasm: bool,

    /// Write the program in .ls8 form to OUT instead of running
    #[arg(long, value_name = "OUT")]
    assemble_to: Option<PathBuf>,

    /// Print the final machine state as JSON to stderr
    #[arg(long)]
    dump_state: bool,

    /// Open the interactive debugger
    #[arg(short, long)]
    debug: bool,
}

fn main() {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => match e.kind() {
            ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => e.exit(),
            _ => {
                let _ = e.print();
                process::exit(exit::USAGE);
            }
        },
    };

    let config = cli
        .config
        .as_deref()
        .map(MachineConfig::from_json_file)
        .transpose();

    let trace = cli.trace || matches!(&config, Ok(Some(c)) if c.trace);
    init_logging(cli.verbose, trace);

    let mut config = match config {
        Ok(config) => config.unwrap_or_default(),
        Err(e) => {
            eprintln!("❌ Failed to load config: {}", e);
            process::exit(exit::BAD_PROGRAM);
        }
    };
    if let Some(max_cycles) = cli.max_cycles {
        config.max_cycles = Some(max_cycles);
    }
    config.trace = trace;

    process::exit(run(&cli, config));
}

/// Install a stderr subscriber; stdout is reserved for program output.
fn init_logging(verbose: u8, trace: bool) {
    let level = if trace {
        Level::TRACE
    } else {
        match verbose {
            0 => Level::WARN,
            1 => Level::INFO,
            2 => Level::DEBUG,
            _ => Level::TRACE,
        }
    };

    let stderr_format = tracing_subscriber::fmt::layer()
        .with_writer(io::stderr)
        .with_ansi(io::stderr().is_terminal())
        .with_target(false)
        .with_filter(LevelFilter::from_level(level));

    tracing_subscriber::registry().with(stderr_format).init();
}

fn run(cli: &Cli, config: MachineConfig) -> i32 {
    let program = match load(&cli.program) {
        Ok(program) => program,
        Err(code) => return code,
    };
    tracing::info!(path = %cli.program.display(), bytes = program.len(), "program loaded");

    if let Some(out_path) = &cli.assemble_to {
        return match ls8::save_program(out_path, &program) {
            Ok(()) => {
                eprintln!("✓ Saved {} bytes to {}", program.len(), out_path.display());
                exit::SUCCESS
            }
            Err(e) => {
                eprintln!("❌ Failed to save program: {}", e);
                exit::UNREADABLE
            }
        };
    }

    if cli.disasm {
        print!("{}", ls8::disassemble(&program.bytes));
        return exit::SUCCESS;
    }

    if cli.debug {
        return debug_program(program.bytes, config);
    }

    run_program(&program, &config, cli.dump_state)
}

/// Load a program, assembling it first if it is `.asm` source.
fn load(path: &Path) -> Result<Program, i32> {
    let is_asm = path.extension().is_some_and(|ext| ext.eq_ignore_ascii_case("asm"));

    if is_asm {
        let source = std::fs::read_to_string(path).map_err(|e| {
            eprintln!("❌ Couldn't open {}: {}", path.display(), e);
            exit::UNREADABLE
        })?;

        let bytes = ls8::assemble(&source).map_err(|e| {
            eprintln!("❌ Assembly error: {}", e);
            exit::BAD_PROGRAM
        })?;

        if bytes.is_empty() {
            eprintln!("❌ {}", LoadError::Empty);
            return Err(exit::BAD_PROGRAM);
        }
        return Ok(Program::from_bytes(bytes));
    }

    ls8::load_program(path).map_err(|e| match e {
        LoadError::Io(reason) => {
            eprintln!("❌ Couldn't open {}", reason);
            exit::UNREADABLE
        }
        other => {
            eprintln!("❌ Failed to load {}: {}", path.display(), other);
            exit::BAD_PROGRAM
        }
    })
}

fn run_program(program: &Program, config: &MachineConfig, dump_state: bool) -> i32 {
    let mut cpu = Cpu::with_config(config);
    if let Err(e) = cpu.load_program(&program.bytes) {
        eprintln!("❌ Failed to load program: {}", e);
        return exit::BAD_PROGRAM;
    }

    let stdout = io::stdout();
    let mut out = stdout.lock();
    let result = match config.max_cycles {
        Some(max_cycles) => cpu.run_limited(&mut out, max_cycles),
        None => cpu.run(&mut out),
    };
    let _ = out.flush();

    if dump_state {
        match serde_json::to_string_pretty(&cpu.snapshot()) {
            Ok(json) => eprintln!("{}", json),
            Err(e) => tracing::warn!(error = %e, "could not serialize machine state"),
        }
    }

    match result {
        Ok(_) if cpu.is_halted() => exit::SUCCESS,
        Ok(cycles) => {
            eprintln!("⚠️  Reached max cycles limit ({}) at PC={:#04x}", cycles, cpu.pc);
            exit::CYCLE_LIMIT
        }
        Err(e) => {
            eprintln!("❌ CPU error at PC={:#04x}: {}", cpu.pc, e);
            exit::EXECUTION
        }
    }
}

#[cfg(feature = "tui")]
fn debug_program(bytes: Vec<u8>, config: MachineConfig) -> i32 {
    match ls8::run_debugger(bytes, config) {
        Ok(()) => exit::SUCCESS,
        Err(e) => {
            eprintln!("❌ Debugger error: {}", e);
            exit::EXECUTION
        }
    }
}

#[cfg(not(feature = "tui"))]
fn debug_program(_bytes: Vec<u8>, _config: MachineConfig) -> i32 {
    eprintln!("❌ This build has no debugger; rebuild with the `tui` feature");
    exit::USAGE
}
