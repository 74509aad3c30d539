//! CellSheet - Command-line Spreadsheet
//!
//! A line-oriented spreadsheet with formula evaluation, dependency tracking,
//! and file persistence. Cells are edited with typed commands; every edit
//! recomputes the cells that depend on it.

use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use clap::Parser;
use log::{Level, LevelFilter, Log, Metadata, Record};

use cellsheet::application::Workbook;
use cellsheet::domain::SheetConfig;
use cellsheet::infrastructure::ConfigRepository;
use cellsheet::presentation::{render_status, Command, InputHandler};

#[derive(Parser)]
#[command(name = "cellsheet")]
#[command(author, version, about = "Spreadsheet with formula evaluation and change propagation")]
struct Cli {
    /// Sheet file (JSON) to open on start
    file: Option<String>,

    /// Configuration file (JSON) with grid size and boolean labels
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Log evaluation details to stderr
    #[arg(short, long)]
    verbose: bool,
}

/// Writes log records to stderr as `level: message`.
struct StderrLogger;

impl Log for StderrLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            let level = match record.level() {
                Level::Error => "error",
                Level::Warn => "warn",
                Level::Info => "info",
                Level::Debug => "debug",
                Level::Trace => "trace",
            };
            eprintln!("{}: {}", level, record.args());
        }
    }

    fn flush(&self) {}
}

static LOGGER: StderrLogger = StderrLogger;

/// Installs the stderr logger at warn level, or debug when `verbose`.
///
/// # Errors
///
/// Returns an error if a logger is already installed.
fn init_logger(verbose: bool) -> Result<(), Box<dyn std::error::Error>> {
    log::set_logger(&LOGGER).map_err(|e| e.to_string())?;
    log::set_max_level(if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Warn
    });
    Ok(())
}

/// Entry point for the CellSheet front-end.
///
/// Reads commands from stdin until `quit` or end of input.
///
/// # Errors
///
/// Returns an error if the configuration file cannot be read or if
/// reading from stdin or writing to stdout fails.
fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    init_logger(cli.verbose)?;

    let config = match &cli.config {
        Some(path) => ConfigRepository::load_config(path)?,
        None => SheetConfig::default(),
    };

    let mut workbook = Workbook::new(config);
    if let Some(filename) = cli.file {
        let output = InputHandler::handle_command(&mut workbook, Command::Open { filename });
        println!("{}", output);
    }

    run_repl(&mut workbook)
}

/// Main read-eval-print loop.
///
/// Each line is parsed into a [`Command`] and its output printed.
/// Parse failures are reported and the loop continues.
fn run_repl(workbook: &mut Workbook) -> Result<(), Box<dyn std::error::Error>> {
    let stdin = io::stdin();
    let mut stdout = io::stdout();
    println!("{}", render_status(workbook));

    let mut lines = stdin.lock().lines();
    loop {
        write!(stdout, "> ")?;
        stdout.flush()?;

        let Some(line) = lines.next() else {
            break;
        };
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }

        match Command::parse(&line) {
            Ok(Command::Quit) => {
                let output = InputHandler::handle_command(workbook, Command::Quit);
                if !output.is_empty() {
                    println!("{}", output);
                }
                break;
            }
            Ok(command) => {
                workbook.status_message = None;
                let output = InputHandler::handle_command(workbook, command);
                if !output.is_empty() {
                    println!("{}", output);
                }
            }
            Err(message) => println!("error: {}", message),
        }
    }

    Ok(())
}
