//! Command-line front end for the assembler.
//!
//! ```text
//! lc3asm [OPTIONS] <INPUT> <OUTPUT>
//! ```

use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::Context;
use clap::{ArgAction, Parser};
use slog::{o, Drain, Level, LevelFilter, Logger};
use slog_term::{FullFormat, TermDecorator};

use lc3_asm::asm::assemble_with_logger;
use lc3_asm::asm::encoding::{BinaryFormat, ObjFileFormat, TextFormat};
use lc3_asm::err::Diagnostics;

#[derive(Parser, Debug)]
#[command(
    name = "lc3asm",
    version,
    about = "Assembles LC-3 source into an object image"
)]
struct Cli {
    /// Assembly source (a `.asm` file, or `-` for stdin).
    #[arg(value_parser = parse_input)]
    input: PathBuf,
    /// Where to write the object image.
    output: PathBuf,
    /// Write the image as hex text, one word per line, instead of binary.
    #[arg(long)]
    text: bool,
    /// Log more detail about each stage (repeat for more).
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

fn parse_input(s: &str) -> Result<PathBuf, String> {
    match s == "-" || s.ends_with(".asm") {
        true  => Ok(PathBuf::from(s)),
        false => Err(format!("expected a path ending in .asm or `-`, got `{s}`")),
    }
}

fn logger(verbose: u8) -> Logger {
    let level = match verbose {
        0 => Level::Warning,
        1 => Level::Info,
        2 => Level::Debug,
        _ => Level::Trace,
    };

    let decorator = TermDecorator::new().stderr().build();
    let drain = FullFormat::new(decorator).build().fuse();
    let drain = LevelFilter::new(drain, level).fuse();
    let drain = slog_async::Async::new(drain).build().fuse();
    Logger::root(drain, o!())
}

/// Reads the source as bytes, mapping each byte to the char with the same value (Latin-1),
/// so every byte of the file becomes exactly one character.
fn read_source(input: &Path) -> anyhow::Result<String> {
    let bytes = if input.as_os_str() == "-" {
        let mut buf = vec![];
        std::io::stdin().read_to_end(&mut buf).context("could not read stdin")?;
        buf
    } else {
        std::fs::read(input)
            .with_context(|| format!("could not read {}", input.display()))?
    };

    Ok(decode_latin1(&bytes))
}

fn decode_latin1(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| char::from(b)).collect()
}

/// Returns whether assembly succeeded.
fn run(cli: &Cli, logger: Logger) -> anyhow::Result<bool> {
    let src = read_source(&cli.input)?;

    let mut diag = Diagnostics::new();
    let result = assemble_with_logger(&src, &mut diag, logger);
    if !diag.is_empty() {
        eprint!("{diag}");
    }

    let image = match result {
        Ok(image) => image,
        Err(e) => {
            eprintln!("{e}: {} error(s), {} warning(s)", diag.error_count(), diag.warning_count());
            return Ok(false);
        }
    };

    let bytes = match cli.text {
        true  => TextFormat::serialize(&image).into_bytes(),
        false => BinaryFormat::serialize(&image),
    };
    std::fs::write(&cli.output, bytes)
        .with_context(|| format!("could not write {}", cli.output.display()))?;

    eprintln!("assembled {} word(s) with {} warning(s)", image.len(), diag.warning_count());
    Ok(true)
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let logger = logger(cli.verbose);

    match run(&cli, logger) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::FAILURE
        }
    }
}
