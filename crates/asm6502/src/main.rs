//! CLI entry point for the `asm6502` binary.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use asm6502::{assemble_with_config, AssemblerConfig, AssemblyOutput};
use clap::{Parser, Subcommand};
use mos6502_isa::{disassemble, DisassemblyOptions};
#[cfg(test)]
use proptest as _;
#[cfg(test)]
use rstest as _;
#[cfg(test)]
use tempfile as _;
use thiserror as _;
use tracing::{debug, Level};

/// MOS 6502 assembler and disassembler.
#[derive(Debug, Parser)]
#[command(name = "asm6502", version, about)]
struct Cli {
    /// Log pass-level detail to stderr.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Assemble a source file into a flat binary image.
    Build(BuildArgs),
    /// Disassemble a raw binary.
    Disasm(DisasmArgs),
}

#[derive(Debug, clap::Args)]
struct BuildArgs {
    /// Assembly source file.
    input: PathBuf,

    /// Output file path (default: input stem + .bin).
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Initial location counter.
    #[arg(long, default_value = "0", value_parser = parse_address)]
    origin: u16,

    /// Byte used for gaps between regions.
    #[arg(long, default_value = "0", value_parser = parse_byte)]
    fill: u8,

    /// Print the address/bytes/source listing to stdout.
    #[arg(long)]
    listing: bool,

    /// Print the symbol table to stdout.
    #[arg(long)]
    symbols: bool,
}

#[derive(Debug, clap::Args)]
struct DisasmArgs {
    /// Raw binary file.
    input: PathBuf,

    /// Address of the first byte.
    #[arg(long, default_value = "0", value_parser = parse_address)]
    start: u16,
}

/// Accepts `$hhhh`, `0xhhhh` or decimal.
fn parse_address(text: &str) -> Result<u16, String> {
    let parsed = if let Some(hex) = text.strip_prefix('$') {
        u16::from_str_radix(hex, 16)
    } else if let Some(hex) = text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        u16::from_str_radix(hex, 16)
    } else {
        text.parse()
    };
    parsed.map_err(|e| format!("invalid address '{text}': {e}"))
}

fn parse_byte(text: &str) -> Result<u8, String> {
    let value = parse_address(text)?;
    u8::try_from(value).map_err(|_| format!("value '{text}' does not fit in a byte"))
}

fn default_output_path(input: &Path) -> PathBuf {
    let stem = input.file_stem().and_then(|s| s.to_str()).unwrap_or("out");
    let parent = input.parent().unwrap_or_else(|| Path::new(""));
    parent.join(format!("{stem}.bin"))
}

fn run_build(args: BuildArgs) -> Result<(), i32> {
    let source = fs::read_to_string(&args.input).map_err(|e| {
        eprintln!("error: failed to read {}: {e}", args.input.display());
        1
    })?;
    debug!(input = %args.input.display(), bytes = source.len(), "read source");

    let config = AssemblerConfig {
        origin: args.origin,
        fill_byte: args.fill,
    };
    let output = assemble_with_config(&source, config);

    if !output.diagnostics.is_empty() {
        let unit = args.input.display().to_string();
        eprintln!("{}", output.diagnostics.format_for_stderr(&unit));
    }

    if args.listing {
        for entry in &output.listing {
            println!("{entry}");
        }
    }
    if args.symbols {
        print_symbols(&output);
    }

    if !output.is_success() {
        eprintln!(
            "error: assembly failed with {} error(s)",
            output.diagnostics.error_count()
        );
        return Err(1);
    }

    let (start, image) = output.image().unwrap_or((0, Vec::new()));
    let output_path = args
        .output
        .unwrap_or_else(|| default_output_path(&args.input));

    if let Err(e) = fs::write(&output_path, &image) {
        eprintln!("error: failed to write output: {e}");
        return Err(1);
    }

    println!(
        "Assembled {} ({} bytes at ${start:04X}) -> {}",
        args.input.display(),
        image.len(),
        output_path.display()
    );
    Ok(())
}

fn print_symbols(output: &AssemblyOutput) {
    for (name, symbol) in output.symbols.by_address() {
        println!("${:04X}  {name}", symbol.address);
    }
}

fn run_disasm(args: &DisasmArgs) -> Result<(), i32> {
    let bytes = fs::read(&args.input).map_err(|e| {
        eprintln!("error: failed to read {}: {e}", args.input.display());
        1
    })?;

    let options = DisassemblyOptions {
        start_address: args.start,
    };
    for row in disassemble(&bytes, options) {
        println!("{row}");
    }
    Ok(())
}

fn main() {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_max_level(if cli.verbose { Level::DEBUG } else { Level::WARN })
        .with_writer(io::stderr)
        .init();

    let result = match cli.command {
        Command::Build(args) => run_build(args),
        Command::Disasm(args) => run_disasm(&args),
    };

    std::process::exit(match result {
        Ok(()) => 0,
        Err(code) => code,
    });
}
