//! XCVM program tool.
//!
//! # Usage
//! ```text
//! xcvm asm <input> [-o <output>]
//! xcvm inspect <program.bin>
//! ```
//!
//! `asm` assembles a text program into an encoded envelope (defaulting to
//! `<input-stem>.bin` next to the input) and logs the program hash.
//! `inspect` decodes and validates an envelope and prints its disassembly.
//!
//! Decoding limits come from `XCVM_MAX_PROGRAM_LEN` and
//! `XCVM_MAX_SPAWN_DEPTH`; log verbosity from `XCVM_LOG`.

use std::env;
use std::fs;
use std::path::Path;
use std::process;
use xcvm::config::CodecLimits;
use xcvm::utils::log;
use xcvm::xcvm::assembler::{assemble_source, disassemble, render_diagnostic};
use xcvm::xcvm::program::Program;
use xcvm::{error, info};

fn main() {
    log::init_from_env();
    let args: Vec<String> = env::args().collect();

    if args.len() < 2 || args[1] == "--help" || args[1] == "-h" {
        print_usage(&args[0]);
        process::exit(if args.len() < 2 { 1 } else { 0 });
    }

    match args[1].as_str() {
        "asm" => asm(&args),
        "inspect" => inspect(&args),
        other => {
            error!("Unknown command: {}\n", other);
            print_usage(&args[0]);
            process::exit(1);
        }
    }
}

fn asm(args: &[String]) {
    let Some(input_path) = args.get(2) else {
        error!("asm requires an input file");
        process::exit(1);
    };
    let mut output_path: Option<String> = None;

    let mut i = 3;
    while i < args.len() {
        match args[i].as_str() {
            k @ ("--output" | "-o") => {
                i += 1;
                if i >= args.len() {
                    error!("{k} requires an argument");
                    process::exit(1);
                }
                output_path = Some(args[i].clone());
                i += 1;
            }
            other => {
                error!("Unexpected argument: {}\n", other);
                print_usage(&args[0]);
                process::exit(1);
            }
        }
    }

    let source = fs::read_to_string(input_path).unwrap_or_else(|e| {
        error!("Failed to read {}: {}", input_path, e);
        process::exit(1);
    });

    let output_path = output_path.unwrap_or_else(|| {
        let p = Path::new(input_path);
        let stem = p.file_stem().unwrap_or_default().to_string_lossy();
        let parent = p.parent().unwrap_or(Path::new("."));
        parent
            .join(format!("{}.bin", stem))
            .to_string_lossy()
            .into_owned()
    });

    let program = match assemble_source(&source) {
        Ok(p) => p,
        Err(e) => {
            error!("Assembly failed\n{}", render_diagnostic(input_path, &source, &e));
            process::exit(1);
        }
    };

    let bytes = program.to_bytes();
    let limits = CodecLimits::global();
    if bytes.len() > limits.max_program_len {
        error!(
            "Encoded program is {} bytes, above the {} byte limit",
            bytes.len(),
            limits.max_program_len
        );
        process::exit(1);
    }

    if let Err(e) = fs::write(&output_path, bytes.as_slice()) {
        error!("Failed to write output file: {}", e);
        process::exit(1);
    }

    info!(
        "Assembled {} -> {} ({} bytes, {} instructions, hash {})",
        input_path,
        output_path,
        bytes.len(),
        program.instruction_count(),
        program.hash()
    );
}

fn inspect(args: &[String]) {
    let Some(input_path) = args.get(2) else {
        error!("inspect requires an input file");
        process::exit(1);
    };

    let bytes = fs::read(input_path).unwrap_or_else(|e| {
        error!("Failed to read {}: {}", input_path, e);
        process::exit(1);
    });

    let program = Program::from_bytes(&bytes).unwrap_or_else(|e| {
        error!("Invalid program {}: {}", input_path, e);
        process::exit(1);
    });

    info!(
        "{}: {} bytes, depth {}, hash {}",
        input_path,
        bytes.len(),
        program.depth(),
        program.hash()
    );
    print!("{}", disassemble(&program));
}

const USAGE: &str = "\
XCVM Program Tool

USAGE:
    {program} asm <input> [OPTIONS]
    {program} inspect <program.bin>

COMMANDS:
    asm        Assemble a text program into an encoded envelope
    inspect    Decode, validate and disassemble an encoded envelope

OPTIONS:
    -o, --output <file>     Output file path (defaults to <input>.bin)
    -h, --help              Print this help message

ENVIRONMENT:
    XCVM_LOG                Minimum log level (info, warn, error)
    XCVM_MAX_PROGRAM_LEN    Largest accepted envelope in bytes
    XCVM_MAX_SPAWN_DEPTH    Deepest accepted spawn nesting
";

fn usage(program: &str) -> String {
    USAGE.replace("{program}", program)
}

// Written straight to stderr so `XCVM_LOG` cannot hide it.
fn print_usage(program: &str) {
    eprintln!("{}", usage(program));
}
