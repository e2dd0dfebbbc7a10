//! Test Sheet - command-line front end for JSON spreadsheets

mod config;

use anyhow::{Context, bail};
use std::env;
use std::path::PathBuf;

use testsheet_core::{CellPatch, CellRef, FileStore, RecalcMode, Sheet};
use testsheet_engine::engine::evaluate;

fn print_usage() {
    eprintln!("Usage: testsheet [OPTIONS] [FILE]");
    eprintln!();
    eprintln!("Arguments:");
    eprintln!("  [FILE]                    Sheet document to open (.json)");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  -c, --command <FORMULA>   Evaluate a formula against the sheet and print it");
    eprintln!("  -s, --set <CELL=INPUT>    Enter input into a cell (can be repeated)");
    eprintln!("  -o, --output <FILE>       Save the sheet to a JSON file");
    eprintln!("  -p, --print               Print every stored cell");
    eprintln!("  --single-pass             Recalculate direct dependents only (legacy)");
    eprintln!("  --config <FILE>           Read settings from this TOML file");
    eprintln!("  -h, --help                Print help");
}

#[derive(Default)]
struct Cli {
    file_path: Option<PathBuf>,
    command: Option<String>,
    sets: Vec<String>,
    output_file: Option<PathBuf>,
    print: bool,
    single_pass: bool,
    config_file: Option<PathBuf>,
}

fn main() {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let mut cli = Cli::default();

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "-h" | "--help" => {
                print_usage();
                return;
            }
            "-c" | "--command" => {
                i += 1;
                if i >= args.len() {
                    eprintln!("Error: --command requires a formula");
                    std::process::exit(1);
                }
                cli.command = Some(args[i].to_string());
            }
            "-s" | "--set" => {
                i += 1;
                if i >= args.len() {
                    eprintln!("Error: --set requires CELL=INPUT");
                    std::process::exit(1);
                }
                cli.sets.push(args[i].to_string());
            }
            "-o" | "--output" => {
                i += 1;
                if i >= args.len() {
                    eprintln!("Error: --output requires a file path");
                    std::process::exit(1);
                }
                cli.output_file = Some(PathBuf::from(&args[i]));
            }
            "--config" => {
                i += 1;
                if i >= args.len() {
                    eprintln!("Error: --config requires a file path");
                    std::process::exit(1);
                }
                cli.config_file = Some(PathBuf::from(&args[i]));
            }
            "-p" | "--print" => cli.print = true,
            "--single-pass" => cli.single_pass = true,
            arg if arg.starts_with('-') => {
                eprintln!("Error: Unknown option: {}", arg);
                print_usage();
                std::process::exit(1);
            }
            _ => {
                if cli.file_path.is_none() {
                    cli.file_path = Some(PathBuf::from(&args[i]));
                } else {
                    eprintln!("Error: Unexpected argument: {}", args[i]);
                    print_usage();
                    std::process::exit(1);
                }
            }
        }
        i += 1;
    }

    match run(cli) {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            eprintln!("Error: {:#}", e);
            std::process::exit(1);
        }
    }
}

fn run(cli: Cli) -> anyhow::Result<i32> {
    let (mut options, warnings) = config::load_settings(cli.config_file.as_ref());
    for warning in warnings {
        eprintln!("Warning: {}", warning);
    }
    if cli.single_pass {
        options.recalc_mode = RecalcMode::SinglePass;
    }

    let mut sheet = match &cli.file_path {
        Some(path) if path.exists() => {
            let document = FileStore::new(path)
                .load()
                .with_context(|| format!("loading {}", path.display()))?;
            Sheet::from_document(document, options)?
        }
        _ => Sheet::with_options(options),
    };

    if !cli.sets.is_empty() {
        let mut edits = Vec::with_capacity(cli.sets.len());
        for set in &cli.sets {
            let Some((label, input)) = set.split_once('=') else {
                bail!("--set expects CELL=INPUT, got '{}'", set);
            };
            let cell_ref = CellRef::parse(label.trim())?;
            edits.push((cell_ref, CellPatch::from_input(input)));
        }
        sheet.update_many(edits);
    }

    for cell_ref in sheet.invalid_cells() {
        eprintln!("Warning: {} fails its validation rule", cell_ref);
    }

    let mut exit_code = 0;
    if let Some(command) = &cli.command {
        let formula = if command.starts_with('=') {
            command.clone()
        } else {
            format!("={}", command)
        };
        let result = evaluate(&formula, &sheet.grid);
        if result.is_error() {
            exit_code = 1;
        }
        println!("{}", result);
    }

    if let Some(output_path) = &cli.output_file {
        let mut store = FileStore::new(output_path);
        sheet
            .save(&mut store)
            .with_context(|| format!("saving {}", output_path.display()))?;
        println!("Saved to {}", output_path.display());
    }

    let nothing_else = cli.command.is_none() && cli.output_file.is_none();
    if cli.print || nothing_else {
        print_cells(&sheet);
    }

    Ok(exit_code)
}

/// One line per stored cell: label, displayed value and formula if any.
fn print_cells(sheet: &Sheet) {
    for (cell_ref, cell) in sheet.snapshot() {
        let shown = sheet.display(&cell_ref);
        match &cell.formula {
            Some(formula) => println!("{}\t{}\t{}", cell_ref, shown, formula),
            None => println!("{}\t{}", cell_ref, shown),
        }
    }
}
