use std::{fs, process};

use clap::Parser;
use histcop_cli::{App, Command, DumpArgs, VerifyArgs};
use histcop_core::history::State;
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let app = App::parse();
    match &app.command {
        Command::Verify(args) => verify(args),
        Command::Dump(args) => dump(args),
    }
}

fn read_history(path: &std::path::Path) -> Vec<histcop_core::history::Event> {
    let text = fs::read_to_string(path).unwrap_or_else(|e| {
        eprintln!("Failed to read {}: {e}", path.display());
        process::exit(1);
    });
    histcop_parser::parse_history(&text).unwrap_or_else(|e| {
        eprintln!("Failed to parse {}: {e}", path.display());
        process::exit(1);
    })
}

fn verify(args: &VerifyArgs) {
    let history = read_history(&args.history);

    let file = fs::File::open(&args.initial_state).unwrap_or_else(|e| {
        eprintln!("Failed to open {}: {e}", args.initial_state.display());
        process::exit(1);
    });
    let initial_state: State = serde_json::from_reader(file).unwrap_or_else(|e| {
        eprintln!("Failed to parse {}: {e}", args.initial_state.display());
        process::exit(1);
    });

    let checker = args.checker();
    let filename = args.history.display();

    match checker.check(&history, &initial_state) {
        Ok(witness) => {
            if args.json {
                let result = serde_json::json!({
                    "file": filename.to_string(),
                    "ok": true,
                    "witness": witness,
                });
                println!("{}", serde_json::to_string(&result).unwrap());
            } else if args.verbose {
                println!("{filename}: PASS");
                println!("  witness: {witness:?}");
            } else {
                println!("{filename}: PASS");
            }
        }
        Err(e) => {
            if args.json {
                let result = serde_json::json!({
                    "file": filename.to_string(),
                    "ok": false,
                    "error": e,
                });
                println!("{}", serde_json::to_string(&result).unwrap());
            } else if args.verbose {
                println!("{filename}: FAIL");
                println!("  error: {e:?}");
            } else {
                println!("{filename}: FAIL ({e:?})");
            }
            process::exit(1);
        }
    }
}

fn dump(args: &DumpArgs) {
    let history = read_history(&args.history);
    println!("{}", serde_json::to_string_pretty(&history).unwrap());
}
