//! Validate bus-matrix row dumps.
//!
//! Usage:
//!   validate_matrix [OPTIONS] [TABLE.json ...]
//!   validate_matrix < table.json
//!
//! The input is the JSON table the ingestion layer produces: an object with
//! "columns" (header strings) and "rows" (arrays of string/number/null
//! cells). Findings are printed one per line as
//! `subject: severity: detail [category]`.
//!
//! Options:
//!   --protocol, -p <can|canfd|lin>   protocol variant (default: can)
//!   --category, -c <name>            run a single category
//!                                    (literal|naming|range|layout|consistency)
//!   --json, -j                       emit the report as JSON
//!
//! Exit code 1 if any error-level findings (or a fatal schema defect).

use anyhow::Context;
use busmatrix::row::build_matrix;
use busmatrix::{Category, ProtocolVariant, Report, Table, Validator};
use std::io::{self, Read};

fn print_report(source: &str, report: &Report, json: bool) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(report)?);
        return Ok(());
    }
    for finding in report.findings() {
        println!("{}: {}", source, finding);
    }
    Ok(())
}

fn run_one(
    source: &str,
    text: &str,
    protocol: ProtocolVariant,
    category: Option<Category>,
    json: bool,
) -> anyhow::Result<bool> {
    let table: Table = serde_json::from_str(text)
        .with_context(|| format!("{}: not a JSON row table", source))?;

    let (matrix, build_report) =
        build_matrix(protocol, &table).with_context(|| format!("{}: schema defect", source))?;

    let validator = Validator::new(&matrix);
    let report = match category {
        Some(c) => {
            let mut r = Report::new();
            r.extend(
                build_report
                    .findings()
                    .iter()
                    .filter(|f| f.category == c)
                    .cloned(),
            );
            r.merge(validator.run(c));
            r
        }
        None => {
            let mut r = build_report;
            r.merge(validator.run_all());
            r
        }
    };

    print_report(source, &report, json)?;

    let errors = report.errors().count();
    let warnings = report.warnings().count();
    if errors > 0 || warnings > 0 {
        eprintln!(
            "{}: {} message(s), {} error(s), {} warning(s)",
            source,
            matrix.messages.len(),
            errors,
            warnings
        );
    }
    Ok(report.is_valid())
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let mut args: Vec<String> = std::env::args().skip(1).collect();

    let json = if let Some(pos) = args.iter().position(|a| a == "--json" || a == "-j") {
        args.remove(pos);
        true
    } else {
        false
    };

    let mut protocol = ProtocolVariant::Can;
    if let Some(pos) = args.iter().position(|a| a == "--protocol" || a == "-p") {
        args.remove(pos);
        if pos >= args.len() {
            anyhow::bail!("--protocol needs a value: can, canfd or lin");
        }
        let value = args.remove(pos);
        protocol = ProtocolVariant::parse(&value)
            .with_context(|| format!("unknown protocol {:?}", value))?;
    }

    let mut category = None;
    if let Some(pos) = args.iter().position(|a| a == "--category" || a == "-c") {
        args.remove(pos);
        if pos >= args.len() {
            anyhow::bail!("--category needs a value");
        }
        let value = args.remove(pos);
        category = Some(
            Category::from_id(&value)
                .with_context(|| format!("unknown category {:?}", value))?,
        );
    }

    let mut all_valid = true;

    if args.is_empty() {
        let mut text = String::new();
        io::stdin().read_to_string(&mut text)?;
        all_valid &= run_one("<stdin>", &text, protocol, category, json)?;
    } else {
        for path in &args {
            let text = match std::fs::read_to_string(path) {
                Ok(t) => t,
                Err(e) => {
                    eprintln!("{}: {}", path, e);
                    all_valid = false;
                    continue;
                }
            };
            match run_one(path, &text, protocol, category, json) {
                Ok(valid) => all_valid &= valid,
                Err(e) => {
                    eprintln!("{:#}", e);
                    all_valid = false;
                }
            }
        }
    }

    if !all_valid {
        std::process::exit(1);
    }
    Ok(())
}
