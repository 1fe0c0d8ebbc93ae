//! # Loadcomb CLI
//!
//! Command-line front end for combo_core: inspect the coefficient matrix of a
//! combination, evaluate it against load values, run a combination file, or
//! list the ASCE 7-22 presets.
//!
//! # Usage
//!
//! ```bash
//! # Scenario matrix of a combination
//! loadcomb matrix "1.2*D & 1.6*(Lr | S | R) & (L | 0.5*W)"
//!
//! # Evaluate with scalar and array loads
//! loadcomb eval "1.2*D & 1.6*L & 0.5*(Lr | S)" --load D=15 --load L=40 --load S=10,20,30
//!
//! # Evaluate a file, adding the LRFD presets
//! loadcomb run roof.json --method lrfd --format json
//!
//! # List presets
//! loadcomb presets --method asd
//! ```

mod config;

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand, ValueEnum};
use combo_core::errors::{ComboError, ComboResult};
use combo_core::loads::{Combination, DesignMethod, LoadValue, NamedCombination};
use ndarray::{ArrayD, ArrayViewD, Axis};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

use config::{parse_load_arg, values_for, ComboFile};

const DEFAULT_LOG_FILTER: &str = "loadcomb=info,combo_core=info";

#[derive(Parser)]
#[command(name = "loadcomb")]
#[command(version)]
#[command(about = "Parse, expand and evaluate structural load combinations")]
#[command(long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format
    #[arg(long, short = 'o', global = true, default_value = "text", value_enum)]
    format: OutputFormat,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum MethodArg {
    Asd,
    Lrfd,
}

impl From<MethodArg> for DesignMethod {
    fn from(method: MethodArg) -> Self {
        match method {
            MethodArg::Asd => DesignMethod::Asd,
            MethodArg::Lrfd => DesignMethod::Lrfd,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Show identifiers, coefficient matrix and scenario equations
    Matrix {
        /// Combination expression, e.g. "1.2*D & 1.6*L & 0.5*(Lr | S | R)"
        expr: String,
    },

    /// Evaluate a combination for the given loads
    Eval {
        /// Combination expression
        expr: String,

        /// Load value as NAME=VALUE or NAME=V1,V2,... (repeatable)
        #[arg(long = "load", short = 'l', value_parser = parse_load_arg)]
        loads: Vec<(String, LoadValue)>,
    },

    /// Evaluate every combination in a JSON combination file
    Run {
        /// Combination file
        file: PathBuf,

        /// Add the ASCE 7-22 presets for this method (overrides the file)
        #[arg(long, value_enum)]
        method: Option<MethodArg>,

        /// Load value as NAME=VALUE or NAME=V1,V2,... (overrides the file)
        #[arg(long = "load", short = 'l', value_parser = parse_load_arg)]
        loads: Vec<(String, LoadValue)>,
    },

    /// List the ASCE 7-22 preset combinations
    Presets {
        /// Only this design method
        #[arg(long, value_enum)]
        method: Option<MethodArg>,
    },
}

// =============================================================================
// MAIN
// =============================================================================

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing();

    let result = match cli.command {
        Commands::Matrix { expr } => cmd_matrix(&expr, cli.format),
        Commands::Eval { expr, loads } => cmd_eval(&expr, loads, cli.format),
        Commands::Run { file, method, loads } => cmd_run(&file, method.map(Into::into), loads, cli.format),
        Commands::Presets { method } => cmd_presets(method.map(Into::into), cli.format),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::debug!(code = e.error_code(), "command failed");
            match cli.format {
                OutputFormat::Json => match serde_json::to_string_pretty(&e) {
                    Ok(json) => println!("{}", json),
                    Err(_) => println!(r#"{{"error": "{}"}}"#, e.error_code()),
                },
                OutputFormat::Text => eprintln!("error [{}]: {}", e.error_code(), e),
            }
            ExitCode::FAILURE
        }
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

// =============================================================================
// REPORTS
// =============================================================================

#[derive(Debug, Serialize)]
struct ScenarioReport {
    equation: String,
    result: serde_json::Value,
}

#[derive(Debug, Clone, Serialize)]
struct Extreme {
    value: f64,
    combination: String,
    scenario: String,
}

#[derive(Debug, Serialize)]
struct Governing {
    max: Extreme,
    min: Extreme,
}

#[derive(Debug, Serialize)]
struct CombinationReport {
    name: String,
    expr: String,
    identifiers: Vec<String>,
    scenarios: Vec<ScenarioReport>,
    governing: Option<Governing>,
}

impl CombinationReport {
    fn new(name: &str, combo: &Combination, result: &ArrayD<f64>) -> ComboResult<Self> {
        let equations = combo.scenario_equations()?;
        let scenarios = equations
            .iter()
            .zip(result.axis_iter(Axis(0)))
            .map(|(equation, values)| ScenarioReport {
                equation: equation.clone(),
                result: array_to_json(values),
            })
            .collect();

        Ok(CombinationReport {
            name: name.to_string(),
            expr: combo.expr().to_string(),
            identifiers: combo.identifiers().to_vec(),
            scenarios,
            governing: governing(name, &equations, result),
        })
    }

    fn print_text(&self) {
        println!("{}: {}", self.name, self.expr);
        for (i, scenario) in self.scenarios.iter().enumerate() {
            println!("  [{:>2}] {:<36} = {}", i + 1, scenario.equation, scenario.result);
        }
        if let Some(governing) = &self.governing {
            println!("  max = {:.3} ({})", governing.max.value, governing.max.scenario);
            println!("  min = {:.3} ({})", governing.min.value, governing.min.scenario);
        }
    }
}

/// Largest and smallest value over every scenario and array element
fn governing(name: &str, equations: &[String], result: &ArrayD<f64>) -> Option<Governing> {
    let mut max: Option<Extreme> = None;
    let mut min: Option<Extreme> = None;

    for (index, &value) in result.indexed_iter() {
        let candidate = || Extreme {
            value,
            combination: name.to_string(),
            scenario: equations.get(index[0]).cloned().unwrap_or_default(),
        };
        if max.as_ref().map_or(true, |m| value > m.value) {
            max = Some(candidate());
        }
        if min.as_ref().map_or(true, |m| value < m.value) {
            min = Some(candidate());
        }
    }

    Some(Governing { max: max?, min: min? })
}

fn array_to_json(view: ArrayViewD<'_, f64>) -> serde_json::Value {
    if view.ndim() == 0 {
        return view.iter().next().map(|v| serde_json::json!(v)).unwrap_or(serde_json::Value::Null);
    }
    serde_json::Value::Array(view.outer_iter().map(array_to_json).collect())
}

fn print_json<T: Serialize>(value: &T) -> ComboResult<()> {
    let json = serde_json::to_string_pretty(value)
        .map_err(|e| ComboError::config("<stdout>", format!("JSON serialization failed: {}", e)))?;
    println!("{}", json);
    Ok(())
}

fn print_banner(title: &str) {
    println!("═══════════════════════════════════════");
    println!("  {}", title);
    println!("═══════════════════════════════════════");
}

// =============================================================================
// COMMAND IMPLEMENTATIONS
// =============================================================================

fn cmd_matrix(expr: &str, format: OutputFormat) -> ComboResult<()> {
    let combo = Combination::parse(expr)?;
    let matrix = combo.matrix()?;
    let equations = combo.scenario_equations()?;

    match format {
        OutputFormat::Json => print_json(&serde_json::json!({
            "expr": combo.expr(),
            "identifiers": combo.identifiers(),
            "row_counts": combo.row_counts(),
            "matrix": matrix.rows().into_iter().map(|row| row.to_vec()).collect::<Vec<_>>(),
            "equations": equations,
        })),
        OutputFormat::Text => {
            print_banner("LOAD COMBINATION MATRIX");
            println!("Expression: {}", combo.expr());
            println!(
                "Scenarios:  {} ({})",
                matrix.nrows(),
                combo
                    .row_counts()
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join(" x ")
            );
            println!();

            print!("      ");
            for id in combo.identifiers() {
                print!("{:>8}", id);
            }
            println!();
            for (i, (row, equation)) in matrix.rows().into_iter().zip(&equations).enumerate() {
                print!("  [{:>2}]", i + 1);
                for c in row {
                    print!("{:>8.3}", c);
                }
                println!("   {}", equation);
            }
            Ok(())
        }
    }
}

fn cmd_eval(expr: &str, loads: Vec<(String, LoadValue)>, format: OutputFormat) -> ComboResult<()> {
    let named = NamedCombination {
        name: "expr".to_string(),
        combination: Combination::parse(expr)?,
    };
    let loads: HashMap<String, LoadValue> = loads.into_iter().collect();
    let values = values_for(&named, &loads)?;
    let result = named.combination.evaluate(&values)?;

    let report = CombinationReport::new(&named.name, &named.combination, &result)?;

    match format {
        OutputFormat::Json => print_json(&report),
        OutputFormat::Text => {
            print_banner("LOAD COMBINATION RESULTS");
            report.print_text();
            Ok(())
        }
    }
}

fn cmd_run(
    file: &Path,
    method: Option<DesignMethod>,
    overrides: Vec<(String, LoadValue)>,
    format: OutputFormat,
) -> ComboResult<()> {
    let combo_file = ComboFile::load(file)?;
    let combos = combo_file.combinations(method)?;

    let mut loads: HashMap<String, LoadValue> = combo_file
        .loads
        .iter()
        .map(|(name, input)| (name.clone(), LoadValue::from(input.clone())))
        .collect();
    loads.extend(overrides);

    let reports = combos
        .iter()
        .map(|named| {
            let values = values_for(named, &loads)?;
            let result = named.combination.evaluate(&values)?;
            CombinationReport::new(&named.name, &named.combination, &result)
        })
        .collect::<ComboResult<Vec<_>>>()?;

    let overall = reports
        .iter()
        .filter_map(|r| r.governing.as_ref())
        .fold(None, |acc: Option<Governing>, g| match acc {
            None => Some(Governing {
                max: g.max.clone(),
                min: g.min.clone(),
            }),
            Some(mut best) => {
                if g.max.value > best.max.value {
                    best.max = g.max.clone();
                }
                if g.min.value < best.min.value {
                    best.min = g.min.clone();
                }
                Some(best)
            }
        });

    tracing::info!(combinations = reports.len(), "evaluated combination file");

    match format {
        OutputFormat::Json => print_json(&serde_json::json!({
            "file": file.display().to_string(),
            "combinations": reports,
            "governing": overall,
        })),
        OutputFormat::Text => {
            print_banner("LOAD COMBINATION RESULTS");
            println!("File: {}", file.display());
            println!();
            for report in &reports {
                report.print_text();
                println!();
            }
            if let Some(overall) = overall {
                println!("Governing:");
                println!(
                    "  Max = {:.3} [{}: {}]",
                    overall.max.value, overall.max.combination, overall.max.scenario
                );
                println!(
                    "  Min = {:.3} [{}: {}]",
                    overall.min.value, overall.min.combination, overall.min.scenario
                );
            }
            Ok(())
        }
    }
}

fn cmd_presets(method: Option<DesignMethod>, format: OutputFormat) -> ComboResult<()> {
    let methods = match method {
        Some(method) => vec![method],
        None => DesignMethod::ALL.to_vec(),
    };

    let mut listing = Vec::new();
    for method in methods {
        for named in method.combinations()? {
            listing.push(serde_json::json!({
                "method": method,
                "name": named.name,
                "expr": named.combination.expr(),
                "scenarios": named.combination.scenario_count()?,
                "equations": named.combination.scenario_equations()?,
            }));
        }
    }

    match format {
        OutputFormat::Json => print_json(&listing),
        OutputFormat::Text => {
            print_banner("ASCE 7-22 LOAD COMBINATIONS");
            for entry in &listing {
                println!(
                    "{:<8} {:<50} {} scenario(s)",
                    entry["name"].as_str().unwrap_or_default(),
                    entry["expr"].as_str().unwrap_or_default(),
                    entry["scenarios"]
                );
            }
            Ok(())
        }
    }
}
