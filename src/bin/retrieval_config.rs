//! Retrieval configuration command line interface
//!
//! Builds, checks and edits retrieval configuration files without the GUI.
//!
//! # Usage
//!
//! ```bash
//! # Write the default configuration into ./runs/config.yaml
//! retrieval_config default --out runs/
//!
//! # Structural and field-level validation
//! retrieval_config validate runs/config.yaml
//!
//! # Compare against the shipped reference document
//! retrieval_config diff runs/config.yaml
//!
//! # Change one prior
//! retrieval_config set-prior runs/config.yaml "PHYSICAL PARAMETERS" R_pl \
//!     --kind gaussian --params 1.0 0.1 --truth 1.0 --unit Rearth
//!
//! # Line tags
//! retrieval_config line-tag encode CO2 --resolution 200 --uv
//! retrieval_config line-tag decode CO2 CO2_mainHN20airC25_R_200 CO2_UV
//! ```

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::warn;
use tracing_subscriber::EnvFilter;

use retrieval_config::settings::ToolSettings;
use retrieval_config::{
    build_default, build_parameter_spec, encode_species_lines, parse_line_tags, ConfigError,
    ConfigurationDocument, LineAttribute, LineSelection, SectionId, SpeciesEntry,
};

#[derive(Parser)]
#[command(name = "retrieval_config")]
#[command(version)]
#[command(about = "Build, validate and edit retrieval configuration files")]
#[command(long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format: json, text, or pretty (default)
    #[arg(long, short = 'o', global = true, default_value = "pretty", value_enum)]
    format: OutputFormat,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Json,
    Text,
    Pretty,
}

#[derive(Subcommand)]
enum Commands {
    /// Write the default configuration
    Default {
        /// Target file or directory (defaults to RETRIEVAL_CONFIG_DIR)
        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// Load a configuration and decode every section
    Validate {
        file: PathBuf,
    },

    /// List sections that differ between two configurations
    Diff {
        file: PathBuf,

        /// Document to compare against (defaults to the reference document)
        #[arg(long, env = "RETRIEVAL_REFERENCE")]
        against: Option<PathBuf>,
    },

    /// Show the species table of a configuration
    Species {
        file: PathBuf,
    },

    /// Replace the prior of one parameter or species
    SetPrior {
        file: PathBuf,

        /// Section name, e.g. "PHYSICAL PARAMETERS"
        section: String,

        /// Parameter name or species formula
        name: String,

        /// Prior kind: (known), uniform, log-uniform, gaussian, log-gaussian, fourth-uniform
        #[arg(long, default_value = "(known)")]
        kind: String,

        /// The two prior parameters
        #[arg(long, num_args = 2, allow_negative_numbers = true)]
        params: Option<Vec<f64>>,

        #[arg(long, allow_negative_numbers = true)]
        truth: Option<f64>,

        #[arg(long)]
        unit: Option<String>,

        /// Write to this path instead of overwriting the input
        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// Encode or decode line-dataset tags
    LineTag {
        #[command(subcommand)]
        action: LineTagAction,
    },

    /// Check that the temperature section covers the P-T parameterization
    Check {
        file: PathBuf,
    },
}

#[derive(Subcommand)]
enum LineTagAction {
    /// Build the tag list for one species
    Encode {
        formula: String,
        #[arg(long, default_value = "main")]
        isotope: String,
        #[arg(long, default_value = "HN20")]
        database: String,
        #[arg(long, default_value = "air")]
        broadening: String,
        #[arg(long, default_value = "C25")]
        cutoff: String,
        #[arg(long, default_value = "50")]
        resolution: String,
        /// Add the UV cross-section tag
        #[arg(long)]
        uv: bool,
    },

    /// Decode the tag list of one species
    Decode {
        formula: String,
        tags: Vec<String>,
    },
}

// =============================================================================
// MAIN
// =============================================================================

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,retrieval_config=debug".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    // Loads .env before clap reads env-backed flags.
    let settings = ToolSettings::from_env();
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Default { out } => cmd_default(out, &settings, cli.format),
        Commands::Validate { file } => cmd_validate(&file, cli.format),
        Commands::Diff { file, against } => {
            let against = against.unwrap_or_else(|| settings.reference.clone());
            cmd_diff(&file, &against, cli.format)
        }
        Commands::Species { file } => cmd_species(&file, cli.format),
        Commands::SetPrior {
            file,
            section,
            name,
            kind,
            params,
            truth,
            unit,
            out,
        } => {
            let edit = PriorEdit {
                section,
                name,
                kind,
                params,
                truth,
                unit,
            };
            cmd_set_prior(&file, edit, out, cli.format)
        }
        Commands::LineTag { action } => cmd_line_tag(action, cli.format),
        Commands::Check { file } => cmd_check(&file, cli.format),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            if cli.format == OutputFormat::Json {
                let output = serde_json::json!({ "error": format!("{:#}", e) });
                println!("{}", output);
            } else {
                eprintln!("{}: {:#}", "error".red().bold(), e);
            }
            ExitCode::FAILURE
        }
    }
}

// =============================================================================
// COMMAND IMPLEMENTATIONS
// =============================================================================

fn load(path: &Path) -> Result<ConfigurationDocument> {
    ConfigurationDocument::load(path)
        .with_context(|| format!("Failed to load configuration {}", path.display()))
}

fn print_json(value: &serde_json::Value) -> Result<()> {
    println!(
        "{}",
        serde_json::to_string_pretty(value).context("JSON serialization failed")?
    );
    Ok(())
}

fn cmd_default(out: Option<PathBuf>, settings: &ToolSettings, format: OutputFormat) -> Result<()> {
    let doc = build_default().context("Failed to build default configuration")?;
    let target = out.unwrap_or_else(|| settings.config_dir.clone());
    let written = doc
        .save(Some(target.as_path()))
        .with_context(|| format!("Failed to write {}", target.display()))?;

    match format {
        OutputFormat::Json => print_json(&serde_json::json!({ "written": written }))?,
        OutputFormat::Text | OutputFormat::Pretty => {
            println!("{} Wrote {}", "OK".green(), written.display())
        }
    }
    Ok(())
}

/// Decode every typed view, collecting the failures.
fn typed_view_errors(doc: &ConfigurationDocument) -> Vec<ConfigError> {
    let mut errors = Vec::new();
    if let Err(e) = doc.ground_truth() {
        errors.push(e);
    }
    if let Err(e) = doc.run_settings() {
        errors.push(e);
    }
    for id in SectionId::ALL.iter().filter(|id| id.holds_parameters()) {
        if let Err(e) = doc.parameters(*id) {
            errors.push(e);
        }
    }
    if let Err(e) = doc.chemistry() {
        errors.push(e);
    }
    if let Err(e) = doc.clouds() {
        errors.push(e);
    }
    if let Err(e) = doc.user_units() {
        errors.push(e);
    }
    errors
}

fn cmd_validate(file: &Path, format: OutputFormat) -> Result<()> {
    let doc = load(file)?;
    let errors = typed_view_errors(&doc);

    match format {
        OutputFormat::Json => print_json(&serde_json::json!({
            "valid": errors.is_empty(),
            "sections": doc.sections().count(),
            "errors": errors.iter().map(|e| e.to_string()).collect::<Vec<_>>(),
        }))?,
        OutputFormat::Text | OutputFormat::Pretty => {
            if errors.is_empty() {
                println!(
                    "{} {} is valid ({} sections)",
                    "OK".green().bold(),
                    file.display(),
                    doc.sections().count()
                );
            }
            for e in &errors {
                println!("  {} {}", "x".red(), e);
            }
        }
    }

    if !errors.is_empty() {
        bail!("{} section(s) failed to decode", errors.len());
    }
    Ok(())
}

fn cmd_diff(file: &Path, against: &Path, format: OutputFormat) -> Result<()> {
    let doc = load(file)?;
    let other = load(against)?;
    let differing = doc.differing_sections(&other);

    match format {
        OutputFormat::Json => print_json(&serde_json::json!({
            "file": file,
            "against": against,
            "differing_sections": differing,
        }))?,
        OutputFormat::Text | OutputFormat::Pretty => {
            if differing.is_empty() {
                println!("{} No differences", "OK".green());
            }
            for name in &differing {
                println!("  {} {}", "~".yellow(), name);
            }
        }
    }
    Ok(())
}

fn cmd_species(file: &Path, format: OutputFormat) -> Result<()> {
    let doc = load(file)?;
    let chemistry = doc.chemistry()?;
    let rows = chemistry.rows();

    match format {
        OutputFormat::Json => print_json(&serde_json::json!({
            "settings": {
                "resolution": chemistry.settings.resolution,
                "mmw_inert": chemistry.settings.mmw_inert,
            },
            "species": rows,
        }))?,
        OutputFormat::Text => {
            for row in &rows {
                println!(
                    "{}\t{}\t{}\t{}\t{}",
                    row.formula, row.name, row.lines, row.prior, row.truth
                );
            }
        }
        OutputFormat::Pretty => {
            println!(
                "{:<6} {:<18} {:<24} {:<36} {}",
                "Formula".bold(),
                "Name".bold(),
                "Prior".bold(),
                "Lines".bold(),
                "Truth".bold()
            );
            for row in &rows {
                println!(
                    "{:<6} {:<18} {:<24} {:<36} {}",
                    row.formula, row.name, row.prior, row.lines, row.truth
                );
            }
        }
    }
    Ok(())
}

struct PriorEdit {
    section: String,
    name: String,
    kind: String,
    params: Option<Vec<f64>>,
    truth: Option<f64>,
    unit: Option<String>,
}

fn cmd_set_prior(
    file: &Path,
    edit: PriorEdit,
    out: Option<PathBuf>,
    format: OutputFormat,
) -> Result<()> {
    let mut doc = load(file)?;
    let section: SectionId = edit.section.parse()?;

    if section == SectionId::ChemicalComposition {
        // A species keeps its line datasets when its abundance prior changes.
        let mut chemistry = doc.chemistry()?;
        let lines = chemistry
            .get(&edit.name)
            .and_then(|entry| entry.abundance().lines().map(<[String]>::to_vec));
        let spec = build_parameter_spec(
            &edit.kind,
            edit.params.as_deref(),
            edit.truth,
            lines,
            edit.unit,
        )?;
        chemistry.upsert(SpeciesEntry::new(edit.name.clone(), spec)?);
        doc.set_chemistry(&chemistry)?;
    } else {
        let spec = build_parameter_spec(
            &edit.kind,
            edit.params.as_deref(),
            edit.truth,
            None,
            edit.unit,
        )?;
        doc.set_parameter(section, &edit.name, &spec)?;
    }

    let target = out.unwrap_or_else(|| file.to_path_buf());
    let written = doc
        .save(Some(target.as_path()))
        .with_context(|| format!("Failed to write {}", target.display()))?;

    match format {
        OutputFormat::Json => print_json(&serde_json::json!({
            "section": section.as_str(),
            "name": edit.name,
            "written": written,
        }))?,
        OutputFormat::Text | OutputFormat::Pretty => println!(
            "{} Updated {} / {} in {}",
            "OK".green(),
            section,
            edit.name,
            written.display()
        ),
    }
    Ok(())
}

fn cmd_line_tag(action: LineTagAction, format: OutputFormat) -> Result<()> {
    match action {
        LineTagAction::Encode {
            formula,
            isotope,
            database,
            broadening,
            cutoff,
            resolution,
            uv,
        } => {
            let selection = LineSelection::new(isotope, database, broadening, cutoff, resolution)?;
            let tags = encode_species_lines(&formula, Some(&selection), uv)
                .with_context(|| format!("Cannot encode line tags for {}", formula))?;
            match format {
                OutputFormat::Json => print_json(&serde_json::json!({ "lines": tags }))?,
                OutputFormat::Text | OutputFormat::Pretty => {
                    for tag in &tags {
                        println!("{}", tag);
                    }
                }
            }
        }
        LineTagAction::Decode { formula, tags } => {
            let parsed = parse_line_tags(&tags, &formula)?;
            let attributes: Vec<(LineAttribute, &str)> = parsed
                .selection
                .as_ref()
                .map(LineSelection::attributes)
                .unwrap_or_default();
            match format {
                OutputFormat::Json => {
                    let selection: serde_json::Map<String, serde_json::Value> = attributes
                        .iter()
                        .map(|(attr, value)| (attr.name().to_string(), (*value).into()))
                        .collect();
                    print_json(&serde_json::json!({
                        "selection": parsed.selection.as_ref().map(|_| selection),
                        "uv_present": parsed.uv_present,
                    }))?
                }
                OutputFormat::Text | OutputFormat::Pretty => {
                    if parsed.is_no_line() {
                        println!("{} has no line datasets", formula);
                    }
                    for (attr, value) in &attributes {
                        println!("{:<12} {}", attr.name(), value);
                    }
                    println!("{:<12} {}", "UV", parsed.uv_present);
                }
            }
        }
    }
    Ok(())
}

fn cmd_check(file: &Path, format: OutputFormat) -> Result<()> {
    let doc = load(file)?;
    let settings = doc.run_settings()?;
    let temperature = doc.parameters(SectionId::TemperatureParameters)?;

    let mut warnings = Vec::new();
    match settings.pt_parameter_names() {
        Some(required) => {
            for name in temperature.missing(required) {
                warnings.push(format!(
                    "parameterization '{}' needs {} in {}",
                    settings.parameterization,
                    name,
                    SectionId::TemperatureParameters
                ));
            }
        }
        None => warnings.push(format!(
            "unknown P-T parameterization '{}'",
            settings.parameterization
        )),
    }

    for entry in doc.chemistry()?.species() {
        let parsed = entry.line_tags()?;
        if let Some(Err(e)) = parsed.selection.as_ref().map(LineSelection::check_options) {
            warnings.push(format!("{}: {}", entry.formula(), e));
        }
    }

    for w in &warnings {
        warn!("{}", w);
    }

    match format {
        OutputFormat::Json => print_json(&serde_json::json!({ "warnings": warnings }))?,
        OutputFormat::Text | OutputFormat::Pretty => {
            if warnings.is_empty() {
                println!("{} No warnings", "OK".green());
            } else {
                println!("{} {} warning(s)", "!".yellow().bold(), warnings.len());
            }
        }
    }
    Ok(())
}
