//! csvbind CLI - Bind CSV files to record models described in JSON
//!
//! # Commands
//!
//! ```bash
//! csvbind check model.json                 # Build the model, report configuration errors
//! csvbind describe model.json              # Show the read and write pipeline of every column
//! csvbind read model.json input.csv        # CSV rows to JSON records
//! csvbind read --fixed model.json input.txt # Fixed-width lines to JSON records
//! csvbind write model.json records.json    # JSON records to CSV rows
//! csvbind kinds                            # List available directive kinds
//! ```

use clap::{Args, Parser, Subcommand};
use csvbind::io::input::{parse_delimiter, read_file_auto};
use csvbind::{
    logs, Configuration, CsvError, DynamicRecord, FixedWidthReader, FixedWidthWriter, Group,
    MessageResolver, ModelDefinition, RecordModel, RecordReader, RecordWriter, RowError, Settings,
};
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "csvbind")]
#[command(about = "Bind CSV rows to typed record models", long_about = None)]
struct Cli {
    #[command(flatten)]
    options: GlobalOptions,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct GlobalOptions {
    /// Settings JSON file (default: CSVBIND_* environment variables)
    #[arg(long, global = true)]
    settings: Option<PathBuf>,

    /// Log each column's pipelines while building
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Active directive group (repeatable)
    #[arg(short, long = "group", global = true)]
    groups: Vec<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Build a model definition and report configuration errors
    Check {
        /// Model definition (JSON)
        definition: PathBuf,
    },

    /// Show the pipelines of every column
    Describe {
        /// Model definition (JSON)
        definition: PathBuf,
    },

    /// Read a CSV file into JSON records
    Read {
        /// Model definition (JSON)
        definition: PathBuf,

        /// Input CSV file
        input: PathBuf,

        /// CSV delimiter (auto-detect if not specified)
        #[arg(short, long)]
        delimiter: Option<String>,

        /// Read fixed-width lines instead of delimited text
        #[arg(long)]
        fixed: bool,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Write JSON records as CSV
    Write {
        /// Model definition (JSON)
        definition: PathBuf,

        /// Input JSON file (array of objects)
        input: PathBuf,

        /// CSV delimiter (default: ',')
        #[arg(short, long)]
        delimiter: Option<String>,

        /// Write fixed-width lines instead of delimited text
        #[arg(long)]
        fixed: bool,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// List available directive kinds
    Kinds,
}

fn main() {
    // Load .env file (if present)
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    logs::set_echo(true);

    let result = match cli.command {
        Commands::Check { definition } => cmd_check(&cli.options, &definition),
        Commands::Describe { definition } => cmd_describe(&cli.options, &definition),
        Commands::Read {
            definition,
            input,
            delimiter,
            fixed,
            output,
        } => cmd_read(
            &cli.options,
            &definition,
            &input,
            delimiter.as_deref(),
            fixed,
            output.as_deref(),
        ),
        Commands::Write {
            definition,
            input,
            delimiter,
            fixed,
            output,
        } => cmd_write(
            &cli.options,
            &definition,
            &input,
            delimiter.as_deref(),
            fixed,
            output.as_deref(),
        ),
        Commands::Kinds => cmd_kinds(),
    };

    if let Err(e) = result {
        eprintln!("❌ Error: {}", e);
        std::process::exit(1);
    }
}

fn configuration(options: &GlobalOptions) -> Result<Configuration, Box<dyn std::error::Error>> {
    let mut settings = match &options.settings {
        Some(path) => Settings::from_json_file(path)?,
        None => Settings::from_env()?,
    };
    settings.verbose |= options.verbose;
    Ok(Configuration::with_settings(settings))
}

fn load_model(
    options: &GlobalOptions,
    path: &Path,
) -> Result<(ModelDefinition, RecordModel<DynamicRecord>), Box<dyn std::error::Error>> {
    eprintln!("📄 Model: {}", path.display());
    let definition = ModelDefinition::from_file(path)?;
    let groups: Vec<Group> = options.groups.iter().map(|g| Group::new(g.clone())).collect();
    let model = definition.build_model(&configuration(options)?, &groups)?;
    Ok((definition, model))
}

fn cmd_check(options: &GlobalOptions, path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let (_, model) = load_model(options, path)?;
    eprintln!("✅ '{}' is valid: {} columns", model.name(), model.columns().len());
    Ok(())
}

fn cmd_describe(options: &GlobalOptions, path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let (_, model) = load_model(options, path)?;
    println!("{} ({} columns)\n", model.name(), model.columns().len());
    for column in model.columns() {
        let meta = column.metadata();
        if column.is_placeholder() {
            println!("[{}] {} (unmapped)", meta.column, meta.label);
            continue;
        }
        let required = if meta.optional { "" } else { ", required" };
        println!(
            "[{}] {} -> {}: {}{}",
            meta.column, meta.label, meta.field, meta.value_type, required
        );
        for line in column.describe() {
            println!("     {}", line);
        }
    }
    Ok(())
}

fn cmd_read(
    options: &GlobalOptions,
    definition: &Path,
    input: &Path,
    delimiter: Option<&str>,
    fixed: bool,
    output: Option<&Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    let (_, model) = load_model(options, definition)?;

    eprintln!("📄 Reading {}: {}", if fixed { "fixed-width" } else { "CSV" }, input.display());
    let text = read_file_auto(input)?;
    eprintln!("   Encoding: {}", text.encoding);

    let (records, failures) = if fixed {
        FixedWidthReader::new(Arc::new(model), text.content.as_bytes())?.read_all()?
    } else {
        let used_delimiter = match delimiter {
            Some(d) => parse_delimiter(d)?,
            None => text.delimiter,
        };
        eprintln!(
            "   Delimiter: '{}'{}",
            format_delimiter(used_delimiter),
            if delimiter.is_none() { " (auto-detected)" } else { "" }
        );
        RecordReader::with_delimiter(
            Arc::new(model),
            text.content.as_bytes(),
            u8::try_from(used_delimiter)?,
        )
        .read_all()?
    };

    let resolver = MessageResolver::standard();
    for failure in failures.iter().take(20) {
        for line in render_row_error(failure, &resolver) {
            eprintln!("   ❌ {}", line);
        }
    }
    eprintln!("\n📊 Results: {} valid, {} invalid", records.len(), failures.len());

    let json: Vec<Value> = records.iter().map(DynamicRecord::to_json).collect();
    write_output(&serde_json::to_string_pretty(&json)?, output)?;

    if !failures.is_empty() {
        std::process::exit(1);
    }
    Ok(())
}

fn cmd_write(
    options: &GlobalOptions,
    definition_path: &Path,
    input: &Path,
    delimiter: Option<&str>,
    fixed: bool,
    output: Option<&Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    let (definition, model) = load_model(options, definition_path)?;

    eprintln!("📄 Writing records from: {}", input.display());
    let content = fs::read_to_string(input)?;
    let values: Vec<Value> = serde_json::from_str(&content)?;
    let records = values
        .iter()
        .map(|v| definition.record_from_json(v))
        .collect::<Result<Vec<_>, _>>()?;

    let resolver = MessageResolver::standard();
    let model = Arc::new(model);
    let (rejected, bytes) = if fixed {
        let mut writer = FixedWidthWriter::new(model, Vec::new())?;
        let rejected = write_records(&records, &resolver, |r| writer.write(r))?;
        (rejected, writer.into_inner()?)
    } else {
        let delimiter = match delimiter {
            Some(d) => parse_delimiter(d)?,
            None => ',',
        };
        let mut writer = RecordWriter::with_delimiter(model, Vec::new(), u8::try_from(delimiter)?);
        let rejected = write_records(&records, &resolver, |r| writer.write(r))?;
        (rejected, writer.into_inner()?)
    };

    eprintln!("\n📊 Results: {} written, {} rejected", records.len() - rejected, rejected);
    write_output(&String::from_utf8(bytes)?, output)?;

    if rejected > 0 {
        std::process::exit(1);
    }
    Ok(())
}

fn cmd_kinds() -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", Configuration::standard().catalog.describe());
    Ok(())
}

/// Write each record, reporting rejected rows; returns the rejected count.
fn write_records(
    records: &[DynamicRecord],
    resolver: &MessageResolver,
    mut write: impl FnMut(&DynamicRecord) -> Result<(), CsvError>,
) -> Result<usize, CsvError> {
    let mut rejected = 0;
    for record in records {
        match write(record) {
            Ok(()) => {}
            Err(CsvError::Row(failure)) => {
                rejected += 1;
                for line in render_row_error(&failure, resolver) {
                    eprintln!("   ❌ {}", line);
                }
            }
            Err(e) => return Err(e),
        }
    }
    Ok(rejected)
}

fn render_row_error(error: &RowError, resolver: &MessageResolver) -> Vec<String> {
    match error {
        RowError::Invalid(errors) => errors.render(resolver),
        other => vec![other.to_string()],
    }
}

fn format_delimiter(d: char) -> String {
    match d {
        '\t' => "\\t".to_string(),
        c => c.to_string(),
    }
}

fn write_output(content: &str, path: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    match path {
        Some(p) => {
            fs::write(p, content)?;
            eprintln!("💾 Output written to: {}", p.display());
        }
        None => {
            println!("{}", content);
        }
    }
    Ok(())
}
