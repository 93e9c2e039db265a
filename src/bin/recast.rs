//! recast: convert datasets between CSV, JSON, XML and SQLite
//!
//! Usage:
//!   # Detect both formats from the extensions
//!   recast convert data.json data.csv
//!
//!   # Every table of a database, one CSV per table
//!   recast convert shop.sqlite export.csv --table '*'
//!
//!   # Flatten without asking
//!   recast convert nested.xml flat.sqlite --yes
//!
//!   # 1000 mock rows from genconfig.json
//!   recast generate 1000 mock.csv
//!
//!   # Tables of a database, column summary of a file
//!   recast tables shop.sqlite
//!   recast profile data.csv

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use recast::convert::{ConversionReport, Outcome};
use recast::{
    generate_to, profile, ConvertConfig, ConvertRequest, Converter, DatasetProfile, FlattenConfig,
    Format, GenConfig, Loaded, PatternGenerator, RelationSelector,
};
use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};

#[derive(Parser, Debug)]
#[command(name = "recast")]
#[command(about = "Convert datasets between CSV, JSON, XML and SQLite", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Convert a file into another format
    #[command(alias = "c")]
    Convert(ConvertArgs),

    /// Generate mock data from patterns
    #[command(alias = "g")]
    Generate(GenerateArgs),

    /// List the tables (relations) of a source
    Tables(TablesArgs),

    /// Summarise the columns of a source
    Profile(ProfileArgs),
}

#[derive(Args, Debug)]
struct ConvertArgs {
    /// Input file
    #[arg(value_name = "SOURCE")]
    source: PathBuf,

    /// Output file; multi-table sources write one file per table next to it
    #[arg(value_name = "DEST")]
    destination: PathBuf,

    /// Input format (detected from the extension if omitted)
    #[arg(long)]
    from: Option<Format>,

    /// Output format (detected from the extension if omitted)
    #[arg(long)]
    to: Option<Format>,

    /// Table to read from a database source, or '*' for every table
    #[arg(long, short = 't')]
    table: Option<RelationSelector>,

    /// Flatten nested data without asking
    #[arg(long, short = 'y')]
    yes: bool,

    /// Separator for flattened key paths (default: "_")
    #[arg(long)]
    separator: Option<String>,
}

#[derive(Args, Debug)]
struct GenerateArgs {
    /// Number of rows to generate
    rows: usize,

    /// Output file
    #[arg(value_name = "OUTPUT")]
    output: PathBuf,

    /// Output format (detected from the extension if omitted)
    #[arg(long)]
    format: Option<Format>,

    /// Header and pattern definitions
    #[arg(long, env = "RECAST_GENCONFIG", default_value = GenConfig::DEFAULT_PATH)]
    config: PathBuf,

    /// Seed for reproducible output
    #[arg(long)]
    seed: Option<u64>,
}

#[derive(Args, Debug)]
struct TablesArgs {
    #[arg(value_name = "SOURCE")]
    source: PathBuf,

    #[arg(long)]
    format: Option<Format>,
}

#[derive(Args, Debug)]
struct ProfileArgs {
    #[arg(value_name = "SOURCE")]
    source: PathBuf,

    #[arg(long)]
    format: Option<Format>,

    /// Table to profile from a database source (default: every table)
    #[arg(long, short = 't')]
    table: Option<RelationSelector>,

    /// Print the profile as JSON
    #[arg(long)]
    json: bool,
}

fn resolve_format(explicit: Option<Format>, path: &Path) -> Result<Format> {
    match explicit {
        Some(format) => Ok(format),
        None => Format::from_path(path).with_context(|| format!("Pass --format for {}", path.display())),
    }
}

fn print_report(report: &ConversionReport) {
    for relation in &report.relations {
        let name = relation.relation.as_deref().unwrap_or("-");
        let flattened = if relation.flattened { " (flattened)" } else { "" };
        eprintln!(
            "  {} -> {}: {} rows{}",
            name,
            relation.destination.display(),
            relation.rows,
            flattened
        );
    }
    match report.throughput() {
        Some(rate) => eprintln!(
            "{} rows in {:.2} ms ({:.0} rows/s)",
            report.rows(),
            report.elapsed_ms(),
            rate
        ),
        None => eprintln!("{} rows in {:.2} ms", report.rows(), report.elapsed_ms()),
    }
}

fn confirm(question: &str) -> Result<bool> {
    eprint!("{} (y/n) ", question);
    std::io::stderr().flush()?;

    let mut answer = String::new();
    std::io::stdin().lock().read_line(&mut answer)?;
    Ok(matches!(answer.trim().to_lowercase().as_str(), "y" | "yes"))
}

fn run_convert(args: ConvertArgs) -> Result<()> {
    let source_format = resolve_format(args.from, &args.source)?;
    let dest_format = resolve_format(args.to, &args.destination)?;

    let mut config = ConvertConfig::default();
    if let Some(separator) = args.separator {
        config.flatten = FlattenConfig { separator };
    }
    let converter = Converter::new(config);

    let mut request = ConvertRequest::with_formats(&args.source, &args.destination, source_format, dest_format)
        .with_force_flatten(args.yes);
    if let Some(table) = args.table {
        request = request.with_relation(table);
    }

    let report = match converter.convert(&request)? {
        Outcome::Success(report) => report,
        Outcome::StructuralWarning(warning) => {
            eprintln!("{}", warning);
            if !confirm("Nested data detected. Flatten it for structured output?")? {
                eprintln!("Conversion cancelled.");
                return Ok(());
            }
            match converter.convert(&request.with_force_flatten(true))? {
                Outcome::Success(report) => report,
                Outcome::StructuralWarning(warning) => bail!("Still irregular after flattening: {}", warning),
            }
        }
    };

    print_report(&report);
    Ok(())
}

fn run_generate(args: GenerateArgs) -> Result<()> {
    let format = resolve_format(args.format, &args.output)?;
    let config = GenConfig::load(&args.config)
        .with_context(|| format!("Failed to load generator config {}", args.config.display()))?;

    let generator = match args.seed {
        Some(seed) => PatternGenerator::seeded(seed),
        None => PatternGenerator::new(),
    };

    let report = generate_to(&generator, &config, args.rows, &args.output, format)?;
    print_report(&report);
    Ok(())
}

fn run_tables(args: TablesArgs) -> Result<()> {
    let format = resolve_format(args.format, &args.source)?;
    let names = format.adapter().list_relations(&args.source)?;

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    for name in names {
        writeln!(out, "{}", name)?;
    }
    Ok(())
}

fn print_profile(out: &mut impl Write, name: Option<&str>, profile: &DatasetProfile) -> Result<()> {
    if let Some(name) = name {
        writeln!(out, "[{}]", name)?;
    }
    writeln!(
        out,
        "{} rows, {}",
        profile.rows,
        if profile.regular { "regular" } else { "irregular" }
    )?;
    for column in &profile.columns {
        let kinds = column
            .kinds
            .iter()
            .map(|(kind, count)| format!("{:?}={}", kind, count).to_lowercase())
            .collect::<Vec<_>>()
            .join(" ");
        writeln!(
            out,
            "  {:<24} {:<28} nulls={} missing={} distinct={} format={}",
            column.name,
            kinds,
            column.nulls,
            column.missing,
            column.distinct,
            column.format.unwrap_or("-")
        )?;
    }
    Ok(())
}

fn run_profile(args: ProfileArgs) -> Result<()> {
    let format = resolve_format(args.format, &args.source)?;
    let loaded = format.adapter().read(&args.source, args.table.as_ref())?;

    let profiles: Vec<(Option<String>, DatasetProfile)> = match loaded {
        Loaded::Single(dataset) => vec![(None, profile(&dataset))],
        Loaded::Relations(set) => set
            .iter()
            .map(|(name, dataset)| (Some(name.to_string()), profile(dataset)))
            .collect(),
    };

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    if args.json {
        let value: serde_json::Value = match profiles.as_slice() {
            [(None, single)] => serde_json::to_value(single)?,
            many => serde_json::Value::Object(
                many.iter()
                    .map(|(name, p)| -> Result<(String, serde_json::Value)> {
                        Ok((name.clone().unwrap_or_default(), serde_json::to_value(p)?))
                    })
                    .collect::<Result<_>>()?,
            ),
        };
        serde_json::to_writer_pretty(&mut out, &value)?;
        writeln!(out)?;
    } else {
        for (name, p) in &profiles {
            print_profile(&mut out, name.as_deref(), p)?;
        }
    }
    Ok(())
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_env("RECAST_LOG")
                .unwrap_or_else(|_| "info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Command::Convert(args) => run_convert(args),
        Command::Generate(args) => run_generate(args),
        Command::Tables(args) => run_tables(args),
        Command::Profile(args) => run_profile(args),
    }
}
