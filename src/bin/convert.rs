use clap::{Parser, ValueEnum};
use datalogger_converter::config::Config;
use datalogger_converter::conversion::{Converter, FormatKind};
use datalogger_converter::report::ResultTable;
use datalogger_converter::source::load_workbook;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use std::time::Instant;
use tracing::{error, info};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormat {
    Json,
    Html,
    Text,
}

#[derive(Parser)]
#[command(name = "datalogger-convert")]
#[command(about = "Convert datalogger exports into daily min/max tables", long_about = None)]
struct Cli {
    /// Workbook files to convert (xlsx, xls, ods)
    #[arg(required = true)]
    files: Vec<PathBuf>,

    /// Reading mode: 'auto', 'specific_format', 'report_mode', 'new_mode' or 'current_mode'
    #[arg(long, default_value = "auto")]
    mode: String,

    /// Output rendering
    #[arg(long, value_enum, default_value = "text")]
    output: OutputFormat,

    /// Decimal separator used in measurement text: 'comma' or 'point'
    #[arg(long, env = "DECIMAL_CONVENTION", default_value = "comma")]
    decimal: String,
}

fn render(table: &ResultTable, output: OutputFormat) -> Result<String, serde_json::Error> {
    match output {
        OutputFormat::Json => serde_json::to_string_pretty(table),
        OutputFormat::Html => Ok(table.to_html()),
        OutputFormat::Text => Ok(table.to_text()),
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let format: Option<FormatKind> = match cli.mode.as_str() {
        "auto" => None,
        mode => Some(mode.parse()?),
    };

    let config = Config {
        decimal_convention: cli.decimal.clone(),
        ..Config::default()
    };
    let converter = Converter::with_decimal_convention(config.decimal()?);

    let pb = ProgressBar::new(cli.files.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} {msg}")?
            .progress_chars("=>-"),
    );

    let start = Instant::now();
    let mut failures = 0usize;

    for path in &cli.files {
        pb.set_message(path.display().to_string());

        let result = load_workbook(path)
            .map_err(Box::<dyn std::error::Error>::from)
            .and_then(|source| {
                let table = match format {
                    Some(format) => converter.convert_as(&source, format)?,
                    None => converter.convert(&source)?,
                };
                Ok(table)
            });

        match result {
            Ok(table) => {
                info!(
                    "{}: {} days ({}) from header row {}",
                    path.display(),
                    table.len(),
                    table.format,
                    table.header_row()
                );
                let rendered = render(&table, cli.output)?;
                pb.suspend(|| {
                    if cli.files.len() > 1 {
                        println!("==> {} <==", path.display());
                    }
                    println!("{rendered}");
                });
            }
            Err(e) => {
                failures += 1;
                error!("{}: {}", path.display(), e);
                pb.suspend(|| eprintln!("{}: {}", path.display(), e));
            }
        }

        pb.inc(1);
    }

    pb.finish_with_message(format!(
        "{} converted, {} failed in {:.2}s",
        cli.files.len() - failures,
        failures,
        start.elapsed().as_secs_f64()
    ));

    if failures > 0 {
        return Err(format!("{failures} file(s) could not be converted").into());
    }
    Ok(())
}
