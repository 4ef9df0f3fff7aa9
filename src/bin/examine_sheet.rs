use datalogger_converter::conversion::{detect_format, strategy_for, FormatKind};
use datalogger_converter::source::load_workbook;
use std::env;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = env::args().collect();
    let Some(file_path) = args.get(1) else {
        eprintln!("Usage: examine-sheet <workbook> [rows]");
        std::process::exit(2);
    };
    let rows_to_show: usize = args.get(2).and_then(|n| n.parse().ok()).unwrap_or(20);

    println!("Opening workbook: {file_path}");
    let source = load_workbook(file_path)?;

    println!("Dimensions: {} rows x {} columns", source.row_count(), source.width());
    println!("\nFirst {rows_to_show} rows (showing first 10 columns):");
    println!("{}", "=".repeat(100));

    for (row_idx, row) in source.rows().enumerate().take(rows_to_show) {
        if row.iter().all(|cell| cell.is_empty()) {
            continue;
        }
        print!("Row {row_idx:3}: ");
        for cell in row.iter().take(10) {
            if cell.is_empty() {
                print!("[empty] ");
            } else {
                print!("[{cell}] ");
            }
        }
        println!();
    }

    let format = detect_format(&source);
    println!("\n{}", "=".repeat(100));
    println!("Detected layout: {format}");

    let strategy = strategy_for(format);
    let candidates = strategy.candidate_rows(&source);
    println!("Candidate header rows: {candidates:?}");

    for skip_rows in candidates {
        let Some(frame) = source.frame(skip_rows) else {
            continue;
        };
        match strategy.map_columns(&frame) {
            Ok(mapping) => {
                println!("\nHeader found at row {skip_rows}:");
                println!("  timestamp:   {}", mapping.timestamp.name);
                if let Some(time) = &mapping.time {
                    println!("  time:        {}", time.name);
                }
                println!("  temperature: {}", mapping.temperature.name);
                println!("  humidity:    {}", mapping.humidity.name);
                if let Some(id) = &mapping.id {
                    println!("  id:          {}", id.name);
                }
                return Ok(());
            }
            Err(missing) => {
                let missing: Vec<String> = missing.iter().map(ToString::to_string).collect();
                println!("Row {skip_rows:3}: missing {}", missing.join(", "));
            }
        }
    }

    println!("\nNo candidate row matched the {format} header");
    if format == FormatKind::CurrentMode {
        println!("new_mode layouts are never detected; convert them with --mode new_mode");
    }
    Ok(())
}
