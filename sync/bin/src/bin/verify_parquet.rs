use clap::Parser;
use parquet::file::reader::{FileReader, SerializedFileReader};
use std::fs::File;
use std::path::PathBuf;
use sync_infrastructure::ParquetBarRepository;

/// Prints the footer metadata of a Parquet file and, for bar and indicator
/// files written by `ashare-sync`, a short content summary.
#[derive(Parser)]
#[command(name = "verify-parquet")]
struct Cli {
    path: PathBuf,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    println!("Verifying Parquet file: {}", cli.path.display());

    let reader = SerializedFileReader::new(File::open(&cli.path)?)?;
    let metadata = reader.metadata();

    println!("\nFile metadata:");
    println!("  - Version: {}", metadata.file_metadata().version());
    println!("  - Num rows: {}", metadata.file_metadata().num_rows());
    println!("  - Num row groups: {}", metadata.num_row_groups());
    if let Some(created_by) = metadata.file_metadata().created_by() {
        println!("  - Created by: {}", created_by);
    }

    println!("\nSchema:");
    for column in metadata.file_metadata().schema_descr().columns() {
        println!("  - {}: {}", column.name(), column.physical_type());
    }

    println!("\nRow groups:");
    for (i, rg) in metadata.row_groups().iter().enumerate() {
        println!("  Row group {}:", i);
        println!("    - Num rows: {}", rg.num_rows());
        println!("    - Total byte size: {} bytes", rg.total_byte_size());
    }

    match ParquetBarRepository::read_bars(&cli.path) {
        Ok(bars) if !bars.is_empty() => {
            let first = bars.iter().map(|b| b.trade_date()).min();
            let last = bars.iter().map(|b| b.trade_date()).max();
            let codes: std::collections::BTreeSet<&str> =
                bars.iter().map(|b| b.code().as_str()).collect();
            let missing_factor = bars.iter().filter(|b| !b.has_adj_factor()).count();

            println!("\nBars:");
            if let (Some(first), Some(last)) = (first, last) {
                println!("  - Dates: {} .. {}", first, last);
            }
            println!("  - Symbols: {}", codes.len());
            println!("  - Rows without adj_factor: {}", missing_factor);
        }
        Ok(_) => println!("\nBars: file is empty"),
        Err(bar_error) => match ParquetBarRepository::read_indicators(&cli.path) {
            Ok(rows) => {
                let with_ma60 = rows.iter().filter(|row| row.ma60.is_some()).count();
                println!("\nIndicators:");
                println!("  - Rows: {}", rows.len());
                println!("  - Rows with ma60: {}", with_ma60);
            }
            Err(_) => println!("\nNot a bar or indicator file: {}", bar_error),
        },
    }

    println!("\nParquet file is valid");
    Ok(())
}
