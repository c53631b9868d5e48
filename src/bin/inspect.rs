//! Print the first rows and a summary of the raw dataset

use std::path::PathBuf;

use anyhow::Context;
use fraud_sentinel::data::{load_frame, Frame};
use fraud_sentinel::{logging, Config};

fn print_head(frame: &Frame, n: usize) {
    println!("{}", frame.columns().join(","));
    for row in frame.head(n) {
        let cells: Vec<String> = row
            .iter()
            .map(|v| v.map_or_else(|| "NaN".to_string(), |v| v.to_string()))
            .collect();
        println!("{}", cells.join(","));
    }
}

fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    logging::init();
    let config = Config::from_env();

    let path = std::env::args_os()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or(config.data_path);

    let frame = load_frame(&path).with_context(|| format!("could not load {}", path.display()))?;
    println!("Data loaded successfully.");

    println!("\n--- First 5 Rows ---");
    print_head(&frame, 5);
    println!();
    println!("{}", frame.summary());
    Ok(())
}
