//! Compare early and recent prediction inputs for drift

use std::path::PathBuf;

use fraud_sentinel::drift::report_from_file;
use fraud_sentinel::{logging, Config};

fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    logging::init();
    let config = Config::from_env();

    let path = std::env::args_os()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or(config.prediction_log_path);

    println!("Generating data drift report from {}...", path.display());
    match report_from_file(&path)? {
        Some(report) => print!("{}", report),
        None => println!("No prediction logs found to analyze."),
    }
    Ok(())
}
