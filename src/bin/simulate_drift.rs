//! Send shifted dataset rows to a running API so the drift report has
//! something to find

use anyhow::Context;
use fraud_sentinel::data::load_frame;
use fraud_sentinel::simulation::{drifted_sample, send_all, DRIFT_FEATURE, DRIFT_SHIFT, SAMPLE_SEED, SAMPLE_SIZE};
use fraud_sentinel::{logging, Config};

fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    logging::init();
    let config = Config::from_env();

    let frame = load_frame(&config.data_path)
        .with_context(|| format!("could not load {}", config.data_path.display()))?;
    let transactions = drifted_sample(&frame, SAMPLE_SIZE, SAMPLE_SEED, DRIFT_FEATURE, DRIFT_SHIFT)?;

    println!(
        "Sending {} requests with '{}' shifted by {} to {}...",
        transactions.len(),
        DRIFT_FEATURE,
        DRIFT_SHIFT,
        config.api_url
    );
    let accepted = send_all(&config.api_url, &transactions);
    println!("Simulation complete: {}/{} requests accepted.", accepted, transactions.len());
    Ok(())
}
