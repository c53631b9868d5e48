//! Train the fraud classifier and write model, scaler, metrics and plot

use std::process::ExitCode;

use fraud_sentinel::training::run_training;
use fraud_sentinel::{logging, Config, FraudError};

fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    logging::init();
    let config = Config::from_env();

    match run_training(&config) {
        Ok(report) => {
            let m = &report.metrics;
            println!("Training complete.");
            println!("  Test accuracy:   {:.4}", m.test_accuracy);
            println!("  Test F1 score:   {:.4}", m.test_f1_score);
            println!("  Test precision:  {:.4}", m.test_precision);
            println!("  Test recall:     {:.4}", m.test_recall);
            println!("  Test MCC:        {:.4}", m.test_mcc);
            println!("  CV mean F1:      {:.4}", m.cv_mean_f1_score);
            println!("  Runtime:         {:.2}s", m.training_runtime_sec);
            println!("Model saved to {}", report.model_path.display());
            println!("Metrics saved to {}", report.metrics_path.display());
            if let Some(run_id) = report.run_id {
                println!("Tracked as run {}", run_id);
            }
            ExitCode::SUCCESS
        }
        Err(FraudError::DataNotFound(path)) => {
            eprintln!("Error: The file at {} was not found.", path.display());
            ExitCode::FAILURE
        }
        Err(e) => {
            tracing::error!("Training failed: {}", e);
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}
