//! Experiment tracking for training runs
//!
//! Two backends: a local directory tree and an MLflow tracking server spoken
//! to over its REST API. Both are best-effort; callers treat failures as
//! warnings.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use crate::config::Config;
use crate::error::{FraudError, FraudResult};

pub trait ExperimentTracker: Send {
    fn run_id(&self) -> &str;
    fn log_params(&mut self, params: &BTreeMap<String, String>) -> FraudResult<()>;
    fn log_metrics(&mut self, metrics: &BTreeMap<String, f64>) -> FraudResult<()>;
    fn log_artifact(&mut self, path: &Path) -> FraudResult<()>;
    fn finish(&mut self) -> FraudResult<()>;
}

/// Pick a tracker from `TRACKING_URI`: unset disables tracking,
/// `http(s)://` targets MLflow, anything else is a local directory
pub fn tracker_from_config(config: &Config) -> Option<Box<dyn ExperimentTracker>> {
    let uri = config.tracking_uri.as_deref()?;
    let experiment = &config.experiment_name;

    let started: FraudResult<Box<dyn ExperimentTracker>> =
        if uri.starts_with("http://") || uri.starts_with("https://") {
            MlflowTracker::start(uri, experiment).map(|t| Box::new(t) as Box<dyn ExperimentTracker>)
        } else {
            LocalTracker::start(uri, experiment).map(|t| Box::new(t) as Box<dyn ExperimentTracker>)
        };

    match started {
        Ok(tracker) => {
            tracing::info!("📒 Tracking run {} in experiment '{}' at {}", tracker.run_id(), experiment, uri);
            Some(tracker)
        }
        Err(e) => {
            tracing::warn!("Experiment tracking disabled: {}", e);
            None
        }
    }
}

// ============================================================================
// LOCAL DIRECTORY
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunMeta {
    pub run_id: String,
    pub experiment: String,
    pub status: String,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
}

/// Writes `<root>/<experiment>/<run_id>/{meta,params,metrics}.json` and
/// copies artifacts into `artifacts/`
pub struct LocalTracker {
    run_dir: PathBuf,
    meta: RunMeta,
    params: BTreeMap<String, String>,
    metrics: BTreeMap<String, f64>,
}

impl LocalTracker {
    pub fn start(root: impl AsRef<Path>, experiment: &str) -> FraudResult<Self> {
        let run_id = Uuid::new_v4().simple().to_string();
        let run_dir = root.as_ref().join(sanitize(experiment)).join(&run_id);
        fs::create_dir_all(run_dir.join("artifacts"))?;

        let tracker = Self {
            run_dir,
            meta: RunMeta {
                run_id,
                experiment: experiment.to_string(),
                status: "RUNNING".to_string(),
                start_time: Utc::now(),
                end_time: None,
            },
            params: BTreeMap::new(),
            metrics: BTreeMap::new(),
        };
        tracker.write("meta.json", &tracker.meta)?;
        Ok(tracker)
    }

    pub fn run_dir(&self) -> &Path {
        &self.run_dir
    }

    fn write<T: Serialize>(&self, name: &str, value: &T) -> FraudResult<()> {
        fs::write(self.run_dir.join(name), serde_json::to_vec_pretty(value)?)?;
        Ok(())
    }
}

impl ExperimentTracker for LocalTracker {
    fn run_id(&self) -> &str {
        &self.meta.run_id
    }

    fn log_params(&mut self, params: &BTreeMap<String, String>) -> FraudResult<()> {
        self.params.extend(params.iter().map(|(k, v)| (k.clone(), v.clone())));
        self.write("params.json", &self.params)
    }

    fn log_metrics(&mut self, metrics: &BTreeMap<String, f64>) -> FraudResult<()> {
        self.metrics.extend(metrics.iter().map(|(k, v)| (k.clone(), *v)));
        self.write("metrics.json", &self.metrics)
    }

    fn log_artifact(&mut self, path: &Path) -> FraudResult<()> {
        let name = path
            .file_name()
            .ok_or_else(|| FraudError::Tracking(format!("not a file: {}", path.display())))?;
        fs::copy(path, self.run_dir.join("artifacts").join(name))?;
        Ok(())
    }

    fn finish(&mut self) -> FraudResult<()> {
        self.meta.status = "FINISHED".to_string();
        self.meta.end_time = Some(Utc::now());
        self.write("meta.json", &self.meta)
    }
}

fn sanitize(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect()
}

// ============================================================================
// MLFLOW
// ============================================================================

#[derive(Deserialize)]
struct ExperimentResponse {
    experiment: ExperimentInfo,
}

#[derive(Deserialize)]
struct ExperimentInfo {
    experiment_id: String,
}

#[derive(Deserialize)]
struct CreateExperimentResponse {
    experiment_id: String,
}

#[derive(Deserialize)]
struct CreateRunResponse {
    run: RunInfoWrapper,
}

#[derive(Deserialize)]
struct RunInfoWrapper {
    info: RunInfo,
}

#[derive(Deserialize)]
struct RunInfo {
    run_id: String,
}

/// MLflow REST API 2.0 client; artifacts are recorded as tags holding the
/// local path since the REST API has no upload endpoint
pub struct MlflowTracker {
    base_url: String,
    run_id: String,
}

impl MlflowTracker {
    pub fn start(base_url: &str, experiment: &str) -> FraudResult<Self> {
        let base_url = base_url.trim_end_matches('/').to_string();
        let experiment_id = Self::experiment_id(&base_url, experiment)?;

        let response: CreateRunResponse = ureq::post(&endpoint(&base_url, "runs/create"))
            .send_json(json!({
                "experiment_id": experiment_id,
                "start_time": Utc::now().timestamp_millis(),
            }))?
            .into_json()?;

        Ok(Self {
            base_url,
            run_id: response.run.info.run_id,
        })
    }

    fn experiment_id(base_url: &str, experiment: &str) -> FraudResult<String> {
        let lookup = ureq::get(&endpoint(base_url, "experiments/get-by-name"))
            .query("experiment_name", experiment)
            .call();

        match lookup {
            Ok(resp) => {
                let found: ExperimentResponse = resp.into_json()?;
                Ok(found.experiment.experiment_id)
            }
            Err(ureq::Error::Status(404, _)) => {
                tracing::info!("Creating MLflow experiment '{}'", experiment);
                let created: CreateExperimentResponse =
                    ureq::post(&endpoint(base_url, "experiments/create"))
                        .send_json(json!({ "name": experiment }))?
                        .into_json()?;
                Ok(created.experiment_id)
            }
            Err(e) => Err(e.into()),
        }
    }

    fn post(&self, method: &str, body: serde_json::Value) -> FraudResult<()> {
        ureq::post(&endpoint(&self.base_url, method)).send_json(body)?;
        Ok(())
    }
}

fn endpoint(base_url: &str, method: &str) -> String {
    format!("{}/api/2.0/mlflow/{}", base_url, method)
}

impl ExperimentTracker for MlflowTracker {
    fn run_id(&self) -> &str {
        &self.run_id
    }

    fn log_params(&mut self, params: &BTreeMap<String, String>) -> FraudResult<()> {
        let params: Vec<_> = params
            .iter()
            .map(|(k, v)| json!({ "key": k, "value": v }))
            .collect();
        self.post("runs/log-batch", json!({ "run_id": self.run_id, "params": params }))
    }

    fn log_metrics(&mut self, metrics: &BTreeMap<String, f64>) -> FraudResult<()> {
        let timestamp = Utc::now().timestamp_millis();
        let metrics: Vec<_> = metrics
            .iter()
            .map(|(k, v)| json!({ "key": k, "value": v, "timestamp": timestamp, "step": 0 }))
            .collect();
        self.post("runs/log-batch", json!({ "run_id": self.run_id, "metrics": metrics }))
    }

    fn log_artifact(&mut self, path: &Path) -> FraudResult<()> {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "artifact".to_string());
        self.post(
            "runs/set-tag",
            json!({
                "run_id": self.run_id,
                "key": format!("artifact.{}", name),
                "value": path.display().to_string(),
            }),
        )
    }

    fn finish(&mut self) -> FraudResult<()> {
        self.post(
            "runs/update",
            json!({
                "run_id": self.run_id,
                "status": "FINISHED",
                "end_time": Utc::now().timestamp_millis(),
            }),
        )
    }
}
