//! Transaction record as it arrives at the API and in the dataset

use serde::{Deserialize, Serialize};

/// Number of model input features: `V1`..`V28` plus `Amount`
pub const FEATURE_COUNT: usize = 29;

/// Canonical feature order used for training and serving
pub const FEATURE_NAMES: [&str; FEATURE_COUNT] = [
    "V1", "V2", "V3", "V4", "V5", "V6", "V7",
    "V8", "V9", "V10", "V11", "V12", "V13", "V14",
    "V15", "V16", "V17", "V18", "V19", "V20", "V21",
    "V22", "V23", "V24", "V25", "V26", "V27", "V28",
    "Amount",
];

/// Index of `Amount` in [`FEATURE_NAMES`]
pub const AMOUNT_INDEX: usize = FEATURE_COUNT - 1;

pub const AMOUNT_COLUMN: &str = "Amount";
pub const LABEL_COLUMN: &str = "Class";
pub const TIME_COLUMN: &str = "Time";

/// One card transaction: 28 anonymized PCA components and the amount
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    #[serde(rename = "V1")]
    pub v1: f64,
    #[serde(rename = "V2")]
    pub v2: f64,
    #[serde(rename = "V3")]
    pub v3: f64,
    #[serde(rename = "V4")]
    pub v4: f64,
    #[serde(rename = "V5")]
    pub v5: f64,
    #[serde(rename = "V6")]
    pub v6: f64,
    #[serde(rename = "V7")]
    pub v7: f64,
    #[serde(rename = "V8")]
    pub v8: f64,
    #[serde(rename = "V9")]
    pub v9: f64,
    #[serde(rename = "V10")]
    pub v10: f64,
    #[serde(rename = "V11")]
    pub v11: f64,
    #[serde(rename = "V12")]
    pub v12: f64,
    #[serde(rename = "V13")]
    pub v13: f64,
    #[serde(rename = "V14")]
    pub v14: f64,
    #[serde(rename = "V15")]
    pub v15: f64,
    #[serde(rename = "V16")]
    pub v16: f64,
    #[serde(rename = "V17")]
    pub v17: f64,
    #[serde(rename = "V18")]
    pub v18: f64,
    #[serde(rename = "V19")]
    pub v19: f64,
    #[serde(rename = "V20")]
    pub v20: f64,
    #[serde(rename = "V21")]
    pub v21: f64,
    #[serde(rename = "V22")]
    pub v22: f64,
    #[serde(rename = "V23")]
    pub v23: f64,
    #[serde(rename = "V24")]
    pub v24: f64,
    #[serde(rename = "V25")]
    pub v25: f64,
    #[serde(rename = "V26")]
    pub v26: f64,
    #[serde(rename = "V27")]
    pub v27: f64,
    #[serde(rename = "V28")]
    pub v28: f64,
    #[serde(rename = "Amount")]
    pub amount: f64,
}

impl Transaction {
    /// Feature vector in [`FEATURE_NAMES`] order
    pub fn to_features(&self) -> [f64; FEATURE_COUNT] {
        [
            self.v1,
            self.v2,
            self.v3,
            self.v4,
            self.v5,
            self.v6,
            self.v7,
            self.v8,
            self.v9,
            self.v10,
            self.v11,
            self.v12,
            self.v13,
            self.v14,
            self.v15,
            self.v16,
            self.v17,
            self.v18,
            self.v19,
            self.v20,
            self.v21,
            self.v22,
            self.v23,
            self.v24,
            self.v25,
            self.v26,
            self.v27,
            self.v28,
            self.amount,
        ]
    }

    pub fn from_features(f: &[f64; FEATURE_COUNT]) -> Self {
        Self {
            v1: f[0],
            v2: f[1],
            v3: f[2],
            v4: f[3],
            v5: f[4],
            v6: f[5],
            v7: f[6],
            v8: f[7],
            v9: f[8],
            v10: f[9],
            v11: f[10],
            v12: f[11],
            v13: f[12],
            v14: f[13],
            v15: f[14],
            v16: f[15],
            v17: f[16],
            v18: f[17],
            v19: f[18],
            v20: f[19],
            v21: f[20],
            v22: f[21],
            v23: f[22],
            v24: f[23],
            v25: f[24],
            v26: f[25],
            v27: f[26],
            v28: f[27],
            amount: f[AMOUNT_INDEX],
        }
    }
}
