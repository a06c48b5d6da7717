use std::fmt;

use serde::Serialize;

use crate::error::PredictorError;
use crate::features::Fallback;

/// The two classes the virality classifier can return.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ViralLabel {
    NotViral,
    Viral,
}

impl ViralLabel {
    /// Maps the classifier's raw class index
    pub fn from_class(class: i64) -> Result<Self, PredictorError> {
        match class {
            0 => Ok(ViralLabel::NotViral),
            1 => Ok(ViralLabel::Viral),
            other => Err(PredictorError::PredictionError(format!(
                "classifier returned class {}, expected 0 or 1",
                other
            ))),
        }
    }

    pub fn class(self) -> i64 {
        match self {
            ViralLabel::NotViral => 0,
            ViralLabel::Viral => 1,
        }
    }

    pub fn is_viral(self) -> bool {
        self == ViralLabel::Viral
    }
}

impl fmt::Display for ViralLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ViralLabel::NotViral => f.write_str("Not Viral"),
            ViralLabel::Viral => f.write_str("Viral"),
        }
    }
}

/// Class probabilities `(p0, p1)`; they sum to 1.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ClassProbabilities {
    pub not_viral: f64,
    pub viral: f64,
}

impl ClassProbabilities {
    /// Tolerance allowed on the sum of a probability row
    pub const SUM_TOLERANCE: f64 = 1e-3;

    /// Checks a probability pair
    ///
    /// # Errors
    /// - `PredictionError` if a value is outside [0, 1] or the pair does not sum to 1
    pub fn new(not_viral: f64, viral: f64) -> Result<Self, PredictorError> {
        let in_unit = |p: f64| p.is_finite() && (0.0..=1.0).contains(&p);
        if !in_unit(not_viral) || !in_unit(viral) || ((not_viral + viral) - 1.0).abs() > Self::SUM_TOLERANCE {
            return Err(PredictorError::PredictionError(format!(
                "invalid class probabilities ({}, {})",
                not_viral, viral
            )));
        }
        Ok(Self { not_viral, viral })
    }

    pub fn of(&self, label: ViralLabel) -> f64 {
        match label {
            ViralLabel::NotViral => self.not_viral,
            ViralLabel::Viral => self.viral,
        }
    }
}

/// Outcome for one post
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Prediction {
    pub label: ViralLabel,
    /// Present when the classifier supports probability output
    pub probabilities: Option<ClassProbabilities>,
}

/// Outcome for one uploaded row, with the fallbacks used to build its features
#[derive(Debug, Clone, PartialEq)]
pub struct BatchRowPrediction {
    pub prediction: Prediction,
    pub fallbacks: Vec<Fallback>,
}

/// Outcome of a batch upload
#[derive(Debug, Clone, PartialEq)]
pub struct BatchPrediction {
    pub rows: Vec<BatchRowPrediction>,
    pub dropped_columns: Vec<String>,
    /// Features filled with 0 on at least one row
    pub degraded_features: Vec<String>,
}

impl BatchPrediction {
    pub fn viral_count(&self) -> usize {
        self.rows.iter().filter(|r| r.prediction.label.is_viral()).count()
    }

    pub fn is_degraded(&self) -> bool {
        !self.degraded_features.is_empty()
    }
}
