#![allow(dead_code)]

use env_logger::Env;
use ndarray::{Array2, ArrayView2};
use viral_predictor::{BinaryClassifier, FeatureSchema, PredictorError, ViralPredictor};

/// Column of `engagement_rate` in the manual form schema
pub const ENGAGEMENT_COLUMN: usize = 4;

/// A small labelled dataset whose columns derive the manual form schema
pub const DATASET: &str = "\
followers,likes,shares,comments,engagement_rate,hour,platform,content_type,is_viral
50000,1000,100,50,0.022,12,Facebook,Image,0
12000,3000,800,200,0.3167,18,Instagram,Video,1
800000,90000,20000,4000,0.1375,21,TikTok,Video,1
2000,40,5,2,0.0225,9,Twitter,Image,0
150000,12000,900,700,0.086,15,YouTube,Video,1
30000,200,30,10,0.0077,8,LinkedIn,Image,0
";

/// The same posts with an identifier and a text column in front, which
/// derives a schema that differs from the manual form
pub const DATASET_WITH_ID: &str = "\
post_id,topic,followers,likes,shares,comments,engagement_rate,hour,platform,content_type,is_viral
1,sports,50000,1000,100,50,0.022,12,Facebook,Image,0
2,music,12000,3000,800,200,0.3167,18,Instagram,Video,1
";

pub fn write_dataset(contents: &str) -> tempfile::NamedTempFile {
    use std::io::Write;
    let mut file = tempfile::NamedTempFile::new().expect("Failed to create temp file");
    file.write_all(contents.as_bytes()).expect("Failed to write dataset");
    file
}

pub fn init_logger() {
    let _ = env_logger::Builder::from_env(Env::default().default_filter_or("warn"))
        .is_test(true)
        .try_init();
}

/// Deterministic stand-in for the trained model: viral when the engagement
/// rate exceeds `threshold`, with fixed probabilities for each class.
pub struct EngagementStub {
    pub threshold: f64,
    pub width: Option<usize>,
    pub with_probabilities: bool,
}

impl EngagementStub {
    pub fn new() -> Self {
        Self {
            threshold: 0.05,
            width: Some(13),
            with_probabilities: true,
        }
    }
}

impl BinaryClassifier for EngagementStub {
    fn expected_features(&self) -> Option<usize> {
        self.width
    }

    fn predict(&self, features: ArrayView2<'_, f64>) -> Result<Vec<i64>, PredictorError> {
        Ok(features
            .rows()
            .into_iter()
            .map(|row| i64::from(row[ENGAGEMENT_COLUMN] > self.threshold))
            .collect())
    }

    fn predict_proba(&self, features: ArrayView2<'_, f64>) -> Result<Option<Array2<f64>>, PredictorError> {
        if !self.with_probabilities {
            return Ok(None);
        }
        let mut proba = Array2::zeros((features.nrows(), 2));
        for (i, row) in features.rows().into_iter().enumerate() {
            let viral = if row[ENGAGEMENT_COLUMN] > self.threshold { 0.8 } else { 0.2 };
            proba[[i, 0]] = 1.0 - viral;
            proba[[i, 1]] = viral;
        }
        Ok(Some(proba))
    }
}

/// A broken model that always answers for one row fewer than it was given
pub struct ShortStub;

impl BinaryClassifier for ShortStub {
    fn predict(&self, features: ArrayView2<'_, f64>) -> Result<Vec<i64>, PredictorError> {
        Ok(vec![0; features.nrows().saturating_sub(1)])
    }
}

/// A model whose probability rows do not sum to one
pub struct SkewedStub;

impl BinaryClassifier for SkewedStub {
    fn predict(&self, features: ArrayView2<'_, f64>) -> Result<Vec<i64>, PredictorError> {
        Ok(vec![1; features.nrows()])
    }

    fn predict_proba(&self, features: ArrayView2<'_, f64>) -> Result<Option<Array2<f64>>, PredictorError> {
        Ok(Some(Array2::from_elem((features.nrows(), 2), 0.7)))
    }
}

pub fn manual_form_predictor() -> ViralPredictor {
    ViralPredictor::builder()
        .with_literal_schema(FeatureSchema::manual_form())
        .with_classifier(EngagementStub::new())
        .build()
        .expect("Failed to create predictor")
}
