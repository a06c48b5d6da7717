mod adapter;
mod onnx;
mod prediction;

pub use adapter::{BinaryClassifier, ClassifierAdapter};
pub use onnx::{OnnxClassifier, DEFAULT_LABEL_OUTPUT, DEFAULT_PROBABILITY_OUTPUT};
pub use prediction::{BatchPrediction, BatchRowPrediction, ClassProbabilities, Prediction, ViralLabel};
