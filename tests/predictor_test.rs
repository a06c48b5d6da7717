mod common;

use std::sync::Arc;
use std::thread;

use common::{EngagementStub, ShortStub, SkewedStub, DATASET, DATASET_WITH_ID};
use viral_predictor::{
    ArtifactStore, FeatureSchema, ManualForm, Platform, PredictorConfig, PredictorError, RawInput,
    ReferenceCache, ReferenceData, SchemaOrigin, Table, ViralLabel, ViralPredictor,
};

fn table(csv: &str) -> Table {
    Table::from_reader(csv.as_bytes(), b',').unwrap()
}

#[test]
fn test_manual_form_round_trip() -> Result<(), PredictorError> {
    common::init_logger();
    let predictor = common::manual_form_predictor();

    let quiet = predictor.predict_form(&ManualForm::default())?;
    assert_eq!(quiet.label, ViralLabel::NotViral);
    let probabilities = quiet.probabilities.unwrap();
    assert!((probabilities.not_viral + probabilities.viral - 1.0).abs() < 1e-9);

    let busy = ManualForm { engagement_rate: Some(0.4), platform: Platform::TikTok, ..ManualForm::default() };
    let prediction = predictor.predict_form(&busy)?;
    assert_eq!(prediction.label, ViralLabel::Viral);
    assert_eq!(prediction.probabilities.unwrap().viral, 0.8);
    Ok(())
}

#[test]
fn test_invalid_input_never_reaches_classifier() {
    let predictor = ViralPredictor::builder()
        .with_literal_schema(FeatureSchema::manual_form())
        .with_classifier(ShortStub)
        .build()
        .unwrap();

    // ShortStub would fail with RowCountMismatch if it were called
    let raw = RawInput::from(ManualForm::default()).with("hour", 25.0);
    assert!(matches!(predictor.predict(&raw), Err(PredictorError::InvalidRange { .. })));
}

#[test]
fn test_row_count_mismatch_detected() {
    let predictor = ViralPredictor::builder()
        .with_literal_schema(FeatureSchema::manual_form())
        .with_classifier(ShortStub)
        .build()
        .unwrap();

    let err = predictor.predict_form(&ManualForm::default()).unwrap_err();
    assert!(matches!(err, PredictorError::RowCountMismatch { expected: 1, actual: 0 }));

    let upload = table("platform,likes\nTwitter,1\nTikTok,2\nYouTube,3\n");
    let err = predictor.predict_batch(&upload).unwrap_err();
    assert!(matches!(err, PredictorError::RowCountMismatch { expected: 3, actual: 2 }));
}

#[test]
fn test_classifier_width_checked_at_build() {
    let stub = EngagementStub { width: Some(12), ..EngagementStub::new() };
    let err = ViralPredictor::builder()
        .with_literal_schema(FeatureSchema::manual_form())
        .with_classifier(stub)
        .build()
        .unwrap_err();
    assert!(matches!(err, PredictorError::FeatureCountMismatch { expected: 13, actual: 12 }));
}

#[test]
fn test_invalid_probabilities_rejected() {
    let predictor = ViralPredictor::builder()
        .with_literal_schema(FeatureSchema::manual_form())
        .with_classifier(SkewedStub)
        .build()
        .unwrap();
    assert!(matches!(
        predictor.predict_form(&ManualForm::default()),
        Err(PredictorError::PredictionError(_))
    ));
}

#[test]
fn test_probabilities_optional() {
    let stub = EngagementStub { with_probabilities: false, ..EngagementStub::new() };
    let predictor = ViralPredictor::builder()
        .with_literal_schema(FeatureSchema::manual_form())
        .with_classifier(stub)
        .build()
        .unwrap();
    assert!(predictor.predict_form(&ManualForm::default()).unwrap().probabilities.is_none());
}

#[test]
fn test_reference_schema_verified_against_literal() {
    let file = common::write_dataset(DATASET);
    let cache = ReferenceCache::new(file.path(), "is_viral", b',');
    let predictor = ViralPredictor::builder()
        .with_reference_cache(&cache)
        .with_literal_schema(FeatureSchema::manual_form())
        .with_classifier(EngagementStub::new())
        .build()
        .unwrap();

    assert_eq!(predictor.schema_origin(), SchemaOrigin::Verified);
    assert_eq!(predictor.schema(), &FeatureSchema::manual_form());
    assert_eq!(predictor.reference_stats().get("followers"), Some(174000.0));
    assert!(cache.is_loaded());

    let summary = predictor.summary().unwrap();
    assert_eq!(summary.total_rows, 6);
    assert_eq!((summary.viral, summary.not_viral), (3, 3));
    assert_eq!(summary.engagement_by_platform.len(), 6);
}

#[test]
fn test_diverging_schemas_fail_fast() {
    let file = common::write_dataset(DATASET_WITH_ID);
    let cache = ReferenceCache::new(file.path(), "is_viral", b',');
    let err = ViralPredictor::builder()
        .with_reference_cache(&cache)
        .with_literal_schema(FeatureSchema::manual_form())
        .with_classifier(EngagementStub::new())
        .build()
        .unwrap_err();
    assert!(matches!(err, PredictorError::SchemaMismatch(_)));
}

#[test]
fn test_derived_schema_without_literal() {
    let reference = ReferenceData::from_table(table(DATASET_WITH_ID), "is_viral").unwrap();
    let stub = EngagementStub { width: None, ..EngagementStub::new() };
    let predictor = ViralPredictor::builder()
        .with_reference(Arc::new(reference))
        .with_classifier(stub)
        .build()
        .unwrap();
    assert_eq!(predictor.schema_origin(), SchemaOrigin::Derived);
    assert_eq!(predictor.schema().names()[0], "post_id");
    assert!(!predictor.schema().contains("topic"));
}

#[test]
fn test_no_schema_source_is_unavailable() {
    let err = ViralPredictor::builder()
        .with_classifier(EngagementStub::new())
        .build()
        .unwrap_err();
    assert!(matches!(err, PredictorError::SchemaUnavailable(_)));
}

#[test]
fn test_batch_uses_reference_fill_values() {
    let file = common::write_dataset(DATASET);
    let cache = ReferenceCache::new(file.path(), "is_viral", b',');
    let predictor = ViralPredictor::builder()
        .with_reference_cache(&cache)
        .with_classifier(EngagementStub::new())
        .build()
        .unwrap();

    let upload = table(
        "post_id,platform,content_type,likes,engagement_rate,is_viral\n\
         a,Twitter,Image,10,0.01,0\n\
         b,TikTok,Video,5000,0.3,1\n",
    );
    let result = predictor.predict_batch(&upload).unwrap();
    assert_eq!(result.rows.len(), 2);
    assert_eq!(result.rows[0].prediction.label, ViralLabel::NotViral);
    assert_eq!(result.rows[1].prediction.label, ViralLabel::Viral);
    assert_eq!(result.viral_count(), 1);
    assert!(!result.is_degraded());
    assert_eq!(result.dropped_columns, vec!["post_id".to_string()]);
    // followers, shares, comments and hour come from the reference means
    assert_eq!(result.rows[0].fallbacks.len(), 4);
}

#[test]
fn test_batch_reports_degraded_features() {
    let predictor = common::manual_form_predictor();
    let result = predictor.predict_batch(&table("platform,likes\nTikTok,900\n")).unwrap();
    assert!(result.is_degraded());
    assert_eq!(result.degraded_features.len(), 6);
    assert!(result.degraded_features.contains(&"engagement_rate".to_string()));
}

#[test]
fn test_empty_upload_skips_classifier() {
    let predictor = ViralPredictor::builder()
        .with_literal_schema(FeatureSchema::manual_form())
        .with_classifier(ShortStub)
        .build()
        .unwrap();
    let result = predictor.predict_batch(&table("platform,likes\n")).unwrap();
    assert!(result.rows.is_empty());
}

#[test]
fn test_predictor_shared_across_threads() {
    let predictor = Arc::new(common::manual_form_predictor());
    let handles: Vec<_> = (0..4)
        .map(|i| {
            let predictor = Arc::clone(&predictor);
            thread::spawn(move || {
                let form = ManualForm { engagement_rate: Some(0.1 * i as f64), ..ManualForm::default() };
                predictor.predict_form(&form).unwrap().label
            })
        })
        .collect();
    let labels: Vec<ViralLabel> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    assert_eq!(labels[0], ViralLabel::NotViral);
    assert!(labels[1..].iter().all(|l| l.is_viral()));
}

#[test]
fn test_from_config_without_model() {
    let dir = tempfile::tempdir().unwrap();
    let store = ArtifactStore::new(dir.path()).unwrap();
    let err = ViralPredictor::from_config(&PredictorConfig::default(), &store).unwrap_err();
    assert!(matches!(err, PredictorError::ClassifierUnavailable(_)));

    let config = PredictorConfig::from_toml_str("[model]\npath = \"missing.onnx\"").unwrap();
    let err = ViralPredictor::from_config(&config, &store).unwrap_err();
    assert!(matches!(err, PredictorError::ClassifierUnavailable(_)));
}
