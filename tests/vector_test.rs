mod common;

use viral_predictor::{
    build_vector, ContentType, FeatureSchema, ManualForm, Platform, PredictorError, RawInput,
};

fn twitter_form() -> ManualForm {
    ManualForm {
        platform: Platform::Twitter,
        ..ManualForm::default()
    }
}

#[test]
fn test_manual_form_vector_layout() {
    common::init_logger();
    let vector = build_vector(&twitter_form().into(), &FeatureSchema::manual_form()).unwrap();
    assert_eq!(
        vector.to_vec(),
        vec![50000.0, 1000.0, 100.0, 50.0, 0.05, 12.0, 0.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0]
    );
}

#[test]
fn test_one_hot_has_exactly_one_platform() {
    let schema = FeatureSchema::manual_form();
    for platform in Platform::ALL {
        for content_type in ContentType::ALL {
            let form = ManualForm { platform, content_type, ..ManualForm::default() };
            let vector = build_vector(&form.into(), &schema).unwrap();
            let platforms: f64 = schema
                .iter()
                .filter(|f| f.starts_with("platform_"))
                .map(|f| vector.get(f).unwrap())
                .sum();
            assert_eq!(platforms, 1.0);
            assert_eq!(vector.get(platform.feature_name()), Some(1.0));
            let is_video = if content_type == ContentType::Video { 1.0 } else { 0.0 };
            assert_eq!(vector.get("is_video"), Some(is_video));
        }
    }
}

#[test]
fn test_out_of_range_rejected() {
    let schema = FeatureSchema::manual_form();

    let raw = RawInput::from(twitter_form()).with("hour", 24.0);
    let err = build_vector(&raw, &schema).unwrap_err();
    assert!(matches!(err, PredictorError::InvalidRange { ref field, value, .. } if field == "hour" && value == 24.0));

    let raw = RawInput::from(twitter_form()).with("followers", 10_000_001.0);
    assert!(matches!(build_vector(&raw, &schema), Err(PredictorError::InvalidRange { .. })));

    let raw = RawInput::from(twitter_form()).with("likes", -1.0);
    assert!(matches!(build_vector(&raw, &schema), Err(PredictorError::InvalidRange { .. })));

    let raw = RawInput::from(twitter_form()).with("engagement_rate", f64::NAN);
    assert!(matches!(build_vector(&raw, &schema), Err(PredictorError::InvalidRange { .. })));
}

#[test]
fn test_bounds_are_inclusive() {
    let raw = RawInput::from(twitter_form())
        .with("followers", 10_000_000.0)
        .with("hour", 23.0)
        .with("engagement_rate", 1.0);
    assert!(build_vector(&raw, &FeatureSchema::manual_form()).is_ok());
}

#[test]
fn test_unknown_category_rejected() {
    let raw = RawInput::from(twitter_form()).with("platform", "Myspace");
    let err = build_vector(&raw, &FeatureSchema::manual_form()).unwrap_err();
    assert!(matches!(err, PredictorError::UnknownCategory { ref field, ref value } if field == "platform" && value == "Myspace"));

    let raw = RawInput::from(twitter_form()).with("content_type", "Carousel");
    assert!(matches!(
        build_vector(&raw, &FeatureSchema::manual_form()),
        Err(PredictorError::UnknownCategory { .. })
    ));
}

#[test]
fn test_raw_and_encoded_platform_together_rejected() {
    let raw = RawInput::from(ManualForm::default()).with("platform_TikTok", 1.0);
    let err = build_vector(&raw, &FeatureSchema::manual_form()).unwrap_err();
    assert!(matches!(err, PredictorError::SchemaMismatch(_)));

    let raw = RawInput::from(ManualForm::default()).with("is_video", 1.0);
    assert!(matches!(
        build_vector(&raw, &FeatureSchema::manual_form()),
        Err(PredictorError::SchemaMismatch(_))
    ));
}

#[test]
fn test_pre_encoded_input_must_be_one_hot() {
    let schema = FeatureSchema::manual_form();
    let encoded = |platform: Platform| {
        Platform::ALL.iter().fold(
            RawInput::new()
                .with("followers", 100.0)
                .with("likes", 1.0)
                .with("shares", 1.0)
                .with("comments", 0.0)
                .with("hour", 5.0)
                .with("is_video", 0.0),
            |raw, p| raw.with(p.feature_name(), if *p == platform { 1.0 } else { 0.0 }),
        )
    };

    let vector = build_vector(&encoded(Platform::LinkedIn), &schema).unwrap();
    assert_eq!(vector.get("platform_LinkedIn"), Some(1.0));

    let raw = encoded(Platform::LinkedIn).with("platform_YouTube", 1.0);
    let err = build_vector(&raw, &schema).unwrap_err();
    assert!(matches!(err, PredictorError::InvalidValue { ref field, .. } if field == "platform"));

    let raw = encoded(Platform::LinkedIn).with("platform_LinkedIn", 0.0);
    assert!(matches!(build_vector(&raw, &schema), Err(PredictorError::InvalidValue { .. })));
}

#[test]
fn test_unrelated_text_fields_ignored() {
    let raw = RawInput::from(twitter_form()).with("post_id", "a17").with("caption", "hello");
    let vector = build_vector(&raw, &FeatureSchema::manual_form()).unwrap();
    assert_eq!(vector.get("platform_Twitter"), Some(1.0));
    assert_eq!(vector.len(), 13);
}

#[test]
fn test_category_names_are_case_insensitive() {
    let raw = RawInput::from(twitter_form()).with("platform", " tiktok ").with("content_type", "VIDEO");
    let vector = build_vector(&raw, &FeatureSchema::manual_form()).unwrap();
    assert_eq!(vector.get("platform_TikTok"), Some(1.0));
    assert_eq!(vector.get("is_video"), Some(1.0));
}

#[test]
fn test_missing_field_reported_by_input_name() {
    let raw = RawInput::new()
        .with("followers", 100.0)
        .with("likes", 10.0)
        .with("shares", 1.0)
        .with("comments", 1.0)
        .with("hour", 3.0)
        .with("content_type", "Image");
    let err = build_vector(&raw, &FeatureSchema::manual_form()).unwrap_err();
    assert!(matches!(err, PredictorError::MissingField(ref f) if f == "platform"));

    let raw = RawInput::from(twitter_form());
    let schema = FeatureSchema::new(["likes", "saves"]).unwrap();
    let err = build_vector(&raw, &schema).unwrap_err();
    assert!(matches!(err, PredictorError::MissingField(ref f) if f == "saves"));
}

#[test]
fn test_engagement_rate_derived_when_absent() {
    let form = ManualForm { engagement_rate: None, ..twitter_form() };
    let vector = build_vector(&form.into(), &FeatureSchema::manual_form()).unwrap();
    assert_eq!(vector.get("engagement_rate"), Some((1000.0 + 100.0) / 50000.0));
}

#[test]
fn test_zero_followers_derivation_uses_one() {
    let form = ManualForm {
        followers: 0,
        likes: 0,
        shares: 0,
        engagement_rate: None,
        ..twitter_form()
    };
    let vector = build_vector(&form.into(), &FeatureSchema::manual_form()).unwrap();
    assert_eq!(vector.get("engagement_rate"), Some(0.0));
}

#[test]
fn test_derived_engagement_rate_out_of_range_rejected() {
    let form = ManualForm {
        followers: 0,
        likes: 1_000_000,
        shares: 500_000,
        engagement_rate: None,
        ..twitter_form()
    };
    let err = build_vector(&form.into(), &FeatureSchema::manual_form()).unwrap_err();
    assert!(matches!(err, PredictorError::InvalidRange { ref field, value, .. }
        if field == "engagement_rate" && value == 1_500_000.0));
}

#[test]
fn test_explicit_engagement_rate_not_overridden() {
    let vector = build_vector(&twitter_form().into(), &FeatureSchema::manual_form()).unwrap();
    assert_eq!(vector.get("engagement_rate"), Some(0.05));
    assert_ne!(Some((1000.0 + 100.0) / 50000.0), vector.get("engagement_rate"));
}

#[test]
fn test_engagement_without_inputs_is_missing() {
    let raw = RawInput::new()
        .with("followers", 100.0)
        .with("comments", 1.0)
        .with("hour", 3.0)
        .with("platform", "Facebook")
        .with("content_type", "Image");
    let schema = FeatureSchema::new(["followers", "engagement_rate"]).unwrap();
    let err = build_vector(&raw, &schema).unwrap_err();
    assert!(matches!(err, PredictorError::MissingField(ref f) if f == "engagement_rate"));
}

#[test]
fn test_vector_follows_schema_order() {
    let schema = FeatureSchema::new(["hour", "is_video", "likes"]).unwrap();
    let vector = build_vector(&twitter_form().into(), &schema).unwrap();
    assert_eq!(vector.to_vec(), vec![12.0, 0.0, 1000.0]);
    assert_eq!(vector.schema(), &schema);
}
