use std::fs;
use std::path::Path;
use std::sync::Arc;

use heart_risk::classifier::{FittedKnn, KnnModel, Logistic, NeighborVotes, NeighborWeights};
use heart_risk::records::{ChestPainType, ExerciseAngina, StSlope};
use heart_risk::{
    encode, ArtifactCache, ClassifierArtifact, ConfidenceSource, ExpectedColumns, HeartError,
    ModelArtifacts, Predictor, PredictorConfig, RawAnswers, RiskLabel, Scaler, SchemaPolicy,
};
use smartcore::linalg::basic::matrix::DenseMatrix;

const COLUMNS: [&str; 15] = [
    "Age",
    "RestingBP",
    "Cholesterol",
    "FastingBS",
    "MaxHR",
    "Oldpeak",
    "Sex_M",
    "ChestPainType_ATA",
    "ChestPainType_NAP",
    "ChestPainType_TA",
    "RestingECG_Normal",
    "RestingECG_ST",
    "ExerciseAngina_Y",
    "ST_Slope_Flat",
    "ST_Slope_Up",
];

fn columns() -> ExpectedColumns {
    ExpectedColumns::new(COLUMNS.iter().map(|s| s.to_string()).collect()).unwrap()
}

fn scaler() -> Scaler {
    let mut mean = vec![0.0; COLUMNS.len()];
    let mut scale = vec![1.0; COLUMNS.len()];
    mean[..6].copy_from_slice(&[53.5, 132.4, 198.8, 0.23, 136.8, 0.89]);
    scale[..6].copy_from_slice(&[9.4, 18.5, 109.3, 0.42, 25.4, 1.07]);
    Scaler::Standard { mean, scale }
}

fn healthy() -> RawAnswers {
    RawAnswers {
        age: 35,
        chest_pain: ChestPainType::AtypicalAngina,
        max_hr: 175,
        oldpeak: 0.0,
        ..RawAnswers::default()
    }
}

fn at_risk() -> RawAnswers {
    RawAnswers {
        age: 66,
        resting_bp: 160,
        cholesterol: 280,
        max_hr: 105,
        exercise_angina: ExerciseAngina::Yes,
        oldpeak: 2.8,
        st_slope: StSlope::Flat,
        ..RawAnswers::default()
    }
}

/// Reference set of scaled vectors: healthy-looking rows are class 0.
fn reference() -> (Vec<Vec<f64>>, Vec<i32>) {
    let columns = columns();
    let scaler = scaler();
    let mut points = Vec::new();
    let mut labels = Vec::new();
    for (answers, label) in [(healthy(), 0), (at_risk(), 1)] {
        for shift in [-2, 0, 2] {
            let shifted = RawAnswers {
                age: answers.age + shift,
                ..answers.clone()
            };
            points.push(scaler.transform(&encode(&shifted, &columns)).unwrap());
            labels.push(label);
        }
    }
    (points, labels)
}

fn write_artifacts(dir: &Path, classifier: &ClassifierArtifact) {
    fs::write(
        dir.join("heart_columns.json"),
        serde_json::to_string(&columns()).unwrap(),
    )
    .unwrap();
    fs::write(
        dir.join("heart_scaler.json"),
        serde_json::to_string(&scaler()).unwrap(),
    )
    .unwrap();
    fs::write(
        dir.join("knn_heart_model.json"),
        serde_json::to_string(classifier).unwrap(),
    )
    .unwrap();
}

fn config(dir: &Path) -> PredictorConfig {
    PredictorConfig {
        artifact_dir: dir.to_path_buf(),
        ..PredictorConfig::default()
    }
}

#[test]
fn neighbors_artifact_gives_vote_confidence() {
    let dir = tempfile::tempdir().unwrap();
    let (points, labels) = reference();
    let artifact = ClassifierArtifact::Neighbors(NeighborVotes {
        k: 3,
        weights: NeighborWeights::Uniform,
        points,
        labels,
    });
    write_artifacts(dir.path(), &artifact);

    let cache = ArtifactCache::new(config(dir.path()));
    let predictor = Predictor::new(cache.get().unwrap());
    assert!(cache.is_loaded());

    let low = predictor.predict(&healthy()).unwrap();
    assert_eq!(low.label, RiskLabel::Low);
    assert_eq!(low.confidence, 100.0);
    assert_eq!(low.confidence_source, ConfidenceSource::Probability);

    let high = predictor.predict(&at_risk()).unwrap();
    assert_eq!(high.label, RiskLabel::Elevated);
    assert_eq!(high.confidence, 100.0);
}

#[test]
fn smartcore_knn_artifact_uses_fallback_confidence() {
    let dir = tempfile::tempdir().unwrap();
    let (points, labels) = reference();
    let x = DenseMatrix::new(points.len(), COLUMNS.len(), points.concat(), false);
    let knn: KnnModel = KnnModel::fit(&x, &labels, Default::default()).unwrap();
    write_artifacts(
        dir.path(),
        &ClassifierArtifact::Knn(FittedKnn::new(knn, COLUMNS.len())),
    );

    let cache = ArtifactCache::new(config(dir.path()));
    let predictor = Predictor::new(cache.get().unwrap());
    assert!(!predictor.artifacts().classifier().has_proba());

    for answers in [healthy(), at_risk()] {
        let assessment = predictor.predict(&answers).unwrap();
        assert_eq!(assessment.confidence, 85.0);
        assert_eq!(assessment.confidence_source, ConfidenceSource::Fallback);
    }
    assert_eq!(
        predictor.predict(&at_risk()).unwrap().label,
        RiskLabel::Elevated
    );
}

#[test]
fn concurrent_first_use_shares_one_load() {
    let dir = tempfile::tempdir().unwrap();
    let (points, labels) = reference();
    write_artifacts(
        dir.path(),
        &ClassifierArtifact::Neighbors(NeighborVotes {
            k: 1,
            weights: NeighborWeights::Distance,
            points,
            labels,
        }),
    );

    let cache = Arc::new(ArtifactCache::new(config(dir.path())));
    let handles: Vec<_> = (0..4)
        .map(|_| {
            let cache = Arc::clone(&cache);
            std::thread::spawn(move || cache.get().unwrap())
        })
        .collect();
    let loaded: Vec<Arc<ModelArtifacts>> =
        handles.into_iter().map(|h| h.join().unwrap()).collect();
    for artifacts in &loaded[1..] {
        assert!(Arc::ptr_eq(&loaded[0], artifacts));
    }
}

#[test]
fn strict_policy_rejects_incomplete_schema() {
    let dir = tempfile::tempdir().unwrap();
    // No chest pain columns: three of its levels have nowhere to go.
    let trimmed: Vec<&str> = COLUMNS
        .iter()
        .copied()
        .filter(|c| !c.starts_with("ChestPainType_"))
        .collect();
    let classifier = ClassifierArtifact::Logistic(Logistic {
        coef: vec![0.1; trimmed.len()],
        intercept: -100.0,
    });
    fs::write(
        dir.path().join("heart_columns.json"),
        serde_json::to_string(&trimmed).unwrap(),
    )
    .unwrap();
    fs::write(dir.path().join("heart_scaler.json"), r#"{"kind":"identity"}"#).unwrap();
    fs::write(
        dir.path().join("knn_heart_model.json"),
        serde_json::to_string(&classifier).unwrap(),
    )
    .unwrap();

    let strict = PredictorConfig {
        schema_policy: SchemaPolicy::Strict,
        ..config(dir.path())
    };
    let err = ModelArtifacts::load(&strict).unwrap_err();
    assert!(matches!(err, HeartError::SchemaMismatch(_)));
    assert!(err.to_string().contains("ChestPainType"));

    // Lenient loading accepts the same schema and drops the chest pain answer.
    let artifacts = ModelArtifacts::load(&config(dir.path())).unwrap();
    let predictor = Predictor::new(Arc::new(artifacts));
    let assessment = predictor.predict(&healthy()).unwrap();
    assert_eq!(assessment.label, RiskLabel::Low);
}

#[test]
fn corrupt_artifact_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let (points, labels) = reference();
    write_artifacts(
        dir.path(),
        &ClassifierArtifact::Neighbors(NeighborVotes {
            k: 1,
            weights: NeighborWeights::Uniform,
            points,
            labels,
        }),
    );
    fs::write(dir.path().join("heart_scaler.json"), "{not json").unwrap();

    let cache = ArtifactCache::new(config(dir.path()));
    let err = cache.get().unwrap_err();
    assert!(err.to_string().contains("heart_scaler.json"));
}
