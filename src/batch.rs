//! Batch scoring of a patient file.
//!
//! Rows are read with the raw record schema, turned into answers, predicted
//! one by one and written back out with `Prediction` and `Confidence`
//! columns appended. CSV and parquet are chosen by file extension.

use std::fs::File;
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use log::{debug, info};
use polars::prelude::*;
use polars_io::parquet::{ParquetReader, ParquetWriter};
use sysinfo::{get_current_pid, ProcessExt, System, SystemExt};

use crate::classifier::RiskLabel;
use crate::error::{HeartError, Result};
use crate::predictor::Predictor;
use crate::records::{
    ChestPainType, ExerciseAngina, FastingBloodSugar, HeartRecord, RawAnswers, RestingEcg, Sex,
    StSlope,
};

pub const PREDICTION_COLUMN: &str = "Prediction";
pub const CONFIDENCE_COLUMN: &str = "Confidence";

/// Resident memory of this process in bytes, 0 when unavailable.
fn monitor_memory() -> u64 {
    let mut sys = System::new();
    match get_current_pid() {
        Ok(pid) => {
            sys.refresh_process(pid);
            sys.process(pid).map(|p| p.memory()).unwrap_or(0)
        }
        Err(_) => 0,
    }
}

fn is_parquet(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.eq_ignore_ascii_case("parquet"))
        .unwrap_or(false)
}

pub async fn read_parquet<P: AsRef<Path>>(path: P) -> Result<DataFrame> {
    let file = File::open(path)?;

    Ok(ParquetReader::new(file).finish()?)
}

pub async fn read_csv<P: AsRef<Path>>(path: P) -> Result<DataFrame> {
    let file = File::open(path)?;

    Ok(CsvReader::new(file)
        .has_header(true)
        .with_dtypes(Some(Arc::new(HeartRecord::raw_schema())))
        .finish()?)
}

pub async fn write_csv<P: AsRef<Path>>(path: P, df: &mut DataFrame) -> Result<()> {
    let mut file = File::create(path)?;

    CsvWriter::new(&mut file).finish(df)?;

    Ok(())
}

pub async fn write_parquet<P: AsRef<Path>>(path: P, df: &mut DataFrame) -> Result<()> {
    let mut file = File::create(path)?;

    ParquetWriter::new(&mut file).finish(df)?;

    Ok(())
}

fn int_column(df: &DataFrame, name: &str) -> Result<Vec<Option<i32>>> {
    let series = df.column(name)?.cast(&DataType::Int32)?;
    let values = series.i32()?.into_iter().collect();
    Ok(values)
}

fn float_column(df: &DataFrame, name: &str) -> Result<Vec<Option<f64>>> {
    let series = df.column(name)?.cast(&DataType::Float64)?;
    let values = series.f64()?.into_iter().collect();
    Ok(values)
}

fn text_column(df: &DataFrame, name: &str) -> Result<Vec<Option<String>>> {
    let series = df.column(name)?.cast(&DataType::Utf8)?;
    let values = series
        .utf8()?
        .into_iter()
        .map(|v| v.map(|s| s.to_string()))
        .collect();
    Ok(values)
}

fn cell<T: Clone>(values: &[Option<T>], row: usize, name: &str) -> Result<T> {
    values[row].clone().ok_or_else(|| HeartError::Row {
        row,
        reason: format!("missing {}", name),
    })
}

fn parse_cell<T>(values: &[Option<String>], row: usize, name: &str) -> Result<T>
where
    T: FromStr<Err = HeartError>,
{
    cell(values, row, name)?.parse().map_err(|e: HeartError| HeartError::Row {
        row,
        reason: e.to_string(),
    })
}

/// Builds one set of answers per row of `df`.
pub fn answers_from_frame(df: &DataFrame) -> Result<Vec<RawAnswers>> {
    let age = int_column(df, "Age")?;
    let sex = text_column(df, Sex::FIELD)?;
    let chest_pain = text_column(df, ChestPainType::FIELD)?;
    let resting_bp = int_column(df, "RestingBP")?;
    let cholesterol = int_column(df, "Cholesterol")?;
    let fasting_bs = text_column(df, FastingBloodSugar::FIELD)?;
    let resting_ecg = text_column(df, RestingEcg::FIELD)?;
    let max_hr = int_column(df, "MaxHR")?;
    let exercise_angina = text_column(df, ExerciseAngina::FIELD)?;
    let oldpeak = float_column(df, "Oldpeak")?;
    let st_slope = text_column(df, StSlope::FIELD)?;

    (0..df.height())
        .map(|row| {
            Ok(RawAnswers {
                age: cell(&age, row, "Age")?,
                sex: parse_cell(&sex, row, Sex::FIELD)?,
                chest_pain: parse_cell(&chest_pain, row, ChestPainType::FIELD)?,
                resting_bp: cell(&resting_bp, row, "RestingBP")?,
                cholesterol: cell(&cholesterol, row, "Cholesterol")?,
                fasting_bs: parse_cell(&fasting_bs, row, FastingBloodSugar::FIELD)?,
                resting_ecg: parse_cell(&resting_ecg, row, RestingEcg::FIELD)?,
                max_hr: cell(&max_hr, row, "MaxHR")?,
                exercise_angina: parse_cell(&exercise_angina, row, ExerciseAngina::FIELD)?,
                oldpeak: cell(&oldpeak, row, "Oldpeak")?,
                st_slope: parse_cell(&st_slope, row, StSlope::FIELD)?,
            })
        })
        .collect()
}

/// Predicts every row of `df` and appends the results as new columns.
///
/// Returns how many rows were labelled elevated risk.
pub fn score_frame(predictor: &Predictor, df: &mut DataFrame) -> Result<usize> {
    let answers = answers_from_frame(df)?;

    let mut labels: Vec<i32> = Vec::with_capacity(answers.len());
    let mut confidences: Vec<f64> = Vec::with_capacity(answers.len());
    for (row, answer) in answers.iter().enumerate() {
        let assessment = predictor.predict(answer).map_err(|e| HeartError::Row {
            row,
            reason: e.to_string(),
        })?;
        labels.push(assessment.label.class());
        confidences.push(assessment.confidence);
    }

    let elevated = labels
        .iter()
        .filter(|l| **l == RiskLabel::Elevated.class())
        .count();
    df.with_column(Series::new(PREDICTION_COLUMN, labels))?;
    df.with_column(Series::new(CONFIDENCE_COLUMN, confidences))?;
    Ok(elevated)
}

#[derive(Debug, Clone, PartialEq)]
pub struct BatchSummary {
    pub rows: usize,
    pub elevated: usize,
    pub elapsed: Duration,
    /// Growth of resident memory over the run, in bytes.
    pub memory: u64,
}

/// Scores `input` and writes the annotated rows to `output`.
pub async fn score_file(predictor: &Predictor, input: &Path, output: &Path) -> Result<BatchSummary> {
    let start_time = Instant::now();
    let start_memory = monitor_memory();

    let mut df = if is_parquet(input) {
        read_parquet(input).await?
    } else {
        read_csv(input).await?
    };
    debug!("read {} rows from {:?}", df.height(), input);

    let elevated = score_frame(predictor, &mut df)?;

    if is_parquet(output) {
        write_parquet(output, &mut df).await?;
    } else {
        write_csv(output, &mut df).await?;
    }

    let summary = BatchSummary {
        rows: df.height(),
        elevated,
        elapsed: start_time.elapsed(),
        memory: monitor_memory().saturating_sub(start_memory),
    };
    info!(
        "scored {} rows ({} elevated) into {:?} in {:?}, memory used: {} bytes",
        summary.rows, summary.elevated, output, summary.elapsed, summary.memory
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifacts::ModelArtifacts;
    use crate::classifier::Logistic;
    use crate::encoder::{ExpectedColumns, SchemaPolicy};
    use crate::scaler::Scaler;

    const CSV: &str = "\
Age,Sex,ChestPainType,RestingBP,Cholesterol,FastingBS,RestingECG,MaxHR,ExerciseAngina,Oldpeak,ST_Slope
40,M,ATA,140,289,0,Normal,172,N,0.0,Up
49,F,NAP,160,180,0,Normal,156,N,1.0,Flat
65,M,ASY,150,260,1,LVH,110,Y,2.5,Down
";

    /// Elevated risk whenever Oldpeak is above 1.5.
    fn predictor() -> Predictor {
        let columns = ExpectedColumns::new(vec!["Oldpeak".to_string()]).unwrap();
        let classifier = Logistic {
            coef: vec![10.0],
            intercept: -15.0,
        };
        let artifacts = ModelArtifacts::new(
            Box::new(classifier),
            Scaler::Identity,
            columns,
            SchemaPolicy::Lenient,
        )
        .unwrap();
        Predictor::new(Arc::new(artifacts))
    }

    #[test]
    fn test_answers_from_frame() {
        let df = df!(
            "Age" => &[40i32, 65],
            "Sex" => &["M", "Female"],
            "ChestPainType" => &["ATA", "No chest pain (ASY)"],
            "RestingBP" => &[140i32, 150],
            "Cholesterol" => &[289i32, 260],
            "FastingBS" => &[0i32, 1],
            "RestingECG" => &["Normal", "LVH"],
            "MaxHR" => &[172i32, 110],
            "ExerciseAngina" => &["N", "Y"],
            "Oldpeak" => &[0.0f64, 2.5],
            "ST_Slope" => &["Up", "Down"]
        )
        .unwrap();

        let answers = answers_from_frame(&df).unwrap();
        assert_eq!(answers.len(), 2);
        assert_eq!(answers[1].sex, Sex::Female);
        assert_eq!(answers[1].chest_pain, ChestPainType::Asymptomatic);
        assert_eq!(answers[1].fasting_bs, FastingBloodSugar::High);
        assert_eq!(answers[1].oldpeak, 2.5);
    }

    #[test]
    fn test_bad_row_is_named() {
        let df = df!(
            "Age" => &[40i32, 65],
            "Sex" => &["M", "X"],
            "ChestPainType" => &["ATA", "ASY"],
            "RestingBP" => &[140i32, 150],
            "Cholesterol" => &[289i32, 260],
            "FastingBS" => &[0i32, 1],
            "RestingECG" => &["Normal", "LVH"],
            "MaxHR" => &[172i32, 110],
            "ExerciseAngina" => &["N", "Y"],
            "Oldpeak" => &[0.0f64, 2.5],
            "ST_Slope" => &["Up", "Down"]
        )
        .unwrap();

        let err = answers_from_frame(&df).unwrap_err();
        assert!(matches!(err, HeartError::Row { row: 1, .. }));
    }

    #[tokio::test]
    async fn test_score_csv_file() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("heart.csv");
        let output = dir.path().join("scored.csv");
        std::fs::write(&input, CSV).unwrap();

        let summary = score_file(&predictor(), &input, &output).await.unwrap();
        assert_eq!(summary.rows, 3);
        assert_eq!(summary.elevated, 1);

        let scored = std::fs::read_to_string(&output).unwrap();
        let header = scored.lines().next().unwrap();
        assert!(header.ends_with("Prediction,Confidence"));
        assert_eq!(scored.lines().count(), 4);
    }

    #[tokio::test]
    async fn test_score_to_parquet() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("heart.csv");
        let output = dir.path().join("scored.parquet");
        std::fs::write(&input, CSV).unwrap();

        score_file(&predictor(), &input, &output).await.unwrap();

        let df = read_parquet(&output).await.unwrap();
        assert_eq!(df.height(), 3);
        let labels: Vec<Option<i32>> = df
            .column(PREDICTION_COLUMN)
            .unwrap()
            .i32()
            .unwrap()
            .into_iter()
            .collect();
        assert_eq!(labels, vec![Some(0), Some(0), Some(1)]);
    }
}
