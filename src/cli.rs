//! Command line interface for heart-risk using clap.

use std::fs;
use std::path::PathBuf;
use std::str::FromStr;

use clap::{Parser, Subcommand, ValueEnum};
use log::debug;
use serde_json::json;

use crate::artifacts::ArtifactCache;
use crate::batch::score_file;
use crate::config::PredictorConfig;
use crate::encoder::SchemaPolicy;
use crate::error::{HeartError, Result};
use crate::predictor::Predictor;
use crate::records::{
    ChestPainType, ExerciseAngina, FastingBloodSugar, RawAnswers, RestingEcg, Sex, StSlope,
};
use crate::report::Report;

/// Heart disease risk screening from self-reported health metrics.
#[derive(Parser, Debug, Clone)]
#[command(name = "heart-risk")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Heart disease risk screening from self-reported health metrics")]
#[command(long_about = None)]
pub struct HeartArgs {
    /// Verbose level
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Output format
    #[arg(short = 'f', long = "format", value_enum, default_value_t = OutputFormat::Human)]
    pub format: OutputFormat,

    /// Directory holding the model, scaler and column artifacts
    #[arg(long, env = "HEART_ARTIFACTS")]
    pub artifacts: Option<PathBuf>,

    /// JSON configuration file
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Refuse model schemas that cannot represent every answer
    #[arg(long)]
    pub strict_schema: bool,

    /// Confidence reported when the model gives no probabilities
    #[arg(long)]
    pub fallback_confidence: Option<f64>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Human,
    Json,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Assess one set of answers
    Predict(PredictArgs),

    /// Score every row of a CSV or parquet file
    Batch(BatchArgs),

    /// Show the loaded model artifacts
    Inspect,
}

fn category<T: FromStr<Err = HeartError>>(s: &str) -> std::result::Result<T, String> {
    s.parse().map_err(|e: HeartError| e.to_string())
}

/// Answers for `predict`. Flags override the answers file, anything left
/// unset keeps the form default.
#[derive(clap::Args, Debug, Clone, Default)]
pub struct PredictArgs {
    /// JSON file with answers keyed by dataset column name
    #[arg(long)]
    pub answers: Option<PathBuf>,

    #[arg(long)]
    pub age: Option<i32>,

    /// M, F, Male or Female
    #[arg(long, value_parser = category::<Sex>)]
    pub sex: Option<Sex>,

    /// ASY, NAP, ATA, TA or the form label
    #[arg(long, value_parser = category::<ChestPainType>)]
    pub chest_pain: Option<ChestPainType>,

    /// Resting blood pressure (mm Hg)
    #[arg(long)]
    pub resting_bp: Option<i32>,

    /// Cholesterol (mg/dL)
    #[arg(long)]
    pub cholesterol: Option<i32>,

    /// Fasting blood sugar above 120 mg/dL: 0, 1, No or Yes
    #[arg(long, value_parser = category::<FastingBloodSugar>)]
    pub fasting_bs: Option<FastingBloodSugar>,

    /// Normal, ST or LVH
    #[arg(long, value_parser = category::<RestingEcg>)]
    pub resting_ecg: Option<RestingEcg>,

    /// Maximum heart rate during exercise
    #[arg(long)]
    pub max_hr: Option<i32>,

    /// N, Y, No or Yes
    #[arg(long, value_parser = category::<ExerciseAngina>)]
    pub exercise_angina: Option<ExerciseAngina>,

    /// ST depression (mm)
    #[arg(long)]
    pub oldpeak: Option<f64>,

    /// Up, Flat or Down
    #[arg(long, value_parser = category::<StSlope>)]
    pub st_slope: Option<StSlope>,
}

impl PredictArgs {
    pub fn answers(&self) -> Result<RawAnswers> {
        let mut answers = match &self.answers {
            Some(path) => serde_json::from_str(&fs::read_to_string(path)?)?,
            None => RawAnswers::default(),
        };

        if let Some(v) = self.age {
            answers.age = v;
        }
        if let Some(v) = self.sex {
            answers.sex = v;
        }
        if let Some(v) = self.chest_pain {
            answers.chest_pain = v;
        }
        if let Some(v) = self.resting_bp {
            answers.resting_bp = v;
        }
        if let Some(v) = self.cholesterol {
            answers.cholesterol = v;
        }
        if let Some(v) = self.fasting_bs {
            answers.fasting_bs = v;
        }
        if let Some(v) = self.resting_ecg {
            answers.resting_ecg = v;
        }
        if let Some(v) = self.max_hr {
            answers.max_hr = v;
        }
        if let Some(v) = self.exercise_angina {
            answers.exercise_angina = v;
        }
        if let Some(v) = self.oldpeak {
            answers.oldpeak = v;
        }
        if let Some(v) = self.st_slope {
            answers.st_slope = v;
        }
        Ok(answers)
    }
}

#[derive(clap::Args, Debug, Clone)]
pub struct BatchArgs {
    /// Patient file (.csv or .parquet)
    #[arg(short, long)]
    pub input: PathBuf,

    /// Scored output (.csv or .parquet)
    #[arg(short, long)]
    pub output: PathBuf,
}

/// Defaults, then the config file, then flags and environment.
pub fn build_config(args: &HeartArgs) -> Result<PredictorConfig> {
    let mut config = match &args.config {
        Some(path) => PredictorConfig::from_file(path)?,
        None => PredictorConfig::default(),
    };
    if let Some(dir) = &args.artifacts {
        config.artifact_dir = dir.clone();
    }
    if args.strict_schema {
        config.schema_policy = SchemaPolicy::Strict;
    }
    if let Some(confidence) = args.fallback_confidence {
        config.fallback_confidence = confidence;
    }
    config.validate()?;
    Ok(config)
}

fn predictor(cache: &ArtifactCache) -> Result<Predictor> {
    Ok(Predictor::new(cache.get()?).with_fallback_confidence(cache.config().fallback_confidence))
}

pub async fn run(args: HeartArgs) -> Result<()> {
    let config = build_config(&args)?;
    debug!("configuration {:#?}", config);
    let cache = ArtifactCache::new(config);

    match &args.command {
        Command::Predict(predict) => {
            let answers = predict.answers()?;
            let assessment = predictor(&cache)?.predict(&answers)?;
            let report = Report::new(answers, assessment);
            match args.format {
                OutputFormat::Human => println!("{}", report.to_text()),
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
            }
        }
        Command::Batch(batch) => {
            let summary = score_file(&predictor(&cache)?, &batch.input, &batch.output).await?;
            match args.format {
                OutputFormat::Human => println!(
                    "Scored {} rows, {} at elevated risk, written to {}",
                    summary.rows,
                    summary.elevated,
                    batch.output.display()
                ),
                OutputFormat::Json => println!(
                    "{}",
                    serde_json::to_string_pretty(&json!({
                        "rows": summary.rows,
                        "elevated": summary.elevated,
                        "output": batch.output,
                        "elapsed_ms": summary.elapsed.as_millis() as u64,
                    }))?
                ),
            }
        }
        Command::Inspect => {
            let artifacts = cache.get()?;
            let classifier = artifacts.classifier();
            match args.format {
                OutputFormat::Human => {
                    println!("Artifacts:     {}", cache.config().artifact_dir.display());
                    println!("Classifier:    {}", classifier.kind());
                    println!(
                        "Probabilities: {}",
                        if classifier.has_proba() { "yes" } else { "no" }
                    );
                    println!("Scaler:        {}", artifacts.scaler().kind());
                    println!("Columns:       {}", artifacts.columns().len());
                    for (i, name) in artifacts.columns().names().iter().enumerate() {
                        println!("  {:>3}  {}", i, name);
                    }
                }
                OutputFormat::Json => println!(
                    "{}",
                    serde_json::to_string_pretty(&json!({
                        "artifact_dir": cache.config().artifact_dir,
                        "classifier": classifier.kind(),
                        "probabilities": classifier.has_proba(),
                        "scaler": artifacts.scaler().kind(),
                        "columns": artifacts.columns().names(),
                    }))?
                ),
            }
        }
    }
    Ok(())
}
