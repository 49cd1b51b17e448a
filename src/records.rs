use std::fmt;
use std::ops::RangeInclusive;
use std::str::FromStr;

use polars::prelude::{DataType, Field, Schema};
use serde::{Deserialize, Serialize};

use crate::error::{HeartError, Result};

pub const AGE_RANGE: RangeInclusive<i32> = 18..=100;
pub const RESTING_BP_RANGE: RangeInclusive<i32> = 80..=200;
pub const CHOLESTEROL_RANGE: RangeInclusive<i32> = 100..=600;
pub const MAX_HR_RANGE: RangeInclusive<i32> = 60..=220;
pub const OLDPEAK_RANGE: RangeInclusive<f64> = 0.0..=6.0;

/// Column names of the plain numeric features, in dataset order.
pub const NUMERIC_COLUMNS: [&str; 6] = [
    "Age",
    "RestingBP",
    "Cholesterol",
    "FastingBS",
    "MaxHR",
    "Oldpeak",
];

/// Generates a closed categorical answer: its schema code, the label shown
/// on the form, and parsing that accepts either spelling.
macro_rules! categorical {
    (
        $(#[$meta:meta])*
        $name:ident, $field:literal {
            $($variant:ident => $code:literal, $label:literal;)+
        }
    ) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        $(#[$meta])*
        pub enum $name {
            $($variant),+
        }

        impl $name {
            /// Dataset column name, also the prefix of the one-hot columns.
            pub const FIELD: &'static str = $field;
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn code(self) -> &'static str {
                match self {
                    $($name::$variant => $code),+
                }
            }

            pub fn label(self) -> &'static str {
                match self {
                    $($name::$variant => $label),+
                }
            }
        }

        impl FromStr for $name {
            type Err = HeartError;

            fn from_str(s: &str) -> Result<Self> {
                let s = s.trim();
                $name::ALL
                    .iter()
                    .copied()
                    .find(|v| v.code().eq_ignore_ascii_case(s) || v.label().eq_ignore_ascii_case(s))
                    .ok_or_else(|| HeartError::unknown_category($field, s))
            }
        }

        impl TryFrom<String> for $name {
            type Error = HeartError;

            fn try_from(s: String) -> Result<Self> {
                s.parse()
            }
        }

        impl From<$name> for String {
            fn from(v: $name) -> String {
                v.code().to_string()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.code())
            }
        }
    };
}

categorical! {
    #[serde(try_from = "String", into = "String")]
    Sex, "Sex" {
        Male => "M", "Male";
        Female => "F", "Female";
    }
}

categorical! {
    #[serde(try_from = "String", into = "String")]
    ChestPainType, "ChestPainType" {
        Asymptomatic => "ASY", "No chest pain (ASY)";
        NonAnginal => "NAP", "Mild discomfort (NAP)";
        AtypicalAngina => "ATA", "Noticeable pain (ATA)";
        TypicalAngina => "TA", "Severe chest pain (TA)";
    }
}

categorical! {
    /// Fasting blood sugar above 120 mg/dL. Encoded as a plain 0/1 column.
    #[serde(try_from = "u8", into = "u8")]
    FastingBloodSugar, "FastingBS" {
        Normal => "0", "No";
        High => "1", "Yes";
    }
}

categorical! {
    #[serde(try_from = "String", into = "String")]
    RestingEcg, "RestingECG" {
        Normal => "Normal", "Normal";
        StWave => "ST", "ST wave changes";
        Lvh => "LVH", "LVH (enlarged heart)";
    }
}

categorical! {
    #[serde(try_from = "String", into = "String")]
    ExerciseAngina, "ExerciseAngina" {
        No => "N", "No";
        Yes => "Y", "Yes";
    }
}

categorical! {
    #[serde(try_from = "String", into = "String")]
    StSlope, "ST_Slope" {
        Up => "Up", "Up (healthy)";
        Flat => "Flat", "Flat (borderline)";
        Down => "Down", "Down (concerning)";
    }
}

impl FastingBloodSugar {
    pub fn value(self) -> u8 {
        match self {
            FastingBloodSugar::Normal => 0,
            FastingBloodSugar::High => 1,
        }
    }
}

impl TryFrom<u8> for FastingBloodSugar {
    type Error = HeartError;

    fn try_from(v: u8) -> Result<Self> {
        match v {
            0 => Ok(FastingBloodSugar::Normal),
            1 => Ok(FastingBloodSugar::High),
            other => Err(HeartError::unknown_category(
                FastingBloodSugar::FIELD,
                other.to_string(),
            )),
        }
    }
}

impl From<FastingBloodSugar> for u8 {
    fn from(v: FastingBloodSugar) -> u8 {
        v.value()
    }
}

/// Every one-hot encoded field with its full set of codes.
pub fn one_hot_levels() -> Vec<(&'static str, Vec<&'static str>)> {
    vec![
        (Sex::FIELD, Sex::ALL.iter().map(|v| v.code()).collect()),
        (
            ChestPainType::FIELD,
            ChestPainType::ALL.iter().map(|v| v.code()).collect(),
        ),
        (
            RestingEcg::FIELD,
            RestingEcg::ALL.iter().map(|v| v.code()).collect(),
        ),
        (
            ExerciseAngina::FIELD,
            ExerciseAngina::ALL.iter().map(|v| v.code()).collect(),
        ),
        (StSlope::FIELD, StSlope::ALL.iter().map(|v| v.code()).collect()),
    ]
}

/// One person's answers to the questionnaire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawAnswers {
    #[serde(rename = "Age")]
    pub age: i32,
    #[serde(rename = "Sex")]
    pub sex: Sex,
    #[serde(rename = "ChestPainType")]
    pub chest_pain: ChestPainType,
    #[serde(rename = "RestingBP")]
    pub resting_bp: i32,
    #[serde(rename = "Cholesterol")]
    pub cholesterol: i32,
    #[serde(rename = "FastingBS")]
    pub fasting_bs: FastingBloodSugar,
    #[serde(rename = "RestingECG")]
    pub resting_ecg: RestingEcg,
    #[serde(rename = "MaxHR")]
    pub max_hr: i32,
    #[serde(rename = "ExerciseAngina")]
    pub exercise_angina: ExerciseAngina,
    #[serde(rename = "Oldpeak")]
    pub oldpeak: f64,
    #[serde(rename = "ST_Slope")]
    pub st_slope: StSlope,
}

impl Default for RawAnswers {
    fn default() -> Self {
        Self {
            age: 40,
            sex: Sex::Male,
            chest_pain: ChestPainType::Asymptomatic,
            resting_bp: 120,
            cholesterol: 200,
            fasting_bs: FastingBloodSugar::Normal,
            resting_ecg: RestingEcg::Normal,
            max_hr: 150,
            exercise_angina: ExerciseAngina::No,
            oldpeak: 1.0,
            st_slope: StSlope::Up,
        }
    }
}

fn check_int(field: &'static str, value: i32, range: &RangeInclusive<i32>) -> Result<()> {
    if range.contains(&value) {
        Ok(())
    } else {
        Err(HeartError::OutOfRange {
            field,
            value: value.to_string(),
            min: range.start().to_string(),
            max: range.end().to_string(),
        })
    }
}

impl RawAnswers {
    /// Checks every numeric answer against the range the form allows.
    pub fn validate(&self) -> Result<()> {
        check_int("Age", self.age, &AGE_RANGE)?;
        check_int("RestingBP", self.resting_bp, &RESTING_BP_RANGE)?;
        check_int("Cholesterol", self.cholesterol, &CHOLESTEROL_RANGE)?;
        check_int("MaxHR", self.max_hr, &MAX_HR_RANGE)?;

        // Oldpeak is entered on a 0.1 grid.
        let tenths = self.oldpeak * 10.0;
        let on_grid = (tenths - tenths.round()).abs() <= 1e-6;
        if !self.oldpeak.is_finite() || !OLDPEAK_RANGE.contains(&self.oldpeak) || !on_grid {
            return Err(HeartError::OutOfRange {
                field: "Oldpeak",
                value: self.oldpeak.to_string(),
                min: format!("{:.1}", OLDPEAK_RANGE.start()),
                max: format!("{:.1}", OLDPEAK_RANGE.end()),
            });
        }
        Ok(())
    }

    /// Plain numeric features keyed by their column name.
    pub fn numeric_features(&self) -> [(&'static str, f64); 6] {
        [
            (NUMERIC_COLUMNS[0], self.age as f64),
            (NUMERIC_COLUMNS[1], self.resting_bp as f64),
            (NUMERIC_COLUMNS[2], self.cholesterol as f64),
            (NUMERIC_COLUMNS[3], self.fasting_bs.value() as f64),
            (NUMERIC_COLUMNS[4], self.max_hr as f64),
            (NUMERIC_COLUMNS[5], self.oldpeak),
        ]
    }

    /// `<Field>_<code>` names of the indicator columns these answers switch on.
    pub fn indicator_columns(&self) -> [String; 5] {
        [
            indicator(Sex::FIELD, self.sex.code()),
            indicator(ChestPainType::FIELD, self.chest_pain.code()),
            indicator(RestingEcg::FIELD, self.resting_ecg.code()),
            indicator(ExerciseAngina::FIELD, self.exercise_angina.code()),
            indicator(StSlope::FIELD, self.st_slope.code()),
        ]
    }
}

pub fn indicator(field: &str, code: &str) -> String {
    format!("{}_{}", field, code)
}

/// Layout of the patient CSV consumed by batch scoring.
pub struct HeartRecord {}

impl HeartRecord {
    pub fn raw_schema() -> Schema {
        Schema::from_iter(vec![
            Field::new("Age", DataType::Int32),
            Field::new("Sex", DataType::Utf8),
            Field::new("ChestPainType", DataType::Utf8),
            Field::new("RestingBP", DataType::Int32),
            Field::new("Cholesterol", DataType::Int32),
            Field::new("FastingBS", DataType::Int32),
            Field::new("RestingECG", DataType::Utf8),
            Field::new("MaxHR", DataType::Int32),
            Field::new("ExerciseAngina", DataType::Utf8),
            Field::new("Oldpeak", DataType::Float64),
            Field::new("ST_Slope", DataType::Utf8),
        ])
    }
}
