//! Human-readable rendering of an assessment.

use std::fmt;

use serde::Serialize;

use crate::classifier::RiskLabel;
use crate::predictor::Assessment;
use crate::records::RawAnswers;

impl RiskLabel {
    pub fn headline(self) -> &'static str {
        match self {
            RiskLabel::Low => "Low Risk - Your Heart Looks Healthy!",
            RiskLabel::Elevated => "Higher Risk Detected - Time for Action!",
        }
    }

    pub fn message(self) -> &'static str {
        match self {
            RiskLabel::Low => {
                "Based on the information provided, your heart health indicators are in a \
                 good range. Keep up the healthy habits!"
            }
            RiskLabel::Elevated => {
                "Several factors indicate potential heart health concerns. Consider \
                 consulting with a healthcare provider for a thorough check-up."
            }
        }
    }

    pub fn recommendations(self) -> &'static [&'static str] {
        match self {
            RiskLabel::Low => &["Balanced diet", "Regular exercise", "Good sleep"],
            RiskLabel::Elevated => &[
                "Schedule a doctor's appointment",
                "Get your blood pressure checked",
                "Consider a lipid profile test",
                "Discuss symptoms with your doctor",
                "Start with light exercise",
                "Reduce salt and fatty foods",
                "Practice stress management",
                "Quit smoking if applicable",
            ],
        }
    }
}

/// Per-metric remarks shown next to the answers.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HealthSnapshot {
    pub age_band: &'static str,
    pub blood_pressure: &'static str,
    pub blood_pressure_status: &'static str,
    pub cholesterol: &'static str,
    pub cholesterol_status: &'static str,
    /// Max heart rate as a share of `220 - age`, in percent.
    pub heart_rate_effort: f64,
    pub heart_rate: &'static str,
    pub heart_rate_status: &'static str,
    pub significant_st_depression: bool,
}

impl HealthSnapshot {
    pub fn from_answers(answers: &RawAnswers) -> Self {
        let age_band = if answers.age < 30 {
            "Young & Healthy"
        } else if answers.age < 50 {
            "Prime of Life"
        } else {
            "Wisdom Years - Extra Care"
        };

        let blood_pressure = if answers.resting_bp < 120 {
            "Excellent! Normal range"
        } else if answers.resting_bp < 130 {
            "Slightly elevated"
        } else {
            "Watch your BP"
        };

        let cholesterol = if answers.cholesterol < 200 {
            "Great! Healthy cholesterol"
        } else if answers.cholesterol < 240 {
            "Borderline high"
        } else {
            "High cholesterol"
        };

        let target_hr = (220 - answers.age) as f64;
        let heart_rate_effort = answers.max_hr as f64 / target_hr * 100.0;
        let heart_rate = if heart_rate_effort > 85.0 {
            "Great effort!"
        } else if heart_rate_effort > 70.0 {
            "Good workout"
        } else {
            "Moderate intensity"
        };

        Self {
            age_band,
            blood_pressure,
            blood_pressure_status: if answers.resting_bp < 130 { "Normal" } else { "High" },
            cholesterol,
            cholesterol_status: if answers.cholesterol < 200 { "Normal" } else { "High" },
            heart_rate_effort,
            heart_rate,
            heart_rate_status: if answers.max_hr as f64 > target_hr * 0.8 {
                "Good"
            } else {
                "Moderate"
            },
            significant_st_depression: answers.oldpeak > 2.0,
        }
    }
}

/// Assessment plus the answers it was made from, ready to print.
#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub answers: RawAnswers,
    pub assessment: Assessment,
    pub headline: &'static str,
    pub message: &'static str,
    pub recommendations: &'static [&'static str],
    pub snapshot: HealthSnapshot,
}

impl Report {
    pub fn new(answers: RawAnswers, assessment: Assessment) -> Self {
        let label = assessment.label;
        let snapshot = HealthSnapshot::from_answers(&answers);
        Self {
            answers,
            assessment,
            headline: label.headline(),
            message: label.message(),
            recommendations: label.recommendations(),
            snapshot,
        }
    }

    pub fn to_text(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let a = &self.answers;
        let s = &self.snapshot;

        writeln!(f, "{}", self.headline)?;
        writeln!(f, "{}", self.message)?;
        writeln!(f)?;
        writeln!(f, "Assessment Confidence: {:.1}%", self.assessment.confidence)?;
        writeln!(f)?;
        writeln!(f, "Your Health Snapshot")?;
        writeln!(f, "  Age          {:>5}  {}", a.age, s.age_band)?;
        writeln!(
            f,
            "  BP           {:>5}  {} ({})",
            a.resting_bp, s.blood_pressure_status, s.blood_pressure
        )?;
        writeln!(
            f,
            "  Cholesterol  {:>5}  {} ({})",
            a.cholesterol, s.cholesterol_status, s.cholesterol
        )?;
        writeln!(
            f,
            "  Heart Rate   {:>5}  {} ({}, {:.0}% of target)",
            a.max_hr, s.heart_rate_status, s.heart_rate, s.heart_rate_effort
        )?;
        if s.significant_st_depression {
            writeln!(f, "  Significant ST depression ({:.1} mm)", a.oldpeak)?;
        }
        writeln!(f)?;
        writeln!(f, "Recommended next steps")?;
        for step in self.recommendations {
            writeln!(f, "  - {}", step)?;
        }
        writeln!(f)?;
        write!(
            f,
            "This is a screening tool, not a medical diagnosis. Always consult healthcare professionals."
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::predictor::ConfidenceSource;

    fn assessment(label: RiskLabel, confidence: f64) -> Assessment {
        Assessment {
            label,
            confidence,
            confidence_source: ConfidenceSource::Probability,
            probabilities: None,
        }
    }

    #[test]
    fn test_snapshot_thresholds() {
        let answers = RawAnswers::default();
        let s = HealthSnapshot::from_answers(&answers);
        assert_eq!(s.age_band, "Prime of Life");
        assert_eq!(s.blood_pressure, "Slightly elevated");
        assert_eq!(s.blood_pressure_status, "Normal");
        assert_eq!(s.cholesterol, "Borderline high");
        assert_eq!(s.cholesterol_status, "High");
        // 150 / 180
        assert!((s.heart_rate_effort - 83.333).abs() < 0.001);
        assert_eq!(s.heart_rate, "Good workout");
        assert_eq!(s.heart_rate_status, "Good");
        assert!(!s.significant_st_depression);

        let answers = RawAnswers {
            age: 25,
            resting_bp: 140,
            cholesterol: 180,
            max_hr: 100,
            oldpeak: 2.5,
            ..RawAnswers::default()
        };
        let s = HealthSnapshot::from_answers(&answers);
        assert_eq!(s.age_band, "Young & Healthy");
        assert_eq!(s.blood_pressure, "Watch your BP");
        assert_eq!(s.blood_pressure_status, "High");
        assert_eq!(s.cholesterol_status, "Normal");
        assert_eq!(s.heart_rate, "Moderate intensity");
        assert_eq!(s.heart_rate_status, "Moderate");
        assert!(s.significant_st_depression);
    }

    #[test]
    fn test_text_branches_on_label() {
        let low = Report::new(RawAnswers::default(), assessment(RiskLabel::Low, 66.666));
        let text = low.to_text();
        assert!(text.starts_with("Low Risk"));
        assert!(text.contains("Assessment Confidence: 66.7%"));
        assert!(text.contains("Good sleep"));

        let high = Report::new(RawAnswers::default(), assessment(RiskLabel::Elevated, 85.0));
        let text = high.to_text();
        assert!(text.starts_with("Higher Risk Detected"));
        assert!(text.contains("Assessment Confidence: 85.0%"));
        assert!(text.contains("lipid profile"));
    }

    #[test]
    fn test_display_matches_text() {
        let answers = RawAnswers {
            oldpeak: 2.5,
            ..RawAnswers::default()
        };
        let report = Report::new(answers, assessment(RiskLabel::Elevated, 85.0));
        let text = format!("{}", report);
        assert_eq!(text, report.to_text());
        assert!(text.contains("  Significant ST depression (2.5 mm)\n"));
        assert!(text.contains("  - Quit smoking if applicable\n"));
        assert!(text.ends_with("Always consult healthcare professionals."));
    }

    #[test]
    fn test_json_report() {
        let report = Report::new(RawAnswers::default(), assessment(RiskLabel::Elevated, 90.0));
        let value = serde_json::to_value(&report).unwrap();
        assert_eq!(value["assessment"]["label"], "elevated");
        assert_eq!(value["answers"]["Sex"], "M");
        assert_eq!(value["snapshot"]["cholesterol_status"], "High");
    }
}
