//! Canonical shapes for the model's JSON responses.
//!
//! The remote model is asked for JSON matching these exact shapes; anything
//! that fails deserialization or the range checks below is rejected as a
//! malformed response. No partially-valid result is ever accepted.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{SCORE_MAX, TIMELINE_CHECKPOINT_COUNT};

#[derive(Debug, Clone, Error, PartialEq)]
pub enum SchemaError {
    #[error("response is not valid JSON: {0}")]
    NotJson(String),
    #[error("field `{field}` is missing or has the wrong shape: {detail}")]
    BadField { field: &'static str, detail: String },
    #[error("score `{field}` is {value}, outside 0-{max}", max = SCORE_MAX)]
    ScoreOutOfRange { field: &'static str, value: i64 },
    #[error("timeline has {got} checkpoints, expected exactly {expected}", expected = TIMELINE_CHECKPOINT_COUNT)]
    WrongCheckpointCount { got: usize },
    #[error("timeline hour offsets must strictly increase (checkpoint {index})")]
    NonIncreasingOffsets { index: usize },
    #[error("list `{field}` must not be empty")]
    EmptyList { field: &'static str },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Confidence {
    High,
    Medium,
    Low,
}

impl Confidence {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::High => "High",
            Self::Medium => "Medium",
            Self::Low => "Low",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ImpactLevel {
    Low,
    Moderate,
    High,
}

impl ImpactLevel {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Low => "Low",
            Self::Moderate => "Moderate",
            Self::High => "High",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Trend {
    Increase,
    Decrease,
    Neutral,
}

/// A short statement tagged with how certain the model is about it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfidenceTagged {
    pub text: String,
    pub confidence: Confidence,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionableGuidance {
    pub do_this: Vec<ConfidenceTagged>,
    pub avoid_this: Vec<ConfidenceTagged>,
    pub consider_balancing: Vec<ConfidenceTagged>,
}

/// One point on the projected after-effect timeline.
///
/// Scores are 0-100 fractions of the display range; `hour_offset` positions
/// the point on the time axis and must strictly increase across a timeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimelineCheckpoint {
    pub time_window: String,
    pub hour_offset: f64,
    pub energy_score: u8,
    pub focus_score: u8,
    pub digestion_score: u8,
    pub feeling_indicators: Vec<String>,
    pub description: String,
    pub confidence: Confidence,
    #[serde(default)]
    pub recovery_tip: Option<String>,
}

impl TimelineCheckpoint {
    fn validate(&self, index: usize) -> Result<(), SchemaError> {
        check_score("energy_score", i64::from(self.energy_score))?;
        check_score("focus_score", i64::from(self.focus_score))?;
        check_score("digestion_score", i64::from(self.digestion_score))?;
        if !self.hour_offset.is_finite() || self.hour_offset < 0.0 {
            return Err(SchemaError::BadField {
                field: "hour_offset",
                detail: format!("checkpoint {index} has offset {}", self.hour_offset),
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MealAnalysis {
    pub detected_foods: Vec<ConfidenceTagged>,
    pub health_impact_level: ImpactLevel,
    pub nutritional_risks: Vec<ConfidenceTagged>,
    pub actionable_guidance: ActionableGuidance,
    pub brief_supportive_comment: String,
    pub after_effect_timeline: Vec<TimelineCheckpoint>,
}

impl MealAnalysis {
    pub fn validate(&self) -> Result<(), SchemaError> {
        if self.detected_foods.is_empty() {
            return Err(SchemaError::EmptyList {
                field: "detected_foods",
            });
        }
        if self.after_effect_timeline.len() != TIMELINE_CHECKPOINT_COUNT {
            return Err(SchemaError::WrongCheckpointCount {
                got: self.after_effect_timeline.len(),
            });
        }
        let mut last_offset = f64::NEG_INFINITY;
        for (i, point) in self.after_effect_timeline.iter().enumerate() {
            point.validate(i)?;
            if point.hour_offset <= last_offset {
                return Err(SchemaError::NonIncreasingOffsets { index: i });
            }
            last_offset = point.hour_offset;
        }
        Ok(())
    }

    /// Plain item names, used as context for follow-up calls.
    #[must_use]
    pub fn detected_food_names(&self) -> Vec<String> {
        self.detected_foods.iter().map(|f| f.text.clone()).collect()
    }

    #[must_use]
    pub fn risk_names(&self) -> Vec<String> {
        self.nutritional_risks
            .iter()
            .map(|r| r.text.clone())
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimulationMetric {
    pub label: String,
    pub trend: Trend,
    pub impact_analysis: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimulationResult {
    pub title: String,
    pub metrics: Vec<SimulationMetric>,
    pub explanation: String,
    pub explanation_confidence: Confidence,
    pub swap_suggestion: String,
}

impl SimulationResult {
    pub fn validate(&self) -> Result<(), SchemaError> {
        if self.metrics.len() != 3 {
            return Err(SchemaError::BadField {
                field: "metrics",
                detail: format!("expected 3 metrics, got {}", self.metrics.len()),
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanteenChoice {
    pub name: String,
    pub short_justification: String,
    #[serde(default)]
    pub price_estimate: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecisionFactors {
    pub goal_match: u8,
    pub budget_fit: u8,
    pub visual_clarity: u8,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RejectedAlternative {
    pub name: String,
    pub reason: String,
    #[serde(default)]
    pub price_estimate: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfidenceScores {
    pub recommendation: u8,
    pub price: u8,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanteenAnalysis {
    pub final_choice: CanteenChoice,
    pub decision_factors: DecisionFactors,
    pub rejected_alternatives: Vec<RejectedAlternative>,
    pub confidence_scores: ConfidenceScores,
    pub trigger_fallback: bool,
}

impl CanteenAnalysis {
    pub fn validate(&self) -> Result<(), SchemaError> {
        check_score("goal_match", i64::from(self.decision_factors.goal_match))?;
        check_score("budget_fit", i64::from(self.decision_factors.budget_fit))?;
        check_score(
            "visual_clarity",
            i64::from(self.decision_factors.visual_clarity),
        )?;
        check_score(
            "recommendation",
            i64::from(self.confidence_scores.recommendation),
        )?;
        check_score("price", i64::from(self.confidence_scores.price))?;
        if self.final_choice.name.trim().is_empty() {
            return Err(SchemaError::BadField {
                field: "final_choice.name",
                detail: "empty".into(),
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PointExplanation {
    pub insight: String,
    pub biological_reasoning: String,
    pub practical_advice: String,
}

impl PointExplanation {
    pub fn validate(&self) -> Result<(), SchemaError> {
        if self.insight.trim().is_empty() {
            return Err(SchemaError::BadField {
                field: "insight",
                detail: "empty".into(),
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CookAtHomeIdea {
    pub dish_name: String,
    pub why_it_fits: String,
    pub instructions: Vec<String>,
    #[serde(default)]
    pub substitutions: Option<String>,
}

impl CookAtHomeIdea {
    pub fn validate(&self) -> Result<(), SchemaError> {
        if self.instructions.is_empty() {
            return Err(SchemaError::EmptyList {
                field: "instructions",
            });
        }
        Ok(())
    }
}

/// Every typed response a settle event can carry. Each slot parses its own
/// variant; a cross-slot mix-up is impossible by construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum InferenceResponse {
    MealAnalysis(MealAnalysis),
    Simulation(SimulationResult),
    CanteenPick(CanteenAnalysis),
    PointExplanation(PointExplanation),
    CookAtHome(CookAtHomeIdea),
}

fn check_score(field: &'static str, value: i64) -> Result<(), SchemaError> {
    if (0..=i64::from(SCORE_MAX)).contains(&value) {
        Ok(())
    } else {
        Err(SchemaError::ScoreOutOfRange { field, value })
    }
}

pub fn parse_meal_analysis(body: &str) -> Result<MealAnalysis, SchemaError> {
    let parsed: MealAnalysis = parse(body)?;
    parsed.validate()?;
    Ok(parsed)
}

pub fn parse_simulation(body: &str) -> Result<SimulationResult, SchemaError> {
    let parsed: SimulationResult = parse(body)?;
    parsed.validate()?;
    Ok(parsed)
}

pub fn parse_canteen_analysis(body: &str) -> Result<CanteenAnalysis, SchemaError> {
    let parsed: CanteenAnalysis = parse(body)?;
    parsed.validate()?;
    Ok(parsed)
}

pub fn parse_point_explanation(body: &str) -> Result<PointExplanation, SchemaError> {
    let parsed: PointExplanation = parse(body)?;
    parsed.validate()?;
    Ok(parsed)
}

pub fn parse_cook_at_home(body: &str) -> Result<CookAtHomeIdea, SchemaError> {
    let parsed: CookAtHomeIdea = parse(body)?;
    parsed.validate()?;
    Ok(parsed)
}

fn parse<T: serde::de::DeserializeOwned>(body: &str) -> Result<T, SchemaError> {
    serde_json::from_str(body).map_err(|e| {
        if serde_json::from_str::<serde_json::Value>(body).is_err() {
            SchemaError::NotJson(e.to_string())
        } else {
            SchemaError::BadField {
                field: "response",
                detail: e.to_string(),
            }
        }
    })
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_meal_analysis_fixture_parses() {
        let parsed = parse_meal_analysis(&fixtures::meal_analysis_json()).unwrap();
        assert_eq!(parsed.after_effect_timeline.len(), 3);
        assert_eq!(parsed.health_impact_level, ImpactLevel::Moderate);
        assert_eq!(
            parsed.detected_food_names(),
            vec!["Fried rice".to_string(), "Sweet chili sauce".to_string()]
        );
    }

    #[test]
    fn test_not_json_is_distinguished_from_bad_shape() {
        assert!(matches!(
            parse_meal_analysis("not json at all"),
            Err(SchemaError::NotJson(_))
        ));
        assert!(matches!(
            parse_meal_analysis("{\"detected_foods\": []}"),
            Err(SchemaError::BadField { .. })
        ));
    }

    #[test]
    fn test_timeline_must_have_exactly_three_checkpoints() {
        let mut analysis = parse_meal_analysis(&fixtures::meal_analysis_json()).unwrap();
        analysis.after_effect_timeline.pop();
        assert_eq!(
            analysis.validate(),
            Err(SchemaError::WrongCheckpointCount { got: 2 })
        );
    }

    #[test]
    fn test_timeline_offsets_must_strictly_increase() {
        let mut analysis = parse_meal_analysis(&fixtures::meal_analysis_json()).unwrap();
        analysis.after_effect_timeline[2].hour_offset = 2.0;
        assert_eq!(
            analysis.validate(),
            Err(SchemaError::NonIncreasingOffsets { index: 2 })
        );
    }

    #[test]
    fn test_canteen_fixture_roundtrips_fallback_flag() {
        let with = parse_canteen_analysis(&fixtures::canteen_json(true)).unwrap();
        assert!(with.trigger_fallback);
        let without = parse_canteen_analysis(&fixtures::canteen_json(false)).unwrap();
        assert!(!without.trigger_fallback);
    }

    #[test]
    fn test_simulation_requires_three_metrics() {
        let body = serde_json::json!({
            "title": "Impact if sauce is reduced",
            "metrics": [
                { "label": "Glycemic Load", "trend": "decrease", "impact_analysis": "Less sugar." }
            ],
            "explanation": "Lower sugar overall.",
            "explanation_confidence": "High",
            "swap_suggestion": "Ask for sauce on the side"
        })
        .to_string();
        assert!(matches!(
            parse_simulation(&body),
            Err(SchemaError::BadField { field: "metrics", .. })
        ));
    }

    #[test]
    fn test_cook_at_home_requires_instructions() {
        let body = serde_json::json!({
            "dish_name": "Toast",
            "why_it_fits": "Fast.",
            "instructions": []
        })
        .to_string();
        assert!(matches!(
            parse_cook_at_home(&body),
            Err(SchemaError::EmptyList { field: "instructions" })
        ));
    }

    #[test]
    fn test_scores_outside_range_rejected() {
        let mut canteen = parse_canteen_analysis(&fixtures::canteen_json(false)).unwrap();
        canteen.decision_factors.goal_match = 101;
        assert!(matches!(
            canteen.validate(),
            Err(SchemaError::ScoreOutOfRange { field: "goal_match", value: 101 })
        ));
    }
}
