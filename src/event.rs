//! Events driving `App::update`.
//!
//! User interactions and shell callbacks both arrive here. Settle events
//! carry the sequence number handed out at issue time so stale responses can
//! be recognized and dropped.

use serde::{Deserialize, Serialize};

use crate::capabilities::InferenceResult;
use crate::coordinator::Slot;
use crate::request::{CanteenGoal, EnergyLevel, HealthGoal, KitchenAccess, TimeAvailable};

// Shells drive the core through the serialized bridge, so every event and
// payload must round-trip through serde.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub enum Event {
    // Navigation
    HomeOpened,
    EatNowOpened,
    PickerOpened,

    // Eat-now flow
    MealPhotoStaged { bytes: Vec<u8>, mime_type: String },
    MealGoalSelected(HealthGoal),
    AnalyzeMealRequested,
    MealAnalysisSettled { seq: u64, result: Box<InferenceResult> },
    SimulateRequested { target_item: String },
    SimulationSettled { seq: u64, result: Box<InferenceResult> },
    TimelinePointerMoved { x: f64 },
    TimelinePointerLeft,
    TimelinePointSelected,
    PointExplanationSettled { seq: u64, result: Box<InferenceResult> },
    AnalysisCleared,

    // Canteen picker
    PickerGoalSelected(CanteenGoal),
    PickerBudgetEntered(String),
    PickerBudgetConfirmed,
    PickerFoodImageStaged { bytes: Vec<u8>, mime_type: String },
    PickerMenuImageStaged { bytes: Vec<u8>, mime_type: String },
    PickerMenuImageCleared,
    PickerAnalyzeRequested,
    CanteenPickSettled { seq: u64, result: Box<InferenceResult> },
    PickerFallbackOpened,
    FallbackKitchenAnswered(KitchenAccess),
    FallbackTimeAnswered(TimeAvailable),
    FallbackEnergyAnswered(EnergyLevel),
    FallbackGenerateRequested,
    CookAtHomeSettled { seq: u64, result: Box<InferenceResult> },
    PickerReset,

    // Shell timer gave up on a call
    InferenceTimedOut { slot: Slot },

    DismissError,
}

impl Event {
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::HomeOpened => "home_opened",
            Self::EatNowOpened => "eat_now_opened",
            Self::PickerOpened => "picker_opened",
            Self::MealPhotoStaged { .. } => "meal_photo_staged",
            Self::MealGoalSelected(_) => "meal_goal_selected",
            Self::AnalyzeMealRequested => "analyze_meal_requested",
            Self::MealAnalysisSettled { .. } => "meal_analysis_settled",
            Self::SimulateRequested { .. } => "simulate_requested",
            Self::SimulationSettled { .. } => "simulation_settled",
            Self::TimelinePointerMoved { .. } => "timeline_pointer_moved",
            Self::TimelinePointerLeft => "timeline_pointer_left",
            Self::TimelinePointSelected => "timeline_point_selected",
            Self::PointExplanationSettled { .. } => "point_explanation_settled",
            Self::AnalysisCleared => "analysis_cleared",
            Self::PickerGoalSelected(_) => "picker_goal_selected",
            Self::PickerBudgetEntered(_) => "picker_budget_entered",
            Self::PickerBudgetConfirmed => "picker_budget_confirmed",
            Self::PickerFoodImageStaged { .. } => "picker_food_image_staged",
            Self::PickerMenuImageStaged { .. } => "picker_menu_image_staged",
            Self::PickerMenuImageCleared => "picker_menu_image_cleared",
            Self::PickerAnalyzeRequested => "picker_analyze_requested",
            Self::CanteenPickSettled { .. } => "canteen_pick_settled",
            Self::PickerFallbackOpened => "picker_fallback_opened",
            Self::FallbackKitchenAnswered(_) => "fallback_kitchen_answered",
            Self::FallbackTimeAnswered(_) => "fallback_time_answered",
            Self::FallbackEnergyAnswered(_) => "fallback_energy_answered",
            Self::FallbackGenerateRequested => "fallback_generate_requested",
            Self::CookAtHomeSettled { .. } => "cook_at_home_settled",
            Self::PickerReset => "picker_reset",
            Self::InferenceTimedOut { .. } => "inference_timed_out",
            Self::DismissError => "dismiss_error",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capabilities::{InferenceError, InferenceOutput};

    fn roundtrip(event: &Event) -> Event {
        let bytes = serde_json::to_vec(event).unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[test]
    fn test_events_cross_the_bridge_intact() {
        let staged = Event::MealPhotoStaged {
            bytes: vec![0xFF, 0xD8, 0xFF],
            mime_type: "image/jpeg".into(),
        };
        assert_eq!(roundtrip(&staged), staged);

        let settled = Event::CanteenPickSettled {
            seq: 3,
            result: Box::new(Ok(InferenceOutput::Completed {
                body: "{\"trigger_fallback\": false}".into(),
            })),
        };
        assert_eq!(roundtrip(&settled), settled);

        let failed = Event::MealAnalysisSettled {
            seq: 1,
            result: Box::new(Err(InferenceError::Network {
                message: "connection reset".into(),
            })),
        };
        assert_eq!(roundtrip(&failed), failed);

        let timed_out = Event::InferenceTimedOut {
            slot: Slot::CookAtHome,
        };
        assert_eq!(roundtrip(&timed_out), timed_out);
    }
}
