//! Core-owned state.

use serde::{Deserialize, Serialize};

use crate::coordinator::{RequestCoordinator, Slot};
use crate::request::{HealthGoal, ImageAttachment};
use crate::schema::{MealAnalysis, PointExplanation, SimulationResult};
use crate::timeline::{TimelineCursor, TimelineLayout};
use crate::wizard::WizardSession;
use crate::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Screen {
    #[default]
    Home,
    EatNow,
    CanteenPicker,
}

/// State of the eat-now flow: stage a photo, analyze it, explore the result.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MealSession {
    pub staged_image: Option<ImageAttachment>,
    pub goal: Option<HealthGoal>,
    pub analysis: Option<MealAnalysis>,
    pub simulation: Option<SimulationResult>,
    pub point_explanation: Option<PointExplanation>,
    pub timeline_layout: TimelineLayout,
    pub timeline_cursor: TimelineCursor,
}

impl MealSession {
    /// Drops the analysis and everything derived from it; the staged photo
    /// and goal survive so the user can re-run immediately.
    pub fn clear_analysis(&mut self) {
        self.analysis = None;
        self.simulation = None;
        self.point_explanation = None;
        self.timeline_cursor.pointer_left();
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Model {
    pub screen: Screen,
    pub meal: MealSession,
    pub wizard: WizardSession,
    pub requests: RequestCoordinator,
    pub active_error: Option<AppError>,
}

impl Model {
    /// Cancels every call the eat-now flow may have in flight.
    pub fn cancel_meal_calls(&mut self) {
        self.requests.cancel(Slot::MealAnalysis);
        self.requests.cancel(Slot::Simulation);
        self.requests.cancel(Slot::PointExplanation);
    }
}
