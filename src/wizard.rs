//! Step machine for the canteen picker.
//!
//! The picker walks a fixed wizard: pick a goal, optionally enter a budget,
//! capture photos, wait for the analysis, read the result. A fallback
//! sub-flow (cook at home instead) hangs off the results step and is only
//! reachable when the analysis itself asked for it.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::request::{CanteenGoal, FallbackAnswers, ImageAttachment, InferenceRequest};
use crate::schema::{CanteenAnalysis, CookAtHomeIdea};
use crate::MAX_BUDGET_LENGTH;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum WizardError {
    #[error("Please choose a goal first.")]
    GoalNotChosen,
    #[error("Please add a photo of the food counter.")]
    FoodImageMissing,
    #[error("A budget needs a menu photo so prices can be checked. Add one or clear the budget.")]
    MenuImageMissingForBudget,
    #[error("Keep the budget under {MAX_BUDGET_LENGTH} characters.")]
    BudgetTooLong,
    #[error("That option is only available when the analysis suggests cooking instead.")]
    FallbackNotOffered,
    #[error("This action is not available on the current step.")]
    WrongStep,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PickerStep {
    #[default]
    Goal,
    Budget,
    Capture,
    Analyzing,
    Results,
    FallbackQuestions,
    FallbackResult,
}

/// All answers and results of one run through the picker. Dropping back to
/// an earlier step keeps later answers so the user never re-enters them.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct WizardSession {
    step: PickerStep,
    pub goal: Option<CanteenGoal>,
    pub budget: String,
    pub food_image: Option<ImageAttachment>,
    pub menu_image: Option<ImageAttachment>,
    /// Guard or analysis failure message shown on the current step.
    pub validation_message: Option<String>,
    pub result: Option<CanteenAnalysis>,
    pub fallback_answers: FallbackAnswers,
    pub fallback_idea: Option<CookAtHomeIdea>,
}

impl WizardSession {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub const fn step(&self) -> PickerStep {
        self.step
    }

    pub fn choose_goal(&mut self, goal: CanteenGoal) {
        self.goal = Some(goal);
        self.validation_message = None;
        self.step = PickerStep::Budget;
    }

    /// The limit applies to the trimmed value, which is what gets stored.
    pub fn enter_budget(&mut self, budget: &str) -> Result<(), WizardError> {
        let budget = budget.trim();
        if budget.chars().count() > MAX_BUDGET_LENGTH {
            return Err(WizardError::BudgetTooLong);
        }
        self.budget = budget.to_string();
        Ok(())
    }

    /// Leaves the budget step, with or without a budget entered.
    pub fn confirm_budget(&mut self) -> Result<(), WizardError> {
        if self.goal.is_none() {
            return Err(WizardError::GoalNotChosen);
        }
        self.validation_message = None;
        self.step = PickerStep::Capture;
        Ok(())
    }

    pub fn stage_food_image(&mut self, image: ImageAttachment) {
        self.food_image = Some(image);
        self.validation_message = None;
    }

    pub fn stage_menu_image(&mut self, image: ImageAttachment) {
        self.menu_image = Some(image);
        self.validation_message = None;
    }

    pub fn clear_menu_image(&mut self) {
        self.menu_image = None;
    }

    /// Guard for leaving the capture step. A food image is always required;
    /// a menu image only when a budget was entered, since prices can only be
    /// checked against a menu. On success the session is on `Analyzing` and
    /// the returned request is ready to issue.
    pub fn begin_analysis(&mut self) -> Result<InferenceRequest, WizardError> {
        let Some(goal) = self.goal else {
            return Err(WizardError::GoalNotChosen);
        };
        let Some(food_image) = self.food_image.clone() else {
            return Err(WizardError::FoodImageMissing);
        };
        if !self.budget.is_empty() && self.menu_image.is_none() {
            return Err(WizardError::MenuImageMissingForBudget);
        }
        self.validation_message = None;
        self.result = None;
        self.step = PickerStep::Analyzing;
        Ok(InferenceRequest::CanteenPick {
            food_image,
            menu_image: self.menu_image.clone(),
            goal,
            budget: self.budget.clone(),
        })
    }

    /// The cook-at-home generate request, built from the answered questions
    /// with per-question defaults. Callable only from the fallback sub-flow.
    pub fn fallback_request(&self) -> Result<InferenceRequest, WizardError> {
        if !matches!(
            self.step,
            PickerStep::FallbackQuestions | PickerStep::FallbackResult
        ) {
            return Err(WizardError::WrongStep);
        }
        let Some(goal) = self.goal else {
            return Err(WizardError::GoalNotChosen);
        };
        Ok(InferenceRequest::CookAtHome {
            goal,
            kitchen: self.fallback_answers.kitchen_or_default(),
            time: self.fallback_answers.time_or_default(),
            energy: self.fallback_answers.energy_or_default(),
        })
    }

    /// A successful analysis moves to the results step.
    pub fn analysis_succeeded(&mut self, result: CanteenAnalysis) {
        self.result = Some(result);
        self.validation_message = None;
        self.step = PickerStep::Results;
    }

    /// A failed analysis returns to capture with the message attached; every
    /// answer the user gave is kept.
    pub fn analysis_failed(&mut self, message: String) {
        self.validation_message = Some(message);
        self.step = PickerStep::Capture;
    }

    /// Opens the cook-at-home questions. Only offered when the analysis set
    /// `trigger_fallback`.
    pub fn open_fallback(&mut self) -> Result<(), WizardError> {
        match &self.result {
            Some(result) if result.trigger_fallback => {
                self.step = PickerStep::FallbackQuestions;
                Ok(())
            }
            Some(_) => Err(WizardError::FallbackNotOffered),
            None => Err(WizardError::WrongStep),
        }
    }

    pub fn fallback_ready(&mut self, idea: CookAtHomeIdea) {
        self.fallback_idea = Some(idea);
        self.step = PickerStep::FallbackResult;
    }

    pub fn fallback_failed(&mut self, message: String) {
        self.validation_message = Some(message);
        self.step = PickerStep::FallbackQuestions;
    }

    /// Back to a state indistinguishable from a fresh session.
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
