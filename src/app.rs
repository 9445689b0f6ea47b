//! The application core.
//!
//! `update` is the only place state changes. Every inference call is issued
//! through the coordinator and settles back here with its sequence number;
//! stale settles are dropped before any domain state is touched.

use serde::{Deserialize, Serialize};

use crate::capabilities::{Capabilities, InferenceOutput, InferenceResult};
use crate::coordinator::{SettleDisposition, Slot};
use crate::event::Event;
use crate::model::{Model, Screen};
use crate::request::{ImageAttachment, InferenceRequest, SimulationContext};
use crate::schema::{
    self, CanteenAnalysis, CookAtHomeIdea, InferenceResponse, MealAnalysis, PointExplanation,
    SimulationResult,
};
use crate::wizard::PickerStep;
use crate::{AppError, ErrorKind, MAX_TARGET_ITEM_LENGTH};

#[derive(Default)]
pub struct App;

impl crux_core::App for App {
    type Event = Event;
    type Model = Model;
    type ViewModel = ViewModel;
    type Capabilities = Capabilities;

    fn update(&self, event: Self::Event, model: &mut Self::Model, caps: &Self::Capabilities) {
        tracing::debug!(event = event.name(), "update");

        match event {
            Event::HomeOpened => model.screen = Screen::Home,
            Event::EatNowOpened => model.screen = Screen::EatNow,
            Event::PickerOpened => model.screen = Screen::CanteenPicker,

            Event::MealPhotoStaged { bytes, mime_type } => {
                match ImageAttachment::new(bytes, mime_type) {
                    Ok(image) => {
                        model.meal.staged_image = Some(image);
                        model.meal.clear_analysis();
                        model.cancel_meal_calls();
                    }
                    Err(error) => model.active_error = Some(error),
                }
            }
            Event::MealGoalSelected(goal) => model.meal.goal = Some(goal),
            Event::AnalyzeMealRequested => {
                match (model.meal.staged_image.clone(), model.meal.goal) {
                    (Some(image), Some(goal)) => {
                        model.meal.clear_analysis();
                        let seq = model.requests.issue(Slot::MealAnalysis);
                        caps.inference.generate(
                            InferenceRequest::MealAnalysis { image, goal },
                            move |result| Event::MealAnalysisSettled {
                                seq,
                                result: Box::new(result),
                            },
                        );
                    }
                    (None, _) => {
                        model.active_error = Some(AppError::new(
                            ErrorKind::Validation,
                            "Add a photo of your meal first.",
                        ));
                    }
                    (_, None) => {
                        model.active_error = Some(AppError::new(
                            ErrorKind::Validation,
                            "Choose a wellness goal first.",
                        ));
                    }
                }
            }
            Event::MealAnalysisSettled { seq, result } => {
                self.settle(model, Slot::MealAnalysis, seq, *result);
            }
            Event::SimulateRequested { target_item } => {
                let target_item = target_item.trim().to_string();
                if target_item.is_empty() || target_item.chars().count() > MAX_TARGET_ITEM_LENGTH {
                    model.active_error = Some(AppError::new(
                        ErrorKind::Validation,
                        "Pick one item from the meal to simulate.",
                    ));
                } else if let Some(analysis) = &model.meal.analysis {
                    let context = SimulationContext {
                        detected_foods: analysis.detected_food_names(),
                        nutritional_risks: analysis.risk_names(),
                    };
                    model.meal.simulation = None;
                    let seq = model.requests.issue(Slot::Simulation);
                    caps.inference.generate(
                        InferenceRequest::Simulation {
                            context,
                            target_item,
                        },
                        move |result| Event::SimulationSettled {
                            seq,
                            result: Box::new(result),
                        },
                    );
                } else {
                    model.active_error = Some(AppError::new(
                        ErrorKind::InvalidState,
                        "no analysis to simulate against",
                    ));
                }
            }
            Event::SimulationSettled { seq, result } => {
                self.settle(model, Slot::Simulation, seq, *result);
            }
            Event::TimelinePointerMoved { x } => {
                if let Some(analysis) = &model.meal.analysis {
                    model.meal.timeline_cursor.pointer_moved(
                        &model.meal.timeline_layout,
                        &analysis.after_effect_timeline,
                        x,
                    );
                }
            }
            Event::TimelinePointerLeft => model.meal.timeline_cursor.pointer_left(),
            Event::TimelinePointSelected => {
                let checkpoint = model.meal.analysis.as_ref().and_then(|analysis| {
                    model
                        .meal
                        .timeline_cursor
                        .selected(&analysis.after_effect_timeline)
                        .cloned()
                });
                if let (Some(checkpoint), Some(analysis)) = (checkpoint, &model.meal.analysis) {
                    let detected_foods = analysis.detected_food_names();
                    model.meal.point_explanation = None;
                    let seq = model.requests.issue(Slot::PointExplanation);
                    caps.inference.generate(
                        InferenceRequest::PointExplanation {
                            checkpoint,
                            detected_foods,
                        },
                        move |result| Event::PointExplanationSettled {
                            seq,
                            result: Box::new(result),
                        },
                    );
                }
            }
            Event::PointExplanationSettled { seq, result } => {
                self.settle(model, Slot::PointExplanation, seq, *result);
            }
            Event::AnalysisCleared => {
                model.meal.clear_analysis();
                model.cancel_meal_calls();
            }

            Event::PickerGoalSelected(goal) => model.wizard.choose_goal(goal),
            Event::PickerBudgetEntered(budget) => {
                if let Err(error) = model.wizard.enter_budget(&budget) {
                    model.wizard.validation_message = Some(error.to_string());
                }
            }
            Event::PickerBudgetConfirmed => {
                if let Err(error) = model.wizard.confirm_budget() {
                    model.wizard.validation_message = Some(error.to_string());
                }
            }
            Event::PickerFoodImageStaged { bytes, mime_type } => {
                match ImageAttachment::new(bytes, mime_type) {
                    Ok(image) => model.wizard.stage_food_image(image),
                    Err(error) => {
                        model.wizard.validation_message = Some(error.user_facing_message());
                    }
                }
            }
            Event::PickerMenuImageStaged { bytes, mime_type } => {
                match ImageAttachment::new(bytes, mime_type) {
                    Ok(image) => model.wizard.stage_menu_image(image),
                    Err(error) => {
                        model.wizard.validation_message = Some(error.user_facing_message());
                    }
                }
            }
            Event::PickerMenuImageCleared => model.wizard.clear_menu_image(),
            Event::PickerAnalyzeRequested => match model.wizard.begin_analysis() {
                Ok(request) => {
                    let seq = model.requests.issue(Slot::CanteenPick);
                    caps.inference.generate(request, move |result| {
                        Event::CanteenPickSettled {
                            seq,
                            result: Box::new(result),
                        }
                    });
                }
                Err(error) => model.wizard.validation_message = Some(error.to_string()),
            },
            Event::CanteenPickSettled { seq, result } => {
                self.settle(model, Slot::CanteenPick, seq, *result);
            }
            Event::PickerFallbackOpened => {
                if let Err(error) = model.wizard.open_fallback() {
                    model.wizard.validation_message = Some(error.to_string());
                }
            }
            Event::FallbackKitchenAnswered(kitchen) => {
                model.wizard.fallback_answers.kitchen = Some(kitchen);
            }
            Event::FallbackTimeAnswered(time) => {
                model.wizard.fallback_answers.time = Some(time);
            }
            Event::FallbackEnergyAnswered(energy) => {
                model.wizard.fallback_answers.energy = Some(energy);
            }
            Event::FallbackGenerateRequested => match model.wizard.fallback_request() {
                Ok(request) => {
                    let seq = model.requests.issue(Slot::CookAtHome);
                    caps.inference.generate(request, move |result| {
                        Event::CookAtHomeSettled {
                            seq,
                            result: Box::new(result),
                        }
                    });
                }
                Err(error) => model.wizard.validation_message = Some(error.to_string()),
            },
            Event::CookAtHomeSettled { seq, result } => {
                self.settle(model, Slot::CookAtHome, seq, *result);
            }
            Event::PickerReset => {
                model.wizard.reset();
                model.requests.clear_outcomes();
            }

            Event::InferenceTimedOut { slot } => {
                if model.requests.time_out(slot) {
                    let error = AppError::new(ErrorKind::Timeout, "inference timed out");
                    self.record_failure(model, slot, &error);
                }
            }

            Event::DismissError => model.active_error = None,
        }

        caps.render.render();
    }

    fn view(&self, model: &Self::Model) -> Self::ViewModel {
        let state = match model.screen {
            Screen::Home => ViewState::Home,
            Screen::EatNow => ViewState::EatNow(self.eat_now_view(model)),
            Screen::CanteenPicker => ViewState::CanteenPicker(self.picker_view(model)),
        };
        ViewModel {
            screen: model.screen,
            state,
            error: model.active_error.as_ref().map(UserFacingError::from),
        }
    }
}

impl App {
    /// Routes a settled inference result through the coordinator and, when
    /// it is current, into domain state. Stale results never get this far.
    fn settle(&self, model: &mut Model, slot: Slot, seq: u64, result: InferenceResult) {
        let converted = convert(slot, result);
        if model.requests.on_settled(slot, seq, converted.clone()) == SettleDisposition::Superseded
        {
            return;
        }
        match (slot, converted) {
            (Slot::MealAnalysis, Ok(InferenceResponse::MealAnalysis(analysis))) => {
                model.meal.clear_analysis();
                model.meal.analysis = Some(analysis);
            }
            (Slot::Simulation, Ok(InferenceResponse::Simulation(simulation))) => {
                model.meal.simulation = Some(simulation);
            }
            (Slot::CanteenPick, Ok(InferenceResponse::CanteenPick(result))) => {
                model.wizard.analysis_succeeded(result);
            }
            (Slot::PointExplanation, Ok(InferenceResponse::PointExplanation(explanation))) => {
                model.meal.point_explanation = Some(explanation);
            }
            (Slot::CookAtHome, Ok(InferenceResponse::CookAtHome(idea))) => {
                model.wizard.fallback_ready(idea);
            }
            (slot, Err(error)) => self.record_failure(model, slot, &error),
            (slot, Ok(other)) => {
                tracing::error!(slot = slot.as_str(), ?other, "response kind mismatch");
                model.active_error = Some(AppError::new(
                    ErrorKind::Internal,
                    "response did not match the request",
                ));
            }
        }
    }

    /// Failures on the picker's slots attach to the wizard step; the eat-now
    /// slots surface through the global error banner.
    fn record_failure(&self, model: &mut Model, slot: Slot, error: &AppError) {
        match slot {
            Slot::CanteenPick => model.wizard.analysis_failed(error.user_facing_message()),
            Slot::CookAtHome => model.wizard.fallback_failed(error.user_facing_message()),
            Slot::MealAnalysis | Slot::Simulation | Slot::PointExplanation => {
                model.active_error = Some(error.clone());
            }
        }
    }

    fn eat_now_view(&self, model: &Model) -> EatNowView {
        let timeline_points = model
            .meal
            .analysis
            .as_ref()
            .map(|analysis| {
                let series = &analysis.after_effect_timeline;
                let xs = model.meal.timeline_layout.project(series);
                series
                    .iter()
                    .zip(xs)
                    .map(|(point, x)| TimelinePoint {
                        x,
                        energy_y: score_to_y(point.energy_score),
                        focus_y: score_to_y(point.focus_score),
                        digestion_y: score_to_y(point.digestion_score),
                    })
                    .collect()
            })
            .unwrap_or_default();

        EatNowView {
            has_photo: model.meal.staged_image.is_some(),
            goal: model.meal.goal,
            analyzing: model.requests.is_pending(Slot::MealAnalysis),
            analysis: model.meal.analysis.clone(),
            timeline_points,
            active_point_index: model.meal.timeline_cursor.active_index(),
            simulating: model.requests.is_pending(Slot::Simulation),
            simulation: model.meal.simulation.clone(),
            explaining: model.requests.is_pending(Slot::PointExplanation),
            point_explanation: model.meal.point_explanation.clone(),
        }
    }

    fn picker_view(&self, model: &Model) -> PickerView {
        PickerView {
            step: model.wizard.step(),
            goal: model.wizard.goal,
            budget: model.wizard.budget.clone(),
            has_food_image: model.wizard.food_image.is_some(),
            has_menu_image: model.wizard.menu_image.is_some(),
            validation_message: model.wizard.validation_message.clone(),
            analyzing: model.requests.is_pending(Slot::CanteenPick),
            result: model.wizard.result.clone(),
            fallback_offered: model
                .wizard
                .result
                .as_ref()
                .is_some_and(|r| r.trigger_fallback),
            fallback_answers: model.wizard.fallback_answers,
            generating: model.requests.is_pending(Slot::CookAtHome),
            fallback_idea: model.wizard.fallback_idea.clone(),
        }
    }
}

/// Parses the shell's raw result against the slot's schema. Any failure
/// collapses into a single error for the slot.
fn convert(slot: Slot, result: InferenceResult) -> Result<InferenceResponse, AppError> {
    let InferenceOutput::Completed { body } = result.map_err(AppError::from)?;
    let response = match slot {
        Slot::MealAnalysis => InferenceResponse::MealAnalysis(schema::parse_meal_analysis(&body)?),
        Slot::Simulation => InferenceResponse::Simulation(schema::parse_simulation(&body)?),
        Slot::CanteenPick => InferenceResponse::CanteenPick(schema::parse_canteen_analysis(&body)?),
        Slot::PointExplanation => {
            InferenceResponse::PointExplanation(schema::parse_point_explanation(&body)?)
        }
        Slot::CookAtHome => InferenceResponse::CookAtHome(schema::parse_cook_at_home(&body)?),
    };
    Ok(response)
}

fn score_to_y(score: u8) -> f64 {
    crate::GRAPH_VIEWBOX_HEIGHT * (1.0 - f64::from(score) / f64::from(crate::SCORE_MAX))
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViewModel {
    pub screen: Screen,
    pub state: ViewState,
    pub error: Option<UserFacingError>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ViewState {
    Home,
    EatNow(EatNowView),
    CanteenPicker(PickerView),
}

/// One rendered point of the after-effect graph, in viewbox units.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimelinePoint {
    pub x: f64,
    pub energy_y: f64,
    pub focus_y: f64,
    pub digestion_y: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EatNowView {
    pub has_photo: bool,
    pub goal: Option<crate::request::HealthGoal>,
    pub analyzing: bool,
    pub analysis: Option<MealAnalysis>,
    pub timeline_points: Vec<TimelinePoint>,
    pub active_point_index: Option<usize>,
    pub simulating: bool,
    pub simulation: Option<SimulationResult>,
    pub explaining: bool,
    pub point_explanation: Option<PointExplanation>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PickerView {
    pub step: PickerStep,
    pub goal: Option<crate::request::CanteenGoal>,
    pub budget: String,
    pub has_food_image: bool,
    pub has_menu_image: bool,
    pub validation_message: Option<String>,
    pub analyzing: bool,
    pub result: Option<CanteenAnalysis>,
    pub fallback_offered: bool,
    pub fallback_answers: crate::request::FallbackAnswers,
    pub generating: bool,
    pub fallback_idea: Option<CookAtHomeIdea>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserFacingError {
    pub code: String,
    pub message: String,
    pub retryable: bool,
}

impl From<&AppError> for UserFacingError {
    fn from(error: &AppError) -> Self {
        Self {
            code: error.code().to_string(),
            message: error.user_facing_message(),
            retryable: error.is_retryable(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capabilities::Effect;
    use crate::request::HealthGoal;
    use crux_core::testing::AppTester;

    #[test]
    fn test_analyze_without_photo_sets_validation_error() {
        let app = AppTester::<App, Effect>::default();
        let mut model = Model::default();

        app.update(Event::AnalyzeMealRequested, &mut model);
        let error = model.active_error.as_ref().unwrap();
        assert_eq!(error.kind, ErrorKind::Validation);
        assert_eq!(model.requests.current_seq(Slot::MealAnalysis), 0);
    }

    #[test]
    fn test_analyze_issues_inference_effect() {
        let app = AppTester::<App, Effect>::default();
        let mut model = Model::default();

        app.update(
            Event::MealPhotoStaged {
                bytes: vec![1, 2, 3],
                mime_type: "image/jpeg".into(),
            },
            &mut model,
        );
        app.update(
            Event::MealGoalSelected(HealthGoal::MaintainEnergy),
            &mut model,
        );
        let update = app.update(Event::AnalyzeMealRequested, &mut model);

        assert_eq!(model.requests.current_seq(Slot::MealAnalysis), 1);
        assert!(model.requests.is_pending(Slot::MealAnalysis));
        assert!(update
            .effects
            .iter()
            .any(|e| matches!(e, Effect::Inference(_))));
        assert!(update.effects.iter().any(|e| matches!(e, Effect::Render(_))));
    }

    #[test]
    fn test_every_update_renders() {
        let app = AppTester::<App, Effect>::default();
        let mut model = Model::default();
        let update = app.update(Event::HomeOpened, &mut model);
        assert!(update.effects.iter().any(|e| matches!(e, Effect::Render(_))));
    }

    #[test]
    fn test_dismiss_error_clears_banner() {
        let app = AppTester::<App, Effect>::default();
        let mut model = Model::default();
        model.active_error = Some(AppError::new(ErrorKind::Transport, "offline"));

        app.update(Event::DismissError, &mut model);
        assert!(model.active_error.is_none());
        assert!(app.view(&model).error.is_none());
    }
}
