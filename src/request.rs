//! Inference request construction.
//!
//! Each user-triggered AI call is described by an [`InferenceRequest`]: the
//! input payload plus the prompt the shell forwards to the hosted model.
//! Requests are immutable once created; the coordinator tags them with a
//! sequence number at issue time.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::coordinator::Slot;
use crate::schema::TimelineCheckpoint;
use crate::{AppError, ErrorKind, MAX_IMAGE_BYTES, SUPPORTED_IMAGE_MIME_TYPES};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HealthGoal {
    GeneralWellness,
    ReduceFatigue,
    AvoidBloating,
    ImproveSleep,
    MaintainEnergy,
}

impl HealthGoal {
    pub const ALL: [Self; 5] = [
        Self::GeneralWellness,
        Self::ReduceFatigue,
        Self::AvoidBloating,
        Self::ImproveSleep,
        Self::MaintainEnergy,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::GeneralWellness => "General Wellness",
            Self::ReduceFatigue => "Reduce Fatigue",
            Self::AvoidBloating => "Avoid Bloating",
            Self::ImproveSleep => "Improve Sleep",
            Self::MaintainEnergy => "Maintain Energy",
        }
    }
}

impl fmt::Display for HealthGoal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CanteenGoal {
    SustainEnergy,
    MaximumFocus,
    LightAndRecovery,
    BalancedAndHealthy,
    ComfortAndVariety,
}

impl CanteenGoal {
    pub const ALL: [Self; 5] = [
        Self::SustainEnergy,
        Self::MaximumFocus,
        Self::LightAndRecovery,
        Self::BalancedAndHealthy,
        Self::ComfortAndVariety,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::SustainEnergy => "Sustain Energy",
            Self::MaximumFocus => "Maximum Focus",
            Self::LightAndRecovery => "Light & Recovery",
            Self::BalancedAndHealthy => "Balanced & Healthy",
            Self::ComfortAndVariety => "Comfort & Variety",
        }
    }

    #[must_use]
    pub const fn tagline(self) -> &'static str {
        match self {
            Self::SustainEnergy => "Avoid the afternoon slump",
            Self::MaximumFocus => "Sharp mind for studying",
            Self::LightAndRecovery => "Easy digestion, post-workout",
            Self::BalancedAndHealthy => "Nutrient dense basics",
            Self::ComfortAndVariety => "Treat yourself safely",
        }
    }
}

impl fmt::Display for CanteenGoal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum KitchenAccess {
    Full,
    Limited,
    No,
}

impl KitchenAccess {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Full => "Full",
            Self::Limited => "Limited",
            Self::No => "No",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TimeAvailable {
    AboutTenMinutes,
    AboutThirtyMinutes,
    NoLimit,
}

impl TimeAvailable {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::AboutTenMinutes => "~10 min",
            Self::AboutThirtyMinutes => "~30 min",
            Self::NoLimit => "No limit",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EnergyLevel {
    Low,
    Medium,
    High,
}

impl EnergyLevel {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Low => "Low",
            Self::Medium => "Medium",
            Self::High => "High",
        }
    }
}

/// Answers for the cook-at-home fallback questions. All optional: an
/// unanswered question falls back to a fixed default at generate time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FallbackAnswers {
    pub kitchen: Option<KitchenAccess>,
    pub time: Option<TimeAvailable>,
    pub energy: Option<EnergyLevel>,
}

impl FallbackAnswers {
    #[must_use]
    pub fn kitchen_or_default(&self) -> KitchenAccess {
        self.kitchen.unwrap_or(KitchenAccess::Limited)
    }

    #[must_use]
    pub fn time_or_default(&self) -> TimeAvailable {
        self.time.unwrap_or(TimeAvailable::AboutTenMinutes)
    }

    #[must_use]
    pub fn energy_or_default(&self) -> EnergyLevel {
        self.energy.unwrap_or(EnergyLevel::Low)
    }
}

/// Image bytes plus mime type, as handed over by the shell.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageAttachment {
    #[serde(with = "serde_bytes")]
    pub bytes: Vec<u8>,
    pub mime_type: String,
}

impl ImageAttachment {
    pub fn new(bytes: Vec<u8>, mime_type: impl Into<String>) -> Result<Self, AppError> {
        let mime_type = mime_type.into();
        if bytes.is_empty() {
            return Err(AppError::new(ErrorKind::Validation, "The image is empty."));
        }
        if bytes.len() > MAX_IMAGE_BYTES {
            return Err(AppError::new(ErrorKind::ImageTooLarge, "image too large")
                .with_internal(format!("{} bytes", bytes.len())));
        }
        if !SUPPORTED_IMAGE_MIME_TYPES.contains(&mime_type.as_str()) {
            return Err(
                AppError::new(ErrorKind::ImageFormatUnsupported, "unsupported format")
                    .with_internal(mime_type),
            );
        }
        Ok(Self { bytes, mime_type })
    }
}

// Redact the payload: image bytes are user data and huge.
impl fmt::Debug for ImageAttachment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImageAttachment")
            .field("bytes_len", &self.bytes.len())
            .field("mime_type", &self.mime_type)
            .finish()
    }
}

/// Context carried from a prior meal analysis into a simulation call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimulationContext {
    pub detected_foods: Vec<String>,
    pub nutritional_risks: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum InferenceRequest {
    MealAnalysis {
        image: ImageAttachment,
        goal: HealthGoal,
    },
    Simulation {
        context: SimulationContext,
        target_item: String,
    },
    CanteenPick {
        food_image: ImageAttachment,
        menu_image: Option<ImageAttachment>,
        goal: CanteenGoal,
        budget: String,
    },
    PointExplanation {
        checkpoint: TimelineCheckpoint,
        detected_foods: Vec<String>,
    },
    CookAtHome {
        goal: CanteenGoal,
        kitchen: KitchenAccess,
        time: TimeAvailable,
        energy: EnergyLevel,
    },
}

impl InferenceRequest {
    #[must_use]
    pub const fn slot(&self) -> Slot {
        match self {
            Self::MealAnalysis { .. } => Slot::MealAnalysis,
            Self::Simulation { .. } => Slot::Simulation,
            Self::CanteenPick { .. } => Slot::CanteenPick,
            Self::PointExplanation { .. } => Slot::PointExplanation,
            Self::CookAtHome { .. } => Slot::CookAtHome,
        }
    }

    #[must_use]
    pub const fn kind_name(&self) -> &'static str {
        self.slot().as_str()
    }

    /// The instruction text sent alongside the input payload. The shell
    /// forwards it verbatim together with any attached images and asks the
    /// model for JSON only.
    #[must_use]
    pub fn prompt(&self) -> String {
        match self {
            Self::MealAnalysis { goal, .. } => format!(
                "You are BiteAid, a supportive, privacy-first nutrition assistant.\n\
                 Analyze the food image provided. Do not calculate calories.\n\
                 Focus on qualitative impact and harm reduction.\n\n\
                 The user's specific wellness goal is: \"{goal}\".\n\
                 Tailor all advice, especially do_this and avoid_this, to directly support \"{goal}\".\n\n\
                 Output JSON only matching the agreed schema.\n\
                 - detected_foods: visible items with confidence (High/Medium/Low) based on visual clarity.\n\
                 - health_impact_level: Low (healthy/safe), Moderate (okay occasionally), High (adverse if frequent).\n\
                 - nutritional_risks: e.g. High Sodium, Added Sugar, Low Fiber, with confidence.\n\
                 - actionable_guidance: 2-3 specific, practical tips per category, each with confidence.\n\
                 - after_effect_timeline: exactly 3 checkpoints at \"30-60 mins\" (hour_offset 0.5),\n\
                   \"2-3 hours\" (hour_offset 2) and \"4-5 hours\" (hour_offset 4), each with\n\
                   energy_score, focus_score and digestion_score between 0 and 100,\n\
                   2-3 very simple feeling_indicators (no medical terms), a one-sentence plain-language\n\
                   description of the physiological reason, a confidence level and an optional recovery_tip.\n\
                 - brief_supportive_comment: one non-judgmental sentence."
            ),
            Self::Simulation {
                context,
                target_item,
            } => format!(
                "You are a nutritional simulation engine.\n\n\
                 The user is eating a meal containing: {}.\n\
                 Existing risks identified: {}.\n\n\
                 Simulate the nutritional impact if the user significantly reduces, removes or swaps\n\
                 the item: \"{target_item}\".\n\n\
                 Output JSON only with: a short title; exactly 3 qualitative metrics each with label,\n\
                 trend (increase/decrease/neutral) and a one-sentence impact_analysis; a general\n\
                 explanation sentence; explanation_confidence; and one realistic, easy swap_suggestion.",
                context.detected_foods.join(", "),
                context.nutritional_risks.join(", "),
            ),
            Self::CanteenPick { goal, budget, menu_image, .. } => {
                let budget_line = if budget.trim().is_empty() {
                    "No Limit / Not Provided".to_string()
                } else {
                    budget.clone()
                };
                let menu_line = if menu_image.is_some() {
                    "2. Image of menu/price list: attached, use it for budget checks."
                } else {
                    "2. Image of menu/price list: not provided."
                };
                format!(
                    "You are a structured decision engine for a canteen setting. You are a filter,\n\
                     not a chatbot.\n\n\
                     INPUT:\n\
                     1. Image of the food counter (visual evidence of options).\n\
                     {menu_line}\n\
                     3. User goal: \"{goal}\"\n\
                     4. User budget: \"{budget_line}\"\n\n\
                     Select ONE single pick that best fits the goal and budget.\n\
                     Budget rules: compare against prices from the menu image; if every option is\n\
                     strictly more expensive than the budget, pick the best relative option but set\n\
                     trigger_fallback to true and budget_fit to 0. Never fabricate a lower price.\n\
                     Also set trigger_fallback when no option supports the goal or the image is too\n\
                     poor to be confident.\n\n\
                     Output JSON only with: final_choice (name, short_justification of 6-8 words,\n\
                     optional price_estimate); decision_factors (goal_match, budget_fit and\n\
                     visual_clarity, each 0-100); rejected_alternatives (2-3 visible items with a\n\
                     brief reason); confidence_scores (recommendation and price, 0-100); and\n\
                     trigger_fallback."
                )
            }
            Self::PointExplanation {
                checkpoint,
                detected_foods,
            } => format!(
                "You are a nutrition educator. The user ate: {}.\n\
                 At {} after the meal (about {} hours) the projection shows energy {}, focus {},\n\
                 digestion {} and the user may feel: {}.\n\n\
                 Output JSON only with: insight (what is happening in one sentence),\n\
                 biological_reasoning (the plain-language mechanism) and practical_advice\n\
                 (one concrete thing to do about it).",
                detected_foods.join(", "),
                checkpoint.time_window,
                checkpoint.hour_offset,
                checkpoint.energy_score,
                checkpoint.focus_score,
                checkpoint.digestion_score,
                checkpoint.feeling_indicators.join(", "),
            ),
            Self::CookAtHome {
                goal,
                kitchen,
                time,
                energy,
            } => format!(
                "You are a student-friendly cooking assistant.\n\
                 User context: goal {goal}; kitchen access {kitchen}; time available {time};\n\
                 energy level {energy}.\n\n\
                 Generate ONE cook-at-home dish idea that fits these constraints.\n\
                 If kitchen access is No or Limited, suggest no-cook or microwave-only meals.\n\
                 If energy is Low, keep ingredients and steps minimal (assembly only).\n\
                 Tone: practical, encouraging, non-judgmental. No nutritional lecturing.\n\n\
                 Output JSON only with: dish_name, why_it_fits (one sentence), instructions\n\
                 (ordered steps) and an optional substitutions note.",
                goal = goal.as_str(),
                kitchen = kitchen.as_str(),
                time = time.as_str(),
                energy = energy.as_str(),
            ),
        }
    }
}
