mod inference;

pub use self::inference::{
    Inference, InferenceError, InferenceOperation, InferenceOutput, InferenceResult,
};

pub use crux_core::render::Render;

use crate::app::App;
use crate::event::Event;

pub type AppRender = Render<Event>;
pub type AppInference = Inference<Event>;

#[derive(crux_core::macros::Effect)]
pub struct Capabilities {
    pub render: Render<Event>,
    pub inference: Inference<Event>,
}
