//! Capability for remote AI inference.
//!
//! The core never talks to the model service itself. It hands the shell an
//! [`InferenceOperation`] carrying the full request (prompt, images, an op id
//! for log correlation) and gets back either the raw response body or an
//! [`InferenceError`]. Parsing and validation happen in the core so every
//! shell stays a dumb pipe.

use crux_core::capability::{Capability, CapabilityContext, Operation};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::request::InferenceRequest;

#[derive(Clone)]
pub struct Inference<E> {
    context: CapabilityContext<InferenceOperation, E>,
}

impl<Ev> Capability<Ev> for Inference<Ev> {
    type Operation = InferenceOperation;
    type MappedSelf<MappedEv> = Inference<MappedEv>;

    fn map_event<F, NewEv>(&self, f: F) -> Self::MappedSelf<NewEv>
    where
        F: Fn(NewEv) -> Ev + Send + Sync + 'static,
        Ev: 'static,
        NewEv: 'static + Send,
    {
        Inference::new(self.context.map_event(f))
    }
}

impl<E> Inference<E>
where
    E: 'static,
{
    pub fn new(context: CapabilityContext<InferenceOperation, E>) -> Self {
        Self { context }
    }

    /// Sends `request` to the model service. The callback turns the shell's
    /// result into the settle event for the issuing slot.
    pub fn generate<F>(&self, request: InferenceRequest, callback: F)
    where
        F: FnOnce(InferenceResult) -> E + Send + 'static,
    {
        let operation = InferenceOperation {
            op_id: Uuid::new_v4().to_string(),
            prompt: request.prompt(),
            request,
        };
        tracing::debug!(
            op_id = %operation.op_id,
            kind = operation.request.kind_name(),
            "requesting inference"
        );
        let context = self.context.clone();
        self.context.spawn(async move {
            let result = context.request_from_shell(operation).await;
            context.update_app(callback(result));
        });
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InferenceOperation {
    /// Correlates shell-side logs with core-side decisions.
    pub op_id: String,
    pub request: InferenceRequest,
    /// Prebuilt instruction text so shells never compose prompts.
    pub prompt: String,
}

impl Operation for InferenceOperation {
    type Output = InferenceResult;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum InferenceOutput {
    /// The raw response body, expected to be JSON matching the call's schema.
    Completed { body: String },
}

#[derive(Debug, Clone, Error, PartialEq, Eq, Serialize, Deserialize)]
pub enum InferenceError {
    #[error("network failure: {message}")]
    Network { message: String },

    #[error("the model service did not answer in time")]
    TimedOut,

    #[error("the model returned an empty response")]
    EmptyResponse,

    #[error("the model service rejected the request: {reason}")]
    RequestRejected { reason: String },

    #[error("inference is not available on this device")]
    Unavailable,
}

pub type InferenceResult = Result<InferenceOutput, InferenceError>;
