//! The step-flow engine: step definitions, answer ledger, validators,
//! the interpreter, and the submission coordinator.

pub mod engine;
pub mod ledger;
pub mod step;
pub mod store;
pub mod submit;
pub mod validate;

pub use engine::{CompletedRun, EngineEvent, FlowEngine, FlowState, FlowStatus};
pub use ledger::{AnswerLedger, AnswerValue};
pub use step::{NextStep, OptionSource, StepDescriptor, StepKind};
pub use store::StepStore;
pub use submit::{SubmissionCoordinator, SubmissionOutcome};
pub use validate::{ValidationOutcome, ValidationRule, ValidatorRegistry};

use crate::session::{FlowSeed, SessionContext};

/// Builds the gateway request body from the session and the ledger.
///
/// Field names in the output are the server's, one-to-one; renames and
/// numeric coercion happen here, nowhere else.
pub type PayloadBuilder =
    fn(&SessionContext, &FlowSeed, &StepStore, &AnswerLedger) -> serde_json::Value;

/// One complete flow: its steps, where it submits, and what may follow.
pub struct FlowSpec {
    pub id: String,
    pub store: StepStore,
    /// Path the terminal submission posts to.
    pub endpoint: String,
    /// Flow chained into when the reply carries a follow-up condition.
    pub follow_up: Option<String>,
    pub build_payload: PayloadBuilder,
}
