//! Flow interpreter — walks a step list, validates input, accumulates
//! answers, and hands the finished ledger to the submission coordinator.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::FlowError;
use crate::flow::ledger::{AnswerLedger, AnswerValue};
use crate::flow::step::{NextStep, OptionSource, StepDescriptor, StepKind};
use crate::flow::submit::{SubmissionCoordinator, SubmissionOutcome};
use crate::flow::validate::{ValidationOutcome, ValidatorRegistry};
use crate::flow::FlowSpec;
use crate::gateway::BackendGateway;
use crate::session::{FlowSeed, SessionContext};

/// Where a flow run currently stands.
#[derive(Debug, Clone, PartialEq)]
pub enum FlowStatus {
    InProgress,
    Submitting,
    Succeeded,
    Failed(String),
    AwaitingRetry,
}

impl std::fmt::Display for FlowStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::InProgress => "in_progress",
            Self::Submitting => "submitting",
            Self::Succeeded => "succeeded",
            Self::Failed(_) => "failed",
            Self::AwaitingRetry => "awaiting_retry",
        };
        write!(f, "{s}")
    }
}

/// Mutable state of one flow run. Owned and mutated by the engine only.
#[derive(Debug, Clone)]
pub struct FlowState {
    pub current_step_id: String,
    pub ledger: AnswerLedger,
    pub status: FlowStatus,
}

/// A finished run kept for audit. Readable, never re-editable.
#[derive(Debug, Clone)]
pub struct CompletedRun {
    pub run_id: Uuid,
    pub flow_id: String,
    pub ledger: AnswerLedger,
    pub completed_at: DateTime<Utc>,
}

/// What a transition produced, for the presentation surface.
#[derive(Debug, Clone)]
pub enum EngineEvent {
    /// Advanced to a new step.
    Prompt {
        step_id: String,
        prompt: String,
        options: Vec<String>,
    },
    /// Input rejected; same step, show the message.
    Rejected { message: String },
    /// Submission succeeded and a follow-up flow began.
    Chained {
        flow_id: String,
        step_id: String,
        prompt: String,
        options: Vec<String>,
    },
    /// The run finished successfully.
    Succeeded { payload: serde_json::Value },
    /// Submission failed recoverably; `retry()` resubmits as-is.
    AwaitingRetry { message: String },
    /// Submission failed for good; only `start()` recovers.
    Failed { message: String },
}

/// The state machine driving one conversational flow at a time.
///
/// Constructed with everything it will ever read: the flow table, the
/// session identity, and the gateway. Abandoning a run is dropping the
/// engine; an in-flight submission completes with its caller and its
/// outcome goes with it.
pub struct FlowEngine {
    flows: HashMap<String, Arc<FlowSpec>>,
    active: Arc<FlowSpec>,
    session: SessionContext,
    seed: FlowSeed,
    gateway: Arc<dyn BackendGateway>,
    validators: ValidatorRegistry,
    coordinator: SubmissionCoordinator,
    state: FlowState,
    run_id: Uuid,
    pending_selection: Vec<String>,
    archive: Vec<CompletedRun>,
}

impl FlowEngine {
    pub fn new(
        flows: HashMap<String, Arc<FlowSpec>>,
        initial_flow: &str,
        session: SessionContext,
        gateway: Arc<dyn BackendGateway>,
    ) -> Result<Self, FlowError> {
        let active = flows
            .get(initial_flow)
            .cloned()
            .ok_or_else(|| FlowError::Definition(format!("unknown flow {initial_flow:?}")))?;
        let initial_step = active.store.initial_step_id().to_string();
        Ok(Self {
            flows,
            active,
            session,
            seed: FlowSeed::default(),
            gateway: Arc::clone(&gateway),
            validators: ValidatorRegistry::new(),
            coordinator: SubmissionCoordinator::new(gateway),
            state: FlowState {
                current_step_id: initial_step,
                ledger: AnswerLedger::new(),
                status: FlowStatus::InProgress,
            },
            run_id: Uuid::new_v4(),
            pending_selection: Vec::new(),
            archive: Vec::new(),
        })
    }

    /// Begin a fresh run from the flow's first step.
    pub async fn start(&mut self) -> Result<EngineEvent, FlowError> {
        self.start_seeded(FlowSeed::default()).await
    }

    /// Begin a run with out-of-band hints: a non-default initial step
    /// and/or pre-set ledger entries. The ledger is cleared wholesale
    /// first; a restart never keeps partial answers.
    pub async fn start_seeded(&mut self, seed: FlowSeed) -> Result<EngineEvent, FlowError> {
        let initial = seed
            .start_from
            .clone()
            .unwrap_or_else(|| self.active.store.initial_step_id().to_string());
        if !self.active.store.contains(&initial) {
            return Err(FlowError::Definition(format!(
                "seed start step {initial:?} is not in flow {:?}",
                self.active.id
            )));
        }
        self.run_id = Uuid::new_v4();
        self.state.ledger.clear();
        self.pending_selection.clear();
        for (step_id, value) in &seed.entries {
            self.state.ledger.record(step_id.clone(), value.clone())?;
        }
        self.seed = seed;
        self.state.status = FlowStatus::InProgress;
        tracing::debug!(flow = %self.active.id, run = %self.run_id, step = %initial, "flow started");
        self.enter_step(initial).await
    }

    // ── Queries ─────────────────────────────────────────────────────

    /// The step the flow is on, safe to call in any status (during
    /// `Submitting` it is the terminal step).
    pub fn current_step(&self) -> Result<StepDescriptor, FlowError> {
        self.active
            .store
            .step(&self.state.current_step_id)
            .ok_or_else(|| {
                FlowError::Definition(format!(
                    "current step {:?} missing from flow {:?}",
                    self.state.current_step_id, self.active.id
                ))
            })
    }

    /// The current prompt, rendered against recorded answers.
    pub fn prompt(&self) -> Result<String, FlowError> {
        Ok(self.current_step()?.render_prompt(&self.state.ledger))
    }

    pub fn status(&self) -> &FlowStatus {
        &self.state.status
    }

    pub fn flow_id(&self) -> &str {
        &self.active.id
    }

    pub fn ledger(&self) -> &AnswerLedger {
        &self.state.ledger
    }

    /// Options currently toggled on a multi-select step.
    pub fn selection(&self) -> &[String] {
        &self.pending_selection
    }

    /// Finished runs, oldest first.
    pub fn runs(&self) -> &[CompletedRun] {
        &self.archive
    }

    pub fn session(&self) -> &SessionContext {
        &self.session
    }

    // ── Transitions ─────────────────────────────────────────────────

    /// Validate and record an answer for the current step, then advance.
    ///
    /// Refused outside `InProgress`; in particular a second submit while a
    /// submission is in flight bounces off the `Submitting` status.
    pub async fn submit_answer(&mut self, raw: &str) -> Result<EngineEvent, FlowError> {
        self.ensure_in_progress()?;
        let step = self.current_step()?;
        match step.kind {
            StepKind::Terminal => Err(FlowError::Definition(format!(
                "input submitted on terminal step {:?}",
                step.id
            ))),
            StepKind::ChoiceMulti => Err(FlowError::ExpectsToggle { step: step.id }),
            StepKind::Welcome => self.advance(&step, None).await,
            _ => match self.validators.validate(step.rule, raw, &step.options) {
                ValidationOutcome::Rejected(message) => {
                    tracing::debug!(step = %step.id, "input rejected: {message}");
                    Ok(EngineEvent::Rejected { message })
                }
                ValidationOutcome::Accepted(value) => self.advance(&step, Some(value)).await,
            },
        }
    }

    /// Toggle one option on a multi-select step. Does not advance.
    /// Toggling the same option twice restores the prior selection set.
    pub fn toggle_option(&mut self, option: &str) -> Result<&[String], FlowError> {
        self.ensure_in_progress()?;
        let step = self.current_step()?;
        if step.kind != StepKind::ChoiceMulti {
            return Err(FlowError::NotMultiSelect { step: step.id });
        }
        if !step.options.iter().any(|o| o == option) {
            return Err(FlowError::UnknownOption {
                step: step.id,
                option: option.to_string(),
            });
        }
        match self.pending_selection.iter().position(|s| s == option) {
            Some(pos) => {
                self.pending_selection.remove(pos);
            }
            None => self.pending_selection.push(option.to_string()),
        }
        Ok(&self.pending_selection)
    }

    /// Record the toggled selection set and advance. Requires at least
    /// one selection (the "Done" button stays gated until then).
    pub async fn confirm_selection(&mut self) -> Result<EngineEvent, FlowError> {
        self.ensure_in_progress()?;
        let step = self.current_step()?;
        if step.kind != StepKind::ChoiceMulti {
            return Err(FlowError::NotMultiSelect { step: step.id });
        }
        if self.pending_selection.is_empty() {
            return Err(FlowError::EmptySelection { step: step.id });
        }
        match self
            .validators
            .validate_selections(&self.pending_selection, &step.options)
        {
            ValidationOutcome::Rejected(message) => Ok(EngineEvent::Rejected { message }),
            ValidationOutcome::Accepted(value) => {
                self.pending_selection.clear();
                self.advance(&step, Some(value)).await
            }
        }
    }

    /// Resubmit the same ledger snapshot after a recoverable failure.
    /// No questions are re-asked.
    pub async fn retry(&mut self) -> Result<EngineEvent, FlowError> {
        if self.state.status != FlowStatus::AwaitingRetry {
            return Err(FlowError::RetryUnavailable);
        }
        tracing::info!(flow = %self.active.id, run = %self.run_id, "retrying submission");
        self.submit().await
    }

    // ── Internals ───────────────────────────────────────────────────

    fn ensure_in_progress(&self) -> Result<(), FlowError> {
        if self.state.status != FlowStatus::InProgress {
            return Err(FlowError::NotAcceptingInput {
                status: self.state.status.to_string(),
            });
        }
        Ok(())
    }

    async fn advance(
        &mut self,
        step: &StepDescriptor,
        value: Option<AnswerValue>,
    ) -> Result<EngineEvent, FlowError> {
        if let Some(value) = value {
            if let Err(e) = self.state.ledger.record(step.id.clone(), value) {
                tracing::error!(step = %step.id, "duplicate answer: {e}");
                return Err(e.into());
            }
        }
        let next_id = match &step.next {
            NextStep::Linear => self
                .active
                .store
                .successor(&step.id)
                .ok_or_else(|| {
                    FlowError::Definition(format!("step {:?} has no successor", step.id))
                })?
                .to_string(),
            NextStep::Goto(target) => target.clone(),
            NextStep::Branch(rule) => rule(&self.state.ledger),
        };
        if !self.active.store.contains(&next_id) {
            // A branch rule produced an id outside the flow. This is a
            // flow-definition bug, not a user condition.
            return Err(FlowError::Definition(format!(
                "step {:?} resolved to unknown step {next_id:?}",
                step.id
            )));
        }
        if self.active.store.is_terminal(&next_id) {
            self.state.current_step_id = next_id;
            self.submit().await
        } else {
            self.enter_step(next_id).await
        }
    }

    async fn enter_step(&mut self, step_id: String) -> Result<EngineEvent, FlowError> {
        self.state.current_step_id = step_id.clone();
        self.pending_selection.clear();
        let step = self.current_step()?;
        self.load_options(&step).await;
        // Re-read: the options may have just been replaced.
        let step = self.current_step()?;
        Ok(EngineEvent::Prompt {
            step_id,
            prompt: step.render_prompt(&self.state.ledger),
            options: step.options,
        })
    }

    /// Fetch dynamic options for a step. Failures fall back to the
    /// descriptor's static list and never block the user.
    async fn load_options(&self, step: &StepDescriptor) {
        match &step.option_source {
            OptionSource::Static => {}
            OptionSource::Suggestions(prompt_key) => {
                match self.gateway.fetch_options(prompt_key).await {
                    Ok(options) => self.active.store.inject_options(&step.id, options),
                    Err(e) => {
                        tracing::warn!(step = %step.id, "suggestion fetch failed, using defaults: {e}");
                    }
                }
            }
            OptionSource::FollowUp => {
                let Some(resource_id) = self.seed.resource_id.as_deref() else {
                    tracing::warn!(step = %step.id, "no seeded resource id for follow-up options");
                    return;
                };
                match self.gateway.fetch_follow_up(resource_id).await {
                    Ok(reply) if reply.is_success() => {
                        let options = parse_follow_up_options(&reply.body);
                        if options.is_empty() {
                            tracing::warn!(step = %step.id, "follow-up reply had no funds, using defaults");
                        } else {
                            self.active.store.inject_options(&step.id, options);
                        }
                    }
                    Ok(reply) => {
                        tracing::warn!(step = %step.id, status = reply.status, "follow-up fetch refused, using defaults");
                    }
                    Err(e) => {
                        tracing::warn!(step = %step.id, "follow-up fetch failed, using defaults: {e}");
                    }
                }
            }
        }
    }

    async fn submit(&mut self) -> Result<EngineEvent, FlowError> {
        self.state.status = FlowStatus::Submitting;
        let outcome = self
            .coordinator
            .submit(&self.active, &self.session, &self.seed, &self.state.ledger)
            .await;
        self.apply_outcome(outcome).await
    }

    async fn apply_outcome(
        &mut self,
        outcome: SubmissionOutcome,
    ) -> Result<EngineEvent, FlowError> {
        match outcome {
            SubmissionOutcome::Success { payload } => {
                self.state.status = FlowStatus::Succeeded;
                self.archive_run();
                Ok(EngineEvent::Succeeded { payload })
            }
            SubmissionOutcome::NeedsFollowUp { next_flow, seed } => {
                let spec = self.flows.get(&next_flow).cloned().ok_or_else(|| {
                    FlowError::Definition(format!("unknown follow-up flow {next_flow:?}"))
                })?;
                self.archive_run();
                self.active = spec;
                tracing::info!(flow = %self.active.id, "entering follow-up flow");
                match self.start_seeded(seed).await? {
                    EngineEvent::Prompt {
                        step_id,
                        prompt,
                        options,
                    } => Ok(EngineEvent::Chained {
                        flow_id: self.active.id.clone(),
                        step_id,
                        prompt,
                        options,
                    }),
                    other => Ok(other),
                }
            }
            SubmissionOutcome::RecoverableFailure { message } => {
                self.state.status = FlowStatus::AwaitingRetry;
                Ok(EngineEvent::AwaitingRetry { message })
            }
            SubmissionOutcome::FatalFailure { message } => {
                self.state.status = FlowStatus::Failed(message.clone());
                Ok(EngineEvent::Failed { message })
            }
        }
    }

    fn archive_run(&mut self) {
        self.archive.push(CompletedRun {
            run_id: self.run_id,
            flow_id: self.active.id.clone(),
            ledger: self.state.ledger.clone(),
            completed_at: Utc::now(),
        });
    }
}

/// Pull the fund names out of a recommendation follow-up body.
fn parse_follow_up_options(body: &str) -> Vec<String> {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| {
            v.get("funds")
                .and_then(serde_json::Value::as_array)
                .map(|a| {
                    a.iter()
                        .filter_map(|f| f.as_str().map(str::to_string))
                        .collect()
                })
        })
        .unwrap_or_default()
}
