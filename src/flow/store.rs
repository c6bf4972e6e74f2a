//! Step definition store — a validated, ordered step list with runtime
//! option injection.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use crate::error::FlowError;
use crate::flow::step::{NextStep, StepDescriptor, StepKind};

/// Ordered, read-only collection of step descriptors for one flow.
///
/// The only mutation allowed after construction is option injection:
/// suggestion lists arrive from the gateway while the user is still on
/// earlier steps, and replace a step's options without touching its id or
/// position.
#[derive(Debug)]
pub struct StepStore {
    steps: Vec<StepDescriptor>,
    index: HashMap<String, usize>,
    injected: RwLock<HashMap<String, Vec<String>>>,
}

impl StepStore {
    /// Build a store, checking id uniqueness, `Goto` targets, and the
    /// presence of a terminal step.
    pub fn new(steps: Vec<StepDescriptor>) -> Result<Self, FlowError> {
        if steps.is_empty() {
            return Err(FlowError::Definition("flow has no steps".to_string()));
        }
        let mut index = HashMap::new();
        for (pos, step) in steps.iter().enumerate() {
            if index.insert(step.id.clone(), pos).is_some() {
                return Err(FlowError::Definition(format!(
                    "duplicate step id {:?}",
                    step.id
                )));
            }
        }
        for step in &steps {
            if let NextStep::Goto(target) = &step.next {
                if !index.contains_key(target) {
                    return Err(FlowError::Definition(format!(
                        "step {:?} jumps to unknown step {:?}",
                        step.id, target
                    )));
                }
            }
        }
        if !steps.iter().any(|s| s.kind == StepKind::Terminal) {
            return Err(FlowError::Definition(
                "flow has no terminal step".to_string(),
            ));
        }
        Ok(Self {
            steps,
            index,
            injected: RwLock::new(HashMap::new()),
        })
    }

    pub fn initial_step_id(&self) -> &str {
        &self.steps[0].id
    }

    /// Look up a step by id, with any injected options applied.
    pub fn step(&self, id: &str) -> Option<StepDescriptor> {
        let pos = *self.index.get(id)?;
        let mut step = self.steps[pos].clone();
        let injected = self
            .injected
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        if let Some(options) = injected.get(id) {
            step.options = options.clone();
        }
        Some(step)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    pub fn is_terminal(&self, id: &str) -> bool {
        self.index
            .get(id)
            .is_some_and(|&pos| self.steps[pos].kind == StepKind::Terminal)
    }

    /// Ordinal position of a step within the flow.
    pub fn position(&self, id: &str) -> Option<usize> {
        self.index.get(id).copied()
    }

    /// The positional successor of a step, if any.
    pub fn successor(&self, id: &str) -> Option<&str> {
        let pos = *self.index.get(id)?;
        self.steps.get(pos + 1).map(|s| s.id.as_str())
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Replace a step's options at runtime. Empty lists are ignored so a
    /// choice step never ends up with zero options.
    pub fn inject_options(&self, id: &str, options: Vec<String>) {
        if options.is_empty() {
            tracing::warn!(step = id, "ignoring empty option injection");
            return;
        }
        if !self.contains(id) {
            tracing::warn!(step = id, "option injection for unknown step");
            return;
        }
        self.injected
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id.to_string(), options);
    }
}
