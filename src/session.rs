//! Session identity and flow seeding.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::flow::ledger::AnswerValue;

/// Identity for one flow instance.
///
/// The phone number is the backend's opaque user key. It is handed to the
/// engine at construction time; nothing in the engine reads it from
/// ambient state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionContext {
    phone_number: String,
}

impl SessionContext {
    /// Normalize and validate a raw phone number.
    ///
    /// Strips formatting characters and expects a 10-digit mobile number
    /// starting with 6, 7, 8, or 9.
    pub fn new(raw_phone: &str) -> Result<Self, ConfigError> {
        let digits: String = raw_phone.chars().filter(char::is_ascii_digit).collect();
        if digits.len() != 10 || !digits.starts_with(['6', '7', '8', '9']) {
            return Err(ConfigError::InvalidValue {
                key: "phone_number".to_string(),
                message: "expected a 10-digit mobile number starting with 6, 7, 8, or 9"
                    .to_string(),
            });
        }
        Ok(Self {
            phone_number: digits,
        })
    }

    pub fn phone_number(&self) -> &str {
        &self.phone_number
    }
}

/// Out-of-band hints used to seed a flow run.
///
/// Carries the `start_from` hint (the server already has the user's basic
/// profile, jump to the risk questions), ledger entries known before the
/// run starts, and the resource id a follow-up flow revolves around.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FlowSeed {
    /// Start at this step instead of the flow's first step.
    pub start_from: Option<String>,
    /// Ledger entries recorded before the first prompt.
    pub entries: Vec<(String, AnswerValue)>,
    /// Resource id carried over from a prior submission.
    pub resource_id: Option<String>,
}

impl FlowSeed {
    /// Seed that skips ahead to the given step.
    pub fn start_from(step_id: impl Into<String>) -> Self {
        Self {
            start_from: Some(step_id.into()),
            ..Self::default()
        }
    }

    /// Seed for a follow-up flow centered on a created resource.
    pub fn for_resource(resource_id: impl Into<String>) -> Self {
        Self {
            resource_id: Some(resource_id.into()),
            ..Self::default()
        }
    }

    /// Add a pre-set ledger entry.
    pub fn with_entry(mut self, step_id: impl Into<String>, value: AnswerValue) -> Self {
        self.entries.push((step_id.into(), value));
        self
    }
}
