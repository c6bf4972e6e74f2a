//! Submission coordinator — turns a finished ledger into a backend call
//! and classifies the reply into a terminal outcome.

use std::sync::Arc;

use serde_json::Value;

use crate::flow::ledger::AnswerLedger;
use crate::flow::FlowSpec;
use crate::gateway::{BackendGateway, GatewayReply};
use crate::session::{FlowSeed, SessionContext};

/// Terminal outcome of a submission.
#[derive(Debug, Clone)]
pub enum SubmissionOutcome {
    Success {
        payload: Value,
    },
    /// The reply carried a created-resource id and a recommendation flag;
    /// chain into the named flow, seeded with that id.
    NeedsFollowUp {
        next_flow: String,
        seed: FlowSeed,
    },
    /// Transport failure or non-2xx status; the same snapshot can be
    /// resubmitted.
    RecoverableFailure {
        message: String,
    },
    /// The server accepted the request and explicitly refused it.
    FatalFailure {
        message: String,
    },
}

/// What a 2xx body turned out to contain.
#[derive(Debug)]
enum ReplyShape {
    /// JSON we recognize as an accepted submission.
    Parsed(Value),
    /// Explicit failure indicator in the body.
    Failure(String),
    /// Created-resource id plus an availability flag.
    FollowUp { resource_id: String },
    /// 2xx but the body is not JSON.
    Unrecognized,
}

/// Performs the terminal call for a flow and classifies the raw reply.
pub struct SubmissionCoordinator {
    gateway: Arc<dyn BackendGateway>,
}

impl SubmissionCoordinator {
    pub fn new(gateway: Arc<dyn BackendGateway>) -> Self {
        Self { gateway }
    }

    /// Build the flow's payload, post it, and classify the reply.
    pub async fn submit(
        &self,
        spec: &FlowSpec,
        session: &SessionContext,
        seed: &FlowSeed,
        ledger: &AnswerLedger,
    ) -> SubmissionOutcome {
        let payload = (spec.build_payload)(session, seed, &spec.store, ledger);
        tracing::debug!(flow = %spec.id, endpoint = %spec.endpoint, "submitting");

        let reply = match self.gateway.create_resource(&spec.endpoint, &payload).await {
            Ok(reply) => reply,
            Err(e) => {
                tracing::warn!(flow = %spec.id, "submission transport failure: {e}");
                return SubmissionOutcome::RecoverableFailure {
                    message: "Unable to connect to the server. Please check your internet connection.".to_string(),
                };
            }
        };

        if !reply.is_success() {
            tracing::warn!(flow = %spec.id, status = reply.status, "submission refused");
            return SubmissionOutcome::RecoverableFailure {
                message: error_message(&reply),
            };
        }

        match classify(&reply.body) {
            ReplyShape::Parsed(body) => {
                tracing::info!(flow = %spec.id, "submission accepted");
                SubmissionOutcome::Success { payload: body }
            }
            ReplyShape::FollowUp { resource_id } => match &spec.follow_up {
                Some(next_flow) => {
                    tracing::info!(flow = %spec.id, follow_up = %next_flow, "submission accepted, follow-up available");
                    SubmissionOutcome::NeedsFollowUp {
                        next_flow: next_flow.clone(),
                        seed: FlowSeed::for_resource(resource_id),
                    }
                }
                None => {
                    tracing::warn!(flow = %spec.id, "reply offered a follow-up but the flow declares none");
                    SubmissionOutcome::Success {
                        payload: serde_json::json!({ "resource_id": resource_id }),
                    }
                }
            },
            ReplyShape::Failure(message) => {
                tracing::warn!(flow = %spec.id, "submission rejected by server: {message}");
                SubmissionOutcome::FatalFailure { message }
            }
            ReplyShape::Unrecognized => {
                // The server's contract: a 2xx with a body we can't parse
                // still counts as accepted.
                tracing::warn!(flow = %spec.id, "2xx reply with unparsable body, treating as success");
                SubmissionOutcome::Success {
                    payload: Value::Null,
                }
            }
        }
    }
}

/// Classify a 2xx body.
fn classify(body: &str) -> ReplyShape {
    let Ok(value) = serde_json::from_str::<Value>(body) else {
        return ReplyShape::Unrecognized;
    };

    if let Some(message) = failure_indicator(&value) {
        return ReplyShape::Failure(message);
    }

    let resource_id = value
        .get("goal_id")
        .or_else(|| value.get("resource_id"))
        .and_then(Value::as_str);
    let available = value
        .get("recommendation_available")
        .and_then(Value::as_bool)
        .unwrap_or(false);
    if let (Some(id), true) = (resource_id, available) {
        return ReplyShape::FollowUp {
            resource_id: id.to_string(),
        };
    }

    ReplyShape::Parsed(value)
}

/// An explicit failure marker in an otherwise-2xx body.
fn failure_indicator(value: &Value) -> Option<String> {
    if let Some(result) = value.get("result").and_then(Value::as_str) {
        if result.eq_ignore_ascii_case("error") {
            return Some(
                value
                    .get("message")
                    .and_then(Value::as_str)
                    .unwrap_or("The server rejected the request")
                    .to_string(),
            );
        }
    }
    value
        .get("error")
        .and_then(Value::as_str)
        .map(str::to_string)
}

/// Error text for a non-2xx reply, drawn from the body when parseable.
fn error_message(reply: &GatewayReply) -> String {
    serde_json::from_str::<Value>(&reply.body)
        .ok()
        .and_then(|v| {
            v.get("message")
                .or_else(|| v.get("error"))
                .and_then(Value::as_str)
                .map(str::to_string)
        })
        .unwrap_or_else(|| format!("Server error: {}", reply.status))
}
