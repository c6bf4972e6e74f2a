//! Backend gateway boundary — the remote advisor service, abstracted.

pub mod http;

pub use http::HttpGateway;

use async_trait::async_trait;

use crate::error::GatewayError;

/// Raw reply from the service. Classification into an outcome happens in
/// the submission coordinator, not here.
#[derive(Debug, Clone)]
pub struct GatewayReply {
    pub status: u16,
    pub body: String,
}

impl GatewayReply {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// The remote HTTP service that persists goals and profiles. Opaque to
/// the engine beyond this contract.
#[async_trait]
pub trait BackendGateway: Send + Sync {
    /// Fetch suggestion options for a prompt (goal names). Callers fall
    /// back to static defaults on failure; this never blocks the user.
    async fn fetch_options(&self, prompt_key: &str) -> Result<Vec<String>, GatewayError>;

    /// Create a resource (onboard a user, create a goal, pick a fund).
    async fn create_resource(
        &self,
        endpoint: &str,
        payload: &serde_json::Value,
    ) -> Result<GatewayReply, GatewayError>;

    /// Fetch the recommendation follow-up for a created resource.
    async fn fetch_follow_up(&self, resource_id: &str) -> Result<GatewayReply, GatewayError>;
}
