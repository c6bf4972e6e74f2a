//! HTTP gateway — reqwest client for the advisor service.

use async_trait::async_trait;
use serde_json::Value;

use crate::config::GatewayConfig;
use crate::error::GatewayError;
use crate::gateway::{BackendGateway, GatewayReply};

/// Talks to the advisor service over HTTPS. One client, built once with
/// the configured timeout; a stalled request surfaces as a transport
/// error, which the coordinator treats as recoverable.
pub struct HttpGateway {
    base_url: String,
    client: reqwest::Client,
}

impl HttpGateway {
    pub fn new(config: &GatewayConfig) -> Result<Self, GatewayError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| GatewayError::Transport(e.to_string()))?;
        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// Probe the server-side onboarding status for a user.
    ///
    /// Defaults to "User Not Onboarded" on any failure so a connectivity
    /// problem never blocks registration.
    pub async fn fetch_status(&self, phone_number: &str) -> String {
        const NOT_ONBOARDED: &str = "User Not Onboarded";
        let payload = serde_json::json!({ "phone_number": phone_number });
        match self.create_resource("onboarding", &payload).await {
            Ok(reply) if reply.is_success() => serde_json::from_str::<Value>(&reply.body)
                .ok()
                .and_then(|v| {
                    v.get("result")
                        .and_then(Value::as_str)
                        .map(str::to_string)
                })
                .unwrap_or_else(|| NOT_ONBOARDED.to_string()),
            Ok(reply) => {
                tracing::warn!(status = reply.status, "onboarding status probe refused");
                NOT_ONBOARDED.to_string()
            }
            Err(e) => {
                tracing::warn!("onboarding status probe failed: {e}");
                NOT_ONBOARDED.to_string()
            }
        }
    }
}

#[async_trait]
impl BackendGateway for HttpGateway {
    async fn fetch_options(&self, prompt_key: &str) -> Result<Vec<String>, GatewayError> {
        // The deployed route spells it "goal_suggesstion"; prompt keys are
        // whatever the server registered, typos included.
        let url = self.url(&format!("finadvisor/{prompt_key}"));
        let resp = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| GatewayError::Transport(e.to_string()))?;
        if !resp.status().is_success() {
            return Err(GatewayError::Transport(format!(
                "suggestion fetch returned {}",
                resp.status()
            )));
        }
        let body: Value = resp
            .json()
            .await
            .map_err(|e| GatewayError::InvalidBody(e.to_string()))?;
        let options: Vec<String> = body
            .get("goals")
            .or_else(|| body.get("options"))
            .and_then(Value::as_array)
            .map(|a| {
                a.iter()
                    .filter_map(|v| v.as_str().map(str::to_string))
                    .collect()
            })
            .unwrap_or_default();
        if options.is_empty() {
            return Err(GatewayError::InvalidBody(
                "no options in suggestion reply".to_string(),
            ));
        }
        Ok(options)
    }

    async fn create_resource(
        &self,
        endpoint: &str,
        payload: &Value,
    ) -> Result<GatewayReply, GatewayError> {
        let resp = self
            .client
            .post(self.url(endpoint))
            .json(payload)
            .send()
            .await
            .map_err(|e| GatewayError::Transport(e.to_string()))?;
        let status = resp.status().as_u16();
        let body = resp
            .text()
            .await
            .map_err(|e| GatewayError::Transport(e.to_string()))?;
        Ok(GatewayReply { status, body })
    }

    async fn fetch_follow_up(&self, resource_id: &str) -> Result<GatewayReply, GatewayError> {
        let url = self.url(&format!("goal_recommendation/{resource_id}"));
        let resp = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| GatewayError::Transport(e.to_string()))?;
        let status = resp.status().as_u16();
        let body = resp
            .text()
            .await
            .map_err(|e| GatewayError::Transport(e.to_string()))?;
        Ok(GatewayReply { status, body })
    }
}
