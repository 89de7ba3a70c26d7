//! HTTP implementation of the session gateway.
//!
//! JSON over reqwest against a configured base URL. The client owns a small
//! tokio runtime and blocks on each call; the runner treats every call as
//! best-effort, so latency here never holds the flow itself.

use serde::Deserialize;
use url::Url;

use crate::error::GatewayError;
use crate::flow::plan::BranchPlan;

use super::gateway::{
    CreateSessionRequest, PlanRequest, ProgressPatch, SessionGateway, SessionOutcome,
};

#[derive(Debug, Deserialize)]
struct CreateSessionResponse {
    session_id: String,
}

#[derive(Debug)]
pub struct HttpGateway {
    base: Url,
    token: Option<String>,
    client: reqwest::Client,
    runtime: tokio::runtime::Runtime,
}

impl HttpGateway {
    pub fn new(
        base_url: &str,
        token: Option<String>,
        request_timeout_secs: u64,
    ) -> Result<Self, GatewayError> {
        let base = Url::parse(base_url)?;
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(request_timeout_secs))
            .build()?;
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(GatewayError::Runtime)?;
        Ok(Self {
            base,
            token,
            client,
            runtime,
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url, GatewayError> {
        Ok(self.base.join(path)?)
    }

    fn send_json<T: serde::Serialize>(
        &self,
        method: reqwest::Method,
        url: Url,
        body: &T,
    ) -> Result<reqwest::Response, GatewayError> {
        let mut req = self.client.request(method, url).json(body);
        if let Some(token) = &self.token {
            req = req.bearer_auth(token);
        }
        let resp = self.runtime.block_on(async { req.send().await })?;
        let status = resp.status();
        if !status.is_success() {
            let message = self
                .runtime
                .block_on(resp.text())
                .unwrap_or_else(|_| String::new());
            return Err(GatewayError::Api {
                status: status.as_u16(),
                message,
            });
        }
        Ok(resp)
    }
}

impl SessionGateway for HttpGateway {
    fn create_session(&self, req: &CreateSessionRequest) -> Result<String, GatewayError> {
        let url = self.endpoint("v1/sessions")?;
        let resp = self.send_json(reqwest::Method::POST, url, req)?;
        let body: CreateSessionResponse = self
            .runtime
            .block_on(resp.json())
            .map_err(|e| GatewayError::Decode(e.to_string()))?;
        Ok(body.session_id)
    }

    fn patch_progress(&self, session_id: &str, patch: &ProgressPatch) -> Result<(), GatewayError> {
        let url = self.endpoint(&format!("v1/sessions/{session_id}"))?;
        self.send_json(reqwest::Method::PATCH, url, patch)?;
        Ok(())
    }

    fn end_session(&self, session_id: &str, outcome: &SessionOutcome) -> Result<(), GatewayError> {
        let url = self.endpoint(&format!("v1/sessions/{session_id}/end"))?;
        self.send_json(reqwest::Method::POST, url, outcome)?;
        Ok(())
    }

    fn decide_plan(&self, req: &PlanRequest) -> Result<BranchPlan, GatewayError> {
        let url = self.endpoint("v1/plan")?;
        let resp = self.send_json(reqwest::Method::POST, url, req)?;
        self.runtime
            .block_on(resp.json())
            .map_err(|e| GatewayError::Decode(e.to_string()))
    }
}
