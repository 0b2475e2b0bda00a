//! REST client for the Hopaas service.
//!
//! Every method is one blocking round trip. Nothing is retried: a non-200
//! status or a body that breaks the protocol surfaces as
//! [`HopaasError::Server`] right away.

use hp_types::{
    format_trial_tag, parse_trial_tag, HopaasError, HopaasResult, PropertyMap, TrialId, TRIAL_KEY,
};
use serde_json::{json, Value};
use std::path::Path;
use tracing::{debug, info};

use crate::config::ClientConfig;
use crate::transport::{HttpResponse, HttpTransport, Transport};

/// Connection to one Hopaas server, authenticated by an API token.
#[derive(Debug, Clone)]
pub struct Client<T: Transport = HttpTransport> {
    server: String,
    token: String,
    transport: T,
}

impl Client<HttpTransport> {
    pub fn new(server: impl Into<String>, token: impl Into<String>) -> Self {
        Self::with_transport(server, token, HttpTransport::new())
    }

    pub fn from_config(config: &ClientConfig) -> Self {
        Self::new(config.server_url(), config.api_token.clone())
    }

    /// Load `path` (or `~/.hopaasrc`), prompting on the terminal when the file
    /// is missing or `force_reconfig` is set.
    pub fn from_config_file(path: Option<&Path>, force_reconfig: bool) -> HopaasResult<Self> {
        let path = path
            .map(Path::to_path_buf)
            .unwrap_or_else(ClientConfig::default_path);
        let stdin = std::io::stdin();
        let config = ClientConfig::load_or_prompt(
            &path,
            force_reconfig,
            &mut stdin.lock(),
            &mut std::io::stdout(),
        )?;
        Ok(Self::from_config(&config))
    }
}

impl<T: Transport> Client<T> {
    pub fn with_transport(server: impl Into<String>, token: impl Into<String>, transport: T) -> Self {
        Self {
            server: server.into().trim_end_matches('/').to_string(),
            token: token.into(),
            transport,
        }
    }

    pub fn server(&self) -> &str {
        &self.server
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    fn url(&self, endpoint: &str) -> String {
        format!("{}/api/{}/{}", self.server, endpoint, self.token)
    }

    fn post_json(&self, endpoint: &str, body: &Value) -> HopaasResult<HttpResponse> {
        debug!("POST /api/{} {}", endpoint, body);
        let response = self
            .transport
            .post(&self.url(endpoint), serde_json::to_string(body)?)?;
        if !response.is_ok() {
            return Err(HopaasError::status(response.status));
        }
        Ok(response)
    }

    /// Version string reported by `/api/version`.
    pub fn backend_version(&self) -> HopaasResult<String> {
        let response = self
            .transport
            .get(&format!("{}/api/version", self.server), &[])?;
        if !response.is_ok() {
            return Err(HopaasError::status(response.status));
        }
        Ok(response.body)
    }

    /// Request a new trial. The reply carries `hopaas_trial` plus every
    /// property with suggestions replaced by samples.
    pub fn ask(&self, properties: &PropertyMap) -> HopaasResult<PropertyMap> {
        let response = self.post_json("ask", &Value::Object(properties.clone()))?;
        let reply: Value = serde_json::from_str(&response.body).map_err(|e| {
            HopaasError::bad_body(response.status, format!("ask reply is not JSON: {e}"))
        })?;
        match reply {
            Value::Object(map) if map.contains_key(TRIAL_KEY) => Ok(map),
            Value::Object(_) => Err(HopaasError::bad_body(
                response.status,
                format!("ask reply lacks {TRIAL_KEY}"),
            )),
            _ => Err(HopaasError::bad_body(
                response.status,
                "ask reply is not an object",
            )),
        }
    }

    /// Complete a trial with its final loss.
    pub fn tell(&self, study_id: &str, trial_id: TrialId, loss: f64) -> HopaasResult<()> {
        self.post_json(
            "tell",
            &json!({ TRIAL_KEY: format_trial_tag(study_id, trial_id), "loss": loss }),
        )?;
        info!("Reported loss {} for trial {}:{}", loss, study_id, trial_id);
        Ok(())
    }

    /// Tell the server the trial died without a result.
    pub fn mark_as_failed(&self, study_id: &str, trial_id: TrialId, error: &str) -> HopaasResult<()> {
        self.post_json(
            "mark_as_failed",
            &json!({ TRIAL_KEY: format_trial_tag(study_id, trial_id), "error": error }),
        )?;
        info!("Marked trial {}:{} as failed: {}", study_id, trial_id, error);
        Ok(())
    }

    /// Ask whether the trial is worth continuing after reporting `loss` at `step`.
    pub fn should_prune(
        &self,
        study_id: &str,
        trial_id: TrialId,
        loss: f64,
        step: i64,
    ) -> HopaasResult<bool> {
        let response = self.post_json(
            "should_prune",
            &json!({
                TRIAL_KEY: format_trial_tag(study_id, trial_id),
                "loss": loss,
                "step": step,
            }),
        )?;
        match response.body.to_lowercase().as_str() {
            "true" => Ok(true),
            "false" => Ok(false),
            other => Err(HopaasError::bad_body(
                response.status,
                format!("should_prune answered {other:?}"),
            )),
        }
    }

    /// Id of the best trial in `study_id`, as judged by the server.
    pub fn get_best_trial(&self, study_id: &str, trial_id: TrialId) -> HopaasResult<TrialId> {
        let response = self.transport.get(
            &self.url("get_best_trial"),
            &[(TRIAL_KEY, format_trial_tag(study_id, trial_id))],
        )?;
        if !response.is_ok() {
            return Err(HopaasError::status(response.status));
        }

        let tag: String = serde_json::from_str(&response.body).map_err(|e| {
            HopaasError::bad_body(response.status, format!("best trial is not a JSON string: {e}"))
        })?;
        let (best_study, best_trial) = parse_trial_tag(&tag)
            .map_err(|e| HopaasError::bad_body(response.status, e.to_string()))?;
        if best_study != study_id {
            return Err(HopaasError::bad_body(
                response.status,
                format!("best trial belongs to study {best_study:?}, expected {study_id:?}"),
            ));
        }
        Ok(best_trial)
    }
}
