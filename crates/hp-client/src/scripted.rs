//! In-memory transport that serves canned responses and records requests.

use hp_types::HopaasResult;
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use crate::transport::{HttpResponse, Transport};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

/// One request as seen by the transport.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedRequest {
    pub method: Method,
    pub endpoint: String,
    pub url: String,
    pub query: Vec<(String, String)>,
    pub body: Option<serde_json::Value>,
}

#[derive(Debug, Default)]
struct Script {
    queued: HashMap<String, VecDeque<HttpResponse>>,
    fallback: HashMap<String, HttpResponse>,
    requests: Vec<RecordedRequest>,
}

/// Transport double keyed by endpoint name (`ask`, `tell`, `should_prune`, ...).
///
/// Queued responses are served first, in order; once an endpoint's queue is
/// empty its fallback answers. Endpoints with neither answer 404. Clones
/// share the same script, so a test can keep a handle after moving the
/// transport into a client.
#[derive(Debug, Clone, Default)]
pub struct ScriptedTransport {
    script: Arc<Mutex<Script>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `response` once for `endpoint`.
    pub fn enqueue(&self, endpoint: &str, response: HttpResponse) -> &Self {
        self.script
            .lock()
            .queued
            .entry(endpoint.to_string())
            .or_default()
            .push_back(response);
        self
    }

    /// Serve `response` for `endpoint` whenever nothing is queued.
    pub fn respond(&self, endpoint: &str, response: HttpResponse) -> &Self {
        self.script
            .lock()
            .fallback
            .insert(endpoint.to_string(), response);
        self
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.script.lock().requests.clone()
    }

    pub fn requests_to(&self, endpoint: &str) -> Vec<RecordedRequest> {
        self.script
            .lock()
            .requests
            .iter()
            .filter(|r| r.endpoint == endpoint)
            .cloned()
            .collect()
    }

    pub fn count(&self, endpoint: &str) -> usize {
        self.script
            .lock()
            .requests
            .iter()
            .filter(|r| r.endpoint == endpoint)
            .count()
    }

    fn serve(&self, request: RecordedRequest) -> HttpResponse {
        let mut script = self.script.lock();
        let endpoint = request.endpoint.clone();
        script.requests.push(request);

        if let Some(response) = script
            .queued
            .get_mut(&endpoint)
            .and_then(VecDeque::pop_front)
        {
            return response;
        }
        script
            .fallback
            .get(&endpoint)
            .cloned()
            .unwrap_or_else(|| HttpResponse::new(404, format!("no script for {endpoint}")))
    }
}

/// `http://host/api/tell/token` -> `tell`
fn endpoint_of(url: &str) -> String {
    url.split_once("/api/")
        .map(|(_, rest)| rest.split(['/', '?']).next().unwrap_or_default())
        .unwrap_or_default()
        .to_string()
}

impl Transport for ScriptedTransport {
    fn get(&self, url: &str, query: &[(&str, String)]) -> HopaasResult<HttpResponse> {
        Ok(self.serve(RecordedRequest {
            method: Method::Get,
            endpoint: endpoint_of(url),
            url: url.to_string(),
            query: query
                .iter()
                .map(|(k, v)| (k.to_string(), v.clone()))
                .collect(),
            body: None,
        }))
    }

    fn post(&self, url: &str, body: String) -> HopaasResult<HttpResponse> {
        let body = serde_json::from_str(&body)?;
        Ok(self.serve(RecordedRequest {
            method: Method::Post,
            endpoint: endpoint_of(url),
            url: url.to_string(),
            query: Vec::new(),
            body: Some(body),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_names() {
        assert_eq!(endpoint_of("http://h:80/api/version"), "version");
        assert_eq!(endpoint_of("http://h:80/api/ask/tok"), "ask");
        assert_eq!(endpoint_of("http://h:80/api/get_best_trial/tok"), "get_best_trial");
    }

    #[test]
    fn queue_then_fallback_then_404() {
        let transport = ScriptedTransport::new();
        transport.enqueue("version", HttpResponse::ok("first"));
        transport.respond("version", HttpResponse::ok("steady"));

        let url = "http://h/api/version";
        assert_eq!(transport.get(url, &[]).unwrap().body, "first");
        assert_eq!(transport.get(url, &[]).unwrap().body, "steady");
        assert_eq!(transport.get(url, &[]).unwrap().body, "steady");
        assert_eq!(transport.get("http://h/api/other", &[]).unwrap().status, 404);
        assert_eq!(transport.count("version"), 3);
    }

    #[test]
    fn clones_share_the_record() {
        let transport = ScriptedTransport::new();
        let handle = transport.clone();
        transport.post("http://h/api/tell/t", "{\"loss\": 1.0}".into()).unwrap();
        let recorded = handle.requests_to("tell");
        assert_eq!(recorded.len(), 1);
        assert_eq!(recorded[0].body.as_ref().unwrap()["loss"], 1.0);
    }
}
