//! Ethics gating for plan execution.
//!
//! Every action is first screened against a fixed list of harm keywords. Only
//! actions that pass the screen are sent to the configured [`EthicsGate`].

use std::{collections::HashMap, sync::Mutex, time::Duration};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub const HARM_KEYWORDS: &[&str] = &[
    "harm", "hurt", "injure", "damage", "destroy", "kill", "attack",
    "strike", "hit", "punch", "kick", "dangerous", "unsafe",
];

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Case-insensitive substring match against [`HARM_KEYWORDS`].
pub fn is_harmful(action_name: &str) -> bool {
    let lower = action_name.to_lowercase();
    HARM_KEYWORDS.iter().any(|k| lower.contains(k))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct EthicsContext {
    pub human_harm: bool,
    pub human_order: bool,
    pub self_harm: bool,
}

impl EthicsContext {
    pub fn for_action(action_name: &str) -> Self {
        Self { human_harm: is_harmful(action_name), human_order: true, self_harm: false }
    }

    pub fn to_map(&self) -> Map<String, Value> {
        let mut map = Map::new();
        map.insert("human_harm".to_owned(), Value::Bool(self.human_harm));
        map.insert("human_order".to_owned(), Value::Bool(self.human_order));
        map.insert("self_harm".to_owned(), Value::Bool(self.self_harm));
        map
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verdict {
    pub allowed: bool,
    pub reasons: Vec<String>,
}

impl Verdict {
    pub fn allow() -> Self {
        Self { allowed: true, reasons: Vec::new() }
    }

    pub fn deny(reasons: Vec<String>) -> Self {
        Self { allowed: false, reasons }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum GateError {
    #[error("principles request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("principles API returned status {0}")]
    Status(u16),
}

/// External policy decision point consulted before each action.
pub trait EthicsGate: Send + Sync {
    fn is_action_allowed(
        &self,
        action: &str,
        params: &Map<String, Value>,
        context: &Map<String, Value>,
    ) -> Result<Verdict, GateError>;
}

impl<G: EthicsGate + ?Sized> EthicsGate for std::sync::Arc<G> {
    fn is_action_allowed(
        &self,
        action: &str,
        params: &Map<String, Value>,
        context: &Map<String, Value>,
    ) -> Result<Verdict, GateError> {
        (**self).is_action_allowed(action, params, context)
    }
}

#[derive(Serialize)]
struct ActionRequest<'a> {
    action: &'a str,
    params: &'a Map<String, Value>,
    context: &'a Map<String, Value>,
}

#[derive(Deserialize)]
struct ActionResponse {
    #[serde(default)]
    reasons: Vec<String>,
}

/// Client for a principles service exposing `POST /action`. An action is
/// allowed when the response carries no reasons.
pub struct HttpPrinciplesGate {
    base_url: String,
    client: reqwest::blocking::Client,
}

impl HttpPrinciplesGate {
    pub fn new(base_url: &str) -> Result<Self, GateError> {
        Self::with_timeout(base_url, DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(base_url: &str, timeout: Duration) -> Result<Self, GateError> {
        let client = reqwest::blocking::Client::builder().timeout(timeout).build()?;
        Ok(Self { base_url: base_url.trim_end_matches('/').to_owned(), client })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

impl EthicsGate for HttpPrinciplesGate {
    fn is_action_allowed(
        &self,
        action: &str,
        params: &Map<String, Value>,
        context: &Map<String, Value>,
    ) -> Result<Verdict, GateError> {
        let url = format!("{}/action", self.base_url);
        let request = ActionRequest { action, params, context };
        let response = self.client.post(&url).json(&request).send()?;
        if response.status() != reqwest::StatusCode::OK {
            return Err(GateError::Status(response.status().as_u16()));
        }
        let body: ActionResponse = response.json()?;
        Ok(Verdict { allowed: body.reasons.is_empty(), reasons: body.reasons })
    }
}

/// In-process gate with a fixed deny list. Remembers every action it was asked about.
#[derive(Default)]
pub struct StaticGate {
    denied: HashMap<String, Vec<String>>,
    calls: Mutex<Vec<String>>,
}

impl StaticGate {
    pub fn allow_all() -> Self {
        Self::default()
    }

    pub fn deny(mut self, action: &str, reason: &str) -> Self {
        self.denied.entry(action.to_owned()).or_default().push(reason.to_owned());
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }
}

impl EthicsGate for StaticGate {
    fn is_action_allowed(
        &self,
        action: &str,
        _params: &Map<String, Value>,
        _context: &Map<String, Value>,
    ) -> Result<Verdict, GateError> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(action.to_owned());
        }
        Ok(match self.denied.get(action) {
            Some(reasons) => Verdict::deny(reasons.clone()),
            None => Verdict::allow(),
        })
    }
}

#[cfg(test)]
mod tests {
    use std::{
        io::{Read, Write},
        net::TcpListener,
        thread,
    };

    use super::*;

    #[test]
    fn test_harm_keywords() {
        assert!(is_harmful("harm_human"));
        assert!(is_harmful("DestroyBuilding"));
        assert!(is_harmful("do_UNSAFE_thing"));
        assert!(!is_harmful("WriteDraft"));
        assert!(!is_harmful("steal"));
    }

    #[test]
    fn test_context_map() {
        let map = EthicsContext::for_action("kick_ball").to_map();
        assert_eq!(map["human_harm"], Value::Bool(true));
        assert_eq!(map["human_order"], Value::Bool(true));
        assert_eq!(map["self_harm"], Value::Bool(false));
    }

    #[test]
    fn test_static_gate() {
        let gate = StaticGate::allow_all().deny("steal", "theft");
        let empty = Map::new();
        assert!(gate.is_action_allowed("WriteDraft", &empty, &empty).unwrap().allowed);
        let verdict = gate.is_action_allowed("steal", &empty, &empty).unwrap();
        assert_eq!(verdict, Verdict::deny(vec!["theft".to_owned()]));
        assert_eq!(gate.calls(), vec!["WriteDraft".to_owned(), "steal".to_owned()]);
    }

    /// Serves a single HTTP request and returns the request body through the join handle.
    fn serve_once(
        status: &'static str,
        body: &'static str,
    ) -> (String, thread::JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = format!("http://{}", listener.local_addr().unwrap());
        let handle = thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            let mut buf = Vec::new();
            let mut chunk = [0u8; 1024];
            let (header_end, content_length) = loop {
                let n = stream.read(&mut chunk).unwrap();
                buf.extend_from_slice(&chunk[..n]);
                let text = String::from_utf8_lossy(&buf).to_string();
                if let Some(pos) = text.find("\r\n\r\n") {
                    let length = text[..pos]
                        .lines()
                        .filter_map(|l| l.split_once(':'))
                        .find(|(k, _)| k.eq_ignore_ascii_case("content-length"))
                        .map(|(_, v)| v.trim().parse::<usize>().unwrap())
                        .unwrap_or(0);
                    break (pos + 4, length);
                }
            };
            while buf.len() < header_end + content_length {
                let n = stream.read(&mut chunk).unwrap();
                buf.extend_from_slice(&chunk[..n]);
            }
            let response = format!(
                "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\n\
                 Connection: close\r\n\r\n{}",
                status,
                body.len(),
                body
            );
            stream.write_all(response.as_bytes()).unwrap();
            String::from_utf8_lossy(&buf[header_end..]).to_string()
        });
        (addr, handle)
    }

    #[test]
    fn test_http_gate_allows_without_reasons() {
        let (addr, handle) = serve_once("200 OK", r#"{"result":"allowed"}"#);
        let gate = HttpPrinciplesGate::new(&addr).unwrap();
        let context = EthicsContext::for_action("WriteDraft").to_map();
        let verdict = gate.is_action_allowed("WriteDraft", &Map::new(), &context).unwrap();
        assert!(verdict.allowed);
        let request: Value = serde_json::from_str(&handle.join().unwrap()).unwrap();
        assert_eq!(request["action"], "WriteDraft");
        assert_eq!(request["context"]["human_order"], true);
    }

    #[test]
    fn test_http_gate_denies_with_reasons() {
        let (addr, handle) = serve_once("200 OK", r#"{"reasons":["stealing is prohibited"]}"#);
        let gate = HttpPrinciplesGate::new(&format!("{}/", addr)).unwrap();
        let verdict = gate.is_action_allowed("steal", &Map::new(), &Map::new()).unwrap();
        assert_eq!(verdict, Verdict::deny(vec!["stealing is prohibited".to_owned()]));
        handle.join().unwrap();
    }

    #[test]
    fn test_http_gate_status_error() {
        let (addr, handle) = serve_once("500 Internal Server Error", "{}");
        let gate = HttpPrinciplesGate::new(&addr).unwrap();
        match gate.is_action_allowed("x", &Map::new(), &Map::new()) {
            Err(GateError::Status(500)) => (),
            other => panic!("unexpected result: {:?}", other),
        }
        handle.join().unwrap();
    }
}
