//! Shared fixtures for app integration tests: an in-memory stand-in for the
//! users API that answers the bundled suite the way the live service does.

use std::sync::{Arc, Mutex};

use contract_probe_core::{HttpMethod, RunConfig};
use contract_probe_http::{HttpClient, HttpError, HttpTransport, PreparedRequest, RawResponse};
use contract_probe_runner::Runner;
use contract_probe_schema::bundled_registry;
use serde_json::{Map, Value, json};
use url::form_urlencoded;

/// Fake users API with overridable register-failure text.
pub struct FakeUsersApi {
    rejection_text: String,
    requests: Mutex<Vec<String>>,
}

impl FakeUsersApi {
    /// Fake that behaves like the live service.
    pub fn faithful() -> Arc<Self> {
        Self::rejecting_with("Note: Only defined users succeed registration")
    }

    /// Fake whose rejected registrations carry `text`.
    pub fn rejecting_with(text: &str) -> Arc<Self> {
        Arc::new(Self {
            rejection_text: text.to_string(),
            requests: Mutex::new(Vec::new()),
        })
    }

    /// `METHOD /path` for every request received.
    #[allow(dead_code)]
    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().expect("request log lock should work").clone()
    }
}

fn decode_body(request: &PreparedRequest) -> Map<String, Value> {
    let raw = request.body.clone().unwrap_or_default();
    let is_json = request
        .headers
        .iter()
        .any(|(name, value)| name.eq_ignore_ascii_case("content-type") && value == "application/json");

    if is_json {
        return serde_json::from_slice::<Value>(&raw)
            .ok()
            .and_then(|value| value.as_object().cloned())
            .unwrap_or_default();
    }

    form_urlencoded::parse(&raw)
        .map(|(key, value)| (key.into_owned(), Value::String(value.into_owned())))
        .collect()
}

fn user(id: u64) -> Value {
    json!({
        "id": id,
        "email": format!("user{id}@reqres.in"),
        "first_name": "First",
        "last_name": "Last",
        "avatar": format!("https://reqres.in/img/faces/{id}-image.jpg")
    })
}

fn support() -> Value {
    json!({"url": "https://reqres.in/#support-heading", "text": "support"})
}

fn json_reply(status: u16, value: Value) -> Result<RawResponse, HttpError> {
    Ok(RawResponse {
        status,
        text: value.to_string(),
    })
}

impl HttpTransport for FakeUsersApi {
    fn execute(&self, request: &PreparedRequest) -> Result<RawResponse, HttpError> {
        let path = request.url.path().to_string();
        self.requests
            .lock()
            .expect("request log lock should work")
            .push(format!("{} {path}", request.method));

        let user_id = path
            .strip_prefix("/api/users/")
            .and_then(|id| id.parse::<u64>().ok());
        let timestamp = json!("2024-05-01T10:00:00.000Z");

        match (request.method, path.as_str(), user_id) {
            (HttpMethod::Get, "/api/users", None) => json_reply(
                200,
                json!({
                    "page": 1,
                    "per_page": 6,
                    "total": 12,
                    "total_pages": 2,
                    "data": (1..=6).map(user).collect::<Vec<_>>(),
                    "support": support()
                }),
            ),
            (HttpMethod::Get, _, Some(id)) if id <= 12 => {
                json_reply(200, json!({"data": user(id), "support": support()}))
            }
            (HttpMethod::Get, _, Some(_)) => json_reply(404, json!({})),
            (HttpMethod::Post, "/api/users", None) => {
                let mut body = decode_body(request);
                body.insert("id".to_string(), json!("812"));
                body.insert("createdAt".to_string(), timestamp);
                json_reply(201, Value::Object(body))
            }
            (HttpMethod::Put, _, Some(_)) => {
                let mut body = decode_body(request);
                body.insert("updatedAt".to_string(), timestamp);
                json_reply(200, Value::Object(body))
            }
            (HttpMethod::Delete, _, Some(_)) => Ok(RawResponse {
                status: 204,
                text: String::new(),
            }),
            (HttpMethod::Post, "/api/register", None) => {
                let body = decode_body(request);
                if body.get("email") == Some(&json!("eve.holt@reqres.in")) {
                    json_reply(200, json!({"id": 4, "token": "QpwL5tke4Pnpja7X4"}))
                } else {
                    json_reply(400, json!({"error": self.rejection_text}))
                }
            }
            _ => json_reply(404, json!({})),
        }
    }
}

/// Runner bound to `api`.
pub fn runner_for(api: Arc<FakeUsersApi>) -> Runner {
    let config = Arc::new(
        RunConfig::new("https://reqres.test/")
            .expect("base url should be valid")
            .with_default_header("x-api-key", "reqres-free-v1")
            .expect("header should be valid"),
    );
    let registry = Arc::new(bundled_registry().expect("bundled schemas should load"));
    Runner::new(HttpClient::new(config, api), registry)
}
