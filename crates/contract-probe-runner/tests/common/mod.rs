//! Shared fixtures for runner integration tests.

use std::sync::{Arc, Mutex};

use contract_probe_core::{HttpMethod, RunConfig};
use contract_probe_http::{HttpClient, HttpError, HttpTransport, PreparedRequest, RawResponse};
use contract_probe_runner::Runner;
use contract_probe_schema::bundled_registry;

type Route = Box<dyn Fn(&PreparedRequest) -> Result<RawResponse, HttpError> + Send + Sync>;

/// Transport that answers from a routing closure and records every request.
pub struct ScriptedTransport {
    route: Route,
    calls: Mutex<Vec<(HttpMethod, String)>>,
}

impl ScriptedTransport {
    /// Creates a transport answering through `route`.
    pub fn new(
        route: impl Fn(&PreparedRequest) -> Result<RawResponse, HttpError> + Send + Sync + 'static,
    ) -> Arc<Self> {
        Arc::new(Self {
            route: Box::new(route),
            calls: Mutex::new(Vec::new()),
        })
    }

    /// Requests seen so far as `(method, path)`.
    #[allow(dead_code)]
    pub fn calls(&self) -> Vec<(HttpMethod, String)> {
        self.calls.lock().expect("call log lock should work").clone()
    }
}

impl HttpTransport for ScriptedTransport {
    fn execute(&self, request: &PreparedRequest) -> Result<RawResponse, HttpError> {
        self.calls
            .lock()
            .expect("call log lock should work")
            .push((request.method, request.url.path().to_string()));
        (self.route)(request)
    }
}

/// Builds a reply.
#[allow(dead_code)]
pub fn reply(status: u16, text: &str) -> Result<RawResponse, HttpError> {
    Ok(RawResponse {
        status,
        text: text.to_string(),
    })
}

/// Runner over the bundled schemas and a scripted transport.
pub fn runner(transport: Arc<ScriptedTransport>) -> Runner {
    let config = Arc::new(RunConfig::new("https://reqres.test/").expect("base url should be valid"));
    let registry = Arc::new(bundled_registry().expect("bundled schemas should load"));
    Runner::new(HttpClient::new(config, transport), registry)
}
