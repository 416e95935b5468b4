use std::{
    collections::{HashMap, VecDeque},
    sync::{Arc, Mutex, MutexGuard},
    time::Instant,
};

use bytes::Bytes;
use reqwest::Method;
use serde::Serialize;
use sonic_rs::to_vec;

use super::adapter::{
    RequestError, RestBytes, RestFuture, RestRequest, RestResponse, RestResult, RestTransport,
    RestTransportState, TransportPhase,
};

#[derive(Clone, Debug, Default)]
pub enum MockBehavior {
    #[default]
    Pass,
    ConnectError {
        reason: String,
    },
    SendError {
        status: Option<u16>,
        reason: String,
    },
    ReceiveError {
        status: Option<u16>,
        reason: String,
    },
    TimeoutError {
        reason: String,
    },
    InternalError {
        reason: String,
    },
}

impl MockBehavior {
    pub fn connect_error(reason: impl Into<String>) -> Self {
        Self::ConnectError {
            reason: reason.into(),
        }
    }

    pub fn send_error(reason: impl Into<String>, status: Option<u16>) -> Self {
        Self::SendError {
            status,
            reason: reason.into(),
        }
    }

    pub fn receive_error(reason: impl Into<String>, status: Option<u16>) -> Self {
        Self::ReceiveError {
            status,
            reason: reason.into(),
        }
    }

    pub fn timeout_error(reason: impl Into<String>) -> Self {
        Self::TimeoutError {
            reason: reason.into(),
        }
    }

    pub fn internal_error(reason: impl Into<String>) -> Self {
        Self::InternalError {
            reason: reason.into(),
        }
    }

    fn into_error(self) -> Option<RequestError> {
        match self {
            Self::Pass => None,
            Self::ConnectError { reason } => {
                Some(RequestError::transport(TransportPhase::Connect, None, reason))
            }
            Self::SendError { status, reason } => {
                Some(RequestError::transport(TransportPhase::Send, status, reason))
            }
            Self::ReceiveError { status, reason } => {
                Some(RequestError::transport(TransportPhase::Receive, status, reason))
            }
            Self::TimeoutError { reason } => {
                Some(RequestError::transport(TransportPhase::Timeout, None, reason))
            }
            Self::InternalError { reason } => Some(RequestError::internal(reason)),
        }
    }
}

/// Behaviors consumed one per request; an exhausted plan passes.
#[derive(Clone, Debug, Default)]
pub struct MockBehaviorPlan {
    request: VecDeque<MockBehavior>,
}

impl MockBehaviorPlan {
    pub fn push(&mut self, behavior: MockBehavior) -> &mut Self {
        self.request.push_back(behavior);
        self
    }

    pub fn pop(&mut self) -> MockBehavior {
        self.request.pop_front().unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.request.len()
    }

    pub fn is_empty(&self) -> bool {
        self.request.is_empty()
    }
}

#[derive(Clone, Debug)]
pub struct MockResponse {
    pub status: u16,
    pub headers: Vec<(String, RestBytes)>,
    pub body: RestBytes,
}

impl MockResponse {
    pub fn new(status: u16, body: impl Into<RestBytes>) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body: body.into(),
        }
    }

    /// A response without content, e.g. a bare `204`.
    pub fn empty(status: u16) -> Self {
        Self::new(status, Bytes::new())
    }

    pub fn text(status: u16, body: impl Into<String>) -> Self {
        Self::new(status, body.into())
    }

    pub fn json<T: Serialize>(status: u16, payload: &T) -> RestResult<Self> {
        let body = to_vec(payload).map_err(RequestError::encode)?;
        Ok(Self::new(status, body))
    }
}

#[derive(Clone, Debug)]
pub struct MockRestStateSnapshot {
    pub state: RestTransportState,
    pub request_count: usize,
    pub last_url: Option<String>,
    pub last_status: Option<u16>,
    pub behavior_remaining: usize,
    pub response_queue_len: usize,
    pub route_queue_len: usize,
    pub inbound_count: usize,
    pub outbound_count: usize,
    pub last_error: Option<String>,
}

#[derive(Debug)]
struct MockRestAdapterState {
    state: RestTransportState,
    request_count: usize,
    last_url: Option<String>,
    last_status: Option<u16>,
    behavior_plan: MockBehaviorPlan,
    default_response_queue: VecDeque<MockResponse>,
    route_response_queues: HashMap<(Method, String), VecDeque<MockResponse>>,
    outbound_log: Vec<RestRequest>,
    inbound_log: Vec<RestResponse>,
    last_error: Option<String>,
}

impl MockRestAdapterState {
    fn snapshot(&self) -> MockRestStateSnapshot {
        MockRestStateSnapshot {
            state: self.state,
            request_count: self.request_count,
            last_url: self.last_url.clone(),
            last_status: self.last_status,
            behavior_remaining: self.behavior_plan.len(),
            response_queue_len: self.default_response_queue.len(),
            route_queue_len: self.route_response_queues.values().map(VecDeque::len).sum(),
            inbound_count: self.inbound_log.len(),
            outbound_count: self.outbound_log.len(),
            last_error: self.last_error.clone(),
        }
    }

    /// A queued response for the exact route wins over the default queue.
    fn next_response(&mut self, request: &RestRequest) -> Option<MockResponse> {
        let route_key = (request.method.clone(), request.url.clone());
        if let Some(response) = self
            .route_response_queues
            .get_mut(&route_key)
            .and_then(VecDeque::pop_front)
        {
            return Some(response);
        }
        self.default_response_queue.pop_front()
    }
}

impl Default for MockRestAdapterState {
    fn default() -> Self {
        Self {
            state: RestTransportState::Idle,
            request_count: 0,
            last_url: None,
            last_status: None,
            behavior_plan: MockBehaviorPlan::default(),
            default_response_queue: VecDeque::new(),
            route_response_queues: HashMap::new(),
            outbound_log: Vec::new(),
            inbound_log: Vec::new(),
            last_error: None,
        }
    }
}

/// In-memory transport: serves queued responses, injects failures from a
/// behavior plan and records every request it sees.
#[derive(Clone, Debug)]
pub struct MockRestAdapter {
    state: Arc<Mutex<MockRestAdapterState>>,
}

impl MockRestAdapter {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(MockRestAdapterState::default())),
        }
    }

    pub fn with_behavior_plan(behavior_plan: MockBehaviorPlan) -> Self {
        let state = MockRestAdapterState {
            behavior_plan,
            ..MockRestAdapterState::default()
        };
        Self {
            state: Arc::new(Mutex::new(state)),
        }
    }

    pub fn with_behavior(behavior: MockBehavior) -> Self {
        let mut plan = MockBehaviorPlan::default();
        plan.push(behavior);
        Self::with_behavior_plan(plan)
    }

    fn lock(&self, context: &str) -> MutexGuard<'_, MockRestAdapterState> {
        self.state
            .lock()
            .unwrap_or_else(|_| panic!("mock transport mutex poisoned while {context}"))
    }

    pub fn snapshot(&self) -> MockRestStateSnapshot {
        self.lock("taking snapshot").snapshot()
    }

    pub fn queue_response(&self, response: MockResponse) {
        self.lock("queueing response")
            .default_response_queue
            .push_back(response);
    }

    pub fn queue_response_for(
        &self,
        method: Method,
        url: impl Into<String>,
        response: MockResponse,
    ) {
        self.lock("queueing response by route")
            .route_response_queues
            .entry((method, url.into()))
            .or_default()
            .push_back(response);
    }

    pub fn queue_post_response(&self, url: impl Into<String>, response: MockResponse) {
        self.queue_response_for(Method::POST, url, response);
    }

    pub fn outbound_requests(&self) -> Vec<RestRequest> {
        self.lock("reading outbound log").outbound_log.clone()
    }

    pub fn last_request(&self) -> Option<RestRequest> {
        self.lock("reading outbound log").outbound_log.last().cloned()
    }

    pub fn outbound_count(&self) -> usize {
        self.lock("reading outbound count").outbound_log.len()
    }

    pub fn inbound_count(&self) -> usize {
        self.lock("reading inbound count").inbound_log.len()
    }
}

impl Default for MockRestAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl RestTransport for MockRestAdapter {
    fn execute(&self, request: RestRequest) -> RestFuture<RestResult<RestResponse>> {
        let adapter = self.clone();
        Box::pin(async move {
            let start = Instant::now();
            let mut state = adapter.lock("executing request");
            let behavior = state.behavior_plan.pop();

            state.outbound_log.push(request.clone());
            state.request_count += 1;
            state.last_url = Some(request.url.clone());
            state.state = RestTransportState::Busy;
            state.last_error = None;

            if let Some(error) = behavior.into_error() {
                state.state = RestTransportState::Error;
                state.last_error = Some(error.message.clone());
                state.last_status = error.status;
                return Err(error);
            }

            // Nothing queued: an empty 200.
            let response = state
                .next_response(&request)
                .unwrap_or_else(|| MockResponse::empty(200));
            let elapsed = start.elapsed();
            let response = RestResponse {
                status: response.status,
                headers: response.headers,
                body: response.body,
                elapsed,
            };

            state.inbound_log.push(response.clone());
            state.last_status = Some(response.status);
            state.state = RestTransportState::Idle;
            Ok(response)
        })
    }
}
