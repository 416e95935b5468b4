use std::{
    future::Future,
    io,
    pin::Pin,
    sync::Arc,
    time::{Duration, Instant},
};

use bytes::Bytes;
use reqwest::header::{HeaderName, HeaderValue};
use reqwest::{Client as ReqwestClient, Method};
use thiserror::Error;

use crate::analysis::ApiError;

pub type RestBytes = Bytes;
pub type RestFuture<T> = Pin<Box<dyn Future<Output = T> + Send + 'static>>;
pub type RestResult<T> = Result<T, RequestError>;

/// Request state for a transport that tracks it (the mock does).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RestTransportState {
    Idle,
    Busy,
    Error,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RequestErrorKind {
    /// The request never produced a response: connect, send, receive or timeout.
    Transport,
    /// The response carried no content.
    EmptyBody,
    /// The response status was outside 2xx.
    HttpStatus,
    Encode,
    Decode,
    /// Writing the response text to the caller's sink failed.
    Output,
    Internal,
}

/// Which step of the exchange a `Transport` failure happened in.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TransportPhase {
    Connect,
    Send,
    Receive,
    Timeout,
}

#[derive(Clone, Debug, Error)]
#[error("request error {kind:?} status={status:?} {message}")]
pub struct RequestError {
    pub kind: RequestErrorKind,
    pub status: Option<u16>,
    pub phase: Option<TransportPhase>,
    pub message: String,
    /// Service error envelope, when a failed response body carried one.
    pub api_error: Option<ApiError>,
}

impl RequestError {
    pub fn new(kind: RequestErrorKind, status: Option<u16>, message: impl Into<String>) -> Self {
        Self {
            kind,
            status,
            phase: None,
            message: message.into(),
            api_error: None,
        }
    }

    pub fn transport(phase: TransportPhase, status: Option<u16>, message: impl Into<String>) -> Self {
        Self {
            phase: Some(phase),
            ..Self::new(RequestErrorKind::Transport, status, message)
        }
    }

    pub fn empty_body(status: u16) -> Self {
        Self::new(
            RequestErrorKind::EmptyBody,
            Some(status),
            "response body is empty",
        )
    }

    pub fn http_status(status: u16, message: impl Into<String>) -> Self {
        Self::new(RequestErrorKind::HttpStatus, Some(status), message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(RequestErrorKind::Internal, None, message)
    }

    pub fn encode(err: sonic_rs::Error) -> Self {
        Self::new(RequestErrorKind::Encode, None, err.to_string())
    }

    pub fn decode(err: sonic_rs::Error) -> Self {
        Self::new(RequestErrorKind::Decode, None, err.to_string())
    }

    pub fn output(err: io::Error) -> Self {
        Self::new(RequestErrorKind::Output, None, err.to_string())
    }

    pub fn with_api_error(mut self, api_error: ApiError) -> Self {
        self.api_error = Some(api_error);
        self
    }

    /// Timeouts and connection failures are recognised regardless of the
    /// phase the caller was in; everything else keeps `phase`. A request
    /// reqwest refused to build (bad URL, bad header) never reached the
    /// network and is `Internal`.
    fn from_reqwest(phase: TransportPhase, err: reqwest::Error) -> Self {
        if err.is_builder() {
            return Self::internal(format!("invalid request: {err}"));
        }
        let phase = if err.is_timeout() {
            TransportPhase::Timeout
        } else if err.is_connect() {
            TransportPhase::Connect
        } else {
            phase
        };
        let status = err.status().map(|s| s.as_u16());
        Self::transport(phase, status, err.to_string())
    }

    pub fn kind(&self) -> RequestErrorKind {
        self.kind
    }

    pub fn status(&self) -> Option<u16> {
        self.status
    }

    pub fn is_transport(&self) -> bool {
        self.kind == RequestErrorKind::Transport
    }
}

#[derive(Clone, Debug)]
pub struct RestRequest {
    pub method: Method,
    pub url: String,
    pub headers: Vec<(String, RestBytes)>,
    pub body: Option<RestBytes>,
    pub timeout: Option<Duration>,
}

impl RestRequest {
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: Vec::new(),
            body: None,
            timeout: None,
        }
    }

    pub fn post(url: impl Into<String>) -> Self {
        Self::new(Method::POST, url)
    }

    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<RestBytes>) -> Self {
        self.headers.push((key.into(), value.into()));
        self
    }

    pub fn with_body(mut self, body: impl Into<RestBytes>) -> Self {
        self.body = Some(body.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// First value for `name`, compared case-insensitively.
    pub fn header(&self, name: &str) -> Option<&[u8]> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_ref())
    }
}

#[derive(Clone, Debug)]
pub struct RestResponse {
    pub status: u16,
    pub headers: Vec<(String, RestBytes)>,
    pub body: RestBytes,
    pub elapsed: Duration,
}

impl RestResponse {
    pub fn status(&self) -> u16 {
        self.status
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    pub fn has_body(&self) -> bool {
        !self.body.is_empty()
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

pub trait RestTransport: Send + Sync {
    fn execute(&self, request: RestRequest) -> RestFuture<RestResult<RestResponse>>;
}

pub type SharedRestTransport = dyn RestTransport + Send + Sync;

#[derive(Clone)]
pub struct Client {
    transport: Arc<SharedRestTransport>,
}

impl Client {
    pub fn new() -> Self {
        Self::with_transport(ReqwestTransport::new())
    }

    pub fn with_transport<T>(transport: T) -> Self
    where
        T: RestTransport + 'static,
    {
        Self {
            transport: Arc::new(transport),
        }
    }

    pub async fn execute(&self, request: RestRequest) -> RestResult<RestResponse> {
        self.transport.execute(request).await
    }
}

impl Default for Client {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Clone, Debug)]
pub struct ReqwestTransport {
    client: ReqwestClient,
}

impl ReqwestTransport {
    pub fn new() -> Self {
        Self {
            client: ReqwestClient::new(),
        }
    }
}

impl Default for ReqwestTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl RestTransport for ReqwestTransport {
    fn execute(&self, request: RestRequest) -> RestFuture<RestResult<RestResponse>> {
        let client = self.client.clone();
        Box::pin(async move {
            let start = Instant::now();
            let mut req = client.request(request.method.clone(), &request.url);

            for (key, value) in request.headers {
                let name = HeaderName::from_bytes(key.as_bytes()).map_err(|err| {
                    RequestError::internal(format!("invalid header name {key:?}: {err}"))
                })?;
                let value = HeaderValue::from_bytes(value.as_ref()).map_err(|err| {
                    RequestError::internal(format!("invalid value for header {key}: {err}"))
                })?;
                req = req.header(name, value);
            }

            if let Some(body) = request.body {
                req = req.body(body);
            }

            if let Some(timeout) = request.timeout {
                req = req.timeout(timeout);
            }

            let resp = req
                .send()
                .await
                .map_err(|err| RequestError::from_reqwest(TransportPhase::Send, err))?;

            let status = resp.status().as_u16();
            let headers = resp
                .headers()
                .iter()
                .map(|(name, value)| (name.to_string(), Bytes::copy_from_slice(value.as_ref())))
                .collect();
            // `bytes()` consumes the response, so the connection is released on
            // every path out of here.
            let body = resp
                .bytes()
                .await
                .map_err(|err| RequestError::from_reqwest(TransportPhase::Receive, err))?;
            let elapsed = start.elapsed();

            Ok(RestResponse {
                status,
                headers,
                body,
                elapsed,
            })
        })
    }
}
