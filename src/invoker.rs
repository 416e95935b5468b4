//! One-shot JSON POST: serialize, send, surface the response text.
//!
//! The response text reaches the caller's sink before any status error is
//! returned, so a failed call still shows what the service said. Transport
//! failures and empty bodies write nothing.

use std::{
    collections::BTreeMap,
    io::Write,
    sync::{Arc, OnceLock},
    time::Duration,
};

use serde::Serialize;
use tokio::runtime::{Builder, Handle, Runtime};
use tracing::{debug, warn};

use crate::adapter::{Client, RequestError, RestRequest, RestResult, RestTransport};
use crate::analysis::ApiErrorResponse;

pub const CONTENT_TYPE_HEADER: &str = "Content-Type";
pub const JSON_CONTENT_TYPE: &str = "application/json; charset=utf-8";

#[derive(Clone)]
pub struct RequestInvoker {
    client: Client,
    timeout: Option<Duration>,
    runtime: Arc<OnceLock<BlockingRuntime>>,
}

/// Runtime behind `invoke_blocking`. Shuts down without blocking, so the last
/// invoker clone may be dropped inside an async context.
struct BlockingRuntime(Option<Runtime>);

impl Drop for BlockingRuntime {
    fn drop(&mut self) {
        if let Some(runtime) = self.0.take() {
            runtime.shutdown_background();
        }
    }
}

impl RequestInvoker {
    pub fn new() -> Self {
        Self::with_client(Client::new())
    }

    pub fn with_client(client: Client) -> Self {
        Self {
            client,
            timeout: None,
            runtime: Arc::new(OnceLock::new()),
        }
    }

    pub fn with_transport<T>(transport: T) -> Self
    where
        T: RestTransport + 'static,
    {
        Self::with_client(Client::with_transport(transport))
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// POSTs `body` as JSON to `url` with `headers`, writes the response text
    /// to `out` and returns it.
    ///
    /// `Content-Type: application/json; charset=utf-8` is added unless
    /// `headers` already names a content type.
    pub async fn invoke<T, W>(
        &self,
        url: &str,
        headers: &BTreeMap<String, String>,
        body: &T,
        out: &mut W,
    ) -> RestResult<String>
    where
        T: Serialize + ?Sized,
        W: Write + ?Sized,
    {
        let payload = sonic_rs::to_vec(body).map_err(RequestError::encode)?;
        let payload_len = payload.len();

        let mut request = RestRequest::post(url);
        for (name, value) in headers {
            request = request.with_header(name.clone(), value.clone());
        }
        if request.header(CONTENT_TYPE_HEADER).is_none() {
            request = request.with_header(CONTENT_TYPE_HEADER, JSON_CONTENT_TYPE);
        }
        request = request.with_body(payload);
        if let Some(timeout) = self.timeout {
            request = request.with_timeout(timeout);
        }

        debug!(url, payload_len, "sending request");
        let response = self
            .client
            .execute(request)
            .await
            .inspect_err(|err| warn!(url, error = %err, "request did not complete"))?;

        let status = response.status();
        debug!(
            status,
            elapsed_ms = response.elapsed.as_millis() as u64,
            body_len = response.body().len(),
            "received response"
        );
        for (name, value) in &response.headers {
            debug!(header = %name, value = %String::from_utf8_lossy(value), "response header");
        }

        if !response.has_body() {
            warn!(status, "response body is empty");
            return Err(RequestError::empty_body(status));
        }

        let text = response.text();
        writeln!(out, "{text}")
            .and_then(|()| out.flush())
            .map_err(RequestError::output)?;

        if !response.is_success() {
            warn!(status, "request failed");
            let error = match ApiErrorResponse::parse(response.body()) {
                Some(api_error) => {
                    RequestError::http_status(status, api_error.to_string()).with_api_error(api_error)
                }
                None => RequestError::http_status(status, format!("HTTP {status}")),
            };
            return Err(error);
        }

        Ok(text)
    }

    /// Blocking form of [`invoke`](Self::invoke) for synchronous callers.
    ///
    /// Runs on a current-thread runtime shared by this invoker and its clones.
    /// Called from within an async runtime it fails with `Internal` instead of
    /// blocking that runtime's thread.
    pub fn invoke_blocking<T, W>(
        &self,
        url: &str,
        headers: &BTreeMap<String, String>,
        body: &T,
        out: &mut W,
    ) -> RestResult<String>
    where
        T: Serialize + ?Sized,
        W: Write + ?Sized,
    {
        if Handle::try_current().is_ok() {
            return Err(RequestError::internal(
                "invoke_blocking called from within an async runtime",
            ));
        }
        self.runtime()?
            .block_on(self.invoke(url, headers, body, out))
    }

    fn runtime(&self) -> RestResult<&Runtime> {
        let blocking = match self.runtime.get() {
            Some(blocking) => blocking,
            None => {
                let runtime = Builder::new_current_thread()
                    .enable_all()
                    .build()
                    .map_err(|err| {
                        RequestError::internal(format!("failed to start runtime: {err}"))
                    })?;
                self.runtime
                    .get_or_init(|| BlockingRuntime(Some(runtime)))
            }
        };
        blocking
            .0
            .as_ref()
            .ok_or_else(|| RequestError::internal("blocking runtime already shut down"))
    }
}

impl Default for RequestInvoker {
    fn default() -> Self {
        Self::new()
    }
}
