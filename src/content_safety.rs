use std::io::Write;

use serde::de::DeserializeOwned;

use crate::adapter::{RequestError, RestResult};
use crate::config::ContentSafetyConfig;
use crate::endpoint::Operation;
use crate::invoker::RequestInvoker;
use crate::request::{ProtectedMaterialRequest, ShieldPromptRequest};

/// Binds a resource's endpoint and credentials to a [`RequestInvoker`].
///
/// Every call returns the raw response text; use [`decode`] for a typed view.
#[derive(Clone)]
pub struct ContentSafetyClient {
    config: ContentSafetyConfig,
    invoker: RequestInvoker,
}

impl ContentSafetyClient {
    pub fn new(config: ContentSafetyConfig) -> Self {
        let invoker = RequestInvoker::new();
        Self::with_invoker(config, invoker)
    }

    /// The config's timeout is applied to `invoker`.
    pub fn with_invoker(config: ContentSafetyConfig, invoker: RequestInvoker) -> Self {
        let invoker = invoker.with_timeout(config.timeout);
        Self { config, invoker }
    }

    pub fn config(&self) -> &ContentSafetyConfig {
        &self.config
    }

    pub fn url(&self, operation: Operation) -> String {
        operation.url(&self.config.endpoint)
    }

    pub async fn detect_protected_material_for_code<W>(
        &self,
        code: &str,
        out: &mut W,
    ) -> RestResult<String>
    where
        W: Write + ?Sized,
    {
        let body = ProtectedMaterialRequest::new(code);
        let url = self.url(Operation::DetectProtectedMaterialForCode);
        self.invoker
            .invoke(&url, &self.config.credentials.headers(), &body, out)
            .await
    }

    pub fn detect_protected_material_for_code_blocking<W>(
        &self,
        code: &str,
        out: &mut W,
    ) -> RestResult<String>
    where
        W: Write + ?Sized,
    {
        let body = ProtectedMaterialRequest::new(code);
        let url = self.url(Operation::DetectProtectedMaterialForCode);
        self.invoker
            .invoke_blocking(&url, &self.config.credentials.headers(), &body, out)
    }

    pub async fn shield_prompt<W>(
        &self,
        request: &ShieldPromptRequest,
        out: &mut W,
    ) -> RestResult<String>
    where
        W: Write + ?Sized,
    {
        let url = self.url(Operation::ShieldPrompt);
        self.invoker
            .invoke(&url, &self.config.credentials.headers(), request, out)
            .await
    }

    pub fn shield_prompt_blocking<W>(
        &self,
        request: &ShieldPromptRequest,
        out: &mut W,
    ) -> RestResult<String>
    where
        W: Write + ?Sized,
    {
        let url = self.url(Operation::ShieldPrompt);
        self.invoker
            .invoke_blocking(&url, &self.config.credentials.headers(), request, out)
    }
}

/// Decodes response text into one of the analysis models.
pub fn decode<T: DeserializeOwned>(text: &str) -> RestResult<T> {
    sonic_rs::from_str(text).map_err(RequestError::decode)
}
