//! Client for the Azure AI Content Safety text endpoints (protected material
//! for code, shield prompt) over a small reqwest wrapper with an in-memory
//! mock transport for deterministic tests.

pub mod adapter;
pub mod analysis;
pub mod config;
pub mod content_safety;
pub mod endpoint;
pub mod invoker;
pub mod logging;
pub mod mock;
pub mod request;

pub use reqwest::Method;

pub use adapter::{
    Client, ReqwestTransport, RequestError, RequestErrorKind, RestBytes, RestFuture, RestRequest,
    RestResponse, RestResult, RestTransport, RestTransportState, TransportPhase,
};
pub use analysis::{
    ApiError, ApiErrorResponse, ApiInnerError, AttackAnalysis, CodeCitation,
    ProtectedMaterialAnalysis, ProtectedMaterialResult, ShieldPromptResult,
};
pub use config::{ConfigError, ContentSafetyConfig, Credentials};
pub use content_safety::{ContentSafetyClient, decode};
pub use endpoint::Operation;
pub use invoker::RequestInvoker;
pub use mock::{MockBehavior, MockBehaviorPlan, MockResponse, MockRestAdapter, MockRestStateSnapshot};
pub use request::{ProtectedMaterialRequest, ShieldPromptRequest};
