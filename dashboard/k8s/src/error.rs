use kube::config::{InClusterError, KubeconfigError};
use kube::core::ErrorResponse;
use thiserror::Error;

/// Startup-time credential resolution failures. Any of these means the
/// process cannot serve a single request and must exit.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("no kubeconfig found and no in-cluster environment detected: {0}")]
    NoCredentials(#[source] KubeconfigError),

    #[error("failed to load kubeconfig: {0}")]
    Kubeconfig(#[from] KubeconfigError),

    #[error("failed to load in-cluster credentials: {0}")]
    InCluster(#[from] InClusterError),

    #[error("failed to build Kubernetes client: {0}")]
    Client(#[from] kube::Error),
}

/// Per-request failures, classified so that every aggregation call site can
/// translate them uniformly.
///
/// `NotFound` marks a missing CRD or group; callers turn it into an empty
/// result rather than an error, since a cluster without Gatekeeper is a
/// normal state for the dashboard.
#[derive(Debug, Error)]
pub enum Error {
    #[error("could not connect to the Kubernetes API server: {0}")]
    Connectivity(#[source] kube::Error),

    #[error("resource not found: {0}")]
    NotFound(ErrorResponse),

    #[error("the Kubernetes API returned an error: {0}")]
    Api(ErrorResponse),

    #[error("unexpected Kubernetes client failure: {0}")]
    Unexpected(#[source] kube::Error),

    #[error("context {0:?} does not exist in the kubeconfig")]
    UnknownContext(String),

    #[error("failed to build client for context {0:?}: {1}")]
    Context(String, #[source] KubeconfigError),

    #[error("failed to serialize API object: {0}")]
    Serialize(#[from] serde_json::Error),
}

impl From<kube::Error> for Error {
    fn from(err: kube::Error) -> Self {
        match err {
            kube::Error::Api(resp) if resp.code == 404 => Error::NotFound(resp),
            kube::Error::Api(resp) => Error::Api(resp),
            err @ (kube::Error::HyperError(_) | kube::Error::Service(_)) => {
                Error::Connectivity(err)
            }
            err => Error::Unexpected(err),
        }
    }
}

impl Error {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound(_))
    }
}
