#![deny(warnings, rust_2018_idioms)]
#![forbid(unsafe_code)]

mod client;
mod discovery;
mod error;
mod events;
mod gatekeeper;

pub use self::{
    client::{ClusterConnector, ContextList, KubeContext},
    discovery::preferred_version,
    error::{ConfigError, Error},
    events::webhook_events,
    gatekeeper::{configs, constraint_templates, constraints, TemplatesWithConstraints},
};
pub use kube;
pub use kube::Client;
