#![deny(warnings, rust_2018_idioms)]
#![forbid(unsafe_code)]

pub use gatekeeper_dashboard_core as core;
pub use gatekeeper_dashboard_k8s as k8s;

mod args;
mod server;

pub use self::args::Args;
