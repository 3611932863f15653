use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tracing::info;

use crate::k8s::ClusterConnector;
use crate::server;

#[derive(Debug, Parser)]
#[clap(
    name = "gatekeeper-dashboard",
    about = "A read-only JSON API over Gatekeeper policy resources",
    version
)]
pub struct Args {
    #[clap(
        long,
        default_value = "gatekeeper_dashboard=info,warn",
        env = "GATEKEEPER_DASHBOARD_LOG"
    )]
    log_level: kubert::LogFilter,

    #[clap(long, default_value = "plain", env = "GATEKEEPER_DASHBOARD_LOG_FORMAT")]
    log_format: kubert::LogFormat,

    /// Address the JSON API listens on.
    #[clap(long, default_value = "0.0.0.0:8080", env = "GATEKEEPER_DASHBOARD_ADDR")]
    addr: SocketAddr,
}

impl Args {
    #[inline]
    pub async fn parse_and_run() -> Result<()> {
        Self::parse().run().await
    }

    pub async fn run(self) -> Result<()> {
        let Self {
            log_level,
            log_format,
            addr,
        } = self;

        log_format
            .try_init(log_level)
            .expect("must configure logging");

        // Credentials are resolved exactly once; a process that cannot
        // reach any credential source refuses to start.
        let connector = Arc::new(ClusterConnector::init().await?);

        tokio::select! {
            res = server::serve(addr, connector) => res,
            _ = tokio::signal::ctrl_c() => {
                info!("shutdown signal received");
                Ok(())
            }
        }
    }
}
