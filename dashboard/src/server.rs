use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;

use http_body_util::Full;
use hyper::body::{Bytes, Incoming};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{header, Method, Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use serde::Serialize;
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tracing::{debug, info, warn};

use crate::core::ErrorAnswer;
use crate::k8s::{self, ClusterConnector};

pub async fn serve(addr: SocketAddr, connector: Arc<ClusterConnector>) -> anyhow::Result<()> {
    let listener = TcpListener::bind(addr).await?;
    info!(%addr, "HTTP API server listening");
    loop {
        // Accept failures are transient (aborted handshakes, fd pressure);
        // they must not take the whole server down.
        let (stream, peer) = match listener.accept().await {
            Ok(conn) => conn,
            Err(error) => {
                warn!(%error, "failed to accept connection");
                continue;
            }
        };
        let connector = connector.clone();
        tokio::spawn(async move {
            let service = service_fn(move |req| {
                let connector = connector.clone();
                async move { Ok::<_, Infallible>(handle(&connector, req).await) }
            });
            if let Err(error) = http1::Builder::new()
                .serve_connection(TokioIo::new(stream), service)
                .await
            {
                debug!(%peer, %error, "connection error");
            }
        });
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Route<'a> {
    Health,
    Auth,
    Contexts,
    Constraints(Option<&'a str>),
    ConstraintTemplates(Option<&'a str>),
    Configs(Option<&'a str>),
    Events(Option<&'a str>),
}

/// Maps a request path to an operation. Trailing slashes are tolerated so
/// `/api/v1/constraints/` and `/api/v1/constraints` are the same route; an
/// optional further segment names a kubeconfig context.
fn route(path: &str) -> Option<Route<'_>> {
    let mut segments = path.split('/').filter(|s| !s.is_empty());
    let route = match (segments.next()?, segments.next(), segments.next()) {
        ("health", None, None) => Route::Health,
        ("api", Some("v1"), Some(op)) => {
            let context = segments.next();
            match op {
                "auth" if context.is_none() => Route::Auth,
                "contexts" if context.is_none() => Route::Contexts,
                "constraints" => Route::Constraints(context),
                "constrainttemplates" => Route::ConstraintTemplates(context),
                "configs" => Route::Configs(context),
                "events" => Route::Events(context),
                _ => return None,
            }
        }
        _ => return None,
    };
    // Anything after the context segment is not a known route.
    if segments.next().is_some() {
        return None;
    }
    Some(route)
}

async fn handle(connector: &ClusterConnector, req: Request<Incoming>) -> Response<Full<Bytes>> {
    let Some(route) = route(req.uri().path()) else {
        return status_only(StatusCode::NOT_FOUND);
    };
    if req.method() != Method::GET {
        return status_only(StatusCode::METHOD_NOT_ALLOWED);
    }

    match route {
        Route::Health => json_response(StatusCode::OK, &json!({ "status": "ok" })),
        // Matches the original backend's contract: the JSON API carries no
        // session itself, auth is enforced in front of it when enabled.
        Route::Auth => json_response(StatusCode::OK, &json!({ "auth_enabled": false })),
        Route::Contexts => json_response(StatusCode::OK, &connector.contexts()),
        Route::Constraints(context) => {
            reply(fetch_constraints(connector, context).await)
        }
        Route::ConstraintTemplates(context) => {
            reply(fetch_constraint_templates(connector, context).await)
        }
        Route::Configs(context) => reply(fetch_configs(connector, context).await),
        Route::Events(context) => {
            let namespace = namespace_param(req.uri().query());
            reply(fetch_events(connector, context, namespace).await)
        }
    }
}

async fn fetch_constraints(
    connector: &ClusterConnector,
    context: Option<&str>,
) -> Result<Vec<Value>, k8s::Error> {
    let client = connector.client(context).await?;
    k8s::constraints(&client).await
}

async fn fetch_constraint_templates(
    connector: &ClusterConnector,
    context: Option<&str>,
) -> Result<k8s::TemplatesWithConstraints, k8s::Error> {
    let client = connector.client(context).await?;
    k8s::constraint_templates(&client).await
}

async fn fetch_configs(
    connector: &ClusterConnector,
    context: Option<&str>,
) -> Result<Vec<Value>, k8s::Error> {
    let client = connector.client(context).await?;
    k8s::configs(&client).await
}

async fn fetch_events(
    connector: &ClusterConnector,
    context: Option<&str>,
    namespace: Option<&str>,
) -> Result<Vec<Value>, k8s::Error> {
    let client = connector.client(context).await?;
    k8s::webhook_events(&client, namespace).await
}

fn namespace_param(query: Option<&str>) -> Option<&str> {
    query?
        .split('&')
        .find_map(|kv| kv.strip_prefix("namespace="))
        .filter(|v| !v.is_empty())
}

fn reply<T: Serialize>(result: Result<T, k8s::Error>) -> Response<Full<Bytes>> {
    match result {
        Ok(body) => json_response(StatusCode::OK, &body),
        Err(err) => error_answer(&err),
    }
}

/// The single place where the error taxonomy becomes an HTTP answer; no
/// aggregation call site does its own mapping.
fn error_answer(err: &k8s::Error) -> Response<Full<Bytes>> {
    warn!(%err, "request failed");
    json_response(StatusCode::INTERNAL_SERVER_ERROR, &answer_for(err))
}

fn answer_for(err: &k8s::Error) -> ErrorAnswer {
    match err {
        k8s::Error::Connectivity(_) => ErrorAnswer::new(
            "Could not connect to the Kubernetes cluster",
            "Is the current kubeconfig context valid?",
            err.to_string(),
        ),
        k8s::Error::UnknownContext(_) | k8s::Error::Context(..) => ErrorAnswer::new(
            "Could not switch to the requested context",
            "Please check the context definition in the kubeconfig file.",
            err.to_string(),
        ),
        _ => ErrorAnswer::new(
            "We had a problem while asking the API for Gatekeeper objects",
            "Is Gatekeeper deployed in the cluster?",
            err.to_string(),
        ),
    }
}

fn json_response<T: Serialize>(status: StatusCode, body: &T) -> Response<Full<Bytes>> {
    match serde_json::to_vec(body) {
        Ok(buf) => Response::builder()
            .status(status)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Full::new(Bytes::from(buf)))
            .unwrap(),
        Err(error) => {
            warn!(%error, "failed to encode response body");
            status_only(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

fn status_only(status: StatusCode) -> Response<Full<Bytes>> {
    Response::builder()
        .status(status)
        .body(Full::new(Bytes::new()))
        .unwrap()
}
