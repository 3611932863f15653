use k8s_openapi::api::core::v1::Event;
use kube::api::{Api, ListParams};
use kube::Client;
use serde_json::Value;

use crate::error::Error;

/// Source component Gatekeeper's admission webhook stamps on its events.
const WEBHOOK_SOURCE: &str = "gatekeeper-webhook";

/// Events emitted by the Gatekeeper admission webhook, from one namespace
/// or the whole cluster.
///
/// The events API does not support a field selector on `source.component`,
/// so the filter happens client-side.
pub async fn webhook_events(client: &Client, namespace: Option<&str>) -> Result<Vec<Value>, Error> {
    let api: Api<Event> = match namespace {
        Some(ns) => Api::namespaced(client.clone(), ns),
        None => Api::all(client.clone()),
    };
    let events = api.list(&ListParams::default()).await?;
    events
        .items
        .into_iter()
        .filter(is_webhook_event)
        .map(|e| serde_json::to_value(e).map_err(Error::from))
        .collect()
}

fn is_webhook_event(event: &Event) -> bool {
    event
        .source
        .as_ref()
        .and_then(|s| s.component.as_deref())
        .is_some_and(|c| c == WEBHOOK_SOURCE)
}

#[cfg(test)]
mod tests {
    use super::*;
    use k8s_openapi::api::core::v1::EventSource;

    fn event(component: Option<&str>) -> Event {
        Event {
            source: component.map(|c| EventSource {
                component: Some(c.to_string()),
                ..EventSource::default()
            }),
            ..Event::default()
        }
    }

    #[test]
    fn keeps_only_webhook_sourced_events() {
        assert!(is_webhook_event(&event(Some("gatekeeper-webhook"))));
        assert!(!is_webhook_event(&event(Some("kubelet"))));
        assert!(!is_webhook_event(&event(None)));
    }
}
