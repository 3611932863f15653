use kube::config::{KubeConfigOptions, Kubeconfig};
use kube::{Client, Config};
use serde::Serialize;
use tracing::{debug, info};

use crate::error::{ConfigError, Error};

/// Set by the kubelet on every pod; its presence is the in-cluster signal.
const IN_CLUSTER_ENV: &str = "KUBERNETES_SERVICE_HOST";

/// Holds the credential source resolved once at startup and mints API
/// clients from it.
///
/// A local kubeconfig takes precedence; only when none can be read does the
/// connector fall back to the pod service account, and only if the
/// in-cluster environment is actually present. Anything else is fatal.
pub struct ClusterConnector {
    mode: Mode,
    default_client: Client,
}

enum Mode {
    Kubeconfig(Kubeconfig),
    InCluster,
}

/// One selectable kubeconfig context, as reported to the frontend.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct KubeContext {
    pub name: String,
    pub cluster: String,
    pub user: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ContextList {
    #[serde(rename = "currentContext", skip_serializing_if = "Option::is_none")]
    pub current: Option<String>,
    pub contexts: Vec<KubeContext>,
}

impl ClusterConnector {
    pub async fn init() -> Result<Self, ConfigError> {
        match Kubeconfig::read() {
            Ok(kubeconfig) => {
                info!(contexts = kubeconfig.contexts.len(), "loaded kubeconfig");
                let config = Config::from_custom_kubeconfig(
                    kubeconfig.clone(),
                    &KubeConfigOptions::default(),
                )
                .await?;
                let default_client = Client::try_from(config)?;
                Ok(Self {
                    mode: Mode::Kubeconfig(kubeconfig),
                    default_client,
                })
            }
            Err(error) if std::env::var_os(IN_CLUSTER_ENV).is_some() => {
                debug!(%error, "no kubeconfig, using the pod service account");
                let default_client = Client::try_from(Config::incluster()?)?;
                Ok(Self {
                    mode: Mode::InCluster,
                    default_client,
                })
            }
            Err(error) => Err(ConfigError::NoCredentials(error)),
        }
    }

    /// Returns a client for the given kubeconfig context, or the default
    /// client when no context is named.
    ///
    /// Named contexts mint a fresh client on every call; in in-cluster mode
    /// there is exactly one implicit context and the name is ignored.
    pub async fn client(&self, context: Option<&str>) -> Result<Client, Error> {
        let kubeconfig = match &self.mode {
            Mode::InCluster => return Ok(self.default_client.clone()),
            Mode::Kubeconfig(kubeconfig) => kubeconfig,
        };
        let name = match context {
            None => return Ok(self.default_client.clone()),
            Some(name) => name,
        };
        if !kubeconfig.contexts.iter().any(|c| c.name == name) {
            return Err(Error::UnknownContext(name.to_string()));
        }
        debug!(context = %name, "building client for custom context");
        let options = KubeConfigOptions {
            context: Some(name.to_string()),
            ..KubeConfigOptions::default()
        };
        let config = Config::from_custom_kubeconfig(kubeconfig.clone(), &options)
            .await
            .map_err(|e| Error::Context(name.to_string(), e))?;
        Client::try_from(config).map_err(Error::from)
    }

    /// Lists the contexts available for selection, in kubeconfig order.
    /// Empty in in-cluster mode.
    pub fn contexts(&self) -> ContextList {
        match &self.mode {
            Mode::InCluster => ContextList::default(),
            Mode::Kubeconfig(kubeconfig) => context_list(kubeconfig),
        }
    }
}

fn context_list(kubeconfig: &Kubeconfig) -> ContextList {
    let contexts = kubeconfig
        .contexts
        .iter()
        .filter_map(|named| {
            let context = named.context.as_ref()?;
            Some(KubeContext {
                name: named.name.clone(),
                cluster: context.cluster.clone(),
                user: context.user.clone().unwrap_or_default(),
                namespace: context.namespace.clone(),
            })
        })
        .collect();
    ContextList {
        current: kubeconfig.current_context.clone(),
        contexts,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const KUBECONFIG_YAML: &str = r#"
apiVersion: v1
kind: Config
current-context: staging
clusters:
  - name: staging-cluster
    cluster:
      server: https://staging.example.com:6443
  - name: prod-cluster
    cluster:
      server: https://prod.example.com:6443
contexts:
  - name: staging
    context:
      cluster: staging-cluster
      user: staging-admin
      namespace: gatekeeper-system
  - name: prod
    context:
      cluster: prod-cluster
      user: prod-admin
users:
  - name: staging-admin
    user: {}
  - name: prod-admin
    user: {}
"#;

    #[test]
    fn lists_contexts_in_kubeconfig_order() {
        let kubeconfig: Kubeconfig = serde_yaml::from_str(KUBECONFIG_YAML).unwrap();
        let list = context_list(&kubeconfig);
        assert_eq!(list.current.as_deref(), Some("staging"));
        assert_eq!(
            list.contexts,
            vec![
                KubeContext {
                    name: "staging".to_string(),
                    cluster: "staging-cluster".to_string(),
                    user: "staging-admin".to_string(),
                    namespace: Some("gatekeeper-system".to_string()),
                },
                KubeContext {
                    name: "prod".to_string(),
                    cluster: "prod-cluster".to_string(),
                    user: "prod-admin".to_string(),
                    namespace: None,
                },
            ]
        );
    }

    #[test]
    fn context_list_serializes_current_context_key() {
        let kubeconfig: Kubeconfig = serde_yaml::from_str(KUBECONFIG_YAML).unwrap();
        let json = serde_json::to_value(context_list(&kubeconfig)).unwrap();
        assert_eq!(json["currentContext"], "staging");
        assert_eq!(json["contexts"][1]["name"], "prod");
        assert!(json["contexts"][1].get("namespace").is_none());
    }
}
