use k8s_openapi::apimachinery::pkg::apis::meta::v1::APIGroupList;
use kube::Client;
use tracing::debug;

use crate::error::Error;

/// Resolves the version the API server prefers for a CRD group.
///
/// Gatekeeper's CRD versions have moved between releases, so the dashboard
/// asks the server instead of hardcoding one. A group that is not served at
/// all silently resolves to `fallback`; only transport failures propagate.
pub async fn preferred_version(
    client: &Client,
    group: &str,
    fallback: &str,
) -> Result<String, Error> {
    let groups = client.list_api_groups().await?;
    Ok(scan_preferred_version(&groups, group).unwrap_or_else(|| {
        debug!(%group, %fallback, "group not served, using fallback version");
        fallback.to_string()
    }))
}

fn scan_preferred_version(groups: &APIGroupList, name: &str) -> Option<String> {
    let group = groups.groups.iter().find(|g| g.name == name)?;
    group
        .preferred_version
        .as_ref()
        .map(|v| v.version.clone())
        .or_else(|| group.versions.first().map(|v| v.version.clone()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use k8s_openapi::apimachinery::pkg::apis::meta::v1::{APIGroup, GroupVersionForDiscovery};

    fn group(name: &str, preferred: Option<&str>, versions: &[&str]) -> APIGroup {
        APIGroup {
            name: name.to_string(),
            preferred_version: preferred.map(|v| GroupVersionForDiscovery {
                group_version: format!("{name}/{v}"),
                version: v.to_string(),
            }),
            versions: versions
                .iter()
                .map(|v| GroupVersionForDiscovery {
                    group_version: format!("{name}/{v}"),
                    version: v.to_string(),
                })
                .collect(),
            ..APIGroup::default()
        }
    }

    #[test]
    fn returns_declared_preferred_version() {
        let groups = APIGroupList {
            groups: vec![
                group("apps", Some("v1"), &["v1"]),
                group("templates.gatekeeper.sh", Some("v1"), &["v1", "v1beta1"]),
            ],
        };
        assert_eq!(
            scan_preferred_version(&groups, "templates.gatekeeper.sh").as_deref(),
            Some("v1")
        );
    }

    #[test]
    fn missing_group_resolves_to_none() {
        let groups = APIGroupList {
            groups: vec![group("apps", Some("v1"), &["v1"])],
        };
        assert_eq!(scan_preferred_version(&groups, "templates.gatekeeper.sh"), None);
    }

    #[test]
    fn falls_back_to_first_served_version_without_preferred() {
        let groups = APIGroupList {
            groups: vec![group("templates.gatekeeper.sh", None, &["v1beta1", "v1alpha1"])],
        };
        assert_eq!(
            scan_preferred_version(&groups, "templates.gatekeeper.sh").as_deref(),
            Some("v1beta1")
        );
    }
}
