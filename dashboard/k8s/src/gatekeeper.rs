//! Aggregation of Gatekeeper custom resources.
//!
//! Constraint kinds are CRDs generated by Gatekeeper, one per
//! ConstraintTemplate; the template's `metadata.name` doubles as the plural
//! resource name of its instances. None of the kinds are known ahead of
//! time, so everything here goes through API discovery and the dynamic
//! object API.

use std::collections::BTreeMap;

use gatekeeper_dashboard_core::sort_by_violations;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::APIResourceList;
use kube::api::{Api, ListParams, ResourceExt};
use kube::core::{ApiResource, DynamicObject, GroupVersionKind};
use kube::Client;
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::discovery::preferred_version;
use crate::error::Error;

pub const CONSTRAINTS_GROUP: &str = "constraints.gatekeeper.sh";
pub const CONSTRAINTS_VERSION: &str = "v1beta1";
pub const TEMPLATES_GROUP: &str = "templates.gatekeeper.sh";
pub const TEMPLATES_FALLBACK_VERSION: &str = "v1beta1";
pub const TEMPLATES_PLURAL: &str = "constrainttemplates";
pub const CONFIGS_GROUP: &str = "config.gatekeeper.sh";
pub const CONFIGS_VERSION: &str = "v1alpha1";
pub const CONFIGS_PLURAL: &str = "configs";

/// Category tag that marks an API resource under the constraints group as
/// an actual constraint kind. The group also serves helper kinds and
/// subresources that must be skipped.
const CONSTRAINT_CATEGORY: &str = "constraint";

/// All constraint instances in the cluster, flattened across kinds and
/// sorted by violation count, worst first.
///
/// A cluster without the Gatekeeper constraint CRDs yields an empty list,
/// not an error.
pub async fn constraints(client: &Client) -> Result<Vec<Value>, Error> {
    let group_version = format!("{CONSTRAINTS_GROUP}/{CONSTRAINTS_VERSION}");
    let resources = match client.list_api_group_resources(&group_version).await {
        Ok(resources) => resources,
        Err(kube::Error::Api(resp)) if resp.code == 404 => {
            debug!(%group_version, "constraints group not served, returning empty set");
            return Ok(Vec::new());
        }
        Err(err) => return Err(err.into()),
    };

    let mut all = Vec::new();
    for plural in constraint_plurals(&resources) {
        match list_cluster_objects(client, CONSTRAINTS_GROUP, CONSTRAINTS_VERSION, &plural).await
        {
            Ok(items) => all.extend(to_values(items)?),
            Err(Error::NotFound(_)) => {
                debug!(%plural, "constraint kind vanished between discovery and fetch");
            }
            Err(err) => return Err(err),
        }
    }

    sort_by_violations(&mut all);
    Ok(all)
}

/// Constraint templates plus, for each template, the constraints that
/// instantiate it. The JSON keys are the wire contract with the frontend.
#[derive(Clone, Debug, Default, Serialize)]
pub struct TemplatesWithConstraints {
    pub constrainttemplates: Vec<Value>,
    pub constraints_by_constrainttemplates: BTreeMap<String, Vec<Value>>,
}

pub async fn constraint_templates(client: &Client) -> Result<TemplatesWithConstraints, Error> {
    let version = preferred_version(client, TEMPLATES_GROUP, TEMPLATES_FALLBACK_VERSION).await?;
    let templates =
        match list_cluster_objects(client, TEMPLATES_GROUP, &version, TEMPLATES_PLURAL).await {
            Ok(templates) => templates,
            Err(Error::NotFound(_)) => {
                debug!("constrainttemplates CRD not installed, returning empty set");
                return Ok(TemplatesWithConstraints::default());
            }
            Err(err) => return Err(err),
        };

    let mut by_template = BTreeMap::new();
    for template in &templates {
        let name = template.name_any();
        let instances = match list_cluster_objects(
            client,
            CONSTRAINTS_GROUP,
            CONSTRAINTS_VERSION,
            &name,
        )
        .await
        {
            Ok(instances) => to_values(instances)?,
            Err(Error::NotFound(_)) => {
                debug!(template = %name, "no constraint kind for template");
                Vec::new()
            }
            Err(err) => return Err(err),
        };
        by_template.insert(name, instances);
    }

    Ok(TemplatesWithConstraints {
        constrainttemplates: to_values(templates)?,
        constraints_by_constrainttemplates: by_template,
    })
}

/// The cluster's Gatekeeper Config objects. Gatekeeper supports a single
/// one today, but the API returns a list for future proofing.
pub async fn configs(client: &Client) -> Result<Vec<Value>, Error> {
    match list_cluster_objects(client, CONFIGS_GROUP, CONFIGS_VERSION, CONFIGS_PLURAL).await {
        Ok(items) => to_values(items),
        Err(Error::NotFound(_)) => {
            debug!("config CRD not installed, returning empty set");
            Ok(Vec::new())
        }
        Err(err) => Err(err),
    }
}

/// Plural names of the discovered constraint kinds, in name order so that
/// the final flattening has a deterministic tie-break.
fn constraint_plurals(resources: &APIResourceList) -> Vec<String> {
    let mut plurals: Vec<String> = resources
        .resources
        .iter()
        .filter(|r| {
            r.categories
                .as_ref()
                .is_some_and(|cats| cats.iter().any(|c| c == CONSTRAINT_CATEGORY))
        })
        .map(|r| r.name.clone())
        .collect();
    plurals.sort();
    plurals
}

async fn list_cluster_objects(
    client: &Client,
    group: &str,
    version: &str,
    plural: &str,
) -> Result<Vec<DynamicObject>, Error> {
    let gvk = GroupVersionKind::gvk(group, version, plural);
    let resource = ApiResource::from_gvk_with_plural(&gvk, plural);
    let api: Api<DynamicObject> = Api::all_with(client.clone(), &resource);
    let list = api.list(&ListParams::default()).await?;
    Ok(list.items)
}

fn to_values(objects: Vec<DynamicObject>) -> Result<Vec<Value>, Error> {
    objects
        .into_iter()
        .map(|o| serde_json::to_value(o).map_err(Error::from))
        .collect()
}
