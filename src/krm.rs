use crate::{
    consts::{RESOURCE_LIST_API_VERSION, RESOURCE_LIST_KIND},
    crds::defs::{IntoServiceError, Service},
};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use thiserror::Error as ThisError;

/// The document a KRM function reads and writes: the resources flowing
/// through the pipeline plus the function's own configuration.
#[derive(Serialize, Deserialize, Debug, PartialEq, Clone)]
#[serde(rename_all = "camelCase")]
pub struct ResourceList {
    #[serde(default = "default_api_version")]
    pub api_version: String,

    #[serde(default = "default_kind")]
    pub kind: String,

    /// The Service resource driving the expansion
    #[serde(default)]
    pub function_config: Value,

    #[serde(default, deserialize_with = "null_as_empty")]
    pub items: Vec<Value>,

    /// Anything else (e.g. `results`) is carried through untouched
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn default_api_version() -> String {
    String::from(RESOURCE_LIST_API_VERSION)
}

fn default_kind() -> String {
    String::from(RESOURCE_LIST_KIND)
}

/// `items: null` reads as no items.
fn null_as_empty<'de, D>(deserializer: D) -> Result<Vec<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<Value>>::deserialize(deserializer)?.unwrap_or_default())
}

#[derive(ThisError, Debug)]
pub enum ResourceListError {
    #[error("Failed to parse resource list: {0}")]
    Parse(#[source] serde_yaml::Error),
    #[error("Failed to serialize resource list: {0}")]
    Serialize(#[source] serde_yaml::Error),
    #[error("Invalid function config: {0}")]
    FunctionConfig(#[source] IntoServiceError),
}

impl ResourceList {
    pub fn new(function_config: Value, items: Vec<Value>) -> Self {
        Self {
            api_version: default_api_version(),
            kind: default_kind(),
            function_config,
            items,
            extra: Map::new(),
        }
    }

    pub fn from_yaml_str(yaml: &str) -> Result<Self, ResourceListError> {
        serde_yaml::from_str(yaml).map_err(ResourceListError::Parse)
    }

    pub fn to_yaml_string(&self) -> Result<String, ResourceListError> {
        serde_yaml::to_string(self).map_err(ResourceListError::Serialize)
    }

    pub fn service(&self) -> Result<Service, ResourceListError> {
        Service::try_from(&self.function_config).map_err(ResourceListError::FunctionConfig)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_unknown_top_level_fields() {
        let yaml = r#"
apiVersion: config.kubernetes.io/v1
kind: ResourceList
items:
  - apiVersion: v1
    kind: ConfigMap
    metadata:
      name: keep-me
functionConfig:
  apiVersion: serverless.krm.kubed.io/v1alpha1
  kind: Service
results:
  - message: earlier
"#;

        let resource_list = ResourceList::from_yaml_str(yaml).expect("parses");
        assert_eq!(resource_list.items.len(), 1);
        assert!(resource_list.extra.contains_key("results"));

        let rendered = resource_list.to_yaml_string().expect("renders");
        assert!(rendered.contains("results:"));
        assert!(rendered.contains("keep-me"));
    }

    #[test]
    fn missing_items_default_to_empty() {
        let resource_list = ResourceList::from_yaml_str("functionConfig: {}\n").expect("parses");
        assert!(resource_list.items.is_empty());
        assert_eq!(resource_list.kind, "ResourceList");
    }

    #[test]
    fn null_items_read_as_empty() {
        let resource_list =
            ResourceList::from_yaml_str("items: null\nfunctionConfig: {}\n").expect("parses");
        assert!(resource_list.items.is_empty());

        let resource_list =
            ResourceList::from_yaml_str("items:\nfunctionConfig: {}\n").expect("parses");
        assert!(resource_list.items.is_empty());
    }

    #[test]
    fn foreign_function_config_is_rejected() {
        let resource_list = ResourceList::from_yaml_str(
            "functionConfig:\n  apiVersion: v1\n  kind: ConfigMap\n",
        )
        .expect("parses");

        assert!(matches!(
            resource_list.service(),
            Err(ResourceListError::FunctionConfig(
                IntoServiceError::NotAService { .. }
            ))
        ));
    }
}
