//! Read-only lookups into a Terraform state file.
//!
//! The deployment writes its load balancer address, target group and
//! instance identifiers into `terraform.tfstate`; this module pulls those
//! values out so operators do not have to copy them by hand.

use std::fs;
use std::path::Path;

use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

/// Resource name the load balancer is registered under.
pub const LOAD_BALANCER: &str = "load-balancer";

/// Resource names of the two target groups.
pub const CLUSTER_TARGET_GROUPS: [&str; 2] = ["cluster1-target", "cluster2-target"];

const ATTACHMENT_PREFIX: &str = "attachments-";

#[derive(Debug, Error)]
pub enum StateError {
    #[error("failed to read state file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("state file is not valid JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("no resource named '{0}' in state")]
    MissingResource(String),

    #[error("resource '{resource}' has no string attribute '{attribute}'")]
    MissingAttribute { resource: String, attribute: String },
}

#[derive(Debug, Deserialize)]
pub struct TerraformState {
    #[serde(default)]
    resources: Vec<Resource>,
}

#[derive(Debug, Deserialize)]
pub struct Resource {
    name: String,
    #[serde(default)]
    instances: Vec<Instance>,
}

#[derive(Debug, Deserialize)]
struct Instance {
    #[serde(default)]
    attributes: serde_json::Map<String, Value>,
}

impl Resource {
    pub fn name(&self) -> &str {
        &self.name
    }

    fn string_attribute(&self, attribute: &str) -> Result<&str, StateError> {
        self.instances
            .first()
            .and_then(|instance| instance.attributes.get(attribute))
            .and_then(Value::as_str)
            .ok_or_else(|| StateError::MissingAttribute {
                resource: self.name.clone(),
                attribute: attribute.to_string(),
            })
    }

    /// `target_id` of every instance of an attachment resource.
    pub fn target_ids(&self) -> Vec<&str> {
        self.instances
            .iter()
            .filter_map(|instance| instance.attributes.get("target_id"))
            .filter_map(Value::as_str)
            .collect()
    }
}

impl TerraformState {
    pub fn from_path(path: &Path) -> Result<Self, StateError> {
        let raw = fs::read_to_string(path).map_err(|source| StateError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::parse(&raw)
    }

    pub fn parse(raw: &str) -> Result<Self, StateError> {
        Ok(serde_json::from_str(raw)?)
    }

    pub fn resource_by_name(&self, name: &str) -> Result<&Resource, StateError> {
        self.resources
            .iter()
            .find(|resource| resource.name == name)
            .ok_or_else(|| StateError::MissingResource(name.to_string()))
    }

    /// Public DNS name of the load balancer, the base address fed to the
    /// driver.
    pub fn load_balancer_address(&self) -> Result<&str, StateError> {
        self.resource_by_name(LOAD_BALANCER)?.string_attribute("dns_name")
    }

    pub fn target_group_arn_suffix(&self, name: &str) -> Result<&str, StateError> {
        self.resource_by_name(name)?.string_attribute("arn_suffix")
    }

    /// All `attachments-*` resources, one per cluster's instance set.
    pub fn attachment_resources(&self) -> Vec<&Resource> {
        self.resources
            .iter()
            .filter(|resource| resource.name.starts_with(ATTACHMENT_PREFIX))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FIXTURE: &str = r#"{
        "version": 4,
        "resources": [
            {
                "type": "aws_lb",
                "name": "load-balancer",
                "instances": [
                    {
                        "attributes": {
                            "arn_suffix": "app/my-lb/50dc6c495c0c9188",
                            "dns_name": "my-lb-1234567890.us-east-1.elb.amazonaws.com"
                        }
                    }
                ]
            },
            {
                "type": "aws_lb_target_group",
                "name": "cluster1-target",
                "instances": [
                    { "attributes": { "arn_suffix": "targetgroup/cluster1/9d8e71a3" } }
                ]
            },
            {
                "type": "aws_lb_target_group_attachment",
                "name": "attachments-cluster1-m4",
                "instances": [
                    { "attributes": { "target_id": "i-0aaa" } },
                    { "attributes": { "target_id": "i-0bbb" } }
                ]
            }
        ]
    }"#;

    #[test]
    fn resolves_load_balancer_address() {
        let state = TerraformState::parse(FIXTURE).unwrap();
        assert_eq!(
            state.load_balancer_address().unwrap(),
            "my-lb-1234567890.us-east-1.elb.amazonaws.com"
        );
    }

    #[test]
    fn resolves_target_group_arn_suffix() {
        let state = TerraformState::parse(FIXTURE).unwrap();
        assert_eq!(
            state.target_group_arn_suffix("cluster1-target").unwrap(),
            "targetgroup/cluster1/9d8e71a3"
        );
    }

    #[test]
    fn lists_attachment_target_ids() {
        let state = TerraformState::parse(FIXTURE).unwrap();
        let attachments = state.attachment_resources();
        assert_eq!(attachments.len(), 1);
        assert_eq!(attachments[0].name(), "attachments-cluster1-m4");
        assert_eq!(attachments[0].target_ids(), vec!["i-0aaa", "i-0bbb"]);
    }

    #[test]
    fn missing_resource_is_a_typed_error() {
        let state = TerraformState::parse(FIXTURE).unwrap();
        let err = state.resource_by_name("cluster2-target").unwrap_err();
        assert!(matches!(err, StateError::MissingResource(name) if name == "cluster2-target"));
    }

    #[test]
    fn missing_attribute_is_a_typed_error() {
        let state = TerraformState::parse(FIXTURE).unwrap();
        let err = state
            .target_group_arn_suffix("attachments-cluster1-m4")
            .unwrap_err();
        assert!(matches!(err, StateError::MissingAttribute { .. }));
    }

    #[test]
    fn invalid_json_is_a_parse_error() {
        let err = TerraformState::parse("not json").unwrap_err();
        assert!(matches!(err, StateError::Parse(_)));
    }
}
