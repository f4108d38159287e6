use k8s_openapi::api::apps::v1::Deployment;
use tracing::{error, info};

use super::{owns, AdmissionPhase, AdmissionRule};
use crate::admission_review::{AdmissionRequest, AdmissionResponse, GroupVersionResource};
use crate::codec::Scheme;

pub const PRODUCTION_NAME_PREFIX: &str = "prod-";

/// Only admit deployments whose name starts with a fixed prefix.
#[derive(Clone, Debug)]
pub struct DeploymentNamePrefix {
    prefix: &'static str,
}

impl Default for DeploymentNamePrefix {
    fn default() -> Self {
        DeploymentNamePrefix {
            prefix: PRODUCTION_NAME_PREFIX,
        }
    }
}

impl AdmissionRule for DeploymentNamePrefix {
    fn name(&self) -> &'static str {
        "validate-deployment-name-prefix"
    }

    fn phase(&self) -> AdmissionPhase {
        AdmissionPhase::Validating
    }

    fn resource(&self) -> GroupVersionResource {
        GroupVersionResource::new("apps", "v1", "deployments")
    }

    fn admit(&self, request: &AdmissionRequest, scheme: &Scheme) -> Option<AdmissionResponse> {
        if !owns(self, request) {
            return None;
        }
        info!("validating deployment");

        let deployment: Deployment = match scheme.decode_object(request.object.as_ref()) {
            Ok(deployment) => deployment,
            Err(e) => {
                error!(error = %e, "cannot decode deployment");
                return Some(AdmissionResponse::reject(e.to_string()));
            }
        };

        let name = deployment.metadata.name.as_deref().unwrap_or_default();
        if !name.starts_with(self.prefix) {
            return Some(AdmissionResponse::reject(format!(
                "Deployment's name must start with the \"{}\" prefix",
                self.prefix
            )));
        }

        Some(AdmissionResponse::allow())
    }
}
