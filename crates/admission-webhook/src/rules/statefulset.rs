use k8s_openapi::api::apps::v1::StatefulSet;
use tracing::{error, info};

use super::{owns, AdmissionPhase, AdmissionRule};
use crate::admission_review::{AdmissionRequest, AdmissionResponse, GroupVersionResource, Operation};
use crate::codec::Scheme;
use crate::patch::PatchBuilder;

/// Label carrying the name of the user who created a statefulset.
pub const USER_NAME_LABEL: &str = "userName";

const TEMPLATE_LABELS: [&str; 4] = ["spec", "template", "metadata", "labels"];
const SELECTOR_LABELS: [&str; 3] = ["spec", "selector", "matchLabels"];

fn statefulsets() -> GroupVersionResource {
    GroupVersionResource::new("apps", "v1", "statefulsets")
}

/// Label newly created statefulsets with the name of the requesting user.
#[derive(Clone, Debug)]
pub struct StatefulSetUserLabel {
    label_selector: bool,
}

impl StatefulSetUserLabel {
    /// Only the pod template is labelled.
    pub fn template_only() -> Self {
        StatefulSetUserLabel {
            label_selector: false,
        }
    }

    /// The label is added to the pod template and to the selector, keeping
    /// the selector in sync with the pods it matches.
    pub fn template_and_selector() -> Self {
        StatefulSetUserLabel {
            label_selector: true,
        }
    }
}

impl AdmissionRule for StatefulSetUserLabel {
    fn name(&self) -> &'static str {
        "mutate-statefulset-user-label"
    }

    fn phase(&self) -> AdmissionPhase {
        AdmissionPhase::Mutating
    }

    fn resource(&self) -> GroupVersionResource {
        statefulsets()
    }

    fn admit(&self, request: &AdmissionRequest, scheme: &Scheme) -> Option<AdmissionResponse> {
        if !owns(self, request) {
            return None;
        }
        info!("mutating statefulset");

        if let Err(e) = scheme.decode_object::<StatefulSet>(request.object.as_ref()) {
            error!(error = %e, "cannot decode statefulset");
            return Some(AdmissionResponse::reject(e.to_string()));
        }
        if request.operation != Operation::Create {
            return Some(AdmissionResponse::allow());
        }
        // decode_object guarantees the object is there
        let object = &request.object.as_ref()?.0;
        let user_name = request.user_info.username.clone().unwrap_or_default();

        let mut patch = PatchBuilder::new().add_map_entry(
            object,
            &TEMPLATE_LABELS,
            USER_NAME_LABEL,
            &user_name,
        );
        if self.label_selector {
            patch = patch.add_map_entry(object, &SELECTOR_LABELS, USER_NAME_LABEL, &user_name);
        }

        match scheme.encode_patch(&patch.build()) {
            Ok(patch) => Some(AdmissionResponse::allow().with_patch(&patch)),
            Err(e) => {
                error!(error = %e, "cannot build statefulset patch");
                Some(AdmissionResponse::reject(e.to_string()))
            }
        }
    }
}

/// Only admit statefulsets whose pod template is labelled with the name of
/// the requesting user.
#[derive(Clone, Debug, Default)]
pub struct StatefulSetUserLabelMatch;

impl AdmissionRule for StatefulSetUserLabelMatch {
    fn name(&self) -> &'static str {
        "validate-statefulset-user-label"
    }

    fn phase(&self) -> AdmissionPhase {
        AdmissionPhase::Validating
    }

    fn resource(&self) -> GroupVersionResource {
        statefulsets()
    }

    fn admit(&self, request: &AdmissionRequest, scheme: &Scheme) -> Option<AdmissionResponse> {
        if !owns(self, request) {
            return None;
        }
        info!("validating statefulset");

        let statefulset: StatefulSet = match scheme.decode_object(request.object.as_ref()) {
            Ok(statefulset) => statefulset,
            Err(e) => {
                error!(error = %e, "cannot decode statefulset");
                return Some(AdmissionResponse::reject(e.to_string()));
            }
        };

        let label = statefulset
            .spec
            .as_ref()
            .and_then(|spec| spec.template.metadata.as_ref())
            .and_then(|metadata| metadata.labels.as_ref())
            .and_then(|labels| labels.get(USER_NAME_LABEL))
            .map(String::as_str)
            .unwrap_or_default();
        let user_name = request.user_info.username.as_deref().unwrap_or_default();

        if label == user_name {
            Some(AdmissionResponse::allow())
        } else {
            Some(AdmissionResponse::deny())
        }
    }
}
