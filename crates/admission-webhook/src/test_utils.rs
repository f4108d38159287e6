use serde_json::{json, Value};

use crate::admission_review::AdmissionRequest;

pub(crate) fn statefulset_object(template_labels: Option<Value>) -> Value {
    let mut template = json!({
        "spec": {
            "containers": [{"name": "nginx", "image": "nginx:1.27"}]
        }
    });
    if let Some(labels) = template_labels {
        template["metadata"] = json!({ "labels": labels });
    }

    json!({
        "apiVersion": "apps/v1",
        "kind": "StatefulSet",
        "metadata": {"name": "web", "namespace": "default"},
        "spec": {
            "serviceName": "web",
            "replicas": 1,
            "selector": {"matchLabels": {"app": "web"}},
            "template": template
        }
    })
}

pub(crate) fn deployment_object(name: &str) -> Value {
    json!({
        "apiVersion": "apps/v1",
        "kind": "Deployment",
        "metadata": {"name": name, "namespace": "default"},
        "spec": {
            "selector": {"matchLabels": {"app": name}},
            "template": {
                "metadata": {"labels": {"app": name}},
                "spec": {
                    "containers": [{"name": "api", "image": "ghcr.io/example/api:1.0"}]
                }
            }
        }
    })
}

pub(crate) fn admission_review_json(
    uid: &str,
    (group, version, resource): (&str, &str, &str),
    operation: &str,
    username: &str,
    object: Value,
) -> Value {
    let kind = object.get("kind").cloned().unwrap_or(Value::Null);
    json!({
        "apiVersion": "admission.k8s.io/v1",
        "kind": "AdmissionReview",
        "request": {
            "uid": uid,
            "kind": {"group": group, "version": version, "kind": kind},
            "resource": {"group": group, "version": version, "resource": resource},
            "namespace": "default",
            "operation": operation,
            "userInfo": {
                "username": username,
                "groups": ["system:authenticated"]
            },
            "object": object
        }
    })
}

pub(crate) fn admission_request(
    resource: (&str, &str, &str),
    operation: &str,
    username: &str,
    object: Value,
) -> AdmissionRequest {
    let review = admission_review_json("test-uid", resource, operation, username, object);
    serde_json::from_value(review["request"].clone()).expect("request should deserialize")
}
