//! Transport independent handling of admission requests.

use thiserror::Error;
use tracing::{error, info};

use crate::admission_review::{AdmissionReview, GroupVersionResource};
use crate::api::state::ApiServerState;
use crate::api::{populate_span_with_admission_request_data, populate_span_with_decision};
use crate::codec::CodecError;
use crate::rules::{AdmissionPhase, Dispatch};

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("contentType={found}, expected {}", mime::APPLICATION_JSON)]
    UnsupportedMediaType { found: String },

    #[error("Request could not be decoded: {0}")]
    MalformedPayload(CodecError),

    #[error("no {phase} admission rule handles {resource}")]
    NoMatchingRule {
        phase: AdmissionPhase,
        resource: GroupVersionResource,
    },

    #[error("cannot encode response: {0}")]
    Encode(CodecError),
}

/// Turn the body of an admission webhook call into the body of its reply.
///
/// The decision is taken by the rule registered for `phase` and the resource
/// of the request. The uid of the request is copied over to the response,
/// whatever the rule returned.
pub fn handle(
    state: &ApiServerState,
    body: &[u8],
    content_type: Option<&str>,
    phase: AdmissionPhase,
) -> Result<Vec<u8>, DispatchError> {
    let content_type = content_type.unwrap_or_default();
    if content_type != mime::APPLICATION_JSON.as_ref() {
        let error = DispatchError::UnsupportedMediaType {
            found: content_type.to_owned(),
        };
        error!(error = %error, "refusing admission request");
        return Err(error);
    }

    info!(body = %String::from_utf8_lossy(body), "handling request");
    let review = state.scheme.decode_review(body).map_err(|e| {
        let error = DispatchError::MalformedPayload(e);
        error!(error = %error, "bad AdmissionReview request");
        error
    })?;
    let request = review
        .request
        .as_ref()
        .ok_or(DispatchError::MalformedPayload(CodecError::MissingRequest))?;
    populate_span_with_admission_request_data(request);

    let mut response = match state.rules.dispatch(phase, request, &state.scheme) {
        Dispatch::Handled(response) => response,
        Dispatch::Declined { rule } => {
            error!(rule, resource = %request.resource, "admission rule declined the request");
            return Err(DispatchError::NoMatchingRule {
                phase,
                resource: request.resource.clone(),
            });
        }
        Dispatch::Unhandled => {
            error!(resource = %request.resource, %phase, "no admission rule registered");
            return Err(DispatchError::NoMatchingRule {
                phase,
                resource: request.resource.clone(),
            });
        }
    };
    response.uid = request.uid.clone();
    response.normalize_patch();
    populate_span_with_decision(&response);

    let reply = AdmissionReview::new_with_response(&review, response);
    info!(response = ?reply, "sending response");

    state.scheme.encode_review(&reply).map_err(|e| {
        let error = DispatchError::Encode(e);
        error!(error = %error, "cannot encode AdmissionReview response");
        error
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::*;
    use serde_json::{json, Value};

    use crate::admission_review::AdmissionResponse;
    use crate::codec::Scheme;
    use crate::rules::{MockAdmissionRule, RuleProfile, RuleSet};
    use crate::test_utils::{admission_review_json, deployment_object, statefulset_object};

    const JSON: Option<&str> = Some("application/json");

    fn state(profile: RuleProfile) -> ApiServerState {
        ApiServerState {
            scheme: Scheme::kubernetes(),
            rules: RuleSet::for_profile(profile),
        }
    }

    fn spy_rule(expected_calls: usize) -> MockAdmissionRule {
        let mut rule = MockAdmissionRule::new();
        rule.expect_name().return_const("spy");
        rule.expect_phase().return_const(AdmissionPhase::Validating);
        rule.expect_resource()
            .return_const(GroupVersionResource::new("apps", "v1", "statefulsets"));
        rule.expect_admit()
            .times(expected_calls)
            .returning(|_, _| Some(AdmissionResponse::allow()));
        rule
    }

    fn reply(body: &[u8]) -> AdmissionReview {
        serde_json::from_slice(body).expect("reply should be an AdmissionReview")
    }

    #[rstest]
    #[case::missing(None)]
    #[case::plain_text(Some("text/plain"))]
    #[case::with_charset(Some("application/json; charset=utf-8"))]
    fn content_type_must_be_json(#[case] content_type: Option<&str>) {
        let state = ApiServerState {
            scheme: Scheme::kubernetes(),
            rules: RuleSet::new().with_rule(Box::new(spy_rule(0))),
        };
        let body = admission_review_json(
            "uid",
            ("apps", "v1", "statefulsets"),
            "CREATE",
            "alice",
            statefulset_object(None),
        );

        let error = handle(
            &state,
            body.to_string().as_bytes(),
            content_type,
            AdmissionPhase::Validating,
        )
        .unwrap_err();

        assert!(matches!(error, DispatchError::UnsupportedMediaType { .. }));
    }

    #[rstest]
    #[case::garbage(b"definitely not json".to_vec())]
    #[case::empty(Vec::new())]
    #[case::no_request(json!({"apiVersion": "admission.k8s.io/v1", "kind": "AdmissionReview"}).to_string().into_bytes())]
    #[case::not_a_review(statefulset_object(None).to_string().into_bytes())]
    fn undecodable_payload_never_reaches_the_rule(#[case] body: Vec<u8>) {
        let state = ApiServerState {
            scheme: Scheme::kubernetes(),
            rules: RuleSet::new().with_rule(Box::new(spy_rule(0))),
        };

        let error = handle(&state, &body, JSON, AdmissionPhase::Validating).unwrap_err();

        assert!(matches!(error, DispatchError::MalformedPayload(_)), "{error:?}");
        assert!(error.to_string().starts_with("Request could not be decoded"));
    }

    #[rstest]
    #[case("705ab4f5-6393-11e8-b7cc-42010a800002")]
    #[case("")]
    #[case("a \"quoted\" uid")]
    fn response_uid_matches_request_uid(#[case] uid: &str) {
        let state = ApiServerState {
            scheme: Scheme::kubernetes(),
            rules: RuleSet::new().with_rule(Box::new(spy_rule(1))),
        };
        let body = admission_review_json(
            uid,
            ("apps", "v1", "statefulsets"),
            "CREATE",
            "alice",
            statefulset_object(None),
        );

        let bytes = handle(
            &state,
            body.to_string().as_bytes(),
            JSON,
            AdmissionPhase::Validating,
        )
        .unwrap();

        let response = reply(&bytes).response.unwrap();
        assert_eq!(response.uid, uid);
        assert!(response.allowed);
    }

    #[test]
    fn rule_response_uid_is_overwritten() {
        let mut rule = MockAdmissionRule::new();
        rule.expect_name().return_const("liar");
        rule.expect_phase().return_const(AdmissionPhase::Mutating);
        rule.expect_resource()
            .return_const(GroupVersionResource::new("apps", "v1", "statefulsets"));
        rule.expect_admit().returning(|_, _| {
            Some(AdmissionResponse {
                uid: "not-the-request-uid".to_owned(),
                ..AdmissionResponse::allow()
            })
        });
        let state = ApiServerState {
            scheme: Scheme::kubernetes(),
            rules: RuleSet::new().with_rule(Box::new(rule)),
        };
        let body = admission_review_json(
            "request-uid",
            ("apps", "v1", "statefulsets"),
            "CREATE",
            "alice",
            statefulset_object(None),
        );

        let bytes = handle(
            &state,
            body.to_string().as_bytes(),
            JSON,
            AdmissionPhase::Mutating,
        )
        .unwrap();

        assert_eq!(reply(&bytes).response.unwrap().uid, "request-uid");
    }

    #[test]
    fn reply_envelope() {
        let body = admission_review_json(
            "uid-1",
            ("apps", "v1", "statefulsets"),
            "CREATE",
            "carol",
            statefulset_object(None),
        );

        let bytes = handle(
            &state(RuleProfile::TemplateAndSelector),
            body.to_string().as_bytes(),
            JSON,
            AdmissionPhase::Mutating,
        )
        .unwrap();

        let reply: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(reply["apiVersion"], "admission.k8s.io/v1");
        assert_eq!(reply["kind"], "AdmissionReview");
        assert!(reply.get("request").is_none());
        assert_eq!(reply["response"]["uid"], "uid-1");
        assert_eq!(reply["response"]["allowed"], true);
        assert_eq!(reply["response"]["patchType"], "JSONPatch");
        assert!(reply["response"]["patch"].is_string());
    }

    #[test]
    fn denial_is_a_successful_reply() {
        let body = admission_review_json(
            "uid-2",
            ("apps", "v1", "deployments"),
            "CREATE",
            "alice",
            deployment_object("api"),
        );

        let bytes = handle(
            &state(RuleProfile::TemplateAndSelector),
            body.to_string().as_bytes(),
            JSON,
            AdmissionPhase::Validating,
        )
        .unwrap();

        let response = reply(&bytes).response.unwrap();
        assert_eq!(response.uid, "uid-2");
        assert!(!response.allowed);
        assert!(response.patch_type.is_none());
        assert!(response.status.unwrap().message.unwrap().contains("prod"));
    }

    #[rstest]
    #[case::pod_on_validate(("", "v1", "pods"), AdmissionPhase::Validating)]
    #[case::deployment_on_mutate(("apps", "v1", "deployments"), AdmissionPhase::Mutating)]
    #[case::statefulset_on_validate(("apps", "v1", "statefulsets"), AdmissionPhase::Validating)]
    fn unknown_resource_is_not_answered(
        #[case] resource: (&str, &str, &str),
        #[case] phase: AdmissionPhase,
    ) {
        let body = admission_review_json(
            "uid-3",
            resource,
            "CREATE",
            "alice",
            json!({"apiVersion": "v1", "kind": "Pod", "metadata": {"name": "nginx"}}),
        );

        let error = handle(
            &state(RuleProfile::TemplateAndSelector),
            body.to_string().as_bytes(),
            JSON,
            phase,
        )
        .unwrap_err();

        assert!(
            matches!(error, DispatchError::NoMatchingRule { phase: p, .. } if p == phase),
            "{error:?}"
        );
    }

    #[test]
    fn declined_request_is_not_answered() {
        let mut rule = MockAdmissionRule::new();
        rule.expect_name().return_const("declines");
        rule.expect_phase().return_const(AdmissionPhase::Validating);
        rule.expect_resource()
            .return_const(GroupVersionResource::new("apps", "v1", "statefulsets"));
        rule.expect_admit().times(1).returning(|_, _| None);
        let state = ApiServerState {
            scheme: Scheme::kubernetes(),
            rules: RuleSet::new().with_rule(Box::new(rule)),
        };
        let body = admission_review_json(
            "uid-4",
            ("apps", "v1", "statefulsets"),
            "CREATE",
            "alice",
            statefulset_object(None),
        );

        let error = handle(
            &state,
            body.to_string().as_bytes(),
            JSON,
            AdmissionPhase::Validating,
        )
        .unwrap_err();

        assert!(matches!(error, DispatchError::NoMatchingRule { .. }));
    }

    #[test]
    fn patch_on_rejection_is_dropped() {
        let mut rule = MockAdmissionRule::new();
        rule.expect_name().return_const("sloppy");
        rule.expect_phase().return_const(AdmissionPhase::Mutating);
        rule.expect_resource()
            .return_const(GroupVersionResource::new("apps", "v1", "statefulsets"));
        rule.expect_admit().returning(|_, _| {
            Some(AdmissionResponse {
                allowed: false,
                patch: Some("W10=".to_owned()),
                ..Default::default()
            })
        });
        let state = ApiServerState {
            scheme: Scheme::kubernetes(),
            rules: RuleSet::new().with_rule(Box::new(rule)),
        };
        let body = admission_review_json(
            "uid-5",
            ("apps", "v1", "statefulsets"),
            "CREATE",
            "alice",
            statefulset_object(None),
        );

        let bytes = handle(
            &state,
            body.to_string().as_bytes(),
            JSON,
            AdmissionPhase::Mutating,
        )
        .unwrap();

        let response = reply(&bytes).response.unwrap();
        assert!(response.patch.is_none());
        assert!(response.patch_type.is_none());
    }
}
