//! Serialization of admission reviews and of the objects they embed.
//!
//! A [`Scheme`] is the registry of the `apiVersion`/`kind` pairs this webhook
//! understands. It is built once at startup and never mutated afterwards, so
//! it can be shared by every request without synchronization.

use std::collections::BTreeSet;

use k8s_openapi::apimachinery::pkg::runtime::RawExtension;
use serde::{de::DeserializeOwned, Deserialize};
use thiserror::Error;

use crate::admission_review::{
    AdmissionReview, GroupVersionKind, ADMISSION_API_VERSION, ADMISSION_REVIEW_KIND,
};

#[derive(Debug, Error)]
pub enum CodecError {
    #[error("malformed payload: {0}")]
    Malformed(#[source] serde_json::Error),

    #[error("object 'Kind' is missing")]
    MissingKind,

    #[error("no kind \"{kind}\" is registered for version \"{api_version}\"")]
    UnregisteredKind { api_version: String, kind: String },

    #[error("expected {expected} but got {found}")]
    UnexpectedKind {
        expected: GroupVersionKind,
        found: GroupVersionKind,
    },

    #[error("AdmissionReview does not contain a request")]
    MissingRequest,

    #[error("AdmissionRequest does not contain an object")]
    MissingObject,

    #[error("cannot encode {what}: {source}")]
    Encode {
        what: &'static str,
        #[source]
        source: serde_json::Error,
    },
}

pub type Result<T> = std::result::Result<T, CodecError>;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct TypeMeta {
    api_version: Option<String>,
    kind: Option<String>,
}

#[derive(Clone, Debug, Default)]
pub struct Scheme {
    known_kinds: BTreeSet<GroupVersionKind>,
}

#[derive(Default)]
pub struct SchemeBuilder {
    known_kinds: BTreeSet<GroupVersionKind>,
}

impl SchemeBuilder {
    pub fn register_admission_review(mut self) -> Self {
        self.known_kinds.insert(admission_review_kind());
        self
    }

    pub fn register<K: k8s_openapi::Resource>(mut self) -> Self {
        self.known_kinds.insert(kind_of::<K>());
        self
    }

    pub fn build(self) -> Scheme {
        Scheme {
            known_kinds: self.known_kinds,
        }
    }
}

impl Scheme {
    pub fn builder() -> SchemeBuilder {
        SchemeBuilder::default()
    }

    /// The registry used by the webhook: admission reviews plus the
    /// workload kinds the built-in rules decode.
    pub fn kubernetes() -> Self {
        use k8s_openapi::api::{
            apps::v1::{Deployment, StatefulSet},
            core::v1::Pod,
        };

        Scheme::builder()
            .register_admission_review()
            .register::<StatefulSet>()
            .register::<Deployment>()
            .register::<Pod>()
            .build()
    }

    pub fn recognizes(&self, gvk: &GroupVersionKind) -> bool {
        self.known_kinds.contains(gvk)
    }

    /// Decode an inbound AdmissionReview.
    ///
    /// The payload must declare a registered `apiVersion`/`kind` pair, that
    /// pair must be the AdmissionReview one and the envelope must carry a
    /// request.
    pub fn decode_review(&self, payload: &[u8]) -> Result<AdmissionReview> {
        let type_meta: TypeMeta = serde_json::from_slice(payload).map_err(CodecError::Malformed)?;
        let found = match (type_meta.api_version, type_meta.kind) {
            (Some(api_version), Some(kind)) if !kind.is_empty() => {
                GroupVersionKind::from_api_version_and_kind(&api_version, &kind)
            }
            _ => return Err(CodecError::MissingKind),
        };
        self.check_kind(&admission_review_kind(), found)?;

        let review: AdmissionReview =
            serde_json::from_slice(payload).map_err(CodecError::Malformed)?;
        if review.request.is_none() {
            return Err(CodecError::MissingRequest);
        }

        Ok(review)
    }

    /// Decode the object embedded inside of an AdmissionRequest.
    ///
    /// When the raw object declares its `apiVersion`/`kind`, they must match
    /// the ones of `K`.
    pub fn decode_object<K>(&self, object: Option<&RawExtension>) -> Result<K>
    where
        K: k8s_openapi::Resource + DeserializeOwned,
    {
        let raw = object.ok_or(CodecError::MissingObject)?;
        let expected = kind_of::<K>();
        if !self.recognizes(&expected) {
            return Err(CodecError::UnregisteredKind {
                api_version: expected.api_version(),
                kind: expected.kind,
            });
        }

        let api_version = raw.0.get("apiVersion").and_then(|v| v.as_str());
        let kind = raw.0.get("kind").and_then(|v| v.as_str());
        if let (Some(api_version), Some(kind)) = (api_version, kind) {
            self.check_kind(
                &expected,
                GroupVersionKind::from_api_version_and_kind(api_version, kind),
            )?;
        }

        K::deserialize(&raw.0).map_err(CodecError::Malformed)
    }

    pub fn encode_review(&self, review: &AdmissionReview) -> Result<Vec<u8>> {
        serde_json::to_vec(review).map_err(|source| CodecError::Encode {
            what: "AdmissionReview",
            source,
        })
    }

    pub fn encode_patch(&self, patch: &json_patch::Patch) -> Result<Vec<u8>> {
        serde_json::to_vec(patch).map_err(|source| CodecError::Encode {
            what: "JSON patch",
            source,
        })
    }

    fn check_kind(&self, expected: &GroupVersionKind, found: GroupVersionKind) -> Result<()> {
        if !self.recognizes(&found) {
            return Err(CodecError::UnregisteredKind {
                api_version: found.api_version(),
                kind: found.kind,
            });
        }
        if &found != expected {
            return Err(CodecError::UnexpectedKind {
                expected: expected.clone(),
                found,
            });
        }
        Ok(())
    }
}

fn admission_review_kind() -> GroupVersionKind {
    GroupVersionKind::from_api_version_and_kind(ADMISSION_API_VERSION, ADMISSION_REVIEW_KIND)
}

fn kind_of<K: k8s_openapi::Resource>() -> GroupVersionKind {
    GroupVersionKind {
        group: K::GROUP.to_owned(),
        version: K::VERSION.to_owned(),
        kind: K::KIND.to_owned(),
    }
}
