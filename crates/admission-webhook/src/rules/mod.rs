//! The admission rules and the table used to dispatch requests to them.

use std::{collections::HashMap, fmt, str::FromStr};

use anyhow::anyhow;
#[cfg(test)]
use mockall::automock;
use tracing::{debug, warn};

use crate::admission_review::{AdmissionRequest, AdmissionResponse, GroupVersionResource};
use crate::codec::Scheme;

pub mod deployment;
pub mod statefulset;

pub use deployment::DeploymentNamePrefix;
pub use statefulset::{StatefulSetUserLabel, StatefulSetUserLabelMatch, USER_NAME_LABEL};

/// The webhook endpoint a request arrived on.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum AdmissionPhase {
    Mutating,
    Validating,
}

impl fmt::Display for AdmissionPhase {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            AdmissionPhase::Mutating => write!(f, "mutating"),
            AdmissionPhase::Validating => write!(f, "validating"),
        }
    }
}

/// A decision function owning exactly one (phase, resource) pair.
#[cfg_attr(test, automock)]
pub trait AdmissionRule: Send + Sync {
    fn name(&self) -> &'static str;

    fn phase(&self) -> AdmissionPhase;

    fn resource(&self) -> GroupVersionResource;

    /// Decide about `request`.
    ///
    /// `None` means the request targets a resource this rule does not own;
    /// that is a routing problem, not a denial. The returned response does
    /// not need to carry the request uid.
    fn admit(&self, request: &AdmissionRequest, scheme: &Scheme) -> Option<AdmissionResponse>;
}

/// Outcome of routing a request through a [`RuleSet`].
#[derive(Debug, PartialEq)]
pub enum Dispatch {
    Handled(AdmissionResponse),
    /// The selected rule refused the request.
    Declined { rule: &'static str },
    /// No rule is registered for the phase and resource.
    Unhandled,
}

/// Which of the mutually exclusive statefulset policies is deployed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum RuleProfile {
    /// Label both the pod template and the selector of statefulsets.
    #[default]
    TemplateAndSelector,
    /// Label the pod template of statefulsets and require the label to
    /// match the requesting user.
    TemplateLabels,
}

impl RuleProfile {
    pub const NAMES: [&'static str; 2] = ["template-and-selector", "template-labels"];
}

impl fmt::Display for RuleProfile {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            RuleProfile::TemplateAndSelector => write!(f, "template-and-selector"),
            RuleProfile::TemplateLabels => write!(f, "template-labels"),
        }
    }
}

impl FromStr for RuleProfile {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "template-and-selector" => Ok(RuleProfile::TemplateAndSelector),
            "template-labels" => Ok(RuleProfile::TemplateLabels),
            _ => Err(anyhow!("unknown rule profile: {s}")),
        }
    }
}

#[derive(Default)]
pub struct RuleSet {
    rules: HashMap<(AdmissionPhase, GroupVersionResource), Box<dyn AdmissionRule>>,
}

impl RuleSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn for_profile(profile: RuleProfile) -> Self {
        let rules = RuleSet::new().with_rule(Box::new(DeploymentNamePrefix::default()));

        match profile {
            RuleProfile::TemplateAndSelector => {
                rules.with_rule(Box::new(StatefulSetUserLabel::template_and_selector()))
            }
            RuleProfile::TemplateLabels => rules
                .with_rule(Box::new(StatefulSetUserLabel::template_only()))
                .with_rule(Box::new(StatefulSetUserLabelMatch)),
        }
    }

    /// Register `rule`, replacing any rule owning the same phase and resource.
    pub fn with_rule(mut self, rule: Box<dyn AdmissionRule>) -> Self {
        let key = (rule.phase(), rule.resource());
        if let Some(previous) = self.rules.get(&key) {
            warn!(
                replaced = previous.name(),
                rule = rule.name(),
                phase = %key.0,
                resource = %key.1,
                "replacing admission rule"
            );
        }
        self.rules.insert(key, rule);
        self
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn rule_names(&self, phase: AdmissionPhase) -> Vec<&'static str> {
        let mut names: Vec<_> = self
            .rules
            .iter()
            .filter(|((rule_phase, _), _)| *rule_phase == phase)
            .map(|(_, rule)| rule.name())
            .collect();
        names.sort_unstable();
        names
    }

    pub fn dispatch(
        &self,
        phase: AdmissionPhase,
        request: &AdmissionRequest,
        scheme: &Scheme,
    ) -> Dispatch {
        let Some(rule) = self.rules.get(&(phase, request.resource.clone())) else {
            return Dispatch::Unhandled;
        };

        debug!(rule = rule.name(), "evaluating admission rule");
        match rule.admit(request, scheme) {
            Some(response) => Dispatch::Handled(response),
            None => Dispatch::Declined { rule: rule.name() },
        }
    }
}

/// Shared guard of every rule: only touch requests for the owned resource.
pub(crate) fn owns(rule: &dyn AdmissionRule, request: &AdmissionRequest) -> bool {
    let expected = rule.resource();
    if request.resource != expected {
        debug!(
            rule = rule.name(),
            expected = %expected,
            found = %request.resource,
            "resource not handled by rule"
        );
        return false;
    }
    true
}
