use crate::codec::Scheme;
use crate::rules::RuleSet;

/// Everything a request needs, built once at startup and shared read-only.
pub struct ApiServerState {
    pub scheme: Scheme,
    pub rules: RuleSet,
}
