use std::net::SocketAddr;

use admission_webhook::{config::Config, rules::RuleProfile, AdmissionWebhook};
use axum::Router;

pub(crate) fn default_test_config() -> Config {
    Config {
        addr: SocketAddr::from(([127, 0, 0, 1], 3001)),
        tls_config: None,
        rule_profile: RuleProfile::default(),
        log_level: "info".to_owned(),
        log_fmt: "json".to_owned(),
        log_no_color: false,
    }
}

pub(crate) async fn app(config: Config) -> Router {
    let server = AdmissionWebhook::new_from_config(config).await.unwrap();

    server.router()
}
