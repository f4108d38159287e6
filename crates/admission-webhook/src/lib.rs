pub mod admission_review;
pub mod api;
pub mod certs;
pub mod cli;
pub mod codec;
pub mod config;
pub mod patch;
pub mod rules;
pub mod tracing;

#[cfg(test)]
mod test_utils;

use std::{net::SocketAddr, sync::Arc};

use ::tracing::info;
use anyhow::Result;
use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use axum_server::tls_rustls::RustlsConfig;
use tower_http::trace::{self, TraceLayer};

use crate::api::{
    handlers::{mutate_handler, readiness_handler, validate_handler},
    state::ApiServerState,
};
use crate::codec::Scheme;
use crate::config::Config;
use crate::rules::{AdmissionPhase, RuleSet};

/// Upper bound of an AdmissionReview body. An UPDATE review embeds both
/// `object` and `oldObject`, each of them can be as big as the 1.5 MiB etcd
/// accepts, plus the JSON encoding overhead.
pub const MAX_ADMISSION_REVIEW_SIZE: usize = 8 * 1024 * 1024;

pub struct AdmissionWebhook {
    router: Router,
    addr: SocketAddr,
    tls_config: Option<RustlsConfig>,
}

impl AdmissionWebhook {
    pub async fn new_from_config(config: Config) -> Result<Self> {
        let rules = RuleSet::for_profile(config.rule_profile);
        info!(
            profile = %config.rule_profile,
            mutating = ?rules.rule_names(AdmissionPhase::Mutating),
            validating = ?rules.rule_names(AdmissionPhase::Validating),
            "admission rules loaded"
        );

        let state = Arc::new(ApiServerState {
            scheme: Scheme::kubernetes(),
            rules,
        });

        let tls_config = match &config.tls_config {
            Some(tls_config) => Some(certs::load_tls_config(tls_config).await?),
            None => None,
        };

        let router = Router::new()
            .route("/mutate", post(mutate_handler))
            .route("/validate", post(validate_handler))
            .route("/readiness", get(readiness_handler))
            .with_state(state)
            .layer(DefaultBodyLimit::max(MAX_ADMISSION_REVIEW_SIZE))
            .layer(
                TraceLayer::new_for_http()
                    .make_span_with(trace::DefaultMakeSpan::new().level(::tracing::Level::DEBUG))
                    .on_response(trace::DefaultOnResponse::new().level(::tracing::Level::DEBUG)),
            );

        Ok(Self {
            router,
            addr: config.addr,
            tls_config,
        })
    }

    pub fn router(&self) -> Router {
        self.router.clone()
    }

    pub async fn run(self) -> Result<()> {
        match self.tls_config {
            Some(tls_config) => {
                info!(address = %self.addr, "started HTTPS server");
                axum_server::bind_rustls(self.addr, tls_config)
                    .serve(self.router.into_make_service())
                    .await?;
            }
            None => {
                info!(address = %self.addr, "started HTTP server");
                axum_server::bind(self.addr)
                    .serve(self.router.into_make_service())
                    .await?;
            }
        }

        Ok(())
    }
}
