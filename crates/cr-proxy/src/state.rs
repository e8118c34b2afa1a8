//! Shared application state for every HTTP handler, grounded in
//! `at-bridge::http_api::state::ApiState`'s role as the one struct every
//! handler extracts: process-wide read-only config/catalog plus the mutable
//! shared resources (cache, stats, credential resolver).

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use cr_classifier::ClassificationCache;
use cr_core::{CredentialResolver, ModelCatalog};
use cr_router::Router;
use cr_telemetry::{MetricsCollector, TelemetryHooks};
use tokio::sync::RwLock;

use crate::upstream::UpstreamClient;

/// Monotonic counters for `GET /stats`. Updated with independent atomic
/// ops rather than under one lock, so counts can be approximate under heavy
/// concurrency — exact agreement across fields isn't required.
#[derive(Debug, Default)]
pub struct Stats {
    by_tier: RwLock<BTreeMap<String, u64>>,
    by_model: RwLock<BTreeMap<String, u64>>,
    total_savings_bits: AtomicU64,
}

impl Stats {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn record(&self, tier: &str, model: &str, savings: f64) {
        {
            let mut by_tier = self.by_tier.write().await;
            *by_tier.entry(tier.to_string()).or_insert(0) += 1;
        }
        {
            let mut by_model = self.by_model.write().await;
            *by_model.entry(model.to_string()).or_insert(0) += 1;
        }
        loop {
            let current = self.total_savings_bits.load(Ordering::Relaxed);
            let updated = (f64::from_bits(current) + savings).to_bits();
            if self
                .total_savings_bits
                .compare_exchange_weak(current, updated, Ordering::Relaxed, Ordering::Relaxed)
                .is_ok()
            {
                break;
            }
        }
    }

    pub async fn snapshot(&self) -> cr_api_types::StatsResponse {
        cr_api_types::StatsResponse {
            by_tier: self.by_tier.read().await.clone(),
            by_model: self.by_model.read().await.clone(),
            total_savings_usd: f64::from_bits(self.total_savings_bits.load(Ordering::Relaxed)),
        }
    }
}

pub struct ApiState {
    pub catalog: Arc<ModelCatalog>,
    pub router: Arc<Router>,
    pub cache: Arc<ClassificationCache>,
    pub credentials: Arc<dyn CredentialResolver>,
    pub hooks: Arc<dyn TelemetryHooks>,
    pub metrics: Arc<MetricsCollector>,
    pub upstream: Arc<dyn UpstreamClient>,
    pub stats: Arc<Stats>,
    pub wallet_key: String,
    pub started_at: Instant,
}

impl ApiState {
    pub fn uptime_seconds(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }
}
