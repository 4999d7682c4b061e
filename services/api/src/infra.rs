use business_permits::config::AppConfig;
use business_permits::permits::{
    InMemoryEventLog, InMemoryPermitRepository, PermitPolicy, PermitService,
    StaticAuthorization, SystemClock, Timestamp,
};
use chrono::{DateTime, Utc};
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

pub(crate) type MemoryPermitService = PermitService<InMemoryPermitRepository, InMemoryEventLog>;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Service backed by the in-memory registry, wired from configuration.
pub(crate) fn permit_service(config: &AppConfig) -> Arc<MemoryPermitService> {
    Arc::new(PermitService::new(
        Arc::new(InMemoryPermitRepository::default()),
        Arc::new(InMemoryEventLog::default()),
        Arc::new(StaticAuthorization::from(&config.authorization)),
        Arc::new(SystemClock),
        PermitPolicy::from(&config.policy),
    ))
}

pub(crate) fn parse_timestamp(raw: &str) -> Result<Timestamp, String> {
    DateTime::parse_from_rfc3339(raw.trim())
        .map(|value| value.with_timezone(&Utc))
        .map_err(|err| format!("failed to parse '{raw}' as an RFC 3339 timestamp ({err})"))
}
