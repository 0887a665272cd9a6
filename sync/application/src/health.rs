use async_trait::async_trait;
use chrono::NaiveDate;
use serde::Serialize;
use shaku::{Component, Interface};
use std::sync::Arc;
use sync_domain::{DateRange, StockCode};
use tracing::{debug, warn};

use crate::ports::MarketDataGateway;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "reason", rename_all = "snake_case")]
pub enum HealthStatus {
    Healthy,
    Degraded(String),
}

impl HealthStatus {
    pub fn is_healthy(&self) -> bool {
        matches!(self, HealthStatus::Healthy)
    }
}

#[async_trait]
pub trait HealthChecker: Interface {
    /// Probes the upstream with a small request ending at `as_of`.
    async fn check(&self, as_of: NaiveDate) -> HealthStatus;
}

#[derive(Debug, Clone)]
pub struct HealthProbeSettings {
    pub probe_code: String,
    pub lookback_days: u32,
}

impl Default for HealthProbeSettings {
    fn default() -> Self {
        Self {
            probe_code: "000001".to_string(),
            lookback_days: 4,
        }
    }
}

/// Fetches a few days of a liquid benchmark symbol; a non-empty answer means
/// the upstream is serving requests.
#[derive(Component)]
#[shaku(interface = HealthChecker)]
pub struct ApiHealthProbe {
    #[shaku(inject)]
    gateway: Arc<dyn MarketDataGateway>,

    #[shaku(default = HealthProbeSettings::default())]
    settings: HealthProbeSettings,
}

impl ApiHealthProbe {
    pub fn new(gateway: Arc<dyn MarketDataGateway>, settings: HealthProbeSettings) -> Self {
        Self { gateway, settings }
    }
}

#[async_trait]
impl HealthChecker for ApiHealthProbe {
    async fn check(&self, as_of: NaiveDate) -> HealthStatus {
        let code = match StockCode::parse(&self.settings.probe_code) {
            Ok(code) => code,
            Err(e) => return HealthStatus::Degraded(e.to_string()),
        };
        let range = match DateRange::trailing(as_of, self.settings.lookback_days) {
            Ok(range) => range,
            Err(e) => return HealthStatus::Degraded(e.to_string()),
        };

        match self.gateway.daily_bars_for_symbol(&code, &range).await {
            Ok(bars) if !bars.is_empty() => {
                debug!("Health probe returned {} bars for {}", bars.len(), code);
                HealthStatus::Healthy
            }
            Ok(_) => {
                warn!("Health probe for {} returned no data", code);
                HealthStatus::Degraded("probe returned no data".to_string())
            }
            Err(e) if e.is_rate_limited() => {
                warn!("Health probe hit upstream rate limit: {}", e);
                HealthStatus::Degraded("rate limited".to_string())
            }
            Err(e) => {
                warn!("Health probe failed: {}", e);
                HealthStatus::Degraded(e.to_string())
            }
        }
    }
}
