use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::StockCode;

/// Per-day valuation and liquidity metrics published alongside the price bar.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BarMetrics {
    pub turnover_rate: Option<f64>,
    pub volume_ratio: Option<f64>,
    pub pe: Option<f64>,
    pub pe_ttm: Option<f64>,
    pub pb: Option<f64>,
    pub total_mv: Option<f64>,
    pub circ_mv: Option<f64>,
    pub total_share: Option<f64>,
    pub float_share: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyBar {
    trade_date: NaiveDate,
    code: StockCode,
    open: Decimal,
    high: Decimal,
    low: Decimal,
    close: Decimal,
    pre_close: Option<Decimal>,
    change: Option<Decimal>,
    pct_chg: Option<Decimal>,
    /// Lots of 100 shares.
    volume: f64,
    /// Thousand CNY.
    amount: f64,
    metrics: BarMetrics,
    adj_factor: Option<f64>,
}

impl DailyBar {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        trade_date: NaiveDate,
        code: StockCode,
        open: Decimal,
        high: Decimal,
        low: Decimal,
        close: Decimal,
        volume: f64,
        amount: f64,
    ) -> Result<Self, BarValidationError> {
        for (name, price) in [("open", open), ("high", high), ("low", low), ("close", close)] {
            if price <= Decimal::ZERO {
                return Err(BarValidationError::NonPositivePrice(name));
            }
        }

        if high < low {
            return Err(BarValidationError::HighBelowLow);
        }

        if !(volume >= 0.0) || !(amount >= 0.0) {
            return Err(BarValidationError::NegativeQuantity);
        }

        Ok(Self {
            trade_date,
            code,
            open,
            high,
            low,
            close,
            pre_close: None,
            change: None,
            pct_chg: None,
            volume,
            amount,
            metrics: BarMetrics::default(),
            adj_factor: None,
        })
    }

    pub fn with_previous_close(
        mut self,
        pre_close: Option<Decimal>,
        change: Option<Decimal>,
        pct_chg: Option<Decimal>,
    ) -> Self {
        self.pre_close = pre_close;
        self.change = change;
        self.pct_chg = pct_chg;
        self
    }

    pub fn with_metrics(mut self, metrics: BarMetrics) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn with_adj_factor(mut self, adj_factor: Option<f64>) -> Self {
        self.adj_factor = adj_factor;
        self
    }

    pub fn trade_date(&self) -> NaiveDate {
        self.trade_date
    }

    pub fn code(&self) -> &StockCode {
        &self.code
    }

    pub fn open(&self) -> Decimal {
        self.open
    }

    pub fn high(&self) -> Decimal {
        self.high
    }

    pub fn low(&self) -> Decimal {
        self.low
    }

    pub fn close(&self) -> Decimal {
        self.close
    }

    pub fn pre_close(&self) -> Option<Decimal> {
        self.pre_close
    }

    pub fn change(&self) -> Option<Decimal> {
        self.change
    }

    pub fn pct_chg(&self) -> Option<Decimal> {
        self.pct_chg
    }

    pub fn volume(&self) -> f64 {
        self.volume
    }

    pub fn amount(&self) -> f64 {
        self.amount
    }

    pub fn metrics(&self) -> &BarMetrics {
        &self.metrics
    }

    pub fn adj_factor(&self) -> Option<f64> {
        self.adj_factor
    }

    pub fn has_adj_factor(&self) -> bool {
        self.adj_factor.is_some()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum BarValidationError {
    #[error("Price must be positive: {0}")]
    NonPositivePrice(&'static str),
    #[error("High price is below low price")]
    HighBelowLow,
    #[error("Volume and amount must be non-negative")]
    NegativeQuantity,
}
