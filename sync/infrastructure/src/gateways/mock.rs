use async_trait::async_trait;
use chrono::{Datelike, NaiveDate, Weekday};
use rust_decimal::Decimal;
use shaku::Component;
use std::sync::Arc;
use sync_application::{GatewayError, MarketDataGateway, RateLimiter};
use sync_domain::{BarMetrics, DailyBar, DateRange, StockBasic, StockCode};
use tracing::info;

const UNIVERSE: &[(&str, &str, &str)] = &[
    ("000001", "平安银行", "银行"),
    ("000002", "万科A", "全国地产"),
    ("000858", "五粮液", "白酒"),
    ("002594", "比亚迪", "汽车整车"),
    ("300750", "宁德时代", "电气设备"),
    ("600000", "浦发银行", "银行"),
    ("600519", "贵州茅台", "白酒"),
    ("688981", "中芯国际", "半导体"),
];

/// Offline provider with a fixed universe, a weekday calendar and prices
/// derived from the code and date, so repeated runs produce identical files.
#[derive(Component)]
#[shaku(interface = MarketDataGateway)]
pub struct MockMarketDataGateway {
    #[shaku(inject)]
    rate_limiter: Arc<dyn RateLimiter>,
}

impl MockMarketDataGateway {
    pub fn new(rate_limiter: Arc<dyn RateLimiter>) -> Self {
        Self { rate_limiter }
    }

    fn universe() -> Vec<StockBasic> {
        UNIVERSE
            .iter()
            .filter_map(|(raw, name, industry)| {
                let code = StockCode::parse(raw).ok()?;
                let mut basic = StockBasic::new(code, *name);
                basic.industry = Some(industry.to_string());
                basic.market = Some(market_name(raw).to_string());
                Some(basic)
            })
            .collect()
    }

    fn is_trading_day(date: NaiveDate) -> bool {
        !matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
    }

    fn generate_bar(code: &StockCode, date: NaiveDate) -> Result<DailyBar, GatewayError> {
        let seed: u32 = code.as_str().bytes().map(u32::from).sum();
        let day = date.num_days_from_ce() as u32;

        // Cents, up to 10% above a per-code base; wave(u32::MAX) is the previous day.
        let base = 500 + (seed % 50) * 100;
        let wave = |offset: u32| (day.wrapping_add(offset).wrapping_mul(2_654_435_761) >> 16) % 100;
        let close = base + base * wave(0) / 1_000;
        let pre_close = base + base * wave(u32::MAX) / 1_000;
        let open = (close + pre_close) / 2;
        let high = close.max(open) + base / 100;
        let low = close.min(open) - base / 100;

        let cents = |v: u32| Decimal::new(i64::from(v), 2);
        let volume = f64::from(10_000 + (seed * 37 + day) % 90_000);
        let amount = volume * f64::from(close) / 1_000.0;
        let change = cents(close) - cents(pre_close);

        let bar = DailyBar::new(
            date,
            code.clone(),
            cents(open),
            cents(high),
            cents(low),
            cents(close),
            volume,
            amount,
        )
        .map_err(|e| GatewayError::InvalidRow(e.to_string()))?;

        Ok(bar
            .with_previous_close(
                Some(cents(pre_close)),
                Some(change),
                Some((change / cents(pre_close) * Decimal::ONE_HUNDRED).round_dp(4)),
            )
            .with_metrics(BarMetrics {
                turnover_rate: Some(f64::from(seed % 500) / 100.0),
                pe: Some(f64::from(5 + seed % 40)),
                pb: Some(f64::from(seed % 80) / 10.0),
                ..BarMetrics::default()
            })
            .with_adj_factor(Some(1.0)))
    }
}

fn market_name(raw: &str) -> &'static str {
    match &raw[..3] {
        "300" | "301" => "创业板",
        "688" | "689" => "科创板",
        _ => "主板",
    }
}

#[async_trait]
impl MarketDataGateway for MockMarketDataGateway {
    async fn stock_list(&self) -> Result<Vec<StockBasic>, GatewayError> {
        self.rate_limiter.acquire().await?;
        info!("Mock gateway: serving {} securities", UNIVERSE.len());
        Ok(Self::universe())
    }

    async fn trading_calendar(&self, range: &DateRange) -> Result<Vec<NaiveDate>, GatewayError> {
        self.rate_limiter.acquire().await?;
        Ok(range
            .clone()
            .split_by_days()
            .into_iter()
            .map(|day| day.start())
            .filter(|date| Self::is_trading_day(*date))
            .collect())
    }

    async fn daily_bars_for_symbol(
        &self,
        code: &StockCode,
        range: &DateRange,
    ) -> Result<Vec<DailyBar>, GatewayError> {
        self.rate_limiter.acquire().await?;
        if !UNIVERSE.iter().any(|(raw, _, _)| *raw == code.as_str()) {
            return Ok(Vec::new());
        }

        range
            .clone()
            .split_by_days()
            .into_iter()
            .map(|day| day.start())
            .filter(|date| Self::is_trading_day(*date))
            .map(|date| Self::generate_bar(code, date))
            .collect()
    }

    async fn daily_bars_for_date(&self, date: NaiveDate) -> Result<Vec<DailyBar>, GatewayError> {
        self.rate_limiter.acquire().await?;
        if !Self::is_trading_day(date) {
            return Ok(Vec::new());
        }

        Self::universe()
            .iter()
            .map(|basic| Self::generate_bar(&basic.code, date))
            .collect()
    }
}
