//! Tushare Pro HTTP adapter.
//!
//! Every endpoint is a POST of `{api_name, token, params, fields}` to a
//! single URL. Results come back columnar: a `fields` header plus `items`
//! rows, decoded here by field name so column order never matters.

use async_trait::async_trait;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use shaku::Component;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Duration;
use sync_application::{GatewayError, MarketDataGateway, RateLimiter};
use sync_domain::{
    format_compact, parse_compact, BarMetrics, DailyBar, DateRange, StockBasic, StockCode,
};
use tracing::{debug, warn};

const DAILY_FIELDS: &str =
    "ts_code,trade_date,open,high,low,close,pre_close,change,pct_chg,vol,amount";
const DAILY_BASIC_FIELDS: &str = "ts_code,trade_date,turnover_rate,volume_ratio,pe,pe_ttm,pb,\
                                  total_share,float_share,total_mv,circ_mv";
const ADJ_FACTOR_FIELDS: &str = "ts_code,trade_date,adj_factor";
const STOCK_BASIC_FIELDS: &str = "ts_code,symbol,name,area,industry,market,list_date";

#[derive(Debug, Clone)]
pub struct TushareConfig {
    pub token: String,
    pub api_url: String,
    pub timeout: Duration,
    pub max_retries: u32,
    pub retry_backoff: Duration,
}

impl Default for TushareConfig {
    fn default() -> Self {
        Self {
            token: String::new(),
            api_url: "http://api.tushare.pro".to_string(),
            timeout: Duration::from_secs(30),
            max_retries: 3,
            retry_backoff: Duration::from_secs(2),
        }
    }
}

#[derive(Component)]
#[shaku(interface = MarketDataGateway)]
pub struct TushareGateway {
    #[shaku(inject)]
    rate_limiter: Arc<dyn RateLimiter>,

    #[shaku(default = TushareConfig::default())]
    config: TushareConfig,

    #[shaku(default = reqwest::Client::new())]
    client: reqwest::Client,
}

impl TushareGateway {
    pub fn new(config: TushareConfig, rate_limiter: Arc<dyn RateLimiter>) -> Self {
        Self {
            rate_limiter,
            config,
            client: reqwest::Client::new(),
        }
    }

    /// Calls `api_name`, following `has_more` pages until the result is
    /// complete.
    async fn query(
        &self,
        api_name: &str,
        params: BTreeMap<&str, String>,
        fields: &str,
    ) -> Result<Frame, GatewayError> {
        let mut frame = Frame::default();

        loop {
            let mut page_params = params.clone();
            if !frame.items.is_empty() {
                page_params.insert("offset", frame.items.len().to_string());
            }

            let page = self.call_with_retry(api_name, &page_params, fields).await?;
            let has_more = page.has_more;
            let fetched = page.items.len();
            frame.absorb(page)?;

            if !has_more || fetched == 0 {
                break;
            }
            debug!("{} has more rows, fetched {} so far", api_name, frame.items.len());
        }

        Ok(frame)
    }

    async fn call_with_retry(
        &self,
        api_name: &str,
        params: &BTreeMap<&str, String>,
        fields: &str,
    ) -> Result<Frame, GatewayError> {
        let mut attempt = 0u32;

        loop {
            self.rate_limiter.acquire().await?;

            match self.call(api_name, params, fields).await {
                Err(GatewayError::Transport(reason)) if attempt < self.config.max_retries => {
                    let backoff = self.config.retry_backoff * 2u32.saturating_pow(attempt);
                    attempt += 1;
                    warn!(
                        "{} request failed ({}), retry {}/{} in {:?}",
                        api_name, reason, attempt, self.config.max_retries, backoff
                    );
                    tokio::time::sleep(backoff).await;
                }
                other => return other,
            }
        }
    }

    async fn call(
        &self,
        api_name: &str,
        params: &BTreeMap<&str, String>,
        fields: &str,
    ) -> Result<Frame, GatewayError> {
        let request = TushareRequest {
            api_name,
            token: &self.config.token,
            params,
            fields,
        };

        let response = self
            .client
            .post(&self.config.api_url)
            .timeout(self.config.timeout)
            .json(&request)
            .send()
            .await
            .map_err(|e| GatewayError::Transport(e.to_string()))?;

        let status = response.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(GatewayError::RateLimited(format!("HTTP {status}")));
        }
        if status.is_server_error() {
            return Err(GatewayError::Transport(format!("HTTP {status}")));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GatewayError::Api {
                code: i64::from(status.as_u16()),
                message: body,
            });
        }

        let body: TushareResponse = response
            .json()
            .await
            .map_err(|e| GatewayError::Decode(e.to_string()))?;

        if body.code != 0 {
            let message = body.msg.unwrap_or_default();
            if is_quota_message(&message) {
                return Err(GatewayError::RateLimited(message));
            }
            return Err(GatewayError::Api {
                code: body.code,
                message,
            });
        }

        let data = body.data.unwrap_or_default();
        Frame::new(data.fields, data.items, data.has_more)
    }

    async fn adj_factors(
        &self,
        params: BTreeMap<&str, String>,
    ) -> Result<HashMap<(StockCode, NaiveDate), f64>, GatewayError> {
        let frame = self.query("adj_factor", params, ADJ_FACTOR_FIELDS).await?;
        let mut factors = HashMap::with_capacity(frame.items.len());

        for row in frame.rows() {
            let key = match (row.code("ts_code"), row.date("trade_date")) {
                (Some(code), Some(date)) => (code, date),
                _ => continue,
            };
            if let Some(factor) = row.f64("adj_factor") {
                factors.insert(key, factor);
            }
        }

        Ok(factors)
    }

    async fn daily_metrics(
        &self,
        date: NaiveDate,
    ) -> Result<HashMap<StockCode, BarMetrics>, GatewayError> {
        let params = BTreeMap::from([("trade_date", format_compact(date))]);
        let frame = self.query("daily_basic", params, DAILY_BASIC_FIELDS).await?;

        Ok(frame
            .rows()
            .filter_map(|row| {
                let code = row.code("ts_code")?;
                Some((
                    code,
                    BarMetrics {
                        turnover_rate: row.f64("turnover_rate"),
                        volume_ratio: row.f64("volume_ratio"),
                        pe: row.f64("pe"),
                        pe_ttm: row.f64("pe_ttm"),
                        pb: row.f64("pb"),
                        total_mv: row.f64("total_mv"),
                        circ_mv: row.f64("circ_mv"),
                        total_share: row.f64("total_share"),
                        float_share: row.f64("float_share"),
                    },
                ))
            })
            .collect())
    }

    fn decode_bars(frame: &Frame) -> Vec<DailyBar> {
        let mut bars: Vec<DailyBar> = frame
            .rows()
            .filter_map(|row| match decode_bar(&row) {
                Ok(bar) => Some(bar),
                Err(e) => {
                    warn!("Skipping daily row: {}", e);
                    None
                }
            })
            .collect();
        bars.sort_by(|a, b| {
            a.trade_date()
                .cmp(&b.trade_date())
                .then_with(|| a.code().cmp(b.code()))
        });
        bars
    }
}

#[async_trait]
impl MarketDataGateway for TushareGateway {
    async fn stock_list(&self) -> Result<Vec<StockBasic>, GatewayError> {
        let params = BTreeMap::from([("list_status", "L".to_string())]);
        let frame = self.query("stock_basic", params, STOCK_BASIC_FIELDS).await?;

        let basics: Vec<StockBasic> = frame
            .rows()
            .filter_map(|row| {
                let code = row.code("ts_code")?;
                let mut basic = StockBasic::new(code, row.str("name").unwrap_or_default());
                basic.area = row.str("area").map(str::to_string);
                basic.industry = row.str("industry").map(str::to_string);
                basic.market = row.str("market").map(str::to_string);
                basic.list_date = row.date("list_date");
                Some(basic)
            })
            .collect();

        debug!("stock_basic returned {} listed securities", basics.len());
        Ok(basics)
    }

    async fn trading_calendar(&self, range: &DateRange) -> Result<Vec<NaiveDate>, GatewayError> {
        let params = BTreeMap::from([
            ("exchange", "SSE".to_string()),
            ("start_date", range.start_compact()),
            ("end_date", range.end_compact()),
            ("is_open", "1".to_string()),
        ]);
        let frame = self.query("trade_cal", params, "cal_date,is_open").await?;

        let mut dates: Vec<NaiveDate> = frame
            .rows()
            .filter(|row| row.str("is_open").map_or(true, |flag| flag == "1"))
            .filter_map(|row| row.date("cal_date"))
            .collect();
        dates.sort();
        dates.dedup();
        Ok(dates)
    }

    async fn daily_bars_for_symbol(
        &self,
        code: &StockCode,
        range: &DateRange,
    ) -> Result<Vec<DailyBar>, GatewayError> {
        let params = BTreeMap::from([
            ("ts_code", code.to_ts_code()),
            ("start_date", range.start_compact()),
            ("end_date", range.end_compact()),
        ]);

        let frame = self.query("daily", params.clone(), DAILY_FIELDS).await?;
        let bars = Self::decode_bars(&frame);
        if bars.is_empty() {
            return Ok(bars);
        }

        let factors = self.adj_factors(params).await?;
        Ok(bars
            .into_iter()
            .map(|bar| {
                let factor = factors.get(&(bar.code().clone(), bar.trade_date())).copied();
                bar.with_adj_factor(factor)
            })
            .collect())
    }

    async fn daily_bars_for_date(&self, date: NaiveDate) -> Result<Vec<DailyBar>, GatewayError> {
        let params = BTreeMap::from([("trade_date", format_compact(date))]);
        let frame = self.query("daily", params.clone(), DAILY_FIELDS).await?;
        let bars = Self::decode_bars(&frame);
        if bars.is_empty() {
            return Ok(bars);
        }

        // Metrics and factors are enrichment; a failed fetch leaves them null
        // unless the upstream is throttling us.
        let metrics = match self.daily_metrics(date).await {
            Ok(metrics) => metrics,
            Err(e) if e.is_rate_limited() => return Err(e),
            Err(e) => {
                warn!("daily_basic for {} unavailable: {}", date, e);
                HashMap::new()
            }
        };
        let factors = match self.adj_factors(params).await {
            Ok(factors) => factors,
            Err(e) if e.is_rate_limited() => return Err(e),
            Err(e) => {
                warn!("adj_factor for {} unavailable: {}", date, e);
                HashMap::new()
            }
        };

        Ok(bars
            .into_iter()
            .map(|bar| {
                let key = (bar.code().clone(), bar.trade_date());
                let factor = factors.get(&key).copied();
                match metrics.get(&key.0) {
                    Some(metrics) => bar.with_metrics(metrics.clone()).with_adj_factor(factor),
                    None => bar.with_adj_factor(factor),
                }
            })
            .collect())
    }
}

fn is_quota_message(message: &str) -> bool {
    let lower = message.to_lowercase();
    message.contains("每分钟")
        || message.contains("最多访问")
        || message.contains("频率")
        || lower.contains("rate limit")
        || lower.contains("too many")
}

fn decode_bar(row: &Row<'_>) -> Result<DailyBar, GatewayError> {
    let raw_code = row.str("ts_code").unwrap_or_default();
    let code = StockCode::from_ts_code(raw_code)
        .map_err(|e| GatewayError::InvalidRow(e.to_string()))?;
    let trade_date = row
        .date("trade_date")
        .ok_or_else(|| GatewayError::InvalidRow(format!("{code}: missing trade_date")))?;
    let price = |name: &str| {
        row.decimal(name)
            .ok_or_else(|| GatewayError::InvalidRow(format!("{code} {trade_date}: missing {name}")))
    };

    let bar = DailyBar::new(
        trade_date,
        code.clone(),
        price("open")?,
        price("high")?,
        price("low")?,
        price("close")?,
        row.f64("vol").unwrap_or(0.0),
        row.f64("amount").unwrap_or(0.0),
    )
    .map_err(|e| GatewayError::InvalidRow(format!("{code} {trade_date}: {e}")))?;

    Ok(bar.with_previous_close(
        row.decimal("pre_close"),
        row.decimal("change"),
        row.decimal("pct_chg"),
    ))
}

#[derive(Debug, Serialize)]
struct TushareRequest<'a> {
    api_name: &'a str,
    token: &'a str,
    params: &'a BTreeMap<&'a str, String>,
    fields: &'a str,
}

#[derive(Debug, Deserialize)]
struct TushareResponse {
    code: i64,
    #[serde(default)]
    msg: Option<String>,
    #[serde(default)]
    data: Option<TushareData>,
}

#[derive(Debug, Default, Deserialize)]
struct TushareData {
    #[serde(default)]
    fields: Vec<String>,
    #[serde(default)]
    items: Vec<Vec<Value>>,
    #[serde(default)]
    has_more: bool,
}

#[derive(Debug, Default)]
struct Frame {
    columns: HashMap<String, usize>,
    items: Vec<Vec<Value>>,
    has_more: bool,
}

impl Frame {
    fn new(fields: Vec<String>, items: Vec<Vec<Value>>, has_more: bool) -> Result<Self, GatewayError> {
        if let Some(row) = items.iter().find(|row| row.len() != fields.len()) {
            return Err(GatewayError::Decode(format!(
                "row has {} values for {} fields",
                row.len(),
                fields.len()
            )));
        }

        let columns = fields
            .into_iter()
            .enumerate()
            .map(|(index, name)| (name, index))
            .collect();
        Ok(Self {
            columns,
            items,
            has_more,
        })
    }

    fn absorb(&mut self, page: Frame) -> Result<(), GatewayError> {
        if self.items.is_empty() {
            *self = page;
            return Ok(());
        }
        if self.columns != page.columns {
            return Err(GatewayError::Decode("field layout changed between pages".into()));
        }
        self.items.extend(page.items);
        self.has_more = page.has_more;
        Ok(())
    }

    fn rows(&self) -> impl Iterator<Item = Row<'_>> {
        self.items.iter().map(move |values| Row {
            columns: &self.columns,
            values: values.as_slice(),
        })
    }
}

struct Row<'a> {
    columns: &'a HashMap<String, usize>,
    values: &'a [Value],
}

impl<'a> Row<'a> {
    fn value(&self, name: &str) -> Option<&'a Value> {
        let index = *self.columns.get(name)?;
        self.values.get(index).filter(|value| !value.is_null())
    }

    fn str(&self, name: &str) -> Option<&'a str> {
        self.value(name)?.as_str()
    }

    fn f64(&self, name: &str) -> Option<f64> {
        let value = match self.value(name)? {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.parse().ok(),
            _ => None,
        };
        value.filter(|v| v.is_finite())
    }

    fn decimal(&self, name: &str) -> Option<Decimal> {
        match self.value(name)? {
            Value::Number(n) => n
                .to_string()
                .parse::<Decimal>()
                .ok()
                .or_else(|| n.as_f64().and_then(|f| Decimal::try_from(f).ok())),
            Value::String(s) => s.parse().ok(),
            _ => None,
        }
    }

    fn date(&self, name: &str) -> Option<NaiveDate> {
        parse_compact(self.str(name)?).ok()
    }

    fn code(&self, name: &str) -> Option<StockCode> {
        StockCode::from_ts_code(self.str(name)?).ok()
    }
}
