use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Six-digit A-share security code, stored without the exchange suffix.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct StockCode(String);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Exchange {
    Shanghai,
    Shenzhen,
    Beijing,
}

impl Exchange {
    pub fn suffix(&self) -> &'static str {
        match self {
            Exchange::Shanghai => "SH",
            Exchange::Shenzhen => "SZ",
            Exchange::Beijing => "BJ",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Board {
    Main,
    ChiNext,
    Star,
    Bse,
}

impl StockCode {
    pub fn parse(raw: &str) -> Result<Self, StockCodeError> {
        let raw = raw.trim();
        if raw.len() != 6 || !raw.bytes().all(|b| b.is_ascii_digit()) {
            return Err(StockCodeError::Malformed(raw.to_string()));
        }
        if exchange_for(raw).is_none() {
            return Err(StockCodeError::UnknownExchange(raw.to_string()));
        }
        Ok(Self(raw.to_string()))
    }

    /// Accepts provider codes such as `600000.SH`.
    pub fn from_ts_code(ts_code: &str) -> Result<Self, StockCodeError> {
        let body = ts_code.split('.').next().unwrap_or_default();
        Self::parse(body)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn exchange(&self) -> Exchange {
        // parse() guarantees a known leading digit
        exchange_for(&self.0).unwrap_or(Exchange::Shenzhen)
    }

    pub fn board(&self) -> Board {
        if self.exchange() == Exchange::Beijing {
            return Board::Bse;
        }
        match &self.0[..3] {
            "688" | "689" => Board::Star,
            "300" | "301" => Board::ChiNext,
            _ => Board::Main,
        }
    }

    pub fn to_ts_code(&self) -> String {
        format!("{}.{}", self.0, self.exchange().suffix())
    }
}

fn exchange_for(code: &str) -> Option<Exchange> {
    match code.as_bytes().first()? {
        b'6' | b'9' => Some(Exchange::Shanghai),
        b'0' | b'2' | b'3' => Some(Exchange::Shenzhen),
        b'4' | b'8' => Some(Exchange::Beijing),
        _ => None,
    }
}

impl fmt::Display for StockCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for StockCode {
    type Err = StockCodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for StockCode {
    type Error = StockCodeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<StockCode> for String {
    fn from(code: StockCode) -> Self {
        code.0
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StockCodeError {
    #[error("Stock code must be six digits: '{0}'")]
    Malformed(String),
    #[error("Stock code has no known exchange: '{0}'")]
    UnknownExchange(String),
}
