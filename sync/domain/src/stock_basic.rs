use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::StockCode;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockBasic {
    pub code: StockCode,
    pub name: String,
    #[serde(default)]
    pub area: Option<String>,
    #[serde(default)]
    pub industry: Option<String>,
    #[serde(default)]
    pub market: Option<String>,
    #[serde(default)]
    pub list_date: Option<NaiveDate>,
}

impl StockBasic {
    pub fn new(code: StockCode, name: impl Into<String>) -> Self {
        Self {
            code,
            name: name.into(),
            area: None,
            industry: None,
            market: None,
            list_date: None,
        }
    }

    /// ST and *ST names flag special-treatment listings.
    pub fn is_special_treatment(&self) -> bool {
        self.name.to_ascii_uppercase().contains("ST")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_special_treatment_flag() {
        let code = StockCode::parse("600000").unwrap();
        assert!(StockBasic::new(code.clone(), "*ST华仪").is_special_treatment());
        assert!(!StockBasic::new(code, "浦发银行").is_special_treatment());
    }
}
