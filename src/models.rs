// src/models.rs
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone)]
pub struct User {
    pub id: String,
    pub username: String,
    pub password_hash: String,
}

/// A portfolio holding: cumulative invested amount and quantity held.
/// The same shape carries the buy/sell delta in update requests.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CoinData {
    #[serde(rename = "totalInvestment")]
    pub total_investment: f64,
    pub coins: f64,
}

#[derive(Deserialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

#[derive(Deserialize)]
pub struct WatchlistRequest {
    pub coin: String,
}

#[derive(Deserialize)]
pub struct PortfolioUpdateRequest {
    pub coin: String,
    #[serde(rename = "coinData")]
    pub coin_data: CoinData,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn non_numeric_delta_is_rejected_at_the_boundary() {
        let body = r#"{"coin":"bitcoin","coinData":{"totalInvestment":"100","coins":2}}"#;
        assert!(serde_json::from_str::<PortfolioUpdateRequest>(body).is_err());
    }

    #[test]
    fn missing_coin_is_rejected_at_the_boundary() {
        let body = r#"{"coinData":{"totalInvestment":100,"coins":2}}"#;
        assert!(serde_json::from_str::<PortfolioUpdateRequest>(body).is_err());
    }
}
