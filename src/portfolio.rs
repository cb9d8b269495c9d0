// src/portfolio.rs
use crate::error::ApiError;
use crate::models::CoinData;

/// Outcome of applying a buy/sell delta to a position.
#[derive(Debug, PartialEq)]
pub enum PositionChange {
    Write(CoinData),
    Remove,
    Noop,
}

/// Amend-or-remove arithmetic for a portfolio update.
///
/// A sell scales the invested amount by the fraction of the holding that
/// survives, not by the raw delta. A sell that would take the quantity
/// below zero is rejected; a sell that lands exactly on zero removes the
/// position. With no existing position, only a strictly positive buy
/// (both deltas > 0) creates one; anything else is silently ignored.
pub fn apply_delta(
    existing: Option<CoinData>,
    delta: CoinData,
) -> Result<PositionChange, ApiError> {
    let held = match existing {
        Some(held) => held,
        None => {
            if delta.coins < 0.0 {
                return Err(ApiError::Invalid(
                    "Cannot sell coins that are not in your portfolio".to_string(),
                ));
            }
            if delta.total_investment > 0.0 && delta.coins > 0.0 {
                return Ok(PositionChange::Write(delta));
            }
            return Ok(PositionChange::Noop);
        }
    };

    let new_coins = held.coins + delta.coins;

    if delta.coins < 0.0 {
        let sell_amount = delta.coins.abs();
        if sell_amount > held.coins {
            return Err(ApiError::Invalid(format!(
                "Cannot sell {} coins. You only own {} coins.",
                sell_amount, held.coins
            )));
        }
    }

    if new_coins <= 0.0 {
        Ok(PositionChange::Remove)
    } else if delta.coins < 0.0 {
        let remaining_ratio = new_coins / held.coins;
        Ok(PositionChange::Write(CoinData {
            total_investment: held.total_investment * remaining_ratio,
            coins: new_coins,
        }))
    } else {
        Ok(PositionChange::Write(CoinData {
            total_investment: held.total_investment + delta.total_investment,
            coins: new_coins,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn coin_data(total_investment: f64, coins: f64) -> CoinData {
        CoinData {
            total_investment,
            coins,
        }
    }

    #[test]
    fn first_buy_creates_position() {
        let change = apply_delta(None, coin_data(100.0, 2.0)).unwrap();
        assert_eq!(change, PositionChange::Write(coin_data(100.0, 2.0)));
    }

    #[test]
    fn top_up_adds_investment_and_quantity() {
        let change = apply_delta(Some(coin_data(100.0, 2.0)), coin_data(50.0, 1.0)).unwrap();
        assert_eq!(change, PositionChange::Write(coin_data(150.0, 3.0)));
    }

    #[test]
    fn partial_sell_scales_cost_basis() {
        let change = apply_delta(Some(coin_data(100.0, 4.0)), coin_data(0.0, -1.0)).unwrap();
        assert_eq!(change, PositionChange::Write(coin_data(75.0, 3.0)));
    }

    #[test]
    fn invested_delta_is_ignored_on_a_sell() {
        let change = apply_delta(Some(coin_data(100.0, 4.0)), coin_data(999.0, -2.0)).unwrap();
        assert_eq!(change, PositionChange::Write(coin_data(50.0, 2.0)));
    }

    #[test]
    fn full_sell_removes_position() {
        let change = apply_delta(Some(coin_data(100.0, 4.0)), coin_data(0.0, -4.0)).unwrap();
        assert_eq!(change, PositionChange::Remove);
    }

    #[test]
    fn oversell_is_rejected_with_amounts() {
        let err = apply_delta(Some(coin_data(100.0, 2.0)), coin_data(0.0, -3.0)).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Cannot sell 3 coins. You only own 2 coins."
        );
    }

    #[test]
    fn sell_without_position_is_rejected() {
        let err = apply_delta(None, coin_data(0.0, -1.0)).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Cannot sell coins that are not in your portfolio"
        );
    }

    #[test]
    fn non_positive_buy_without_position_is_ignored() {
        let change = apply_delta(None, coin_data(0.0, 2.0)).unwrap();
        assert_eq!(change, PositionChange::Noop);
        let change = apply_delta(None, coin_data(100.0, 0.0)).unwrap();
        assert_eq!(change, PositionChange::Noop);
        let change = apply_delta(None, coin_data(-5.0, 2.0)).unwrap();
        assert_eq!(change, PositionChange::Noop);
    }
}
