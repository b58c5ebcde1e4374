//! Stop trigger evaluation
//!
//! Pure threshold checks for the three stop flavours:
//! - STOP_LOSS fires when `current ≤ stop_price`
//! - TAKE_PROFIT fires when `current ≥ stop_price`
//! - TRAILING_STOP seeds a high-water mark on first sight, only ever raises
//!   it, and fires once price has retraced `trailing_percent` from the mark

use rust_decimal::Decimal;
use types::errors::{ExchangeError, ExchangeResult};
use types::numeric::Price;
use types::order::{StopTrigger, StopType};

/// Outcome of evaluating one armed trigger against a price
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerDecision {
    Hold,
    Fire,
}

/// Check trigger parameters for a new stop order
pub fn validate_trigger(
    stop_type: StopType,
    stop_price: Option<Price>,
    trailing_percent: Option<Decimal>,
) -> ExchangeResult<()> {
    match stop_type {
        StopType::StopLoss | StopType::TakeProfit => {
            if stop_price.is_none() {
                return Err(ExchangeError::invalid(format!("{:?} requires a stop price", stop_type)));
            }
            if trailing_percent.is_some() {
                return Err(ExchangeError::invalid(format!("{:?} takes no trailing percent", stop_type)));
            }
        }
        StopType::TrailingStop => {
            let percent = trailing_percent
                .ok_or_else(|| ExchangeError::invalid("TrailingStop requires a trailing percent"))?;
            if percent <= Decimal::ZERO || percent >= Decimal::ONE_HUNDRED {
                return Err(ExchangeError::invalid(format!(
                    "trailing percent must be in (0, 100), got {}",
                    percent
                )));
            }
            if stop_price.is_some() {
                return Err(ExchangeError::invalid("TrailingStop takes no stop price"));
            }
        }
    }
    Ok(())
}

/// Percentage drop from `mark` to `current` (0 when price is at or above it)
pub fn retrace_percent(mark: Price, current: Price) -> Decimal {
    let mark = mark.as_decimal();
    let drop = mark - current.as_decimal();
    if drop <= Decimal::ZERO {
        return Decimal::ZERO;
    }
    drop / mark * Decimal::ONE_HUNDRED
}

/// Evaluate an armed trigger, updating the trailing mark in place
pub fn evaluate(trigger: &mut StopTrigger, current: Price) -> TriggerDecision {
    if !trigger.is_armed() {
        return TriggerDecision::Hold;
    }
    let fire = match trigger.stop_type {
        StopType::StopLoss => trigger.stop_price.is_some_and(|stop| current <= stop),
        StopType::TakeProfit => trigger.stop_price.is_some_and(|stop| current >= stop),
        StopType::TrailingStop => {
            let Some(percent) = trigger.trailing_percent else {
                return TriggerDecision::Hold;
            };
            match trigger.trailing_price {
                None => {
                    trigger.trailing_price = Some(current);
                    false
                }
                Some(mark) if current > mark => {
                    trigger.trailing_price = Some(current);
                    false
                }
                Some(mark) => retrace_percent(mark, current) >= percent,
            }
        }
    };
    if fire {
        TriggerDecision::Fire
    } else {
        TriggerDecision::Hold
    }
}
