//! Position sizing from an account-risk budget and a stop distance.
//!
//! risk_amount   = equity × risk_fraction
//! per_share     = entry − stop            (must be > 0)
//! raw           = floor(risk_amount / per_share)
//! size          = min(raw, floor((max_position_value − exposure) / entry), max_shares)
//!
//! Zero means "no trade": the size rounded to nothing or cash cannot cover it.

use super::error::EngineError;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RiskLimits {
    pub risk_fraction: f64,
    pub max_position_value: f64,
    pub max_shares: i64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SizingRequest {
    pub account_equity: f64,
    pub available_cash: f64,
    pub entry_price: f64,
    pub stop_price: f64,
    /// Market value already held in the instrument.
    pub existing_exposure: f64,
}

pub fn position_size(request: &SizingRequest, limits: &RiskLimits) -> Result<i64, EngineError> {
    let per_share_risk = request.entry_price - request.stop_price;
    if !(per_share_risk > 0.0) || !(request.entry_price > 0.0) {
        return Err(EngineError::InvalidStopDistance {
            entry: request.entry_price,
            stop: request.stop_price,
        });
    }

    let risk_amount = request.account_equity.max(0.0) * limits.risk_fraction;
    let raw_size = (risk_amount / per_share_risk).floor();

    let headroom = (limits.max_position_value - request.existing_exposure).max(0.0);
    let value_cap = (headroom / request.entry_price).floor();

    let size = raw_size.min(value_cap).min(limits.max_shares as f64).max(0.0) as i64;

    if size == 0 || size as f64 * request.entry_price > request.available_cash {
        return Ok(0);
    }
    Ok(size)
}
