//! Commission-adjusted payout arithmetic and rating deltas.
//!
//! Rates are `rust_decimal` values; products round toward zero before
//! re-entering the integer minor-units domain, so the house never pays out
//! a fractional cent.

use crate::domain::Amount;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

/// Rating delta for the winner of a match.
pub const RATING_WIN_DELTA: i64 = 10;
/// Rating delta for each loser, applied with a floor of zero.
pub const RATING_LOSS_DELTA: i64 = -5;

/// Prize pool for a match: `stake x players x (1 - commission_rate)`.
///
/// Commission is applied exactly once, here at pool formation; the
/// distributor later pays the pool out in full. With the default 10% rate a
/// 1v1 match yields the fixed 1.8x-stake pool.
pub fn prize_pool(stake: Amount, players: u32, commission_rate: Decimal) -> Amount {
    let gross = Decimal::from(stake.as_minor_units()) * Decimal::from(players);
    let net = gross * (Decimal::ONE - commission_rate);
    Amount::new(net.trunc().to_i64().unwrap_or(0))
}

/// One-time referral commission on a first qualifying deposit.
pub fn referral_bonus(deposit: Amount, referral_rate: Decimal) -> Amount {
    let bonus = Decimal::from(deposit.as_minor_units()) * referral_rate;
    Amount::new(bonus.trunc().to_i64().unwrap_or(0))
}
