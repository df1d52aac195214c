//! Fixed-point helpers shared by the pool, controller and leverager.
//!
//! Every ratio in the engine (exchange rates, borrow indexes, collateral
//! factors, prices) is a WAD-scaled `U256` (1e18 == 1.0). Token amounts are
//! raw integer units of the token's own decimals.

use alloy_primitives::U256;

use crate::error::LendingError;

/// 1e18, the unit of every WAD-scaled ratio
pub const WAD: U256 = U256::from_limbs([1_000_000_000_000_000_000, 0, 0, 0]);

/// Basis points in 100%
pub const BPS_SCALE: u64 = 10_000;

/// Seconds in a 365-day year, used to convert yearly rates to per-second rates
pub const SECONDS_PER_YEAR: u64 = 31_536_000;

/// Rounding direction for fixed-point conversions.
///
/// Conversions that credit an account round down, conversions that debit an
/// account round up, so rounding dust always stays with the pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoundingDirection {
    Up,
    Down,
}

/// `x * y / d` rounded down. Returns zero when `d` is zero and saturates at
/// `U256::MAX` when the result does not fit.
pub fn mul_div_down(x: U256, y: U256, d: U256) -> U256 {
    if d.is_zero() {
        return U256::ZERO;
    }
    match x.checked_mul(y) {
        Some(product) => product / d,
        None => wide_mul_div(x, y, d, RoundingDirection::Down),
    }
}

/// `x * y / d` rounded up. Returns zero when `d` is zero and saturates at
/// `U256::MAX` when the result does not fit.
pub fn mul_div_up(x: U256, y: U256, d: U256) -> U256 {
    if d.is_zero() {
        return U256::ZERO;
    }
    let Some(product) = x.checked_mul(y) else {
        return wide_mul_div(x, y, d, RoundingDirection::Up);
    };
    let quotient = product / d;
    if (product % d).is_zero() {
        quotient
    } else {
        quotient + U256::from(1)
    }
}

/// `x * y / d` for a product wider than 256 bits, split as
/// `(x / d) * y + (x % d) * y / d`. Saturates at `U256::MAX`.
fn wide_mul_div(x: U256, y: U256, d: U256, rounding: RoundingDirection) -> U256 {
    let whole = (x / d).saturating_mul(y);
    let Some(rest) = (x % d).checked_mul(y) else {
        return U256::MAX;
    };
    let mut result = whole.saturating_add(rest / d);
    if rounding == RoundingDirection::Up && !(rest % d).is_zero() {
        result = result.saturating_add(U256::from(1));
    }
    result
}

/// `x * y / d` with an explicit rounding direction
pub fn mul_div(x: U256, y: U256, d: U256, rounding: RoundingDirection) -> U256 {
    match rounding {
        RoundingDirection::Down => mul_div_down(x, y, d),
        RoundingDirection::Up => mul_div_up(x, y, d),
    }
}

/// WAD multiplication rounded down
pub fn w_mul_down(x: U256, y: U256) -> U256 {
    mul_div_down(x, y, WAD)
}

/// WAD multiplication rounded up
pub fn w_mul_up(x: U256, y: U256) -> U256 {
    mul_div_up(x, y, WAD)
}

/// WAD division rounded down
pub fn w_div_down(x: U256, y: U256) -> U256 {
    mul_div_down(x, WAD, y)
}

/// WAD division rounded up
pub fn w_div_up(x: U256, y: U256) -> U256 {
    mul_div_up(x, WAD, y)
}

/// `x - y`, floored at zero
pub fn zero_floor_sub(x: U256, y: U256) -> U256 {
    x.saturating_sub(y)
}

pub fn min(x: U256, y: U256) -> U256 {
    if x < y {
        x
    } else {
        y
    }
}

pub fn max(x: U256, y: U256) -> U256 {
    if x > y {
        x
    } else {
        y
    }
}

/// `10^decimals` as a U256
pub fn pow10(decimals: u8) -> U256 {
    U256::from(10).pow(U256::from(decimals))
}

/// Converts basis points to a WAD-scaled fraction (5000 bps -> 0.5 WAD)
pub fn bps_to_wad(bps: u64) -> U256 {
    mul_div_down(U256::from(bps), WAD, U256::from(BPS_SCALE))
}

/// Converts a WAD-scaled fraction to basis points, rounded down
pub fn wad_to_bps(wad: U256) -> u64 {
    mul_div_down(wad, U256::from(BPS_SCALE), WAD).saturating_to::<u64>()
}

/// Value of `amount` raw token units at a WAD price per whole token.
///
/// `value = amount * price / 10^decimals`, which puts assets with different
/// decimals on the same WAD-scaled quote unit.
pub fn amount_to_value(amount: U256, price: U256, decimals: u8, rounding: RoundingDirection) -> U256 {
    mul_div(amount, price, pow10(decimals), rounding)
}

/// Inverse of [`amount_to_value`]. Returns zero when `price` is zero.
pub fn value_to_amount(value: U256, price: U256, decimals: u8, rounding: RoundingDirection) -> U256 {
    mul_div(value, pow10(decimals), price, rounding)
}

/// Converts a WAD-scaled value to an f64 (for display and APY math only)
pub fn rate_to_f64(rate: U256) -> f64 {
    let whole = (rate / WAD).saturating_to::<u128>() as f64;
    let frac = (rate % WAD).saturating_to::<u128>() as f64 / 1e18;
    whole + frac
}

/// Converts a per-second WAD rate into a continuously compounded APY
pub fn rate_to_apy(rate_per_second: U256) -> f64 {
    (rate_to_f64(rate_per_second) * SECONDS_PER_YEAR as f64).exp_m1()
}

/// Parses a human-readable decimal string into raw units (e.g. "1.5" with
/// 6 decimals is 1_500_000). Excess fractional digits are truncated.
pub fn parse_units(input: &str, decimals: u8) -> Result<U256, LendingError> {
    let trimmed = input.trim();
    let invalid = || LendingError::InvalidNumber {
        input: input.to_string(),
    };

    let (integer_part, fractional_part) = match trimmed.split_once('.') {
        Some((int, frac)) => (int, frac),
        None => (trimmed, ""),
    };
    if integer_part.is_empty() && fractional_part.is_empty() {
        return Err(invalid());
    }
    if !integer_part.chars().all(|c| c.is_ascii_digit())
        || !fractional_part.chars().all(|c| c.is_ascii_digit())
    {
        return Err(invalid());
    }

    let width = usize::from(decimals);
    let fractional = if fractional_part.len() > width {
        &fractional_part[..width]
    } else {
        fractional_part
    };
    let combined = format!("{}{:0<width$}", integer_part, fractional, width = width);
    let combined = combined.trim_start_matches('0');
    if combined.is_empty() {
        return Ok(U256::ZERO);
    }

    U256::from_str_radix(combined, 10).map_err(|_| invalid())
}

/// Formats raw units as a human-readable decimal string, trimming trailing
/// zeros ("1500000" with 6 decimals is "1.5").
pub fn format_units(amount: U256, decimals: u8) -> String {
    let unit = pow10(decimals);
    let whole = amount / unit;
    let frac = amount % unit;
    if frac.is_zero() {
        return whole.to_string();
    }
    let frac = format!("{:0>width$}", frac.to_string(), width = usize::from(decimals));
    format!("{}.{}", whole, frac.trim_end_matches('0'))
}
