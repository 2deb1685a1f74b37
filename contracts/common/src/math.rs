//! Fixed-point helpers.
//!
//! Exchange rates and share prices are WAD scaled (1.0 == 1e18). Fee fractions
//! are basis points (1.0 == 10_000). Conversions into underlying units always
//! truncate so backing assets are never overstated.

use crate::Error;

pub const WAD: i128 = 1_000_000_000_000_000_000;
pub const BPS_DENOMINATOR: i128 = 10_000;
pub const SECONDS_PER_YEAR: i128 = 31_536_000;

/// `floor(a * b / d)` for non-negative operands.
pub fn mul_div_floor(a: i128, b: i128, d: i128) -> Result<i128, Error> {
    if d == 0 {
        return Err(Error::ArithmeticOverflow);
    }
    a.checked_mul(b)
        .and_then(|n| n.checked_div(d))
        .ok_or(Error::ArithmeticOverflow)
}

/// `ceil(a * b / d)` for non-negative operands.
pub fn mul_div_ceil(a: i128, b: i128, d: i128) -> Result<i128, Error> {
    if d == 0 {
        return Err(Error::ArithmeticOverflow);
    }
    let n = a.checked_mul(b).ok_or(Error::ArithmeticOverflow)?;
    let q = n / d;
    if n % d == 0 {
        Ok(q)
    } else {
        q.checked_add(1).ok_or(Error::ArithmeticOverflow)
    }
}

/// Underlying value of `receipts` at `rate`, truncated.
///
/// Split around WAD so the product stays in range for any realistic balance;
/// saturates instead of failing because balance reads must not fail.
pub fn to_underlying(receipts: i128, rate: i128) -> i128 {
    let whole = (receipts / WAD).saturating_mul(rate);
    let frac = (receipts % WAD).saturating_mul(rate) / WAD;
    whole.saturating_add(frac)
}

/// Receipts needed to redeem at least `amount` underlying at `rate`.
pub fn receipts_for(amount: i128, rate: i128) -> Result<i128, Error> {
    mul_div_ceil(amount, WAD, rate)
}

/// `amount * bps / 10_000`, truncated.
pub fn bps_of(amount: i128, bps: u32) -> Result<i128, Error> {
    mul_div_floor(amount, bps as i128, BPS_DENOMINATOR)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_to_underlying_truncates() {
        assert_eq!(to_underlying(1_000, WAD), 1_000);
        // 1.5 rate on 3 receipts is 4.5, never rounded up
        assert_eq!(to_underlying(3, WAD + WAD / 2), 4);
        assert_eq!(to_underlying(0, 2 * WAD), 0);
        assert_eq!(to_underlying(5 * WAD + 1, 2 * WAD), 10 * WAD + 2);
    }

    #[test]
    fn test_receipts_for_covers_amount() {
        let rate = WAD + WAD / 3;
        let receipts = receipts_for(1_000, rate).unwrap();
        assert!(to_underlying(receipts, rate) >= 1_000);
        assert!(to_underlying(receipts - 1, rate) < 1_000);
    }

    #[test]
    fn test_mul_div_rejects_zero_divisor_and_overflow() {
        assert_eq!(mul_div_floor(1, 1, 0), Err(Error::ArithmeticOverflow));
        assert_eq!(mul_div_floor(i128::MAX, 2, 1), Err(Error::ArithmeticOverflow));
        assert_eq!(mul_div_ceil(7, 1, 2), Ok(4));
        assert_eq!(mul_div_ceil(8, 1, 2), Ok(4));
    }

    #[test]
    fn test_bps_of() {
        assert_eq!(bps_of(100, 100), Ok(1));
        assert_eq!(bps_of(100, 500), Ok(5));
        assert_eq!(bps_of(99, 100), Ok(0));
    }
}
