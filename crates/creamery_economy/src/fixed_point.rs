//! # Fixed-Point Arithmetic
//!
//! **NO FLOATING POINT IN AMOUNTS, COSTS OR CAPACITIES**
//!
//! The game rounds every resource amount and every building cost to two
//! decimal places after every single mutation. Instead of calling a rounding
//! function on `f64` values and hoping the drift stays invisible, every value
//! lives on an integer grid.
//!
//! ## Precision Levels
//!
//! - `Amount`: i64 with 2 decimals - resource amounts, capacities, costs
//! - `Ratio`: i64 with 4 decimals - cost growth, per-unit rates, efficiency
//!   multipliers and display production rates
//!
//! ## Rounding
//!
//! Every narrowing operation (`Amount * Ratio`, `Amount / Ratio`,
//! `Ratio -> Amount`, `Ratio * Ratio`) rounds half away from zero.
//! Intermediate products are widened to i128.

use std::fmt;
use std::ops::{Add, AddAssign, Mul, Neg, Sub, SubAssign};

use serde::{Deserialize, Serialize};

/// Number of decimal places for `Amount`.
const AMOUNT_DECIMALS: u32 = 2;

/// Number of decimal places for `Ratio`.
const RATIO_DECIMALS: u32 = 4;

/// The multiplier for 2 decimal places.
const AMOUNT_SCALE: i64 = 10i64.pow(AMOUNT_DECIMALS);

/// The multiplier for 4 decimal places.
const RATIO_SCALE: i64 = 10i64.pow(RATIO_DECIMALS);

/// Ratio raw units per amount raw unit.
const RATIO_PER_AMOUNT: i64 = RATIO_SCALE / AMOUNT_SCALE;

/// Integer division rounding half away from zero.
#[inline]
const fn div_round(num: i128, den: i128) -> i128 {
    let quotient = num / den;
    let remainder = num % den;
    if 2 * remainder.abs() >= den.abs() {
        if (num < 0) != (den < 0) {
            quotient - 1
        } else {
            quotient + 1
        }
    } else {
        quotient
    }
}

/// Narrows an i128 intermediate back to i64, saturating at the bounds.
#[inline]
const fn saturate(value: i128) -> i64 {
    if value > i64::MAX as i128 {
        i64::MAX
    } else if value < i64::MIN as i128 {
        i64::MIN
    } else {
        value as i64
    }
}

/// Writes `raw / 10^decimals` with trailing zeros trimmed.
fn write_trimmed(f: &mut fmt::Formatter<'_>, raw: i64, decimals: u32) -> fmt::Result {
    let scale = 10u64.pow(decimals);
    let sign = if raw < 0 { "-" } else { "" };
    let magnitude = raw.unsigned_abs();
    let whole = magnitude / scale;
    let mut frac = magnitude % scale;
    if frac == 0 {
        return write!(f, "{sign}{whole}");
    }
    let mut width = decimals as usize;
    while frac % 10 == 0 {
        frac /= 10;
        width -= 1;
    }
    write!(f, "{sign}{whole}.{frac:0width$}")
}

// =============================================================================
// Amount - 2 decimals
// =============================================================================

/// Fixed-point decimal number with 2 decimal places.
///
/// Internally stores value * 100 as an i64. Signed, because deltas (costs
/// being deducted, refunds, per-tick production) flow through the same type.
///
/// # Example
///
/// ```rust
/// use creamery_economy::{Amount, Ratio};
///
/// let cost = Amount::from_whole(10);
/// let next = cost.mul_ratio(Ratio::from_raw(11_200)); // * 1.12
/// assert_eq!(next, Amount::from_cents(1_120));
/// assert_eq!(next.to_string(), "11.2");
/// ```
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
#[repr(transparent)]
pub struct Amount(i64);

impl Amount {
    /// Zero value.
    pub const ZERO: Self = Self(0);

    /// One unit (1.00).
    pub const ONE: Self = Self(AMOUNT_SCALE);

    /// Maximum representable value.
    pub const MAX: Self = Self(i64::MAX);

    /// Creates an amount from a whole number.
    #[inline]
    #[must_use]
    pub const fn from_whole(whole: i64) -> Self {
        Self(whole * AMOUNT_SCALE)
    }

    /// Creates an amount from hundredths (`1_120` is `11.20`).
    #[inline]
    #[must_use]
    pub const fn from_cents(cents: i64) -> Self {
        Self(cents)
    }

    /// Returns the raw value in hundredths.
    #[inline]
    #[must_use]
    pub const fn cents(self) -> i64 {
        self.0
    }

    /// Creates an amount from a float, rounding to the nearest hundredth.
    ///
    /// Returns `None` for NaN and infinities.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
    pub fn from_f64(value: f64) -> Option<Self> {
        if !value.is_finite() {
            return None;
        }
        let scaled = (value * AMOUNT_SCALE as f64).round();
        if scaled.abs() > i64::MAX as f64 {
            return None;
        }
        Some(Self(scaled as i64))
    }

    /// Converts to a float (for display layers that want one).
    #[inline]
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn to_f64(self) -> f64 {
        self.0 as f64 / AMOUNT_SCALE as f64
    }

    /// Returns true if this value is zero.
    #[inline]
    #[must_use]
    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }

    /// Returns true if this value is below zero.
    #[inline]
    #[must_use]
    pub const fn is_negative(self) -> bool {
        self.0 < 0
    }

    /// Returns true if this value is above zero.
    #[inline]
    #[must_use]
    pub const fn is_positive(self) -> bool {
        self.0 > 0
    }

    /// Clamps into `[min, max]`. If `max < min`, `min` wins.
    #[inline]
    #[must_use]
    pub const fn clamp_to(self, min: Self, max: Self) -> Self {
        if self.0 > max.0 {
            if max.0 < min.0 {
                min
            } else {
                max
            }
        } else if self.0 < min.0 {
            min
        } else {
            self
        }
    }

    /// Saturating addition.
    #[inline]
    #[must_use]
    pub const fn saturating_add(self, rhs: Self) -> Self {
        Self(self.0.saturating_add(rhs.0))
    }

    /// Saturating subtraction.
    #[inline]
    #[must_use]
    pub const fn saturating_sub(self, rhs: Self) -> Self {
        Self(self.0.saturating_sub(rhs.0))
    }

    /// Multiplies by an integer count, saturating.
    #[inline]
    #[must_use]
    pub const fn times(self, count: u32) -> Self {
        Self(self.0.saturating_mul(count as i64))
    }

    /// Multiplies by a ratio and rounds back onto the 2-decimal grid.
    #[inline]
    #[must_use]
    pub const fn mul_ratio(self, ratio: Ratio) -> Self {
        let product = self.0 as i128 * ratio.0 as i128;
        Self(saturate(div_round(product, RATIO_SCALE as i128)))
    }

    /// Divides by a ratio and rounds back onto the 2-decimal grid.
    ///
    /// Returns `None` when dividing by zero.
    #[inline]
    #[must_use]
    pub const fn div_ratio(self, ratio: Ratio) -> Option<Self> {
        if ratio.0 == 0 {
            return None;
        }
        let scaled = self.0 as i128 * RATIO_SCALE as i128;
        Some(Self(saturate(div_round(scaled, ratio.0 as i128))))
    }

    /// Widens to a ratio without loss.
    #[inline]
    #[must_use]
    pub const fn to_ratio(self) -> Ratio {
        Ratio(self.0.saturating_mul(RATIO_PER_AMOUNT))
    }
}

impl Add for Amount {
    type Output = Self;

    #[inline]
    fn add(self, rhs: Self) -> Self::Output {
        self.saturating_add(rhs)
    }
}

impl AddAssign for Amount {
    #[inline]
    fn add_assign(&mut self, rhs: Self) {
        *self = self.saturating_add(rhs);
    }
}

impl Sub for Amount {
    type Output = Self;

    #[inline]
    fn sub(self, rhs: Self) -> Self::Output {
        self.saturating_sub(rhs)
    }
}

impl SubAssign for Amount {
    #[inline]
    fn sub_assign(&mut self, rhs: Self) {
        *self = self.saturating_sub(rhs);
    }
}

impl Neg for Amount {
    type Output = Self;

    #[inline]
    fn neg(self) -> Self::Output {
        Self(self.0.saturating_neg())
    }
}

impl TryFrom<f64> for Amount {
    type Error = String;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        Self::from_f64(value).ok_or_else(|| format!("{value} is not a representable amount"))
    }
}

impl From<Amount> for f64 {
    fn from(value: Amount) -> Self {
        value.to_f64()
    }
}

impl fmt::Debug for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let magnitude = self.0.unsigned_abs();
        write!(
            f,
            "Amount({sign}{}.{:02})",
            magnitude / AMOUNT_SCALE.unsigned_abs(),
            magnitude % AMOUNT_SCALE.unsigned_abs()
        )
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_trimmed(f, self.0, AMOUNT_DECIMALS)
    }
}

// =============================================================================
// Ratio - 4 decimals
// =============================================================================

/// Fixed-point decimal number with 4 decimal places.
///
/// Used for multipliers (`1.12` cost growth, `1.2` efficiency) and for
/// per-unit rates (`0.63` milk per cow per tick). The extra precision keeps
/// `rate * efficiency` exact (`0.63 * 1.2 = 0.756`) until the final rounding
/// onto the amount grid.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
#[repr(transparent)]
pub struct Ratio(i64);

impl Ratio {
    /// Zero.
    pub const ZERO: Self = Self(0);

    /// One (identity multiplier).
    pub const ONE: Self = Self(RATIO_SCALE);

    /// Creates a ratio from ten-thousandths (`11_200` is `1.12`).
    #[inline]
    #[must_use]
    pub const fn from_raw(raw: i64) -> Self {
        Self(raw)
    }

    /// Returns the raw value in ten-thousandths.
    #[inline]
    #[must_use]
    pub const fn raw(self) -> i64 {
        self.0
    }

    /// Creates a ratio from a float, rounding to 4 decimals.
    ///
    /// Returns `None` for NaN and infinities.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
    pub fn from_f64(value: f64) -> Option<Self> {
        if !value.is_finite() {
            return None;
        }
        let scaled = (value * RATIO_SCALE as f64).round();
        if scaled.abs() > i64::MAX as f64 {
            return None;
        }
        Some(Self(scaled as i64))
    }

    /// Converts to a float.
    #[inline]
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn to_f64(self) -> f64 {
        self.0 as f64 / RATIO_SCALE as f64
    }

    /// Returns true if this value is zero.
    #[inline]
    #[must_use]
    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }

    /// Returns true if this value is above zero.
    #[inline]
    #[must_use]
    pub const fn is_positive(self) -> bool {
        self.0 > 0
    }

    /// Multiplies by an integer count. Exact (saturating).
    #[inline]
    #[must_use]
    pub const fn times(self, count: u32) -> Self {
        Self(self.0.saturating_mul(count as i64))
    }

    /// Multiplies two ratios, rounding to 4 decimals.
    #[inline]
    #[must_use]
    pub const fn mul_ratio(self, rhs: Self) -> Self {
        let product = self.0 as i128 * rhs.0 as i128;
        Self(saturate(div_round(product, RATIO_SCALE as i128)))
    }

    /// Rounds onto the 2-decimal amount grid.
    #[inline]
    #[must_use]
    pub const fn to_amount(self) -> Amount {
        Amount(saturate(div_round(self.0 as i128, RATIO_PER_AMOUNT as i128)))
    }

    /// Formats a per-tick rate the way the resource panel shows it.
    ///
    /// Positive rates get a leading `+`, zero renders as an empty string.
    ///
    /// ```rust
    /// use creamery_economy::Ratio;
    ///
    /// assert_eq!(Ratio::from_raw(6_300).per_second_label(), "+0.63/s");
    /// assert_eq!(Ratio::from_raw(-50_000).per_second_label(), "-5/s");
    /// assert_eq!(Ratio::ZERO.per_second_label(), "");
    /// ```
    #[must_use]
    pub fn per_second_label(self) -> String {
        let shown = self.to_amount();
        if shown.is_positive() {
            format!("+{shown}/s")
        } else if shown.is_negative() {
            format!("{shown}/s")
        } else {
            String::new()
        }
    }
}

impl Add for Ratio {
    type Output = Self;

    #[inline]
    fn add(self, rhs: Self) -> Self::Output {
        Self(self.0.saturating_add(rhs.0))
    }
}

impl AddAssign for Ratio {
    #[inline]
    fn add_assign(&mut self, rhs: Self) {
        self.0 = self.0.saturating_add(rhs.0);
    }
}

impl Sub for Ratio {
    type Output = Self;

    #[inline]
    fn sub(self, rhs: Self) -> Self::Output {
        Self(self.0.saturating_sub(rhs.0))
    }
}

impl SubAssign for Ratio {
    #[inline]
    fn sub_assign(&mut self, rhs: Self) {
        self.0 = self.0.saturating_sub(rhs.0);
    }
}

impl Neg for Ratio {
    type Output = Self;

    #[inline]
    fn neg(self) -> Self::Output {
        Self(self.0.saturating_neg())
    }
}

impl Mul for Ratio {
    type Output = Self;

    #[inline]
    fn mul(self, rhs: Self) -> Self::Output {
        self.mul_ratio(rhs)
    }
}

impl TryFrom<f64> for Ratio {
    type Error = String;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        Self::from_f64(value).ok_or_else(|| format!("{value} is not a representable ratio"))
    }
}

impl From<Ratio> for f64 {
    fn from(value: Ratio) -> Self {
        value.to_f64()
    }
}

impl fmt::Debug for Ratio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let magnitude = self.0.unsigned_abs();
        write!(
            f,
            "Ratio({sign}{}.{:04})",
            magnitude / RATIO_SCALE.unsigned_abs(),
            magnitude % RATIO_SCALE.unsigned_abs()
        )
    }
}

impl fmt::Display for Ratio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_trimmed(f, self.0, RATIO_DECIMALS)
    }
}
