use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A token amount with decimal precision
///
/// All arithmetic happens on integer base units (`amount * 10^decimals`);
/// decimal display values are derived by re-scaling, never accumulated in
/// floating point.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct TokenAmount {
    /// The amount in the smallest unit
    pub base_units: u64,

    /// Decimal precision (e.g., 6 for millionths)
    pub decimals: u8,
}

impl TokenAmount {
    /// Create a new token amount from base units
    pub fn new(base_units: u64, decimals: u8) -> Self {
        Self {
            base_units,
            decimals,
        }
    }

    /// The zero amount at the given precision
    pub fn zero(decimals: u8) -> Self {
        Self::new(0, decimals)
    }

    pub fn is_zero(&self) -> bool {
        self.base_units == 0
    }

    /// Parse a decimal token string (e.g., "12.5") into base units.
    ///
    /// Fractional digits beyond the declared precision are dropped
    /// (rounded toward zero). Negative amounts are rejected.
    pub fn parse(text: &str, decimals: u8) -> Result<Self> {
        let text = text.trim();
        if text.is_empty() {
            return Err(anyhow!("Empty token amount"));
        }
        if text.starts_with('-') {
            return Err(anyhow!("Token amount cannot be negative: {}", text));
        }

        let (whole, frac) = match text.split_once('.') {
            Some((whole, frac)) => (whole, frac),
            None => (text, ""),
        };
        if !whole.chars().all(|c| c.is_ascii_digit()) || !frac.chars().all(|c| c.is_ascii_digit()) {
            return Err(anyhow!("Invalid token amount: {}", text));
        }

        let scale = 10u64
            .checked_pow(decimals as u32)
            .ok_or_else(|| anyhow!("Token precision too large: {}", decimals))?;
        let whole_units = if whole.is_empty() {
            0u64
        } else {
            whole
                .parse::<u64>()
                .map_err(|_| anyhow!("Token amount out of range: {}", text))?
                .checked_mul(scale)
                .ok_or_else(|| anyhow!("Token amount out of range: {}", text))?
        };

        let kept: String = frac.chars().take(decimals as usize).collect();
        let frac_units = if kept.is_empty() {
            0u64
        } else {
            let parsed = kept
                .parse::<u64>()
                .map_err(|_| anyhow!("Token amount out of range: {}", text))?;
            parsed * 10u64.pow((decimals as usize - kept.len()) as u32)
        };

        let base_units = whole_units
            .checked_add(frac_units)
            .ok_or_else(|| anyhow!("Token amount out of range: {}", text))?;
        Ok(Self::new(base_units, decimals))
    }

    /// Add two token amounts (requires matching decimal precision)
    pub fn checked_add(&self, other: &Self) -> Result<Self> {
        if self.decimals != other.decimals {
            return Err(anyhow!(
                "Cannot add token amounts with different decimal precision"
            ));
        }
        Ok(Self::new(
            self.base_units
                .checked_add(other.base_units)
                .ok_or_else(|| anyhow!("Token amount addition overflow"))?,
            self.decimals,
        ))
    }

    /// Subtract, clamping at zero (requires matching decimal precision)
    pub fn saturating_sub(&self, other: &Self) -> Result<Self> {
        if self.decimals != other.decimals {
            return Err(anyhow!(
                "Cannot subtract token amounts with different decimal precision"
            ));
        }
        Ok(Self::new(
            self.base_units.saturating_sub(other.base_units),
            self.decimals,
        ))
    }

    /// Multiply by a unit count
    pub fn mul_units(&self, count: u64) -> Result<Self> {
        Ok(Self::new(
            self.base_units
                .checked_mul(count)
                .ok_or_else(|| anyhow!("Token amount multiplication overflow"))?,
            self.decimals,
        ))
    }

    /// How many whole units of `unit_price` this amount can pay for (floored)
    pub fn div_units(&self, unit_price: &Self) -> Result<u64> {
        if self.decimals != unit_price.decimals {
            return Err(anyhow!(
                "Cannot divide token amounts with different decimal precision"
            ));
        }
        if unit_price.base_units == 0 {
            return Err(anyhow!("Cannot divide by a zero token amount"));
        }
        Ok(self.base_units / unit_price.base_units)
    }

    /// Split into `(fee, remainder)` at the given fee in basis points.
    ///
    /// `fee = floor(base_units * fee_bps / 10_000)`; the remainder is what is
    /// left after the fee, so the two legs always sum back to the gross.
    pub fn fee_split(&self, fee_bps: u32) -> (Self, Self) {
        let fee = (self.base_units as u128 * fee_bps as u128 / 10_000) as u64;
        (
            Self::new(fee, self.decimals),
            Self::new(self.base_units - fee, self.decimals),
        )
    }

    /// Floored proportional share: `floor(base_units * numerator / denominator)`
    ///
    /// A zero denominator yields the zero amount.
    pub fn proportional(&self, numerator: u64, denominator: u64) -> Self {
        if denominator == 0 {
            return Self::zero(self.decimals);
        }
        let share = self.base_units as u128 * numerator as u128 / denominator as u128;
        Self::new(share as u64, self.decimals)
    }

    /// Render as a decimal string quantized to the declared precision
    pub fn to_decimal_string(&self) -> String {
        if self.decimals == 0 {
            return self.base_units.to_string();
        }
        let scale = 10u64.pow(self.decimals as u32);
        format!(
            "{}.{:0width$}",
            self.base_units / scale,
            self.base_units % scale,
            width = self.decimals as usize
        )
    }
}

impl fmt::Display for TokenAmount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_decimal_string())
    }
}
