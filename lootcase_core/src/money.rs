use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::ops::{Add, AddAssign, Sub, SubAssign};

/// Decimal amount held as whole cents.
///
/// Catalog files and DTOs carry plain decimal numbers (`2.5`, `10000.00`);
/// these are rounded to the nearest cent on the way in so balance arithmetic
/// stays exact. Amounts beyond [`Money::MAX`] in either direction are refused.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Money(i64);

impl Money {
    pub const ZERO: Money = Money(0);
    pub const MAX: Money = Money(i64::MAX / 100);

    pub const fn from_cents(cents: i64) -> Self {
        Self(cents)
    }

    /// `None` for non-finite amounts and anything outside `-MAX..=MAX`.
    pub fn from_f64(amount: f64) -> Option<Self> {
        let cents = (amount * 100.0).round();
        let limit = Self::MAX.0 as f64;
        if !cents.is_finite() || cents.abs() > limit {
            return None;
        }
        Self(cents as i64).in_range()
    }

    pub fn checked_add(self, rhs: Money) -> Option<Money> {
        self.0.checked_add(rhs.0).map(Money).and_then(Money::in_range)
    }

    pub fn checked_sub(self, rhs: Money) -> Option<Money> {
        self.0.checked_sub(rhs.0).map(Money).and_then(Money::in_range)
    }

    fn in_range(self) -> Option<Money> {
        (self.0.abs() <= Self::MAX.0).then_some(self)
    }

    pub const fn cents(self) -> i64 {
        self.0
    }

    pub fn as_f64(self) -> f64 {
        self.0 as f64 / 100.0
    }

    pub const fn is_negative(self) -> bool {
        self.0 < 0
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        f.pad(&format!("{}{}.{:02}", sign, abs / 100, abs % 100))
    }
}

impl Add for Money {
    type Output = Money;
    fn add(self, rhs: Money) -> Money {
        Money(self.0 + rhs.0)
    }
}

impl Sub for Money {
    type Output = Money;
    fn sub(self, rhs: Money) -> Money {
        Money(self.0 - rhs.0)
    }
}

impl AddAssign for Money {
    fn add_assign(&mut self, rhs: Money) {
        self.0 += rhs.0;
    }
}

impl SubAssign for Money {
    fn sub_assign(&mut self, rhs: Money) {
        self.0 -= rhs.0;
    }
}

impl std::iter::Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Money {
        iter.fold(Money::ZERO, Add::add)
    }
}

impl Serialize for Money {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(self.as_f64())
    }
}

impl<'de> Deserialize<'de> for Money {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let amount = f64::deserialize(deserializer)?;
        Money::from_f64(amount).ok_or_else(|| {
            serde::de::Error::custom(format!(
                "amount {amount} is not a finite number within {}",
                Money::MAX
            ))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cents_arithmetic_is_exact() {
        let amount = |a: f64| Money::from_f64(a).unwrap();
        let mut balance = amount(10_000.0);
        balance -= amount(2.5);
        balance += amount(4.2);
        assert_eq!(balance, Money::from_cents(1_000_170));
        assert_eq!(balance.to_string(), "10001.70");
    }

    #[test]
    fn display_negative() {
        assert_eq!(Money::from_cents(-5).to_string(), "-0.05");
        assert_eq!(Money::from_cents(-1234).to_string(), "-12.34");
    }

    #[test]
    fn deserializes_from_decimal_number() {
        let m: Money = serde_json::from_str("0.07").unwrap();
        assert_eq!(m.cents(), 7);
    }

    #[test]
    fn rejects_amounts_past_the_limit() {
        assert!(serde_json::from_str::<Money>("1e17").is_err());
        assert!(serde_json::from_str::<Money>("-1e17").is_err());
        assert!(Money::from_f64(f64::NAN).is_none());
        assert!(Money::from_f64(f64::INFINITY).is_none());
        assert_eq!(Money::from_f64(2.5), Some(Money::from_cents(250)));
    }

    #[test]
    fn checked_ops_stop_at_the_limit() {
        assert_eq!(Money::MAX.checked_add(Money::from_cents(1)), None);
        assert_eq!(Money::MAX.checked_sub(Money::MAX), Some(Money::ZERO));
        assert_eq!(Money::ZERO.checked_sub(Money::MAX), Some(Money::from_cents(-Money::MAX.cents())));
        assert_eq!(
            Money::from_cents(-Money::MAX.cents()).checked_sub(Money::from_cents(1)),
            None
        );
    }
}
