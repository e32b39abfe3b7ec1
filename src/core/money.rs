use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Mul, Neg, Sub, SubAssign};

use serde::{Deserialize, Serialize};

/// A monetary amount in whole cents.
///
/// Buy-in totals are kept in integer cents so that `total_spent` is always an
/// exact multiple of the buy-in price. Chip valuation happens in `f64`
/// dollars, see [`crate::settlement`].
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Cents(i64);

impl Cents {
    pub const ZERO: Cents = Cents(0);

    pub const fn new(cents: i64) -> Self {
        Self(cents)
    }

    /// Convert a dollar amount, rounding to the nearest cent.
    pub fn from_dollars(dollars: f64) -> Self {
        Self((dollars * 100.0).round() as i64)
    }

    pub const fn get(self) -> i64 {
        self.0
    }

    pub fn as_dollars(self) -> f64 {
        self.0 as f64 / 100.0
    }

    pub const fn is_positive(self) -> bool {
        self.0 > 0
    }

    pub fn checked_add(self, rhs: Cents) -> Option<Cents> {
        self.0.checked_add(rhs.0).map(Cents)
    }

    /// `None` when the product doesn't fit in an `i64`.
    pub fn checked_mul(self, rhs: u64) -> Option<Cents> {
        let rhs = i64::try_from(rhs).ok()?;
        self.0.checked_mul(rhs).map(Cents)
    }
}

impl Add for Cents {
    type Output = Cents;

    fn add(self, rhs: Cents) -> Cents {
        Cents(self.0 + rhs.0)
    }
}

impl AddAssign for Cents {
    fn add_assign(&mut self, rhs: Cents) {
        self.0 += rhs.0;
    }
}

impl Sub for Cents {
    type Output = Cents;

    fn sub(self, rhs: Cents) -> Cents {
        Cents(self.0 - rhs.0)
    }
}

impl SubAssign for Cents {
    fn sub_assign(&mut self, rhs: Cents) {
        self.0 -= rhs.0;
    }
}

impl Neg for Cents {
    type Output = Cents;

    fn neg(self) -> Cents {
        Cents(-self.0)
    }
}

impl Mul<u64> for Cents {
    type Output = Cents;

    fn mul(self, rhs: u64) -> Cents {
        Cents(self.0 * rhs as i64)
    }
}

impl Sum for Cents {
    fn sum<I: Iterator<Item = Cents>>(iter: I) -> Cents {
        iter.fold(Cents::ZERO, |acc, c| acc + c)
    }
}

impl fmt::Display for Cents {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        write!(f, "{}${}.{:02}", sign, abs / 100, abs % 100)
    }
}

/// Format a floating point dollar amount the way the settlement report does,
/// rounded to cents.
pub fn format_dollars(amount: f64) -> String {
    Cents::from_dollars(amount).to_string()
}

/// Like [`format_dollars`] but always carries a sign, `+$10.00` / `-$4.50`.
pub fn format_signed_dollars(amount: f64) -> String {
    let cents = Cents::from_dollars(amount);
    if cents.get() >= 0 {
        format!("+{}", cents)
    } else {
        cents.to_string()
    }
}

/// Serde adapter writing [`Cents`] as a decimal dollar amount, so stored and
/// hand written configuration reads `"dollars_per_buyin": 20.0`.
pub mod as_dollars {
    use serde::{Deserialize, Deserializer, Serializer};

    use super::Cents;

    pub fn serialize<S: Serializer>(value: &Cents, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(value.as_dollars())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Cents, D::Error> {
        let dollars = f64::deserialize(deserializer)?;
        Ok(Cents::from_dollars(dollars))
    }
}
