//! Money amounts.

use serde::{Deserialize, Serialize};

/// Money amount in minor currency units, kept integral to avoid rounding.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Money(i64);

impl Money {
    /// Creates an amount from minor units.
    pub const fn new(amount: i64) -> Self {
        Self(amount)
    }

    /// Returns zero money.
    pub const fn zero() -> Self {
        Self(0)
    }

    /// Returns the amount in minor units.
    pub const fn amount(&self) -> i64 {
        self.0
    }

    /// Returns true if the amount is zero.
    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Multiplies by a quantity.
    pub fn multiply(&self, quantity: u32) -> Money {
        Money(self.0 * i64::from(quantity))
    }
}

impl std::fmt::Display for Money {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::ops::Add for Money {
    type Output = Money;

    fn add(self, rhs: Self) -> Self::Output {
        Money(self.0 + rhs.0)
    }
}

impl std::ops::AddAssign for Money {
    fn add_assign(&mut self, rhs: Self) {
        self.0 += rhs.0;
    }
}

impl std::iter::Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), |acc, m| acc + m)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn multiply_by_quantity() {
        assert_eq!(Money::new(150).multiply(3), Money::new(450));
        assert_eq!(Money::new(150).multiply(0), Money::zero());
    }

    #[test]
    fn sum_of_amounts() {
        let total: Money = [Money::new(100), Money::new(250), Money::new(5)]
            .into_iter()
            .sum();
        assert_eq!(total.amount(), 355);
    }

    #[test]
    fn add_assign() {
        let mut money = Money::new(100);
        money += Money::new(50);
        assert_eq!(money.amount(), 150);
    }

    #[test]
    fn serializes_as_integer() {
        assert_eq!(serde_json::to_string(&Money::new(1200)).unwrap(), "1200");
    }
}
