//! Exact decimal newtypes for quotes and quantities.
//!
//! Ladder math stays at full `rust_decimal` precision; rounding to the
//! exchange's 8 places happens once, when a request is built.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, Div, Mul, Sub};
use std::str::FromStr;

/// Decimal places applied to prices and volumes when an order is built.
pub const ORDER_DECIMALS: u32 = 8;

/// Quote-asset price of one unit of the base asset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Price(pub Decimal);

/// Base-asset quantity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Size(pub Decimal);

/// Accessors, parsing and arithmetic shared by both newtypes.
macro_rules! decimal_newtype {
    ($name:ident) => {
        impl $name {
            pub const ZERO: Self = Self(Decimal::ZERO);

            #[inline]
            pub fn new(value: Decimal) -> Self {
                Self(value)
            }

            #[inline]
            pub fn inner(&self) -> Decimal {
                self.0
            }

            #[inline]
            pub fn is_zero(&self) -> bool {
                self.0.is_zero()
            }

            /// Strictly greater than zero.
            #[inline]
            pub fn is_positive(&self) -> bool {
                self.0 > Decimal::ZERO
            }

            /// Banker's rounding to [`ORDER_DECIMALS`], trailing zeros dropped.
            #[inline]
            pub fn round_for_order(&self) -> Self {
                Self(self.0.round_dp(ORDER_DECIMALS).normalize())
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                fmt::Display::fmt(&self.0, f)
            }
        }

        impl FromStr for $name {
            type Err = rust_decimal::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Decimal::from_str(s).map(Self)
            }
        }

        impl From<Decimal> for $name {
            fn from(value: Decimal) -> Self {
                Self(value)
            }
        }

        impl Add for $name {
            type Output = Self;
            fn add(self, rhs: Self) -> Self {
                Self(self.0 + rhs.0)
            }
        }

        impl Sub for $name {
            type Output = Self;
            fn sub(self, rhs: Self) -> Self {
                Self(self.0 - rhs.0)
            }
        }

        impl Mul<Decimal> for $name {
            type Output = Self;
            fn mul(self, factor: Decimal) -> Self {
                Self(self.0 * factor)
            }
        }
    };
}

decimal_newtype!(Price);
decimal_newtype!(Size);

impl Price {
    /// Halfway between `self` and `other`.
    #[inline]
    pub fn midpoint(&self, other: Price) -> Self {
        Self((self.0 + other.0) / Decimal::TWO)
    }
}

impl Div<Decimal> for Price {
    type Output = Self;
    fn div(self, divisor: Decimal) -> Self {
        Self(self.0 / divisor)
    }
}

impl Size {
    /// Quote-asset value of this quantity at `price`.
    #[inline]
    pub fn notional(&self, price: Price) -> Decimal {
        self.0 * price.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_round_for_order_truncates_to_eight_places() {
        let price = Price::new(dec!(98.1234567891));
        assert_eq!(price.round_for_order().inner(), dec!(98.12345679));
    }

    #[test]
    fn test_round_for_order_is_bankers() {
        // Ties at the 9th place go to the even digit.
        let size = Size::new(dec!(0.000000025));
        assert_eq!(size.round_for_order().inner(), dec!(0.00000002));
    }

    #[test]
    fn test_round_for_order_drops_trailing_zeros() {
        let price = Price::new(dec!(98.62500000));
        assert_eq!(price.round_for_order().to_string(), "98.625");
    }

    #[test]
    fn test_midpoint_and_notional() {
        let mid = Price::new(dec!(100)).midpoint(Price::new(dec!(102)));
        assert_eq!(mid.inner(), dec!(101));
        assert_eq!(Size::new(dec!(5)).notional(Price::new(dec!(10))), dec!(50));
    }

    #[test]
    fn test_is_positive() {
        assert!(Price::new(dec!(0.00000001)).is_positive());
        assert!(!Price::ZERO.is_positive());
        assert!(!Size::new(dec!(-1)).is_positive());
    }

    #[test]
    fn test_parse_and_arithmetic() {
        let step: Price = "0.5".parse().unwrap();
        assert_eq!(step + step, Price::new(dec!(1)));
        assert_eq!((step * dec!(4)) / dec!(2), Price::new(dec!(1)));
        assert!("abc".parse::<Size>().is_err());
    }
}
