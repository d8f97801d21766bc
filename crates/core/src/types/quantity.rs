//! Cart line quantity.

use core::fmt;
use core::num::NonZeroU32;

use serde::{Deserialize, Serialize};

/// Errors that can occur when constructing a [`Quantity`].
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuantityError {
    /// Quantities start at one; zero or negative requests are rejected.
    #[error("quantity must be at least 1 (got {0})")]
    BelowMinimum(i64),
    /// The requested quantity does not fit the line counter.
    #[error("quantity {0} is too large")]
    TooLarge(i64),
}

/// Number of units on a cart line. Always at least one.
///
/// Setting a line to zero is not an update; callers remove the line instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "u32")]
pub struct Quantity(NonZeroU32);

impl Quantity {
    /// A single unit.
    pub const ONE: Self = Self(NonZeroU32::MIN);

    /// Create a quantity from a signed count, as entered by a user.
    ///
    /// # Errors
    ///
    /// Returns [`QuantityError::BelowMinimum`] for values below 1 and
    /// [`QuantityError::TooLarge`] for values above `u32::MAX`.
    pub fn new(value: i64) -> Result<Self, QuantityError> {
        let raw = u32::try_from(value).map_err(|_| {
            if value < 1 {
                QuantityError::BelowMinimum(value)
            } else {
                QuantityError::TooLarge(value)
            }
        })?;
        NonZeroU32::new(raw)
            .map(Self)
            .ok_or(QuantityError::BelowMinimum(value))
    }

    /// The quantity as a plain integer.
    #[must_use]
    pub const fn get(self) -> u32 {
        self.0.get()
    }

    /// Add two quantities, saturating at `u32::MAX`.
    #[must_use]
    pub const fn saturating_add(self, other: Self) -> Self {
        Self(self.0.saturating_add(other.0.get()))
    }
}

impl Default for Quantity {
    fn default() -> Self {
        Self::ONE
    }
}

impl TryFrom<i64> for Quantity {
    type Error = QuantityError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Quantity> for u32 {
    fn from(quantity: Quantity) -> Self {
        quantity.get()
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
