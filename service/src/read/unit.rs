//! [`Unit`]-related read definitions.

use derive_more::{Deref, Display, From, Into};

#[cfg(doc)]
use crate::domain::{Unit, User};

/// Indicator whether a [`Unit`] is occupied.
#[derive(Clone, Copy, Debug, Deref, Eq, Hash, PartialEq)]
pub struct IsOccupied(pub bool);

impl PartialEq<bool> for IsOccupied {
    fn eq(&self, other: &bool) -> bool {
        self.0 == *other
    }
}

/// Number of [`Unit`]s in all the properties of a landlord [`User`].
#[derive(
    Clone, Copy, Debug, Default, Display, Eq, From, Hash, Into, PartialEq,
)]
pub struct OwnedCount(u32);
