//! [`Property`] definitions.

#[cfg(doc)]
use common::DateTime;
use common::{unit::Creation, DateTimeOf};
use derive_more::{AsRef, Display, From, FromStr, Into};
#[cfg(feature = "postgres")]
use postgres_types::{FromSql, ToSql};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::user;
#[cfg(doc)]
use crate::domain::{Unit, User};

/// Building owned by a landlord [`User`] and consisting of [`Unit`]s.
///
/// The number of [`Unit`]s is never stored, see [`TotalUnits`].
#[derive(Clone, Debug)]
pub struct Property {
    /// ID of this [`Property`].
    pub id: Id,

    /// ID of the landlord [`User`] owning this [`Property`].
    pub owner_id: user::Id,

    /// [`Name`] of this [`Property`].
    pub name: Name,

    /// [`Address`] of this [`Property`].
    pub address: Address,

    /// [`DateTime`] when this [`Property`] was created.
    pub created_at: CreationDateTime,
}

/// ID of a [`Property`].
#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    Deserialize,
    Display,
    Eq,
    From,
    FromStr,
    Hash,
    Into,
    PartialEq,
    Serialize,
)]
#[cfg_attr(feature = "postgres", derive(ToSql, FromSql), postgres(transparent))]
pub struct Id(Uuid);

impl Id {
    /// Creates a new random [`Id`].
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

/// Postal address of a [`Property`].
#[derive(Clone, Debug, Display, Eq, PartialEq)]
#[display("{street}, {zip_code} {city}")]
pub struct Address {
    /// [`Street`] with the house number.
    pub street: Street,

    /// [`ZipCode`] of the [`City`].
    pub zip_code: ZipCode,

    /// [`City`] of this [`Address`].
    pub city: City,
}

/// Defines a trimmed non-empty bounded string newtype.
macro_rules! define_text {
    ($(#[doc = $doc:literal] $name:ident: $max:literal),* $(,)?) => {$(
        #[doc = $doc]
        #[derive(AsRef, Clone, Debug, Display, Eq, PartialEq)]
        #[as_ref(str, String)]
        #[cfg_attr(
            feature = "postgres",
            derive(FromSql, ToSql),
            postgres(transparent),
        )]
        pub struct $name(String);

        impl $name {
            #[doc = concat!("Creates a new [`", stringify!($name), "`].")]
            ///
            /// # Safety
            ///
            /// The caller must ensure that the given `value` matches the
            /// format.
            #[expect(unsafe_code, reason = "bypass")]
            #[must_use]
            pub unsafe fn new_unchecked(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            #[doc = concat!(
                "Creates a new [`", stringify!($name), "`] if the given ",
                "`value` is valid.",
            )]
            #[must_use]
            pub fn new(value: impl Into<String>) -> Option<Self> {
                let value = value.into();
                (value.trim() == value
                    && !value.is_empty()
                    && value.len() <= $max)
                    .then_some(Self(value))
            }
        }

        impl FromStr for $name {
            type Err = &'static str;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::new(s).ok_or(concat!("invalid `", stringify!($name), "`"))
            }
        }
    )*};
}

define_text! {
    #[doc = "Name of a [`Property`]."]
    Name: 256,

    #[doc = "Street (with the house number) of an [`Address`]."]
    Street: 256,

    #[doc = "Zip code of an [`Address`]."]
    ZipCode: 16,

    #[doc = "City of an [`Address`]."]
    City: 128,
}

/// Number of [`Unit`]s referencing a [`Property`].
///
/// Always counted from the stored [`Unit`]s, so it cannot drift.
#[derive(Clone, Copy, Debug, Default, Display, Eq, From, Into, PartialEq)]
pub struct TotalUnits(u32);

/// [`DateTime`] when a [`Property`] was created.
pub type CreationDateTime = DateTimeOf<(Property, Creation)>;
