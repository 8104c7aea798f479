//! [`Query`] collection related to [`Property`]s.

use common::operations::By;

use crate::domain::{property, user, Property};
#[cfg(doc)]
use crate::{domain::Unit, Query};

use super::DatabaseQuery;

/// Queries a [`Property`] by its [`property::Id`].
pub type ById = DatabaseQuery<By<Option<Property>, property::Id>>;

/// Queries all the [`Property`]s owned by a landlord [`User`].
///
/// [`User`]: crate::domain::User
pub type List = DatabaseQuery<By<Vec<Property>, user::Id>>;

/// Queries the number of [`Unit`]s of a [`Property`].
pub type TotalUnits = DatabaseQuery<By<property::TotalUnits, property::Id>>;
