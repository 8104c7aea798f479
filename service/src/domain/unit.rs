//! [`Unit`] definitions.

#[cfg(doc)]
use common::DateTime;
use common::{
    define_kind,
    unit::{Creation, LeaseStart},
    DateTimeOf, Money,
};
use derive_more::{AsRef, Display, From, FromStr, Into};
#[cfg(feature = "postgres")]
use postgres_types::{FromSql, ToSql};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[cfg(doc)]
use crate::domain::{Property, Tenant, User};
use crate::domain::{property, tenant, user};

/// Rentable apartment inside a [`Property`].
///
/// `current_tenant` and `pending_tenant` are never set at the same time, so
/// the mutating methods are the only intended way of changing them.
#[derive(Clone, Debug, PartialEq)]
pub struct Unit {
    /// ID of this [`Unit`].
    pub id: Id,

    /// ID of the [`Property`] this [`Unit`] belongs to.
    pub property_id: property::Id,

    /// [`Label`] of this [`Unit`] (e.g. "WE 3.2").
    pub label: Label,

    /// [`Floor`] of this [`Unit`].
    pub floor: Option<Floor>,

    /// [`Area`] of this [`Unit`].
    pub area: Option<Area>,

    /// Monthly rent of this [`Unit`].
    pub rent: Option<Money>,

    /// [`Status`] of this [`Unit`].
    pub status: Status,

    /// ID of the tenant [`User`] living in this [`Unit`].
    pub current_tenant: Option<user::Id>,

    /// ID of the [`Tenant`] invitation pending for this [`Unit`].
    pub pending_tenant: Option<tenant::Id>,

    /// [`DateTime`] when the lease of this [`Unit`] starts.
    pub lease_start: Option<LeaseStartDateTime>,

    /// [`DateTime`] when this [`Unit`] was created.
    pub created_at: CreationDateTime,
}

impl Unit {
    /// Indicates whether this [`Unit`] is occupied.
    ///
    /// Both the [`Status`] and the `current_tenant` are checked, so a drift
    /// between them never makes an occupied [`Unit`] look vacant.
    #[must_use]
    pub fn is_occupied(&self) -> bool {
        self.status == Status::Occupied || self.current_tenant.is_some()
    }

    /// Binds the provided pending [`Tenant`] invitation to this [`Unit`].
    ///
    /// Returns the ID of the superseded invitation, if any. A superseded
    /// invitation reverts this [`Unit`] to [`Status::Vacant`] first.
    pub fn invite(
        &mut self,
        tenant_id: tenant::Id,
        lease_start: LeaseStartDateTime,
    ) -> Option<tenant::Id> {
        let superseded = self.pending_tenant.filter(|id| *id != tenant_id);
        if superseded.is_some() {
            self.clear_pending();
        }
        self.pending_tenant = Some(tenant_id);
        self.lease_start = Some(lease_start);
        superseded
    }

    /// Drops the pending [`Tenant`] invitation of this [`Unit`] and reverts
    /// it to [`Status::Vacant`].
    pub fn clear_pending(&mut self) {
        self.pending_tenant = None;
        self.status = Status::Vacant;
    }

    /// Moves the provided tenant [`User`] into this [`Unit`], resolving any
    /// pending invitation.
    ///
    /// Returns the ID of the evicted previous tenant [`User`], if any.
    pub fn occupy(&mut self, user_id: user::Id) -> Option<user::Id> {
        let evicted = self.current_tenant.filter(|id| *id != user_id);
        self.current_tenant = Some(user_id);
        self.pending_tenant = None;
        self.status = Status::Occupied;
        evicted
    }

    /// Moves the current tenant out of this [`Unit`].
    pub fn vacate(&mut self) {
        self.current_tenant = None;
        self.status = Status::Vacant;
    }
}

/// ID of a [`Unit`].
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
    Ord,
    PartialEq,
    PartialOrd,
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

/// Label of a [`Unit`] inside its [`Property`].
#[derive(AsRef, Clone, Debug, Display, Eq, PartialEq)]
#[as_ref(str, String)]
#[cfg_attr(feature = "postgres", derive(FromSql, ToSql), postgres(transparent))]
pub struct Label(String);

impl Label {
    /// Creates a new [`Label`] if the given `label` is valid.
    #[must_use]
    pub fn new(label: impl Into<String>) -> Option<Self> {
        let label = label.into();
        (label.trim() == label && !label.is_empty() && label.len() <= 64)
            .then_some(Self(label))
    }
}

impl FromStr for Label {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s).ok_or("invalid `Label`")
    }
}

/// Floor of a [`Unit`], negative for basements.
pub type Floor = i16;

/// Living area of a [`Unit`] in square meters.
#[derive(Clone, Copy, Debug, Display, Eq, Into, PartialEq)]
#[cfg_attr(feature = "postgres", derive(FromSql, ToSql), postgres(transparent))]
pub struct Area(Decimal);

impl Area {
    /// Creates a new [`Area`] if the given `square_meters` is positive.
    #[must_use]
    pub fn new(square_meters: Decimal) -> Option<Self> {
        (square_meters > Decimal::ZERO).then_some(Self(square_meters))
    }
}

impl FromStr for Area {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim()
            .replace(',', ".")
            .parse::<Decimal>()
            .ok()
            .and_then(Self::new)
            .ok_or("invalid `Area`")
    }
}

define_kind! {
    #[doc = "Occupancy status of a [`Unit`]."]
    #[serialize_all = "lowercase"]
    enum Status {
        #[doc = "Nobody lives in the [`Unit`]."]
        Vacant = 1,

        #[doc = "A tenant lives in the [`Unit`]."]
        Occupied = 2,

        #[doc = "The [`Unit`] is under maintenance and cannot be rented."]
        Maintenance = 3,
    }
}

/// [`DateTime`] when a [`Unit`] was created.
pub type CreationDateTime = DateTimeOf<(Unit, Creation)>;

/// [`DateTime`] when a lease of a [`Unit`] starts.
pub type LeaseStartDateTime = DateTimeOf<(Unit, LeaseStart)>;

#[cfg(test)]
pub(crate) mod spec {
    use common::DateTime;

    use crate::domain::{property, tenant, user};

    use super::{Area, Id, Label, Status, Unit};

    pub(crate) fn vacant(property_id: property::Id) -> Unit {
        Unit {
            id: Id::new(),
            property_id,
            label: Label::new("WE 1").unwrap(),
            floor: Some(1),
            area: None,
            rent: None,
            status: Status::Vacant,
            current_tenant: None,
            pending_tenant: None,
            lease_start: None,
            created_at: DateTime::now().coerce(),
        }
    }

    #[test]
    fn occupied_by_status_or_tenant() {
        let mut unit = vacant(property::Id::new());
        assert!(!unit.is_occupied());

        unit.status = Status::Occupied;
        assert!(unit.is_occupied(), "status alone");

        unit.status = Status::Vacant;
        unit.current_tenant = Some(user::Id::new());
        assert!(unit.is_occupied(), "tenant alone");

        unit.status = Status::Maintenance;
        assert!(unit.is_occupied(), "tenant under maintenance");
    }

    #[test]
    fn reinvite_supersedes_pending() {
        let mut unit = vacant(property::Id::new());
        let (first, second) = (tenant::Id::new(), tenant::Id::new());

        assert_eq!(unit.invite(first, DateTime::now().coerce()), None);
        assert_eq!(unit.pending_tenant, Some(first));
        assert_eq!(unit.status, Status::Vacant);

        unit.status = Status::Maintenance;
        assert_eq!(unit.invite(second, DateTime::now().coerce()), Some(first));
        assert_eq!(unit.pending_tenant, Some(second));
        assert_eq!(unit.status, Status::Vacant);

        assert_eq!(unit.invite(second, DateTime::now().coerce()), None);
    }

    #[test]
    fn occupy_resolves_pending_and_evicts() {
        let mut unit = vacant(property::Id::new());
        let (old, new) = (user::Id::new(), user::Id::new());
        _ = unit.invite(tenant::Id::new(), DateTime::now().coerce());

        assert_eq!(unit.occupy(old), None);
        assert_eq!(unit.pending_tenant, None);
        assert_eq!(unit.status, Status::Occupied);
        assert_eq!(unit.occupy(new), Some(old));
        assert_eq!(unit.current_tenant, Some(new));

        unit.vacate();
        assert!(!unit.is_occupied());
    }

    #[test]
    fn parses_area() {
        assert_eq!("54,5".parse::<Area>().unwrap().to_string(), "54.5");
        assert!("0".parse::<Area>().is_err());
        assert!("abc".parse::<Area>().is_err());
    }
}
