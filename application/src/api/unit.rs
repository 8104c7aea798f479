//! [`Unit`]-related definitions.

use std::collections::HashMap;

use common::{DateTime, Money};
use derive_more::{AsRef, Display, From, Into};
use juniper::{graphql_object, GraphQLEnum, GraphQLInputObject, GraphQLScalar};
use service::{domain, query, Query as _};
use uuid::Uuid;

use crate::{
    api::{self, scalar},
    AsError, Context, Error,
};

/// A rentable unit of a `Property`.
#[derive(Clone, Debug, From)]
pub struct Unit(domain::Unit);

/// A rentable unit of a `Property`.
#[graphql_object(context = Context)]
impl Unit {
    /// Unique identifier of this `Unit`.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "Unit.id",
            otel.name = api::Query::SPAN_NAME,
        ),
    )]
    pub fn id(&self) -> Id {
        self.0.id.into()
    }

    /// `Property` this `Unit` belongs to.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "Unit.property",
            otel.name = api::Query::SPAN_NAME,
            unit.id = %self.0.id,
        ),
    )]
    pub async fn property(
        &self,
        ctx: &Context,
    ) -> Result<api::Property, Error> {
        ctx.service()
            .execute(query::property::ById::by(self.0.property_id))
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())?
            .ok_or_else(|| api::query::PropertyError::NotExists.into())
            .map_err(ctx.error())
            .map(Into::into)
    }

    /// Label of this `Unit` (e.g. "EG links").
    pub fn label(&self) -> Label {
        self.0.label.clone().into()
    }

    /// Floor of this `Unit`, negative for basements.
    pub fn floor(&self) -> Option<i32> {
        self.0.floor.map(i32::from)
    }

    /// Living area of this `Unit` in square meters.
    pub fn area(&self) -> Option<Area> {
        self.0.area.map(Into::into)
    }

    /// Monthly rent of this `Unit`.
    pub fn rent(&self) -> Option<Money> {
        self.0.rent
    }

    /// Occupancy status of this `Unit`.
    pub fn status(&self) -> Status {
        self.0.status.into()
    }

    /// Tenant currently living in this `Unit`.
    pub fn current_tenant(&self) -> Option<api::User> {
        self.0.current_tenant.map(|id| {
            #[expect(
                unsafe_code,
                reason = "`Unit` loaded from repository guarantees tenant \
                          existence"
            )]
            unsafe {
                api::User::new_unchecked(id)
            }
        })
    }

    /// Indicator whether an invited tenant is yet to move into this `Unit`.
    pub fn has_pending_tenant(&self) -> bool {
        self.0.pending_tenant.is_some()
    }

    /// `DateTime` when the lease of the current tenant started.
    pub fn lease_start(&self) -> Option<DateTime> {
        self.0.lease_start.map(|dt| dt.coerce())
    }

    /// `DateTime` when this `Unit` was created.
    pub fn created_at(&self) -> DateTime {
        self.0.created_at.coerce()
    }
}

/// Unique identifier of a `Unit`.
#[derive(
    Clone, Copy, Debug, Display, Eq, From, GraphQLScalar, Into, PartialEq,
)]
#[from(domain::unit::Id)]
#[into(domain::unit::Id)]
#[graphql(name = "UnitId", transparent)]
pub struct Id(Uuid);

/// Label of a `Unit`.
#[derive(AsRef, Clone, Debug, Display, From, GraphQLScalar, Into)]
#[graphql(
    name = "UnitLabel",
    with = scalar::Via::<domain::unit::Label>,
)]
pub struct Label(domain::unit::Label);

/// Living area of a `Unit` in square meters.
#[derive(AsRef, Clone, Copy, Debug, Display, From, GraphQLScalar, Into)]
#[graphql(
    name = "UnitArea",
    with = scalar::Via::<domain::unit::Area>,
)]
pub struct Area(domain::unit::Area);

/// Occupancy status of a `Unit`.
#[derive(Clone, Copy, Debug, GraphQLEnum)]
#[graphql(name = "UnitStatus")]
pub enum Status {
    /// Nobody lives in the `Unit`.
    Vacant,

    /// A tenant lives in the `Unit`.
    Occupied,

    /// The `Unit` is under maintenance.
    Maintenance,
}

impl From<domain::unit::Status> for Status {
    fn from(status: domain::unit::Status) -> Self {
        use domain::unit::Status as S;
        match status {
            S::Vacant => Self::Vacant,
            S::Occupied => Self::Occupied,
            S::Maintenance => Self::Maintenance,
        }
    }
}

/// Single cell of an imported `Unit` row.
#[derive(Clone, Debug, GraphQLInputObject)]
#[graphql(name = "UnitImportCell")]
pub struct ImportCell {
    /// Column name (e.g. `label`, `floor`, `area`, `rent`, `status`).
    pub column: String,

    /// Raw cell value.
    pub value: String,
}

/// Converts the provided rows of [`ImportCell`]s into rows keyed by columns.
///
/// Later cells win over earlier ones with the same column.
#[must_use]
pub fn import_rows(rows: Vec<Vec<ImportCell>>) -> Vec<HashMap<String, String>> {
    rows.into_iter()
        .map(|row| {
            row.into_iter()
                .map(|ImportCell { column, value }| (column, value))
                .collect()
        })
        .collect()
}
