//! [`Property`]-related definitions.

use common::DateTime;
use derive_more::{AsRef, Display, From, Into};
use juniper::{graphql_object, GraphQLInputObject, GraphQLScalar};
use service::{domain, query, Query as _};
use uuid::Uuid;

use crate::{
    api::{self, scalar},
    AsError, Context, Error,
};

/// A building owned by a landlord.
#[derive(Clone, Debug, From)]
pub struct Property(domain::Property);

/// A building owned by a landlord.
#[graphql_object(context = Context)]
impl Property {
    /// Unique identifier of this `Property`.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "Property.id",
            otel.name = api::Query::SPAN_NAME,
        ),
    )]
    pub fn id(&self) -> Id {
        self.0.id.into()
    }

    /// Name of this `Property`.
    pub fn name(&self) -> Name {
        self.0.name.clone().into()
    }

    /// Street with the house number of this `Property`.
    pub fn street(&self) -> Street {
        self.0.address.street.clone().into()
    }

    /// ZIP code of this `Property`.
    pub fn zip_code(&self) -> ZipCode {
        self.0.address.zip_code.clone().into()
    }

    /// City of this `Property`.
    pub fn city(&self) -> City {
        self.0.address.city.clone().into()
    }

    /// Landlord owning this `Property`.
    pub fn owner(&self) -> api::User {
        #[expect(
            unsafe_code,
            reason = "`Property` loaded from repository guarantees owner \
                      existence"
        )]
        unsafe {
            api::User::new_unchecked(self.0.owner_id)
        }
    }

    /// `Unit`s of this `Property`, ordered by their labels.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "Property.units",
            otel.name = api::Query::SPAN_NAME,
            property.id = %self.0.id,
        ),
    )]
    pub async fn units(&self, ctx: &Context) -> Result<Vec<api::Unit>, Error> {
        ctx.service()
            .execute(query::unit::List::by(self.0.id))
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())
            .map(|units| units.into_iter().map(Into::into).collect())
    }

    /// Number of `Unit`s in this `Property`.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "Property.totalUnits",
            otel.name = api::Query::SPAN_NAME,
            property.id = %self.0.id,
        ),
    )]
    pub async fn total_units(&self, ctx: &Context) -> Result<i32, Error> {
        let total = ctx
            .service()
            .execute(query::property::TotalUnits::by(self.0.id))
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())?;
        i32::try_from(u32::from(total))
            .map_err(AsError::into_error)
            .map_err(ctx.error())
    }

    /// `DateTime` when this `Property` was created.
    pub fn created_at(&self) -> DateTime {
        self.0.created_at.coerce()
    }
}

/// Unique identifier of a `Property`.
#[derive(
    Clone, Copy, Debug, Display, Eq, From, GraphQLScalar, Into, PartialEq,
)]
#[from(domain::property::Id)]
#[into(domain::property::Id)]
#[graphql(name = "PropertyId", transparent)]
pub struct Id(Uuid);

/// Name of a `Property`.
#[derive(AsRef, Clone, Debug, Display, From, GraphQLScalar, Into)]
#[graphql(
    name = "PropertyName",
    with = scalar::Via::<domain::property::Name>,
)]
pub struct Name(domain::property::Name);

/// Street with the house number of a `Property`.
#[derive(AsRef, Clone, Debug, Display, From, GraphQLScalar, Into)]
#[graphql(
    name = "PropertyStreet",
    with = scalar::Via::<domain::property::Street>,
)]
pub struct Street(domain::property::Street);

/// ZIP code of a `Property`.
#[derive(AsRef, Clone, Debug, Display, From, GraphQLScalar, Into)]
#[graphql(
    name = "PropertyZipCode",
    with = scalar::Via::<domain::property::ZipCode>,
)]
pub struct ZipCode(domain::property::ZipCode);

/// City of a `Property`.
#[derive(AsRef, Clone, Debug, Display, From, GraphQLScalar, Into)]
#[graphql(
    name = "PropertyCity",
    with = scalar::Via::<domain::property::City>,
)]
pub struct City(domain::property::City);

/// Address of a new `Property`.
#[derive(Clone, Debug, GraphQLInputObject)]
#[graphql(name = "PropertyAddressInput")]
pub struct AddressInput {
    /// Street with the house number.
    pub street: Street,

    /// ZIP code.
    pub zip_code: ZipCode,

    /// City.
    pub city: City,
}

impl From<AddressInput> for domain::property::Address {
    fn from(input: AddressInput) -> Self {
        let AddressInput {
            street,
            zip_code,
            city,
        } = input;
        Self {
            street: street.into(),
            zip_code: zip_code.into(),
            city: city.into(),
        }
    }
}
