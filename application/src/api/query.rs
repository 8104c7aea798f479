//! GraphQL [`Query`]s definitions.

use juniper::graphql_object;
use service::{domain, query, Query as _};

use crate::{api, define_error, AsError, Context, Error};

/// Root of all GraphQL queries.
#[derive(Clone, Copy, Debug)]
pub struct Query;

impl Query {
    /// Name of the [`tracing::Span`] for the queries.
    pub(crate) const SPAN_NAME: &'static str = "GraphQL query";
}

#[graphql_object(context = Context)]
impl Query {
    /// Returns the currently authenticated `User`.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "myUser",
            otel.name = Self::SPAN_NAME,
        ),
    )]
    pub async fn my_user(ctx: &Context) -> Result<api::User, Error> {
        let my_id = ctx.current_session().await?.user_id;
        ctx.service()
            .execute(query::user::ById::by(my_id.into()))
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())?
            .ok_or_else(|| UserError::NotExists.into())
            .map_err(ctx.error())
            .map(Into::into)
    }

    /// Returns the `User` with the specified ID.
    ///
    /// # Errors
    ///
    /// Possible error codes:
    /// - `USER_NOT_EXISTS` - the `User` with the specified ID does not exist.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "user",
            id = %id,
            otel.name = Self::SPAN_NAME,
        ),
    )]
    pub async fn user(
        id: api::user::Id,
        ctx: &Context,
    ) -> Result<api::User, Error> {
        _ = ctx.current_session().await?;
        ctx.service()
            .execute(query::user::ById::by(id.into()))
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())?
            .ok_or_else(|| UserError::NotExists.into())
            .map_err(ctx.error())
            .map(Into::into)
    }

    /// Lists the `Property`s owned by the current `User`.
    ///
    /// # Errors
    ///
    /// Possible error codes:
    /// - `NOT_LANDLORD` - the current `User` is not a landlord.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "myProperties",
            otel.name = Self::SPAN_NAME,
        ),
    )]
    pub async fn my_properties(
        ctx: &Context,
    ) -> Result<Vec<api::Property>, Error> {
        let session = ctx.current_session().await?;
        if session.role != domain::user::Role::Landlord {
            return Err(api::PrivilegeError::Landlord.into())
                .map_err(ctx.error());
        }

        ctx.service()
            .execute(query::property::List::by(session.user_id.into()))
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())
            .map(|ps| ps.into_iter().map(Into::into).collect())
    }

    /// Returns the `Property` with the specified ID owned by the current
    /// `User`.
    ///
    /// # Errors
    ///
    /// Possible error codes:
    /// - `PROPERTY_NOT_EXISTS` - the `Property` with the specified ID does
    ///                           not exist or is owned by another `User`.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "property",
            id = %id,
            otel.name = Self::SPAN_NAME,
        ),
    )]
    pub async fn property(
        id: api::property::Id,
        ctx: &Context,
    ) -> Result<api::Property, Error> {
        let my_id: domain::user::Id =
            ctx.current_session().await?.user_id.into();
        ctx.service()
            .execute(query::property::ById::by(id.into()))
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())?
            .filter(|p| p.owner_id == my_id)
            .ok_or_else(|| PropertyError::NotExists.into())
            .map_err(ctx.error())
            .map(Into::into)
    }

    /// Returns the `Unit` with the specified ID, if the current `User` owns
    /// or lives in it.
    ///
    /// # Errors
    ///
    /// Possible error codes:
    /// - `UNIT_NOT_EXISTS` - the `Unit` with the specified ID does not exist
    ///                       or is not related to the current `User`.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "unit",
            id = %id,
            otel.name = Self::SPAN_NAME,
        ),
    )]
    pub async fn unit(
        id: api::unit::Id,
        ctx: &Context,
    ) -> Result<api::Unit, Error> {
        let my_id: domain::user::Id =
            ctx.current_session().await?.user_id.into();
        let unit = ctx
            .service()
            .execute(query::unit::ById::by(id.into()))
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())?
            .ok_or_else(|| UnitError::NotExists.into())
            .map_err(ctx.error())?;
        if unit.current_tenant == Some(my_id) {
            return Ok(unit.into());
        }

        let is_owner = ctx
            .service()
            .execute(query::property::ById::by(unit.property_id))
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())?
            .is_some_and(|p| p.owner_id == my_id);
        if is_owner {
            Ok(unit.into())
        } else {
            Err(UnitError::NotExists.into()).map_err(ctx.error())
        }
    }

    /// Indicates whether the `Unit` with the specified ID is occupied,
    /// either by its status or by a current tenant.
    ///
    /// # Errors
    ///
    /// Possible error codes:
    /// - `UNIT_NOT_EXISTS` - the `Unit` with the specified ID does not exist.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "unitIsOccupied",
            id = %id,
            otel.name = Self::SPAN_NAME,
        ),
    )]
    pub async fn unit_is_occupied(
        id: api::unit::Id,
        ctx: &Context,
    ) -> Result<bool, Error> {
        _ = ctx.current_session().await?;
        ctx.service()
            .execute(query::unit::IsOccupied { unit_id: id.into() })
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())
            .map(|occupied| *occupied)
    }

    /// Lists the `Meldung`s visible to the current `User`, newest first.
    ///
    /// Tenants see the `Meldung`s they filed, craftsmen the ones assigned to
    /// them, and landlords the ones filed in their `Property`s.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "meldungen",
            otel.name = Self::SPAN_NAME,
        ),
    )]
    pub async fn meldungen(ctx: &Context) -> Result<Vec<api::Meldung>, Error> {
        let session = ctx.current_session().await?;
        ctx.service()
            .execute(query::meldung::List {
                user_id: session.user_id.into(),
                role: session.role,
            })
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())
            .map(|ms| ms.into_iter().map(Into::into).collect())
    }

    /// Returns the `Meldung` with the specified ID along with its
    /// `Message`s.
    ///
    /// # Errors
    ///
    /// Possible error codes:
    /// - `MELDUNG_NOT_EXISTS` - the `Meldung` with the specified ID does not
    ///                          exist;
    /// - `MELDUNG_FORBIDDEN` - the current `User` has no access to the
    ///                         `Meldung`.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "meldung",
            id = %id,
            otel.name = Self::SPAN_NAME,
        ),
    )]
    pub async fn meldung(
        id: api::meldung::Id,
        ctx: &Context,
    ) -> Result<api::meldung::Thread, Error> {
        let session = ctx.current_session().await?;
        ctx.service()
            .execute(query::meldung::Thread {
                user_id: session.user_id.into(),
                role: session.role,
                meldung_id: id.into(),
            })
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())
            .map(Into::into)
    }

    /// Indicates whether the current `User` may access the `Message`s and
    /// the export of the `Meldung` with the specified ID.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "hasMeldungAccess",
            id = %id,
            otel.name = Self::SPAN_NAME,
        ),
    )]
    pub async fn has_meldung_access(
        id: api::meldung::Id,
        ctx: &Context,
    ) -> Result<bool, Error> {
        let session = ctx.current_session().await?;
        ctx.service()
            .execute(query::meldung::HasAccess {
                user_id: session.user_id.into(),
                role: session.role,
                meldung_id: id.into(),
            })
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())
    }

    /// Lists the `Notification`s of the specified `Property`, newest first.
    ///
    /// # Errors
    ///
    /// Possible error codes:
    /// - `PROPERTY_NOT_EXISTS` - the `Property` with the specified ID does
    ///                           not exist;
    /// - `NOTIFICATIONS_FORBIDDEN` - the current `User` neither owns nor
    ///                               lives in the `Property`.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "notifications",
            otel.name = Self::SPAN_NAME,
            property_id = %property_id,
        ),
    )]
    pub async fn notifications(
        property_id: api::property::Id,
        ctx: &Context,
    ) -> Result<Vec<api::Notification>, Error> {
        let my_id = ctx.current_session().await?.user_id;
        ctx.service()
            .execute(query::notification::ByProperty {
                user_id: my_id.into(),
                property_id: property_id.into(),
            })
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())
            .map(|ns| ns.into_iter().map(Into::into).collect())
    }
}

impl AsError for query::meldung::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        Some(match self {
            Self::Db(e) => return e.try_as_error(),
            Self::MeldungNotExists(_) => MeldungError::NotExists.into(),
            Self::Forbidden(_) => MeldungError::Forbidden.into(),
        })
    }
}

impl AsError for query::notification::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        define_error! {
            enum Error {
                #[code = "NOTIFICATIONS_FORBIDDEN"]
                #[status = FORBIDDEN]
                #[message = "`Notification`s of the `Property` are not \
                             accessible"]
                Forbidden,
            }
        }

        Some(match self {
            Self::Db(e) => return e.try_as_error(),
            Self::PropertyNotExists(_) => PropertyError::NotExists.into(),
            Self::Forbidden(_) => Error::Forbidden.into(),
        })
    }
}

impl AsError for query::unit::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        Some(match self {
            Self::Db(e) => return e.try_as_error(),
            Self::UnitNotExists(_) => UnitError::NotExists.into(),
        })
    }
}

define_error! {
    enum MeldungError {
        #[code = "MELDUNG_NOT_EXISTS"]
        #[status = NOT_FOUND]
        #[message = "`Meldung` with the specified ID does not exist"]
        NotExists,

        #[code = "MELDUNG_FORBIDDEN"]
        #[status = FORBIDDEN]
        #[message = "`Meldung` with the specified ID is not accessible"]
        Forbidden,
    }
}

define_error! {
    enum PropertyError {
        #[code = "PROPERTY_NOT_EXISTS"]
        #[status = NOT_FOUND]
        #[message = "`Property` with the specified ID does not exist"]
        NotExists,
    }
}

define_error! {
    enum UnitError {
        #[code = "UNIT_NOT_EXISTS"]
        #[status = NOT_FOUND]
        #[message = "`Unit` with the specified ID does not exist"]
        NotExists,
    }
}

define_error! {
    enum UserError {
        #[code = "USER_NOT_EXISTS"]
        #[status = NOT_FOUND]
        #[message = "`User` with the specified ID does not exist"]
        NotExists,
    }
}
