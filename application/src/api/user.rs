//! [`User`]-related definitions.

use std::future;

use common::DateTime;
use derive_more::{AsRef, Display, From, Into};
use futures::TryFutureExt as _;
use juniper::{graphql_object, GraphQLEnum, GraphQLScalar};
use service::{domain, query, Query as _};
use tokio::sync::OnceCell;
use uuid::Uuid;

use crate::{
    api::{self, scalar},
    AsError, Context, Error,
};

/// A [`User`] of the system.
#[derive(Clone, Debug, From)]
pub struct User {
    /// ID of this [`User`].
    pub id: Id,

    /// [`domain::User`] representing this [`User`].
    user: OnceCell<domain::User>,
}

impl From<domain::User> for User {
    fn from(user: domain::User) -> Self {
        Self {
            id: user.id.into(),
            user: OnceCell::new_with(Some(user)),
        }
    }
}

impl User {
    /// Creates a new [`User`] with the provided ID.
    ///
    /// # Safety
    ///
    /// Caller must ensure that [`User`] with the provided ID exists,
    /// otherwise accessing this [`User`] will result with an error.
    #[expect(unsafe_code, reason = "bypass")]
    #[must_use]
    pub unsafe fn new_unchecked(id: impl Into<Id>) -> Self {
        Self {
            id: id.into(),
            user: OnceCell::new(),
        }
    }

    /// Returns the [`domain::User`] representing this [`User`].
    ///
    /// # Errors
    ///
    /// Error if the [`domain::User`] doesn't exist.
    async fn user(&self, ctx: &Context) -> Result<&domain::User, Error> {
        let id = self.id.into();
        self.user
            .get_or_try_init(|| {
                ctx.service()
                    .execute(query::user::ById::by(id))
                    .map_err(AsError::into_error)
                    .map_err(ctx.error())
                    .and_then(|u| {
                        future::ready(u.ok_or_else(|| {
                            api::query::UserError::NotExists.into()
                        }))
                    })
            })
            .await
    }

    /// Indicates whether contacts of this [`User`] may be shown to the
    /// current one.
    ///
    /// Contacts are shown to the [`User`] itself and to landlords.
    async fn shows_contacts(&self, ctx: &Context) -> Result<bool, Error> {
        Ok(ctx.try_current_session().await?.is_some_and(|s| {
            s.user_id == self.id || s.role == domain::user::Role::Landlord
        }))
    }
}

/// A `User` of the system.
#[graphql_object(context = Context)]
impl User {
    /// Unique identifier of this `User`.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "User.id",
            otel.name = api::Query::SPAN_NAME,
        ),
    )]
    pub fn id(&self) -> Id {
        self.id
    }

    /// Name of this `User`.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "User.name",
            otel.name = api::Query::SPAN_NAME,
        ),
    )]
    pub async fn name(&self, ctx: &Context) -> Result<Name, Error> {
        Ok(self.user(ctx).await?.name.clone().into())
    }

    /// Role of this `User`.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "User.role",
            otel.name = api::Query::SPAN_NAME,
        ),
    )]
    pub async fn role(&self, ctx: &Context) -> Result<Role, Error> {
        Ok(self.user(ctx).await?.role().into())
    }

    /// Email of this `User`.
    ///
    /// Visible to the `User` itself and to landlords only.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "User.email",
            otel.name = api::Query::SPAN_NAME,
        ),
    )]
    pub async fn email(&self, ctx: &Context) -> Result<Option<Email>, Error> {
        Ok(if self.shows_contacts(ctx).await? {
            Some(self.user(ctx).await?.email.clone().into())
        } else {
            None
        })
    }

    /// Phone of this `User`.
    ///
    /// Visible to the `User` itself and to landlords only.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "User.phone",
            otel.name = api::Query::SPAN_NAME,
        ),
    )]
    pub async fn phone(&self, ctx: &Context) -> Result<Option<Phone>, Error> {
        Ok(if self.shows_contacts(ctx).await? {
            self.user(ctx).await?.phone.clone().map(Into::into)
        } else {
            None
        })
    }

    /// Trade of this `User`, if a craftsman.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "User.specialization",
            otel.name = api::Query::SPAN_NAME,
        ),
    )]
    pub async fn specialization(
        &self,
        ctx: &Context,
    ) -> Result<Option<Specialization>, Error> {
        Ok(match &self.user(ctx).await?.profile {
            domain::user::Profile::Craftsman { specialization, .. } => {
                Some(specialization.clone().into())
            }
            domain::user::Profile::Landlord { .. }
            | domain::user::Profile::Tenant { .. } => None,
        })
    }

    /// Rating of this `User`, if a craftsman.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "User.rating",
            otel.name = api::Query::SPAN_NAME,
        ),
    )]
    pub async fn rating(&self, ctx: &Context) -> Result<Option<f64>, Error> {
        Ok(match &self.user(ctx).await?.profile {
            domain::user::Profile::Craftsman { rating, .. } => {
                Some(f64::from(rating.get()))
            }
            domain::user::Profile::Landlord { .. }
            | domain::user::Profile::Tenant { .. } => None,
        })
    }

    /// `Unit` this `User` lives in, if a tenant.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "User.assignedUnit",
            otel.name = api::Query::SPAN_NAME,
        ),
    )]
    pub async fn assigned_unit(
        &self,
        ctx: &Context,
    ) -> Result<Option<api::Unit>, Error> {
        let Some(unit_id) = self.user(ctx).await?.assigned_unit() else {
            return Ok(None);
        };
        ctx.service()
            .execute(query::unit::ById::by(unit_id))
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())
            .map(|u| u.map(Into::into))
    }

    /// Billing `Subscription` of this `User`, if a landlord.
    ///
    /// Visible to the `User` itself only.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "User.subscription",
            otel.name = api::Query::SPAN_NAME,
        ),
    )]
    pub async fn subscription(
        &self,
        ctx: &Context,
    ) -> Result<Option<api::Subscription>, Error> {
        let my_id = ctx.try_current_session().await?.map(|s| s.user_id);
        if my_id != Some(self.id) {
            return Ok(None);
        }
        Ok(self.user(ctx).await?.subscription().cloned().map(Into::into))
    }

    /// `DateTime` when this `User` was created.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "User.createdAt",
            otel.name = api::Query::SPAN_NAME,
        ),
    )]
    pub async fn created_at(&self, ctx: &Context) -> Result<DateTime, Error> {
        Ok(self.user(ctx).await?.created_at.coerce())
    }
}

/// Unique identifier of a `User`.
#[derive(
    Clone, Copy, Debug, Display, Eq, From, GraphQLScalar, Into, PartialEq,
)]
#[from(domain::user::Id)]
#[into(domain::user::Id)]
#[graphql(name = "UserId", transparent)]
pub struct Id(Uuid);

/// Name of a `User`.
#[derive(AsRef, Clone, Debug, Display, From, GraphQLScalar, Into)]
#[graphql(
    name = "UserName",
    with = scalar::Via::<domain::user::Name>,
)]
pub struct Name(domain::user::Name);

/// Password of a `User`.
#[derive(AsRef, Clone, Debug, From, GraphQLScalar, Into)]
#[graphql(
    name = "UserPassword",
    with = scalar::Via::<domain::user::Password>,
)]
pub struct Password(domain::user::Password);

/// Email of a `User`.
#[derive(AsRef, Clone, Debug, Display, From, GraphQLScalar, Into)]
#[graphql(
    name = "UserEmail",
    with = scalar::Via::<domain::user::Email>,
)]
pub struct Email(domain::user::Email);

/// Phone of a `User`.
#[derive(AsRef, Clone, Debug, Display, From, GraphQLScalar, Into)]
#[graphql(
    name = "UserPhone",
    with = scalar::Via::<domain::user::Phone>,
)]
pub struct Phone(domain::user::Phone);

/// Trade of a craftsman `User`.
#[derive(AsRef, Clone, Debug, Display, From, GraphQLScalar, Into)]
#[graphql(
    name = "UserSpecialization",
    with = scalar::Via::<domain::user::Specialization>,
)]
pub struct Specialization(domain::user::Specialization);

/// Role of a `User`.
#[derive(Clone, Copy, Debug, Eq, GraphQLEnum, PartialEq)]
#[graphql(name = "UserRole")]
pub enum Role {
    /// Property owner.
    Vermieter,

    /// Person living in a unit.
    Mieter,

    /// Contractor resolving maintenance reports.
    Handwerker,
}

impl From<domain::user::Role> for Role {
    fn from(role: domain::user::Role) -> Self {
        use domain::user::Role as R;
        match role {
            R::Landlord => Self::Vermieter,
            R::Tenant => Self::Mieter,
            R::Craftsman => Self::Handwerker,
        }
    }
}

impl From<Role> for domain::user::Role {
    fn from(role: Role) -> Self {
        match role {
            Role::Vermieter => Self::Landlord,
            Role::Mieter => Self::Tenant,
            Role::Handwerker => Self::Craftsman,
        }
    }
}

pub mod session {
    //! [`Session`]-related definitions.
    //!
    //! [`Session`]: crate::Session

    use common::DateTime;
    use derive_more::{AsRef, From, Into};
    use juniper::{GraphQLObject, GraphQLScalar};
    use service::{command, domain};

    use crate::{
        api::{self, scalar},
        Context,
    };

    /// `Session` access token.
    #[derive(AsRef, Clone, Debug, From, GraphQLScalar, Into)]
    #[graphql(
        name = "UserAuthToken",
        with = scalar::Via::<domain::user::session::Token>,
    )]
    pub struct Token(domain::user::session::Token);

    /// Result of a `Session` creation.
    #[derive(Clone, Debug, From, GraphQLObject)]
    #[graphql(context = Context, name = "CreateSessionResult")]
    pub struct CreateResult {
        /// Access token of the created `Session`.
        pub token: Token,

        /// `User` associated with the created `Session`.
        pub user: api::User,

        /// `DateTime` when the created `Session` expires.
        pub expires_at: DateTime,
    }

    impl From<command::create_user_session::Output> for CreateResult {
        fn from(output: command::create_user_session::Output) -> Self {
            let command::create_user_session::Output {
                token,
                user,
                expires_at,
            } = output;
            Self {
                token: token.into(),
                user: user.into(),
                expires_at: expires_at.coerce(),
            }
        }
    }
}

pub mod password_reset {
    //! Password reset definitions.

    use derive_more::{AsRef, From, Into};
    use juniper::GraphQLScalar;
    use service::domain;

    use crate::api::scalar;

    /// Token redeeming a requested password reset.
    #[derive(AsRef, Clone, Debug, From, GraphQLScalar, Into)]
    #[graphql(
        name = "PasswordResetToken",
        with = scalar::Via::<domain::user::password_reset::Token>,
    )]
    pub struct Token(domain::user::password_reset::Token);
}
