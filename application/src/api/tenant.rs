//! [`Tenant`] invitation definitions.

use common::DateTime;
use derive_more::{AsRef, Display, From, Into};
use juniper::{graphql_object, GraphQLScalar};
use service::domain;
use uuid::Uuid;

use crate::{
    api::{self, scalar},
    Context,
};

/// An invited or activated tenant of a `Unit`.
#[derive(Clone, Debug, From)]
pub struct Tenant(domain::Tenant);

/// An invited or activated tenant of a `Unit`.
#[graphql_object(context = Context)]
impl Tenant {
    /// Unique identifier of this `Tenant`.
    pub fn id(&self) -> Id {
        self.0.id.into()
    }

    /// Name of the invited person.
    pub fn name(&self) -> api::user::Name {
        self.0.name.clone().into()
    }

    /// Email the invitation is sent to.
    pub fn email(&self) -> api::user::Email {
        self.0.email.clone().into()
    }

    /// Phone of the invited person.
    pub fn phone(&self) -> Option<api::user::Phone> {
        self.0.phone.clone().map(Into::into)
    }

    /// ID of the `Property` the `Unit` belongs to.
    pub fn property_id(&self) -> api::property::Id {
        self.0.property_id.into()
    }

    /// ID of the `Unit` the tenant is invited into.
    pub fn unit_id(&self) -> api::unit::Id {
        self.0.unit_id.into()
    }

    /// `DateTime` when the tenant moves in.
    pub fn move_in(&self) -> DateTime {
        self.0.move_in.coerce()
    }

    /// `DateTime` when the pending invitation expires.
    pub fn invitation_expires_at(&self) -> Option<DateTime> {
        self.0.invitation.as_ref().map(|i| i.expires_at.coerce())
    }

    /// `User` created on activation.
    pub fn user(&self) -> Option<api::User> {
        self.0.user_id.map(|id| {
            #[expect(
                unsafe_code,
                reason = "activated `Tenant` guarantees `User` existence"
            )]
            unsafe {
                api::User::new_unchecked(id)
            }
        })
    }

    /// Indicator whether this `Tenant` has accepted the invitation.
    pub fn is_active(&self) -> bool {
        self.0.is_active
    }

    /// `DateTime` when this `Tenant` was invited.
    pub fn created_at(&self) -> DateTime {
        self.0.created_at.coerce()
    }
}

/// Unique identifier of a `Tenant`.
#[derive(Clone, Copy, Debug, Display, From, GraphQLScalar, Into)]
#[from(domain::tenant::Id)]
#[into(domain::tenant::Id)]
#[graphql(name = "TenantId", transparent)]
pub struct Id(Uuid);

/// Token of a `Tenant` invitation.
#[derive(AsRef, Clone, Debug, Display, From, GraphQLScalar, Into)]
#[graphql(
    name = "InvitationToken",
    with = scalar::Via::<domain::tenant::InvitationToken>,
)]
pub struct InvitationToken(domain::tenant::InvitationToken);
