//! [`Tenant`] invitation definitions.

use std::time::Duration;

#[cfg(doc)]
use common::DateTime;
use common::{
    unit::{Creation, Expiration, LeaseStart},
    DateTimeOf,
};
use derive_more::{AsRef, Display, From, FromStr, Into};
#[cfg(feature = "postgres")]
use postgres_types::{FromSql, ToSql};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[cfg(doc)]
use crate::domain::{Property, Unit, User};
use crate::domain::{property, unit, user};

/// Invitation of a future tenant into a [`Unit`].
///
/// Exists before the tenant's [`User`] account does. Once activated, it stays
/// as a record linking the invitation to the created [`User`].
#[derive(Clone, Debug, PartialEq)]
pub struct Tenant {
    /// ID of this [`Tenant`].
    pub id: Id,

    /// Name of the invited person.
    pub name: user::Name,

    /// Email of the invited person.
    pub email: user::Email,

    /// Phone of the invited person.
    pub phone: Option<user::Phone>,

    /// ID of the [`Property`] the [`Unit`] belongs to.
    pub property_id: property::Id,

    /// ID of the [`Unit`] the tenant is invited into.
    pub unit_id: unit::Id,

    /// [`DateTime`] when the tenant moves in.
    pub move_in: MoveInDateTime,

    /// Pending [`Invitation`], cleared on activation.
    pub invitation: Option<Invitation>,

    /// ID of the [`User`] created on activation.
    pub user_id: Option<user::Id>,

    /// Indicates whether this [`Tenant`] has been activated.
    pub is_active: bool,

    /// [`DateTime`] when this [`Tenant`] was created.
    pub created_at: CreationDateTime,
}

impl Tenant {
    /// Indicates whether the provided [`InvitationToken`] activates this
    /// [`Tenant`] right now.
    #[must_use]
    pub fn accepts(&self, token: &InvitationToken) -> bool {
        !self.is_active
            && self.invitation.as_ref().is_some_and(|inv| {
                inv.token == *token && !inv.expires_at.is_elapsed()
            })
    }

    /// Marks this [`Tenant`] as activated by the provided [`User`].
    pub fn activate(&mut self, user_id: user::Id) {
        self.is_active = true;
        self.user_id = Some(user_id);
        self.invitation = None;
    }
}

/// Time-limited activation token of a [`Tenant`].
#[derive(Clone, Debug, PartialEq)]
pub struct Invitation {
    /// [`InvitationToken`] to be sent to the invited person.
    pub token: InvitationToken,

    /// [`DateTime`] when this [`Invitation`] expires.
    pub expires_at: ExpirationDateTime,
}

impl Invitation {
    /// Issues a new [`Invitation`] living for the provided `ttl`.
    #[must_use]
    pub fn issue(ttl: Duration) -> Self {
        Self {
            token: InvitationToken::generate(),
            expires_at: ExpirationDateTime::now() + ttl,
        }
    }
}

/// ID of a [`Tenant`].
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

/// Activation token of an [`Invitation`]: 32 random bytes, hex-encoded.
#[derive(AsRef, Clone, Debug, Display, Eq, Hash, PartialEq)]
#[as_ref(str)]
#[cfg_attr(feature = "postgres", derive(FromSql, ToSql), postgres(transparent))]
pub struct InvitationToken(String);

impl InvitationToken {
    /// Generates a new random [`InvitationToken`].
    #[must_use]
    pub fn generate() -> Self {
        Self(hex::encode(rand::random::<[u8; 32]>()))
    }

    /// Creates a new [`InvitationToken`] if the given `token` looks like one.
    #[must_use]
    pub fn new(token: impl Into<String>) -> Option<Self> {
        let token = token.into();
        (token.len() == 64 && token.bytes().all(|b| b.is_ascii_hexdigit()))
            .then_some(Self(token))
    }
}

impl FromStr for InvitationToken {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s).ok_or("invalid `InvitationToken`")
    }
}

/// [`DateTime`] when a [`Tenant`] was created.
pub type CreationDateTime = DateTimeOf<(Tenant, Creation)>;

/// [`DateTime`] when an [`Invitation`] expires.
pub type ExpirationDateTime = DateTimeOf<(Invitation, Expiration)>;

/// [`DateTime`] when a [`Tenant`] moves in.
pub type MoveInDateTime = DateTimeOf<(Tenant, LeaseStart)>;

#[cfg(test)]
mod spec {
    use std::time::Duration;

    use common::DateTime;

    use crate::domain::{property, unit, user};

    use super::{ExpirationDateTime, Id, Invitation, InvitationToken, Tenant};

    fn invited() -> Tenant {
        Tenant {
            id: Id::new(),
            name: user::Name::new("Jonas Weber").unwrap(),
            email: user::Email::new("jonas@example.org").unwrap(),
            phone: None,
            property_id: property::Id::new(),
            unit_id: unit::Id::new(),
            move_in: DateTime::now().coerce(),
            invitation: Some(Invitation::issue(Duration::from_secs(60))),
            user_id: None,
            is_active: false,
            created_at: DateTime::now().coerce(),
        }
    }

    #[test]
    fn token_has_32_random_bytes() {
        let token = InvitationToken::generate();
        assert_eq!(token.as_ref().len(), 64);
        assert_ne!(token, InvitationToken::generate());
    }

    #[test]
    fn accepts_only_fresh_matching_token() {
        let mut tenant = invited();
        let token = tenant.invitation.clone().unwrap().token;

        assert!(tenant.accepts(&token));
        assert!(!tenant.accepts(&InvitationToken::generate()));

        tenant.invitation.as_mut().unwrap().expires_at =
            ExpirationDateTime::now() - Duration::from_secs(1);
        assert!(!tenant.accepts(&token), "expired");
    }

    #[test]
    fn activation_consumes_token() {
        let mut tenant = invited();
        let token = tenant.invitation.clone().unwrap().token;
        let user_id = user::Id::new();

        tenant.activate(user_id);

        assert!(tenant.is_active);
        assert_eq!(tenant.user_id, Some(user_id));
        assert!(tenant.invitation.is_none());
        assert!(!tenant.accepts(&token), "already used");
    }
}
