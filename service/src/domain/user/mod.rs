//! [`User`] definitions.

pub mod password_reset;
pub mod session;
pub mod subscription;

use std::sync::LazyLock;

use argon2::{
    password_hash::{PasswordHasher as _, PasswordVerifier as _, SaltString},
    Argon2,
};
#[cfg(doc)]
use common::DateTime;
use common::{define_kind, DateTimeOf};
use derive_more::{AsRef, Display, From, FromStr, Into};
#[cfg(feature = "postgres")]
use postgres_types::{FromSql, ToSql};
use regex::Regex;
use secrecy::{zeroize::Zeroize, CloneableSecret};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::unit;

pub use self::{
    password_reset::PasswordReset,
    session::{Identity, Session},
    subscription::Subscription,
};

/// Platform user: a landlord, a tenant or a craftsman.
#[derive(Clone, Debug)]
pub struct User {
    /// ID of this [`User`]
    pub id: Id,

    /// [`Name`] of this [`User`].
    pub name: Name,

    /// [`Email`] of this [`User`], unique across the platform.
    pub email: Email,

    /// [`PasswordHash`] of this [`User`].
    pub password_hash: PasswordHash,

    /// [`Phone`] of this [`User`].
    pub phone: Option<Phone>,

    /// Role-specific [`Profile`] of this [`User`].
    pub profile: Profile,

    /// Pending [`PasswordReset`] of this [`User`], if requested.
    pub password_reset: Option<PasswordReset>,

    /// [`DateTime`] when this [`User`] was created.
    pub created_at: CreationDateTime,
}

impl User {
    /// Returns [`Role`] of this [`User`].
    #[must_use]
    pub fn role(&self) -> Role {
        self.profile.role()
    }

    /// Returns ID of the [`Unit`] this [`User`] lives in, if this [`User`] is
    /// a tenant bound to some.
    ///
    /// [`Unit`]: crate::domain::Unit
    #[must_use]
    pub fn assigned_unit(&self) -> Option<unit::Id> {
        match self.profile {
            Profile::Tenant { assigned_unit } => assigned_unit,
            Profile::Landlord { .. } | Profile::Craftsman { .. } => None,
        }
    }

    /// Returns [`Subscription`] of this [`User`], if this [`User`] is a
    /// landlord having one.
    #[must_use]
    pub fn subscription(&self) -> Option<&Subscription> {
        match &self.profile {
            Profile::Landlord { subscription } => subscription.as_ref(),
            Profile::Tenant { .. } | Profile::Craftsman { .. } => None,
        }
    }
}

/// Role-specific fields of a [`User`].
///
/// [`Role`] is derived from the variant, so craftsman-only fields cannot exist
/// on any other [`Role`].
#[derive(Clone, Debug, PartialEq)]
pub enum Profile {
    /// Property owner.
    Landlord {
        /// Billing [`Subscription`], once started.
        subscription: Option<Subscription>,
    },

    /// Person living in a [`Unit`].
    ///
    /// [`Unit`]: crate::domain::Unit
    Tenant {
        /// ID of the [`Unit`] the tenant is bound to.
        ///
        /// [`Unit`]: crate::domain::Unit
        assigned_unit: Option<unit::Id>,
    },

    /// Contractor resolving maintenance reports.
    Craftsman {
        /// [`Specialization`] of the craftsman.
        specialization: Specialization,

        /// [`Rating`] of the craftsman.
        rating: Rating,
    },
}

impl Profile {
    /// Returns [`Role`] described by this [`Profile`].
    #[must_use]
    pub const fn role(&self) -> Role {
        match self {
            Self::Landlord { .. } => Role::Landlord,
            Self::Tenant { .. } => Role::Tenant,
            Self::Craftsman { .. } => Role::Craftsman,
        }
    }
}

define_kind! {
    #[doc = "Role of a [`User`]."]
    enum Role {
        #[doc = "Landlord owning properties (\"Vermieter\")."]
        #[rename = "VERMIETER"]
        Landlord = 1,

        #[doc = "Tenant living in a unit (\"Mieter\")."]
        #[rename = "MIETER"]
        Tenant = 2,

        #[doc = "Craftsman working on reports (\"Handwerker\")."]
        #[rename = "HANDWERKER"]
        Craftsman = 3,
    }
}

/// ID of a [`User`].
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

/// Name of a [`User`].
#[derive(AsRef, Clone, Debug, Display, Eq, PartialEq)]
#[as_ref(str, String)]
#[cfg_attr(feature = "postgres", derive(FromSql, ToSql), postgres(transparent))]
pub struct Name(String);

impl Name {
    /// Creates a new [`Name`].
    ///
    /// # Safety
    ///
    /// The caller must ensure that the given `name` matches the format.
    #[expect(unsafe_code, reason = "bypass")]
    #[must_use]
    pub unsafe fn new_unchecked(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Creates a new [`Name`] if the given `name` is valid.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Option<Self> {
        let name = name.into();
        Self::check(&name).then_some(Self(name))
    }

    /// Checks whether the given `name` is a valid [`Name`].
    fn check(name: impl AsRef<str>) -> bool {
        let name = name.as_ref();
        name.trim() == name && !name.is_empty() && name.len() <= 512
    }
}

impl FromStr for Name {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s).ok_or("invalid `Name`")
    }
}

/// Password of a [`User`].
#[derive(Clone, Debug, Display, Eq, From, PartialEq)]
#[from(&str, String)]
pub struct Password(String);

impl Password {
    /// Creates a new [`Password`].
    ///
    /// # Safety
    ///
    /// The caller must ensure that the given `password` matches the format.
    #[expect(unsafe_code, reason = "bypass")]
    #[must_use]
    pub unsafe fn new_unchecked(password: impl Into<String>) -> Self {
        Self(password.into())
    }

    /// Creates a new [`Password`] if the given `password` is valid.
    #[must_use]
    pub fn new(password: impl Into<String>) -> Option<Self> {
        let password = password.into();
        Self::check(&password).then_some(Self(password))
    }

    /// Checks whether the given `password` is a valid [`Password`].
    fn check(password: impl AsRef<str>) -> bool {
        let password = password.as_ref();
        password.len() >= 8 && password.len() <= 128
    }
}

impl FromStr for Password {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s).ok_or("invalid `Password`")
    }
}

impl CloneableSecret for Password {}
impl Zeroize for Password {
    fn zeroize(&mut self) {
        self.0.zeroize();
    }
}

/// [Argon2] hash of a [`Password`] in the [PHC string format].
///
/// [Argon2]: https://en.wikipedia.org/wiki/Argon2
/// [PHC string format]: https://bit.ly/phc-string-format
#[derive(Clone, Debug, Display, Eq, PartialEq)]
#[cfg_attr(feature = "postgres", derive(FromSql, ToSql), postgres(transparent))]
pub struct PasswordHash(String);

impl PasswordHash {
    /// Hashes the given [`Password`] with a fresh random salt.
    #[expect(clippy::missing_panics_doc, reason = "infallible")]
    #[must_use]
    pub fn new(password: &Password) -> Self {
        let salt = SaltString::encode_b64(&rand::random::<[u8; 16]>())
            .expect("16 bytes always fit into a salt");
        Self(
            Argon2::default()
                .hash_password(password.0.as_bytes(), &salt)
                .expect("default `Argon2` params accept any `Password`")
                .to_string(),
        )
    }

    /// Checks whether this [`PasswordHash`] was produced from the given
    /// [`Password`].
    #[must_use]
    pub fn verify(&self, password: &Password) -> bool {
        argon2::PasswordHash::new(&self.0).is_ok_and(|hash| {
            Argon2::default()
                .verify_password(password.0.as_bytes(), &hash)
                .is_ok()
        })
    }
}

/// Email address of a [`User`].
#[derive(AsRef, Clone, Debug, Display, Eq, Hash, PartialEq)]
#[as_ref(str, String)]
#[cfg_attr(feature = "postgres", derive(FromSql, ToSql), postgres(transparent))]
pub struct Email(String);

impl Email {
    /// Creates a new [`Email`].
    ///
    /// # Safety
    ///
    /// The caller must ensure that the given `address` matches the format.
    #[expect(unsafe_code, reason = "bypass")]
    #[must_use]
    pub unsafe fn new_unchecked(address: impl Into<String>) -> Self {
        Self(address.into())
    }

    /// Creates a new [`Email`] if the given `address` is valid.
    ///
    /// The address is lowercased, so the same mailbox always produces the same
    /// [`Email`].
    #[must_use]
    pub fn new(address: impl Into<String>) -> Option<Self> {
        let address = address.into().to_lowercase();
        Self::check(&address).then_some(Self(address))
    }

    /// Checks whether the given `address` is a valid [`Email`].
    fn check(address: impl AsRef<str>) -> bool {
        /// Regular expression checking [`Email`] format.
        static REGEX: LazyLock<Regex> = LazyLock::new(|| {
            Regex::new(
                "^([^\\x00-\\x20\\x22\\x28\\x29\\x2c\\x2e\\x3a-\
                     \\x3c\\x3e\\x40\\x5b-\\x5d\\x7f-\\xff]+\
                  |\\x22([^\\x0d\\x22\\x5c\\x80-\\xff]\
                  |\\x5c[\\x00-\\x7f])*\\x22)\
                  (\\x2e([^\\x00-\\x20\\x22\\x28\\x29\\x2c\\x2e\\x3a-\
                           \\x3c\\x3e\\x40\\x5b-\\x5d\\x7f-\\xff]+\
                        |\\x22([^\\x0d\\x22\\x5c\\x80-\\xff]\
                        |\\x5c[\\x00-\\x7f])*\\x22))*\\x40\
                  ([^\\x00-\\x20\\x22\\x28\\x29\\x2c\\x2e\\x3a-\
                     \\x3c\\x3e\\x40\\x5b-\\x5d\\x7f-\\xff]+\
                  |\\x5b([^\\x0d\\x5b-\\x5d\\x80-\\xff]\
                        |\\x5c[\\x00-\\x7f])*\\x5d)\
                  (\\x2e([^\\x00-\\x20\\x22\\x28\\x29\\x2c\\x2e\\x3a-\
                           \\x3c\\x3e\\x40\\x5b-\\x5d\\x7f-\\xff]+\
                        |\\x5b([^\\x0d\\x5b-\\x5d\\x80-\\xff]\
                        |\\x5c[\\x00-\\x7f])*\\x5d))*$",
            )
            .expect("valid regex")
        });

        REGEX.is_match(address.as_ref())
    }
}

impl FromStr for Email {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s).ok_or("invalid `Email`")
    }
}

/// Phone number of a [`User`].
#[derive(AsRef, Clone, Debug, Display, Eq, PartialEq)]
#[as_ref(str, String)]
#[cfg_attr(feature = "postgres", derive(FromSql, ToSql), postgres(transparent))]
pub struct Phone(String);

impl Phone {
    /// Creates a new [`Phone`].
    ///
    /// # Safety
    ///
    /// The caller must ensure that the given `number` matches the format.
    #[expect(unsafe_code, reason = "bypass")]
    #[must_use]
    pub unsafe fn new_unchecked(number: impl Into<String>) -> Self {
        Self(number.into())
    }

    /// Creates a new [`Phone`] if the given `number` is valid.
    #[must_use]
    pub fn new(number: impl Into<String>) -> Option<Self> {
        let number = number.into();
        Self::check(&number).then_some(Self(number))
    }

    /// Checks whether the given `number` is a valid [`Phone`].
    fn check(number: impl AsRef<str>) -> bool {
        /// Regular expression checking [`Phone`] format: an optional country
        /// code followed by 6 to 14 digits, optionally grouped by spaces,
        /// dashes or slashes.
        static REGEX: LazyLock<Regex> = LazyLock::new(|| {
            Regex::new(r"^(\+\d{1,3}[-\s]?)?\d(?:[-\s/]?\d){5,13}$")
                .expect("valid regex")
        });

        REGEX.is_match(number.as_ref())
    }
}

impl FromStr for Phone {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s).ok_or("invalid `Phone`")
    }
}

/// Trade a craftsman works in (e.g. "Sanitär", "Elektrik").
#[derive(AsRef, Clone, Debug, Display, Eq, PartialEq)]
#[as_ref(str, String)]
#[cfg_attr(feature = "postgres", derive(FromSql, ToSql), postgres(transparent))]
pub struct Specialization(String);

impl Specialization {
    /// Creates a new [`Specialization`] if the given `trade` is valid.
    #[must_use]
    pub fn new(trade: impl Into<String>) -> Option<Self> {
        let trade = trade.into();
        (trade.trim() == trade && !trade.is_empty() && trade.len() <= 128)
            .then_some(Self(trade))
    }
}

impl FromStr for Specialization {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s).ok_or("invalid `Specialization`")
    }
}

/// Rating of a craftsman in the `0.0..=5.0` range.
#[derive(Clone, Copy, Debug, Display, PartialEq, PartialOrd)]
pub struct Rating(f32);

impl Rating {
    /// Lowest possible [`Rating`].
    pub const MIN: Self = Self(0.0);

    /// Highest possible [`Rating`].
    pub const MAX: Self = Self(5.0);

    /// Creates a new [`Rating`] if the given `value` is in range.
    #[must_use]
    pub fn new(value: f32) -> Option<Self> {
        (Self::MIN.0..=Self::MAX.0)
            .contains(&value)
            .then_some(Self(value))
    }

    /// Returns the numeric value of this [`Rating`].
    #[must_use]
    pub const fn get(self) -> f32 {
        self.0
    }
}

/// [`DateTime`] when a [`User`] was created.
pub type CreationDateTime = DateTimeOf<(User, common::unit::Creation)>;

#[cfg(test)]
pub(crate) mod spec {
    use common::DateTime;

    use super::{
        Email, Id, Name, Password, PasswordHash, Phone, Profile, Rating, Role,
        Specialization, User,
    };

    pub(crate) fn with_role(role: Role) -> User {
        let id = Id::new();
        User {
            id,
            name: Name::new(format!("{role} {id}")).unwrap(),
            email: Email::new(format!("{id}@example.org")).unwrap(),
            password_hash: PasswordHash::new(&password()),
            phone: None,
            profile: match role {
                Role::Landlord => Profile::Landlord { subscription: None },
                Role::Tenant => Profile::Tenant {
                    assigned_unit: None,
                },
                Role::Craftsman => Profile::Craftsman {
                    specialization: Specialization::new("Sanitär").unwrap(),
                    rating: Rating::new(4.0).unwrap(),
                },
            },
            password_reset: None,
            created_at: DateTime::now().coerce(),
        }
    }

    pub(crate) fn password() -> Password {
        Password::new("geheim123").unwrap()
    }

    #[test]
    fn role_follows_profile() {
        let craftsman = Profile::Craftsman {
            specialization: Specialization::new("Sanitär").unwrap(),
            rating: Rating::new(4.5).unwrap(),
        };
        assert_eq!(craftsman.role(), Role::Craftsman);
        assert_eq!(
            Profile::Tenant {
                assigned_unit: None
            }
            .role(),
            Role::Tenant,
        );
        assert_eq!(
            Profile::Landlord { subscription: None }.role(),
            Role::Landlord,
        );
    }

    #[test]
    fn role_uses_german_wire_names() {
        assert_eq!(Role::Landlord.to_string(), "VERMIETER");
        assert_eq!(Role::Tenant.to_string(), "MIETER");
        assert_eq!("HANDWERKER".parse::<Role>().unwrap(), Role::Craftsman);
    }

    #[test]
    fn rating_is_bounded() {
        assert!(Rating::new(0.0).is_some());
        assert!(Rating::new(5.0).is_some());
        assert!(Rating::new(5.1).is_none());
        assert!(Rating::new(-0.1).is_none());
        assert!(Rating::new(f32::NAN).is_none());
    }

    #[test]
    fn password_hash_verifies() {
        let password = Password::new("correct horse").unwrap();
        let hash = PasswordHash::new(&password);

        assert!(hash.verify(&password));
        assert!(!hash.verify(&Password::new("wrong horse").unwrap()));
        assert_ne!(hash, PasswordHash::new(&password), "salted");
    }

    #[test]
    fn email_is_normalized() {
        assert_eq!(
            Email::new("Anna.Schmidt@Example.org").unwrap().to_string(),
            "anna.schmidt@example.org",
        );
        assert!(Email::new("not an email").is_none());
    }

    #[test]
    fn phone_formats() {
        assert!(Phone::new("+49 30 1234567").is_some());
        assert!(Phone::new("+49301234567").is_some());
        assert!(Phone::new("030/1234567").is_some());
        assert!(Phone::new("12").is_none());
    }
}
