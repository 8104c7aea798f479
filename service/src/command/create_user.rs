//! [`Command`] for registering a new [`User`].

use common::{
    operations::{By, Commit, Insert, Select, Transact, Transacted},
    DateTime,
};
use derive_more::{Display, Error, From};
use secrecy::{ExposeSecret as _, SecretBox};
use tracerr::Traced;

#[cfg(doc)]
use crate::domain::user::{Email, Password};
use crate::{
    domain::{user, User},
    infra::{database, Database},
    Service,
};

use super::Command;

/// [`Command`] for registering a new [`User`].
#[derive(Clone, Debug)]
pub struct CreateUser {
    /// Name of a new [`User`].
    pub name: user::Name,

    /// [`Email`] of a new [`User`].
    pub email: user::Email,

    /// [`Password`] of a new [`User`].
    pub password: SecretBox<user::Password>,

    /// Phone of a new [`User`].
    pub phone: Option<user::Phone>,

    /// [`user::Profile`] of a new [`User`], defining its [`user::Role`].
    ///
    /// Subscriptions and unit assignments are never taken from here.
    pub profile: user::Profile,
}

impl<Db, Bill> Command<CreateUser> for Service<Db, Bill>
where
    Db: for<'l> Database<
            Select<By<Option<User>, &'l user::Email>>,
            Ok = Option<User>,
            Err = Traced<database::Error>,
        > + Database<Transact, Err = Traced<database::Error>>,
    Transacted<Db>: Database<Insert<User>, Err = Traced<database::Error>>
        + Database<Commit, Err = Traced<database::Error>>,
{
    type Ok = User;
    type Err = Traced<ExecutionError>;

    async fn execute(&self, cmd: CreateUser) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let CreateUser {
            name,
            email,
            password,
            phone,
            profile,
        } = cmd;

        let existing = self
            .database()
            .execute(Select(By::new(&email)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;
        if existing.is_some() {
            return Err(tracerr::new!(E::EmailOccupied(email)));
        }

        let profile = match profile {
            user::Profile::Landlord { .. } => {
                user::Profile::Landlord { subscription: None }
            }
            user::Profile::Tenant { .. } => user::Profile::Tenant {
                assigned_unit: None,
            },
            p @ user::Profile::Craftsman { .. } => p,
        };
        let user = User {
            id: user::Id::new(),
            name,
            email,
            password_hash: user::PasswordHash::new(password.expose_secret()),
            phone,
            profile,
            password_reset: None,
            created_at: DateTime::now().coerce(),
        };

        let tx = self
            .database()
            .execute(Transact)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;
        tx.execute(Insert(user.clone()))
            .await
            .map_err(|e| {
                if e.as_ref().is_unique_violation(Some("users_email_key")) {
                    tracerr::new!(E::EmailOccupied(user.email.clone()))
                } else {
                    tracerr::map_from_and_wrap!(=> E)(e)
                }
            })
            .map(drop)?;
        tx.execute(Commit)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        Ok(user)
    }
}

/// Error of [`CreateUser`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    #[from]
    Db(database::Error),

    /// [`Email`] is already registered.
    #[display("`{_0}` email is occupied")]
    EmailOccupied(#[error(not(source))] user::Email),
}

#[cfg(test)]
mod spec {
    use secrecy::SecretBox;

    use crate::{
        domain::user::{self, Profile, Rating, Specialization},
        spec::service,
        Command as _,
    };

    use super::{CreateUser, ExecutionError};

    fn registration(email: &str, profile: Profile) -> CreateUser {
        CreateUser {
            name: user::Name::new("Max Mustermann").unwrap(),
            email: user::Email::new(email).unwrap(),
            password: SecretBox::new(Box::new(user::spec::password())),
            phone: None,
            profile,
        }
    }

    #[tokio::test]
    async fn registers_craftsman() {
        let (svc, _) = service();
        let profile = Profile::Craftsman {
            specialization: Specialization::new("Elektrik").unwrap(),
            rating: Rating::new(3.5).unwrap(),
        };

        let user = svc
            .execute(registration("max@example.org", profile))
            .await
            .unwrap();

        assert_eq!(user.role(), user::Role::Craftsman);
        assert!(user.password_hash.verify(&user::spec::password()));
        assert!(svc.database().committed().users.contains_key(&user.id));
    }

    #[tokio::test]
    async fn rejects_occupied_email() {
        let (svc, _) = service();
        let landlord = Profile::Landlord { subscription: None };
        drop(
            svc.execute(registration("max@example.org", landlord.clone()))
                .await
                .unwrap(),
        );

        let err = svc
            .execute(registration("MAX@example.org", landlord))
            .await
            .unwrap_err();

        assert!(matches!(err.as_ref(), ExecutionError::EmailOccupied(_)));
        assert_eq!(svc.database().committed().users.len(), 1);
    }
}
