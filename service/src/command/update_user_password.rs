//! [`Command`] for updating a [`user::Password`].

use common::operations::{
    By, Commit, Lock, Select, Transact, Transacted, Update,
};
use derive_more::{Display, Error, From};
use secrecy::{ExposeSecret as _, SecretBox};
use tracerr::Traced;

#[cfg(doc)]
use crate::domain::user::Password;
use crate::{
    domain::{user, User},
    infra::{database, Database},
    Service,
};

use super::Command;

/// [`Command`] for updating a [`user::Password`].
#[derive(Clone, Debug)]
pub struct UpdateUserPassword {
    /// ID of the [`User`] which [`Password`] should be updated.
    pub user_id: user::Id,

    /// New [`Password`] of the [`User`].
    pub new_password: SecretBox<user::Password>,

    /// Old [`Password`] of the [`User`].
    pub old_password: SecretBox<user::Password>,
}

impl<Db, Bill> Command<UpdateUserPassword> for Service<Db, Bill>
where
    Db: Database<Transact, Err = Traced<database::Error>>,
    Transacted<Db>: Database<
            Select<By<Option<User>, user::Id>>,
            Ok = Option<User>,
            Err = Traced<database::Error>,
        > + Database<
            Lock<By<User, user::Id>>,
            Ok = (),
            Err = Traced<database::Error>,
        > + Database<Update<User>, Ok = (), Err = Traced<database::Error>>
        + Database<Commit, Ok = (), Err = Traced<database::Error>>,
{
    type Ok = User;
    type Err = Traced<ExecutionError>;

    async fn execute(
        &self,
        cmd: UpdateUserPassword,
    ) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let UpdateUserPassword {
            user_id,
            new_password,
            old_password,
        } = cmd;

        let tx = self
            .database()
            .execute(Transact)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        // Avoid concurrent actions upon the same `User`.
        tx.execute(Lock(By::new(user_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        let mut user = tx
            .execute(Select(By::<Option<User>, _>::new(user_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .ok_or(E::UserNotExists(user_id))
            .map_err(tracerr::wrap!())?;
        if !user.password_hash.verify(old_password.expose_secret()) {
            return Err(tracerr::new!(E::WrongPassword));
        }

        user.password_hash =
            user::PasswordHash::new(new_password.expose_secret());
        user.password_reset = None;
        tx.execute(Update(user.clone()))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        tx.execute(Commit)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        Ok(user)
    }
}

/// Error of [`UpdateUserPassword`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    Db(database::Error),

    /// [`User`] doesn't exist.
    #[display("`User(id: {_0})` does not exist")]
    #[from(ignore)]
    UserNotExists(#[error(not(source))] user::Id),

    /// Wrong old [`Password`] provided.
    #[display("Wrong old password")]
    WrongPassword,
}

#[cfg(test)]
mod spec {
    use secrecy::SecretBox;

    use crate::{domain::user, spec::service, Command as _};

    use super::{ExecutionError, UpdateUserPassword};

    #[tokio::test]
    async fn replaces_hash_after_verification() {
        let (svc, _) = service();
        let user = user::spec::with_role(user::Role::Landlord);
        svc.database().put(user.clone());
        let new = user::Password::new("neu-geheim-456").unwrap();

        _ = svc
            .execute(UpdateUserPassword {
                user_id: user.id,
                new_password: SecretBox::new(Box::new(new.clone())),
                old_password: SecretBox::new(Box::new(
                    user::spec::password(),
                )),
            })
            .await
            .unwrap();

        let stored = &svc.database().committed().users[&user.id];
        assert!(stored.password_hash.verify(&new));
        assert!(!stored.password_hash.verify(&user::spec::password()));
    }

    #[tokio::test]
    async fn rejects_wrong_old_password() {
        let (svc, _) = service();
        let user = user::spec::with_role(user::Role::Landlord);
        svc.database().put(user.clone());

        let err = svc
            .execute(UpdateUserPassword {
                user_id: user.id,
                new_password: SecretBox::new(Box::new(
                    user::Password::new("neu-geheim-456").unwrap(),
                )),
                old_password: SecretBox::new(Box::new(
                    user::Password::new("falsch123").unwrap(),
                )),
            })
            .await
            .unwrap_err();

        assert!(matches!(err.as_ref(), ExecutionError::WrongPassword));
    }
}
