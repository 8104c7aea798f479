//! [`Command`] for redeeming a [`PasswordReset`].

use common::operations::{
    By, Commit, Lock, Select, Transact, Transacted, Update,
};
use derive_more::{Display, Error, From};
use secrecy::{ExposeSecret as _, SecretBox};
use tracerr::Traced;

#[cfg(doc)]
use crate::domain::user::PasswordReset;
use crate::{
    domain::{
        user::{self, password_reset},
        User,
    },
    infra::{database, Database},
    Service,
};

use super::Command;

/// [`Command`] for setting a new [`user::Password`] with a
/// [`password_reset::Token`].
#[derive(Clone, Debug)]
pub struct ResetPassword {
    /// [`password_reset::Token`] the [`User`] has received.
    pub token: password_reset::Token,

    /// New [`user::Password`] of the [`User`].
    pub new_password: SecretBox<user::Password>,
}

impl<Db, Bill> Command<ResetPassword> for Service<Db, Bill>
where
    Db: for<'l> Database<
            Select<By<Option<User>, &'l password_reset::TokenHash>>,
            Ok = Option<User>,
            Err = Traced<database::Error>,
        > + Database<Transact, Err = Traced<database::Error>>,
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
        cmd: ResetPassword,
    ) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let ResetPassword {
            token,
            new_password,
        } = cmd;

        let hash = password_reset::TokenHash::of(&token);
        let user_id = self
            .database()
            .execute(Select(By::new(&hash)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .ok_or(E::InvalidOrExpiredToken)
            .map_err(tracerr::wrap!())?
            .id;

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
            .filter(|u| {
                u.password_reset.as_ref().is_some_and(|r| r.accepts(&token))
            })
            .ok_or(E::InvalidOrExpiredToken)
            .map_err(tracerr::wrap!())?;

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

/// Error of [`ResetPassword`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    Db(database::Error),

    /// [`password_reset::Token`] is unknown, used or expired.
    #[display("Password reset token is invalid or expired")]
    InvalidOrExpiredToken,
}

#[cfg(test)]
mod spec {
    use secrecy::SecretBox;

    use crate::{
        command::{RequestPasswordReset, UpdateUserPassword},
        domain::user::{self, password_reset},
        infra::Notice,
        spec::service,
        Command as _,
    };

    use super::{ExecutionError, ResetPassword};

    fn secret(password: &str) -> SecretBox<user::Password> {
        SecretBox::new(Box::new(user::Password::new(password).unwrap()))
    }

    #[tokio::test]
    async fn resets_password_once() {
        let (svc, mut inbox) = service();
        let tenant = user::spec::with_role(user::Role::Tenant);
        svc.database().put(tenant.clone());

        svc.execute(RequestPasswordReset {
            email: tenant.email.clone(),
        })
        .await
        .unwrap();
        let [Notice::PasswordReset { email, token }] =
            <[Notice; 1]>::try_from(inbox.drain()).unwrap()
        else {
            panic!("expected a single password reset notice");
        };
        assert_eq!(email, tenant.email);

        let user = svc
            .execute(ResetPassword {
                token: token.clone(),
                new_password: secret("neues-passwort"),
            })
            .await
            .unwrap();
        assert!(user
            .password_hash
            .verify(&user::Password::new("neues-passwort").unwrap()));
        assert!(user.password_reset.is_none());

        let err = svc
            .execute(ResetPassword {
                token,
                new_password: secret("noch-ein-passwort"),
            })
            .await
            .unwrap_err();
        assert!(matches!(err.as_ref(), ExecutionError::InvalidOrExpiredToken));
    }

    #[tokio::test]
    async fn unknown_email_is_silent() {
        let (svc, mut inbox) = service();

        svc.execute(RequestPasswordReset {
            email: user::Email::new("niemand@example.org").unwrap(),
        })
        .await
        .unwrap();

        assert!(inbox.drain().is_empty());
    }

    #[tokio::test]
    async fn rejects_unknown_token() {
        let (svc, _) = service();

        let err = svc
            .execute(ResetPassword {
                token: password_reset::Token::generate(),
                new_password: secret("neues-passwort"),
            })
            .await
            .unwrap_err();

        assert!(matches!(err.as_ref(), ExecutionError::InvalidOrExpiredToken));
    }

    #[tokio::test]
    async fn updates_password_with_old_one() {
        let (svc, _) = service();
        let landlord = user::spec::with_role(user::Role::Landlord);
        svc.database().put(landlord.clone());

        let user = svc
            .execute(UpdateUserPassword {
                user_id: landlord.id,
                new_password: secret("neues-passwort"),
                old_password: SecretBox::new(Box::new(
                    user::spec::password(),
                )),
            })
            .await
            .unwrap();

        assert!(!user.password_hash.verify(&user::spec::password()));
        assert_eq!(
            svc.database().committed().users[&landlord.id].password_hash,
            user.password_hash,
        );
    }
}
