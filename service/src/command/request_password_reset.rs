//! [`Command`] for requesting a [`PasswordReset`].

use common::operations::{
    By, Commit, Lock, Select, Transact, Transacted, Update,
};
use derive_more::{Display, Error, From};
use tracerr::Traced;
use tracing as log;

#[cfg(doc)]
use crate::domain::user::password_reset::Token;
use crate::{
    domain::{
        user::{self, PasswordReset},
        User,
    },
    infra::{database, Database, Notice},
    Service,
};

use super::Command;

/// [`Command`] for requesting a [`PasswordReset`] of a [`User`].
///
/// The issued [`Token`] is only delivered with a [`Notice`]. Unknown emails
/// succeed silently, so the command never reveals which emails exist.
#[derive(Clone, Debug)]
pub struct RequestPasswordReset {
    /// Email of the [`User`] who forgot the password.
    pub email: user::Email,
}

impl<Db, Bill> Command<RequestPasswordReset> for Service<Db, Bill>
where
    Db: for<'l> Database<
            Select<By<Option<User>, &'l user::Email>>,
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
    type Ok = ();
    type Err = Traced<ExecutionError>;

    async fn execute(
        &self,
        cmd: RequestPasswordReset,
    ) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let RequestPasswordReset { email } = cmd;

        let Some(user) = self
            .database()
            .execute(Select(By::new(&email)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
        else {
            log::debug!("password reset requested for unknown `{email}`");
            return Ok(());
        };

        let tx = self
            .database()
            .execute(Transact)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        // Avoid concurrent actions upon the same `User`.
        tx.execute(Lock(By::new(user.id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        let Some(mut user) = tx
            .execute(Select(By::<Option<User>, _>::new(user.id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
        else {
            return Ok(());
        };
        let (token, reset) =
            PasswordReset::issue(self.config().ttl.password_reset);
        user.password_reset = Some(reset);
        tx.execute(Update(user.clone()))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        tx.execute(Commit)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        self.outbox().dispatch(Notice::PasswordReset {
            email: user.email,
            token,
        });

        Ok(())
    }
}

/// Error of [`RequestPasswordReset`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    Db(database::Error),
}
