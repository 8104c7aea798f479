//! [`Command`] for authorizing a [`User`].

use common::operations::{By, Select};
use derive_more::{Display, Error, From};
use jsonwebtoken::Validation;
use tracerr::Traced;

use crate::{
    domain::{
        user::{self, session, Identity, Session},
        User,
    },
    infra::{database, Database},
    Service,
};

use super::Command;

/// [`Command`] for authorizing a [`User`] by a [`Session`] token.
///
/// The resulting [`Identity`] carries the [`user::Role`] the [`User`] has
/// right now.
#[derive(Clone, Debug, From)]
pub struct AuthorizeUserSession {
    /// [`Session`] token to authorize.
    pub token: session::Token,
}

impl<Db, Bill> Command<AuthorizeUserSession> for Service<Db, Bill>
where
    Db: Database<
        Select<By<Option<User>, user::Id>>,
        Ok = Option<User>,
        Err = Traced<database::Error>,
    >,
{
    type Ok = Identity;
    type Err = Traced<ExecutionError>;

    async fn execute(
        &self,
        cmd: AuthorizeUserSession,
    ) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let AuthorizeUserSession { token } = cmd;

        let session = jsonwebtoken::decode::<Session>(
            token.as_ref(),
            &self.config().jwt_decoding_key,
            &Validation::default(),
        )
        .map_err(tracerr::from_and_wrap!(=> E))?
        .claims;

        let user = self
            .database()
            .execute(Select(By::new(session.user_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .ok_or(E::UserNotExists(session.user_id))
            .map_err(tracerr::wrap!())?;

        Ok(Identity {
            user_id: user.id,
            role: user.role(),
            expires_at: session.expires_at,
        })
    }
}

/// Error of [`AuthorizeUserSession`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    Db(database::Error),

    /// [`jsonwebtoken`] decoding error.
    #[display("Failed to decode a JSON Web Token: {_0}")]
    JsonWebTokenDecodeError(jsonwebtoken::errors::Error),

    /// [`User`] the [`Session`] belongs to does not exist.
    #[display("`User(id: {_0})` does not exist")]
    #[from(ignore)]
    UserNotExists(#[error(not(source))] user::Id),
}

#[cfg(test)]
mod spec {
    use secrecy::SecretBox;

    use crate::{
        command::{create_user_session, CreateUserSession},
        domain::user,
        spec::service,
        Command as _,
    };

    use super::{AuthorizeUserSession, ExecutionError};

    #[tokio::test]
    async fn issues_and_authorizes_session() {
        let (svc, _) = service();
        let craftsman = user::spec::with_role(user::Role::Craftsman);
        svc.database().put(craftsman.clone());

        let create_user_session::Output { token, user, .. } = svc
            .execute(CreateUserSession::ByCredentials {
                email: craftsman.email.clone(),
                password: SecretBox::new(Box::new(user::spec::password())),
            })
            .await
            .unwrap();
        assert_eq!(user.id, craftsman.id);

        let identity =
            svc.execute(AuthorizeUserSession { token }).await.unwrap();
        assert_eq!(identity.user_id, craftsman.id);
        assert_eq!(identity.role, user::Role::Craftsman);
    }

    #[tokio::test]
    async fn rejects_wrong_password() {
        let (svc, _) = service();
        let landlord = user::spec::with_role(user::Role::Landlord);
        svc.database().put(landlord.clone());

        let err = svc
            .execute(CreateUserSession::ByCredentials {
                email: landlord.email,
                password: SecretBox::new(Box::new(
                    user::Password::new("falsches-passwort").unwrap(),
                )),
            })
            .await
            .unwrap_err();

        assert!(matches!(
            err.as_ref(),
            create_user_session::ExecutionError::WrongCredentials,
        ));
    }

    #[tokio::test]
    async fn rejects_session_of_removed_user() {
        let (svc, _) = service();
        let tenant = user::spec::with_role(user::Role::Tenant);
        svc.database().put(tenant.clone());
        let create_user_session::Output { token, .. } = svc
            .execute(CreateUserSession::ByUserId(tenant.id))
            .await
            .unwrap();
        _ = svc.database().state().users.remove(&tenant.id);

        let err =
            svc.execute(AuthorizeUserSession { token }).await.unwrap_err();

        assert!(matches!(err.as_ref(), ExecutionError::UserNotExists(_)));
    }
}
