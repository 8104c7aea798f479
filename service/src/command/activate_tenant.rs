//! [`Command`] for activating a [`Tenant`] invitation.

use common::{
    operations::{
        By, Commit, Insert, Lock, Select, Transact, Transacted, Update,
    },
    DateTime,
};
use derive_more::{Display, Error, From};
use secrecy::{ExposeSecret as _, SecretBox};
use tracerr::Traced;
use tracing as log;

#[cfg(doc)]
use crate::domain::tenant::Invitation;
use crate::{
    domain::{tenant, unit, user, Tenant, Unit, User},
    infra::{database, Database},
    Service,
};

use super::Command;

/// [`Command`] for activating a [`Tenant`] invitation with its
/// [`tenant::InvitationToken`].
///
/// Creates the tenant [`User`], moves it into the [`Unit`] the invitation is
/// pending for and marks the [`Tenant`] as active, all at once.
#[derive(Clone, Debug)]
pub struct ActivateTenant {
    /// [`tenant::InvitationToken`] of the [`Invitation`].
    pub token: tenant::InvitationToken,

    /// [`user::Password`] of the created [`User`].
    pub password: SecretBox<user::Password>,
}

impl<Db, Bill> Command<ActivateTenant> for Service<Db, Bill>
where
    Db: for<'l> Database<
            Select<By<Option<Tenant>, &'l tenant::InvitationToken>>,
            Ok = Option<Tenant>,
            Err = Traced<database::Error>,
        > + for<'l> Database<
            Select<By<Option<User>, &'l user::Email>>,
            Ok = Option<User>,
            Err = Traced<database::Error>,
        > + Database<Transact, Err = Traced<database::Error>>,
    Transacted<Db>: Database<
            Lock<By<Tenant, tenant::Id>>,
            Ok = (),
            Err = Traced<database::Error>,
        > + Database<
            Select<By<Option<Tenant>, tenant::Id>>,
            Ok = Option<Tenant>,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<Option<Unit>, tenant::Id>>,
            Ok = Option<Unit>,
            Err = Traced<database::Error>,
        > + Database<
            Lock<By<Unit, unit::Id>>,
            Ok = (),
            Err = Traced<database::Error>,
        > + Database<
            Select<By<Option<Unit>, unit::Id>>,
            Ok = Option<Unit>,
            Err = Traced<database::Error>,
        > + Database<
            Lock<By<User, user::Id>>,
            Ok = (),
            Err = Traced<database::Error>,
        > + Database<
            Select<By<Option<User>, user::Id>>,
            Ok = Option<User>,
            Err = Traced<database::Error>,
        > + Database<Insert<User>, Ok = (), Err = Traced<database::Error>>
        + Database<Update<User>, Ok = (), Err = Traced<database::Error>>
        + Database<Update<Unit>, Ok = (), Err = Traced<database::Error>>
        + Database<Update<Tenant>, Ok = (), Err = Traced<database::Error>>
        + Database<Commit, Ok = (), Err = Traced<database::Error>>,
{
    type Ok = User;
    type Err = Traced<ExecutionError>;

    async fn execute(
        &self,
        cmd: ActivateTenant,
    ) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let ActivateTenant { token, password } = cmd;

        let tenant_id = self
            .database()
            .execute(Select(By::<Option<Tenant>, _>::new(&token)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .filter(|t| t.accepts(&token))
            .ok_or(E::InvalidOrExpiredToken)
            .map_err(tracerr::wrap!())?
            .id;

        let tx = self
            .database()
            .execute(Transact)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        // Avoid concurrent activations of the same `Tenant`.
        tx.execute(Lock(By::new(tenant_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        let mut tenant = tx
            .execute(Select(By::<Option<Tenant>, _>::new(tenant_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .filter(|t| t.accepts(&token))
            .ok_or(E::InvalidOrExpiredToken)
            .map_err(tracerr::wrap!())?;

        let registered = self
            .database()
            .execute(Select(By::<Option<User>, _>::new(&tenant.email)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;
        if registered.is_some() {
            return Err(tracerr::new!(E::EmailOccupied(tenant.email)));
        }

        let unit = match tx
            .execute(Select(By::<Option<Unit>, _>::new(tenant.id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
        {
            Some(pending) => {
                tx.execute(Lock(By::new(pending.id)))
                    .await
                    .map_err(tracerr::map_from_and_wrap!(=> E))?;
                tx.execute(Select(By::<Option<Unit>, _>::new(pending.id)))
                    .await
                    .map_err(tracerr::map_from_and_wrap!(=> E))?
                    .filter(|u| u.pending_tenant == Some(tenant.id))
            }
            None => None,
        };

        let user = User {
            id: user::Id::new(),
            name: tenant.name.clone(),
            email: tenant.email.clone(),
            password_hash: user::PasswordHash::new(password.expose_secret()),
            phone: tenant.phone.clone(),
            profile: user::Profile::Tenant {
                assigned_unit: unit.as_ref().map(|u| u.id),
            },
            password_reset: None,
            created_at: DateTime::now().coerce(),
        };
        tx.execute(Insert(user.clone()))
            .await
            .map_err(|e| {
                if e.as_ref().is_unique_violation(Some("users_email_key")) {
                    tracerr::new!(E::EmailOccupied(user.email.clone()))
                } else {
                    tracerr::map_from_and_wrap!(=> E)(e)
                }
            })?;

        if let Some(mut unit) = unit {
            if let Some(evicted_id) = unit.occupy(user.id) {
                log::warn!(
                    "`User(id: {evicted_id})` evicted from `Unit(id: {})` \
                     having a pending invitation",
                    unit.id,
                );
                tx.execute(Lock(By::<User, _>::new(evicted_id)))
                    .await
                    .map_err(tracerr::map_from_and_wrap!(=> E))?;
                let evicted = tx
                    .execute(Select(By::<Option<User>, _>::new(evicted_id)))
                    .await
                    .map_err(tracerr::map_from_and_wrap!(=> E))?
                    .filter(|u| u.assigned_unit() == Some(unit.id));
                if let Some(mut evicted) = evicted {
                    evicted.profile = user::Profile::Tenant {
                        assigned_unit: None,
                    };
                    tx.execute(Update(evicted))
                        .await
                        .map_err(tracerr::map_from_and_wrap!(=> E))?;
                }
            }
            tx.execute(Update(unit))
                .await
                .map_err(tracerr::map_from_and_wrap!(=> E))?;
        } else {
            log::debug!(
                "`Tenant(id: {})` activated without a pending `Unit`",
                tenant.id,
            );
        }

        tenant.activate(user.id);
        tx.execute(Update(tenant))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        tx.execute(Commit)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        Ok(user)
    }
}

/// Error of [`ActivateTenant`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    Db(database::Error),

    /// [`tenant::InvitationToken`] is unknown, expired or used already.
    #[display("Invitation token is invalid or expired")]
    InvalidOrExpiredToken,

    /// [`User`] with the invited email exists already.
    #[display("`{_0}` email is occupied")]
    #[from(ignore)]
    EmailOccupied(#[error(not(source))] user::Email),
}

#[cfg(test)]
mod spec {
    use std::time::Duration;

    use secrecy::SecretBox;

    use crate::{
        command::create_tenant::spec::{fixture, invitation},
        domain::{tenant, unit, user},
        Command as _,
    };

    use super::{ActivateTenant, ExecutionError};

    fn activation(token: tenant::InvitationToken) -> ActivateTenant {
        ActivateTenant {
            token,
            password: SecretBox::new(Box::new(user::spec::password())),
        }
    }

    #[tokio::test]
    async fn moves_tenant_in() {
        let (svc, _, property, unit) = fixture();
        let tenant = svc
            .execute(invitation(&property, &unit, "jonas@example.org"))
            .await
            .unwrap();
        let token = tenant.invitation.clone().unwrap().token;

        let user = svc.execute(activation(token.clone())).await.unwrap();

        assert_eq!(user.role(), user::Role::Tenant);
        assert_eq!(user.assigned_unit(), Some(unit.id));
        assert_eq!(user.email, tenant.email);

        let state = svc.database().committed();
        let stored = &state.units[&unit.id];
        assert_eq!(stored.current_tenant, Some(user.id));
        assert_eq!(stored.pending_tenant, None);
        assert_eq!(stored.status, unit::Status::Occupied);
        let tenant = &state.tenants[&tenant.id];
        assert!(tenant.is_active);
        assert_eq!(tenant.user_id, Some(user.id));
        assert!(tenant.invitation.is_none());

        let err = svc.execute(activation(token)).await.unwrap_err();
        assert!(matches!(err.as_ref(), ExecutionError::InvalidOrExpiredToken));
        assert_eq!(svc.database().committed().users.len(), 2);
    }

    #[tokio::test]
    async fn expired_token_changes_nothing() {
        let (svc, _, property, unit) = fixture();
        let mut tenant = svc
            .execute(invitation(&property, &unit, "jonas@example.org"))
            .await
            .unwrap();
        let inv = tenant.invitation.as_mut().unwrap();
        inv.expires_at =
            tenant::ExpirationDateTime::now() - Duration::from_secs(1);
        let token = inv.token.clone();
        svc.database().put(tenant.clone());
        let before = svc.database().committed();

        let err = svc.execute(activation(token)).await.unwrap_err();

        assert!(matches!(err.as_ref(), ExecutionError::InvalidOrExpiredToken));
        let after = svc.database().committed();
        assert_eq!(after.users.len(), before.users.len());
        assert_eq!(after.units[&unit.id], before.units[&unit.id]);
        assert_eq!(after.tenants[&tenant.id], before.tenants[&tenant.id]);
    }

    #[tokio::test]
    async fn failed_write_rolls_back() {
        let (svc, _, property, unit) = fixture();
        let tenant = svc
            .execute(invitation(&property, &unit, "jonas@example.org"))
            .await
            .unwrap();
        let token = tenant.invitation.clone().unwrap().token;
        svc.database().fail_on("Update<Tenant>");

        assert!(svc.execute(activation(token)).await.is_err());

        let state = svc.database().committed();
        assert_eq!(state.units[&unit.id].pending_tenant, Some(tenant.id));
        assert_eq!(state.units[&unit.id].current_tenant, None);
        assert!(!state.tenants[&tenant.id].is_active);
        assert_eq!(state.users.len(), 1);
    }

    #[tokio::test]
    async fn evicted_resident_loses_unit() {
        let (svc, _, property, unit) = fixture();
        let tenant = svc
            .execute(invitation(&property, &unit, "jonas@example.org"))
            .await
            .unwrap();
        let token = tenant.invitation.clone().unwrap().token;
        let mut unit = svc.database().committed().units[&unit.id].clone();
        let mut resident = user::spec::with_role(user::Role::Tenant);
        resident.profile = user::Profile::Tenant {
            assigned_unit: Some(unit.id),
        };
        unit.current_tenant = Some(resident.id);
        svc.database().put(unit.clone());
        svc.database().put(resident.clone());

        let user = svc.execute(activation(token)).await.unwrap();

        let state = svc.database().committed();
        assert_eq!(state.units[&unit.id].current_tenant, Some(user.id));
        assert_eq!(state.users[&resident.id].assigned_unit(), None);
        assert_eq!(state.users[&user.id].assigned_unit(), Some(unit.id));
    }
}
