//! [`Command`] for inviting a new [`Tenant`] into a [`Unit`].

use common::{
    operations::{
        By, Commit, Delete, Insert, Lock, Select, Transact, Transacted,
        Update,
    },
    DateTime,
};
use derive_more::{Display, Error, From};
use tracerr::Traced;
use tracing as log;

use crate::{
    domain::{
        property,
        tenant::{self, Invitation},
        unit, user, Property, Tenant, Unit, User,
    },
    infra::{database, Database, Notice},
    Service,
};

use super::Command;

/// [`Command`] for inviting a new [`Tenant`] into a vacant [`Unit`].
///
/// Stale inactive invitations of the same email are dropped, and a pending
/// invitation of the [`Unit`] is superseded by the new one. The invitation
/// [`Notice`] is dispatched once everything is committed.
#[derive(Clone, Debug)]
pub struct CreateTenant {
    /// ID of the landlord [`User`] inviting the [`Tenant`].
    pub landlord_id: user::Id,

    /// ID of the [`Property`] the [`Unit`] belongs to.
    pub property_id: property::Id,

    /// ID of the [`Unit`] the [`Tenant`] is invited into.
    pub unit_id: unit::Id,

    /// Name of the invited person.
    pub name: user::Name,

    /// Email of the invited person.
    pub email: user::Email,

    /// Phone of the invited person.
    pub phone: Option<user::Phone>,

    /// [`DateTime`] when the invited person moves in.
    pub move_in: tenant::MoveInDateTime,
}

impl<Db, Bill> Command<CreateTenant> for Service<Db, Bill>
where
    Db: Database<
            Select<By<Option<Property>, property::Id>>,
            Ok = Option<Property>,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<Option<Unit>, unit::Id>>,
            Ok = Option<Unit>,
            Err = Traced<database::Error>,
        > + for<'l> Database<
            Select<By<Vec<Tenant>, &'l user::Email>>,
            Ok = Vec<Tenant>,
            Err = Traced<database::Error>,
        > + for<'l> Database<
            Select<By<Option<User>, &'l user::Email>>,
            Ok = Option<User>,
            Err = Traced<database::Error>,
        > + Database<Transact, Err = Traced<database::Error>>,
    Transacted<Db>: Database<
            Lock<By<Unit, unit::Id>>,
            Ok = (),
            Err = Traced<database::Error>,
        > + Database<
            Select<By<Option<Unit>, unit::Id>>,
            Ok = Option<Unit>,
            Err = Traced<database::Error>,
        > + for<'l> Database<
            Select<By<Vec<Tenant>, &'l user::Email>>,
            Ok = Vec<Tenant>,
            Err = Traced<database::Error>,
        > + Database<
            Delete<By<Tenant, tenant::Id>>,
            Ok = (),
            Err = Traced<database::Error>,
        > + Database<Insert<Tenant>, Ok = (), Err = Traced<database::Error>>
        + Database<Update<Unit>, Ok = (), Err = Traced<database::Error>>
        + Database<Commit, Ok = (), Err = Traced<database::Error>>,
{
    type Ok = Tenant;
    type Err = Traced<ExecutionError>;

    async fn execute(&self, cmd: CreateTenant) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let CreateTenant {
            landlord_id,
            property_id,
            unit_id,
            name,
            email,
            phone,
            move_in,
        } = cmd;

        let property = self
            .database()
            .execute(Select(By::<Option<Property>, _>::new(property_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .ok_or(E::PropertyNotExists(property_id))
            .map_err(tracerr::wrap!())?;
        if property.owner_id != landlord_id {
            return Err(tracerr::new!(E::NotOwner(property_id)));
        }
        _ = self
            .database()
            .execute(Select(By::<Option<Unit>, _>::new(unit_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .filter(|u| u.property_id == property_id)
            .ok_or(E::UnitNotExists(unit_id))
            .map_err(tracerr::wrap!())?;

        let invited = self
            .database()
            .execute(Select(By::<Vec<Tenant>, _>::new(&email)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;
        if invited.iter().any(|t| t.is_active) {
            return Err(tracerr::new!(E::TenantExists(email)));
        }
        let registered = self
            .database()
            .execute(Select(By::<Option<User>, _>::new(&email)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;
        if registered.is_some() {
            return Err(tracerr::new!(E::EmailOccupied(email)));
        }

        let tx = self
            .database()
            .execute(Transact)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        // Avoid concurrent invitations into the same `Unit`.
        tx.execute(Lock(By::new(unit_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        let mut unit = tx
            .execute(Select(By::<Option<Unit>, _>::new(unit_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .ok_or(E::UnitNotExists(unit_id))
            .map_err(tracerr::wrap!())?;
        if unit.is_occupied() {
            return Err(tracerr::new!(E::UnitOccupied(unit_id)));
        }

        let stale = tx
            .execute(Select(By::<Vec<Tenant>, _>::new(&email)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .into_iter()
            .filter(|t| !t.is_active)
            .map(|t| t.id)
            .collect::<Vec<_>>();
        for id in &stale {
            tx.execute(Delete(By::new(*id)))
                .await
                .map_err(tracerr::map_from_and_wrap!(=> E))?;
        }

        let tenant = Tenant {
            id: tenant::Id::new(),
            name,
            email,
            phone,
            property_id,
            unit_id,
            move_in,
            invitation: Some(Invitation::issue(self.config().ttl.invitation)),
            user_id: None,
            is_active: false,
            created_at: DateTime::now().coerce(),
        };
        tx.execute(Insert(tenant.clone()))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        if let Some(superseded) = unit.invite(tenant.id, move_in.coerce()) {
            log::debug!(
                "`Tenant(id: {superseded})` invitation superseded in \
                 `Unit(id: {unit_id})`",
            );
            if !stale.contains(&superseded) {
                tx.execute(Delete(By::new(superseded)))
                    .await
                    .map_err(tracerr::map_from_and_wrap!(=> E))?;
            }
        }
        tx.execute(Update(unit))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        tx.execute(Commit)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        if let Some(invitation) = &tenant.invitation {
            self.outbox().dispatch(Notice::Invitation {
                email: tenant.email.clone(),
                name: tenant.name.clone(),
                token: invitation.token.clone(),
                property: Some(property.name),
            });
        }

        Ok(tenant)
    }
}

/// Error of [`CreateTenant`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    Db(database::Error),

    /// [`Property`] doesn't exist.
    #[display("`Property(id: {_0})` does not exist")]
    #[from(ignore)]
    PropertyNotExists(#[error(not(source))] property::Id),

    /// [`Property`] is owned by someone else.
    #[display("`Property(id: {_0})` is not owned by the landlord")]
    #[from(ignore)]
    NotOwner(#[error(not(source))] property::Id),

    /// [`Unit`] doesn't exist in the [`Property`].
    #[display("`Unit(id: {_0})` does not exist")]
    #[from(ignore)]
    UnitNotExists(#[error(not(source))] unit::Id),

    /// [`Unit`] is occupied already.
    #[display("`Unit(id: {_0})` is occupied")]
    #[from(ignore)]
    UnitOccupied(#[error(not(source))] unit::Id),

    /// Active [`Tenant`] with the email exists already.
    #[display("active `Tenant` with `{_0}` email exists")]
    #[from(ignore)]
    TenantExists(#[error(not(source))] user::Email),

    /// [`User`] with the email exists already.
    #[display("`{_0}` email is occupied")]
    #[from(ignore)]
    EmailOccupied(#[error(not(source))] user::Email),
}

#[cfg(test)]
pub(crate) mod spec {
    use common::DateTime;

    use crate::{
        domain::{property, unit, user, Property, Tenant, Unit},
        infra::Notice,
        spec::{service, TestService},
        task, Command as _,
    };

    use super::{CreateTenant, ExecutionError};

    /// Creates a landlord owning a [`Property`] with a single vacant [`Unit`].
    pub(crate) fn fixture() -> (TestService, task::Inbox, Property, Unit) {
        let (svc, inbox) = service();
        let landlord = user::spec::with_role(user::Role::Landlord);
        let property = property::spec::owned_by(landlord.id);
        let unit = unit::spec::vacant(property.id);
        svc.database().put(landlord);
        svc.database().put(property.clone());
        svc.database().put(unit.clone());
        (svc, inbox, property, unit)
    }

    pub(crate) fn invitation(
        property: &Property,
        unit: &Unit,
        email: &str,
    ) -> CreateTenant {
        CreateTenant {
            landlord_id: property.owner_id,
            property_id: property.id,
            unit_id: unit.id,
            name: user::Name::new("Jonas Weber").unwrap(),
            email: user::Email::new(email).unwrap(),
            phone: None,
            move_in: DateTime::now().coerce(),
        }
    }

    #[tokio::test]
    async fn binds_pending_invitation() {
        let (svc, mut inbox, property, unit) = fixture();

        let tenant = svc
            .execute(invitation(&property, &unit, "jonas@example.org"))
            .await
            .unwrap();

        let state = svc.database().committed();
        let stored = &state.units[&unit.id];
        assert_eq!(stored.pending_tenant, Some(tenant.id));
        assert_eq!(stored.status, unit::Status::Vacant);
        assert!(!state.tenants[&tenant.id].is_active);

        let [Notice::Invitation { token, property: name, .. }] =
            <[Notice; 1]>::try_from(inbox.drain()).unwrap()
        else {
            panic!("expected a single invitation notice");
        };
        assert_eq!(Some(token), tenant.invitation.map(|i| i.token));
        assert_eq!(name, Some(property.name));
    }

    #[tokio::test]
    async fn second_invitation_supersedes_first() {
        let (svc, _, property, mut unit) = fixture();
        let first = svc
            .execute(invitation(&property, &unit, "erste@example.org"))
            .await
            .unwrap();

        unit.status = unit::Status::Maintenance;
        unit.pending_tenant = Some(first.id);
        svc.database().put(unit.clone());

        let second = svc
            .execute(invitation(&property, &unit, "zweite@example.org"))
            .await
            .unwrap();

        let state = svc.database().committed();
        assert!(!state.tenants.contains_key(&first.id));
        assert_eq!(state.units[&unit.id].pending_tenant, Some(second.id));
        assert_eq!(state.units[&unit.id].status, unit::Status::Vacant);
    }

    #[tokio::test]
    async fn drops_stale_invitations_of_email() {
        let (svc, _, property, unit) = fixture();
        let other = unit::spec::vacant(property.id);
        svc.database().put(other.clone());

        let first = svc
            .execute(invitation(&property, &unit, "jonas@example.org"))
            .await
            .unwrap();
        let second = svc
            .execute(invitation(&property, &other, "jonas@example.org"))
            .await
            .unwrap();

        let tenants: Vec<Tenant> =
            svc.database().committed().tenants.into_values().collect();
        assert_eq!(tenants.len(), 1);
        assert_eq!(tenants[0].id, second.id);
        assert_ne!(first.id, second.id);
    }

    #[tokio::test]
    async fn rejects_occupied_unit() {
        let (svc, mut inbox, property, mut unit) = fixture();
        unit.current_tenant = Some(user::Id::new());
        svc.database().put(unit.clone());

        let err = svc
            .execute(invitation(&property, &unit, "jonas@example.org"))
            .await
            .unwrap_err();

        assert!(matches!(err.as_ref(), ExecutionError::UnitOccupied(_)));
        assert!(svc.database().committed().tenants.is_empty());
        assert!(inbox.drain().is_empty());
    }

    #[tokio::test]
    async fn rejects_registered_email() {
        let (svc, _, property, unit) = fixture();
        let existing = user::spec::with_role(user::Role::Craftsman);
        svc.database().put(existing.clone());

        let err = svc
            .execute(invitation(&property, &unit, &existing.email.to_string()))
            .await
            .unwrap_err();

        assert!(matches!(err.as_ref(), ExecutionError::EmailOccupied(_)));
    }

    #[tokio::test]
    async fn rejects_foreign_landlord() {
        let (svc, _, property, unit) = fixture();
        let mut cmd = invitation(&property, &unit, "jonas@example.org");
        cmd.landlord_id = user::Id::new();

        let err = svc.execute(cmd).await.unwrap_err();

        assert!(matches!(err.as_ref(), ExecutionError::NotOwner(_)));
    }
}
