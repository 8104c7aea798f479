//! [`Query`] collection related to [`Notification`]s.

use common::operations::{By, Select};
use derive_more::{Display, Error, From};
use tracerr::Traced;

use crate::{
    domain::{property, unit, user, Notification, Property, Unit, User},
    infra::{database, Database},
    read, Query, Service,
};

/// [`Query`] of the [`Notification`]s of a [`Property`] shown to a [`User`],
/// newest first.
#[derive(Clone, Copy, Debug)]
pub struct ByProperty {
    /// ID of the [`User`] reading the [`Notification`]s.
    pub user_id: user::Id,

    /// ID of the [`Property`] the [`Notification`]s are published for.
    pub property_id: property::Id,
}

impl<Db, Bill> Query<ByProperty> for Service<Db, Bill>
where
    Db: Database<
            Select<By<Option<Property>, property::Id>>,
            Ok = Option<Property>,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<Option<User>, user::Id>>,
            Ok = Option<User>,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<Option<Unit>, unit::Id>>,
            Ok = Option<Unit>,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<Vec<Notification>, property::Id>>,
            Ok = Vec<Notification>,
            Err = Traced<database::Error>,
        >,
{
    type Ok = Vec<Notification>;
    type Err = Traced<ExecutionError>;

    async fn execute(&self, q: ByProperty) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let ByProperty {
            user_id,
            property_id,
        } = q;

        let property = self
            .database()
            .execute(Select(By::<Option<Property>, _>::new(property_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .ok_or(E::PropertyNotExists(property_id))
            .map_err(tracerr::wrap!())?;
        let user = self
            .database()
            .execute(Select(By::<Option<User>, _>::new(user_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .ok_or(E::Forbidden(property_id))
            .map_err(tracerr::wrap!())?;
        let residence = match user.assigned_unit() {
            Some(unit_id) => self
                .database()
                .execute(Select(By::<Option<Unit>, _>::new(unit_id)))
                .await
                .map_err(tracerr::map_from_and_wrap!(=> E))?,
            None => None,
        };
        if !read::notification::visible_to(&property, &user, residence.as_ref())
        {
            return Err(tracerr::new!(E::Forbidden(property_id)));
        }

        self.database()
            .execute(Select(By::<Vec<Notification>, _>::new(property_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
    }
}

/// Error of [`ByProperty`] [`Query`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    Db(database::Error),

    /// [`Property`] doesn't exist.
    #[display("`Property(id: {_0})` does not exist")]
    #[from(ignore)]
    PropertyNotExists(#[error(not(source))] property::Id),

    /// [`User`] is neither the owner nor a resident of the [`Property`].
    #[display("`Property(id: {_0})` notifications are not accessible")]
    #[from(ignore)]
    Forbidden(#[error(not(source))] property::Id),
}

#[cfg(test)]
mod spec {
    use crate::{
        command::CreateNotification,
        domain::{notification, property, unit, user},
        spec::service,
        Command as _, Query as _,
    };

    use super::{ByProperty, ExecutionError};

    #[tokio::test]
    async fn shown_to_owner_and_residents() {
        let (svc, _) = service();
        let owner = user::spec::with_role(user::Role::Landlord);
        let property = property::spec::owned_by(owner.id);
        let mut unit = unit::spec::vacant(property.id);
        let mut resident = user::spec::with_role(user::Role::Tenant);
        resident.profile = user::Profile::Tenant {
            assigned_unit: Some(unit.id),
        };
        _ = unit.occupy(resident.id);
        let neighbour = user::spec::with_role(user::Role::Tenant);
        for u in [&owner, &resident, &neighbour] {
            svc.database().put(u.clone());
        }
        svc.database().put(property.clone());
        svc.database().put(unit);

        for title in ["Hoffest", "Wasser abgestellt"] {
            _ = svc
                .execute(CreateNotification {
                    creator_id: owner.id,
                    property_id: property.id,
                    kind: notification::Kind::Announcement,
                    priority: notification::Priority::Medium,
                    title: notification::Title::new(title).unwrap(),
                    message: notification::Text::new("Details folgen.")
                        .unwrap(),
                    meldung_id: None,
                })
                .await
                .unwrap();
        }

        for user_id in [owner.id, resident.id] {
            let shown = svc
                .execute(ByProperty {
                    user_id,
                    property_id: property.id,
                })
                .await
                .unwrap();
            assert_eq!(shown.len(), 2);
        }

        let err = svc
            .execute(ByProperty {
                user_id: neighbour.id,
                property_id: property.id,
            })
            .await
            .unwrap_err();
        assert!(matches!(err.as_ref(), ExecutionError::Forbidden(_)));
    }
}
