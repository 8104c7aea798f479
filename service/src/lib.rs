//! Service contains the business logic of the application.
//!
//! List of available Cargo features:
#![doc = document_features::document_features!()]
#![deny(
    nonstandard_style,
    rust_2018_idioms,
    rustdoc::all,
    trivial_casts,
    trivial_numeric_casts,
    unsafe_code
)]
#![forbid(non_ascii_idents)]
#![warn(
    clippy::allow_attributes,
    clippy::allow_attributes_without_reason,
    clippy::pedantic,
    clippy::wildcard_enum_match_arm,
    deprecated_in_future,
    missing_copy_implementations,
    missing_debug_implementations,
    missing_docs,
    unreachable_pub,
    unused_crate_dependencies,
    unused_import_braces,
    unused_labels,
    unused_lifetimes,
    unused_qualifications,
    unused_results
)]

pub mod command;
pub mod domain;
pub mod infra;
pub mod query;
pub mod read;
pub mod task;

use std::{error::Error, time::Duration};

use common::operations::Start;
use derive_more::Debug;
use smart_default::SmartDefault;

#[cfg(doc)]
use infra::{Billing, Database, Notifier};

pub use self::{command::Command, query::Query, task::Task};

/// [`Service`] configuration.
#[derive(Clone, Debug)]
pub struct Config {
    /// [JWT] encoding key.
    ///
    /// [JWT]: https://datatracker.ietf.org/doc/html/rfc7519
    #[debug(skip)]
    pub jwt_encoding_key: jsonwebtoken::EncodingKey,

    /// [JWT] decoding key.
    ///
    /// [JWT]: https://datatracker.ietf.org/doc/html/rfc7519
    #[debug(skip)]
    pub jwt_decoding_key: jsonwebtoken::DecodingKey,

    /// Lifetimes of the issued tokens.
    pub ttl: Ttl,
}

/// Lifetimes of the tokens issued by a [`Service`].
#[derive(Clone, Copy, Debug, SmartDefault)]
pub struct Ttl {
    /// Lifetime of a [`domain::user::Session`].
    #[default(Duration::from_secs(30 * 60))]
    pub session: Duration,

    /// Lifetime of a [`domain::tenant::Invitation`].
    #[default(Duration::from_secs(24 * 60 * 60))]
    pub invitation: Duration,

    /// Lifetime of a [`domain::user::PasswordReset`].
    #[default(Duration::from_secs(60 * 60))]
    pub password_reset: Duration,
}

/// Domain service.
#[derive(Clone, Debug)]
pub struct Service<Db, Bill> {
    /// Configuration of this [`Service`].
    config: Config,

    /// [`Database`] of this [`Service`].
    database: Db,

    /// [`Billing`] provider of this [`Service`].
    billing: Bill,

    /// [`infra::Images`] source of this [`Service`].
    images: infra::Images,

    /// [`task::Outbox`] queueing the [`infra::Notice`]s of this [`Service`].
    outbox: task::Outbox,
}

impl<Db, Bill> Service<Db, Bill> {
    /// Creates a new [`Service`] with the provided parameters.
    ///
    /// [`infra::Notice`]s are delivered with the provided [`Notifier`] by the
    /// returned [`task::Background`].
    pub fn new<N>(
        config: Config,
        database: Db,
        billing: Bill,
        notifier: N,
    ) -> (Self, task::Background)
    where
        task::DeliverNotices<N>:
            Task<Start<task::Inbox>, Ok = (), Err: Error> + 'static,
    {
        let (outbox, inbox) = task::Outbox::channel();
        let this = Self {
            config,
            database,
            billing,
            images: infra::Images::default(),
            outbox,
        };

        let mut bg = task::Background::default();
        let deliver = task::DeliverNotices::new(notifier);
        bg.spawn("deliver_notices", async move {
            deliver.execute(Start(inbox)).await
        });

        (this, bg)
    }

    /// Returns [`Config`] of this [`Service`].
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Returns [`Database`] of this [`Service`].
    #[must_use]
    pub fn database(&self) -> &Db {
        &self.database
    }

    /// Returns [`Billing`] provider of this [`Service`].
    #[must_use]
    pub fn billing(&self) -> &Bill {
        &self.billing
    }

    /// Returns [`infra::Images`] source of this [`Service`].
    #[must_use]
    pub fn images(&self) -> &infra::Images {
        &self.images
    }

    /// Returns [`task::Outbox`] of this [`Service`].
    #[must_use]
    pub fn outbox(&self) -> &task::Outbox {
        &self.outbox
    }
}

#[cfg(test)]
pub(crate) mod spec {
    use std::sync::Arc;

    use jsonwebtoken::{DecodingKey, EncodingKey};

    use crate::{
        infra::{billing, database::memory::Memory, Images},
        task, Config, Service, Ttl,
    };

    /// [`Service`] over the in-memory database used in tests.
    pub(crate) type TestService = Service<Memory, billing::spec::Recording>;

    /// Creates a new [`TestService`] along with its queued notices.
    pub(crate) fn service() -> (TestService, task::Inbox) {
        let (outbox, inbox) = task::Outbox::channel();
        let svc = Service {
            config: Config {
                jwt_encoding_key: EncodingKey::from_secret(b"secret"),
                jwt_decoding_key: DecodingKey::from_secret(b"secret"),
                ttl: Ttl::default(),
            },
            database: Memory::default(),
            billing: billing::spec::Recording::default(),
            images: Images::Fixed(Arc::default()),
            outbox,
        };
        (svc, inbox)
    }
}

#[cfg(test)]
mod scenario {
    use secrecy::SecretBox;

    use crate::{
        command::{
            create_tenant::spec::{fixture, invitation},
            ActivateTenant, AssignMeldung, CreateMeldung, UpdateMeldungStatus,
        },
        domain::{meldung, property, unit, user},
        infra::Notice,
        query,
        spec::service,
        Command as _, Query as _,
    };

    #[tokio::test]
    async fn meldung_lifecycle() {
        let (svc, mut inbox) = service();
        let owner = user::spec::with_role(user::Role::Landlord);
        let property = property::spec::owned_by(owner.id);
        let unit = unit::spec::vacant(property.id);
        let mut tenant = user::spec::with_role(user::Role::Tenant);
        tenant.profile = user::Profile::Tenant {
            assigned_unit: Some(unit.id),
        };
        let craftsman = user::spec::with_role(user::Role::Craftsman);
        for u in [&owner, &tenant, &craftsman] {
            svc.database().put(u.clone());
        }
        svc.database().put(property);
        svc.database().put(unit.clone());

        let filed = svc
            .execute(CreateMeldung {
                reporter_id: tenant.id,
                title: meldung::Title::new("Wasserhahn tropft").unwrap(),
                description: meldung::Description::new("In der Küche.")
                    .unwrap(),
                priority: meldung::Priority::default(),
                images: vec![],
                estimated_cost: None,
            })
            .await
            .unwrap();
        assert_eq!(filed.status, meldung::Status::Offen);
        assert_eq!(filed.unit_id, unit.id);

        let assigned = svc
            .execute(AssignMeldung {
                user_id: owner.id,
                role: user::Role::Landlord,
                meldung_id: filed.id,
                craftsman_id: craftsman.id,
            })
            .await
            .unwrap();
        assert_eq!(assigned.status, meldung::Status::InBearbeitung);
        assert_eq!(assigned.assigned_to, Some(craftsman.id));
        _ = inbox.drain();

        let update = |user_id, role, status| UpdateMeldungStatus {
            user_id,
            role,
            meldung_id: filed.id,
            status,
            note: None,
            actual_cost: None,
        };
        _ = svc
            .execute(update(
                craftsman.id,
                user::Role::Craftsman,
                meldung::Status::HandwerkerErledigt,
            ))
            .await
            .unwrap();
        let [Notice::Report {
            recipient_id,
            meldung_id,
            ..
        }] = <[Notice; 1]>::try_from(inbox.drain()).unwrap()
        else {
            panic!("expected the owner to be notified");
        };
        assert_eq!(recipient_id, owner.id);
        assert_eq!(meldung_id, filed.id);
        let seen = svc
            .execute(query::notification::ByProperty {
                user_id: owner.id,
                property_id: unit.property_id,
            })
            .await
            .unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].meldung_id, Some(filed.id));

        let closed = svc
            .execute(update(
                tenant.id,
                user::Role::Tenant,
                meldung::Status::Abgeschlossen,
            ))
            .await
            .unwrap();
        let completed_at = closed.completed_at;
        assert!(completed_at.is_some());

        let stored = svc.database().committed().meldungen[&filed.id].clone();
        assert_eq!(stored.status, meldung::Status::Abgeschlossen);
        assert_eq!(stored.completed_at, completed_at);
    }

    #[tokio::test]
    async fn invited_tenant_moves_in() {
        let (svc, mut inbox, property, unit) = fixture();

        let tenant = svc
            .execute(invitation(&property, &unit, "mia@example.org"))
            .await
            .unwrap();
        let pending = svc.database().committed().units[&unit.id].clone();
        assert_eq!(pending.pending_tenant, Some(tenant.id));
        assert_eq!(pending.status, unit::Status::Vacant);

        let [Notice::Invitation { token, .. }] =
            <[Notice; 1]>::try_from(inbox.drain()).unwrap()
        else {
            panic!("expected a single invitation notice");
        };
        let user = svc
            .execute(ActivateTenant {
                token,
                password: SecretBox::new(Box::new(user::spec::password())),
            })
            .await
            .unwrap();

        let state = svc.database().committed();
        assert_eq!(state.users[&user.id].assigned_unit(), Some(unit.id));
        let occupied = &state.units[&unit.id];
        assert_eq!(occupied.current_tenant, Some(user.id));
        assert_eq!(occupied.pending_tenant, None);
        assert_eq!(occupied.status, unit::Status::Occupied);
        assert!(state.tenants[&tenant.id].is_active);
    }

    #[tokio::test]
    async fn craftsman_reads_thread_once_assigned() {
        let (svc, _) = service();
        let owner = user::spec::with_role(user::Role::Landlord);
        let property = property::spec::owned_by(owner.id);
        let unit = unit::spec::vacant(property.id);
        let craftsman = user::spec::with_role(user::Role::Craftsman);
        let filed = meldung::spec::filed(unit.id, user::Id::new());
        svc.database().put(owner.clone());
        svc.database().put(craftsman.clone());
        svc.database().put(property);
        svc.database().put(unit);
        svc.database().put(filed.clone());

        let thread = query::meldung::Thread {
            user_id: craftsman.id,
            role: user::Role::Craftsman,
            meldung_id: filed.id,
        };
        let err = svc.execute(thread).await.unwrap_err();
        assert!(matches!(
            err.as_ref(),
            query::meldung::ExecutionError::Forbidden(_),
        ));

        _ = svc
            .execute(AssignMeldung {
                user_id: owner.id,
                role: user::Role::Landlord,
                meldung_id: filed.id,
                craftsman_id: craftsman.id,
            })
            .await
            .unwrap();

        let read = svc.execute(thread).await.unwrap();
        assert_eq!(read.meldung.id, filed.id);
        assert!(read.messages.is_empty());
    }
}
