//! [`Command`] for applying a billing provider webhook to a
//! [`Subscription`].

use common::operations::{
    By, Commit, Lock, Select, Transact, Transacted, Update,
};
use derive_more::{Display, Error, From};
use tracerr::Traced;
use tracing as log;

use crate::{
    domain::{
        user::{self, subscription, Subscription},
        User,
    },
    infra::{billing, database, Billing, Database},
    Service,
};

use super::Command;

/// [`Command`] for applying a [`billing::Webhook`] delivered by the billing
/// provider to the [`Subscription`] it's about.
///
/// The delivery is verified with the billing provider before anything is
/// changed. Events not affecting a [`Subscription`] status are accepted
/// and ignored, resulting in [`None`].
#[derive(Clone, Debug)]
pub struct ApplyBillingEvent {
    /// [`billing::WebhookSignature`] the delivery came with.
    pub signature: billing::WebhookSignature,

    /// Raw body of the delivery.
    pub payload: Vec<u8>,
}

impl<Db, Bill> Command<ApplyBillingEvent> for Service<Db, Bill>
where
    Db: for<'l> Database<
            Select<By<Option<User>, &'l subscription::ProviderId>>,
            Ok = Option<User>,
            Err = Traced<database::Error>,
        > + Database<Transact, Err = Traced<database::Error>>,
    Transacted<Db>: Database<
            Lock<By<User, user::Id>>,
            Ok = (),
            Err = Traced<database::Error>,
        > + Database<
            Select<By<Option<User>, user::Id>>,
            Ok = Option<User>,
            Err = Traced<database::Error>,
        > + Database<Update<User>, Ok = (), Err = Traced<database::Error>>
        + Database<Commit, Ok = (), Err = Traced<database::Error>>,
    Bill: Billing<
        billing::VerifyWebhook,
        Ok = bool,
        Err = Traced<billing::Error>,
    >,
{
    type Ok = Option<Subscription>;
    type Err = Traced<ExecutionError>;

    async fn execute(
        &self,
        cmd: ApplyBillingEvent,
    ) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let ApplyBillingEvent { signature, payload } = cmd;

        if !signature.is_complete() {
            return Err(tracerr::new!(E::Unverified));
        }
        let event = serde_json::from_slice::<serde_json::Value>(&payload)
            .map_err(tracerr::from_and_wrap!(=> E))?;
        let webhook = serde_json::from_value::<billing::Webhook>(event.clone())
            .map_err(tracerr::from_and_wrap!(=> E))?;
        let verified = self
            .billing()
            .execute(billing::VerifyWebhook { signature, event })
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;
        if !verified {
            return Err(tracerr::new!(E::Unverified));
        }

        let Some((subscription_id, event)) = webhook.event() else {
            log::debug!("ignoring `{}` billing webhook", webhook.event_type);
            return Ok(None);
        };

        let user_id = self
            .database()
            .execute(Select(By::<Option<User>, _>::new(&subscription_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .ok_or_else(|| E::SubscriptionNotExists(subscription_id.clone()))
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
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        let mut user = tx
            .execute(Select(By::<Option<User>, _>::new(user_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .ok_or_else(|| E::SubscriptionNotExists(subscription_id.clone()))
            .map_err(tracerr::wrap!())?;
        let user::Profile::Landlord {
            subscription: Some(subscription),
        } = &mut user.profile
        else {
            return Err(tracerr::new!(E::SubscriptionNotExists(
                subscription_id
            )));
        };
        if subscription.id != subscription_id {
            return Err(tracerr::new!(E::SubscriptionNotExists(
                subscription_id
            )));
        }
        let status = event.status();
        log::info!(
            "`Subscription(id: {subscription_id})`: {} -> {status} on {event}",
            subscription.status,
        );
        subscription.status = status;
        subscription.updated_at = subscription::ModificationDateTime::now();
        let applied = subscription.clone();
        tx.execute(Update(user))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        tx.execute(Commit)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        Ok(Some(applied))
    }
}

/// Error of [`ApplyBillingEvent`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    Db(database::Error),

    /// Billing provider error.
    #[display("Billing provider failed: {_0}")]
    Billing(billing::Error),

    /// Delivery is not signed by the billing provider.
    #[display("Billing webhook is not verified")]
    #[from(ignore)]
    Unverified,

    /// Delivery is not a [`billing::Webhook`].
    #[display("Malformed billing webhook: {_0}")]
    Malformed(serde_json::Error),

    /// No [`User`] has the [`Subscription`].
    #[display("`Subscription(id: {_0})` does not exist")]
    #[from(ignore)]
    SubscriptionNotExists(#[error(not(source))] subscription::ProviderId),
}

#[cfg(test)]
mod spec {
    use serde_json::json;

    use crate::{
        command::{
            create_subscription, CreateSubscription, ReviseSubscription,
        },
        domain::{
            property, unit,
            user::{self, subscription},
        },
        infra::billing::{self, spec::signature},
        spec::service,
        Command as _,
    };

    use super::{ApplyBillingEvent, ExecutionError};

    fn delivery(event_type: &str, id: &str) -> ApplyBillingEvent {
        ApplyBillingEvent {
            signature: signature(),
            payload: json!({
                "id": "WH-2WR32451HC0233532-67976317FL4543714",
                "event_type": event_type,
                "resource": { "id": id },
            })
            .to_string()
            .into_bytes(),
        }
    }

    #[tokio::test]
    async fn subscription_lifecycle() {
        let (svc, _) = service();
        let landlord = user::spec::with_role(user::Role::Landlord);
        let property = property::spec::owned_by(landlord.id);
        svc.database().put(landlord.clone());
        svc.database().put(property.clone());

        let approval = svc
            .execute(CreateSubscription {
                user_id: landlord.id,
            })
            .await
            .unwrap();
        assert_eq!(*svc.billing().created.lock(), [1], "at least one unit");

        let err = svc
            .execute(CreateSubscription {
                user_id: landlord.id,
            })
            .await
            .unwrap_err();
        assert!(matches!(
            err.as_ref(),
            create_subscription::ExecutionError::SubscriptionExists(_),
        ));

        let active = svc
            .execute(delivery(
                "BILLING.SUBSCRIPTION.ACTIVATED",
                approval.subscription_id.as_ref(),
            ))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(active.status, subscription::Status::Active);

        for _ in 0..3 {
            svc.database().put(unit::spec::vacant(property.id));
        }
        let revised = svc
            .execute(ReviseSubscription {
                user_id: landlord.id,
            })
            .await
            .unwrap();
        assert_eq!(revised.quantity, 3);
        assert_eq!(revised.status, subscription::Status::Active);
        assert_eq!(
            *svc.billing().revised.lock(),
            [(approval.subscription_id.clone(), 3)],
        );

        let cancelled = svc
            .execute(delivery(
                "BILLING.SUBSCRIPTION.CANCELLED",
                approval.subscription_id.as_ref(),
            ))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(cancelled.status, subscription::Status::Cancelled);
        let stored = svc.database().committed().users[&landlord.id].clone();
        assert_eq!(stored.subscription(), Some(&cancelled));
    }

    #[tokio::test]
    async fn forged_delivery_changes_nothing() {
        let (svc, _) = service();
        let landlord = user::spec::with_role(user::Role::Landlord);
        svc.database().put(landlord.clone());
        let approval = svc
            .execute(CreateSubscription {
                user_id: landlord.id,
            })
            .await
            .unwrap();
        *svc.billing().forged.lock() = true;

        let err = svc
            .execute(delivery(
                "BILLING.SUBSCRIPTION.ACTIVATED",
                approval.subscription_id.as_ref(),
            ))
            .await
            .unwrap_err();

        assert!(matches!(err.as_ref(), ExecutionError::Unverified));
        let stored = svc.database().committed().users[&landlord.id].clone();
        assert_eq!(
            stored.subscription().map(|s| s.status),
            Some(subscription::Status::ApprovalPending),
        );
    }

    #[tokio::test]
    async fn unsigned_delivery_is_unverified() {
        let (svc, _) = service();
        let mut unsigned = delivery("BILLING.SUBSCRIPTION.ACTIVATED", "I-1");
        unsigned.signature = billing::WebhookSignature::default();

        let err = svc.execute(unsigned).await.unwrap_err();

        assert!(matches!(err.as_ref(), ExecutionError::Unverified));
    }

    #[tokio::test]
    async fn unrelated_events_are_ignored() {
        let (svc, _) = service();

        let applied = svc
            .execute(delivery("CHECKOUT.ORDER.APPROVED", "5O190127TN364715T"))
            .await
            .unwrap();

        assert!(applied.is_none());
    }

    #[tokio::test]
    async fn unknown_subscription_is_not_found() {
        let (svc, _) = service();

        let err = svc
            .execute(delivery("BILLING.SUBSCRIPTION.PAYMENT.FAILED", "I-X"))
            .await
            .unwrap_err();

        assert!(matches!(
            err.as_ref(),
            ExecutionError::SubscriptionNotExists(_),
        ));
    }
}
