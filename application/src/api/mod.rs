//! GraphQL API definitions.

pub mod billing;
pub mod meldung;
pub mod message;
mod mutation;
pub mod notification;
pub mod property;
mod query;
pub mod scalar;
pub mod tenant;
pub mod unit;
pub mod user;

use crate::{define_error, Context};

pub use self::{
    billing::Subscription,
    meldung::Meldung,
    message::Message,
    mutation::Mutation,
    notification::Notification,
    property::Property,
    query::Query,
    tenant::Tenant,
    unit::Unit,
    user::User,
};

/// GraphQL schema.
pub type Schema = juniper::RootNode<
    'static,
    Query,
    Mutation,
    juniper::EmptySubscription<Context>,
>;

/// Creates a new [`Schema`].
#[must_use]
pub fn schema() -> Schema {
    Schema::new(Query, Mutation, juniper::EmptySubscription::new())
}

define_error! {
    enum PrivilegeError {
        #[code = "NOT_LANDLORD"]
        #[status = FORBIDDEN]
        #[message = "Authenticated `User` must be a landlord"]
        Landlord,

        #[code = "NOT_TENANT"]
        #[status = FORBIDDEN]
        #[message = "`User` must be a tenant"]
        Tenant,
    }
}
