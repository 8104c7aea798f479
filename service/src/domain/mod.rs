//! Domain definitions.

pub mod meldung;
pub mod message;
pub mod notification;
pub mod property;
pub mod tenant;
pub mod unit;
pub mod user;

pub use self::{
    meldung::Meldung, message::Message, notification::Notification,
    property::Property, tenant::Tenant, unit::Unit, user::User,
};
