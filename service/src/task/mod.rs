//! Background [`Task`]s definitions.

mod background;
pub mod deliver_notices;

pub use common::Handler as Task;

pub use self::{
    background::Background,
    deliver_notices::{DeliverNotices, Inbox, Outbox},
};
