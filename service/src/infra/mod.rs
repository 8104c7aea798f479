//! Infrastructure layer.

pub mod billing;
pub mod database;
pub mod document;
pub mod image;
pub mod notifier;

pub use self::{
    billing::Billing,
    database::Database,
    document::Document,
    image::Images,
    notifier::{Notice, Notifier},
};
#[cfg(feature = "postgres")]
pub use self::database::{postgres, Postgres};
