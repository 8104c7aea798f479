//! Read entities definitions.

pub mod meldung;
pub mod notification;
pub mod unit;
