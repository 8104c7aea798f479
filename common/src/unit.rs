//! Marker types describing what a typed [`DateTime`] stands for.
//!
//! [`DateTime`]: crate::DateTime

/// Marker type describing an entity creation.
#[derive(Clone, Copy, Debug)]
pub struct Creation;

/// Marker type describing an entity update.
#[derive(Clone, Copy, Debug)]
pub struct Modification;

/// Marker type describing a workflow completion.
#[derive(Clone, Copy, Debug)]
pub struct Completion;

/// Marker type describing an expiration of something time-limited.
#[derive(Clone, Copy, Debug)]
pub struct Expiration;

/// Marker type describing a read receipt.
#[derive(Clone, Copy, Debug)]
pub struct Reading;

/// Marker type describing a planned appointment.
#[derive(Clone, Copy, Debug)]
pub struct Appointment;

/// Marker type describing a lease start (move-in).
#[derive(Clone, Copy, Debug)]
pub struct LeaseStart;
