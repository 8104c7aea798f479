//! [`Handler`] abstractions.
//!
//! Every command, query, database operation and external collaborator of the
//! platform is expressed as a [`Handler`] of some arguments type, so the
//! business logic only states which operations it requires.

use std::future::Future;

/// Executable handler of `Args`.
pub trait Handler<Args = ()> {
    /// Type of successful [`Handler`] result.
    type Ok;

    /// Type of this [`Handler`] error.
    type Err;

    /// Executes this [`Handler`] with the provided arguments.
    fn execute(
        &self,
        args: Args,
    ) -> impl Future<Output = Result<Self::Ok, Self::Err>>;
}
