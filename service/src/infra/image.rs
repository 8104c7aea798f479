//! [`Images`] source downloading the pictures attached to [`Message`]s.
//!
//! [`Message`]: crate::domain::Message

#[cfg(test)]
use std::{collections::HashMap, sync::Arc};
use std::time::Duration;

use common::Handler;
use derive_more::{Display, Error as StdError, From};
use tracerr::Traced;

/// Maximum time a single download may take.
const TIMEOUT: Duration = Duration::from_secs(10);

/// Maximum size of a downloaded image in bytes.
const MAX_SIZE: u64 = 8 * 1024 * 1024;

/// Operation of downloading the image stored under the provided URL.
#[derive(Clone, Debug)]
pub struct Fetch(pub String);

/// Source of image bytes.
#[derive(Clone, Debug)]
pub enum Images {
    /// Downloads images over HTTP.
    Http(reqwest::Client),

    /// Serves images from memory, keyed by URL.
    #[cfg(test)]
    Fixed(Arc<HashMap<String, Vec<u8>>>),
}

impl Default for Images {
    fn default() -> Self {
        Self::Http(reqwest::Client::new())
    }
}

impl Handler<Fetch> for Images {
    type Ok = Vec<u8>;
    type Err = Traced<Error>;

    async fn execute(&self, Fetch(url): Fetch) -> Result<Self::Ok, Self::Err> {
        match self {
            Self::Http(client) => {
                let resp = client
                    .get(&url)
                    .timeout(TIMEOUT)
                    .send()
                    .await
                    .map_err(tracerr::from_and_wrap!(=> Error))?
                    .error_for_status()
                    .map_err(tracerr::from_and_wrap!(=> Error))?;
                if resp.content_length().is_some_and(|l| l > MAX_SIZE) {
                    return Err(tracerr::new!(Error::TooLarge));
                }
                let bytes = resp
                    .bytes()
                    .await
                    .map_err(tracerr::from_and_wrap!(=> Error))?;
                if u64::try_from(bytes.len()).map_or(true, |l| l > MAX_SIZE) {
                    return Err(tracerr::new!(Error::TooLarge));
                }
                Ok(bytes.to_vec())
            }
            #[cfg(test)]
            Self::Fixed(files) => files
                .get(&url)
                .cloned()
                .ok_or_else(|| tracerr::new!(Error::Missing)),
        }
    }
}

/// [`Images`] error.
#[derive(Debug, Display, From, StdError)]
pub enum Error {
    /// HTTP request failed.
    #[display("Image download failed: {_0}")]
    Http(reqwest::Error),

    /// Image exceeds the size limit.
    #[display("Image exceeds {MAX_SIZE} bytes")]
    #[from(ignore)]
    TooLarge,

    /// No image is stored under the URL.
    #[cfg(test)]
    #[display("No image is stored under the URL")]
    #[from(ignore)]
    Missing,
}
