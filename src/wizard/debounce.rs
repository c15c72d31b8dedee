//! Trailing-edge debounce for address geocoding.
//!
//! Each keystroke pushes the current address; only the text that stays
//! unchanged for the full delay is looked up.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::api::Geocoder;
use crate::types::Coordinates;

/// A successful lookup for the text it was made for
#[derive(Debug, Clone, PartialEq)]
pub struct Resolution {
    pub address: String,
    pub coordinates: Coordinates,
}

/// Background task coalescing address edits into geocoding lookups.
///
/// Dropping the debouncer cancels any pending lookup.
pub struct AddressDebouncer {
    input: mpsc::UnboundedSender<String>,
    task: JoinHandle<()>,
}

impl AddressDebouncer {
    /// Spawn the debounce task on the current runtime
    pub fn spawn(
        geocoder: Arc<dyn Geocoder>,
        country_code: impl Into<String>,
        delay: Duration,
    ) -> (Self, mpsc::UnboundedReceiver<Resolution>) {
        let (input, edits) = mpsc::unbounded_channel();
        let (output, resolutions) = mpsc::unbounded_channel();
        let task = tokio::spawn(run(geocoder, country_code.into(), delay, edits, output));
        (Self { input, task }, resolutions)
    }

    /// Report the latest address text, restarting the quiet period
    pub fn push(&self, address: impl Into<String>) {
        if self.input.send(address.into()).is_err() {
            warn!("Address debouncer is no longer running");
        }
    }
}

impl Drop for AddressDebouncer {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn run(
    geocoder: Arc<dyn Geocoder>,
    country_code: String,
    delay: Duration,
    mut edits: mpsc::UnboundedReceiver<String>,
    output: mpsc::UnboundedSender<Resolution>,
) {
    let mut pending: Option<String> = None;
    loop {
        if let Some(address) = pending.take() {
            tokio::select! {
                next = edits.recv() => match next {
                    Some(next) => pending = Some(next),
                    None => return,
                },
                () = tokio::time::sleep(delay) => {
                    if !lookup(geocoder.as_ref(), &country_code, address, &output).await {
                        return;
                    }
                }
            }
        } else {
            match edits.recv().await {
                Some(next) => pending = Some(next),
                None => return,
            }
        }
    }
}

/// Returns false once nobody is listening for results
async fn lookup(
    geocoder: &dyn Geocoder,
    country_code: &str,
    address: String,
    output: &mpsc::UnboundedSender<Resolution>,
) -> bool {
    let query = address.trim();
    if query.is_empty() {
        return true;
    }
    match geocoder.geocode(query, country_code).await {
        Ok(Some(coordinates)) => output
            .send(Resolution {
                address,
                coordinates,
            })
            .is_ok(),
        Ok(None) => {
            debug!("No geocoding result for {:?}", query);
            true
        }
        Err(e) => {
            warn!("Geocoding {:?} failed: {}", query, e);
            true
        }
    }
}
