//! Network-idle detection over CDP network events
//!
//! Navigation is settled once no more than `max_inflight` requests have been
//! outstanding for a full `idle_window`.

use anyhow::{Context, Result};
use chromiumoxide::Page;
use chromiumoxide::error::CdpError;
use chromiumoxide::cdp::browser_protocol::network::{
    EventLoadingFailed, EventLoadingFinished, EventRequestWillBeSent,
};
use futures::StreamExt;
use std::collections::HashSet;
use std::hash::Hash;
use tokio::time::{Instant, sleep_until};

use super::{NavigationTimedOut, NetworkIdle};

/// Tracks outstanding requests and when the page last became idle.
#[derive(Debug)]
pub struct InflightTracker<K> {
    inflight: HashSet<K>,
    max_inflight: usize,
    idle_since: Option<Instant>,
}

impl<K: Hash + Eq> InflightTracker<K> {
    pub fn new(max_inflight: usize, now: Instant) -> Self {
        Self {
            inflight: HashSet::new(),
            max_inflight,
            idle_since: Some(now),
        }
    }

    pub fn started(&mut self, id: K, now: Instant) {
        // redirects reuse the request id
        self.inflight.insert(id);
        self.refresh(now);
    }

    /// Finished or failed; ids started before tracking began are ignored.
    pub fn ended(&mut self, id: &K, now: Instant) {
        self.inflight.remove(id);
        self.refresh(now);
    }

    #[must_use]
    pub fn inflight(&self) -> usize {
        self.inflight.len()
    }

    /// Instant at which the page has been idle for `window`, if it is idle now.
    #[must_use]
    pub fn idle_deadline(&self, window: std::time::Duration) -> Option<Instant> {
        self.idle_since.map(|since| since + window)
    }

    /// Whether the page has already been idle for a full `window` at `now`
    #[must_use]
    pub fn idle_for(&self, window: std::time::Duration, now: Instant) -> bool {
        self.idle_deadline(window).is_some_and(|deadline| deadline <= now)
    }

    fn refresh(&mut self, now: Instant) {
        if self.inflight.len() <= self.max_inflight {
            self.idle_since.get_or_insert(now);
        } else {
            self.idle_since = None;
        }
    }
}

/// Navigate `page` to `url`, then wait for network idle.
pub async fn goto_and_wait_for_idle(page: &Page, url: &str, idle: &NetworkIdle) -> Result<()> {
    // listeners must exist before navigation so no early request is missed
    let mut requests = page
        .event_listener::<EventRequestWillBeSent>()
        .await
        .context("Failed to listen for requestWillBeSent")?;
    let mut finished = page
        .event_listener::<EventLoadingFinished>()
        .await
        .context("Failed to listen for loadingFinished")?;
    let mut failed = page
        .event_listener::<EventLoadingFailed>()
        .await
        .context("Failed to listen for loadingFailed")?;

    match page.goto(url).await {
        Ok(_) => {}
        Err(CdpError::Timeout) => {
            return Err(NavigationTimedOut {
                url: url.to_string(),
            }
            .into());
        }
        Err(e) => return Err(e).with_context(|| format!("Failed to navigate to {url}")),
    }

    let mut tracker = InflightTracker::new(idle.max_inflight, Instant::now());

    loop {
        // a steady stream of events must not starve the timer branch
        if tracker.idle_for(idle.idle_window, Instant::now()) {
            log::debug!(
                "Network idle for {url} ({} request(s) still in flight)",
                tracker.inflight()
            );
            return Ok(());
        }
        let deadline = tracker.idle_deadline(idle.idle_window);

        tokio::select! {
            biased;

            Some(event) = requests.next() => {
                tracker.started(event.request_id.clone(), Instant::now());
            }
            Some(event) = finished.next() => {
                tracker.ended(&event.request_id, Instant::now());
            }
            Some(event) = failed.next() => {
                tracker.ended(&event.request_id, Instant::now());
            }
            () = sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {
                log::debug!(
                    "Network idle for {url} ({} request(s) still in flight)",
                    tracker.inflight()
                );
                return Ok(());
            }
            else => {
                anyhow::bail!("Page event streams closed while waiting for network idle on {url}");
            }
        }
    }
}
