//! Resolving a queue item to a build.

use super::clock::Clock;
use crate::{BuildNumber, Error, QueueItem, QueueItemId, api::BlockingQueueService};
use std::time::Duration;

/// Default pause between queue polls.
pub const QUEUE_POLL_INTERVAL: Duration = Duration::from_secs(3);

/// Where a queue item stands after [`wait_for_queue_executable`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum QueueState {
    /// Still waiting; only seen between polls.
    Polling,
    /// Single snapshot (no wait budget) of an item that has no build yet.
    Queued,
    /// The server assigned a build.
    Resolved(BuildNumber),
    /// A user (or the server) cancelled the item.
    Cancelled,
    /// The server no longer knows the item.
    NotFound,
    /// The budget ran out before the item resolved.
    TimedOut,
}

impl QueueState {
    fn of(item: &QueueItem) -> Self {
        match item.build_number() {
            Some(number) => Self::Resolved(number),
            None if item.cancelled => Self::Cancelled,
            None => Self::Polling,
        }
    }
}

/// Terminal state plus the last snapshot observed (if any).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct QueueResolution {
    pub state: QueueState,
    pub item: Option<QueueItem>,
}

impl QueueResolution {
    #[must_use]
    pub fn build_number(&self) -> Option<BuildNumber> {
        match self.state {
            QueueState::Resolved(number) => Some(number),
            _ => None,
        }
    }
}

/// Read access to queue items.
pub trait QueueSource {
    /// Fetch a queue item; `Ok(None)` only when `allow_not_found` and the server answered 404.
    fn queue_item(&self, id: QueueItemId, allow_not_found: bool)
    -> Result<Option<QueueItem>, Error>;
}

impl QueueSource for BlockingQueueService {
    fn queue_item(
        &self,
        id: QueueItemId,
        allow_not_found: bool,
    ) -> Result<Option<QueueItem>, Error> {
        if allow_not_found {
            self.find_item(id)
        } else {
            self.item(id).map(Some)
        }
    }
}

/// Poll a queue item until it resolves to a build, is cancelled, disappears or
/// `budget` runs out.
///
/// A zero budget performs exactly one fetch (a 404 is then an error) and never
/// sleeps. Otherwise the deadline is fixed at call time and sleeps are capped
/// at the time left, so no poll starts after the deadline. A budget too large
/// to put a deadline on polls until the item settles.
pub fn wait_for_queue_executable<S, C>(
    source: &S,
    clock: &C,
    id: QueueItemId,
    budget: Duration,
    poll_interval: Duration,
) -> Result<QueueResolution, Error>
where
    S: QueueSource + ?Sized,
    C: Clock + ?Sized,
{
    if budget.is_zero() {
        let item = source.queue_item(id, false)?;
        let state = match &item {
            Some(item) => match QueueState::of(item) {
                QueueState::Polling => QueueState::Queued,
                state => state,
            },
            None => QueueState::NotFound,
        };
        return Ok(QueueResolution { state, item });
    }

    let deadline = clock.now().checked_add(budget);
    let mut last: Option<QueueItem> = None;
    let state = loop {
        if deadline.is_some_and(|deadline| clock.now() > deadline) {
            break QueueState::TimedOut;
        }

        #[cfg(feature = "metrics")]
        crate::transport::metrics::record_poll("queue");
        let Some(item) = source.queue_item(id, true)? else {
            last = None;
            break QueueState::NotFound;
        };
        let state = QueueState::of(&item);
        tracing::debug!(queue_id = %id, ?state, why = item.why.as_deref(), "queue poll");
        last = Some(item);
        if state != QueueState::Polling {
            break state;
        }

        let pause = match deadline {
            Some(deadline) => {
                let remaining = deadline.saturating_duration_since(clock.now());
                if remaining.is_zero() {
                    break QueueState::TimedOut;
                }
                poll_interval.min(remaining)
            }
            None => poll_interval,
        };
        clock.sleep(pause);
    };

    Ok(QueueResolution { state, item: last })
}
