// ── Lock snapshot subscriptions ──
//
// Consumers hold an `EntityStream` to read the lock list as of their last
// wake-up and to await the next store publish.

mod filter;

use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures_core::Stream;
use tokio::sync::watch;
use tokio_stream::wrappers::WatchStream;

use crate::model::LockDevice;

pub use filter::DeviceFilter;

type Snapshot<T> = Arc<Vec<Arc<T>>>;

/// Subscription to one entity collection of the [`DataStore`](crate::DataStore).
pub struct EntityStream<T: Send + Sync + 'static> {
    seen: Snapshot<T>,
    rx: watch::Receiver<Snapshot<T>>,
}

impl<T: Send + Sync + 'static> EntityStream<T> {
    pub(crate) fn new(rx: watch::Receiver<Snapshot<T>>) -> Self {
        let seen = Arc::clone(&rx.borrow());
        Self { seen, rx }
    }

    /// The snapshot as of subscription or the last [`changed`](Self::changed).
    pub fn current(&self) -> &Snapshot<T> {
        &self.seen
    }

    /// Whatever the store holds right now.
    pub fn latest(&self) -> Snapshot<T> {
        Arc::clone(&self.rx.borrow())
    }

    /// Wait for the next publish. `None` once the store is gone.
    pub async fn changed(&mut self) -> Option<Snapshot<T>> {
        self.rx.changed().await.ok()?;
        self.seen = Arc::clone(&self.rx.borrow_and_update());
        Some(Arc::clone(&self.seen))
    }

    /// Yields the current snapshot, then one per publish.
    pub fn into_stream(self) -> SnapshotStream<T> {
        SnapshotStream {
            inner: WatchStream::new(self.rx),
        }
    }
}

impl EntityStream<LockDevice> {
    /// Locks from the current snapshot that pass `filter`.
    pub fn matching(
        &self,
        filter: DeviceFilter,
        low_battery_threshold: u8,
    ) -> Vec<Arc<LockDevice>> {
        self.seen
            .iter()
            .filter(|d| filter.matches(d, low_battery_threshold))
            .cloned()
            .collect()
    }
}

pub struct SnapshotStream<T: Send + Sync + 'static> {
    inner: WatchStream<Snapshot<T>>,
}

impl<T: Send + Sync + 'static> Stream for SnapshotStream<T> {
    type Item = Snapshot<T>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.inner).poll_next(cx)
    }
}
