//! Keeps a window of artifacts around the active index downloaded.
//!
//! The artifact list is published as an immutable snapshot on a watch channel. A
//! finished download swaps in a new snapshot in which only the changed artifact is a
//! new allocation, so observers can tell what changed with [`Arc::ptr_eq`].

use crate::prefetch::artifact::{Artifact, ArtifactListing, ArtifactState};
use crate::prefetch::store::ArtifactStore;
use crate::transport::TransportError;
use bon::bon;
use log::{debug, info, warn};
use std::collections::HashSet;
use std::ops::Range;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use thiserror::Error;
use tokio::sync::{watch, Semaphore};
use tokio_util::sync::CancellationToken;

pub const DEFAULT_WINDOW_SIZE: usize = 8;

/// Snapshot of the artifact list as published to observers.
pub type ArtifactList = Arc<[Arc<Artifact>]>;

#[derive(Debug, Error)]
pub enum PrefetchError {
    #[error("Failed to list artifacts")]
    Listing(#[source] TransportError),
}

/// The `window_size` indices around `active`, shifted inward at either end of a list
/// of `len` artifacts. Covers `min(window_size, len)` indices and always contains
/// `active` when the list is not empty.
pub fn window_bounds(active: usize, len: usize, window_size: usize) -> Range<usize> {
    if len == 0 || window_size == 0 {
        return 0..0;
    }
    let size = window_size.min(len);
    let active = active.min(len - 1);
    let start = active.saturating_sub(size / 2).min(len - size);
    start..start + size
}

struct PrefetchState {
    artifacts: ArtifactList,
    active_index: usize,
    in_flight: HashSet<usize>,
    // Replaced with the artifact list; downloads of an older list never apply.
    listing_token: CancellationToken,
}

struct Shared {
    store: Arc<dyn ArtifactStore>,
    window_size: usize,
    permits: Arc<Semaphore>,
    state: Mutex<PrefetchState>,
    sender: watch::Sender<ArtifactList>,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, PrefetchState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Downloads the artifacts around an active index with bounded concurrency.
///
/// Each artifact is downloaded at most once per list: indices already ready, failed or
/// in flight are skipped. Queued downloads that fall out of the window before they get
/// a permit are dropped.
#[derive(Clone)]
pub struct WindowedPrefetcher {
    shared: Arc<Shared>,
}

#[bon]
impl WindowedPrefetcher {
    #[builder]
    pub fn new(
        store: Arc<dyn ArtifactStore>,
        #[builder(default = DEFAULT_WINDOW_SIZE)] window_size: usize,
        max_concurrent_downloads: Option<usize>,
    ) -> Self {
        let permits = max_concurrent_downloads.unwrap_or(window_size).max(1);
        let (sender, _) = watch::channel(ArtifactList::from(Vec::new()));
        Self {
            shared: Arc::new(Shared {
                store,
                window_size,
                permits: Arc::new(Semaphore::new(permits)),
                state: Mutex::new(PrefetchState {
                    artifacts: ArtifactList::from(Vec::new()),
                    active_index: 0,
                    in_flight: HashSet::new(),
                    listing_token: CancellationToken::new(),
                }),
                sender,
            }),
        }
    }
}

impl WindowedPrefetcher {
    pub fn subscribe(&self) -> watch::Receiver<ArtifactList> {
        self.shared.sender.subscribe()
    }

    pub fn snapshot(&self) -> ArtifactList {
        Arc::clone(&self.shared.lock().artifacts)
    }

    pub fn active_index(&self) -> usize {
        self.shared.lock().active_index
    }

    /// Indices currently kept downloaded.
    pub fn window(&self) -> Range<usize> {
        let state = self.shared.lock();
        window_bounds(state.active_index, state.artifacts.len(), self.shared.window_size)
    }

    /// Fetches the store's listing, orders it by time and installs it.
    pub async fn refresh_listing(&self) -> Result<usize, PrefetchError> {
        let mut listings = self
            .shared
            .store
            .list()
            .await
            .map_err(PrefetchError::Listing)?;
        listings.sort_by_key(|listing| listing.time);
        let count = listings.len();
        info!("Listed {} artifacts", count);
        self.set_artifacts(listings);
        Ok(count)
    }

    /// Replaces the artifact list, dropping the results of downloads still running
    /// for the previous one. The active index is kept, clamped to the new list.
    /// Must be called within a tokio runtime.
    pub fn set_artifacts(&self, listings: Vec<ArtifactListing>) {
        let mut state = self.shared.lock();
        state.listing_token.cancel();
        state.listing_token = CancellationToken::new();
        state.in_flight.clear();
        state.artifacts = listings
            .into_iter()
            .map(|listing| Arc::new(Artifact::from(listing)))
            .collect();
        state.active_index = state.active_index.min(state.artifacts.len().saturating_sub(1));
        self.shared.sender.send_replace(Arc::clone(&state.artifacts));
        self.schedule(&mut state);
    }

    /// Moves the active index (clamped to the list) and starts the downloads its window
    /// still needs. Must be called within a tokio runtime.
    pub fn set_active_index(&self, index: usize) {
        let mut state = self.shared.lock();
        state.active_index = index.min(state.artifacts.len().saturating_sub(1));
        self.schedule(&mut state);
    }

    fn schedule(&self, state: &mut PrefetchState) {
        let window = window_bounds(
            state.active_index,
            state.artifacts.len(),
            self.shared.window_size,
        );
        for index in window {
            if !state.artifacts[index].is_pending() || !state.in_flight.insert(index) {
                continue;
            }
            let id = state.artifacts[index].id.clone();
            debug!("Queueing download of artifact {} ('{}')", index, id);
            tokio::spawn(download(
                Arc::clone(&self.shared),
                state.listing_token.clone(),
                index,
                id,
            ));
        }
    }
}

async fn download(shared: Arc<Shared>, token: CancellationToken, index: usize, id: String) {
    let permit = tokio::select! {
        _ = token.cancelled() => return,
        permit = Arc::clone(&shared.permits).acquire_owned() => permit,
    };
    let Ok(_permit) = permit else {
        return;
    };

    {
        let mut state = shared.lock();
        if token.is_cancelled() {
            return;
        }
        let window = window_bounds(state.active_index, state.artifacts.len(), shared.window_size);
        if !window.contains(&index) {
            debug!("Artifact {} left the window before downloading", index);
            state.in_flight.remove(&index);
            return;
        }
    }

    let result = shared.store.download(&id).await;

    let mut state = shared.lock();
    if token.is_cancelled() {
        return;
    }
    state.in_flight.remove(&index);
    let new_state = match result {
        Ok(pair) => ArtifactState::Ready(Arc::new(pair)),
        Err(e) => {
            warn!("Download of artifact '{}' failed: {}", id, e);
            ArtifactState::Failed
        }
    };
    let mut artifacts = state.artifacts.to_vec();
    artifacts[index] = Arc::new(artifacts[index].with_state(new_state));
    state.artifacts = artifacts.into();
    shared.sender.send_replace(Arc::clone(&state.artifacts));
}
