//! Per-screen view state.
//!
//! Each screen is a [`ScreenModel`]: a plain reducer over fetch results plus a
//! form draft. [`Container`] wraps a model with its load phase and the
//! cancellation token of the current mount, so a result arriving after the
//! screen was left (or re-entered) is discarded instead of applied.
//!
//! Fetch results are streamed: each one is applied as soon as its request
//! finishes, independent of the others still in flight.

pub mod dashboard;
pub mod goals;
pub mod loans;
pub mod transactions;

use async_trait::async_trait;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::api::FinanceApi;
use crate::model::Credential;

pub use dashboard::DashboardScreen;
pub use goals::GoalsScreen;
pub use loans::LoansScreen;
pub use transactions::TransactionsScreen;

/// Lifecycle of a screen's data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoadState {
    #[default]
    Uninitialized,
    Loading,
    Ready,
    /// The primary fetch of this mount failed before any data arrived.
    Failed,
}

/// What a reduced event means for the load phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The screen's primary list (or summary) was replaced.
    PrimaryLoaded,
    /// The primary fetch failed; prior data is untouched.
    PrimaryFailed,
    /// A secondary fetch finished, successfully or not.
    Secondary,
}

/// Cancellation token for one mount of a container.
#[derive(Clone)]
pub struct CancelToken {
    mount_id: u64,
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    fn new(mount_id: u64) -> Self {
        Self {
            mount_id,
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    pub fn mount_id(&self) -> u64 {
        self.mount_id
    }
}

impl fmt::Debug for CancelToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CancelToken")
            .field("mount_id", &self.mount_id)
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}

/// Where a screen's fetches report their results.
pub type EventSink<E> = mpsc::UnboundedSender<E>;

/// View state of one screen, driven by fetch results.
#[async_trait]
pub trait ScreenModel: Send {
    type Event: Send + fmt::Debug;

    /// Name used in logs.
    const NAME: &'static str;

    /// Issue every fetch the screen needs, concurrently, sending one event per
    /// fetch to `sink` the moment that fetch completes.
    async fn fetch(api: &dyn FinanceApi, credential: &Credential, sink: EventSink<Self::Event>);

    /// Apply one fetch result.
    fn reduce(&mut self, event: Self::Event) -> Outcome;
}

/// A screen model plus its load phase and live mount.
pub struct Container<M> {
    model: M,
    phase: LoadState,
    live: Option<CancelToken>,
    /// Credential the live mount was loaded with.
    loaded_for: Option<Credential>,
    mounts: u64,
}

impl<M: ScreenModel + Default> Default for Container<M> {
    fn default() -> Self {
        Self::new(M::default())
    }
}

impl<M: ScreenModel> Container<M> {
    pub fn new(model: M) -> Self {
        Self {
            model,
            phase: LoadState::Uninitialized,
            live: None,
            loaded_for: None,
            mounts: 0,
        }
    }

    pub fn model(&self) -> &M {
        &self.model
    }

    pub fn model_mut(&mut self) -> &mut M {
        &mut self.model
    }

    pub fn phase(&self) -> LoadState {
        self.phase
    }

    pub fn is_mounted(&self) -> bool {
        self.live.is_some()
    }

    /// Mounted and loaded with exactly `credential`.
    pub fn is_loaded_for(&self, credential: &Credential) -> bool {
        self.is_mounted() && self.loaded_for.as_ref() == Some(credential)
    }

    /// Enter `Loading` under a fresh token. Any previous mount is cancelled.
    pub fn mount(&mut self) -> CancelToken {
        if let Some(old) = self.live.take() {
            old.cancel();
        }
        self.loaded_for = None;
        self.mounts += 1;
        let token = CancelToken::new(self.mounts);
        self.live = Some(token.clone());
        self.phase = LoadState::Loading;
        debug!(screen = M::NAME, mount_id = token.mount_id, "mounted");
        token
    }

    /// Cancel the live mount. Cached data stays until the next successful fetch.
    pub fn unmount(&mut self) {
        if let Some(token) = self.live.take() {
            token.cancel();
            debug!(screen = M::NAME, mount_id = token.mount_id, "unmounted");
        }
        self.loaded_for = None;
        self.phase = LoadState::Uninitialized;
    }

    /// Apply `event` if `token` is still the live, uncancelled mount.
    /// Returns whether the event was applied.
    pub fn deliver(&mut self, token: &CancelToken, event: M::Event) -> bool {
        let live = matches!(&self.live, Some(t) if t.mount_id == token.mount_id);
        if !live || token.is_cancelled() {
            debug!(
                screen = M::NAME,
                mount_id = token.mount_id,
                ?event,
                "dropping result for a stale mount"
            );
            return false;
        }

        match self.model.reduce(event) {
            Outcome::PrimaryLoaded => self.phase = LoadState::Ready,
            Outcome::PrimaryFailed if self.phase == LoadState::Loading => {
                self.phase = LoadState::Failed
            }
            Outcome::PrimaryFailed | Outcome::Secondary => {}
        }
        true
    }

    /// Mount and run the screen's fetches to completion, applying each result
    /// as it arrives.
    ///
    /// Dropping the returned future abandons the fetches still in flight;
    /// results already applied stay applied.
    pub async fn load(&mut self, api: &dyn FinanceApi, credential: &Credential) -> LoadState {
        let token = self.mount();
        self.loaded_for = Some(credential.clone());

        let (sink, mut events) = mpsc::unbounded_channel();
        let fetch = M::fetch(api, credential, sink);
        tokio::pin!(fetch);
        let mut fetching = true;

        // The sink lives inside `fetch`; the channel closes once it completes.
        loop {
            tokio::select! {
                _ = &mut fetch, if fetching => fetching = false,
                event = events.recv() => match event {
                    Some(event) => {
                        self.deliver(&token, event);
                    }
                    None => break,
                },
            }
        }
        info!(screen = M::NAME, phase = ?self.phase, "screen loaded");
        self.phase
    }
}

impl<M: ScreenModel + Default> Container<M> {
    /// Unmount and drop all cached data.
    pub fn reset(&mut self) {
        self.unmount();
        self.model = M::default();
    }
}
