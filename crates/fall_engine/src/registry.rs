//! Lock-per-track registry of per-subject state.
//!
//! The outer `RwLock` is only held to find or insert a track. Per-frame work
//! happens under the track's own mutex, so unrelated tracks never serialize.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, RwLock};

use contracts::TrackKey;
use pose_engine::SmoothingWindow;
use tracing::debug;

use crate::detector::FallCounters;
use crate::history::TrackHistory;

/// Everything the engine remembers about one subject
#[derive(Debug)]
pub struct TrackState {
    pub window: SmoothingWindow,
    pub history: TrackHistory,
    pub counters: FallCounters,
    /// Registry clock value of the last update
    pub last_seen: u64,
}

impl TrackState {
    pub fn new(window_size: usize, queue_size: usize) -> Self {
        Self {
            window: SmoothingWindow::new(window_size),
            history: TrackHistory::new(queue_size),
            counters: FallCounters::default(),
            last_seen: 0,
        }
    }
}

pub type SharedTrack = Arc<Mutex<TrackState>>;

/// Lock a track, recovering from a poisoned mutex
pub fn lock_track(track: &SharedTrack) -> MutexGuard<'_, TrackState> {
    track.lock().unwrap_or_else(|e| e.into_inner())
}

#[derive(Debug, Default)]
pub struct TrackRegistry {
    tracks: RwLock<HashMap<TrackKey, SharedTrack>>,
    /// Monotonic frame clock, advanced once per processed update
    clock: AtomicU64,
}

impl TrackRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Advance the clock and return the new value
    pub fn tick(&self) -> u64 {
        self.clock.fetch_add(1, Ordering::Relaxed) + 1
    }

    #[inline]
    pub fn now(&self) -> u64 {
        self.clock.load(Ordering::Relaxed)
    }

    /// Look up a track, creating it with `init` on first sight
    pub fn get_or_create(&self, key: &TrackKey, init: impl FnOnce() -> TrackState) -> SharedTrack {
        {
            let tracks = self.tracks.read().unwrap_or_else(|e| e.into_inner());
            if let Some(track) = tracks.get(key) {
                return Arc::clone(track);
            }
        }

        let mut tracks = self.tracks.write().unwrap_or_else(|e| e.into_inner());
        let track = tracks.entry(key.clone()).or_insert_with(|| {
            debug!(track = %key, "new track");
            Arc::new(Mutex::new(init()))
        });
        Arc::clone(track)
    }

    pub fn get(&self, key: &TrackKey) -> Option<SharedTrack> {
        let tracks = self.tracks.read().unwrap_or_else(|e| e.into_inner());
        tracks.get(key).cloned()
    }

    /// Drop one track; returns whether it existed
    pub fn forget_track(&self, key: &TrackKey) -> bool {
        let mut tracks = self.tracks.write().unwrap_or_else(|e| e.into_inner());
        tracks.remove(key).is_some()
    }

    /// Drop every track of one camera; returns how many were removed
    pub fn forget_source(&self, source_id: &str) -> usize {
        let mut tracks = self.tracks.write().unwrap_or_else(|e| e.into_inner());
        let before = tracks.len();
        tracks.retain(|key, _| key.source_id.as_str() != source_id);
        before - tracks.len()
    }

    /// Drop tracks not updated within the last `max_idle_frames` clock ticks
    pub fn evict_idle(&self, max_idle_frames: u64) -> usize {
        let now = self.now();
        let mut tracks = self.tracks.write().unwrap_or_else(|e| e.into_inner());
        let before = tracks.len();
        tracks.retain(|_, track| {
            let last_seen = lock_track(track).last_seen;
            now.saturating_sub(last_seen) <= max_idle_frames
        });
        let evicted = before - tracks.len();
        if evicted > 0 {
            debug!(evicted, remaining = tracks.len(), "evicted idle tracks");
        }
        evicted
    }

    pub fn len(&self) -> usize {
        self.tracks.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Snapshot of the current keys, unordered
    pub fn keys(&self) -> Vec<TrackKey> {
        let tracks = self.tracks.read().unwrap_or_else(|e| e.into_inner());
        tracks.keys().cloned().collect()
    }
}
