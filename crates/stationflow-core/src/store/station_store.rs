// ── Station store ──
//
// Holds the authoritative station list for one shell. Live pushes and
// local create/delete results land here immediately; full listings are
// applied through a refresh token so a fetch that started before a push
// can never roll that push back.

use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use tokio::sync::watch;
use tracing::debug;

use super::EntityCollection;
use crate::model::{Station, StationId};
use crate::stream::StationStream;

/// Marks the mutation sequence at the moment a full fetch started.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct RefreshToken(u64);

/// What `apply_refresh` did with a listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    Applied {
        total: usize,
        /// Entries where a newer push or local change won over the listing.
        kept_newer: usize,
    },
    /// A later refresh was already applied; the listing was discarded.
    Stale,
}

#[derive(Debug, Clone, Copy)]
struct Touch {
    seq: u64,
    removed: bool,
}

pub struct StationStore {
    stations: EntityCollection<StationId, Station>,
    mutation_seq: AtomicU64,
    /// Ids changed by pushes or local mutations since the last applied
    /// refresh, with the sequence of their latest change.
    touched: DashMap<StationId, Touch>,
    applied_refresh: AtomicU64,
    last_full_refresh: watch::Sender<Option<DateTime<Utc>>>,
    last_push: watch::Sender<Option<DateTime<Utc>>>,
    last_heartbeat: watch::Sender<Option<DateTime<Utc>>>,
}

impl StationStore {
    pub fn new() -> Self {
        let (last_full_refresh, _) = watch::channel(None);
        let (last_push, _) = watch::channel(None);
        let (last_heartbeat, _) = watch::channel(None);
        Self {
            stations: EntityCollection::new(),
            mutation_seq: AtomicU64::new(0),
            touched: DashMap::new(),
            applied_refresh: AtomicU64::new(0),
            last_full_refresh,
            last_push,
            last_heartbeat,
        }
    }

    // ── Full refresh ─────────────────────────────────────────────────

    /// Call before issuing `GET /stations`; hand the token back with the
    /// result.
    pub fn begin_refresh(&self) -> RefreshToken {
        RefreshToken(self.mutation_seq.load(Ordering::SeqCst))
    }

    /// Replace the list with `listing`, except for stations pushed,
    /// created or deleted after `token` was taken.
    pub fn apply_refresh(&self, token: RefreshToken, listing: Vec<Station>) -> RefreshOutcome {
        if token.0 < self.applied_refresh.load(Ordering::SeqCst) {
            debug!(?token, "discarding listing older than the applied refresh");
            return RefreshOutcome::Stale;
        }

        let newer: Vec<(StationId, Touch)> = self
            .touched
            .iter()
            .filter(|r| r.value().seq > token.0)
            .map(|r| (r.key().clone(), *r.value()))
            .collect();
        let newer_ids: HashSet<&StationId> = newer.iter().map(|(id, _)| id).collect();

        let mut kept_newer = 0;
        let mut seen = HashSet::new();
        let mut merged: Vec<(StationId, Arc<Station>)> = Vec::with_capacity(listing.len());

        for station in listing {
            if !seen.insert(station.id.clone()) {
                continue;
            }
            if newer_ids.contains(&station.id) {
                kept_newer += 1;
                if let Some(current) = self.stations.get(&station.id) {
                    merged.push((station.id.clone(), current));
                }
                continue;
            }
            merged.push((station.id.clone(), Arc::new(station)));
        }

        for (id, touch) in &newer {
            if touch.removed || seen.contains(id) {
                continue;
            }
            if let Some(current) = self.stations.get(id) {
                kept_newer += 1;
                merged.push((id.clone(), current));
            }
        }

        let total = merged.len();
        self.stations.replace_all(merged);
        self.touched.retain(|_, t| t.seq > token.0);
        self.applied_refresh.fetch_max(token.0, Ordering::SeqCst);
        self.last_full_refresh.send_replace(Some(Utc::now()));

        RefreshOutcome::Applied { total, kept_newer }
    }

    // ── Incremental changes ──────────────────────────────────────────

    /// Apply a live `station-update`. Unknown ids are appended. Returns
    /// `true` if the station was new.
    pub fn apply_push(&self, station: Station) -> bool {
        self.touch(&station.id, false);
        self.last_push.send_replace(Some(Utc::now()));
        let id = station.id.clone();
        self.stations.upsert(id, station)
    }

    /// Merge the result of a successful local create.
    pub fn insert_local(&self, station: Station) {
        self.touch(&station.id, false);
        let id = station.id.clone();
        self.stations.upsert(id, station);
    }

    /// Drop a station after a successful local delete.
    pub fn remove_local(&self, id: &StationId) -> Option<Arc<Station>> {
        self.touch(id, true);
        self.stations.remove(id)
    }

    pub fn record_heartbeat(&self) {
        self.last_heartbeat.send_replace(Some(Utc::now()));
    }

    // ── Reads ────────────────────────────────────────────────────────

    pub fn get(&self, id: &StationId) -> Option<Arc<Station>> {
        self.stations.get(id)
    }

    pub fn contains(&self, id: &StationId) -> bool {
        self.stations.contains(id)
    }

    pub fn snapshot(&self) -> Arc<Vec<Arc<Station>>> {
        self.stations.snapshot()
    }

    pub fn len(&self) -> usize {
        self.stations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn version(&self) -> u64 {
        self.stations.version()
    }

    pub fn subscribe(&self) -> StationStream {
        StationStream::new(self.stations.subscribe())
    }

    // ── Metadata ─────────────────────────────────────────────────────

    pub fn last_full_refresh(&self) -> Option<DateTime<Utc>> {
        *self.last_full_refresh.borrow()
    }

    pub fn last_push(&self) -> Option<DateTime<Utc>> {
        *self.last_push.borrow()
    }

    pub fn last_heartbeat(&self) -> Option<DateTime<Utc>> {
        *self.last_heartbeat.borrow()
    }

    fn touch(&self, id: &StationId, removed: bool) {
        let seq = self.mutation_seq.fetch_add(1, Ordering::SeqCst) + 1;
        self.touched.insert(id.clone(), Touch { seq, removed });
    }
}

impl Default for StationStore {
    fn default() -> Self {
        Self::new()
    }
}
