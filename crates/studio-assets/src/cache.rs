//! Asset slot cache
//!
//! Keyed store of [`AssetSlot`]s with independent loading flags:
//! - at most one in-flight request per slot ([`AssetCache::try_begin`])
//! - updates touch only their own key, so concurrent requests never clobber
//!   each other
//! - [`AssetCache::clear`] starts a new epoch; completions from older epochs
//!   are discarded

use dashmap::DashMap;
use parking_lot::RwLock;
use studio_core::{AssetKind, AssetSlot, Epoch, SlotKey, SlotSnapshot};

/// Proof that the holder owns the in-flight request of one slot
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotTicket {
    key: SlotKey,
    epoch: Epoch,
}

impl SlotTicket {
    /// Slot the ticket belongs to
    #[inline]
    #[must_use]
    pub fn key(&self) -> &SlotKey {
        &self.key
    }

    /// Epoch the request was issued in
    #[inline]
    #[must_use]
    pub fn epoch(&self) -> Epoch {
        self.epoch
    }
}

/// Per-scene slot store
#[derive(Debug, Default)]
pub struct AssetCache {
    slots: DashMap<SlotKey, AssetSlot>,
    /// Guards epoch changes against concurrent begin/complete
    epoch: RwLock<Epoch>,
}

impl AssetCache {
    /// Create an empty cache
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current epoch
    #[must_use]
    pub fn epoch(&self) -> Epoch {
        *self.epoch.read()
    }

    /// Slot state, if the slot was ever requested
    #[must_use]
    pub fn get(&self, key: &SlotKey) -> Option<AssetSlot> {
        self.slots.get(key).map(|slot| slot.clone())
    }

    /// Url of a finished slot
    #[must_use]
    pub fn url(&self, key: &SlotKey) -> Option<String> {
        self.slots.get(key).and_then(|slot| slot.url.clone())
    }

    /// True while a request for `key` is in flight
    #[must_use]
    pub fn is_loading(&self, key: &SlotKey) -> bool {
        self.slots.get(key).is_some_and(|slot| slot.loading)
    }

    /// Number of slots ever requested in this epoch
    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// True when no slot exists
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Mark `key` as loading.
    ///
    /// Returns `None` when a request is already in flight. A previous url is
    /// kept until the new request completes.
    pub fn try_begin(&self, key: &SlotKey) -> Option<SlotTicket> {
        self.begin(key, None)
    }

    /// Mark `key` as loading for a request issued at `issued`.
    ///
    /// Returns `None` if the slot is loading or the cache was cleared since
    /// `issued`; a stale request never receives a ticket for a newer epoch.
    pub fn try_begin_at(&self, key: &SlotKey, issued: Epoch) -> Option<SlotTicket> {
        self.begin(key, Some(issued))
    }

    fn begin(&self, key: &SlotKey, issued: Option<Epoch>) -> Option<SlotTicket> {
        let epoch = self.epoch.read();
        if issued.is_some_and(|issued| issued != *epoch) {
            tracing::debug!("Refusing slot {} for stale epoch", key);
            return None;
        }
        let mut slot = self.slots.entry(key.clone()).or_default();
        if slot.loading {
            return None;
        }
        slot.loading = true;
        slot.error = None;
        Some(SlotTicket {
            key: key.clone(),
            epoch: *epoch,
        })
    }

    /// Store the produced url; returns false if the ticket is stale
    pub fn complete(&self, ticket: &SlotTicket, url: impl Into<String>) -> bool {
        self.finish(ticket, |slot| {
            slot.url = Some(url.into());
            slot.error = None;
        })
    }

    /// Record a failure; returns false if the ticket is stale
    pub fn fail(&self, ticket: &SlotTicket, message: impl Into<String>) -> bool {
        self.finish(ticket, |slot| {
            slot.error = Some(message.into());
        })
    }

    fn finish<F>(&self, ticket: &SlotTicket, update: F) -> bool
    where
        F: FnOnce(&mut AssetSlot),
    {
        let epoch = self.epoch.read();
        if *epoch != ticket.epoch {
            tracing::debug!("Dropping stale result for slot {} ({})", ticket.key, ticket.epoch);
            return false;
        }
        let Some(mut slot) = self.slots.get_mut(&ticket.key) else {
            return false;
        };
        update(&mut slot);
        slot.loading = false;
        true
    }

    /// Remove every slot and start a new epoch
    pub fn clear(&self) -> Epoch {
        let mut epoch = self.epoch.write();
        self.slots.clear();
        *epoch = epoch.next();
        *epoch
    }

    /// Slots of one scene, ordered by kind
    #[must_use]
    pub fn slots_for_scene(&self, scene_index: usize) -> Vec<(AssetKind, AssetSlot)> {
        let mut slots: Vec<(AssetKind, AssetSlot)> = self
            .slots
            .iter()
            .filter(|entry| entry.key().scene_index == scene_index)
            .map(|entry| (entry.key().kind.clone(), entry.value().clone()))
            .collect();
        slots.sort_by(|a, b| a.0.cmp(&b.0));
        slots
    }

    /// Finished slots, ordered by key, for persistence.
    ///
    /// In-flight and failed-without-url slots are not persisted.
    #[must_use]
    pub fn snapshot(&self) -> Vec<SlotSnapshot> {
        let mut entries: Vec<SlotSnapshot> = self
            .slots
            .iter()
            .filter_map(|entry| {
                let url = entry.value().url.clone()?;
                Some(SlotSnapshot {
                    scene_index: entry.key().scene_index,
                    kind: entry.key().kind.clone(),
                    slot: AssetSlot::ready(url),
                })
            })
            .collect();
        entries.sort_by(|a, b| {
            (a.scene_index, &a.kind).cmp(&(b.scene_index, &b.kind))
        });
        entries
    }

    /// Replace all slots with `entries` under a new epoch
    pub fn restore(&self, entries: impl IntoIterator<Item = SlotSnapshot>) -> Epoch {
        let mut epoch = self.epoch.write();
        self.slots.clear();
        for entry in entries {
            let slot = AssetSlot {
                loading: false,
                ..entry.slot
            };
            self.slots.insert(SlotKey::new(entry.scene_index, entry.kind), slot);
        }
        *epoch = epoch.next();
        *epoch
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn key(index: usize, kind: AssetKind) -> SlotKey {
        SlotKey::new(index, kind)
    }

    #[test]
    fn second_begin_is_rejected_while_loading() {
        let cache = AssetCache::new();
        let k = key(0, AssetKind::Image);
        let ticket = cache.try_begin(&k).unwrap();
        assert!(cache.try_begin(&k).is_none());
        assert!(cache.is_loading(&k));

        assert!(cache.complete(&ticket, "https://img/0"));
        assert!(!cache.is_loading(&k));
        assert_eq!(cache.url(&k).as_deref(), Some("https://img/0"));
        assert!(cache.try_begin(&k).is_some());
    }

    #[test]
    fn regeneration_keeps_old_url_until_done() {
        let cache = AssetCache::new();
        let k = key(1, AssetKind::Image);
        let t1 = cache.try_begin(&k).unwrap();
        cache.complete(&t1, "old");
        let t2 = cache.try_begin(&k).unwrap();
        assert_eq!(cache.url(&k).as_deref(), Some("old"));
        cache.complete(&t2, "new");
        assert_eq!(cache.url(&k).as_deref(), Some("new"));
    }

    #[test]
    fn failure_is_scoped_to_its_slot() {
        let cache = AssetCache::new();
        let a = key(2, AssetKind::Image);
        let b = key(3, AssetKind::Image);
        let ta = cache.try_begin(&a).unwrap();
        let tb = cache.try_begin(&b).unwrap();
        cache.fail(&ta, "boom");
        cache.complete(&tb, "fine");

        let slot_a = cache.get(&a).unwrap();
        assert_eq!(slot_a.error.as_deref(), Some("boom"));
        assert!(!slot_a.loading);
        assert_eq!(cache.get(&b).unwrap(), AssetSlot::ready("fine"));
    }

    #[test]
    fn clear_discards_stale_completions() {
        let cache = AssetCache::new();
        let k = key(0, AssetKind::Voice);
        let stale = cache.try_begin(&k).unwrap();
        cache.clear();
        assert!(cache.is_empty());
        assert!(!cache.complete(&stale, "late"));
        assert!(cache.get(&k).is_none());

        let fresh = cache.try_begin(&k).unwrap();
        assert!(!cache.complete(&stale, "late"));
        assert!(cache.is_loading(&k));
        assert!(cache.complete(&fresh, "ok"));
    }

    #[test]
    fn begin_at_an_old_epoch_is_refused() {
        let cache = AssetCache::new();
        let k = key(0, AssetKind::Image);
        let issued = cache.epoch();
        cache.clear();

        assert!(cache.try_begin_at(&k, issued).is_none());
        assert!(cache.get(&k).is_none());
        assert!(cache.try_begin_at(&k, cache.epoch()).is_some());
    }

    #[test]
    fn snapshot_skips_unfinished_and_restore_round_trips() {
        let cache = AssetCache::new();
        let done = cache.try_begin(&key(0, AssetKind::ImageFirst)).unwrap();
        cache.complete(&done, "first");
        let _pending = cache.try_begin(&key(0, AssetKind::ImageLast)).unwrap();
        let failed = cache.try_begin(&key(1, AssetKind::Image)).unwrap();
        cache.fail(&failed, "nope");

        let snapshot = cache.snapshot();
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].kind, AssetKind::ImageFirst);

        let other = AssetCache::new();
        other.restore(snapshot);
        assert_eq!(other.url(&key(0, AssetKind::ImageFirst)).as_deref(), Some("first"));
        assert_eq!(other.slots_for_scene(0).len(), 1);
    }
}
