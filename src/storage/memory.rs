use crate::{
    objects::{Ceremony, HistoryEntry, PendingVerification},
    CoordinatorError,
};

use dashmap::DashMap;
use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
    Mutex,
    RwLock,
};
use time::OffsetDateTime;
use tracing::{error, trace};

///
/// The storage slot of a single ceremony.
///
/// Writers are serialized by `writer` and publish a new immutable snapshot
/// into `current` on commit. Readers only clone the current snapshot.
///
struct CeremonySlot {
    writer: Mutex<()>,
    current: RwLock<Arc<Ceremony>>,
}

impl CeremonySlot {
    fn new(ceremony: Ceremony) -> Self {
        Self {
            writer: Mutex::new(()),
            current: RwLock::new(Arc::new(ceremony)),
        }
    }

    fn snapshot(&self) -> Result<Arc<Ceremony>, CoordinatorError> {
        match self.current.read() {
            Ok(current) => Ok(current.clone()),
            Err(_) => Err(CoordinatorError::StorageFailed),
        }
    }
}

/// The in-memory store of all ceremonies and the global contribution history.
pub struct Memory {
    /// The map of ceremony IDs to their storage slots.
    ceremonies: DashMap<String, Arc<CeremonySlot>>,
    /// The append-only log of accepted contributions, sharded by ceremony ID.
    history: DashMap<String, Vec<HistoryEntry>>,
    /// The map of ceremony IDs to keys awaiting verifier quorum.
    pending_verifications: DashMap<String, PendingVerification>,
    /// The creation counter for ceremonies.
    ceremony_sequence: AtomicU64,
    /// The global counter for history entries.
    history_sequence: AtomicU64,
}

impl Memory {
    /// Creates a new, empty instance of `Memory`.
    #[inline]
    pub fn new() -> Self {
        Self {
            ceremonies: DashMap::new(),
            history: DashMap::new(),
            pending_verifications: DashMap::new(),
            ceremony_sequence: AtomicU64::new(0),
            history_sequence: AtomicU64::new(0),
        }
    }

    /// Returns the next ceremony creation sequence number.
    #[inline]
    pub(crate) fn next_ceremony_sequence(&self) -> u64 {
        self.ceremony_sequence.fetch_add(1, Ordering::SeqCst)
    }

    /// Returns the number of ceremonies in storage.
    #[inline]
    pub fn number_of_ceremonies(&self) -> usize {
        self.ceremonies.len()
    }

    ///
    /// Inserts a new ceremony into storage.
    ///
    /// Fails if a ceremony with the same ID already exists.
    ///
    #[inline]
    pub(crate) fn insert(&self, ceremony: Ceremony) -> Result<Arc<Ceremony>, CoordinatorError> {
        let id = ceremony.id().to_string();
        match self.ceremonies.entry(id.clone()) {
            dashmap::mapref::entry::Entry::Occupied(_) => Err(CoordinatorError::CeremonyAlreadyExists(id)),
            dashmap::mapref::entry::Entry::Vacant(entry) => {
                let slot = entry.insert(Arc::new(CeremonySlot::new(ceremony)));
                slot.snapshot()
            }
        }
    }

    /// Returns the latest snapshot of the given ceremony.
    #[inline]
    pub fn get(&self, ceremony_id: &str) -> Result<Arc<Ceremony>, CoordinatorError> {
        self.slot(ceremony_id)?.snapshot()
    }

    /// Returns the latest snapshot of every ceremony, in creation order.
    #[inline]
    pub fn snapshots(&self) -> Result<Vec<Arc<Ceremony>>, CoordinatorError> {
        // Collect the slots first so no shard lock is held while reading snapshots.
        let slots: Vec<Arc<CeremonySlot>> = self.ceremonies.iter().map(|entry| entry.value().clone()).collect();

        let mut snapshots = slots
            .iter()
            .map(|slot| slot.snapshot())
            .collect::<Result<Vec<_>, _>>()?;
        snapshots.sort_by_key(|ceremony| ceremony.sequence());
        Ok(snapshots)
    }

    ///
    /// Applies the given command to the latest state of a ceremony and publishes the result.
    ///
    /// The command runs while holding the writer lock of that ceremony only.
    /// If `expected_version` is set and the ceremony has been committed to since,
    /// the command is not run. If the command fails, nothing is published.
    ///
    pub(crate) fn update<T, F>(
        &self,
        ceremony_id: &str,
        expected_version: Option<u64>,
        command: F,
    ) -> Result<(T, Arc<Ceremony>), CoordinatorError>
    where
        F: FnOnce(&mut Ceremony) -> Result<T, CoordinatorError>,
    {
        let (output, _, ceremony) = self.update_and_publish(ceremony_id, expected_version, command, |_, _| ())?;
        Ok((output, ceremony))
    }

    ///
    /// Applies the given command like `update`, and runs `publish` on the committed
    /// state before readers can observe it.
    ///
    /// `publish` runs once the command has succeeded, while the writer lock and the
    /// snapshot lock of the ceremony are both held. Anything it makes visible elsewhere
    /// is therefore in place before the new snapshot is. It must not read this
    /// ceremony back from storage.
    ///
    pub(crate) fn update_and_publish<T, R, F, P>(
        &self,
        ceremony_id: &str,
        expected_version: Option<u64>,
        command: F,
        publish: P,
    ) -> Result<(T, R, Arc<Ceremony>), CoordinatorError>
    where
        F: FnOnce(&mut Ceremony) -> Result<T, CoordinatorError>,
        P: FnOnce(&Ceremony, &T) -> R,
    {
        let slot = self.slot(ceremony_id)?;

        // Acquire the writer lock for this ceremony.
        let _writer = match slot.writer.lock() {
            Ok(writer) => writer,
            Err(_) => {
                error!("The writer lock of ceremony {} is poisoned", ceremony_id);
                return Err(CoordinatorError::StorageFailed);
            }
        };

        let current = slot.snapshot()?;

        // Check that no commit happened since the caller read the ceremony.
        if let Some(expected_version) = expected_version {
            if current.version() != expected_version {
                trace!(
                    "Ceremony {} is at version {}, expected {}",
                    ceremony_id,
                    current.version(),
                    expected_version
                );
                return Err(CoordinatorError::ConcurrentModification(ceremony_id.to_string()));
            }
        }

        let mut next = (*current).clone();
        let output = command(&mut next)?;
        next.increment_version();
        let next = Arc::new(next);

        let mut current = match slot.current.write() {
            Ok(current) => current,
            Err(_) => return Err(CoordinatorError::StorageFailed),
        };
        let published = publish(&next, &output);
        *current = next.clone();
        drop(current);

        trace!("Committed version {} of ceremony {}", next.version(), ceremony_id);
        Ok((output, published, next))
    }

    ///
    /// Appends an accepted contribution to the global history log.
    ///
    #[inline]
    pub(crate) fn append_history(
        &self,
        ceremony_id: &str,
        participant_id: &str,
        contribution_order: u64,
        timestamp: OffsetDateTime,
        hash: &str,
    ) -> HistoryEntry {
        let entry = HistoryEntry {
            sequence: self.history_sequence.fetch_add(1, Ordering::SeqCst),
            ceremony_id: ceremony_id.to_string(),
            participant_id: participant_id.to_string(),
            contribution_order,
            timestamp,
            hash: hash.to_string(),
        };
        self.history
            .entry(ceremony_id.to_string())
            .or_insert_with(Vec::new)
            .push(entry.clone());
        entry
    }

    /// Returns the history log of the given ceremony, in append order.
    #[inline]
    pub fn history(&self, ceremony_id: &str) -> Vec<HistoryEntry> {
        let mut entries = match self.history.get(ceremony_id) {
            Some(entries) => entries.value().clone(),
            None => vec![],
        };
        entries.sort_by_key(|entry| entry.sequence);
        entries
    }

    #[inline]
    pub(crate) fn insert_pending_verification(&self, pending: PendingVerification) {
        self.pending_verifications.insert(pending.ceremony_id.clone(), pending);
    }

    #[inline]
    pub fn pending_verification(&self, ceremony_id: &str) -> Option<PendingVerification> {
        self.pending_verifications
            .get(ceremony_id)
            .map(|pending| pending.value().clone())
    }

    #[inline]
    pub(crate) fn remove_pending_verification(&self, ceremony_id: &str) -> Option<PendingVerification> {
        self.pending_verifications
            .remove(ceremony_id)
            .map(|(_, pending)| pending)
    }

    #[inline]
    fn slot(&self, ceremony_id: &str) -> Result<Arc<CeremonySlot>, CoordinatorError> {
        match self.ceremonies.get(ceremony_id) {
            Some(slot) => Ok(slot.value().clone()),
            None => Err(CoordinatorError::CeremonyNotFound(ceremony_id.to_string())),
        }
    }
}

impl Default for Memory {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        objects::{DistributionConfig, SecurityLevel, ValidationOptions},
        ErrorKind,
    };

    fn test_ceremony(memory: &Memory, id: &str) -> Ceremony {
        Ceremony::new(
            id.to_string(),
            memory.next_ceremony_sequence(),
            "c1".to_string(),
            "Test".to_string(),
            SecurityLevel::Standard,
            2,
            ValidationOptions::default(),
            DistributionConfig::new(vec!["standard".to_string()]),
            OffsetDateTime::now_utc(),
        )
    }

    #[test]
    fn test_insert_and_get() {
        let memory = Memory::new();
        memory.insert(test_ceremony(&memory, "a")).unwrap();

        assert_eq!("a", memory.get("a").unwrap().id());
        assert_eq!(ErrorKind::NotFound, memory.get("b").unwrap_err().kind());

        let error = memory.insert(test_ceremony(&memory, "a")).unwrap_err();
        assert_eq!(ErrorKind::Conflict, error.kind());
    }

    #[test]
    fn test_snapshots_are_in_creation_order() {
        let memory = Memory::new();
        for id in &["c", "a", "d", "b"] {
            memory.insert(test_ceremony(&memory, id)).unwrap();
        }

        let ids: Vec<String> = memory
            .snapshots()
            .unwrap()
            .iter()
            .map(|ceremony| ceremony.id().to_string())
            .collect();
        assert_eq!(vec!["c", "a", "d", "b"], ids);
    }

    #[test]
    fn test_failed_update_publishes_nothing() {
        let memory = Memory::new();
        memory.insert(test_ceremony(&memory, "a")).unwrap();
        let before = memory.get("a").unwrap();

        let result: Result<((), _), _> = memory.update("a", None, |ceremony| {
            ceremony.abort("test".to_string(), OffsetDateTime::now_utc())?;
            Err(CoordinatorError::StorageFailed)
        });
        assert!(result.is_err());

        let after = memory.get("a").unwrap();
        assert_eq!(before, after);
        assert_eq!(0, after.version());
    }

    #[test]
    fn test_update_checks_expected_version() {
        let memory = Memory::new();
        memory.insert(test_ceremony(&memory, "a")).unwrap();

        let (_, ceremony) = memory.update("a", Some(0), |_| Ok(())).unwrap();
        assert_eq!(1, ceremony.version());

        let error = memory.update("a", Some(0), |_| Ok(())).unwrap_err();
        assert_eq!(ErrorKind::Conflict, error.kind());
        assert_eq!(1, memory.get("a").unwrap().version());
    }

    #[test]
    fn test_publish_runs_only_after_a_successful_command() {
        let memory = Memory::new();
        memory.insert(test_ceremony(&memory, "a")).unwrap();

        let mut published = false;
        let result: Result<((), (), _), _> = memory.update_and_publish(
            "a",
            None,
            |_| Err(CoordinatorError::StorageFailed),
            |_, _| published = true,
        );
        assert!(result.is_err());
        assert!(!published);

        let result: Result<((), (), _), _> =
            memory.update_and_publish("a", Some(7), |_| Ok(()), |_, _| published = true);
        assert_eq!(ErrorKind::Conflict, result.unwrap_err().kind());
        assert!(!published);

        let (output, seen, ceremony) = memory
            .update_and_publish("a", Some(0), |_| Ok(3u64), |ceremony, output| (ceremony.version(), *output))
            .unwrap();
        assert_eq!(3, output);
        assert_eq!((1, 3), seen);
        assert_eq!(1, ceremony.version());
    }

    #[test]
    fn test_publish_completes_before_the_snapshot_is_visible() {
        let memory = Arc::new(Memory::new());
        memory.insert(test_ceremony(&memory, "a")).unwrap();
        let marker = Arc::new(AtomicU64::new(0));

        let reader = {
            let memory = memory.clone();
            let marker = marker.clone();
            std::thread::spawn(move || loop {
                let ceremony = memory.get("a").unwrap();
                if ceremony.version() > 0 {
                    assert!(marker.load(Ordering::SeqCst) >= ceremony.version());
                }
                if ceremony.version() == 50 {
                    break;
                }
            })
        };

        for _ in 0..50 {
            memory
                .update_and_publish(
                    "a",
                    None,
                    |_| Ok(()),
                    |ceremony, _| marker.store(ceremony.version(), Ordering::SeqCst),
                )
                .unwrap();
        }
        reader.join().unwrap();
    }

    #[test]
    fn test_snapshot_is_unaffected_by_later_commits() {
        let memory = Memory::new();
        memory.insert(test_ceremony(&memory, "a")).unwrap();
        let snapshot = memory.get("a").unwrap();

        memory
            .update("a", None, |ceremony| ceremony.abort("test".to_string(), OffsetDateTime::now_utc()))
            .unwrap();

        assert_eq!(crate::objects::CeremonyStatus::Initialized, snapshot.status());
        assert_eq!(crate::objects::CeremonyStatus::Failed, memory.get("a").unwrap().status());
    }

    #[test]
    fn test_history_is_per_ceremony_and_ordered() {
        let memory = Memory::new();
        let now = OffsetDateTime::now_utc();
        memory.append_history("a", "p1", 1, now, "h1");
        memory.append_history("b", "p1", 1, now, "h2");
        memory.append_history("a", "p2", 2, now, "h3");

        let history = memory.history("a");
        assert_eq!(2, history.len());
        assert_eq!("h1", history[0].hash);
        assert_eq!("h3", history[1].hash);
        assert!(history[0].sequence < history[1].sequence);
        assert!(memory.history("c").is_empty());
    }
}
