use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use declone_types::{ItemRelationship, ItemVariant, VariantIdentifier};
use tracing::debug;

use crate::error::{StoreError, StoreResult};
use crate::traits::{ItemReadRepository, ItemWriteRepository, RelationshipMap, RelationshipRepository};

fn read_lock<'a, T>(lock: &'a RwLock<T>, what: &str) -> StoreResult<RwLockReadGuard<'a, T>> {
    lock.read()
        .map_err(|e| StoreError::LockPoisoned(format!("{what}: {e}")))
}

fn write_lock<'a, T>(lock: &'a RwLock<T>, what: &str) -> StoreResult<RwLockWriteGuard<'a, T>> {
    lock.write()
        .map_err(|e| StoreError::LockPoisoned(format!("{what}: {e}")))
}

/// Switches and counters shared by the in-memory stores.
#[derive(Debug, Default)]
struct Faults {
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
    reads: AtomicUsize,
    writes: AtomicUsize,
}

impl Faults {
    fn on_read(&self, what: &str) -> StoreResult<()> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(StoreError::Backend(format!("{what}: injected read failure")));
        }
        Ok(())
    }

    fn on_write(&self, what: &str) -> StoreResult<()> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Backend(format!("{what}: injected write failure")));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// InMemoryItemStore
// ---------------------------------------------------------------------------

/// In-memory variant store keyed by [`VariantIdentifier`].
///
/// Intended for tests and embedding. Variants are cloned on read and write.
#[derive(Default)]
pub struct InMemoryItemStore {
    variants: RwLock<HashMap<VariantIdentifier, ItemVariant>>,
    faults: Faults,
}

impl InMemoryItemStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store pre-populated with `variants`.
    pub fn with_variants(variants: impl IntoIterator<Item = ItemVariant>) -> Self {
        let map = variants
            .into_iter()
            .map(|v| (v.identifier.clone(), v))
            .collect();
        Self {
            variants: RwLock::new(map),
            faults: Faults::default(),
        }
    }

    pub fn get(&self, id: &VariantIdentifier) -> StoreResult<Option<ItemVariant>> {
        Ok(read_lock(&self.variants, "variants")?.get(id).cloned())
    }

    pub fn len(&self) -> usize {
        self.variants.read().map(|m| m.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Make every subsequent read fail until reset.
    pub fn fail_reads(&self, fail: bool) {
        self.faults.fail_reads.store(fail, Ordering::SeqCst);
    }

    /// Make every subsequent write fail until reset.
    pub fn fail_writes(&self, fail: bool) {
        self.faults.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Number of `get_variants` calls so far.
    pub fn read_calls(&self) -> usize {
        self.faults.reads.load(Ordering::SeqCst)
    }

    /// Number of `save_variants` calls so far.
    pub fn write_calls(&self) -> usize {
        self.faults.writes.load(Ordering::SeqCst)
    }
}

impl std::fmt::Debug for InMemoryItemStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryItemStore")
            .field("variant_count", &self.len())
            .finish()
    }
}

#[async_trait]
impl ItemReadRepository for InMemoryItemStore {
    async fn get_variants(&self, locators: &[VariantIdentifier]) -> StoreResult<Vec<ItemVariant>> {
        self.faults.on_read("get_variants")?;
        let map = read_lock(&self.variants, "variants")?;
        let mut seen = HashSet::new();
        Ok(locators
            .iter()
            .filter(|id| seen.insert(*id))
            .filter_map(|id| map.get(id).cloned())
            .collect())
    }
}

#[async_trait]
impl ItemWriteRepository for InMemoryItemStore {
    async fn save_variants(&self, variants: &[ItemVariant]) -> StoreResult<()> {
        self.faults.on_write("save_variants")?;
        let mut map = write_lock(&self.variants, "variants")?;
        for variant in variants {
            map.insert(variant.identifier.clone(), variant.clone());
        }
        debug!(count = variants.len(), "saved variants");
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// InMemoryRelationshipStore
// ---------------------------------------------------------------------------

/// In-memory outbound relationship store, partitioned by store name.
#[derive(Default)]
pub struct InMemoryRelationshipStore {
    stores: RwLock<HashMap<String, RelationshipMap>>,
    faults: Faults,
}

impl InMemoryRelationshipStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the outbound edges of `variant` in `store`, replacing any existing set.
    pub fn insert(
        &self,
        store: &str,
        variant: VariantIdentifier,
        relationships: Vec<ItemRelationship>,
    ) -> StoreResult<()> {
        let mut stores = write_lock(&self.stores, "relationships")?;
        stores
            .entry(store.to_string())
            .or_default()
            .insert(variant, relationships);
        Ok(())
    }

    pub fn get(&self, store: &str, variant: &VariantIdentifier) -> StoreResult<Vec<ItemRelationship>> {
        let stores = read_lock(&self.stores, "relationships")?;
        Ok(stores
            .get(store)
            .and_then(|m| m.get(variant))
            .cloned()
            .unwrap_or_default())
    }

    pub fn fail_reads(&self, fail: bool) {
        self.faults.fail_reads.store(fail, Ordering::SeqCst);
    }

    pub fn fail_writes(&self, fail: bool) {
        self.faults.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub fn read_calls(&self) -> usize {
        self.faults.reads.load(Ordering::SeqCst)
    }

    pub fn write_calls(&self) -> usize {
        self.faults.writes.load(Ordering::SeqCst)
    }
}

impl std::fmt::Debug for InMemoryRelationshipStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<String> = self
            .stores
            .read()
            .map(|s| s.keys().cloned().collect())
            .unwrap_or_default();
        f.debug_struct("InMemoryRelationshipStore")
            .field("stores", &names)
            .finish()
    }
}

#[async_trait]
impl RelationshipRepository for InMemoryRelationshipStore {
    async fn get_out_relationships(
        &self,
        store: &str,
        locators: &[VariantIdentifier],
    ) -> StoreResult<RelationshipMap> {
        self.faults.on_read("get_out_relationships")?;
        let stores = read_lock(&self.stores, "relationships")?;
        let Some(edges) = stores.get(store) else {
            return Ok(RelationshipMap::new());
        };
        Ok(locators
            .iter()
            .filter_map(|id| edges.get(id).map(|rels| (id.clone(), rels.clone())))
            .collect())
    }

    async fn save_relationships(&self, store: &str, relationships: &RelationshipMap) -> StoreResult<()> {
        self.faults.on_write("save_relationships")?;
        let mut stores = write_lock(&self.stores, "relationships")?;
        let edges = stores.entry(store.to_string()).or_default();
        for (variant, rels) in relationships {
            edges.insert(variant.clone(), rels.clone());
        }
        debug!(store, variants = relationships.len(), "saved relationship sets");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use declone_types::RelationshipType;
    use uuid::Uuid;

    fn id(n: u128) -> VariantIdentifier {
        VariantIdentifier::new(Uuid::from_u128(n), "en", 1)
    }

    fn variant(n: u128) -> ItemVariant {
        ItemVariant::new(id(n), Uuid::from_u128(1000 + n))
    }

    fn edge(from: u128, to: u128) -> ItemRelationship {
        ItemRelationship::new(
            Uuid::new_v4(),
            Uuid::from_u128(from),
            Uuid::from_u128(to),
            RelationshipType::ItemReference,
        )
    }

    // -----------------------------------------------------------------------
    // Items
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn get_variants_returns_present_only() {
        let store = InMemoryItemStore::with_variants(vec![variant(1), variant(2)]);
        let found = store.get_variants(&[id(1), id(3)]).await.unwrap();
        assert_eq!(found, vec![variant(1)]);
    }

    #[tokio::test]
    async fn get_variants_empty_input() {
        let store = InMemoryItemStore::with_variants(vec![variant(1)]);
        assert!(store.get_variants(&[]).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn get_variants_does_not_duplicate_repeated_locators() {
        let store = InMemoryItemStore::with_variants(vec![variant(1)]);
        let found = store.get_variants(&[id(1), id(1), id(1)]).await.unwrap();
        assert_eq!(found.len(), 1);
    }

    #[tokio::test]
    async fn save_replaces_by_identifier() {
        let store = InMemoryItemStore::with_variants(vec![variant(1)]);
        let updated = variant(1).with_property("name", "updated");
        store.save_variants(&[updated.clone()]).await.unwrap();
        assert_eq!(store.len(), 1);
        assert_eq!(store.get(&id(1)).unwrap(), Some(updated));
    }

    #[tokio::test]
    async fn injected_failures_and_counters() {
        let store = InMemoryItemStore::new();
        store.fail_reads(true);
        assert!(matches!(
            store.get_variants(&[id(1)]).await,
            Err(StoreError::Backend(_))
        ));
        store.fail_reads(false);
        assert!(store.get_variants(&[id(1)]).await.is_ok());
        assert_eq!(store.read_calls(), 2);

        store.fail_writes(true);
        assert!(store.save_variants(&[variant(1)]).await.is_err());
        assert_eq!(store.write_calls(), 1);
        assert!(store.is_empty());
    }

    // -----------------------------------------------------------------------
    // Relationships
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn out_relationships_scoped_by_store() {
        let store = InMemoryRelationshipStore::new();
        store.insert("master", id(1), vec![edge(1, 2)]).unwrap();
        store.insert("web", id(1), vec![edge(1, 3), edge(1, 4)]).unwrap();

        let master = store.get_out_relationships("master", &[id(1)]).await.unwrap();
        assert_eq!(master[&id(1)].len(), 1);
        let web = store.get_out_relationships("web", &[id(1)]).await.unwrap();
        assert_eq!(web[&id(1)].len(), 2);
        let missing = store.get_out_relationships("preview", &[id(1)]).await.unwrap();
        assert!(missing.is_empty());
    }

    #[tokio::test]
    async fn absent_locators_are_absent_from_map() {
        let store = InMemoryRelationshipStore::new();
        store.insert("web", id(1), vec![edge(1, 2)]).unwrap();
        let map = store.get_out_relationships("web", &[id(1), id(2)]).await.unwrap();
        assert!(map.contains_key(&id(1)));
        assert!(!map.contains_key(&id(2)));
    }

    #[tokio::test]
    async fn save_relationships_replaces_sets() {
        let store = InMemoryRelationshipStore::new();
        store.insert("web", id(1), vec![edge(1, 2), edge(1, 3)]).unwrap();

        let mut update = RelationshipMap::new();
        update.insert(id(1), vec![edge(1, 9)]);
        update.insert(id(5), vec![edge(5, 9)]);
        store.save_relationships("web", &update).await.unwrap();

        assert_eq!(store.get("web", &id(1)).unwrap().len(), 1);
        assert_eq!(store.get("web", &id(5)).unwrap().len(), 1);
        assert_eq!(store.write_calls(), 1);
    }
}
