//! Multi-stage query cache: exact, normalized and document-validated semantic tiers

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::domain::cache::key::{alias_key, entry_key, namespace_pattern};
use crate::domain::cache::{
    validate, CacheEntry, CacheLookup, CacheStats, CacheTier, MissReason, QueryCacheConfig,
};
use crate::domain::clock::{Clock, SystemClock};
use crate::domain::embedding::{cosine_similarity, EmbeddingProvider};
use crate::domain::query::normalize;
use crate::domain::store::{KeyValueStore, KeyValueStoreExt};
use crate::domain::DomainError;
use crate::infrastructure::observability::{
    record_cache_eviction, record_cache_lookup, record_cache_size,
};
use crate::infrastructure::timeout::with_timeout;

/// Store record mapping a normalized query to the entry that answers it
#[derive(Debug, Clone, Serialize, Deserialize)]
struct AliasRecord {
    entry_key: String,
}

/// Result of reading one entry from the store
enum Fetched {
    Found(CacheEntry),
    Expired,
    Missing,
}

#[derive(Debug)]
struct IndexedEntry {
    alias_key: String,
    last_accessed_at: DateTime<Utc>,
    /// Monotonic write order, newest highest
    stored_seq: u64,
    embedding: Option<Arc<[f32]>>,
}

/// In-process bookkeeping for LRU order and semantic candidates
#[derive(Debug, Default)]
struct LocalIndex {
    entries: HashMap<String, IndexedEntry>,
    /// Dimensionality shared by every indexed embedding
    dimensions: Option<usize>,
    next_seq: u64,
}

impl LocalIndex {
    /// Keeps an embedding only if it matches the established dimensionality
    fn admit_embedding(&mut self, embedding: Option<Vec<f32>>) -> Option<Vec<f32>> {
        let embedding = embedding.filter(|e| !e.is_empty())?;

        match self.dimensions {
            Some(dims) if dims != embedding.len() => {
                warn!(
                    expected = dims,
                    actual = embedding.len(),
                    "Embedding dimensionality mismatch, storing entry without embedding"
                );
                None
            }
            Some(_) => Some(embedding),
            None => {
                self.dimensions = Some(embedding.len());
                Some(embedding)
            }
        }
    }

    fn accepts(&self, embedding: &[f32]) -> bool {
        !embedding.is_empty() && self.dimensions.is_none_or(|d| d == embedding.len())
    }

    /// Records a write; returns whether the key is new
    fn record_store(&mut self, entry: &CacheEntry, alias_key: String, now: DateTime<Utc>) -> bool {
        let embedding: Option<Arc<[f32]>> = entry
            .query_embedding()
            .filter(|e| self.accepts(e))
            .map(Arc::from);
        if let Some(e) = &embedding {
            self.dimensions.get_or_insert(e.len());
        }

        self.next_seq += 1;
        let previous = self.entries.insert(
            entry.key().to_string(),
            IndexedEntry {
                alias_key,
                last_accessed_at: now,
                stored_seq: self.next_seq,
                embedding,
            },
        );

        previous.is_none()
    }

    /// Records a hit; entries written by another process are adopted
    fn record_access(&mut self, entry: &CacheEntry, alias_key: String, now: DateTime<Utc>) {
        match self.entries.get_mut(entry.key()) {
            Some(indexed) => indexed.last_accessed_at = now,
            None => {
                self.record_store(entry, alias_key, now);
            }
        }
    }

    /// Removes the least-recently-accessed entry other than `keep`
    fn pop_lru_except(&mut self, keep: &str) -> Option<(String, IndexedEntry)> {
        let victim = self
            .entries
            .iter()
            .filter(|(key, _)| key.as_str() != keep)
            .min_by(|a, b| {
                a.1.last_accessed_at
                    .cmp(&b.1.last_accessed_at)
                    .then(a.1.stored_seq.cmp(&b.1.stored_seq))
            })
            .map(|(key, _)| key.clone())?;

        self.entries.remove_entry(&victim)
    }

    /// Most recently stored entries that carry an embedding
    fn semantic_candidates(&self, limit: usize) -> Vec<(String, Arc<[f32]>)> {
        let mut candidates: Vec<(u64, &String, &Arc<[f32]>)> = self
            .entries
            .iter()
            .filter_map(|(key, e)| e.embedding.as_ref().map(|emb| (e.stored_seq, key, emb)))
            .collect();

        candidates.sort_unstable_by(|a, b| b.0.cmp(&a.0));
        candidates.truncate(limit);

        candidates
            .into_iter()
            .map(|(_, key, emb)| (key.clone(), Arc::clone(emb)))
            .collect()
    }

    fn remove(&mut self, key: &str) {
        self.entries.remove(key);
    }

    fn clear(&mut self) {
        self.entries.clear();
        self.dimensions = None;
    }
}

#[derive(Debug, Default)]
struct CacheCounters {
    total_queries: AtomicU64,
    hits: AtomicU64,
    misses: AtomicU64,
    exact_hits: AtomicU64,
    normalized_hits: AtomicU64,
    semantic_hits: AtomicU64,
    semantic_rejections: AtomicU64,
    evictions: AtomicU64,
    expirations: AtomicU64,
    store_errors: AtomicU64,
}

impl CacheCounters {
    fn incr(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    fn read(counter: &AtomicU64) -> u64 {
        counter.load(Ordering::Relaxed)
    }
}

/// Serves cached RAG results from the cheapest safe tier.
///
/// Lookups run exact, then normalized, then semantic. A semantic candidate
/// is only served when its source documents overlap the caller's current
/// retrieval candidates; embedding similarity alone never returns an entry.
/// Every store or embedding failure degrades to a miss.
#[derive(Debug)]
pub struct MultiStageCacheManager {
    store: Arc<dyn KeyValueStore>,
    embedder: Option<Arc<dyn EmbeddingProvider>>,
    clock: Arc<dyn Clock>,
    config: QueryCacheConfig,
    index: Mutex<LocalIndex>,
    counters: CacheCounters,
}

impl MultiStageCacheManager {
    pub fn new(
        store: Arc<dyn KeyValueStore>,
        embedder: Option<Arc<dyn EmbeddingProvider>>,
        config: QueryCacheConfig,
    ) -> Self {
        info!(
            namespace = %config.namespace,
            backend = store.backend_name(),
            semantic = config.enable_semantic && embedder.is_some(),
            max_cache_size = config.max_cache_size,
            "Query cache initialized"
        );

        Self {
            store,
            embedder,
            clock: Arc::new(SystemClock),
            config,
            index: Mutex::new(LocalIndex::default()),
            counters: CacheCounters::default(),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn config(&self) -> &QueryCacheConfig {
        &self.config
    }

    /// Cached entry for `query`, or `None`
    pub async fn get(&self, query: &str, current_document_ids: &[String]) -> Option<CacheEntry> {
        self.lookup(query, current_document_ids).await.entry
    }

    /// Like [`get`](Self::get), also reporting the serving tier and any query embedding computed
    pub async fn lookup(&self, query: &str, current_document_ids: &[String]) -> CacheLookup {
        if !self.config.enabled {
            return CacheLookup::miss(MissReason::Disabled);
        }

        CacheCounters::incr(&self.counters.total_queries);

        let lookup = match self.lookup_tiers(query, current_document_ids).await {
            Ok(lookup) => lookup,
            Err(e) => {
                self.store_error("lookup", &e);
                CacheLookup::miss(MissReason::StoreUnavailable)
            }
        };

        match lookup.tier {
            Some(tier) => {
                CacheCounters::incr(&self.counters.hits);
                CacheCounters::incr(match tier {
                    CacheTier::Exact => &self.counters.exact_hits,
                    CacheTier::Normalized => &self.counters.normalized_hits,
                    CacheTier::Semantic => &self.counters.semantic_hits,
                });
                debug!(tier = tier.as_str(), "Query cache hit");
            }
            None => {
                CacheCounters::incr(&self.counters.misses);
                debug!(reason = ?lookup.miss_reason, "Query cache miss");
            }
        }

        record_cache_lookup(lookup.tier, lookup.miss_reason);
        lookup
    }

    /// Stores a result. Re-storing an existing query replaces its payload.
    ///
    /// Without a supplied embedding one is computed when the semantic tier is
    /// active; if that fails the entry is stored without one and can only be
    /// served by the exact and normalized tiers.
    pub async fn put(
        &self,
        query: &str,
        result_payload: serde_json::Value,
        query_embedding: Option<Vec<f32>>,
        document_ids: Vec<String>,
    ) {
        if !self.config.enabled {
            return;
        }

        let embedding = match query_embedding.filter(|e| !e.is_empty()) {
            Some(embedding) => Some(embedding),
            None if self.semantic_embedder().is_some() => self.embed_query(query).await,
            None => None,
        };
        let embedding = self.index.lock().await.admit_embedding(embedding);

        let now = self.clock.now();
        let key = self.entry_key(query);
        let alias = self.alias_key(query);
        let entry = CacheEntry::new(
            key.clone(),
            query,
            result_payload,
            document_ids,
            self.config.ttl_secs,
            now,
        )
        .with_embedding(embedding)
        .with_scope(self.config.scope.clone());

        if let Err(e) = self.write_entry(&entry, &alias).await {
            self.store_error("put", &e);
            return;
        }

        let (victims, size) = {
            let mut index = self.index.lock().await;
            let mut victims = Vec::new();

            if index.record_store(&entry, alias, now) {
                while index.entries.len() > self.config.max_cache_size {
                    match index.pop_lru_except(&key) {
                        Some(victim) => victims.push(victim),
                        None => break,
                    }
                }
            }

            (victims, index.entries.len())
        };

        for (victim_key, victim) in victims {
            CacheCounters::incr(&self.counters.evictions);
            record_cache_eviction();
            debug!(key = %victim_key, "Evicting least recently used cache entry");

            if let Err(e) = self.delete_from_store(&victim_key, &victim.alias_key).await {
                self.store_error("evict", &e);
            }
        }

        record_cache_size(size);
        debug!(key = %key, "Stored query cache entry");
    }

    /// Removes the entry `query` resolves to; returns whether one existed
    pub async fn invalidate(&self, query: &str) -> bool {
        let key = self.entry_key(query);
        let alias = self.alias_key(query);

        let result = async {
            if self.remove_entry(&key, &alias).await? {
                return Ok(true);
            }

            match self.store.get::<AliasRecord>(&alias).await? {
                Some(record) => self.remove_entry(&record.entry_key, &alias).await,
                None => Ok(false),
            }
        }
        .await;

        match result {
            Ok(removed) => {
                debug!(removed, "Invalidated query cache entry");
                removed
            }
            Err(e) => {
                self.store_error("invalidate", &e);
                false
            }
        }
    }

    /// Removes every entry under the configured namespace
    pub async fn clear(&self) {
        match self
            .store
            .delete_pattern(&namespace_pattern(&self.config.namespace))
            .await
        {
            Ok(deleted) => info!(deleted, namespace = %self.config.namespace, "Query cache cleared"),
            Err(e) => self.store_error("clear", &e),
        }

        self.index.lock().await.clear();
        record_cache_size(0);
    }

    pub async fn get_stats(&self) -> CacheStats {
        let size = self.index.lock().await.entries.len();
        let total_queries = CacheCounters::read(&self.counters.total_queries);
        let hits = CacheCounters::read(&self.counters.hits);

        CacheStats {
            total_queries,
            hits,
            misses: CacheCounters::read(&self.counters.misses),
            hit_rate: CacheStats::calculate_hit_rate(hits, total_queries),
            exact_hits: CacheCounters::read(&self.counters.exact_hits),
            normalized_hits: CacheCounters::read(&self.counters.normalized_hits),
            semantic_hits: CacheCounters::read(&self.counters.semantic_hits),
            semantic_rejections: CacheCounters::read(&self.counters.semantic_rejections),
            evictions: CacheCounters::read(&self.counters.evictions),
            expirations: CacheCounters::read(&self.counters.expirations),
            store_errors: CacheCounters::read(&self.counters.store_errors),
            size,
            max_cache_size: self.config.max_cache_size,
        }
    }

    /// Embeds the normalized query within the configured timeout; `None` on any failure
    pub async fn embed_query(&self, query: &str) -> Option<Vec<f32>> {
        let embedder = self.embedder.as_ref()?;
        let text = normalize(query);

        match with_timeout(
            "query embedding",
            self.config.embedding_timeout(),
            embedder.embed(&text),
        )
        .await
        {
            Ok(embedding) if !embedding.is_empty() => Some(embedding),
            Ok(_) => {
                warn!(provider = embedder.provider_name(), "Embedding provider returned an empty vector");
                None
            }
            Err(e) => {
                warn!(
                    provider = embedder.provider_name(),
                    error = %e,
                    "Failed to embed query, skipping semantic cache"
                );
                None
            }
        }
    }

    fn semantic_embedder(&self) -> Option<&Arc<dyn EmbeddingProvider>> {
        self.embedder.as_ref().filter(|_| self.config.enable_semantic)
    }

    fn entry_key(&self, query: &str) -> String {
        entry_key(&self.config.namespace, query, self.config.scope.as_deref())
    }

    fn alias_key(&self, query: &str) -> String {
        alias_key(
            &self.config.namespace,
            &normalize(query),
            self.config.scope.as_deref(),
        )
    }

    fn store_error(&self, operation: &str, error: &DomainError) {
        CacheCounters::incr(&self.counters.store_errors);
        warn!(
            operation,
            backend = self.store.backend_name(),
            error = %error,
            "Cache store unavailable, degrading to miss"
        );
    }

    async fn lookup_tiers(
        &self,
        query: &str,
        current_document_ids: &[String],
    ) -> Result<CacheLookup, DomainError> {
        let now = self.clock.now();
        let mut expired = false;

        let exact_key = self.entry_key(query);
        match self.fetch_entry(&exact_key, now).await? {
            Fetched::Found(entry) => return Ok(self.serve(entry, CacheTier::Exact, now).await),
            Fetched::Expired => expired = true,
            Fetched::Missing => {}
        }

        let alias = self.alias_key(query);
        if let Some(record) = self.store.get::<AliasRecord>(&alias).await? {
            let fetched = if record.entry_key == exact_key {
                None
            } else {
                Some(self.fetch_entry(&record.entry_key, now).await?)
            };

            match fetched {
                Some(Fetched::Found(entry)) => {
                    return Ok(self.serve(entry, CacheTier::Normalized, now).await);
                }
                Some(Fetched::Expired) => expired = true,
                Some(Fetched::Missing) | None => {
                    // Alias outlived its entry
                    self.store.delete(&alias).await?;
                }
            }
        }

        let semantic = self.lookup_semantic(query, current_document_ids, now).await?;
        if semantic.is_hit() || !expired {
            return Ok(semantic);
        }

        Ok(match semantic.miss_reason {
            Some(MissReason::NotFound) | None => {
                CacheLookup::miss(MissReason::Expired).with_query_embedding(semantic.query_embedding)
            }
            Some(_) => semantic,
        })
    }

    async fn lookup_semantic(
        &self,
        query: &str,
        current_document_ids: &[String],
        now: DateTime<Utc>,
    ) -> Result<CacheLookup, DomainError> {
        let not_found = CacheLookup::miss(MissReason::NotFound);

        if self.semantic_embedder().is_none() {
            return Ok(not_found);
        }

        // An empty candidate set can never pass the overlap gate
        if current_document_ids.is_empty() {
            debug!("No current candidate documents, skipping semantic tier");
            return Ok(not_found);
        }

        let candidates = self
            .index
            .lock()
            .await
            .semantic_candidates(self.config.max_semantic_candidates);
        if candidates.is_empty() {
            return Ok(not_found);
        }

        let Some(query_embedding) = self.embed_query(query).await else {
            return Ok(not_found);
        };

        let mut ranked: Vec<(&String, f32)> = candidates
            .iter()
            .map(|(key, embedding)| (key, cosine_similarity(&query_embedding, embedding)))
            .filter(|(_, similarity)| *similarity >= self.config.semantic_threshold)
            .collect();
        ranked.sort_by(|a, b| b.1.total_cmp(&a.1));

        if ranked.is_empty() {
            debug!(threshold = self.config.semantic_threshold, "No semantic candidate above threshold");
            return Ok(CacheLookup::miss(MissReason::BelowThreshold)
                .with_query_embedding(Some(query_embedding)));
        }

        // Best first; a candidate that is gone or fails the gate yields to the next
        let mut miss_reason = MissReason::NotFound;
        for (candidate_key, similarity) in ranked {
            let entry = match self.fetch_entry(candidate_key, now).await? {
                Fetched::Found(entry) => entry,
                Fetched::Expired => {
                    if miss_reason == MissReason::NotFound {
                        miss_reason = MissReason::Expired;
                    }
                    continue;
                }
                Fetched::Missing => {
                    self.index.lock().await.remove(candidate_key);
                    continue;
                }
            };

            let overlap = validate(current_document_ids, entry.document_ids());
            if overlap < self.config.validation_threshold {
                miss_reason = MissReason::ValidationMismatch;
                info!(
                    similarity,
                    overlap,
                    validation_threshold = self.config.validation_threshold,
                    cached_query = entry.query_text(),
                    "Semantic cache candidate rejected by document overlap gate"
                );
                continue;
            }

            debug!(similarity, overlap, cached_query = entry.query_text(), "Semantic cache match validated");
            return Ok(self
                .serve(entry, CacheTier::Semantic, now)
                .await
                .with_query_embedding(Some(query_embedding)));
        }

        if miss_reason == MissReason::ValidationMismatch {
            CacheCounters::incr(&self.counters.semantic_rejections);
        }

        Ok(CacheLookup::miss(miss_reason).with_query_embedding(Some(query_embedding)))
    }

    /// Reads an entry, purging it when past its TTL
    async fn fetch_entry(&self, key: &str, now: DateTime<Utc>) -> Result<Fetched, DomainError> {
        let Some(entry) = self.store.get::<CacheEntry>(key).await? else {
            return Ok(Fetched::Missing);
        };

        if entry.is_expired(now) {
            CacheCounters::incr(&self.counters.expirations);
            debug!(key, "Query cache entry expired");
            self.remove_entry(key, &self.alias_key(entry.query_text())).await?;
            return Ok(Fetched::Expired);
        }

        Ok(Fetched::Found(entry))
    }

    /// Marks an entry as accessed and returns it as a hit
    async fn serve(&self, mut entry: CacheEntry, tier: CacheTier, now: DateTime<Utc>) -> CacheLookup {
        entry.record_hit(now);
        let alias = self.alias_key(entry.query_text());

        let ttl = entry.remaining_ttl(now).max(Duration::from_secs(1));
        if let Err(e) = self.store.set(entry.key(), &entry, ttl).await {
            self.store_error("touch", &e);
        }

        self.index.lock().await.record_access(&entry, alias, now);
        CacheLookup::hit(entry, tier)
    }

    async fn write_entry(&self, entry: &CacheEntry, alias: &str) -> Result<(), DomainError> {
        let ttl = self.config.ttl().max(Duration::from_secs(1));
        let record = AliasRecord {
            entry_key: entry.key().to_string(),
        };

        self.store.set(entry.key(), entry, ttl).await?;
        self.store.set(alias, &record, ttl).await
    }

    /// Deletes an entry and, if it still points there, its alias
    async fn delete_from_store(&self, key: &str, alias: &str) -> Result<bool, DomainError> {
        let existed = self.store.delete(key).await?;

        if let Some(record) = self.store.get::<AliasRecord>(alias).await? {
            if record.entry_key == key {
                self.store.delete(alias).await?;
            }
        }

        Ok(existed)
    }

    async fn remove_entry(&self, key: &str, alias: &str) -> Result<bool, DomainError> {
        let existed = self.delete_from_store(key, alias).await?;
        self.index.lock().await.remove(key);
        Ok(existed)
    }
}
