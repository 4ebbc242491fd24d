// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Passphrase cache
//!
//! Holds collected key passphrases for a limited time so repeated
//! operations on the same key do not re-prompt. Each entry has its own
//! lock, the map lock is only held to find or create entries.

use std::{collections::HashMap, sync::Arc, time::Duration};

use log::debug;
use tokio::{
    sync::{Mutex, RwLock},
    time::Instant,
};

use keyop_core::engine::Passphrase;

/// Cache key, (master key id, subkey id)
pub type CacheKey = (u64, u64);

struct Entry {
    passphrase: Option<Passphrase>,
    expires: Instant,
}

impl Entry {
    fn live(&self, now: Instant) -> Option<&Passphrase> {
        match now < self.expires {
            true => self.passphrase.as_ref(),
            false => None,
        }
    }
}

/// Time-limited passphrase cache, shared between flows
pub struct PassphraseCache {
    ttl: Duration,
    entries: RwLock<HashMap<CacheKey, Arc<Mutex<Entry>>>>,
}

impl PassphraseCache {
    /// Create a new cache with the provided entry lifetime
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Entry lifetime
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Fetch a live passphrase for a key, evicting the entry if expired
    pub async fn get(&self, master_key_id: u64, subkey_id: u64) -> Option<Passphrase> {
        let key = (master_key_id, subkey_id);
        let e = self.entries.read().await.get(&key).cloned()?;

        let p = e.lock().await.live(Instant::now()).cloned();
        if p.is_none() {
            self.evict(key).await;
        }

        p
    }

    /// Store a passphrase, replacing any existing entry and resetting its TTL
    pub async fn insert(&self, master_key_id: u64, subkey_id: u64, passphrase: Passphrase) {
        let key = (master_key_id, subkey_id);
        let now = Instant::now();
        let expires = now + self.ttl;

        // Fast path, update existing entry
        let existing = self.entries.read().await.get(&key).cloned();
        if let Some(e) = existing {
            let mut e = e.lock().await;
            e.passphrase = Some(passphrase);
            e.expires = expires;
            return;
        }

        debug!("caching passphrase for {:016x}/{:016x}", master_key_id, subkey_id);

        let entry = Arc::new(Mutex::new(Entry {
            passphrase: Some(passphrase),
            expires,
        }));

        // New entries sweep out expired ones
        let mut entries = self.entries.write().await;
        Self::drop_expired(&mut entries, now).await;
        entries.insert(key, entry);
    }

    /// Remove a cached passphrase
    pub async fn remove(&self, master_key_id: u64, subkey_id: u64) -> bool {
        self.entries
            .write()
            .await
            .remove(&(master_key_id, subkey_id))
            .is_some()
    }

    /// Drop expired entries, returning the number removed
    pub async fn purge(&self) -> usize {
        let mut entries = self.entries.write().await;
        Self::drop_expired(&mut entries, Instant::now()).await
    }

    /// Remove a single entry if it is still expired once the map is locked
    async fn evict(&self, key: CacheKey) {
        let mut entries = self.entries.write().await;

        let e = match entries.get(&key).cloned() {
            Some(v) => v,
            None => return,
        };

        let mut e = e.lock().await;
        if e.live(Instant::now()).is_none() {
            debug!("passphrase for {:016x}/{:016x} expired", key.0, key.1);

            e.passphrase = None;
            entries.remove(&key);
        }
    }

    async fn drop_expired(
        entries: &mut HashMap<CacheKey, Arc<Mutex<Entry>>>,
        now: Instant,
    ) -> usize {
        let mut expired = vec![];
        for (k, e) in entries.iter() {
            let mut e = e.lock().await;
            if e.live(now).is_none() {
                e.passphrase = None;
                expired.push(*k);
            }
        }

        for k in &expired {
            entries.remove(k);
        }

        expired.len()
    }

    /// Drop all entries
    pub async fn clear(&self) {
        self.entries.write().await.clear();
    }

    /// Number of entries (including expired entries not yet accessed)
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }
}
