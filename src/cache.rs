use dashmap::DashMap;
use sha2::{Digest, Sha256};
use std::time::{Duration, Instant};

use crate::metrics::CACHE_SIZE;
use crate::models::AnalysisResult;

// Cached analysis for one (device, video) pair
#[derive(Clone)]
struct CacheEntry {
    result: AnalysisResult,
    created_at: Instant,
}

// Per-device result cache; the in-memory stand-in for the analysis history table
pub struct ResultCache {
    entries: DashMap<String, CacheEntry>,
    ttl: Duration,
}

impl ResultCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            ttl,
        }
    }

    pub fn get(&self, device_id: &str, video_id: &str) -> Option<AnalysisResult> {
        let entry = self.entries.get(&make_cache_key(device_id, video_id))?;
        if entry.created_at.elapsed() < self.ttl {
            Some(entry.result.clone())
        } else {
            None
        }
    }

    pub fn insert(&self, device_id: &str, video_id: &str, result: AnalysisResult) {
        self.entries.insert(
            make_cache_key(device_id, video_id),
            CacheEntry {
                result,
                created_at: Instant::now(),
            },
        );
        CACHE_SIZE.set(self.entries.len() as f64);
    }

    pub fn sweep_expired(&self) {
        self.entries
            .retain(|_, entry| entry.created_at.elapsed() < self.ttl);
        CACHE_SIZE.set(self.entries.len() as f64);
    }
}

// Hash device + video so full device ids never appear in keys
fn make_cache_key(device_id: &str, video_id: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(device_id);
    hasher.update(video_id);
    format!("{:x}", hasher.finalize())
}
