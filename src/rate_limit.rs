use chrono::Utc;
use dashmap::DashMap;
use tracing::{info, warn};

// Extra seconds an entry lives past its window, tolerates clock/storage skew
const EXPIRY_BUFFER_SECS: i64 = 10;

// Remaining quota reported for endpoints with no configured rule
pub const UNLIMITED: u32 = 999;

// Storage keys hold a truncated device id so full identifiers never land in keys or logs
const KEY_DEVICE_CHARS: usize = 16;
const LOG_DEVICE_CHARS: usize = 8;

// Static per-endpoint-class limit
#[derive(Debug, Clone)]
pub struct RateLimitRule {
    pub name: &'static str,
    pub endpoint_prefix: &'static str,
    pub max_requests: usize,
    pub window_seconds: i64,
}

pub fn default_rules() -> Vec<RateLimitRule> {
    vec![
        RateLimitRule {
            name: "analyze",
            endpoint_prefix: "/api/analyze",
            max_requests: 5,
            window_seconds: 60,
        },
        RateLimitRule {
            name: "start",
            endpoint_prefix: "/api/analysis/start",
            max_requests: 5,
            window_seconds: 60,
        },
        // More generous: polling is cheap
        RateLimitRule {
            name: "progress",
            endpoint_prefix: "/api/analysis/progress",
            max_requests: 30,
            window_seconds: 60,
        },
    ]
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Decision {
    pub allowed: bool,
    pub remaining: u32,
    pub reset_time: i64,
}

// Sliding log for one (device, rule) key
struct RequestLog {
    timestamps: Vec<i64>,
    expires_at: i64,
}

// Sliding-log limiter. The log counts requests in a trailing window, so there
// is no double allowance at fixed-bucket boundaries. The store is in-process;
// a missing entry counts as an empty log (fail-open).
pub struct RateLimiter {
    rules: Vec<RateLimitRule>,
    log: DashMap<String, RequestLog>,
}

impl RateLimiter {
    pub fn new(rules: Vec<RateLimitRule>) -> Self {
        Self {
            rules,
            log: DashMap::new(),
        }
    }

    pub fn check(&self, device_id: &str, endpoint_path: &str) -> Decision {
        self.check_at(device_id, endpoint_path, Utc::now().timestamp())
    }

    // Clock passed explicitly so tests can drive the window
    pub(crate) fn check_at(&self, device_id: &str, endpoint_path: &str, now: i64) -> Decision {
        // First matching prefix wins
        let Some(rule) = self
            .rules
            .iter()
            .find(|r| endpoint_path.starts_with(r.endpoint_prefix))
        else {
            return Decision {
                allowed: true,
                remaining: UNLIMITED,
                reset_time: 0,
            };
        };

        let key = format!(
            "rate_limit:{}:{}",
            truncate_chars(device_id, KEY_DEVICE_CHARS),
            rule.name
        );
        let cutoff = now - rule.window_seconds;

        let mut entry = self.log.entry(key).or_insert_with(|| RequestLog {
            timestamps: Vec::new(),
            expires_at: now + rule.window_seconds + EXPIRY_BUFFER_SECS,
        });
        entry.timestamps.retain(|&t| t > cutoff);

        if entry.timestamps.len() >= rule.max_requests {
            let oldest = entry.timestamps.iter().min().copied().unwrap_or(now);
            warn!(
                device = %device_prefix(device_id),
                rule = rule.name,
                count = entry.timestamps.len(),
                max = rule.max_requests,
                "rate limit exceeded"
            );
            return Decision {
                allowed: false,
                remaining: 0,
                reset_time: oldest + rule.window_seconds,
            };
        }

        entry.timestamps.push(now);
        entry.expires_at = now + rule.window_seconds + EXPIRY_BUFFER_SECS;
        let remaining = (rule.max_requests - entry.timestamps.len()) as u32;
        info!(
            device = %device_prefix(device_id),
            rule = rule.name,
            count = entry.timestamps.len(),
            max = rule.max_requests,
            remaining,
            "rate limit check passed"
        );
        Decision {
            allowed: true,
            remaining,
            reset_time: now + rule.window_seconds,
        }
    }

    // Drops whole keys past their expiry; per-check pruning covers freshness in between
    pub fn sweep_expired(&self, now: i64) {
        self.log.retain(|_, entry| entry.expires_at > now);
    }

    #[cfg(test)]
    fn stored_count(&self, device_id: &str, rule_name: &str) -> usize {
        let key = format!(
            "rate_limit:{}:{rule_name}",
            truncate_chars(device_id, KEY_DEVICE_CHARS)
        );
        self.log.get(&key).map_or(0, |e| e.timestamps.len())
    }
}

fn truncate_chars(s: &str, n: usize) -> String {
    s.chars().take(n).collect()
}

// Short prefix for traceability without logging the full identifier
pub fn device_prefix(device_id: &str) -> String {
    format!("{}...", truncate_chars(device_id, LOG_DEVICE_CHARS))
}
