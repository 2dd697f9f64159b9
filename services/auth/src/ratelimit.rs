//! Sliding-window request throttling.
//!
//! Single-process and memory-resident: fine for one instance, and the
//! [`RateLimiter`] trait is the seam for a shared-counter backend when the
//! service is ever scaled out.

use std::collections::{HashMap, VecDeque};
use std::str::FromStr;
use std::sync::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};

/// A parsed `count/window` limit, e.g. `"30/min"`, `"100/5m"`, `"10/3600"`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Limit {
    pub count: u32,
    pub window_secs: u64,
}

#[derive(Debug, thiserror::Error)]
#[error("invalid rate limit {0:?}: expected count/window like \"30/min\", \"100/5m\" or \"10/3600\"")]
pub struct ParseLimitError(pub String);

fn unit_secs(unit: &str) -> Option<u64> {
    match unit.to_ascii_lowercase().as_str() {
        "s" | "sec" | "secs" | "second" | "seconds" => Some(1),
        "m" | "min" | "mins" | "minute" | "minutes" => Some(60),
        "h" | "hr" | "hrs" | "hour" | "hours" => Some(3600),
        "d" | "day" | "days" => Some(86400),
        _ => None,
    }
}

impl FromStr for Limit {
    type Err = ParseLimitError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || ParseLimitError(s.to_owned());
        let (count_part, window_part) = s.split_once('/').ok_or_else(err)?;
        let count: u32 = count_part.trim().parse().map_err(|_| err())?;

        let window_part = window_part.trim();
        let digits: String = window_part
            .chars()
            .take_while(char::is_ascii_digit)
            .collect();
        let unit = window_part[digits.len()..].trim();

        let window_secs = match (digits.is_empty(), unit.is_empty()) {
            // "3600"
            (false, true) => digits.parse().map_err(|_| err())?,
            // "5m"
            (false, false) => {
                let n: u64 = digits.parse().map_err(|_| err())?;
                n.checked_mul(unit_secs(unit).ok_or_else(err)?)
                    .ok_or_else(err)?
            }
            // bare unit means one of it: "min" == "1m"
            (true, false) => unit_secs(unit).ok_or_else(err)?,
            (true, true) => return Err(err()),
        };
        if window_secs == 0 {
            return Err(err());
        }

        Ok(Limit { count, window_secs })
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RateLimitDecision {
    Allowed,
    Limited,
}

/// Throttling seam. Keys follow the `{client-identity}:{scope}` convention.
pub trait RateLimiter: Send + Sync {
    fn hit(&self, key: &str, limit: Limit) -> RateLimitDecision;
}

/// Conventional limiter key for a client identity and an endpoint scope.
pub fn limiter_key(client: &str, scope: &str) -> String {
    format!("{client}:{scope}")
}

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system clock before UNIX epoch")
        .as_millis() as u64
}

/// In-memory sliding-window limiter.
///
/// Per-key hit timestamps are appended in increasing order, so expiring old
/// hits is a prefix trim. One lock covers the whole read-prune-append cycle.
#[derive(Debug, Default)]
pub struct MemoryRateLimiter {
    buckets: Mutex<HashMap<String, VecDeque<u64>>>,
}

impl MemoryRateLimiter {
    pub fn new() -> Self {
        Self::default()
    }

    fn hit_at(&self, key: &str, limit: Limit, now_ms: u64) -> RateLimitDecision {
        let window_ms = limit.window_secs.saturating_mul(1000);
        let mut buckets = self.buckets.lock().expect("rate limiter lock poisoned");
        let hits = buckets.entry(key.to_owned()).or_default();
        while hits
            .front()
            .is_some_and(|&t| now_ms.saturating_sub(t) > window_ms)
        {
            hits.pop_front();
        }
        if hits.len() as u64 >= u64::from(limit.count) {
            return RateLimitDecision::Limited;
        }
        hits.push_back(now_ms);
        RateLimitDecision::Allowed
    }
}

impl RateLimiter for MemoryRateLimiter {
    fn hit(&self, key: &str, limit: Limit) -> RateLimitDecision {
        self.hit_at(key, limit, now_millis())
    }
}
