use std::collections::HashMap;
use std::sync::Mutex;
use time::{OffsetDateTime, Duration};
use tracing::{warn, error};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Too many failed attempts. Please try again in {minutes} minutes.")]
pub struct Throttled {
    pub minutes: i64,
}

#[derive(Debug)]
struct Failures {
    count: u32,
    first_failure: OffsetDateTime,
}

/// Counts failed attempts per key and locks the key out once `max_failures` land inside
/// one window. The lockout lifts when the window that started with the first failure ends.
#[derive(Debug)]
pub struct LoginThrottle {
    failures: Mutex<HashMap<String, Failures>>,
    max_failures: u32,
    window: Duration,
}

impl Default for LoginThrottle {
    fn default() -> Self {
        Self::new(5, 15)
    }
}

impl LoginThrottle {
    pub fn new(max_failures: u32, window_minutes: i64) -> Self {
        Self {
            failures: Mutex::new(HashMap::new()),
            max_failures,
            window: Duration::minutes(window_minutes),
        }
    }

    pub fn check(&self, key: &str) -> Result<(), Throttled> {
        let now = OffsetDateTime::now_utc();
        let mut failures = match self.failures.lock() {
            Ok(guard) => guard,
            Err(e) => {
                error!("Failed to acquire login throttle lock: {}", e);
                return Err(Throttled { minutes: 1 });
            }
        };

        failures.retain(|_, f| now - f.first_failure <= self.window);

        match failures.get(key) {
            Some(f) if f.count >= self.max_failures => {
                let minutes = (f.first_failure + self.window - now).whole_minutes().max(1);
                warn!("Login throttled for key {}", key);
                Err(Throttled { minutes })
            }
            _ => Ok(()),
        }
    }

    pub fn record_failure(&self, key: &str) {
        let now = OffsetDateTime::now_utc();
        if let Ok(mut failures) = self.failures.lock() {
            let entry = failures.entry(key.to_string()).or_insert(Failures { count: 0, first_failure: now });
            if now - entry.first_failure > self.window {
                *entry = Failures { count: 0, first_failure: now };
            }
            entry.count += 1;
        }
    }

    pub fn reset(&self, key: &str) {
        if let Ok(mut failures) = self.failures.lock() {
            failures.remove(key);
        }
    }

    pub fn remaining_attempts(&self, key: &str) -> u32 {
        self.failures
            .lock()
            .ok()
            .and_then(|failures| failures.get(key).map(|f| f.count))
            .map_or(self.max_failures, |count| self.max_failures.saturating_sub(count))
    }
}
