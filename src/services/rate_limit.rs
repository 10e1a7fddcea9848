use std::collections::{HashMap, VecDeque};
use std::time::{Duration, Instant};

const WINDOW: Duration = Duration::from_secs(60);

/// Sliding one-minute request budget per client key. `None` disables it.
pub struct RateLimiter {
    hits: HashMap<String, VecDeque<Instant>>,
    per_minute: Option<usize>,
}

impl RateLimiter {
    pub fn new(per_minute: Option<usize>) -> Self {
        Self { hits: HashMap::new(), per_minute }
    }

    pub fn hit_ok(&mut self, client: &str) -> bool {
        let Some(per_minute) = self.per_minute else { return true };
        let dq = self.hits.entry(client.to_string()).or_default();
        let now = Instant::now();
        expire(dq, now);
        if dq.len() >= per_minute { return false; }
        dq.push_back(now);
        true
    }

    /// Forget clients whose window has fully drained.
    pub fn sweep(&mut self) -> usize {
        let now = Instant::now();
        let before = self.hits.len();
        self.hits.retain(|_, dq| {
            expire(dq, now);
            !dq.is_empty()
        });
        before - self.hits.len()
    }

    pub fn tracked_clients(&self) -> usize { self.hits.len() }
}

fn expire(dq: &mut VecDeque<Instant>, now: Instant) {
    while let Some(&t) = dq.front() {
        if now.duration_since(t) > WINDOW { dq.pop_front(); } else { break; }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn budget_is_per_client() {
        let mut limiter = RateLimiter::new(Some(2));
        assert!(limiter.hit_ok("10.0.0.1"));
        assert!(limiter.hit_ok("10.0.0.1"));
        assert!(!limiter.hit_ok("10.0.0.1"));
        assert!(limiter.hit_ok("10.0.0.2"));
    }

    #[test]
    fn sweep_keeps_active_clients() {
        let mut limiter = RateLimiter::new(Some(5));
        limiter.hit_ok("a");
        assert_eq!(limiter.sweep(), 0);
        assert_eq!(limiter.tracked_clients(), 1);
    }

    #[test]
    fn disabled_limiter_admits_everything() {
        let mut limiter = RateLimiter::new(None);
        assert!((0..1000).all(|_| limiter.hit_ok("10.0.0.1")));
        assert_eq!(limiter.tracked_clients(), 0);
    }
}
