use chrono::{DateTime, Duration, Utc};
use lru::LruCache;
use rand::Rng;
use std::{num::NonZeroUsize, sync::Mutex};
use uuid::Uuid;

/// Pending challenges kept at once; the least recently issued is evicted first.
const CAPACITY: usize = 10_000;
/// Wrong guesses tolerated before the challenge is discarded.
pub const MAX_ATTEMPTS: u8 = 5;

#[derive(Debug, Clone)]
struct OtpChallenge {
    code: String,
    expires_at: DateTime<Utc>,
    failed_attempts: u8,
}

/// OtpStore
///
/// Holds the one-time sign-in codes emailed during two-factor login, keyed by
/// user id. A code is single use, expires after `ttl`, and is dropped after
/// [`MAX_ATTEMPTS`] wrong guesses. Issuing a new code replaces any pending one.
pub struct OtpStore {
    challenges: Mutex<LruCache<Uuid, OtpChallenge>>,
    ttl: Duration,
}

impl OtpStore {
    pub fn new(ttl_seconds: u64) -> Self {
        let capacity = NonZeroUsize::new(CAPACITY).unwrap_or(NonZeroUsize::MIN);
        Self {
            challenges: Mutex::new(LruCache::new(capacity)),
            ttl: Duration::seconds(ttl_seconds as i64),
        }
    }

    /// Generates and stores a fresh 6-digit code for `user_id`.
    pub fn issue(&self, user_id: Uuid) -> String {
        self.issue_at(user_id, Utc::now())
    }

    pub fn issue_at(&self, user_id: Uuid, now: DateTime<Utc>) -> String {
        let code = format!("{:06}", rand::thread_rng().gen_range(0..1_000_000));
        let challenge = OtpChallenge {
            code: code.clone(),
            expires_at: now + self.ttl,
            failed_attempts: 0,
        };
        self.lock().put(user_id, challenge);
        code
    }

    /// Consumes the pending challenge if `code` matches and it has not expired.
    pub fn verify(&self, user_id: Uuid, code: &str) -> bool {
        self.verify_at(user_id, code, Utc::now())
    }

    pub fn verify_at(&self, user_id: Uuid, code: &str, now: DateTime<Utc>) -> bool {
        let mut challenges = self.lock();
        let Some(challenge) = challenges.peek_mut(&user_id) else {
            return false;
        };

        if challenge.expires_at <= now {
            challenges.pop(&user_id);
            return false;
        }

        if challenge.code == code {
            challenges.pop(&user_id);
            return true;
        }

        challenge.failed_attempts += 1;
        if challenge.failed_attempts >= MAX_ATTEMPTS {
            tracing::warn!(%user_id, "OTP challenge discarded after too many failed attempts");
            challenges.pop(&user_id);
        }
        false
    }

    // A panic while holding the lock cannot leave a challenge half-written.
    fn lock(&self) -> std::sync::MutexGuard<'_, LruCache<Uuid, OtpChallenge>> {
        self.challenges
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
