//! Injectable time and randomness.
//!
//! Record timestamps, record ids and staging-file suffixes all come from these
//! traits so tests can pin them and parallel callers can avoid sharing state.

use std::sync::Mutex;

use chrono::{DateTime, Utc};
use rand::rngs::StdRng;
use rand::{Rng, RngCore, SeedableRng};

/// Supplies the current time.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock frozen at a single instant.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

/// A source of random 64-bit values, safe to share between threads.
pub trait RandomSource: Send + Sync {
    fn next_u64(&self) -> u64;
}

/// Draws from the calling thread's RNG. Threads never contend.
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadRandom;

impl RandomSource for ThreadRandom {
    fn next_u64(&self) -> u64 {
        rand::rng().next_u64()
    }
}

/// A seeded RNG producing a reproducible sequence.
#[derive(Debug)]
pub struct SeededRandom(Mutex<StdRng>);

impl SeededRandom {
    pub fn new(seed: u64) -> Self {
        SeededRandom(Mutex::new(StdRng::seed_from_u64(seed)))
    }
}

impl RandomSource for SeededRandom {
    fn next_u64(&self) -> u64 {
        // A poisoned lock only means another thread panicked mid-draw; the RNG
        // state itself is still usable.
        let mut rng = self.0.lock().unwrap_or_else(|e| e.into_inner());
        rng.next_u64()
    }
}

/// Length of ids produced by [`short_uid`].
pub const SHORT_UID_LEN: usize = 14;

const UID_LEADING: &[u8] = b"abcdefghijklmnopqrstuvwxyz";
const UID_ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";

/// Generates a short lowercase alphanumeric id that always starts with a letter.
pub fn short_uid(random: &dyn RandomSource) -> String {
    let mut rng = SourceRng(random);
    let mut uid = String::with_capacity(SHORT_UID_LEN);
    uid.push(pick(&mut rng, UID_LEADING));
    for _ in 1..SHORT_UID_LEN {
        uid.push(pick(&mut rng, UID_ALPHABET));
    }
    uid
}

fn pick(rng: &mut SourceRng<'_>, alphabet: &[u8]) -> char {
    char::from(alphabet[rng.random_range(0..alphabet.len())])
}

/// Lets rand's distributions draw from a [`RandomSource`].
struct SourceRng<'a>(&'a dyn RandomSource);

impl RngCore for SourceRng<'_> {
    fn next_u32(&mut self) -> u32 {
        (self.0.next_u64() >> 32) as u32
    }

    fn next_u64(&mut self) -> u64 {
        self.0.next_u64()
    }

    fn fill_bytes(&mut self, dst: &mut [u8]) {
        for chunk in dst.chunks_mut(8) {
            let bytes = self.0.next_u64().to_le_bytes();
            chunk.copy_from_slice(&bytes[..chunk.len()]);
        }
    }
}
