//! Environment abstraction.
//!
//! Decouples message construction from system resources (wall clock,
//! randomness) so that frame IDs and timestamps can be pinned in tests.

/// Wall clock and randomness.
///
/// # Invariants
///
/// - `random_bytes()` uses OS entropy in production
/// - Methods are infallible except in exceptional circumstances (OS entropy
///   exhaustion, a clock set before the Unix epoch)
pub trait Environment: Clone + Send + Sync + 'static {
    /// Milliseconds since the Unix epoch.
    fn wall_clock_millis(&self) -> u64;

    /// Fills the provided buffer with random bytes.
    fn random_bytes(&self, buffer: &mut [u8]);

    /// Generates a random version-4 UUID string, used for message IDs.
    fn new_id(&self) -> String {
        let mut bytes = [0u8; 16];
        self.random_bytes(&mut bytes);
        uuid::Builder::from_random_bytes(bytes).into_uuid().to_string()
    }
}

/// Production environment using the system clock and OS RNG.
///
/// # Panics
///
/// Panics if the OS RNG fails or the clock reads before 1970. Neither is
/// recoverable and both indicate OS-level faults.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemEnv;

impl SystemEnv {
    /// Create a new system environment.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Environment for SystemEnv {
    #[allow(clippy::disallowed_methods)]
    #[allow(clippy::expect_used)]
    fn wall_clock_millis(&self) -> u64 {
        let elapsed = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .expect("invariant: system clock is after Unix epoch (1970-01-01)");
        u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX)
    }

    #[allow(clippy::expect_used)]
    fn random_bytes(&self, buffer: &mut [u8]) {
        getrandom::fill(buffer).expect("invariant: OS RNG failure is unrecoverable");
    }
}

/// Deterministic environment for tests.
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils {
    use std::sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    };

    use super::Environment;

    /// Seeded RNG and a manually advanced wall clock. Clones share state.
    #[derive(Debug, Clone)]
    pub struct MockEnv {
        clock_ms: Arc<AtomicU64>,
        rng: Arc<AtomicU64>,
    }

    impl MockEnv {
        /// Environment whose clock starts at `start_ms` with a fixed seed.
        pub fn new(start_ms: u64) -> Self {
            Self::with_seed(start_ms, 0x9E37_79B9_7F4A_7C15)
        }

        /// Environment with an explicit RNG seed.
        pub fn with_seed(start_ms: u64, seed: u64) -> Self {
            Self { clock_ms: Arc::new(AtomicU64::new(start_ms)), rng: Arc::new(AtomicU64::new(seed)) }
        }

        /// Move the wall clock forward.
        pub fn advance_millis(&self, millis: u64) {
            self.clock_ms.fetch_add(millis, Ordering::SeqCst);
        }
    }

    impl Environment for MockEnv {
        fn wall_clock_millis(&self) -> u64 {
            self.clock_ms.load(Ordering::SeqCst)
        }

        fn random_bytes(&self, buffer: &mut [u8]) {
            for chunk in buffer.chunks_mut(8) {
                // splitmix64
                let mut z = self.rng.fetch_add(0x9E37_79B9_7F4A_7C15, Ordering::SeqCst);
                z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
                z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
                z ^= z >> 31;
                chunk.copy_from_slice(&z.to_be_bytes()[..chunk.len()]);
            }
        }
    }
}
