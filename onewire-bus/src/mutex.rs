//! Exclusive-access guard for multi-step bus transactions.
//!
//! A 1-Wire transaction is a sequence of individually timed slots; interleaving slots from two
//! logical operations corrupts both. When more than one caller can issue bus operations on the
//! same physical line, the bus handle must be configured with a real [BusMutex] implementation,
//! and every multi-step sequence (a search pass, a reset+match+command run) must hold it for its
//! entire duration.

/// Exclusive-access primitive used to serialize multi-step bus transactions.
///
/// [protect](BusMutex::protect) is a blocking acquire; [unprotect](BusMutex::unprotect) releases.
/// Implementations must be releasable from the acquiring context on every exit path, including
/// error and timeout paths.
pub trait BusMutex {
    /// Block until exclusive access to the bus is acquired.
    fn protect(&self);
    /// Release exclusive access to the bus.
    fn unprotect(&self);
}

/// Guard used when no concurrent access is configured. Both operations do nothing,
/// so an unshared bus pays no synchronization cost.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopMutex;

impl BusMutex for NoopMutex {
    fn protect(&self) {}
    fn unprotect(&self) {}
}

impl<M: BusMutex> BusMutex for &M {
    fn protect(&self) {
        (**self).protect()
    }

    fn unprotect(&self) {
        (**self).unprotect()
    }
}

#[cfg(feature = "std")]
mod std_impl {
    use super::BusMutex;
    use std::sync::{Arc, Condvar, Mutex};

    /// A blocking [BusMutex] over [std::sync] primitives, for hosted platforms.
    ///
    /// Implemented as a binary semaphore so acquisition and release do not have to happen
    /// in the same lexical scope, which is what split protect/unprotect calls require.
    #[derive(Debug, Default)]
    pub struct StdBusMutex {
        locked: Mutex<bool>,
        waiters: Condvar,
    }

    impl BusMutex for StdBusMutex {
        fn protect(&self) {
            let mut locked = self.locked.lock().unwrap_or_else(|e| e.into_inner());
            while *locked {
                locked = self.waiters.wait(locked).unwrap_or_else(|e| e.into_inner());
            }
            *locked = true;
        }

        fn unprotect(&self) {
            *self.locked.lock().unwrap_or_else(|e| e.into_inner()) = false;
            self.waiters.notify_one();
        }
    }

    impl<M: BusMutex> BusMutex for Arc<M> {
        fn protect(&self) {
            (**self).protect()
        }

        fn unprotect(&self) {
            (**self).unprotect()
        }
    }
}

#[cfg(feature = "std")]
pub use std_impl::StdBusMutex;
