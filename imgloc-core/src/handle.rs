//! Scoped OS handle ownership.
//!
//! [`Scoped`] wraps a raw handle together with its release call in an RAII
//! pattern so that device contexts and bitmaps are freed on every exit path,
//! including early `?` returns after a partial acquisition.
//!
//! Guards declared later in a function drop first, so acquiring in the
//! natural order (screen DC, memory DC, bitmap, selection) releases in the
//! order GDI requires.

use std::ops::Deref;

/// A resource that must be released exactly once.
pub trait Release {
    /// Free the underlying OS resource.  Called once, from `Drop`.
    fn release(&mut self);
}

/// RAII owner that calls [`Release::release`] when dropped.
#[must_use = "Scoped releases its resource as soon as it is dropped"]
pub struct Scoped<R: Release> {
    resource: R,
}

impl<R: Release> Scoped<R> {
    /// Take ownership of an already-acquired resource.
    pub fn new(resource: R) -> Self {
        Self { resource }
    }
}

impl<R: Release> Deref for Scoped<R> {
    type Target = R;

    fn deref(&self) -> &R {
        &self.resource
    }
}

impl<R: Release> Drop for Scoped<R> {
    fn drop(&mut self) {
        self.resource.release();
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::sync::atomic::{AtomicIsize, Ordering};
    use std::sync::Arc;

    use super::Release;

    /// Counts live resources; incremented on acquire, decremented on release.
    #[derive(Clone, Default)]
    pub struct Ledger(Arc<AtomicIsize>);

    impl Ledger {
        pub fn acquire(&self, name: &'static str) -> Tracked {
            self.0.fetch_add(1, Ordering::SeqCst);
            Tracked {
                ledger: self.clone(),
                name,
                released: false,
            }
        }

        pub fn live(&self) -> isize {
            self.0.load(Ordering::SeqCst)
        }
    }

    pub struct Tracked {
        ledger: Ledger,
        pub name: &'static str,
        released: bool,
    }

    impl Release for Tracked {
        fn release(&mut self) {
            assert!(!self.released, "{} released twice", self.name);
            self.released = true;
            self.ledger.0.fetch_sub(1, Ordering::SeqCst);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::Ledger;
    use super::*;

    fn acquire_then_fail(ledger: &Ledger) -> Result<(), String> {
        let _dc = Scoped::new(ledger.acquire("dc"));
        let _bitmap = Scoped::new(ledger.acquire("bitmap"));
        assert_eq!(ledger.live(), 2);
        Err("blit failed".into())
    }

    #[test]
    fn test_release_on_drop() {
        let ledger = Ledger::default();
        {
            let guard = Scoped::new(ledger.acquire("dc"));
            assert_eq!(guard.name, "dc");
            assert_eq!(ledger.live(), 1);
        }
        assert_eq!(ledger.live(), 0);
    }

    #[test]
    fn test_release_on_early_return() {
        let ledger = Ledger::default();
        for _ in 0..10 {
            assert!(acquire_then_fail(&ledger).is_err());
        }
        assert_eq!(ledger.live(), 0);
    }
}
