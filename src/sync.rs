//! Synchronization primitives shared between ISR and task context.
//!
//! [`IRQSafeNullLock`] in the nanokernel this crate is patterned on masks
//! IRQs on one specific architecture. This crate targets no specific
//! architecture, so the equivalent here is built on the `critical-section`
//! crate: firmware picks the concrete masking strategy (a single-core
//! "disable IRQs" critical section, a multi-core spinlock, whatever the
//! target needs) by linking one `critical-section` impl crate, and this
//! type stays portable.

use core::cell::RefCell;

use critical_section::Mutex;

/// Guards a single field (or small group of fields) that both an ISR and a
/// task-context caller touch. Critical sections taken through this type must
/// stay short: no allocation, no blocking, no calls back into driver code
/// that itself takes a critical section.
pub struct IrqSafeCell<T> {
    inner: Mutex<RefCell<T>>,
}

impl<T> IrqSafeCell<T> {
    pub const fn new(value: T) -> Self {
        Self {
            inner: Mutex::new(RefCell::new(value)),
        }
    }

    /// Runs `f` with exclusive access to the wrapped value for the duration
    /// of one critical section.
    pub fn with<R>(&self, f: impl FnOnce(&mut T) -> R) -> R {
        critical_section::with(|cs| f(&mut self.inner.borrow_ref_mut(cs)))
    }

    /// Read-only convenience wrapper over [`Self::with`].
    pub fn with_ref<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        critical_section::with(|cs| f(&self.inner.borrow_ref(cs)))
    }
}

// SAFETY: access is always funneled through `critical_section::with`, which
// provides the mutual exclusion `Sync` requires.
unsafe impl<T: Send> Sync for IrqSafeCell<T> {}

/// A single-slot, overwrite-semantics notification used by the Framer to
/// wake a task waiting on frame completion or TX completion.
///
/// "Overwrite semantics" means the most recently posted value wins if two
/// notifications arrive before the waiting task gets to run, matching the
/// ordering guarantee in the concurrency model: a later error of equal or
/// greater severity is never silently dropped in favor of an older one.
pub struct Notify<T> {
    slot: IrqSafeCell<Option<T>>,
}

impl<T: Copy> Notify<T> {
    pub const fn new() -> Self {
        Self {
            slot: IrqSafeCell::new(None),
        }
    }

    /// Called from ISR (or task) context to post a value, overwriting any
    /// value not yet observed.
    pub fn notify(&self, value: T) {
        self.slot.with(|slot| *slot = Some(value));
    }

    /// Non-blocking poll: returns and clears the pending value, if any.
    pub fn poll(&self) -> Option<T> {
        self.slot.with(|slot| slot.take())
    }

    /// Blocks (by polling) until a value is posted or `timeout_us` elapses,
    /// as measured by `timer`. There is no task scheduler to suspend against
    /// in a portable `no_std` crate, so this degrades to a bounded busy
    /// loop; a firmware integration layer that owns a real task notification
    /// primitive is free to replace this polling with a blocking wait by
    /// wiring `notify()` to its own wake mechanism instead of calling
    /// `wait()`.
    pub fn wait(&self, timeout_us: u32, timer: &dyn crate::hal::Timer) -> Option<T> {
        let deadline = timer.now_us().wrapping_add(timeout_us as u64);
        loop {
            if let Some(value) = self.poll() {
                return Some(value);
            }
            if timer.now_us() >= deadline {
                return self.poll();
            }
        }
    }
}

impl<T: Copy> Default for Notify<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overwrite_semantics_keep_latest_value() {
        let n = Notify::<u8>::new();
        n.notify(1);
        n.notify(2);
        assert_eq!(n.poll(), Some(2));
        assert_eq!(n.poll(), None);
    }
}
