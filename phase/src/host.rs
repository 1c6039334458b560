//! Capabilities the phase core needs from whatever hosts it: a state cell to
//! publish views into, and effect registration keyed on a dependency value.
//!
//! Yew provides both through its hooks; [`LocalCell`] and [`EffectSlot`] are
//! the plain single-threaded versions used by the framework-neutral sites.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use yew::{UseStateHandle, UseStateSetter};

/// A value holder whose setter schedules a re-render of its owner.
pub trait StateCell<T> {
    fn set(&self, value: T);
}

impl<T> StateCell<T> for UseStateSetter<T> {
    fn set(&self, value: T) {
        UseStateSetter::set(self, value);
    }
}

impl<T> StateCell<T> for UseStateHandle<T> {
    fn set(&self, value: T) {
        UseStateHandle::set(self, value);
    }
}

/// Shared, single-threaded state cell. Clones observe the same value.
///
/// Counts writes so owners can tell whether anything was published.
pub struct LocalCell<T> {
    value: Rc<RefCell<T>>,
    writes: Rc<Cell<usize>>,
}

impl<T> LocalCell<T> {
    pub fn new(value: T) -> Self {
        Self {
            value: Rc::new(RefCell::new(value)),
            writes: Rc::new(Cell::new(0)),
        }
    }

    /// Number of `set` calls so far.
    pub fn writes(&self) -> usize {
        self.writes.get()
    }
}

impl<T: Clone> LocalCell<T> {
    pub fn get(&self) -> T {
        self.value.borrow().clone()
    }
}

impl<T> StateCell<T> for LocalCell<T> {
    fn set(&self, value: T) {
        *self.value.borrow_mut() = value;
        self.writes.set(self.writes.get() + 1);
    }
}

impl<T> Clone for LocalCell<T> {
    fn clone(&self) -> Self {
        Self {
            value: self.value.clone(),
            writes: self.writes.clone(),
        }
    }
}

impl<T: Default> Default for LocalCell<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T: fmt::Debug> fmt::Debug for LocalCell<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocalCell")
            .field("value", &self.value.borrow())
            .field("writes", &self.writes.get())
            .finish()
    }
}

pub type Teardown = Box<dyn FnOnce()>;

/// Runs an effect once per change of a dependency key.
///
/// The teardown returned by the previous effect runs before the next effect
/// and when the slot is cleared or dropped.
pub struct EffectSlot<K> {
    key: Option<K>,
    teardown: Option<Teardown>,
}

impl<K: PartialEq> EffectSlot<K> {
    pub fn new() -> Self {
        Self {
            key: None,
            teardown: None,
        }
    }

    pub fn key(&self) -> Option<&K> {
        self.key.as_ref()
    }

    pub fn is_current(&self, key: &K) -> bool {
        self.key.as_ref() == Some(key)
    }

    /// Run `effect` if `key` differs from the registered key. Returns whether
    /// it ran.
    pub fn register<F>(&mut self, key: K, effect: F) -> bool
    where
        F: FnOnce(&K) -> Option<Teardown>,
    {
        if self.is_current(&key) {
            return false;
        }
        self.run_teardown();
        self.teardown = effect(&key);
        self.key = Some(key);
        true
    }

    /// Run the pending teardown and forget the key.
    pub fn clear(&mut self) {
        self.run_teardown();
        self.key = None;
    }

    fn run_teardown(&mut self) {
        if let Some(teardown) = self.teardown.take() {
            teardown();
        }
    }
}

impl<K: PartialEq> Default for EffectSlot<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K> Drop for EffectSlot<K> {
    fn drop(&mut self) {
        if let Some(teardown) = self.teardown.take() {
            teardown();
        }
    }
}
