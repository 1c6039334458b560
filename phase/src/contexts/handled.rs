use std::any::type_name;
use std::cell::RefCell;

use yew::prelude::*;

use crate::PhaseError;

/// A value shared with many call sites through an explicit registry.
///
/// Participants hold a reference to the registry instead of looking the value
/// up globally. [`HandledContext::provide`] opens a provider scope; reads
/// outside every scope fail with [`PhaseError::MissingProvider`] unless the
/// registry was built with a default.
pub struct HandledContext<T> {
    name: &'static str,
    default: Option<T>,
    stack: RefCell<Vec<T>>,
}

impl<T: Clone> HandledContext<T> {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            default: None,
            stack: RefCell::new(Vec::new()),
        }
    }

    pub fn with_default(name: &'static str, default: T) -> Self {
        Self {
            default: Some(default),
            ..Self::new(name)
        }
    }

    /// Provide `value` until the returned scope is dropped. Scopes nest; the
    /// innermost wins.
    pub fn provide(&self, value: T) -> ProviderScope<'_, T> {
        let mut stack = self.stack.borrow_mut();
        let depth = stack.len();
        stack.push(value);
        ProviderScope {
            context: self,
            depth,
        }
    }

    pub fn get(&self) -> Result<T, PhaseError> {
        self.stack
            .borrow()
            .last()
            .or(self.default.as_ref())
            .cloned()
            .ok_or(PhaseError::MissingProvider { context: self.name })
    }
}

/// Keeps a provided value in place; restores the outer one on drop.
pub struct ProviderScope<'a, T> {
    context: &'a HandledContext<T>,
    depth: usize,
}

impl<T> Drop for ProviderScope<'_, T> {
    fn drop(&mut self) {
        self.context.stack.borrow_mut().truncate(self.depth);
    }
}

/// Read a context provided with `ContextProvider<T>`, failing with
/// [`PhaseError::MissingProvider`] outside of one.
#[hook]
pub fn use_handled_context<T>() -> Result<T, PhaseError>
where
    T: Clone + PartialEq + 'static,
{
    use_context::<T>().ok_or(PhaseError::MissingProvider {
        context: type_name::<T>(),
    })
}
