//! Caller-owned destinations.
//!
//! Registration never takes ownership of the variables it fills. The caller
//! keeps a [`Var`] and hands the command tree a clone of the handle; both
//! sides see the same storage. Everything is single-threaded, so the handle
//! is an `Rc<RefCell<T>>`.

use std::cell::{Ref, RefCell, RefMut};
use std::fmt;
use std::rc::Rc;

/// Shared handle to a value that flags and positional arguments write into.
///
/// # Examples
///
/// ```
/// use cmdtree_core::Var;
///
/// let name = Var::new(String::from("anonymous"));
/// let handle = name.clone();
/// handle.set("Janet".to_string());
/// assert_eq!(name.get(), "Janet");
/// ```
pub struct Var<T>(Rc<RefCell<T>>);

impl<T> Var<T> {
    pub fn new(value: T) -> Self {
        Self(Rc::new(RefCell::new(value)))
    }

    /// Returns a copy of the current value.
    pub fn get(&self) -> T
    where
        T: Clone,
    {
        self.0.borrow().clone()
    }

    pub fn set(&self, value: T) {
        *self.0.borrow_mut() = value;
    }

    pub fn borrow(&self) -> Ref<'_, T> {
        self.0.borrow()
    }

    pub fn borrow_mut(&self) -> RefMut<'_, T> {
        self.0.borrow_mut()
    }

    /// Runs `f` against the value in place.
    pub fn update<R>(&self, f: impl FnOnce(&mut T) -> R) -> R {
        f(&mut self.0.borrow_mut())
    }

    /// Whether both handles point at the same storage.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl<T> Clone for Var<T> {
    fn clone(&self) -> Self {
        Self(Rc::clone(&self.0))
    }
}

impl<T: Default> Default for Var<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T> From<T> for Var<T> {
    fn from(value: T) -> Self {
        Self::new(value)
    }
}

impl<T: fmt::Debug> fmt::Debug for Var<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0.try_borrow() {
            Ok(value) => f.debug_tuple("Var").field(&*value).finish(),
            Err(_) => f.write_str("Var(<borrowed>)"),
        }
    }
}
