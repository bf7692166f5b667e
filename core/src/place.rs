//! Type-erased write access to bound destinations.
//!
//! A [`Place`] is somewhere a `T` lives: a [`Var`] owned by the caller, or a
//! field projected out of a record that itself lives in a place. Nested
//! records are bound by stacking projections, so a flag on an embedded
//! struct writes through every level down to the caller's `Var`.
//!
//! [`Bound`] pairs a place with its [`Bindable`] type and exposes the
//! operations the flag set and the positional binder need as a
//! [`Destination`] trait object.

use std::rc::Rc;

use crate::error::ValueError;
use crate::kind::{Bindable, Kind};
use crate::var::Var;

pub(crate) trait Place<T> {
    fn with(&self, f: &mut dyn FnMut(&mut T));
}

impl<T> Place<T> for Var<T> {
    fn with(&self, f: &mut dyn FnMut(&mut T)) {
        f(&mut *self.borrow_mut());
    }
}

/// A field reached through an accessor on the record held by `parent`.
pub(crate) struct Projected<R, V> {
    parent: Rc<dyn Place<R>>,
    access: fn(&mut R) -> &mut V,
}

impl<R, V> Projected<R, V> {
    pub(crate) fn new(parent: Rc<dyn Place<R>>, access: fn(&mut R) -> &mut V) -> Self {
        Self { parent, access }
    }
}

impl<R, V> Place<V> for Projected<R, V> {
    fn with(&self, f: &mut dyn FnMut(&mut V)) {
        let access = self.access;
        self.parent.with(&mut |record: &mut R| f(access(record)));
    }
}

/// Operations on a bound destination, independent of its Rust type.
pub(crate) trait Destination {
    fn kind(&self) -> Kind;

    fn set_flag(&self, token: &str) -> Result<(), ValueError>;

    fn set_positional(&self, token: &str, separator: Option<&str>) -> Result<(), ValueError>;

    fn set_default(&self, literal: &str, separator: Option<&str>) -> Result<(), ValueError>;

    fn render(&self) -> String;

    fn is_zero(&self) -> bool;
}

pub(crate) struct Bound<V> {
    place: Rc<dyn Place<V>>,
}

impl<V: Bindable> Bound<V> {
    pub(crate) fn new(place: Rc<dyn Place<V>>) -> Self {
        Self { place }
    }

    pub(crate) fn from_var(var: &Var<V>) -> Self {
        Self::new(Rc::new(var.clone()))
    }

    fn apply<T: Default>(&self, mut op: impl FnMut(&mut V) -> T) -> T {
        let mut out = T::default();
        self.place.with(&mut |value: &mut V| out = op(value));
        out
    }
}

impl<V: Bindable> Destination for Bound<V> {
    fn kind(&self) -> Kind {
        V::kind()
    }

    fn set_flag(&self, token: &str) -> Result<(), ValueError> {
        let mut result = Ok(());
        self.place.with(&mut |value: &mut V| result = value.set_flag(token));
        result
    }

    fn set_positional(&self, token: &str, separator: Option<&str>) -> Result<(), ValueError> {
        let mut result = Ok(());
        self.place
            .with(&mut |value: &mut V| result = value.set_positional(token, separator));
        result
    }

    fn set_default(&self, literal: &str, separator: Option<&str>) -> Result<(), ValueError> {
        let mut result = Ok(());
        self.place
            .with(&mut |value: &mut V| result = value.set_default(literal, separator));
        result
    }

    fn render(&self) -> String {
        self.apply(|value| value.render())
    }

    fn is_zero(&self) -> bool {
        self.apply(|value| value.is_zero())
    }
}
