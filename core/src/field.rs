//! Binding plain records to flags and positional arguments.
//!
//! A record type opts in by implementing [`Flags`], which returns a
//! descriptor table: one [`Field`] per member, each carrying the accessor
//! for that member plus its metadata (display name, description, default
//! literal, position, separator). The table is built by hand once per type;
//! no runtime reflection is involved.
//!
//! Nested records are flattened: their fields land in the same flag set as
//! the parent's, without any prefixing.
//!
//! # Examples
//!
//! ```
//! use cmdtree_core::{Cli, Field, Flags};
//!
//! #[derive(Default)]
//! struct Create {
//!     mode: String,
//!     retries: u8,
//! }
//!
//! impl Flags for Create {
//!     fn fields() -> Vec<Field<Self>> {
//!         vec![
//!             Field::value("mode", |c: &mut Self| &mut c.mode)
//!                 .description("Creation mode")
//!                 .pos(1),
//!             Field::value("retries", |c: &mut Self| &mut c.retries).default("3"),
//!         ]
//!     }
//! }
//!
//! let mut cli = Cli::new("app", "Demo", "v0.1.0");
//! cli.new_sub_command_function("create", "Create things", |opts: &mut Create| {
//!     assert_eq!(opts.mode, "fast");
//!     assert_eq!(opts.retries, 3);
//!     Ok(())
//! })
//! .unwrap();
//!
//! cli.run_args(["create", "fast"]).unwrap();
//! ```

use std::fmt;
use std::rc::Rc;

use tracing::warn;

use crate::command::Command;
use crate::error::ConfigError;
use crate::kind::Bindable;
use crate::place::{Bound, Destination, Place, Projected};

/// A record whose fields can be bound as flags.
pub trait Flags: Sized + 'static {
    /// Descriptor table for the record's fields, in registration order.
    fn fields() -> Vec<Field<Self>>;

    /// Base value installed before any declared default is applied.
    ///
    /// Declared defaults are written on top, so a field with both ends up
    /// with its declared default.
    fn defaults() -> Option<Self> {
        None
    }
}

type MakeDestination<R> = Box<dyn Fn(Rc<dyn Place<R>>) -> Rc<dyn Destination>>;
type BindNested<R> = Box<dyn Fn(Rc<dyn Place<R>>, &mut Command) -> Result<(), ConfigError>>;

enum Shape<R> {
    Value(MakeDestination<R>),
    Nested(BindNested<R>),
    Unsupported(&'static str),
}

/// One entry of a [`Flags`] descriptor table.
pub struct Field<R> {
    ident: &'static str,
    name: Option<String>,
    description: String,
    default: Option<String>,
    pos: Option<usize>,
    sep: Option<String>,
    shape: Shape<R>,
}

impl<R: 'static> Field<R> {
    fn with_shape(ident: &'static str, shape: Shape<R>) -> Self {
        Self {
            ident,
            name: None,
            description: String::new(),
            default: None,
            pos: None,
            sep: None,
            shape,
        }
    }

    /// A scalar or list member reached through `access`.
    pub fn value<V: Bindable>(ident: &'static str, access: fn(&mut R) -> &mut V) -> Self {
        let make: MakeDestination<R> =
            Box::new(move |parent: Rc<dyn Place<R>>| -> Rc<dyn Destination> {
                let place: Rc<dyn Place<V>> = Rc::new(Projected::new(parent, access));
                Rc::new(Bound::new(place))
            });
        Self::with_shape(ident, Shape::Value(make))
    }

    /// An embedded record whose fields are promoted into the parent's flags.
    pub fn nested<N: Flags>(ident: &'static str, access: fn(&mut R) -> &mut N) -> Self {
        let bind: BindNested<R> = Box::new(move |parent: Rc<dyn Place<R>>, command: &mut Command| {
            let place: Rc<dyn Place<N>> = Rc::new(Projected::new(parent, access));
            bind_fields(command, place)
        });
        Self::with_shape(ident, Shape::Nested(bind))
    }

    /// A member whose type cannot be bound. It is skipped with a warning.
    pub fn unsupported(ident: &'static str, type_name: &'static str) -> Self {
        Self::with_shape(ident, Shape::Unsupported(type_name))
    }

    /// Flag display name. Defaults to the lower-cased identifier.
    pub fn name(mut self, name: &str) -> Self {
        self.name = Some(name.to_string());
        self
    }

    pub fn description(mut self, description: &str) -> Self {
        self.description = description.to_string();
        self
    }

    /// Source-form default, parsed into the field's kind at bind time.
    pub fn default(mut self, literal: &str) -> Self {
        self.default = Some(literal.to_string());
        self
    }

    /// 1-based positional index.
    pub fn pos(mut self, index: usize) -> Self {
        self.pos = Some(index);
        self
    }

    /// Separator splitting one positional token (or the default literal)
    /// into list elements.
    pub fn sep(mut self, separator: &str) -> Self {
        self.sep = Some(separator.to_string());
        self
    }

    pub fn display_name(&self) -> String {
        self.name
            .clone()
            .unwrap_or_else(|| self.ident.to_lowercase())
    }
}

impl<R> fmt::Debug for Field<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let shape = match &self.shape {
            Shape::Value(_) => "value",
            Shape::Nested(_) => "nested",
            Shape::Unsupported(_) => "unsupported",
        };
        f.debug_struct("Field")
            .field("ident", &self.ident)
            .field("name", &self.name)
            .field("default", &self.default)
            .field("pos", &self.pos)
            .field("sep", &self.sep)
            .field("shape", &shape)
            .finish()
    }
}

/// Registers every field of the record living at `place` on `command`.
pub(crate) fn bind_fields<R: Flags>(
    command: &mut Command,
    place: Rc<dyn Place<R>>,
) -> Result<(), ConfigError> {
    for field in R::fields() {
        let name = field.display_name();
        let value = match &field.shape {
            Shape::Nested(bind) => {
                bind(Rc::clone(&place), command)?;
                continue;
            }
            Shape::Unsupported(type_name) => {
                warn!(
                    command = %command.path(),
                    field = field.ident,
                    type_name = *type_name,
                    "Unsupported field type; skipping"
                );
                continue;
            }
            Shape::Value(make) => make(Rc::clone(&place)),
        };

        let separator = field.sep.as_deref().filter(|sep| !sep.is_empty());
        if let Some(literal) = field.default.as_deref().filter(|lit| !lit.is_empty()) {
            value
                .set_default(literal, separator)
                .map_err(|source| ConfigError::InvalidDefault {
                    field: field.ident.to_string(),
                    literal: literal.to_string(),
                    source,
                })?;
        }
        if let Some(index) = field.pos {
            command.bind_position(index, &name, Rc::clone(&value), separator)?;
        }
        command.register(&name, &field.description, value)?;
    }
    Ok(())
}
