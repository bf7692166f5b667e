//! The primitive flag-token parser.
//!
//! Recognises `-name`, `--name`, `-name=value`, `-name value` and the `--`
//! terminator. Parsing stops at the first token that is not flag-shaped and
//! hands back the unconsumed tail, which is what lets the dispatcher
//! interleave flags with positional arguments.

use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

use crate::error::{ConfigError, ParseError};
use crate::kind::Kind;
use crate::place::Destination;

/// Classification of a single argument token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Token<'a> {
    /// Anything that does not start with a dash, and a lone `-`.
    Positional,
    /// `--`
    Terminator,
    Flag {
        name: &'a str,
        value: Option<&'a str>,
    },
}

pub(crate) fn classify(token: &str) -> Result<Token<'_>, ParseError> {
    if token.len() < 2 || !token.starts_with('-') {
        return Ok(Token::Positional);
    }
    let body = match token.strip_prefix("--") {
        Some("") => return Ok(Token::Terminator),
        Some(rest) => rest,
        None => &token[1..],
    };
    if body.starts_with('-') || body.starts_with('=') {
        return Err(ParseError::BadSyntax(token.to_string()));
    }
    Ok(match body.split_once('=') {
        Some((name, value)) => Token::Flag {
            name,
            value: Some(value),
        },
        None => Token::Flag {
            name: body,
            value: None,
        },
    })
}

/// One registered flag.
///
/// Cloning a flag shares its destination, which is how inherited flags fill
/// the same variable from a child command.
#[derive(Clone)]
pub struct Flag {
    name: String,
    description: String,
    default: String,
    default_is_zero: bool,
    shortcut: Option<String>,
    required: bool,
    pub(crate) value: Rc<dyn Destination>,
}

impl Flag {
    /// Creates a flag whose default is the destination's current value.
    pub(crate) fn new(name: &str, description: &str, value: Rc<dyn Destination>) -> Self {
        Self {
            name: name.to_string(),
            description: description.to_string(),
            default: value.render(),
            default_is_zero: value.is_zero(),
            shortcut: None,
            required: false,
            value,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn kind(&self) -> Kind {
        self.value.kind()
    }

    /// Rendered value of the destination at registration time.
    pub fn default_value(&self) -> &str {
        &self.default
    }

    /// Whether the default is the kind's zero value (hidden in help).
    pub fn default_is_zero(&self) -> bool {
        self.default_is_zero
    }

    /// Rendered current value of the destination.
    pub fn current_value(&self) -> String {
        self.value.render()
    }

    pub fn shortcut(&self) -> Option<&str> {
        self.shortcut.as_deref()
    }

    pub fn is_required(&self) -> bool {
        self.required
    }
}

impl fmt::Debug for Flag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Flag")
            .field("name", &self.name)
            .field("kind", &self.kind())
            .field("default", &self.default)
            .field("shortcut", &self.shortcut)
            .field("required", &self.required)
            .finish_non_exhaustive()
    }
}

/// The named flags of one command.
///
/// Flags are kept sorted by name, which is also their help-listing order.
#[derive(Debug, Clone, Default)]
pub struct FlagSet {
    name: String,
    flags: BTreeMap<String, Flag>,
}

impl FlagSet {
    pub(crate) fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            flags: BTreeMap::new(),
        }
    }

    /// Name of the owning command (its path).
    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn set_name(&mut self, name: &str) {
        self.name = name.to_string();
    }

    /// Installs the implicit help flag on a fresh set.
    pub(crate) fn install_help(&mut self, flag: Flag) {
        self.flags.insert(flag.name.clone(), flag);
    }

    pub(crate) fn insert(&mut self, flag: Flag) -> Result<(), ConfigError> {
        if self.flags.contains_key(&flag.name) || self.by_shortcut(&flag.name).is_some() {
            return Err(ConfigError::DuplicateFlag {
                path: self.name.clone(),
                name: flag.name,
            });
        }
        self.flags.insert(flag.name.clone(), flag);
        Ok(())
    }

    pub fn lookup(&self, name: &str) -> Option<&Flag> {
        self.flags.get(name)
    }

    /// Finds the flag whose shortcut is `shortcut`.
    pub fn by_shortcut(&self, shortcut: &str) -> Option<&Flag> {
        self.flags
            .values()
            .find(|flag| flag.shortcut.as_deref() == Some(shortcut))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Flag> {
        self.flags.values()
    }

    pub fn len(&self) -> usize {
        self.flags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.flags.is_empty()
    }

    pub(crate) fn set_description(&mut self, name: &str, description: String) {
        if let Some(flag) = self.flags.get_mut(name) {
            flag.description = description;
        }
    }

    pub(crate) fn set_shortcut(&mut self, name: &str, shortcut: &str) -> Result<(), ConfigError> {
        if self.flags.contains_key(shortcut)
            || self
                .by_shortcut(shortcut)
                .is_some_and(|flag| flag.name != name)
        {
            return Err(ConfigError::DuplicateShortcut {
                path: self.name.clone(),
                shortcut: shortcut.to_string(),
            });
        }
        let flag = self.flag_mut(name)?;
        flag.shortcut = Some(shortcut.to_string());
        Ok(())
    }

    pub(crate) fn set_required(&mut self, name: &str) -> Result<(), ConfigError> {
        self.flag_mut(name)?.required = true;
        Ok(())
    }

    fn flag_mut(&mut self, name: &str) -> Result<&mut Flag, ConfigError> {
        let path = &self.name;
        self.flags
            .get_mut(name)
            .ok_or_else(|| ConfigError::UnknownFlag {
                path: path.clone(),
                name: name.to_string(),
            })
    }

    /// Consumes leading flag tokens from `args`, writing each value into its
    /// destination, and returns the tail starting at the first non-flag
    /// token. A `--` terminator is consumed and ends flag parsing.
    pub fn parse<'a>(&self, args: &'a [String]) -> Result<&'a [String], ParseError> {
        self.parse_prefix(args).map(|(rest, _)| rest)
    }

    /// Like [`parse`](Self::parse), also reporting whether a `--` terminator
    /// was consumed. After a terminator every remaining token is positional.
    pub(crate) fn parse_prefix<'a>(
        &self,
        args: &'a [String],
    ) -> Result<(&'a [String], bool), ParseError> {
        let mut rest = args;
        while let Some((token, tail)) = rest.split_first() {
            let (name, inline) = match classify(token)? {
                Token::Positional => break,
                Token::Terminator => return Ok((tail, true)),
                Token::Flag { name, value } => (name, value),
            };
            rest = tail;

            let flag = self
                .flags
                .get(name)
                .ok_or_else(|| ParseError::UnknownFlag(name.to_string()))?;
            let value = match inline {
                Some(value) => value,
                None if !flag.kind().takes_value() => "true",
                None => {
                    let (value, tail) = rest
                        .split_first()
                        .ok_or_else(|| ParseError::MissingValue(name.to_string()))?;
                    rest = tail;
                    value.as_str()
                }
            };
            flag.value
                .set_flag(value)
                .map_err(|source| ParseError::InvalidValue {
                    flag: name.to_string(),
                    token: value.to_string(),
                    source,
                })?;
        }
        Ok((rest, false))
    }
}
