//! Call Signature Module
//!
//! Derives the identity of a call from the operation name and its arguments.
//!
//! Statically typed callers key on `CallSignature<A>` where `A` is the
//! argument tuple; anything that is `Hash + Eq + Clone` qualifies, so
//! unsuitable argument types are rejected by the compiler. Callers that build
//! argument lists at runtime use [`Args`], whose float conversion is the one
//! place an argument can be refused with `UnsupportedArgument`.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde::{Serialize, Serializer};

use crate::error::{MementoError, Result};

// == Call Signature ==
/// Identity of a single call: operation name plus its arguments.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct CallSignature<A> {
    operation: Arc<str>,
    args: A,
}

impl<A> CallSignature<A> {
    // == Constructor ==
    /// Creates a signature for `operation` called with `args`.
    pub fn new(operation: impl Into<Arc<str>>, args: A) -> Self {
        Self {
            operation: operation.into(),
            args,
        }
    }

    pub fn operation(&self) -> &str {
        &self.operation
    }

    pub fn args(&self) -> &A {
        &self.args
    }
}

impl<A: fmt::Debug> fmt::Display for CallSignature<A> {
    /// Renders as `name(arg, ...)`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let args = format!("{:?}", self.args);
        if args.starts_with('(') {
            write!(f, "{}{}", self.operation, args)
        } else {
            write!(f, "{}({})", self.operation, args)
        }
    }
}

// == Keyword Args ==
/// Named arguments kept in name order, so the order they were supplied in
/// never changes the identity of a call.
#[derive(Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct KeywordArgs<V> {
    entries: BTreeMap<String, V>,
}

impl<V> Default for KeywordArgs<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> KeywordArgs<V> {
    pub fn new() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }

    // == With ==
    /// Builder form of [`KeywordArgs::insert`].
    pub fn with(mut self, name: impl Into<String>, value: V) -> Self {
        self.insert(name, value);
        self
    }

    /// Sets `name`, returning the value it replaced.
    pub fn insert(&mut self, name: impl Into<String>, value: V) -> Option<V> {
        self.entries.insert(name.into(), value)
    }

    pub fn get(&self, name: &str) -> Option<&V> {
        self.entries.get(name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates `(name, value)` pairs in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &V)> {
        self.entries.iter().map(|(name, value)| (name.as_str(), value))
    }
}

impl<S: Into<String>, V> FromIterator<(S, V)> for KeywordArgs<V> {
    fn from_iter<I: IntoIterator<Item = (S, V)>>(iter: I) -> Self {
        let mut kwargs = Self::new();
        for (name, value) in iter {
            kwargs.insert(name, value);
        }
        kwargs
    }
}

impl<V: fmt::Debug> fmt::Debug for KeywordArgs<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (name, value) in self.iter() {
            if !first {
                f.write_str(", ")?;
            }
            first = false;
            write!(f, "{}={:?}", name, value)?;
        }
        Ok(())
    }
}

// == Canonical Float ==
/// A float stored by bit pattern once `-0.0` is folded into `0.0`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CanonicalFloat(u64);

impl CanonicalFloat {
    /// Fails for NaN, which is not equal to itself and so cannot key a call.
    pub fn new(value: f64) -> Result<Self> {
        if value.is_nan() {
            return Err(MementoError::UnsupportedArgument(
                "NaN has no stable identity".to_string(),
            ));
        }
        let value = if value == 0.0 { 0.0 } else { value };
        Ok(Self(value.to_bits()))
    }

    pub fn get(self) -> f64 {
        f64::from_bits(self.0)
    }
}

impl Serialize for CanonicalFloat {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_f64(self.get())
    }
}

// == Arg Value ==
/// A dynamically typed argument.
#[derive(Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(untagged)]
pub enum ArgValue {
    Unit,
    Bool(bool),
    Int(i64),
    UInt(u64),
    Float(CanonicalFloat),
    Str(String),
    Bytes(Vec<u8>),
    List(Vec<ArgValue>),
}

impl ArgValue {
    // == Float ==
    /// Converts a float, refusing NaN with `UnsupportedArgument`.
    pub fn float(value: f64) -> Result<Self> {
        CanonicalFloat::new(value).map(ArgValue::Float)
    }
}

impl fmt::Debug for ArgValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgValue::Unit => f.write_str("()"),
            ArgValue::Bool(v) => write!(f, "{}", v),
            ArgValue::Int(v) => write!(f, "{}", v),
            ArgValue::UInt(v) => write!(f, "{}", v),
            ArgValue::Float(v) => write!(f, "{:?}", v.get()),
            ArgValue::Str(v) => write!(f, "{:?}", v),
            ArgValue::Bytes(v) => write!(f, "b{:?}", v),
            ArgValue::List(items) => f.debug_list().entries(items).finish(),
        }
    }
}

impl From<()> for ArgValue {
    fn from(_: ()) -> Self {
        ArgValue::Unit
    }
}

impl From<bool> for ArgValue {
    fn from(value: bool) -> Self {
        ArgValue::Bool(value)
    }
}

impl From<i32> for ArgValue {
    fn from(value: i32) -> Self {
        ArgValue::Int(value.into())
    }
}

impl From<i64> for ArgValue {
    fn from(value: i64) -> Self {
        ArgValue::Int(value)
    }
}

impl From<u32> for ArgValue {
    fn from(value: u32) -> Self {
        ArgValue::UInt(value.into())
    }
}

impl From<u64> for ArgValue {
    fn from(value: u64) -> Self {
        ArgValue::UInt(value)
    }
}

impl From<&str> for ArgValue {
    fn from(value: &str) -> Self {
        ArgValue::Str(value.to_string())
    }
}

impl From<String> for ArgValue {
    fn from(value: String) -> Self {
        ArgValue::Str(value)
    }
}

impl From<Vec<u8>> for ArgValue {
    fn from(value: Vec<u8>) -> Self {
        ArgValue::Bytes(value)
    }
}

impl From<Vec<ArgValue>> for ArgValue {
    fn from(value: Vec<ArgValue>) -> Self {
        ArgValue::List(value)
    }
}

impl TryFrom<f64> for ArgValue {
    type Error = MementoError;

    fn try_from(value: f64) -> Result<Self> {
        ArgValue::float(value)
    }
}

// == Args ==
/// Runtime-built argument list: ordered positionals plus keyword arguments.
#[derive(Clone, PartialEq, Eq, Hash, Default, Serialize)]
pub struct Args {
    positional: Vec<ArgValue>,
    keyword: KeywordArgs<ArgValue>,
}

impl Args {
    pub fn new() -> Self {
        Self::default()
    }

    // == Arg ==
    /// Appends a positional argument.
    pub fn arg(mut self, value: impl Into<ArgValue>) -> Self {
        self.positional.push(value.into());
        self
    }

    // == Try Arg ==
    /// Appends a positional argument whose conversion may be refused.
    pub fn try_arg<T>(mut self, value: T) -> Result<Self>
    where
        T: TryInto<ArgValue, Error = MementoError>,
    {
        self.positional.push(value.try_into()?);
        Ok(self)
    }

    // == Kwarg ==
    /// Sets a keyword argument, replacing an earlier one with the same name.
    pub fn kwarg(mut self, name: impl Into<String>, value: impl Into<ArgValue>) -> Self {
        self.keyword.insert(name, value.into());
        self
    }

    pub fn try_kwarg<T>(mut self, name: impl Into<String>, value: T) -> Result<Self>
    where
        T: TryInto<ArgValue, Error = MementoError>,
    {
        self.keyword.insert(name, value.try_into()?);
        Ok(self)
    }

    pub fn positional(&self) -> &[ArgValue] {
        &self.positional
    }

    pub fn keyword(&self) -> &KeywordArgs<ArgValue> {
        &self.keyword
    }
}

impl fmt::Debug for Args {
    /// Renders as a call argument list: `(1, "a", x=2)`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("(")?;
        for (i, value) in self.positional.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{:?}", value)?;
        }
        if !self.keyword.is_empty() {
            if !self.positional.is_empty() {
                f.write_str(", ")?;
            }
            write!(f, "{:?}", self.keyword)?;
        }
        f.write_str(")")
    }
}
