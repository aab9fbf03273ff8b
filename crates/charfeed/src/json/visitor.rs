//! Materialization hooks.
//!
//! The readers never commit to a host container; they hand every element
//! or entry to a visitor, a small bundle of behavior the caller owns.
//! [`ArrayVisitor`] is shared with the CSV row reader (element type
//! `Option<Arc<str>>` there, [`Value`] for JSON arrays); [`ObjectVisitor`]
//! materializes JSON objects and composes the optional `key_fn` /
//! `value_fn` hooks.
#![allow(clippy::inline_always)]

use std::sync::Arc;

use crate::json::value::Value;

/// Abstraction over sequential container construction.
pub trait ArrayVisitor<T> {
    /// The accumulator threaded through [`on_value`](Self::on_value).
    type Array;
    /// The finalized container.
    type Output;

    fn new_array(&mut self) -> Self::Array;
    fn on_value(&mut self, array: Self::Array, value: T) -> Self::Array;
    fn finish(&mut self, array: Self::Array) -> Self::Output;
}

/// Abstraction over keyed container construction.
pub trait ObjectVisitor {
    type Object;
    type Output;

    fn new_object(&mut self) -> Self::Object;
    fn on_entry(&mut self, obj: Self::Object, key: Arc<str>, value: Value) -> Self::Object;
    fn finish(&mut self, obj: Self::Object) -> Self::Output;
}

/// Key rewrite hook applied to every object key after canonicalization.
pub type KeyFn = fn(Arc<str>) -> Arc<str>;

/// Value rewrite hook; returning `None` elides the whole entry.
pub type ValueFn = fn(&str, Value) -> Option<Value>;

/// Default JSON array materialization into [`Value::Array`].
#[derive(Debug, Default, Clone, Copy)]
pub struct ValueArrays;

impl ArrayVisitor<Value> for ValueArrays {
    type Array = Vec<Value>;
    type Output = Value;

    #[inline(always)]
    fn new_array(&mut self) -> Vec<Value> {
        Vec::new()
    }

    #[inline(always)]
    fn on_value(&mut self, mut array: Vec<Value>, value: Value) -> Vec<Value> {
        array.push(value);
        array
    }

    #[inline(always)]
    fn finish(&mut self, array: Vec<Value>) -> Value {
        Value::Array(array)
    }
}

/// Default JSON object materialization into [`Value::Object`], with the
/// `key_fn`/`value_fn` hooks composed in.
#[derive(Debug, Default, Clone, Copy)]
pub struct ValueObjects {
    pub key_fn: Option<KeyFn>,
    pub value_fn: Option<ValueFn>,
}

impl ObjectVisitor for ValueObjects {
    type Object = Vec<(Arc<str>, Value)>;
    type Output = Value;

    #[inline(always)]
    fn new_object(&mut self) -> Self::Object {
        Vec::new()
    }

    #[inline(always)]
    fn on_entry(&mut self, mut obj: Self::Object, key: Arc<str>, value: Value) -> Self::Object {
        let key = match self.key_fn {
            Some(f) => f(key),
            None => key,
        };
        let value = match self.value_fn {
            Some(f) => match f(&key, value) {
                Some(v) => v,
                None => return obj,
            },
            None => value,
        };
        obj.push((key, value));
        obj
    }

    #[inline(always)]
    fn finish(&mut self, obj: Self::Object) -> Value {
        Value::Object(obj)
    }
}

/// CSV row materialization as a plain growable list.
#[derive(Debug, Default, Clone, Copy)]
pub struct MutableRows;

impl ArrayVisitor<Option<Arc<str>>> for MutableRows {
    type Array = Vec<Option<Arc<str>>>;
    type Output = Vec<Option<Arc<str>>>;

    #[inline(always)]
    fn new_array(&mut self) -> Self::Array {
        Vec::new()
    }

    #[inline(always)]
    fn on_value(&mut self, mut array: Self::Array, value: Option<Arc<str>>) -> Self::Array {
        array.push(value);
        array
    }

    #[inline(always)]
    fn finish(&mut self, array: Self::Array) -> Self::Output {
        array
    }
}

/// CSV row materialization finalized into a shared immutable slice.
#[derive(Debug, Default, Clone, Copy)]
pub struct ImmutableRows;

impl ArrayVisitor<Option<Arc<str>>> for ImmutableRows {
    type Array = Vec<Option<Arc<str>>>;
    type Output = Arc<[Option<Arc<str>>]>;

    #[inline(always)]
    fn new_array(&mut self) -> Self::Array {
        Vec::new()
    }

    #[inline(always)]
    fn on_value(&mut self, mut array: Self::Array, value: Option<Arc<str>>) -> Self::Array {
        array.push(value);
        array
    }

    #[inline(always)]
    fn finish(&mut self, array: Self::Array) -> Self::Output {
        array.into()
    }
}
