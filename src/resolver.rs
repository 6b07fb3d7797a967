//! Tag-based field access for configuration records.
//!
//! Every record type declares an accessor per field, keyed by the field's
//! symbolic tag. The [`FieldResolver`] indexes those declarations once per
//! record type and serves lookups from the cached index afterwards.

use crate::error::EngineError;
use arc_swap::ArcSwap;
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Read view of a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldRef<'a> {
    Text(&'a str),
    Int(Option<u32>),
    Flag(bool),
}

/// Write view of a field.
#[derive(Debug)]
pub enum FieldMut<'a> {
    Text(&'a mut String),
    Int(&'a mut Option<u32>),
    Flag(&'a mut bool),
}

impl<'a> From<&'a String> for FieldRef<'a> {
    fn from(value: &'a String) -> Self {
        FieldRef::Text(value.as_str())
    }
}

impl<'a> From<&'a Option<u32>> for FieldRef<'a> {
    fn from(value: &'a Option<u32>) -> Self {
        FieldRef::Int(*value)
    }
}

impl<'a> From<&'a bool> for FieldRef<'a> {
    fn from(value: &'a bool) -> Self {
        FieldRef::Flag(*value)
    }
}

impl<'a> From<&'a mut String> for FieldMut<'a> {
    fn from(value: &'a mut String) -> Self {
        FieldMut::Text(value)
    }
}

impl<'a> From<&'a mut Option<u32>> for FieldMut<'a> {
    fn from(value: &'a mut Option<u32>) -> Self {
        FieldMut::Int(value)
    }
}

impl<'a> From<&'a mut bool> for FieldMut<'a> {
    fn from(value: &'a mut bool) -> Self {
        FieldMut::Flag(value)
    }
}

impl FieldRef<'_> {
    pub fn kind(&self) -> &'static str {
        match self {
            FieldRef::Text(_) => "text",
            FieldRef::Int(_) => "integer",
            FieldRef::Flag(_) => "boolean",
        }
    }

    /// Textual form used on command lines; unset values render empty.
    pub fn render(&self) -> String {
        match self {
            FieldRef::Text(s) => (*s).to_string(),
            FieldRef::Int(Some(n)) => n.to_string(),
            FieldRef::Int(None) => String::new(),
            FieldRef::Flag(true) => "true".to_string(),
            FieldRef::Flag(false) => String::new(),
        }
    }
}

impl FieldMut<'_> {
    /// Parse `raw` into the field. Empty input resets integers to unset.
    pub fn assign(self, raw: &str) -> Result<(), String> {
        match self {
            FieldMut::Text(slot) => {
                *slot = raw.to_string();
                Ok(())
            }
            FieldMut::Int(slot) => {
                let raw = raw.trim();
                if raw.is_empty() {
                    *slot = None;
                    return Ok(());
                }
                let value = raw
                    .parse::<u32>()
                    .map_err(|e| format!("'{}' is not a non-negative integer: {}", raw, e))?;
                *slot = Some(value);
                Ok(())
            }
            FieldMut::Flag(slot) => {
                *slot = match raw.trim().to_ascii_lowercase().as_str() {
                    "" | "false" | "0" | "no" | "off" => false,
                    "true" | "1" | "yes" | "on" => true,
                    other => return Err(format!("'{}' is not a boolean", other)),
                };
                Ok(())
            }
        }
    }
}

/// Getter/setter pair for one tagged field of `R`.
pub struct FieldAccessor<R> {
    pub tag: &'static str,
    pub get: fn(&R) -> FieldRef<'_>,
    pub get_mut: fn(&mut R) -> FieldMut<'_>,
}

impl<R> Clone for FieldAccessor<R> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<R> Copy for FieldAccessor<R> {}

/// A configuration record whose fields are addressable by tag.
pub trait Record: Sized + 'static {
    /// Human readable type name for error messages.
    const NAME: &'static str;

    fn accessors() -> Vec<FieldAccessor<Self>>;
}

type TagTable<R> = HashMap<&'static str, FieldAccessor<R>>;

type TableMap = HashMap<TypeId, Arc<dyn Any + Send + Sync>>;

/// Resolves tags to fields, caching one tag table per record type.
///
/// Construct once and share by reference; concurrent first use from several
/// threads is fine, a racing builder just produces an identical table and the
/// first one stored is kept. Lookups are a single atomic load of the current
/// map; inserts publish a new copy under `publish`.
#[derive(Default)]
pub struct FieldResolver {
    tables: ArcSwap<TableMap>,
    publish: Mutex<()>,
}

impl FieldResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of record types indexed so far.
    pub fn cached_types(&self) -> usize {
        self.tables.load().len()
    }

    fn table<R: Record>(&self) -> Result<Arc<TagTable<R>>, EngineError> {
        let key = TypeId::of::<R>();
        if let Some(table) = self.lookup::<R>(key) {
            return Ok(table);
        }

        let built: Arc<dyn Any + Send + Sync> = Arc::new(build_table::<R>()?);
        {
            let _guard = self
                .publish
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            let current = self.tables.load_full();
            if !current.contains_key(&key) {
                let mut next = TableMap::clone(&current);
                next.insert(key, built);
                self.tables.store(Arc::new(next));
            }
        }
        self.lookup::<R>(key)
            .ok_or_else(|| EngineError::field("*", format!("no tag table for {}", R::NAME)))
    }

    fn lookup<R: Record>(&self, key: TypeId) -> Option<Arc<TagTable<R>>> {
        self.tables
            .load()
            .get(&key)
            .cloned()
            .and_then(|any| any.downcast::<TagTable<R>>().ok())
    }

    fn accessor<R: Record>(&self, tag: &str) -> Result<FieldAccessor<R>, EngineError> {
        let table = self.table::<R>()?;
        table.get(tag).copied().ok_or_else(|| {
            EngineError::field(tag, format!("no field with this tag in {}", R::NAME))
        })
    }

    pub fn resolve<'r, R: Record>(&self, record: &'r R, tag: &str) -> Result<FieldRef<'r>, EngineError> {
        let accessor = self.accessor::<R>(tag)?;
        Ok((accessor.get)(record))
    }

    pub fn resolve_mut<'r, R: Record>(
        &self,
        record: &'r mut R,
        tag: &str,
    ) -> Result<FieldMut<'r>, EngineError> {
        let accessor = self.accessor::<R>(tag)?;
        Ok((accessor.get_mut)(record))
    }

    pub fn text<'r, R: Record>(&self, record: &'r R, tag: &str) -> Result<&'r str, EngineError> {
        match self.resolve(record, tag)? {
            FieldRef::Text(s) => Ok(s),
            other => Err(mismatch::<R>(tag, "text", other)),
        }
    }

    pub fn int<R: Record>(&self, record: &R, tag: &str) -> Result<Option<u32>, EngineError> {
        match self.resolve(record, tag)? {
            FieldRef::Int(n) => Ok(n),
            other => Err(mismatch::<R>(tag, "integer", other)),
        }
    }

    pub fn flag<R: Record>(&self, record: &R, tag: &str) -> Result<bool, EngineError> {
        match self.resolve(record, tag)? {
            FieldRef::Flag(b) => Ok(b),
            other => Err(mismatch::<R>(tag, "boolean", other)),
        }
    }

    /// Value of any field kind as command-line text; empty when unset.
    pub fn render<R: Record>(&self, record: &R, tag: &str) -> Result<String, EngineError> {
        Ok(self.resolve(record, tag)?.render())
    }

    /// Parse `raw` into the field tagged `tag`.
    pub fn assign<R: Record>(&self, record: &mut R, tag: &str, raw: &str) -> Result<(), EngineError> {
        self.resolve_mut(record, tag)?
            .assign(raw)
            .map_err(|reason| EngineError::field(tag, reason))
    }
}

fn mismatch<R: Record>(tag: &str, wanted: &str, found: FieldRef<'_>) -> EngineError {
    EngineError::field(
        tag,
        format!("field in {} is {}, not {}", R::NAME, found.kind(), wanted),
    )
}

fn build_table<R: Record>() -> Result<TagTable<R>, EngineError> {
    let mut table = HashMap::new();
    for accessor in R::accessors() {
        if table.insert(accessor.tag, accessor).is_some() {
            return Err(EngineError::field(
                accessor.tag,
                format!("tag declared twice in {}", R::NAME),
            ));
        }
    }
    tracing::trace!("indexed {} tags for {}", table.len(), R::NAME);
    Ok(table)
}
