use rusqlite::Row;
use rusqlite::types::Value;

use crate::error::Result;

pub const DEFAULT_PAGE_LIMIT: u32 = 100;
pub const MAX_PAGE_LIMIT: u32 = 1000;

/// Offset/limit pagination.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub skip: u32,
    pub limit: u32,
}

impl Page {
    #[must_use]
    pub fn new(skip: Option<u32>, limit: Option<u32>) -> Self {
        Self {
            skip: skip.unwrap_or(0),
            limit: limit.unwrap_or(DEFAULT_PAGE_LIMIT).min(MAX_PAGE_LIMIT),
        }
    }
}

impl Default for Page {
    fn default() -> Self {
        Self::new(None, None)
    }
}

/// Equality filter over an entity's whitelisted columns.
#[derive(Debug, Clone, Default)]
pub struct Filter {
    conditions: Vec<(&'static str, Value)>,
}

impl Filter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn eq(mut self, column: &'static str, value: impl Into<Value>) -> Self {
        self.conditions.push((column, value.into()));
        self
    }

    /// Adds the condition only when a value is present.
    #[must_use]
    pub fn eq_opt<V: Into<Value>>(self, column: &'static str, value: Option<V>) -> Self {
        match value {
            Some(value) => self.eq(column, value),
            None => self,
        }
    }

    #[must_use]
    pub fn conditions(&self) -> &[(&'static str, Value)] {
        &self.conditions
    }
}

/// A row type stored in a single table keyed by `id`.
pub trait Entity: Sized + Send {
    type Id: Send + Sync;
    type Create: Send + Sync;
    type Update: Send + Sync;

    /// Human-readable name used in API messages.
    const NAME: &'static str;
    const TABLE: &'static str;
    /// Comma-separated select list matching [`Entity::from_row`].
    const COLUMNS: &'static str;
    /// Columns that may appear in a [`Filter`].
    const FILTERABLE: &'static [&'static str];

    fn key(id: &Self::Id) -> Value;

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self>;
}

/// CRUD operations for one entity type.
pub trait Repository<E: Entity>: Send + Sync {
    fn get(&self, id: &E::Id) -> Result<Option<E>>;
    fn get_multi(&self, page: Page, filter: &Filter) -> Result<Vec<E>>;
    fn create(&self, input: &E::Create) -> Result<E>;
    /// Merges the provided fields onto the row. `None` if the row is absent.
    fn update(&self, id: &E::Id, patch: &E::Update) -> Result<Option<E>>;
    /// Deletes the row and returns it as it was. `None` if the row is absent.
    fn remove(&self, id: &E::Id) -> Result<Option<E>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_defaults_and_cap() {
        assert_eq!(Page::default(), Page { skip: 0, limit: 100 });
        assert_eq!(Page::new(Some(5), Some(5000)).limit, MAX_PAGE_LIMIT);
    }

    #[test]
    fn test_filter_eq_opt_skips_none() {
        let filter = Filter::new()
            .eq("approved", true)
            .eq_opt("domain_id", None::<i64>)
            .eq_opt("source_id", Some(3_i64));
        let columns: Vec<_> = filter.conditions().iter().map(|(c, _)| *c).collect();
        assert_eq!(columns, vec!["approved", "source_id"]);
    }
}
