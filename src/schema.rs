//! Read-only schema snapshot contract (§3, §6).
//!
//! The real implementation lives outside this subsystem (a schema cache
//! that tracks DDL changes); this module only specifies and tests the
//! contract the core consumes from it.

use std::collections::HashMap;

/// A table descriptor as read from the schema snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableDescriptor {
  pub schema: String,
  pub name: String,
  /// Ordered list of primary-key column names. Empty for views or keyless
  /// tables.
  pub primary_key: Vec<String>,
}

impl TableDescriptor {
  pub fn new(
    schema: impl Into<String>,
    name: impl Into<String>,
    primary_key: Vec<String>,
  ) -> Self {
    return Self {
      schema: schema.into(),
      name: name.into(),
      primary_key,
    };
  }
}

/// Read-only view over the live schema, keyed by unqualified table name.
pub trait SchemaSnapshot: Send + Sync {
  fn table_by_name(&self, name: &str) -> Option<TableDescriptor>;
}

/// A simple in-memory snapshot, used by the reference binary and by tests.
/// A deployment typically backs this trait with its own schema cache
/// instead.
#[derive(Debug, Clone, Default)]
pub struct StaticSchemaSnapshot {
  tables: HashMap<String, TableDescriptor>,
}

impl StaticSchemaSnapshot {
  pub fn new() -> Self {
    return Self::default();
  }

  pub fn with_table(mut self, table: TableDescriptor) -> Self {
    self.tables.insert(table.name.clone(), table);
    return self;
  }

  pub fn insert(&mut self, table: TableDescriptor) {
    self.tables.insert(table.name.clone(), table);
  }
}

impl SchemaSnapshot for StaticSchemaSnapshot {
  fn table_by_name(&self, name: &str) -> Option<TableDescriptor> {
    return self.tables.get(name).cloned();
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn lookup_hits_and_misses() {
    let snapshot = StaticSchemaSnapshot::new().with_table(TableDescriptor::new(
      "public",
      "posts",
      vec!["id".to_string()],
    ));

    assert!(snapshot.table_by_name("posts").is_some());
    assert!(snapshot.table_by_name("nonexistent").is_none());
  }

  #[test]
  fn keyless_table_has_empty_primary_key() {
    let snapshot =
      StaticSchemaSnapshot::new().with_table(TableDescriptor::new("public", "a_view", vec![]));

    let table = snapshot.table_by_name("a_view").unwrap();
    assert!(table.primary_key.is_empty());
  }
}
