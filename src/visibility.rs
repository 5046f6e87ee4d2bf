//! Per-event visibility probe and authorization-context application
//! (§4.4).
//!
//! Grounded on `other_examples/12f33fa6_jonzim-cmd-kura-training__api-src-routes-provider_connections.rs.rs`'s
//! `tx = db.begin()` + `SELECT set_config(..., true)` + query + commit
//! pattern, with identifier quoting adapted from the host platform's own
//! convention in `records/subscribe.rs`
//! (`format!(r#"... WHERE "{pk_column}" = $1"#)`).

use std::sync::Arc;

use log::*;
use sqlx::{PgPool, Row};

use crate::auth::Claims;
use crate::event::Event;
use crate::schema::{SchemaSnapshot, TableDescriptor};

/// Result of a visibility check (§4.4).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
  Visible,
  NotVisible,
}

impl Visibility {
  pub fn is_visible(self) -> bool {
    return matches!(self, Self::Visible);
  }
}

/// Applies the per-transaction authorization context a Postgres row-level
/// security policy consults.
///
/// The reference implementation sets `request.jwt.claim.sub` and
/// `request.jwt.claim.role`, the convention RLS policies built against a
/// JWT-based auth layer commonly key off. A deployment with differently
/// named policies can supply its own [`AuthzContext`].
#[async_trait::async_trait]
pub trait AuthzContext: Send + Sync {
  async fn apply(
    &self,
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    claims: &Claims,
  ) -> Result<(), sqlx::Error>;
}

#[derive(Debug, Clone, Default)]
pub struct JwtClaimAuthzContext;

#[async_trait::async_trait]
impl AuthzContext for JwtClaimAuthzContext {
  async fn apply(
    &self,
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    claims: &Claims,
  ) -> Result<(), sqlx::Error> {
    sqlx::query("SELECT set_config('request.jwt.claim.sub', $1, true)")
      .bind(&claims.subject)
      .execute(&mut **tx)
      .await?;

    if let Some(role) = &claims.role {
      sqlx::query("SELECT set_config('request.jwt.claim.role', $1, true)")
        .bind(role)
        .execute(&mut **tx)
        .await?;
    }

    return Ok(());
  }
}

/// Quotes a Postgres identifier, doubling any embedded double quote
/// (§4.4).
fn quote_ident(ident: &str) -> String {
  return format!("\"{}\"", ident.replace('"', "\"\""));
}

/// The visibility prober (§4.4): given claims and an event, determines
/// whether the claims' subject would be permitted to SELECT the named
/// row.
#[derive(Clone)]
pub struct VisibilityProber {
  pool: Option<PgPool>,
  schema: Arc<dyn SchemaSnapshot>,
  authz: Arc<dyn AuthzContext>,
}

impl VisibilityProber {
  pub fn new(pool: Option<PgPool>, schema: Arc<dyn SchemaSnapshot>) -> Self {
    return Self {
      pool,
      schema,
      authz: Arc::new(JwtClaimAuthzContext),
    };
  }

  pub fn with_authz_context(mut self, authz: Arc<dyn AuthzContext>) -> Self {
    self.authz = authz;
    return self;
  }

  /// Runs the decision policy from §4.4, in order.
  pub async fn check(&self, claims: Option<&Claims>, event: &Event) -> Visibility {
    // 1. No DB, no claims, or a delete: fail open.
    let (Some(pool), Some(claims)) = (&self.pool, claims) else {
      return Visibility::Visible;
    };
    if event.action.is_delete() {
      return Visibility::Visible;
    }

    // 2. Unfilterable table: fail open.
    let Some(table) = self.schema.table_by_name(&event.table) else {
      return Visibility::Visible;
    };
    if table.primary_key.is_empty() {
      return Visibility::Visible;
    }

    // 3. Missing PK value in the record: fail open.
    let Some(query) = build_probe_query(&table) else {
      return Visibility::Visible;
    };
    let mut values = Vec::with_capacity(table.primary_key.len());
    for column in &table.primary_key {
      let Some(value) = event.record.get(column) else {
        return Visibility::Visible;
      };
      values.push(value);
    }

    // 4. Fail closed on any DB error.
    match run_probe(pool, self.authz.as_ref(), claims, &query, &values).await {
      Ok(true) => Visibility::Visible,
      Ok(false) => Visibility::NotVisible,
      Err(err) => {
        warn!(
          "realtime: visibility probe failed for {}.{:?}, failing closed: {err}",
          event.table, event.record
        );
        Visibility::NotVisible
      }
    }
  }
}

fn build_probe_query(table: &TableDescriptor) -> Option<String> {
  if table.primary_key.is_empty() {
    return None;
  }

  let predicates: Vec<String> = table
    .primary_key
    .iter()
    .enumerate()
    .map(|(idx, column)| format!("{} = ${}", quote_ident(column), idx + 1))
    .collect();

  return Some(format!(
    "SELECT 1 FROM {}.{} WHERE {}",
    quote_ident(&table.schema),
    quote_ident(&table.name),
    predicates.join(" AND "),
  ));
}

async fn run_probe(
  pool: &PgPool,
  authz: &dyn AuthzContext,
  claims: &Claims,
  query: &str,
  values: &[&serde_json::Value],
) -> Result<bool, sqlx::Error> {
  let mut tx = pool.begin().await?;

  authz.apply(&mut tx, claims).await?;

  let mut q = sqlx::query(query);
  for value in values {
    q = bind_json_value(q, value);
  }

  let row = q.fetch_optional(&mut *tx).await?;
  tx.rollback().await?;

  return Ok(row.is_some());
}

fn bind_json_value<'q>(
  query: sqlx::query::Query<'q, sqlx::Postgres, sqlx::postgres::PgArguments>,
  value: &'q serde_json::Value,
) -> sqlx::query::Query<'q, sqlx::Postgres, sqlx::postgres::PgArguments> {
  return match value {
    serde_json::Value::String(s) => query.bind(s.as_str()),
    serde_json::Value::Number(n) => {
      if let Some(i) = n.as_i64() {
        query.bind(i)
      } else if let Some(f) = n.as_f64() {
        query.bind(f)
      } else {
        query.bind(n.to_string())
      }
    }
    serde_json::Value::Bool(b) => query.bind(*b),
    other => query.bind(other.to_string()),
  };
}
