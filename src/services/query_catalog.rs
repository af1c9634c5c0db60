use crate::{db::DbPool, errors::ServiceError};
use sea_orm::{ConnectionTrait, FromQueryResult, JsonValue, Statement};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{info, instrument};
use utoipa::ToSchema;

/// One catalog entry: a named, parameterized, read-only report query.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct QueryDef {
    pub key: String,
    pub title: String,
    pub sql: String,
    /// Ordered parameter names; callers supply exactly these, positionally.
    #[serde(default)]
    pub params: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct CatalogFile {
    queries: Vec<QueryDef>,
}

#[derive(Debug, Default)]
struct Catalog {
    order: Vec<String>,
    entries: HashMap<String, QueryDef>,
}

/// Read-only query catalog loaded from a JSON file. The snapshot behind
/// the lock is immutable; `reload` swaps it wholesale, so running queries
/// never observe a half-loaded catalog.
pub struct QueryCatalogService {
    db_pool: Arc<DbPool>,
    path: PathBuf,
    catalog: RwLock<Arc<Catalog>>,
}

impl QueryCatalogService {
    /// Loads the catalog file eagerly; a missing or invalid file fails
    /// startup rather than first use.
    pub fn load(db_pool: Arc<DbPool>, path: impl Into<PathBuf>) -> Result<Self, ServiceError> {
        let path = path.into();
        let catalog = read_catalog(&path)?;
        info!(path = %path.display(), entries = catalog.order.len(), "Query catalog loaded");
        Ok(Self {
            db_pool,
            path,
            catalog: RwLock::new(Arc::new(catalog)),
        })
    }

    /// Catalog entries in file order.
    pub async fn list(&self) -> Vec<QueryDef> {
        let catalog = self.catalog.read().await.clone();
        catalog
            .order
            .iter()
            .filter_map(|key| catalog.entries.get(key).cloned())
            .collect()
    }

    /// Executes a catalog entry with positional parameters. Only declared
    /// parameters are bound; the SQL text is never touched.
    #[instrument(skip(self, params))]
    pub async fn run(
        &self,
        key: &str,
        params: Vec<serde_json::Value>,
    ) -> Result<Vec<JsonValue>, ServiceError> {
        let catalog = self.catalog.read().await.clone();
        let def = catalog
            .entries
            .get(key)
            .ok_or_else(|| ServiceError::NotFound(format!("Query '{}' not found", key)))?;

        if params.len() != def.params.len() {
            return Err(ServiceError::Validation(format!(
                "Query '{}' expects {} parameter(s) ({}), got {}",
                key,
                def.params.len(),
                def.params.join(", "),
                params.len()
            )));
        }

        let values = params
            .into_iter()
            .zip(def.params.iter())
            .map(|(value, name)| bind_value(name, value))
            .collect::<Result<Vec<_>, _>>()?;

        let db = self.db_pool.as_ref();
        let stmt = Statement::from_sql_and_values(db.get_database_backend(), &def.sql, values);

        JsonValue::find_by_statement(stmt)
            .all(db)
            .await
            .map_err(ServiceError::db_error)
    }

    /// Re-reads the catalog file and swaps the snapshot.
    #[instrument(skip(self))]
    pub async fn reload(&self) -> Result<usize, ServiceError> {
        let fresh = read_catalog(&self.path)?;
        let count = fresh.order.len();
        *self.catalog.write().await = Arc::new(fresh);
        info!(path = %self.path.display(), entries = count, "Query catalog reloaded");
        Ok(count)
    }
}

fn read_catalog(path: &PathBuf) -> Result<Catalog, ServiceError> {
    let raw = std::fs::read_to_string(path).map_err(|e| {
        ServiceError::Internal(format!(
            "Cannot read query catalog {}: {}",
            path.display(),
            e
        ))
    })?;

    let file: CatalogFile = serde_json::from_str(&raw).map_err(|e| {
        ServiceError::Internal(format!(
            "Query catalog {} is not valid JSON: {}",
            path.display(),
            e
        ))
    })?;

    build_catalog(file.queries)
}

fn build_catalog(defs: Vec<QueryDef>) -> Result<Catalog, ServiceError> {
    let mut catalog = Catalog::default();

    for def in defs {
        validate_query(&def)?;
        if catalog.entries.contains_key(&def.key) {
            return Err(ServiceError::Internal(format!(
                "Duplicate query catalog key '{}'",
                def.key
            )));
        }
        catalog.order.push(def.key.clone());
        catalog.entries.insert(def.key.clone(), def);
    }

    Ok(catalog)
}

/// Rejected at load time so a bad catalog never reaches `run`.
fn validate_query(def: &QueryDef) -> Result<(), ServiceError> {
    if def.key.trim().is_empty() {
        return Err(ServiceError::Internal(
            "Query catalog entry with empty key".to_string(),
        ));
    }

    let sql = def.sql.trim();
    if !sql.to_ascii_lowercase().starts_with("select") {
        return Err(ServiceError::Internal(format!(
            "Query '{}' is not a SELECT statement",
            def.key
        )));
    }
    if sql.contains(';') {
        return Err(ServiceError::Internal(format!(
            "Query '{}' must be a single statement",
            def.key
        )));
    }

    Ok(())
}

fn bind_value(name: &str, value: serde_json::Value) -> Result<sea_orm::Value, ServiceError> {
    match value {
        serde_json::Value::Null => Ok(sea_orm::Value::String(None)),
        serde_json::Value::Bool(b) => Ok(b.into()),
        serde_json::Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Ok(i.into())
            } else if let Some(f) = n.as_f64() {
                Ok(f.into())
            } else {
                Err(ServiceError::Validation(format!(
                    "Parameter '{}' is not a representable number",
                    name
                )))
            }
        }
        serde_json::Value::String(s) => Ok(s.into()),
        serde_json::Value::Array(_) | serde_json::Value::Object(_) => {
            Err(ServiceError::Validation(format!(
                "Parameter '{}' must be a scalar",
                name
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn def(key: &str, sql: &str) -> QueryDef {
        QueryDef {
            key: key.to_string(),
            title: key.to_string(),
            sql: sql.to_string(),
            params: vec![],
        }
    }

    #[test]
    fn accepts_select_statements() {
        assert!(validate_query(&def("ok", "SELECT 1")).is_ok());
        assert!(validate_query(&def("ok", "  select id from products")).is_ok());
    }

    #[test]
    fn rejects_non_select_and_multi_statement() {
        assert!(validate_query(&def("bad", "DELETE FROM products")).is_err());
        assert!(validate_query(&def("bad", "UPDATE batches SET stock_quantity = 0")).is_err());
        assert!(validate_query(&def("bad", "SELECT 1; DROP TABLE products")).is_err());
    }

    #[test]
    fn rejects_duplicate_keys() {
        let result = build_catalog(vec![def("a", "SELECT 1"), def("a", "SELECT 2")]);
        assert!(result.is_err());
    }

    #[test]
    fn binds_scalars_and_rejects_composites() {
        assert!(bind_value("p", serde_json::json!("text")).is_ok());
        assert!(bind_value("p", serde_json::json!(7)).is_ok());
        assert!(bind_value("p", serde_json::json!(1.5)).is_ok());
        assert!(bind_value("p", serde_json::json!(true)).is_ok());
        assert!(bind_value("p", serde_json::json!([1, 2])).is_err());
        assert!(bind_value("p", serde_json::json!({"a": 1})).is_err());
    }
}
