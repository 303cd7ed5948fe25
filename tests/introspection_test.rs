use async_trait::async_trait;
use serde_json::{json, Value};
use sql_genius::introspect::{
    catalog_for, extract_schema, DialectCatalog, MetaQuery, MetaRow, MetadataSource,
    MySqlCatalog, PostgresCatalog,
};
use sql_genius::models::DbType;
use sql_genius::{GeniusError, Result};
use std::sync::Mutex;

/// Answers catalog queries from canned rows and records every query it sees.
#[derive(Default)]
struct ScriptedSource {
    responses: Vec<(MetaQuery, Vec<MetaRow>)>,
    failing: Option<MetaQuery>,
    seen: Mutex<Vec<MetaQuery>>,
}

impl ScriptedSource {
    fn respond(mut self, query: MetaQuery, rows: Value) -> Self {
        let rows: Vec<MetaRow> = serde_json::from_value(rows).unwrap();
        self.responses.push((query, rows));
        self
    }

    fn fail_on(mut self, query: MetaQuery) -> Self {
        self.failing = Some(query);
        self
    }
}

#[async_trait]
impl MetadataSource for ScriptedSource {
    async fn fetch(&self, query: &MetaQuery) -> Result<Vec<MetaRow>> {
        self.seen.lock().unwrap().push(query.clone());
        if self.failing.as_ref() == Some(query) {
            return Err(GeniusError::Database("connection reset".to_string()));
        }
        Ok(self
            .responses
            .iter()
            .find(|(q, _)| q == query)
            .map(|(_, rows)| rows.clone())
            .unwrap_or_default())
    }
}

fn mysql_shop() -> (MySqlCatalog, ScriptedSource) {
    let catalog = MySqlCatalog::new("shop");
    let source = ScriptedSource::default()
        .respond(
            catalog.tables_query(),
            json!([{"table_name": "users"}, {"table_name": "order_items"}]),
        )
        .respond(
            catalog.columns_query("users"),
            json!([
                {"column_name": "id", "data_type": "int unsigned", "is_nullable": "NO",
                 "column_default": null, "column_key": "PRI", "extra": "auto_increment",
                 "column_comment": ""},
                {"column_name": "email", "data_type": "varchar(255)", "is_nullable": "YES",
                 "column_default": null, "column_key": "UNI", "extra": "",
                 "column_comment": "login address"}
            ]),
        )
        .respond(
            catalog.indexes_query("users"),
            json!([
                {"index_name": "PRIMARY", "column_name": "id", "seq": 1, "non_unique": 0, "index_type": "BTREE"},
                {"index_name": "uq_email", "column_name": "email", "seq": 1, "non_unique": 0, "index_type": "BTREE"}
            ]),
        )
        .respond(
            catalog.primary_key_query("users"),
            json!([{"column_name": "id", "seq": 1}]),
        )
        .respond(
            catalog.columns_query("order_items"),
            json!([
                {"column_name": "order_id", "data_type": "int", "is_nullable": "NO",
                 "column_default": null, "column_key": "PRI", "extra": "", "column_comment": ""},
                {"column_name": "product_id", "data_type": "int", "is_nullable": "NO",
                 "column_default": null, "column_key": "PRI", "extra": "", "column_comment": ""},
                {"column_name": "user_id", "data_type": "int", "is_nullable": "YES",
                 "column_default": null, "column_key": "MUL", "extra": "", "column_comment": ""},
                {"column_name": "qty", "data_type": "int", "is_nullable": "NO",
                 "column_default": "1", "column_key": "", "extra": "", "column_comment": ""}
            ]),
        )
        .respond(
            catalog.indexes_query("order_items"),
            json!([
                {"index_name": "idx_user_qty", "column_name": "qty", "seq": 2, "non_unique": 1, "index_type": "BTREE"},
                {"index_name": "idx_user_qty", "column_name": "user_id", "seq": 1, "non_unique": 1, "index_type": "BTREE"}
            ]),
        )
        .respond(
            catalog.foreign_keys_query("order_items"),
            json!([
                {"constraint_name": "fk_items_user", "column_name": "user_id",
                 "ref_table": "users", "ref_column": "id",
                 "on_delete": "CASCADE", "on_update": "NO ACTION", "seq": 1}
            ]),
        )
        .respond(
            catalog.primary_key_query("order_items"),
            json!([
                {"column_name": "product_id", "seq": 2},
                {"column_name": "order_id", "seq": 1}
            ]),
        );
    (catalog, source)
}

#[tokio::test]
async fn test_mysql_extraction() {
    let (catalog, source) = mysql_shop();
    let schema = extract_schema(&source, &catalog, "shop").await.unwrap();

    assert_eq!(schema.database, "shop");
    assert_eq!(schema.db_type, Some(DbType::MySql));
    let names: Vec<&str> = schema.tables.iter().map(|t| t.name.as_str()).collect();
    assert_eq!(names, vec!["users", "order_items"]);

    let users = schema.table("users").unwrap();
    let id = users.column("id").unwrap();
    assert!(id.is_pk && id.is_auto_incr && !id.nullable);
    assert_eq!(id.comment, None);
    let email = users.column("email").unwrap();
    assert!(email.is_unique && email.nullable);
    assert_eq!(email.comment.as_deref(), Some("login address"));
    assert_eq!(users.indexes.len(), 2);
    assert!(users.indexes.iter().all(|i| i.is_unique));

    let items = schema.table("order_items").unwrap();
    assert_eq!(items.primary_key, vec!["order_id", "product_id"]);
    assert_eq!(items.column("qty").unwrap().default.as_deref(), Some("1"));
    assert!(items.column("user_id").unwrap().is_fk);

    assert_eq!(items.indexes.len(), 1);
    assert_eq!(items.indexes[0].columns, vec!["user_id", "qty"]);
    assert!(!items.indexes[0].is_unique);

    let fk = &items.foreign_keys[0];
    assert_eq!(fk.name, "fk_items_user");
    assert_eq!(fk.ref_table, "users");
    assert_eq!(fk.on_delete.as_deref(), Some("CASCADE"));
    assert_eq!(fk.on_update.as_deref(), Some("NO ACTION"));
}

#[tokio::test]
async fn test_four_queries_per_table_in_order() {
    let (catalog, source) = mysql_shop();
    extract_schema(&source, &catalog, "shop").await.unwrap();

    let seen = source.seen.lock().unwrap();
    assert_eq!(seen.len(), 1 + 2 * 4);
    assert_eq!(seen[0], catalog.tables_query());
    assert_eq!(seen[1], catalog.columns_query("users"));
    assert_eq!(seen[2], catalog.indexes_query("users"));
    assert_eq!(seen[3], catalog.foreign_keys_query("users"));
    assert_eq!(seen[4], catalog.primary_key_query("users"));
    assert_eq!(seen[5], catalog.columns_query("order_items"));
}

#[tokio::test]
async fn test_failed_query_aborts_extraction() {
    let (catalog, source) = mysql_shop();
    let source = source.fail_on(catalog.foreign_keys_query("order_items"));

    let err = extract_schema(&source, &catalog, "shop").await.unwrap_err();
    assert!(matches!(err, GeniusError::Database(ref msg) if msg == "connection reset"));
    // nothing is queried after the failure
    assert_eq!(source.seen.lock().unwrap().len(), 1 + 4 + 3);
}

#[tokio::test]
async fn test_postgres_extraction() {
    let catalog = PostgresCatalog::default();
    let source = ScriptedSource::default()
        .respond(catalog.tables_query(), json!([{"table_name": "accounts"}]))
        .respond(
            catalog.columns_query("accounts"),
            json!([
                {"column_name": "id", "data_type": "integer", "is_nullable": "NO",
                 "column_default": "nextval('accounts_id_seq'::regclass)", "is_identity": "NO",
                 "column_comment": null, "is_pk": true, "is_fk": false, "is_unique": false},
                {"column_name": "handle", "data_type": "text", "is_nullable": "NO",
                 "column_default": null, "is_identity": "NO",
                 "column_comment": "public name", "is_pk": false, "is_fk": false, "is_unique": true},
                {"column_name": "tenant_id", "data_type": "bigint", "is_nullable": "YES",
                 "column_default": null, "is_identity": "YES",
                 "column_comment": null, "is_pk": false, "is_fk": true, "is_unique": false}
            ]),
        )
        .respond(
            catalog.indexes_query("accounts"),
            json!([
                {"index_name": "accounts_pkey", "column_name": "id", "seq": 1, "is_unique": true, "index_type": "btree"}
            ]),
        )
        .respond(
            catalog.foreign_keys_query("accounts"),
            json!([
                {"constraint_name": "accounts_tenant_id_fkey", "column_name": "tenant_id",
                 "ref_table": "tenants", "ref_column": "id",
                 "on_delete": "SET NULL", "on_update": "NO ACTION", "seq": 1}
            ]),
        )
        .respond(
            catalog.primary_key_query("accounts"),
            json!([{"column_name": "id", "seq": 1}]),
        );

    let schema = extract_schema(&source, &catalog, "app").await.unwrap();
    assert_eq!(schema.db_type, Some(DbType::PostgreSql));

    let accounts = &schema.tables[0];
    let id = accounts.column("id").unwrap();
    assert!(id.is_pk && id.is_auto_incr && !id.nullable);
    let handle = accounts.column("handle").unwrap();
    assert!(handle.is_unique && !handle.is_auto_incr);
    assert_eq!(handle.comment.as_deref(), Some("public name"));
    let tenant = accounts.column("tenant_id").unwrap();
    assert!(tenant.is_fk && tenant.is_auto_incr && tenant.nullable);

    assert_eq!(accounts.indexes[0].index_type, "BTREE");
    assert_eq!(accounts.foreign_keys[0].on_delete.as_deref(), Some("SET NULL"));
}

#[tokio::test]
async fn test_every_dialect_has_a_catalog() {
    for db_type in DbType::ALL {
        let catalog = catalog_for(db_type, "shop");
        assert_eq!(catalog.db_type(), db_type);

        let source = ScriptedSource::default();
        let schema = extract_schema(&source, catalog.as_ref(), "shop").await.unwrap();
        assert!(schema.tables.is_empty());
        assert_eq!(source.seen.lock().unwrap().len(), 1);
    }
}
