//! PostgreSQL implementation of `StorageDriver`
//!
//! One shared `workflow_records` table: (group_key, discriminator_key)
//! primary key, the full record as JSONB, and the indexed attributes
//! extracted into columns so every secondary query path is served by a
//! partial index. Conditional writes map onto `ON CONFLICT DO NOTHING`
//! and guarded single-statement updates; patches are applied as a JSONB
//! merge (`set_if_absent || item || set`) so there is no read-modify-write
//! window.

use async_trait::async_trait;
use serde_json::Value;
use sqlx::{PgPool, QueryBuilder, Row};
use tracing::{debug, error};

use flowstate_core::SortOrder;

use super::{
    AttributeEquals, DriverError, GroupQuery, IndexQuery, Item, Patch, PutCondition,
    StorageDriver,
};

const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS workflow_records (
        group_key         TEXT   NOT NULL,
        discriminator_key TEXT   NOT NULL,
        entity_type       TEXT   NOT NULL,
        item              JSONB  NOT NULL,
        created_at_ms     BIGINT NOT NULL,
        workflow_name     TEXT,
        status            TEXT,
        hook_id           TEXT,
        token             TEXT,
        correlation_id    TEXT,
        PRIMARY KEY (group_key, discriminator_key)
    )
    "#,
    r#"
    CREATE INDEX IF NOT EXISTS workflow_records_workflow_name_idx
        ON workflow_records (workflow_name, created_at_ms)
        WHERE workflow_name IS NOT NULL
    "#,
    r#"
    CREATE INDEX IF NOT EXISTS workflow_records_status_idx
        ON workflow_records (status, created_at_ms)
        WHERE status IS NOT NULL
    "#,
    r#"
    CREATE INDEX IF NOT EXISTS workflow_records_entity_type_idx
        ON workflow_records (entity_type, created_at_ms)
    "#,
    r#"
    CREATE INDEX IF NOT EXISTS workflow_records_hook_id_idx
        ON workflow_records (hook_id)
        WHERE hook_id IS NOT NULL
    "#,
    r#"
    CREATE INDEX IF NOT EXISTS workflow_records_token_idx
        ON workflow_records (token)
        WHERE token IS NOT NULL
    "#,
    r#"
    CREATE INDEX IF NOT EXISTS workflow_records_correlation_id_idx
        ON workflow_records (correlation_id, created_at_ms)
        WHERE correlation_id IS NOT NULL
    "#,
];

/// PostgreSQL implementation of `StorageDriver`
#[derive(Clone)]
pub struct PostgresDriver {
    pool: PgPool,
}

impl PostgresDriver {
    /// Wrap an existing connection pool; the schema must already exist
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connect to the given database URL and ensure the schema exists
    pub async fn connect(database_url: &str) -> Result<Self, DriverError> {
        let pool = PgPool::connect(database_url)
            .await
            .map_err(backend_error)?;
        let driver = Self::new(pool);
        driver.ensure_schema().await?;
        Ok(driver)
    }

    /// Get a reference to the connection pool
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Create the records table and its secondary indexes if missing
    pub async fn ensure_schema(&self) -> Result<(), DriverError> {
        for statement in SCHEMA {
            sqlx::query(statement)
                .execute(&self.pool)
                .await
                .map_err(backend_error)?;
        }
        debug!("workflow_records schema ensured");
        Ok(())
    }
}

fn backend_error(err: sqlx::Error) -> DriverError {
    error!("backend call failed: {err}");
    DriverError::Backend(err.to_string())
}

fn text_attribute(item: &Item, attribute: &str) -> Option<String> {
    item.get(attribute)
        .and_then(Value::as_str)
        .map(str::to_string)
}

fn required_text(item: &Item, attribute: &str) -> Result<String, DriverError> {
    text_attribute(item, attribute)
        .ok_or_else(|| DriverError::Serialization(format!("item missing {attribute}")))
}

fn item_from_value(value: Value) -> Result<Item, DriverError> {
    match value {
        Value::Object(map) => Ok(map),
        other => Err(DriverError::Serialization(format!(
            "expected stored object, got {other}"
        ))),
    }
}

fn order_sql(order: SortOrder) -> &'static str {
    match order {
        SortOrder::Asc => "ASC",
        SortOrder::Desc => "DESC",
    }
}

#[async_trait]
impl StorageDriver for PostgresDriver {
    async fn get(
        &self,
        group_key: &str,
        discriminator_key: &str,
    ) -> Result<Option<Item>, DriverError> {
        let row = sqlx::query(
            r#"
            SELECT item FROM workflow_records
            WHERE group_key = $1 AND discriminator_key = $2
            "#,
        )
        .bind(group_key)
        .bind(discriminator_key)
        .fetch_optional(&self.pool)
        .await
        .map_err(backend_error)?;

        row.map(|row| item_from_value(row.get::<Value, _>("item")))
            .transpose()
    }

    async fn put(&self, item: Item, condition: PutCondition) -> Result<(), DriverError> {
        let group_key = required_text(&item, "group_key")?;
        let discriminator_key = required_text(&item, "discriminator_key")?;
        let entity_type = required_text(&item, "entity_type")?;
        let created_at_ms = item
            .get("created_at_ms")
            .and_then(Value::as_i64)
            .ok_or_else(|| DriverError::Serialization("item missing created_at_ms".to_string()))?;
        let workflow_name = text_attribute(&item, "workflow_name");
        let status = text_attribute(&item, "status");
        let hook_id = text_attribute(&item, "hook_id");
        let token = text_attribute(&item, "token");
        let correlation_id = text_attribute(&item, "correlation_id");

        let insert = r#"
            INSERT INTO workflow_records
                (group_key, discriminator_key, entity_type, item, created_at_ms,
                 workflow_name, status, hook_id, token, correlation_id)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
        "#;
        let statement = match condition {
            PutCondition::KeyAbsent => format!(
                "{insert} ON CONFLICT (group_key, discriminator_key) DO NOTHING"
            ),
            PutCondition::None => format!(
                "{insert} ON CONFLICT (group_key, discriminator_key) DO UPDATE SET
                    entity_type = EXCLUDED.entity_type,
                    item = EXCLUDED.item,
                    created_at_ms = EXCLUDED.created_at_ms,
                    workflow_name = EXCLUDED.workflow_name,
                    status = EXCLUDED.status,
                    hook_id = EXCLUDED.hook_id,
                    token = EXCLUDED.token,
                    correlation_id = EXCLUDED.correlation_id"
            ),
        };

        let result = sqlx::query(&statement)
            .bind(&group_key)
            .bind(&discriminator_key)
            .bind(&entity_type)
            .bind(Value::Object(item))
            .bind(created_at_ms)
            .bind(&workflow_name)
            .bind(&status)
            .bind(&hook_id)
            .bind(&token)
            .bind(&correlation_id)
            .execute(&self.pool)
            .await
            .map_err(backend_error)?;

        if condition == PutCondition::KeyAbsent && result.rows_affected() == 0 {
            return Err(DriverError::ConditionFailed);
        }
        Ok(())
    }

    async fn update(
        &self,
        group_key: &str,
        discriminator_key: &str,
        patch: Patch,
        condition: Option<AttributeEquals>,
    ) -> Result<Item, DriverError> {
        // jsonb || gives right-operand precedence: defaults that only apply
        // when absent, then the stored item, then the forced assignments.
        let status = text_attribute(&patch.set, "status");
        let set = Value::Object(patch.set);
        let set_if_absent = Value::Object(patch.set_if_absent);

        let row = match &condition {
            None => {
                sqlx::query(
                    r#"
                    UPDATE workflow_records
                       SET item = $3::jsonb || item || $4::jsonb,
                           status = COALESCE($5, status)
                     WHERE group_key = $1 AND discriminator_key = $2
                    RETURNING item
                    "#,
                )
                .bind(group_key)
                .bind(discriminator_key)
                .bind(&set_if_absent)
                .bind(&set)
                .bind(&status)
                .fetch_optional(&self.pool)
                .await
            }
            Some(cond) => {
                sqlx::query(
                    r#"
                    UPDATE workflow_records
                       SET item = $3::jsonb || item || $4::jsonb,
                           status = COALESCE($5, status)
                     WHERE group_key = $1 AND discriminator_key = $2
                       AND item -> $6::text = $7::jsonb
                    RETURNING item
                    "#,
                )
                .bind(group_key)
                .bind(discriminator_key)
                .bind(&set_if_absent)
                .bind(&set)
                .bind(&status)
                .bind(cond.attribute)
                .bind(&cond.expected)
                .fetch_optional(&self.pool)
                .await
            }
        }
        .map_err(backend_error)?;

        match row {
            Some(row) => item_from_value(row.get::<Value, _>("item")),
            None if condition.is_some() => Err(DriverError::ConditionFailed),
            None => Err(DriverError::NotFound),
        }
    }

    async fn delete(
        &self,
        group_key: &str,
        discriminator_key: &str,
    ) -> Result<Item, DriverError> {
        let row = sqlx::query(
            r#"
            DELETE FROM workflow_records
            WHERE group_key = $1 AND discriminator_key = $2
            RETURNING item
            "#,
        )
        .bind(group_key)
        .bind(discriminator_key)
        .fetch_optional(&self.pool)
        .await
        .map_err(backend_error)?
        .ok_or(DriverError::NotFound)?;

        item_from_value(row.get::<Value, _>("item"))
    }

    async fn query_group(&self, query: GroupQuery) -> Result<Vec<Item>, DriverError> {
        let mut builder: QueryBuilder<sqlx::Postgres> =
            QueryBuilder::new("SELECT item FROM workflow_records WHERE group_key = ");
        builder.push_bind(&query.group_key);

        if let Some(prefix) = query.key_prefix {
            builder.push(" AND discriminator_key LIKE ");
            builder.push_bind(format!("{prefix}%"));
        }
        if let Some(bound) = &query.exclusive_start {
            builder.push(match query.order {
                SortOrder::Asc => " AND discriminator_key > ",
                SortOrder::Desc => " AND discriminator_key < ",
            });
            builder.push_bind(bound);
        }

        builder.push(" ORDER BY discriminator_key ");
        builder.push(order_sql(query.order));
        builder.push(" LIMIT ");
        builder.push_bind(i64::from(query.limit));

        let values: Vec<Value> = builder
            .build_query_scalar()
            .fetch_all(&self.pool)
            .await
            .map_err(backend_error)?;

        values.into_iter().map(item_from_value).collect()
    }

    async fn query_index(&self, query: IndexQuery) -> Result<Vec<Item>, DriverError> {
        let mut builder: QueryBuilder<sqlx::Postgres> =
            QueryBuilder::new("SELECT item FROM workflow_records WHERE ");
        builder.push(query.index.attribute());
        builder.push(" = ");
        builder.push_bind(&query.value);

        if let Some(entity) = query.entity {
            builder.push(" AND entity_type = ");
            builder.push_bind(entity.as_str());
        }
        if let Some(bound) = query.exclusive_start {
            builder.push(match query.order {
                SortOrder::Asc => " AND created_at_ms > ",
                SortOrder::Desc => " AND created_at_ms < ",
            });
            builder.push_bind(bound);
        }

        let direction = order_sql(query.order);
        builder.push(" ORDER BY created_at_ms ");
        builder.push(direction);
        builder.push(", discriminator_key ");
        builder.push(direction);
        builder.push(" LIMIT ");
        builder.push_bind(i64::from(query.limit));

        let values: Vec<Value> = builder
            .build_query_scalar()
            .fetch_all(&self.pool)
            .await
            .map_err(backend_error)?;

        values.into_iter().map(item_from_value).collect()
    }
}
