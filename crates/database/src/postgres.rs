//! PostgreSQL source database: internal tables, catalog introspection,
//! trigger installation and the [`EventStore`] backed by `teleport.*`.

use crate::batch::Batch;
use crate::error::Result;
use crate::event::{Event, EventStatus};
use crate::store::EventStore;
use async_trait::async_trait;
use ddldiff::sql::{Ident, Qualified};
use ddldiff::{Catalog, TargetExpression};
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio_postgres::{Client, NoTls, Row};
use tracing::{debug, error, info};

const SETUP_SQL: &str = include_str!("../sql/setup.sql");
const CATALOG_SQL: &str = include_str!("../sql/catalog.sql");
const SOURCE_TRIGGER_SQL: &str = include_str!("../sql/source_trigger.sql");

/// Schema holding teleport's own tables; never watched.
pub const INTERNAL_SCHEMA: &str = "teleport";

const EVENT_COLUMNS: &str =
    "id, kind, status, trigger_tag, trigger_event, transaction_id, data, created_at";
const BATCH_COLUMNS: &str = "id, status, source, target, data, created_at";

/// Connect to PostgreSQL and spawn the connection driver.
pub async fn new_postgresql_client(connection_string: &str) -> Result<Arc<Mutex<Client>>> {
    let (client, connection) = tokio_postgres::connect(connection_string, NoTls).await?;

    tokio::spawn(async move {
        if let Err(e) = connection.await {
            error!("PostgreSQL connection error: {e}");
        }
    });

    Ok(Arc::new(Mutex::new(client)))
}

/// A source database being watched by teleport.
pub struct Database {
    /// Logical source name recorded on every batch
    pub name: String,
    client: Arc<Mutex<Client>>,
    catalog: Catalog,
}

impl Database {
    /// Connect, create the internal tables and load the current catalog.
    pub async fn start(name: impl Into<String>, connection_string: &str) -> Result<Self> {
        let client = new_postgresql_client(connection_string).await?;
        let mut db = Self {
            name: name.into(),
            client,
            catalog: Catalog::default(),
        };

        db.setup().await?;
        db.refresh_schema().await?;
        Ok(db)
    }

    /// Create the `teleport` schema, its tables and the introspection function.
    pub async fn setup(&self) -> Result<()> {
        let client = self.client.lock().await;
        client.batch_execute(SETUP_SQL).await?;
        info!("Internal tables ready for database {}", self.name);
        Ok(())
    }

    /// Reload the cached catalog from the live database.
    pub async fn refresh_schema(&mut self) -> Result<()> {
        let json: Option<String> = {
            let client = self.client.lock().await;
            client.query_one(CATALOG_SQL, &[]).await?.try_get(0)?
        };

        self.catalog = match json {
            Some(json) => Catalog::parse(&json)?,
            None => Catalog::default(),
        };
        debug!(
            "Loaded catalog of {} with {} entities",
            self.name,
            self.catalog.entity_count()
        );
        Ok(())
    }

    /// Catalog as of the last [`Database::refresh_schema`].
    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Install the DDL event triggers and a row trigger on every ordinary
    /// table matched by `target_expression`. Returns the number of tables
    /// that got a row trigger.
    pub async fn install_triggers(&self, target_expression: &TargetExpression) -> Result<usize> {
        let client = self.client.lock().await;
        client.batch_execute(SOURCE_TRIGGER_SQL).await?;
        info!("Installed DDL event triggers on {}", self.name);

        let mut installed = 0;
        for (schema, table) in self.catalog.tables() {
            if schema.name == INTERNAL_SCHEMA || !table.relation_kind.is_ordinary() {
                continue;
            }
            if !target_expression.matches(&schema.name, Some(&table.name)) {
                debug!("Skipping {}.{}: not matched by {target_expression}", schema.name, table.name);
                continue;
            }

            let trigger = Ident(format!("teleport_dml_{}", table.name));
            let qualified = Qualified(&schema.name, &table.name);

            let drop_trigger = format!("DROP TRIGGER IF EXISTS {trigger} ON {qualified}");
            client.simple_query(&drop_trigger).await?;

            let create_trigger = format!(
                "CREATE TRIGGER {trigger}
                AFTER INSERT OR UPDATE OR DELETE ON {qualified}
                FOR EACH ROW EXECUTE PROCEDURE teleport.dml_event()"
            );
            match client.simple_query(&create_trigger).await {
                Ok(_) => info!("Created row trigger for table: {qualified}"),
                Err(e) => {
                    error!("Failed to create trigger for table {qualified}: {e}");
                    return Err(e.into());
                }
            }
            installed += 1;
        }

        Ok(installed)
    }
}

fn event_from_row(row: &Row) -> Result<Event> {
    let kind: String = row.try_get("kind")?;
    let status: String = row.try_get("status")?;
    Ok(Event {
        id: row.try_get("id")?,
        kind: kind.parse()?,
        status: status.parse()?,
        trigger_tag: row.try_get("trigger_tag")?,
        trigger_event: row.try_get("trigger_event")?,
        transaction_id: row.try_get("transaction_id")?,
        data: row.try_get("data")?,
        created_at: row.try_get("created_at")?,
    })
}

fn batch_from_row(row: &Row) -> Result<Batch> {
    let status: String = row.try_get("status")?;
    Ok(Batch {
        id: row.try_get("id")?,
        status: status.parse()?,
        source: row.try_get("source")?,
        target: row.try_get("target")?,
        data: row.try_get("data")?,
        created_at: row.try_get("created_at")?,
    })
}

#[async_trait]
impl EventStore for Database {
    async fn get_events(&self, status: EventStatus) -> Result<Vec<Event>> {
        let client = self.client.lock().await;
        let rows = client
            .query(
                &format!("SELECT {EVENT_COLUMNS} FROM teleport.event WHERE status = $1 ORDER BY id"),
                &[&status.as_str()],
            )
            .await?;
        rows.iter().map(event_from_row).collect()
    }

    async fn get_event(&self, id: i64) -> Result<Option<Event>> {
        let client = self.client.lock().await;
        let row = client
            .query_opt(
                &format!("SELECT {EVENT_COLUMNS} FROM teleport.event WHERE id = $1"),
                &[&id],
            )
            .await?;
        row.as_ref().map(event_from_row).transpose()
    }

    async fn insert_event(&self, event: &Event) -> Result<i64> {
        let client = self.client.lock().await;
        let row = client
            .query_one(
                "INSERT INTO teleport.event
                    (kind, status, trigger_tag, trigger_event, transaction_id, data)
                VALUES ($1, $2, $3, $4, $5, $6)
                RETURNING id",
                &[
                    &event.kind.as_str(),
                    &event.status.as_str(),
                    &event.trigger_tag,
                    &event.trigger_event,
                    &event.transaction_id,
                    &event.data,
                ],
            )
            .await?;
        Ok(row.try_get(0)?)
    }

    async fn update_event(&self, event: &Event) -> Result<()> {
        let client = self.client.lock().await;
        client
            .execute(
                "UPDATE teleport.event SET status = $2, data = $3 WHERE id = $1",
                &[&event.id, &event.status.as_str(), &event.data],
            )
            .await?;
        Ok(())
    }

    async fn commit_batches(&self, batches: &mut [Batch], events: &[Event]) -> Result<()> {
        let mut client = self.client.lock().await;
        let tx = client.transaction().await?;

        let insert = tx
            .prepare(
                "INSERT INTO teleport.batch (status, source, target, data)
                VALUES ($1, $2, $3, $4)
                RETURNING id, created_at",
            )
            .await?;
        let link = tx
            .prepare("INSERT INTO teleport.batch_events (batch_id, event_id) VALUES ($1, $2)")
            .await?;
        let mark = tx
            .prepare("UPDATE teleport.event SET status = $2 WHERE id = $1")
            .await?;

        let mut inserted = Vec::with_capacity(batches.len());
        for batch in batches.iter() {
            let row = tx
                .query_one(
                    &insert,
                    &[
                        &batch.status.as_str(),
                        &batch.source,
                        &batch.target,
                        &batch.data,
                    ],
                )
                .await?;
            let batch_id: i64 = row.try_get("id")?;
            for event in events {
                tx.execute(&link, &[&batch_id, &event.id]).await?;
            }
            inserted.push((batch_id, row.try_get("created_at")?));
        }
        for event in events {
            tx.execute(&mark, &[&event.id, &EventStatus::Batched.as_str()])
                .await?;
        }

        tx.commit().await?;

        for (batch, (batch_id, created_at)) in batches.iter_mut().zip(inserted) {
            batch.id = Some(batch_id);
            batch.created_at = created_at;
        }
        Ok(())
    }

    async fn batch_event_ids(&self, batch_id: i64) -> Result<Vec<i64>> {
        let client = self.client.lock().await;
        let rows = client
            .query(
                "SELECT event_id FROM teleport.batch_events WHERE batch_id = $1 ORDER BY event_id",
                &[&batch_id],
            )
            .await?;
        rows.iter()
            .map(|row| row.try_get(0).map_err(Into::into))
            .collect()
    }

    async fn get_batch(&self, id: i64) -> Result<Option<Batch>> {
        let client = self.client.lock().await;
        let row = client
            .query_opt(
                &format!("SELECT {BATCH_COLUMNS} FROM teleport.batch WHERE id = $1"),
                &[&id],
            )
            .await?;
        row.as_ref().map(batch_from_row).transpose()
    }
}
