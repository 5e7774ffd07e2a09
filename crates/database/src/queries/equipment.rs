use chrono::{DateTime, Utc};
use deadpool_postgres::GenericClient;
use serde::{Deserialize, Serialize};
use tokio_postgres::{Error, Row};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EquipmentCategory {
    pub id: Uuid,
    pub name: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Equipment {
    pub id: Uuid,
    pub name: String,
    pub category_id: Option<Uuid>,
    pub category: Option<String>,
    pub specs: Option<String>,
    pub quantity: i32,
    pub available: i32,
    pub requires_approval: bool,
    pub created_at: DateTime<Utc>,
}

impl Equipment {
    fn from_row(row: &Row) -> Result<Self, Error> {
        Ok(Self {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
            category_id: row.try_get("category_id")?,
            category: row.try_get("category_name")?,
            specs: row.try_get("specs")?,
            quantity: row.try_get("quantity")?,
            available: row.try_get("available")?,
            requires_approval: row.try_get("requires_approval")?,
            created_at: row.try_get("created_at")?,
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EquipmentFields {
    pub name: String,
    pub category_id: Option<Uuid>,
    pub specs: Option<String>,
    pub quantity: i32,
    #[serde(default = "default_requires_approval")]
    pub requires_approval: bool,
}

fn default_requires_approval() -> bool {
    true
}

const SELECT: &str = "SELECT e.id, e.name, e.category_id, c.name AS category_name, e.specs, \
                      e.quantity, e.available, e.requires_approval, e.created_at \
                      FROM equipment e \
                      LEFT JOIN equipment_categories c ON c.id = e.category_id";

pub async fn list_categories(client: &impl GenericClient) -> Result<Vec<EquipmentCategory>, Error> {
    let stmt = client
        .prepare_cached("SELECT id, name FROM equipment_categories ORDER BY name")
        .await?;
    client
        .query(&stmt, &[])
        .await?
        .iter()
        .map(|row| {
            Ok(EquipmentCategory {
                id: row.try_get(0)?,
                name: row.try_get(1)?,
            })
        })
        .collect()
}

pub async fn insert_category(
    client: &impl GenericClient,
    name: &str,
) -> Result<EquipmentCategory, Error> {
    let stmt = client
        .prepare_cached("INSERT INTO equipment_categories (name) VALUES ($1) RETURNING id, name")
        .await?;
    let row = client.query_one(&stmt, &[&name]).await?;

    Ok(EquipmentCategory {
        id: row.try_get(0)?,
        name: row.try_get(1)?,
    })
}

pub async fn list(
    client: &impl GenericClient,
    category_id: Option<Uuid>,
) -> Result<Vec<Equipment>, Error> {
    let stmt = client
        .prepare_cached(&format!(
            "{SELECT} WHERE ($1::uuid IS NULL OR e.category_id = $1) ORDER BY e.name"
        ))
        .await?;
    client
        .query(&stmt, &[&category_id])
        .await?
        .iter()
        .map(Equipment::from_row)
        .collect()
}

pub async fn get(client: &impl GenericClient, id: Uuid) -> Result<Option<Equipment>, Error> {
    let stmt = client
        .prepare_cached(&format!("{SELECT} WHERE e.id = $1"))
        .await?;
    client
        .query_opt(&stmt, &[&id])
        .await?
        .as_ref()
        .map(Equipment::from_row)
        .transpose()
}

/// Reads an item and row-locks it until the transaction ends.
pub async fn lock(client: &impl GenericClient, id: Uuid) -> Result<Option<Equipment>, Error> {
    let stmt = client
        .prepare_cached(&format!("{SELECT} WHERE e.id = $1 FOR UPDATE OF e"))
        .await?;
    client
        .query_opt(&stmt, &[&id])
        .await?
        .as_ref()
        .map(Equipment::from_row)
        .transpose()
}

pub async fn insert(client: &impl GenericClient, fields: &EquipmentFields) -> Result<Uuid, Error> {
    let stmt = client
        .prepare_cached(
            "INSERT INTO equipment (name, category_id, specs, quantity, available, requires_approval) \
             VALUES ($1, $2, $3, $4, $4, $5) RETURNING id",
        )
        .await?;
    let row = client
        .query_one(
            &stmt,
            &[
                &fields.name,
                &fields.category_id,
                &fields.specs,
                &fields.quantity,
                &fields.requires_approval,
            ],
        )
        .await?;

    row.try_get(0)
}

/// Rewrites an item. `available` is passed explicitly so the caller keeps it in
/// step with the quantity change.
pub async fn update(
    client: &impl GenericClient,
    id: Uuid,
    fields: &EquipmentFields,
    available: i32,
) -> Result<u64, Error> {
    let stmt = client
        .prepare_cached(
            "UPDATE equipment SET name = $2, category_id = $3, specs = $4, quantity = $5, \
             available = $6, requires_approval = $7 WHERE id = $1",
        )
        .await?;
    client
        .execute(
            &stmt,
            &[
                &id,
                &fields.name,
                &fields.category_id,
                &fields.specs,
                &fields.quantity,
                &available,
                &fields.requires_approval,
            ],
        )
        .await
}

pub async fn delete(client: &impl GenericClient, id: Uuid) -> Result<u64, Error> {
    let stmt = client
        .prepare_cached("DELETE FROM equipment WHERE id = $1")
        .await?;
    client.execute(&stmt, &[&id]).await
}

/// Takes one unit if any is left. Returns the remaining count, or `None` when
/// nothing was available.
pub async fn take_unit(client: &impl GenericClient, id: Uuid) -> Result<Option<i32>, Error> {
    let stmt = client
        .prepare_cached(
            "UPDATE equipment SET available = available - 1 \
             WHERE id = $1 AND available > 0 RETURNING available",
        )
        .await?;
    client
        .query_opt(&stmt, &[&id])
        .await?
        .map(|row| row.try_get(0))
        .transpose()
}

/// Puts one unit back, never exceeding `quantity`.
pub async fn return_unit(client: &impl GenericClient, id: Uuid) -> Result<u64, Error> {
    let stmt = client
        .prepare_cached(
            "UPDATE equipment SET available = LEAST(available + 1, quantity) WHERE id = $1",
        )
        .await?;
    client.execute(&stmt, &[&id]).await
}
