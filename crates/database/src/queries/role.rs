use deadpool_postgres::GenericClient;
use serde::Serialize;
use tokio_postgres::{Error, Row};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Role {
    pub id: i32,
    pub name: String,
}

impl Role {
    fn from_row(row: &Row) -> Result<Self, Error> {
        Ok(Self {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
        })
    }
}

pub async fn list(client: &impl GenericClient) -> Result<Vec<Role>, Error> {
    let stmt = client
        .prepare_cached("SELECT id, name FROM roles ORDER BY id")
        .await?;
    client
        .query(&stmt, &[])
        .await?
        .iter()
        .map(Role::from_row)
        .collect()
}

pub async fn get_by_name(client: &impl GenericClient, name: &str) -> Result<Option<Role>, Error> {
    let stmt = client
        .prepare_cached("SELECT id, name FROM roles WHERE name = upper($1)")
        .await?;
    client
        .query_opt(&stmt, &[&name])
        .await?
        .as_ref()
        .map(Role::from_row)
        .transpose()
}

/// Names of every permission joined to `role_id` through `role_permissions`.
pub async fn permission_names(
    client: &impl GenericClient,
    role_id: i32,
) -> Result<Vec<String>, Error> {
    let stmt = client
        .prepare_cached(
            "SELECT p.name FROM role_permissions rp \
             JOIN permissions p ON p.id = rp.permission_id \
             WHERE rp.role_id = $1 ORDER BY p.name",
        )
        .await?;
    client
        .query(&stmt, &[&role_id])
        .await?
        .iter()
        .map(|row| row.try_get(0))
        .collect()
}
