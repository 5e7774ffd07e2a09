use chrono::{DateTime, Utc};
use deadpool_postgres::GenericClient;
use serde::Serialize;
use tokio_postgres::{Error, Row};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub role_id: i32,
    pub role: String,
    pub created_at: DateTime<Utc>,
}

impl User {
    fn from_row(row: &Row) -> Result<Self, Error> {
        Ok(Self {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
            email: row.try_get("email")?,
            password_hash: row.try_get("password_hash")?,
            role_id: row.try_get("role_id")?,
            role: row.try_get("role_name")?,
            created_at: row.try_get("created_at")?,
        })
    }
}

#[derive(Debug)]
pub struct NewUser<'a> {
    pub name: &'a str,
    pub email: &'a str,
    pub password_hash: &'a str,
    pub role_id: i32,
}

const SELECT: &str = "SELECT u.id, u.name, u.email, u.password_hash, u.role_id, \
                      r.name AS role_name, u.created_at \
                      FROM users u JOIN roles r ON r.id = u.role_id";

pub async fn list(client: &impl GenericClient) -> Result<Vec<User>, Error> {
    let stmt = client
        .prepare_cached(&format!("{SELECT} ORDER BY u.created_at, u.email"))
        .await?;
    client
        .query(&stmt, &[])
        .await?
        .iter()
        .map(User::from_row)
        .collect()
}

pub async fn get(client: &impl GenericClient, id: Uuid) -> Result<Option<User>, Error> {
    let stmt = client
        .prepare_cached(&format!("{SELECT} WHERE u.id = $1"))
        .await?;
    client
        .query_opt(&stmt, &[&id])
        .await?
        .as_ref()
        .map(User::from_row)
        .transpose()
}

pub async fn get_by_email(client: &impl GenericClient, email: &str) -> Result<Option<User>, Error> {
    let stmt = client
        .prepare_cached(&format!("{SELECT} WHERE lower(u.email) = lower($1)"))
        .await?;
    client
        .query_opt(&stmt, &[&email])
        .await?
        .as_ref()
        .map(User::from_row)
        .transpose()
}

pub async fn insert(client: &impl GenericClient, user: &NewUser<'_>) -> Result<User, Error> {
    let stmt = client
        .prepare_cached(
            "WITH inserted AS ( \
                INSERT INTO users (name, email, password_hash, role_id) \
                VALUES ($1, $2, $3, $4) RETURNING * \
             ) \
             SELECT i.id, i.name, i.email, i.password_hash, i.role_id, \
                    r.name AS role_name, i.created_at \
             FROM inserted i JOIN roles r ON r.id = i.role_id",
        )
        .await?;
    let row = client
        .query_one(
            &stmt,
            &[&user.name, &user.email, &user.password_hash, &user.role_id],
        )
        .await?;

    User::from_row(&row)
}
