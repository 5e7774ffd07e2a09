use deadpool_postgres::GenericClient;
use postgres_types::Json;
use serde::{Deserialize, Serialize};
use tokio_postgres::{Error, Row};
use uuid::Uuid;

use crate::types::Designation;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Faculty {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub designation: Designation,
    pub department: String,
    pub expertise: Vec<String>,
    pub office: Option<String>,
    pub phone: Option<String>,
    pub bio: Option<String>,
    pub image_url: Option<String>,
    pub is_chairman: bool,
}

impl Faculty {
    fn from_row(row: &Row) -> Result<Self, Error> {
        Ok(Self {
            id: row.try_get("user_id")?,
            name: row.try_get("name")?,
            email: row.try_get("email")?,
            designation: row.try_get("designation")?,
            department: row.try_get("department")?,
            expertise: row.try_get::<_, Json<Vec<String>>>("expertise")?.0,
            office: row.try_get("office")?,
            phone: row.try_get("phone")?,
            bio: row.try_get("bio")?,
            image_url: row.try_get("image_url")?,
            is_chairman: row.try_get("is_chairman")?,
        })
    }
}

/// Editable part of a faculty profile.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FacultyProfile {
    pub designation: Designation,
    pub department: String,
    #[serde(default)]
    pub expertise: Vec<String>,
    pub office: Option<String>,
    pub phone: Option<String>,
    pub bio: Option<String>,
    pub image_url: Option<String>,
}

const SELECT: &str = "SELECT f.user_id, u.name, u.email, f.designation, f.department, \
                      f.expertise, f.office, f.phone, f.bio, f.image_url, \
                      (c.faculty_id IS NOT NULL) AS is_chairman \
                      FROM faculty f \
                      JOIN users u ON u.id = f.user_id \
                      LEFT JOIN chairman c ON c.faculty_id = f.user_id";

pub async fn list(
    client: &impl GenericClient,
    designation: Option<Designation>,
) -> Result<Vec<Faculty>, Error> {
    let stmt = client
        .prepare_cached(&format!(
            "{SELECT} WHERE ($1::designation IS NULL OR f.designation = $1) \
             ORDER BY is_chairman DESC, f.designation, u.name"
        ))
        .await?;
    client
        .query(&stmt, &[&designation])
        .await?
        .iter()
        .map(Faculty::from_row)
        .collect()
}

pub async fn get(client: &impl GenericClient, id: Uuid) -> Result<Option<Faculty>, Error> {
    let stmt = client
        .prepare_cached(&format!("{SELECT} WHERE f.user_id = $1"))
        .await?;
    client
        .query_opt(&stmt, &[&id])
        .await?
        .as_ref()
        .map(Faculty::from_row)
        .transpose()
}

pub async fn insert(
    client: &impl GenericClient,
    user_id: Uuid,
    profile: &FacultyProfile,
) -> Result<(), Error> {
    let stmt = client
        .prepare_cached(
            "INSERT INTO faculty (user_id, designation, department, expertise, office, phone, bio, image_url) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
        )
        .await?;
    client
        .execute(
            &stmt,
            &[
                &user_id,
                &profile.designation,
                &profile.department,
                &Json(&profile.expertise),
                &profile.office,
                &profile.phone,
                &profile.bio,
                &profile.image_url,
            ],
        )
        .await?;

    Ok(())
}

pub async fn update(
    client: &impl GenericClient,
    user_id: Uuid,
    profile: &FacultyProfile,
) -> Result<u64, Error> {
    let stmt = client
        .prepare_cached(
            "UPDATE faculty SET designation = $2, department = $3, expertise = $4, \
             office = $5, phone = $6, bio = $7, image_url = $8 \
             WHERE user_id = $1",
        )
        .await?;
    client
        .execute(
            &stmt,
            &[
                &user_id,
                &profile.designation,
                &profile.department,
                &Json(&profile.expertise),
                &profile.office,
                &profile.phone,
                &profile.bio,
                &profile.image_url,
            ],
        )
        .await
}

/// Makes `faculty_id` the single chairman, replacing any previous one.
pub async fn set_chairman(client: &impl GenericClient, faculty_id: Uuid) -> Result<(), Error> {
    let stmt = client
        .prepare_cached(
            "INSERT INTO chairman (singleton, faculty_id) VALUES (TRUE, $1) \
             ON CONFLICT (singleton) DO UPDATE SET faculty_id = EXCLUDED.faculty_id",
        )
        .await?;
    client.execute(&stmt, &[&faculty_id]).await?;

    Ok(())
}
