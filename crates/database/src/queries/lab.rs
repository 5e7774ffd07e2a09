use std::collections::HashMap;

use chrono::{DateTime, NaiveTime, Utc};
use deadpool_postgres::GenericClient;
use postgres_types::Json;
use serde::{Deserialize, Serialize};
use timeslot::{Interval, TimeOfDay};
use tokio_postgres::{Error, Row};
use uuid::Uuid;

use crate::types::DayOfWeek;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Lab {
    pub id: Uuid,
    pub name: String,
    pub location: String,
    pub capacity: i32,
    pub facilities: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub time_slots: Vec<TimeSlot>,
}

impl Lab {
    fn from_row(row: &Row) -> Result<Self, Error> {
        Ok(Self {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
            location: row.try_get("location")?,
            capacity: row.try_get("capacity")?,
            facilities: row.try_get::<_, Json<Vec<String>>>("facilities")?.0,
            created_at: row.try_get("created_at")?,
            time_slots: Vec::new(),
        })
    }
}

/// Weekly recurring slot of a lab.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeSlot {
    pub id: Uuid,
    pub lab_id: Uuid,
    pub day: DayOfWeek,
    pub start_time: TimeOfDay,
    pub end_time: TimeOfDay,
}

impl TimeSlot {
    fn from_row(row: &Row) -> Result<Self, Error> {
        Ok(Self {
            id: row.try_get("id")?,
            lab_id: row.try_get("lab_id")?,
            day: row.try_get("day")?,
            start_time: row.try_get::<_, NaiveTime>("start_time")?.into(),
            end_time: row.try_get::<_, NaiveTime>("end_time")?.into(),
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewLab {
    pub name: String,
    pub location: String,
    pub capacity: i32,
    #[serde(default)]
    pub facilities: Vec<String>,
}

const SELECT_SLOTS: &str = "SELECT id, lab_id, day, start_time, end_time FROM lab_time_slots";

pub async fn list(client: &impl GenericClient) -> Result<Vec<Lab>, Error> {
    let stmt = client
        .prepare_cached("SELECT * FROM labs ORDER BY name")
        .await?;
    let mut labs = client
        .query(&stmt, &[])
        .await?
        .iter()
        .map(Lab::from_row)
        .collect::<Result<Vec<_>, _>>()?;

    let stmt = client
        .prepare_cached(&format!("{SELECT_SLOTS} ORDER BY day, start_time"))
        .await?;
    let mut slots_by_lab: HashMap<Uuid, Vec<TimeSlot>> = HashMap::new();
    for row in client.query(&stmt, &[]).await? {
        let slot = TimeSlot::from_row(&row)?;
        slots_by_lab.entry(slot.lab_id).or_default().push(slot);
    }

    for lab in &mut labs {
        lab.time_slots = slots_by_lab.remove(&lab.id).unwrap_or_default();
    }

    Ok(labs)
}

pub async fn get(client: &impl GenericClient, id: Uuid) -> Result<Option<Lab>, Error> {
    let stmt = client
        .prepare_cached("SELECT * FROM labs WHERE id = $1")
        .await?;
    let Some(row) = client.query_opt(&stmt, &[&id]).await? else {
        return Ok(None);
    };

    let mut lab = Lab::from_row(&row)?;
    lab.time_slots = time_slots(client, id, None).await?;

    Ok(Some(lab))
}

pub async fn exists(client: &impl GenericClient, id: Uuid) -> Result<bool, Error> {
    let stmt = client
        .prepare_cached("SELECT 1 FROM labs WHERE id = $1")
        .await?;
    Ok(client.query_opt(&stmt, &[&id]).await?.is_some())
}

pub async fn insert(client: &impl GenericClient, lab: &NewLab) -> Result<Lab, Error> {
    let stmt = client
        .prepare_cached(
            "INSERT INTO labs (name, location, capacity, facilities) \
             VALUES ($1, $2, $3, $4) RETURNING *",
        )
        .await?;
    let row = client
        .query_one(
            &stmt,
            &[&lab.name, &lab.location, &lab.capacity, &Json(&lab.facilities)],
        )
        .await?;

    Lab::from_row(&row)
}

pub async fn delete(client: &impl GenericClient, id: Uuid) -> Result<u64, Error> {
    let stmt = client
        .prepare_cached("DELETE FROM labs WHERE id = $1")
        .await?;
    client.execute(&stmt, &[&id]).await
}

/// Slots of a lab, optionally restricted to one weekday.
pub async fn time_slots(
    client: &impl GenericClient,
    lab_id: Uuid,
    day: Option<DayOfWeek>,
) -> Result<Vec<TimeSlot>, Error> {
    let stmt = client
        .prepare_cached(&format!(
            "{SELECT_SLOTS} WHERE lab_id = $1 AND ($2::day_of_week IS NULL OR day = $2) \
             ORDER BY day, start_time"
        ))
        .await?;
    client
        .query(&stmt, &[&lab_id, &day])
        .await?
        .iter()
        .map(TimeSlot::from_row)
        .collect()
}

pub async fn insert_time_slot(
    client: &impl GenericClient,
    lab_id: Uuid,
    day: DayOfWeek,
    interval: Interval,
) -> Result<TimeSlot, Error> {
    let stmt = client
        .prepare_cached(
            "INSERT INTO lab_time_slots (lab_id, day, start_time, end_time) \
             VALUES ($1, $2, $3, $4) RETURNING id, lab_id, day, start_time, end_time",
        )
        .await?;
    let row = client
        .query_one(
            &stmt,
            &[
                &lab_id,
                &day,
                &NaiveTime::from(interval.start_time),
                &NaiveTime::from(interval.end_time),
            ],
        )
        .await?;

    TimeSlot::from_row(&row)
}

/// Reads a slot and holds a row lock on it until the transaction ends.
///
/// Every booking of the slot goes through this lock, which serialises
/// concurrent attempts on the same `(slot, date)` pair.
pub async fn lock_time_slot(
    client: &impl GenericClient,
    id: Uuid,
) -> Result<Option<TimeSlot>, Error> {
    let stmt = client
        .prepare_cached(&format!("{SELECT_SLOTS} WHERE id = $1 FOR UPDATE"))
        .await?;
    client
        .query_opt(&stmt, &[&id])
        .await?
        .as_ref()
        .map(TimeSlot::from_row)
        .transpose()
}
