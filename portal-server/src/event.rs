use chrono::{DateTime, Utc};
use database::{
    GenericClient,
    deadpool_postgres::Pool,
    is_unique_violation,
    queries::{
        self,
        event::{Event, EventFields, EventFilter},
        event_registration::{EventRegistration, Registrant},
    },
    types::EventStatus,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::{
    auth::Principal,
    error::{AppError, Result},
};

/// Contact details for a registration. Missing name and e-mail fall back to the
/// principal's own.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RegistrationRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
}

fn check_fields(fields: &EventFields) -> Result<()> {
    if fields.start_date > fields.end_date {
        return Err(AppError::bad_request("event cannot end before it starts"));
    }
    if fields.max_participants.is_some_and(|max| max <= 0) {
        return Err(AppError::bad_request("maxParticipants must be positive"));
    }

    Ok(())
}

/// Registration preconditions that depend only on the event row.
fn check_open(event: &Event, now: DateTime<Utc>) -> Result<()> {
    if event.registration_required && event.status != EventStatus::RegistrationOpen {
        return Err(AppError::bad_request("registration is not open for this event"));
    }
    if event.registration_deadline.is_some_and(|deadline| now > deadline) {
        return Err(AppError::bad_request("registration deadline has passed"));
    }
    if event
        .max_participants
        .is_some_and(|max| event.registered_count >= max)
    {
        return Err(AppError::bad_request("event is at capacity"));
    }

    Ok(())
}

async fn organizer_role_id(client: &impl GenericClient, fields: &EventFields) -> Result<Option<i32>> {
    let Some(name) = fields.organizer_role.as_deref() else {
        return Ok(None);
    };

    let role = queries::role::get_by_name(client, name)
        .await?
        .ok_or_else(|| AppError::bad_request(format!("unknown role {name}")))?;

    Ok(Some(role.id))
}

pub async fn list(pool: &Pool, filter: &EventFilter) -> Result<Vec<Event>> {
    let client = pool.get().await?;
    Ok(queries::event::list(&client, filter).await?)
}

pub async fn get(pool: &Pool, id: Uuid) -> Result<Event> {
    let client = pool.get().await?;
    queries::event::get(&client, id)
        .await?
        .ok_or(AppError::NotFound("event"))
}

#[tracing::instrument(skip(pool), err)]
pub async fn create(pool: &Pool, fields: &EventFields) -> Result<Event> {
    check_fields(fields)?;

    let client = pool.get().await?;
    let role_id = organizer_role_id(&client, fields).await?;
    let id = queries::event::insert(&client, fields, role_id).await?;

    queries::event::get(&client, id)
        .await?
        .ok_or(AppError::NotFound("event"))
}

#[tracing::instrument(skip(pool), err)]
pub async fn update(pool: &Pool, id: Uuid, fields: &EventFields) -> Result<Event> {
    check_fields(fields)?;

    let mut client = pool.get().await?;
    let tx = client.transaction().await?;

    let current = queries::event::lock(&tx, id)
        .await?
        .ok_or(AppError::NotFound("event"))?;
    if fields
        .max_participants
        .is_some_and(|max| max < current.registered_count)
    {
        return Err(AppError::bad_request(format!(
            "{} people are already registered",
            current.registered_count
        )));
    }

    let role_id = organizer_role_id(&tx, fields).await?;
    let status = fields.status.unwrap_or(current.status);
    queries::event::update(&tx, id, fields, status, role_id).await?;
    let event = queries::event::get(&tx, id)
        .await?
        .ok_or(AppError::NotFound("event"))?;
    tx.commit().await?;

    Ok(event)
}

pub async fn delete(pool: &Pool, id: Uuid) -> Result<()> {
    let client = pool.get().await?;
    if queries::event::delete(&client, id).await? == 0 {
        return Err(AppError::NotFound("event"));
    }

    Ok(())
}

pub async fn registrations(pool: &Pool, id: Uuid) -> Result<Vec<EventRegistration>> {
    let client = pool.get().await?;
    if queries::event::get(&client, id).await?.is_none() {
        return Err(AppError::NotFound("event"));
    }

    Ok(queries::event_registration::list_for_event(&client, id).await?)
}

#[tracing::instrument(skip(pool, principal), fields(user = %principal.id), err)]
pub async fn register(
    pool: &Pool,
    principal: &Principal,
    event_id: Uuid,
    request: &RegistrationRequest,
    now: DateTime<Utc>,
) -> Result<EventRegistration> {
    let duplicate = || AppError::bad_request("already registered for this event");

    let mut client = pool.get().await?;
    let tx = client.transaction().await?;

    let event = queries::event::lock(&tx, event_id)
        .await?
        .ok_or(AppError::NotFound("event"))?;
    check_open(&event, now)?;
    if queries::event_registration::exists(&tx, event_id, principal.id).await? {
        return Err(duplicate());
    }

    let registrant = Registrant {
        user_id: principal.id,
        name: request.name.as_deref().unwrap_or(&principal.name),
        email: request.email.as_deref().unwrap_or(&principal.email),
        phone: request.phone.as_deref(),
    };
    let registration = queries::event_registration::insert(&tx, event_id, &registrant)
        .await
        .map_err(|error| {
            if is_unique_violation(&error) {
                duplicate()
            } else {
                error.into()
            }
        })?;
    if !queries::event::increment_registered(&tx, event_id).await? {
        return Err(AppError::bad_request("event is at capacity"));
    }
    tx.commit().await?;

    tracing::info!(event = %event_id, "registered for event");
    Ok(registration)
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone};

    use super::*;

    fn event(status: EventStatus, max: Option<i32>, registered: i32) -> Event {
        Event {
            id: Uuid::new_v4(),
            title: "Hackathon".to_string(),
            description: String::new(),
            event_type: "competition".to_string(),
            status,
            start_date: "2025-10-01".parse().unwrap(),
            end_date: "2025-10-02".parse().unwrap(),
            venue: "Auditorium".to_string(),
            organizer_role_id: None,
            organizer_role: None,
            registration_required: true,
            max_participants: max,
            registered_count: registered,
            registration_deadline: None,
            tags: Vec::new(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn registration_requires_open_status() {
        let now = Utc::now();

        assert!(check_open(&event(EventStatus::RegistrationOpen, None, 0), now).is_ok());
        assert!(check_open(&event(EventStatus::Upcoming, None, 0), now).is_err());
        assert!(check_open(&event(EventStatus::RegistrationClosed, None, 0), now).is_err());
    }

    #[test]
    fn open_events_without_registration_skip_the_status_gate() {
        let mut walk_in = event(EventStatus::Ongoing, None, 0);
        walk_in.registration_required = false;

        assert!(check_open(&walk_in, Utc::now()).is_ok());
    }

    #[test]
    fn deadline_is_inclusive() {
        let deadline = Utc.with_ymd_and_hms(2025, 9, 20, 23, 59, 59).unwrap();
        let mut open = event(EventStatus::RegistrationOpen, None, 0);
        open.registration_deadline = Some(deadline);

        assert!(check_open(&open, deadline).is_ok());
        assert!(check_open(&open, deadline + Duration::seconds(1)).is_err());
    }

    #[test]
    fn full_events_refuse_registration() {
        let now = Utc::now();

        assert!(check_open(&event(EventStatus::RegistrationOpen, Some(2), 1), now).is_ok());
        let error = check_open(&event(EventStatus::RegistrationOpen, Some(2), 2), now).unwrap_err();
        assert_eq!(error.to_string(), "event is at capacity");
    }
}
