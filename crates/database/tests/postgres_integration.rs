//! Integration tests against a throwaway Postgres started with testcontainers.

use chrono::{Duration, NaiveDate, TimeZone, Utc};
use database::{
    deadpool_postgres::Pool,
    is_check_violation, is_unique_violation,
    queries::{
        event::{self, EventFields},
        event_registration::{self, Registrant},
        lab::{self, NewLab},
        lab_booking, role,
        submission::{self, SubmissionDraft},
        user::{self, NewUser, User},
    },
    types::{DayOfWeek, LabBookingStatus, SubmissionStatus, SubmissionType},
};
use testcontainers::{ContainerAsync, ImageExt, runners::AsyncRunner};
use testcontainers_modules::postgres::Postgres;
use timeslot::{Interval, TimeOfDay};

async fn start_database() -> (ContainerAsync<Postgres>, Pool) {
    let container = Postgres::default()
        .with_tag("17")
        .start()
        .await
        .expect("Failed to start Postgres container");

    let host = container.get_host().await.unwrap();
    let port = container.get_host_port_ipv4(5432).await.unwrap();
    let url = format!("postgres://postgres:postgres@{host}:{port}/postgres");

    let pool = database::connect(&url, 4).unwrap();
    database::migrate(&pool).await.unwrap();

    (container, pool)
}

async fn create_user(pool: &Pool, email: &str, role_name: &str) -> User {
    let client = pool.get().await.unwrap();
    let role = role::get_by_name(&client, role_name).await.unwrap().unwrap();

    user::insert(
        &client,
        &NewUser {
            name: email.split('@').next().unwrap(),
            email,
            password_hash: "not-a-real-hash",
            role_id: role.id,
        },
    )
    .await
    .unwrap()
}

#[tokio::test]
async fn migrate_is_idempotent() {
    let (_container, pool) = start_database().await;

    database::migrate(&pool).await.unwrap();

    let client = pool.get().await.unwrap();
    let roles = role::list(&client).await.unwrap();
    let names: Vec<_> = roles.iter().map(|role| role.name.as_str()).collect();
    assert_eq!(names, ["ADMIN", "FACULTY", "STUDENT", "STAFF"]);
}

#[tokio::test]
async fn default_role_permissions() {
    let (_container, pool) = start_database().await;
    let client = pool.get().await.unwrap();

    let student = role::get_by_name(&client, "student").await.unwrap().unwrap();
    let permissions = role::permission_names(&client, student.id).await.unwrap();
    assert!(permissions.iter().any(|name| name == "SUBMIT_ASSIGNMENT"));
    assert!(!permissions.iter().any(|name| name == "MANAGE_ASSIGNMENTS"));

    let admin = role::get_by_name(&client, "ADMIN").await.unwrap().unwrap();
    let permissions = role::permission_names(&client, admin.id).await.unwrap();
    assert_eq!(permissions.len(), 21);
}

#[tokio::test]
async fn duplicate_email_is_a_unique_violation() {
    let (_container, pool) = start_database().await;
    create_user(&pool, "ada@uni.edu", "STUDENT").await;

    let client = pool.get().await.unwrap();
    let student = role::get_by_name(&client, "STUDENT").await.unwrap().unwrap();
    let error = user::insert(
        &client,
        &NewUser {
            name: "Ada again",
            email: "ada@uni.edu",
            password_hash: "x",
            role_id: student.id,
        },
    )
    .await
    .unwrap_err();

    assert!(is_unique_violation(&error));
}

#[tokio::test]
async fn active_lab_booking_is_unique_per_slot_and_date() {
    let (_container, pool) = start_database().await;
    let first = create_user(&pool, "first@uni.edu", "STUDENT").await;
    let second = create_user(&pool, "second@uni.edu", "STUDENT").await;

    let client = pool.get().await.unwrap();
    let lab = lab::insert(
        &client,
        &NewLab {
            name: "Systems Lab".into(),
            location: "Room 301".into(),
            capacity: 30,
            facilities: vec!["projector".into()],
        },
    )
    .await
    .unwrap();
    let interval = Interval::new(
        TimeOfDay::from_hm(9, 0).unwrap(),
        TimeOfDay::from_hm(11, 0).unwrap(),
    )
    .unwrap();
    let slot = lab::insert_time_slot(&client, lab.id, DayOfWeek::Monday, interval)
        .await
        .unwrap();
    let monday = NaiveDate::from_ymd_opt(2031, 6, 2).unwrap();

    let booking = lab_booking::insert(&client, lab.id, first.id, slot.id, monday, None)
        .await
        .unwrap();
    let error = lab_booking::insert(&client, lab.id, second.id, slot.id, monday, None)
        .await
        .unwrap_err();
    assert!(is_unique_violation(&error));

    // a rejected booking frees the slot
    lab_booking::set_status(&client, booking, LabBookingStatus::Rejected, Some("clash"))
        .await
        .unwrap();
    lab_booking::insert(&client, lab.id, second.id, slot.id, monday, Some("lab exam"))
        .await
        .unwrap();

    let taken = lab_booking::taken_slot_ids(&client, lab.id, monday).await.unwrap();
    assert_eq!(taken, [slot.id]);
}

#[tokio::test]
async fn event_registration_respects_capacity_and_uniqueness() {
    let (_container, pool) = start_database().await;
    let ada = create_user(&pool, "ada@uni.edu", "STUDENT").await;
    let alan = create_user(&pool, "alan@uni.edu", "STUDENT").await;

    let client = pool.get().await.unwrap();
    let id = event::insert(
        &client,
        &EventFields {
            title: "Hackathon".into(),
            description: String::new(),
            event_type: "competition".into(),
            status: None,
            start_date: NaiveDate::from_ymd_opt(2031, 3, 1).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2031, 3, 2).unwrap(),
            venue: "Main hall".into(),
            organizer_role: None,
            registration_required: false,
            max_participants: Some(1),
            registration_deadline: None,
            tags: vec![],
        },
        None,
    )
    .await
    .unwrap();

    let registrant = Registrant {
        user_id: ada.id,
        name: &ada.name,
        email: &ada.email,
        phone: None,
    };
    event_registration::insert(&client, id, &registrant).await.unwrap();
    assert!(event::increment_registered(&client, id).await.unwrap());
    assert!(event_registration::exists(&client, id, ada.id).await.unwrap());

    let error = event_registration::insert(&client, id, &registrant)
        .await
        .unwrap_err();
    assert!(is_unique_violation(&error));

    assert!(!event::increment_registered(&client, id).await.unwrap());
    assert!(!event_registration::exists(&client, id, alan.id).await.unwrap());

    let event = event::get(&client, id).await.unwrap().unwrap();
    assert_eq!(event.registered_count, 1);
}

#[tokio::test]
async fn event_dates_are_checked() {
    let (_container, pool) = start_database().await;
    let client = pool.get().await.unwrap();

    let error = event::insert(
        &client,
        &EventFields {
            title: "Backwards".into(),
            description: String::new(),
            event_type: "seminar".into(),
            status: None,
            start_date: NaiveDate::from_ymd_opt(2031, 3, 2).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2031, 3, 1).unwrap(),
            venue: "Room 101".into(),
            organizer_role: None,
            registration_required: true,
            max_participants: None,
            registration_deadline: None,
            tags: vec![],
        },
        None,
    )
    .await
    .unwrap_err();

    assert!(is_check_violation(&error));
}

#[tokio::test]
async fn resubmission_keeps_the_row_and_clears_the_grade() {
    let (_container, pool) = start_database().await;
    let faculty = create_user(&pool, "grace@uni.edu", "FACULTY").await;
    let student = create_user(&pool, "ada@uni.edu", "STUDENT").await;
    let deadline = Utc.with_ymd_and_hms(2031, 5, 1, 23, 59, 0).unwrap();

    let client = pool.get().await.unwrap();
    let assignment = client
        .query_one(
            "INSERT INTO assignments (title, course_code, course_title, deadline, description, \
             submission_type, faculty_id) \
             VALUES ('Lab 1', 'CSE101', 'Intro', $1, 'Write a parser', 'text', $2) RETURNING id",
            &[&deadline, &faculty.id],
        )
        .await
        .unwrap()
        .get::<_, uuid::Uuid>(0);

    let mut draft = SubmissionDraft {
        assignment_id: assignment,
        student_id: student.id,
        content: "first attempt",
        submission_type: SubmissionType::Text,
        submitted_at: deadline - Duration::hours(1),
        status: SubmissionStatus::Submitted,
    };
    let id = submission::upsert(&client, &draft).await.unwrap();
    submission::grade(&client, id, 71.5, Some("fine"), deadline)
        .await
        .unwrap();

    let graded = submission::get(&client, id).await.unwrap().unwrap();
    assert_eq!(graded.status, SubmissionStatus::Graded);
    assert_eq!(graded.grade, Some(71.5));

    draft.content = "second attempt";
    draft.submitted_at = deadline + Duration::minutes(5);
    draft.status = SubmissionStatus::Late;
    assert_eq!(submission::upsert(&client, &draft).await.unwrap(), id);

    let resubmitted = submission::get(&client, id).await.unwrap().unwrap();
    assert_eq!(resubmitted.content, "second attempt");
    assert_eq!(resubmitted.status, SubmissionStatus::Late);
    assert_eq!(resubmitted.grade, None);
    assert_eq!(resubmitted.feedback, None);

    let listed = submission::list_for_student(&client, student.id).await.unwrap();
    assert_eq!(listed.len(), 1);
}
