pub mod assignment;
pub mod course;
pub mod equipment;
pub mod equipment_booking;
pub mod event;
pub mod event_registration;
pub mod faculty;
pub mod lab;
pub mod lab_booking;
pub mod meeting;
pub mod program;
pub mod role;
pub mod schedule;
pub mod session;
pub mod submission;
pub mod user;
