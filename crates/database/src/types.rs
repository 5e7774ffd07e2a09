//! Label enums shared by rows and request bodies.
//!
//! Every enum is a Postgres enum type on the storage side. On the wire the
//! canonical label is emitted, and any casing or separator style of it is
//! accepted (`registration_open`, `REGISTRATION_OPEN`, `RegistrationOpen`).

use std::{fmt, str::FromStr};

use chrono::Weekday;
use postgres_types::{FromSql, ToSql};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind} `{value}`")]
pub struct UnknownLabel {
    pub kind: &'static str,
    pub value: String,
}

fn fold_label(label: &str) -> String {
    label
        .chars()
        .filter(char::is_ascii_alphanumeric)
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

macro_rules! label_enum {
    (
        $(#[$meta:meta])*
        pub enum $name:ident as $pg:tt {
            $($variant:ident => $label:tt),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, ToSql, FromSql)]
        #[postgres(name = $pg)]
        pub enum $name {
            $(
                #[postgres(name = $label)]
                $variant,
            )+
        }

        label_enum!(@labels $name { $($variant => $label),+ });
    };

    (
        $(#[$meta:meta])*
        pub enum $name:ident {
            $($variant:ident => $label:tt),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub enum $name {
            $($variant,)+
        }

        label_enum!(@labels $name { $($variant => $label),+ });
    };

    (@labels $name:ident { $($variant:ident => $label:tt),+ }) => {
        impl $name {
            pub const ALL: &'static [Self] = &[$(Self::$variant),+];

            pub const fn as_str(self) -> &'static str {
                match self {
                    $(Self::$variant => $label,)+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = UnknownLabel;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let wanted = fold_label(s);
                Self::ALL
                    .iter()
                    .copied()
                    .find(|candidate| fold_label(candidate.as_str()) == wanted)
                    .ok_or_else(|| UnknownLabel {
                        kind: stringify!($name),
                        value: s.to_string(),
                    })
            }
        }

        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(self.as_str())
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let raw = String::deserialize(deserializer)?;
                raw.parse().map_err(serde::de::Error::custom)
            }
        }
    };
}

label_enum! {
    /// Named capability checked by route guards.
    pub enum Permission {
        ListAllUsers => "LIST_ALL_USERS",
        CreateUser => "CREATE_USER",
        ManageAdmissions => "MANAGE_ADMISSIONS",
        ManageAwards => "MANAGE_AWARDS",
        ManageEvents => "MANAGE_EVENTS",
        RegisterEvent => "REGISTER_EVENT",
        ViewEvents => "VIEW_EVENTS",
        ManageEquipment => "MANAGE_EQUIPMENT",
        BookEquipment => "BOOK_EQUIPMENT",
        ApproveEquipmentBooking => "APPROVE_EQUIPMENT_BOOKING",
        ViewEquipmentBookings => "VIEW_EQUIPMENT_BOOKINGS",
        ManageCoursePrograms => "MANAGE_COURSE_PROGRAMS",
        ViewCourses => "VIEW_COURSES",
        ManageProjects => "MANAGE_PROJECTS",
        ManageNotices => "MANAGE_NOTICES",
        ManageAssignments => "MANAGE_ASSIGNMENTS",
        SubmitAssignment => "SUBMIT_ASSIGNMENT",
        BookLab => "BOOK_LAB",
        CreateLab => "CREATE_LAB",
        ApproveLabBooking => "APPROVE_LAB_BOOKING",
        ManageFaculty => "MANAGE_FACULTY",
    }
}

label_enum! {
    pub enum Designation as "designation" {
        Professor => "Professor",
        AssociateProfessor => "Associate Professor",
        AssistantProfessor => "Assistant Professor",
        Lecturer => "Lecturer",
    }
}

label_enum! {
    pub enum ProgramLevel as "program_level" {
        Undergraduate => "Undergraduate",
        Graduate => "Graduate",
        Postgraduate => "Postgraduate",
    }
}

label_enum! {
    pub enum CourseDifficulty as "course_difficulty" {
        Beginner => "Beginner",
        Intermediate => "Intermediate",
        Advanced => "Advanced",
    }
}

label_enum! {
    pub enum ClassType as "class_type" {
        Lecture => "Lecture",
        Lab => "Lab",
        Tutorial => "Tutorial",
    }
}

label_enum! {
    pub enum ClassStatus as "class_status" {
        InProgress => "InProgress",
        Upcoming => "Upcoming",
        Completed => "Completed",
        Cancelled => "Cancelled",
    }
}

label_enum! {
    pub enum DayOfWeek as "day_of_week" {
        Monday => "Monday",
        Tuesday => "Tuesday",
        Wednesday => "Wednesday",
        Thursday => "Thursday",
        Friday => "Friday",
        Saturday => "Saturday",
        Sunday => "Sunday",
    }
}

impl From<Weekday> for DayOfWeek {
    fn from(day: Weekday) -> Self {
        match day {
            Weekday::Mon => Self::Monday,
            Weekday::Tue => Self::Tuesday,
            Weekday::Wed => Self::Wednesday,
            Weekday::Thu => Self::Thursday,
            Weekday::Fri => Self::Friday,
            Weekday::Sat => Self::Saturday,
            Weekday::Sun => Self::Sunday,
        }
    }
}

label_enum! {
    pub enum LabBookingStatus as "lab_booking_status" {
        Pending => "pending",
        Approved => "approved",
        Rejected => "rejected",
    }
}

label_enum! {
    pub enum EquipmentBookingStatus as "equipment_booking_status" {
        Pending => "pending",
        Approved => "approved",
        Rejected => "rejected",
        Completed => "completed",
    }
}

label_enum! {
    pub enum MeetingType as "meeting_type" {
        Advising => "advising",
        Thesis => "thesis",
        Project => "project",
        General => "general",
        Other => "other",
    }
}

label_enum! {
    pub enum MeetingStatus as "meeting_status" {
        Scheduled => "scheduled",
        Confirmed => "confirmed",
        Cancelled => "cancelled",
        Completed => "completed",
    }
}

label_enum! {
    pub enum RsvpStatus as "rsvp_status" {
        Pending => "pending",
        Confirmed => "confirmed",
        Tentative => "tentative",
        Declined => "declined",
    }
}

label_enum! {
    pub enum SubmissionType as "submission_type" {
        File => "file",
        Link => "link",
        Text => "text",
    }
}

label_enum! {
    pub enum AssignmentStatus as "assignment_status" {
        Active => "active",
        Past => "past",
        Draft => "draft",
    }
}

label_enum! {
    pub enum SubmissionStatus as "submission_status" {
        Submitted => "submitted",
        Late => "late",
        Graded => "graded",
    }
}

label_enum! {
    pub enum EventStatus as "event_status" {
        Upcoming => "upcoming",
        Ongoing => "ongoing",
        RegistrationOpen => "registration_open",
        RegistrationClosed => "registration_closed",
        Completed => "completed",
    }
}

/// File or link attached to an assignment, stored in a JSONB column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    pub name: String,
    pub url: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_parse_in_any_case() {
        assert_eq!(
            "registration_open".parse::<EventStatus>(),
            Ok(EventStatus::RegistrationOpen)
        );
        assert_eq!(
            "REGISTRATION_OPEN".parse::<EventStatus>(),
            Ok(EventStatus::RegistrationOpen)
        );
        assert_eq!(
            "RegistrationOpen".parse::<EventStatus>(),
            Ok(EventStatus::RegistrationOpen)
        );
        assert_eq!("in_progress".parse::<ClassStatus>(), Ok(ClassStatus::InProgress));
        assert_eq!(
            "associate professor".parse::<Designation>(),
            Ok(Designation::AssociateProfessor)
        );
        assert_eq!("book_lab".parse::<Permission>(), Ok(Permission::BookLab));
    }

    #[test]
    fn unknown_labels_name_the_kind() {
        let error = "maybe".parse::<RsvpStatus>().unwrap_err();
        assert_eq!(error.to_string(), "unknown RsvpStatus `maybe`");
    }

    #[test]
    fn serde_emits_canonical_label() {
        assert_eq!(
            serde_json::to_string(&EventStatus::RegistrationClosed).unwrap(),
            r#""registration_closed""#
        );
        let status: LabBookingStatus = serde_json::from_str(r#""APPROVED""#).unwrap();
        assert_eq!(status, LabBookingStatus::Approved);
        assert!(serde_json::from_str::<MeetingType>(r#""party""#).is_err());
    }

    #[test]
    fn every_permission_label_round_trips() {
        for permission in Permission::ALL {
            assert_eq!(permission.as_str().parse::<Permission>(), Ok(*permission));
        }
    }

    #[test]
    fn weekdays_map_to_days() {
        let date = chrono::NaiveDate::from_ymd_opt(2025, 9, 8).unwrap();
        assert_eq!(DayOfWeek::from(chrono::Datelike::weekday(&date)), DayOfWeek::Monday);
    }
}
