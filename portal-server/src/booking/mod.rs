//! Booking engine for labs, equipment and faculty meetings.
//!
//! Every state change runs in one transaction that locks the contended key
//! first (time slot, equipment row, faculty-day), re-reads the predicate and
//! only then writes. Unique indexes in the schema back up the lab and event
//! invariants.

pub mod equipment;
pub mod lab;
pub mod meeting;
