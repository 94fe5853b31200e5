// src/history/mod.rs

pub mod events;
pub mod schedule;

pub use events::{spawn_recorder, RunEvent, RunEvents};
pub use schedule::{Mode, ScheduleState, ScheduleStore};
