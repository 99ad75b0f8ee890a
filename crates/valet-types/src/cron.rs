//! Cron job types.
//!
//! A `CronJob` is a durable named schedule that injects a message into the
//! agent pipeline each time it fires. The schedule expression is stored as
//! given; validation and timer arming happen in the scheduler.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A durable scheduled message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CronJob {
    pub id: Uuid,
    /// Unique human-chosen name, e.g. "morning-greeting".
    pub name: String,
    /// Cron expression as given by the caller.
    pub schedule: String,
    /// The message synthesized into the pipeline on each fire.
    pub message: String,
    /// Profile the synthesized message runs under.
    pub profile: String,
    pub enabled: bool,
    pub last_run: Option<DateTime<Utc>>,
}

/// Parameters for creating a cron job.
#[derive(Debug, Clone)]
pub struct NewCronJob {
    pub name: String,
    pub schedule: String,
    pub message: String,
    pub profile: String,
}
