//! SQLite repository implementations.

mod cron;
mod fact;
mod pool;
mod social;
mod turn;
mod usage;

pub use cron::SqliteCronJobRepository;
pub use fact::SqliteFactRepository;
pub use pool::{default_database_url, DatabasePool};
pub use social::SqliteSocialPostRepository;
pub use turn::SqliteTurnRepository;
pub use usage::SqliteUsageRepository;
