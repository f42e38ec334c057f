use ulid::Ulid;

#[derive(Debug)]
pub enum SchedulerError {
    /// Rejected input: missing referenced entity or out-of-range field.
    Validation(&'static str),
    /// The candidate window overlaps an existing booking's occupancy.
    Conflict { with: Ulid },
    NotFound(Ulid),
    LimitExceeded(&'static str),
    Wal(String),
}

impl std::fmt::Display for SchedulerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SchedulerError::Validation(msg) => write!(f, "validation failed: {msg}"),
            SchedulerError::Conflict { with } => {
                write!(f, "suite already occupied in that window by booking {with}")
            }
            SchedulerError::NotFound(id) => write!(f, "not found: {id}"),
            SchedulerError::LimitExceeded(msg) => write!(f, "limit exceeded: {msg}"),
            SchedulerError::Wal(e) => write!(f, "WAL error: {e}"),
        }
    }
}

impl std::error::Error for SchedulerError {}
