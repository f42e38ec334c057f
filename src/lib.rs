//! Suite scheduling engine: overlap-validated bookings with derived
//! cleanup slots, time-driven lifecycle reconciliation and schedule
//! compaction, durable through an append-only event WAL.

pub mod clock;
pub mod engine;
pub mod limits;
pub mod model;
pub mod observability;
pub mod reconciler;
pub mod store;
pub mod wal;

pub use clock::{SystemClock, TimeSource};
pub use engine::{Scheduler, SchedulerError};
pub use model::{Booking, BookingState, ProcedureType, Suite};
pub use store::{BookingStore, MemoryStore};
