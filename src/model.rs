use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};
use ulid::Ulid;

/// Half-open occupancy window `[start, end)` in civil time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

impl TimeWindow {
    pub fn new(start: NaiveDateTime, end: NaiveDateTime) -> Self {
        debug_assert!(start < end, "TimeWindow start must be before end");
        Self { start, end }
    }

    pub fn duration_min(&self) -> i64 {
        (self.end - self.start).num_minutes()
    }

    /// Windows that merely touch at a boundary do not overlap.
    pub fn overlaps(&self, other: &TimeWindow) -> bool {
        self.start < other.end && other.start < self.end
    }

    #[allow(dead_code)]
    pub fn contains_instant(&self, t: NaiveDateTime) -> bool {
        self.start <= t && t < self.end
    }
}

/// Lifecycle state of a booking.
///
/// `InCleanup` is only reachable by cleanup bookings, `InProgress` and
/// `Complicated` only by primaries. `Finished` and `Cancelled` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BookingState {
    Scheduled,
    InProgress,
    InCleanup,
    Complicated,
    Finished,
    Cancelled,
}

/// States the reconciler scans; everything else is inert.
pub const ACTIVE_STATES: [BookingState; 4] = [
    BookingState::Scheduled,
    BookingState::InProgress,
    BookingState::InCleanup,
    BookingState::Complicated,
];

impl BookingState {
    pub fn is_active(self) -> bool {
        ACTIVE_STATES.contains(&self)
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, BookingState::Finished | BookingState::Cancelled)
    }

    /// Position in the forward transition order. Used to reject regressions
    /// on explicit state changes; `Cancelled` sits outside the order.
    pub(crate) fn rank(self) -> u8 {
        match self {
            BookingState::Scheduled => 0,
            BookingState::InProgress | BookingState::InCleanup => 1,
            BookingState::Complicated => 2,
            BookingState::Finished => 3,
            BookingState::Cancelled => 4,
        }
    }
}

/// A scheduled occupation of a suite: either a primary booking (a surgery)
/// or the auto-generated trailing cleanup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Booking {
    pub id: Ulid,
    pub suite_id: Ulid,
    pub date: NaiveDate,
    pub start_time: NaiveTime,
    /// Planned duration in minutes, excluding overtime. Always positive.
    pub base_duration_min: i64,
    /// Minutes consumed beyond the base duration. Never negative.
    pub overtime_min: i64,
    pub state: BookingState,
    pub is_cleanup: bool,
    /// For cleanup bookings, the primary booking this one trails.
    pub parent_id: Option<Ulid>,
    pub patient_id: Option<Ulid>,
    pub surgeon_id: Option<Ulid>,
    pub procedure_type_id: Option<Ulid>,
}

impl Booking {
    pub fn start_instant(&self) -> NaiveDateTime {
        self.date.and_time(self.start_time)
    }

    /// End of the planned slot, ignoring overtime.
    pub fn end_instant_base(&self) -> NaiveDateTime {
        self.start_instant() + Duration::minutes(self.base_duration_min)
    }

    /// Actual end of occupancy, overtime included.
    pub fn end_instant_full(&self) -> NaiveDateTime {
        self.start_instant() + Duration::minutes(self.base_duration_min + self.overtime_min)
    }

    pub fn window(&self) -> TimeWindow {
        TimeWindow::new(self.start_instant(), self.end_instant_full())
    }
}

/// A physical suite. Exclusive-use per time window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Suite {
    pub id: Ulid,
    pub name: String,
}

/// Catalog entry supplying a default duration for bookings that omit one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcedureType {
    pub id: Ulid,
    pub name: String,
    pub default_duration_min: i64,
}

/// The store's WAL record format — flat, no nesting.
///
/// `BookingSaved` is an upsert carrying the full record, so replay is a
/// straight fold over the log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Event {
    SuiteRegistered { suite: Suite },
    ProcedureTypeRegistered { procedure_type: ProcedureType },
    BookingSaved { booking: Booking },
    BookingDeleted { id: Ulid },
}

// ── Query result types ───────────────────────────────────────────

/// A booking plus its derived end instants, as handed to callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BookingView {
    pub id: Ulid,
    pub suite_id: Ulid,
    pub date: NaiveDate,
    pub start_time: NaiveTime,
    pub base_duration_min: i64,
    pub overtime_min: i64,
    pub state: BookingState,
    pub is_cleanup: bool,
    pub parent_id: Option<Ulid>,
    pub patient_id: Option<Ulid>,
    pub surgeon_id: Option<Ulid>,
    pub procedure_type_id: Option<Ulid>,
    pub end_instant_base: NaiveDateTime,
    pub end_instant_full: NaiveDateTime,
}

impl From<&Booking> for BookingView {
    fn from(b: &Booking) -> Self {
        Self {
            id: b.id,
            suite_id: b.suite_id,
            date: b.date,
            start_time: b.start_time,
            base_duration_min: b.base_duration_min,
            overtime_min: b.overtime_min,
            state: b.state,
            is_cleanup: b.is_cleanup,
            parent_id: b.parent_id,
            patient_id: b.patient_id,
            surgeon_id: b.surgeon_id,
            procedure_type_id: b.procedure_type_id,
            end_instant_base: b.end_instant_base(),
            end_instant_full: b.end_instant_full(),
        }
    }
}

/// One day of the board, condensed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DaySummary {
    pub date: NaiveDate,
    /// Primary bookings on the date, any state.
    pub total: usize,
    /// Primaries currently `InProgress` or `Complicated`.
    pub in_execution: usize,
    /// Primaries currently `Complicated`.
    pub delayed: usize,
    /// Cleanup bookings currently `InCleanup`.
    pub cleanups_active: usize,
    /// Next scheduled primaries not yet started, ordered by start.
    pub upcoming: Vec<BookingView>,
}
