use std::io;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use chrono::NaiveDate;
use dashmap::DashMap;
use tokio::sync::{mpsc, oneshot};
use ulid::Ulid;

use crate::engine::SchedulerError;
use crate::limits::MAX_NAME_LEN;
use crate::model::{Booking, BookingState, Event, ProcedureType, Suite};
use crate::wal::Wal;

/// Data access consumed by the scheduling engine.
///
/// The engine never touches storage directly; everything goes through this
/// trait so the core stays independent of the persistence mechanics.
#[async_trait]
pub trait BookingStore: Send + Sync {
    async fn find_bookings(
        &self,
        suite_id: Option<Ulid>,
        date: Option<NaiveDate>,
        states: Option<&[BookingState]>,
    ) -> Result<Vec<Booking>, SchedulerError>;

    async fn find_booking(&self, id: Ulid) -> Result<Option<Booking>, SchedulerError>;

    /// Look up the cleanup booking linked to a primary via `parent_id`.
    async fn find_child(&self, parent_id: Ulid) -> Result<Option<Booking>, SchedulerError>;

    /// Insert or update.
    async fn save(&self, booking: Booking) -> Result<Booking, SchedulerError>;

    /// Hard delete. Returns whether the record existed.
    async fn delete(&self, id: Ulid) -> Result<bool, SchedulerError>;

    async fn find_suite(&self, id: Ulid) -> Result<Option<Suite>, SchedulerError>;

    async fn find_procedure_type(&self, id: Ulid)
        -> Result<Option<ProcedureType>, SchedulerError>;
}

// ── Group-commit WAL channel ─────────────────────────────

enum WalCommand {
    Append {
        event: Event,
        ack: oneshot::Sender<io::Result<()>>,
    },
    Rewrite {
        events: Vec<Event>,
        ack: oneshot::Sender<io::Result<()>>,
    },
}

/// Background task that owns the WAL and batches appends for group commit:
/// block on the first append, drain whatever else is immediately queued,
/// then a single flush + fsync for the whole batch.
async fn wal_writer_loop(mut wal: Wal, mut rx: mpsc::Receiver<WalCommand>) {
    while let Some(cmd) = rx.recv().await {
        match cmd {
            WalCommand::Append { event, ack } => {
                let mut batch = vec![(event, ack)];
                let mut follow_up = None;
                loop {
                    match rx.try_recv() {
                        Ok(WalCommand::Append { event, ack }) => batch.push((event, ack)),
                        Ok(other) => {
                            follow_up = Some(other);
                            break;
                        }
                        Err(_) => break, // channel empty — flush batch
                    }
                }
                flush_batch(&mut wal, batch);
                if let Some(WalCommand::Rewrite { events, ack }) = follow_up {
                    let _ = ack.send(wal.rewrite(&events));
                }
            }
            WalCommand::Rewrite { events, ack } => {
                let _ = ack.send(wal.rewrite(&events));
            }
        }
    }
}

fn flush_batch(wal: &mut Wal, batch: Vec<(Event, oneshot::Sender<io::Result<()>>)>) {
    metrics::histogram!(crate::observability::WAL_FLUSH_BATCH_SIZE).record(batch.len() as f64);
    let started = std::time::Instant::now();

    let mut append_err: Option<io::Error> = None;
    for (event, _) in &batch {
        if let Err(e) = wal.append_buffered(event) {
            append_err = Some(e);
            break;
        }
    }
    // Always flush so partially buffered bytes don't leak into the next
    // batch (callers were told this batch failed).
    let flush_err = wal.flush_sync().err();
    let failure = append_err.or(flush_err);

    metrics::histogram!(crate::observability::WAL_FLUSH_DURATION_SECONDS)
        .record(started.elapsed().as_secs_f64());

    for (_, ack) in batch {
        let r = match &failure {
            None => Ok(()),
            Some(e) => Err(io::Error::new(e.kind(), e.to_string())),
        };
        let _ = ack.send(r);
    }
}

/// In-memory booking store, durable through the event WAL.
///
/// Every mutation appends one event through the group-commit writer before
/// the maps are touched; `open` replays the log to rebuild them.
pub struct MemoryStore {
    bookings: DashMap<Ulid, Booking>,
    suites: DashMap<Ulid, Suite>,
    procedure_types: DashMap<Ulid, ProcedureType>,
    /// Primary booking id → its cleanup's id.
    children: DashMap<Ulid, Ulid>,
    wal_tx: mpsc::Sender<WalCommand>,
    appends_since_rewrite: AtomicU64,
}

impl MemoryStore {
    /// Replay the WAL at `path` and start the background writer.
    /// Must be called from within a tokio runtime.
    pub fn open(path: &Path) -> io::Result<Self> {
        let events = Wal::replay(path)?;
        let wal = Wal::open(path)?;
        let (wal_tx, wal_rx) = mpsc::channel(4096);
        tokio::spawn(wal_writer_loop(wal, wal_rx));

        let store = Self {
            bookings: DashMap::new(),
            suites: DashMap::new(),
            procedure_types: DashMap::new(),
            children: DashMap::new(),
            wal_tx,
            appends_since_rewrite: AtomicU64::new(0),
        };
        for event in &events {
            store.apply(event);
        }
        Ok(store)
    }

    fn apply(&self, event: &Event) {
        match event {
            Event::SuiteRegistered { suite } => {
                self.suites.insert(suite.id, suite.clone());
            }
            Event::ProcedureTypeRegistered { procedure_type } => {
                self.procedure_types
                    .insert(procedure_type.id, procedure_type.clone());
            }
            Event::BookingSaved { booking } => {
                if let Some(parent) = booking.parent_id {
                    self.children.insert(parent, booking.id);
                }
                self.bookings.insert(booking.id, booking.clone());
            }
            Event::BookingDeleted { id } => {
                if let Some((_, gone)) = self.bookings.remove(id) {
                    if let Some(parent) = gone.parent_id {
                        self.children.remove(&parent);
                    }
                    // A deleted primary leaves no child mapping behind.
                    self.children.remove(id);
                }
            }
        }
    }

    /// Write one event through the background group-commit writer.
    async fn append(&self, event: &Event) -> Result<(), SchedulerError> {
        let (tx, rx) = oneshot::channel();
        self.wal_tx
            .send(WalCommand::Append {
                event: event.clone(),
                ack: tx,
            })
            .await
            .map_err(|_| SchedulerError::Wal("WAL writer shut down".into()))?;
        rx.await
            .map_err(|_| SchedulerError::Wal("WAL writer dropped response".into()))?
            .map_err(|e| SchedulerError::Wal(e.to_string()))?;
        self.appends_since_rewrite.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    pub async fn register_suite(&self, suite: Suite) -> Result<(), SchedulerError> {
        if suite.name.len() > MAX_NAME_LEN {
            return Err(SchedulerError::LimitExceeded("suite name too long"));
        }
        let event = Event::SuiteRegistered { suite };
        self.append(&event).await?;
        self.apply(&event);
        Ok(())
    }

    pub async fn register_procedure_type(
        &self,
        procedure_type: ProcedureType,
    ) -> Result<(), SchedulerError> {
        if procedure_type.name.len() > MAX_NAME_LEN {
            return Err(SchedulerError::LimitExceeded("procedure type name too long"));
        }
        if procedure_type.default_duration_min <= 0 {
            return Err(SchedulerError::Validation(
                "procedure type default duration must be positive",
            ));
        }
        let event = Event::ProcedureTypeRegistered { procedure_type };
        self.append(&event).await?;
        self.apply(&event);
        Ok(())
    }

    /// Appends accepted since the log was last rewritten.
    pub fn appends_since_rewrite(&self) -> u64 {
        self.appends_since_rewrite.load(Ordering::Relaxed)
    }

    /// Rewrite the WAL with only the events needed to recreate current state.
    pub async fn compact_wal(&self) -> Result<(), SchedulerError> {
        let mut events = Vec::new();
        for entry in self.suites.iter() {
            events.push(Event::SuiteRegistered {
                suite: entry.value().clone(),
            });
        }
        for entry in self.procedure_types.iter() {
            events.push(Event::ProcedureTypeRegistered {
                procedure_type: entry.value().clone(),
            });
        }
        for entry in self.bookings.iter() {
            events.push(Event::BookingSaved {
                booking: entry.value().clone(),
            });
        }

        let (tx, rx) = oneshot::channel();
        self.wal_tx
            .send(WalCommand::Rewrite { events, ack: tx })
            .await
            .map_err(|_| SchedulerError::Wal("WAL writer shut down".into()))?;
        rx.await
            .map_err(|_| SchedulerError::Wal("WAL writer dropped response".into()))?
            .map_err(|e| SchedulerError::Wal(e.to_string()))?;
        self.appends_since_rewrite.store(0, Ordering::Relaxed);
        Ok(())
    }
}

#[async_trait]
impl BookingStore for MemoryStore {
    async fn find_bookings(
        &self,
        suite_id: Option<Ulid>,
        date: Option<NaiveDate>,
        states: Option<&[BookingState]>,
    ) -> Result<Vec<Booking>, SchedulerError> {
        Ok(self
            .bookings
            .iter()
            .filter(|e| suite_id.is_none_or(|s| e.value().suite_id == s))
            .filter(|e| date.is_none_or(|d| e.value().date == d))
            .filter(|e| states.is_none_or(|ss| ss.contains(&e.value().state)))
            .map(|e| e.value().clone())
            .collect())
    }

    async fn find_booking(&self, id: Ulid) -> Result<Option<Booking>, SchedulerError> {
        Ok(self.bookings.get(&id).map(|e| e.value().clone()))
    }

    async fn find_child(&self, parent_id: Ulid) -> Result<Option<Booking>, SchedulerError> {
        let child_id = match self.children.get(&parent_id) {
            Some(e) => *e.value(),
            None => return Ok(None),
        };
        Ok(self.bookings.get(&child_id).map(|e| e.value().clone()))
    }

    async fn save(&self, booking: Booking) -> Result<Booking, SchedulerError> {
        let event = Event::BookingSaved {
            booking: booking.clone(),
        };
        self.append(&event).await?;
        self.apply(&event);
        Ok(booking)
    }

    async fn delete(&self, id: Ulid) -> Result<bool, SchedulerError> {
        if !self.bookings.contains_key(&id) {
            return Ok(false);
        }
        let event = Event::BookingDeleted { id };
        self.append(&event).await?;
        self.apply(&event);
        Ok(true)
    }

    async fn find_suite(&self, id: Ulid) -> Result<Option<Suite>, SchedulerError> {
        Ok(self.suites.get(&id).map(|e| e.value().clone()))
    }

    async fn find_procedure_type(
        &self,
        id: Ulid,
    ) -> Result<Option<ProcedureType>, SchedulerError> {
        Ok(self.procedure_types.get(&id).map(|e| e.value().clone()))
    }
}
