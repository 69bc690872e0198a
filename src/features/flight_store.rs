//! Persistent flight record store.
//!
//! Records are written once per `(airline_code, flight_number,
//! departure_date)` and never updated. The `UNIQUE` constraint makes the key
//! invariant hold at the store boundary even when two lookups race past the
//! cache check: the second insert is ignored and the caller gets the row that
//! won.

use anyhow::{anyhow, Context, Result};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;
use std::sync::Mutex;
use tracing::{info, warn};

use crate::core::types::{FlightRecord, LookupKey};

/// Find-by-key and insert; all the lookup path needs from persistence.
pub trait FlightStore: Send + Sync {
    fn find(&self, key: &LookupKey) -> Result<Option<FlightRecord>>;

    /// Insert `record` unless its key is already stored. Returns the stored
    /// row (with `id`) in both cases.
    fn insert(&self, record: &FlightRecord) -> Result<FlightRecord>;
}

const SCHEMA: &str = "CREATE TABLE IF NOT EXISTS flights (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    airline_code TEXT NOT NULL,
    flight_number TEXT NOT NULL,
    departure_date TEXT NOT NULL,
    origin TEXT NOT NULL DEFAULT '',
    destination TEXT NOT NULL DEFAULT '',
    scheduled_departure_time TEXT NOT NULL DEFAULT '',
    actual_departure_time TEXT NOT NULL DEFAULT '',
    scheduled_arrival_time TEXT NOT NULL DEFAULT '',
    actual_arrival_time TEXT NOT NULL DEFAULT '',
    status TEXT NOT NULL DEFAULT '',
    duration TEXT NOT NULL DEFAULT '',
    codeshare_airline TEXT NOT NULL DEFAULT '',
    codeshare_flight_number TEXT NOT NULL DEFAULT '',
    aircraft_code TEXT NOT NULL DEFAULT '',
    aircraft_type TEXT NOT NULL DEFAULT '',
    created_at TEXT DEFAULT CURRENT_TIMESTAMP,
    UNIQUE (airline_code, flight_number, departure_date)
);";

const COLUMNS: &str = "id, airline_code, flight_number, departure_date, origin, destination,
    scheduled_departure_time, actual_departure_time, scheduled_arrival_time,
    actual_arrival_time, status, duration, codeshare_airline,
    codeshare_flight_number, aircraft_code, aircraft_type";

/// SQLite-backed store. `departure_date` is a `YYYY-MM-DD` TEXT column.
pub struct SqliteFlightStore {
    db: Mutex<Connection>,
}

impl std::fmt::Debug for SqliteFlightStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteFlightStore").finish_non_exhaustive()
    }
}

impl SqliteFlightStore {
    /// Open or create the store at `path`, creating parent directories.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        let db = Connection::open(path)
            .with_context(|| format!("failed to open flight store: {}", path.display()))?;
        info!("Flight store opened at {}", path.display());
        Self::init(db)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::init(Connection::open_in_memory().context("failed to open in-memory store")?)
    }

    fn init(db: Connection) -> Result<Self> {
        db.execute_batch(SCHEMA)
            .context("failed to create flights table")?;
        Ok(Self { db: Mutex::new(db) })
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>> {
        self.db
            .lock()
            .map_err(|_| anyhow!("flight store lock poisoned"))
    }

    pub fn count_records(&self) -> Result<usize> {
        let db = self.lock()?;
        let n: i64 = db.query_row("SELECT COUNT(*) FROM flights", [], |row| row.get(0))?;
        Ok(n as usize)
    }
}

fn row_to_record(row: &Row<'_>) -> rusqlite::Result<FlightRecord> {
    Ok(FlightRecord {
        id: row.get(0)?,
        airline_code: row.get(1)?,
        flight_number: row.get(2)?,
        departure_date: row.get(3)?,
        origin: row.get(4)?,
        destination: row.get(5)?,
        scheduled_departure_time: row.get(6)?,
        actual_departure_time: row.get(7)?,
        scheduled_arrival_time: row.get(8)?,
        actual_arrival_time: row.get(9)?,
        status: row.get(10)?,
        duration: row.get(11)?,
        codeshare_airline: row.get(12)?,
        codeshare_flight_number: row.get(13)?,
        aircraft_code: row.get(14)?,
        aircraft_type: row.get(15)?,
    })
}

fn find_locked(db: &Connection, key: &LookupKey) -> Result<Option<FlightRecord>> {
    let sql = format!(
        "SELECT {} FROM flights
         WHERE airline_code = ?1 AND flight_number = ?2 AND departure_date = ?3
         LIMIT 1",
        COLUMNS
    );
    let record = db
        .query_row(
            &sql,
            params![key.airline_code, key.flight_number, key.departure_date],
            row_to_record,
        )
        .optional()?;
    Ok(record)
}

impl FlightStore for SqliteFlightStore {
    fn find(&self, key: &LookupKey) -> Result<Option<FlightRecord>> {
        let db = self.lock()?;
        find_locked(&db, key)
    }

    fn insert(&self, record: &FlightRecord) -> Result<FlightRecord> {
        let db = self.lock()?;
        let inserted = db.execute(
            "INSERT OR IGNORE INTO flights (
                airline_code, flight_number, departure_date, origin, destination,
                scheduled_departure_time, actual_departure_time, scheduled_arrival_time,
                actual_arrival_time, status, duration, codeshare_airline,
                codeshare_flight_number, aircraft_code, aircraft_type
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)",
            params![
                record.airline_code,
                record.flight_number,
                record.departure_date,
                record.origin,
                record.destination,
                record.scheduled_departure_time,
                record.actual_departure_time,
                record.scheduled_arrival_time,
                record.actual_arrival_time,
                record.status,
                record.duration,
                record.codeshare_airline,
                record.codeshare_flight_number,
                record.aircraft_code,
                record.aircraft_type,
            ],
        )?;

        let key = record.key();
        if inserted == 0 {
            warn!("flight store: {} already stored; keeping first record", key);
        }
        find_locked(&db, &key)?
            .ok_or_else(|| anyhow!("record for {} missing right after insert", key))
    }
}
