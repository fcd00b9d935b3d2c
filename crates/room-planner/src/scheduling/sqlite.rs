//! SQLite assignment store.
//!
//! Three tables mirror the planner's lookup data:
//! - `rooms`: room catalog with the building used for scoped listings
//! - `timeslots`: ordered timeslot labels
//! - `final_assignments`: one row per course section
//!
//! Moves run inside a `sqlx` transaction. Writers within one process take
//! the store's write gate before their transaction opens, so a deferred
//! transaction never reads a snapshot that another writer commits over.
//! Across processes SQLite's own writer lock decides; the loser gets a busy
//! error, which surfaces as [`StoreError::Unavailable`] rather than a double
//! booking.

use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use sqlx::sqlite::{
    SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteRow, SqliteSynchronous,
};
use sqlx::{Row, Sqlite, SqlitePool, Transaction};
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{debug, info};

use super::domain::{Assignment, Room, SectionId, TimeslotDefinition};
use super::repository::{
    AssignmentScope, AssignmentStore, AssignmentTransaction, ScheduleUpdate, SlotQuery,
    StoreError,
};

const ASSIGNMENT_COLUMNS: &str = "fa.section_id, fa.room_id, fa.day_code, fa.timeslot, \
     fa.start_time, fa.end_time, fa.department, fa.program_section";

pub struct SqliteAssignmentStore {
    pool: SqlitePool,
    write_gate: Arc<Mutex<()>>,
}

impl SqliteAssignmentStore {
    /// Opens (creating if needed) the database at `url` and applies the schema.
    ///
    /// `sqlite::memory:` gives an ephemeral database; pair it with a single
    /// connection so every query sees the same data.
    pub async fn connect(url: &str, max_connections: u32) -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::from_str(url)
            .map_err(|err| StoreError::Unavailable(format!("invalid SQLite url {url}: {err}")))?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .busy_timeout(Duration::from_secs(5));

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(options)
            .await
            .map_err(|err| StoreError::Unavailable(format!("failed to open SQLite: {err}")))?;

        let store = Self::from_pool(pool).await?;
        info!(url, max_connections, "assignment store ready");
        Ok(store)
    }

    pub async fn from_pool(pool: SqlitePool) -> Result<Self, StoreError> {
        let store = Self {
            pool,
            write_gate: Arc::new(Mutex::new(())),
        };
        store.run_migrations().await?;
        Ok(store)
    }

    async fn run_migrations(&self) -> Result<(), StoreError> {
        let statements = [
            r#"
            CREATE TABLE IF NOT EXISTS rooms (
                room_id    TEXT PRIMARY KEY NOT NULL,
                building   TEXT NOT NULL,
                capacity   INTEGER,
                room_type  TEXT
            )
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS timeslots (
                slot_key   INTEGER PRIMARY KEY NOT NULL,
                timeslot   TEXT NOT NULL UNIQUE
            )
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS final_assignments (
                section_id       TEXT PRIMARY KEY NOT NULL,
                room_id          TEXT NOT NULL,
                day_code         TEXT NOT NULL,
                timeslot         TEXT NOT NULL,
                start_time       TEXT NOT NULL,
                end_time         TEXT NOT NULL,
                department       TEXT NOT NULL DEFAULT '',
                program_section  TEXT NOT NULL DEFAULT '',
                updated_at       TEXT NOT NULL
            )
            "#,
            "CREATE INDEX IF NOT EXISTS idx_final_assignments_slot \
             ON final_assignments(room_id, timeslot)",
            "CREATE INDEX IF NOT EXISTS idx_rooms_building ON rooms(building)",
        ];

        for statement in statements {
            sqlx::query(statement)
                .execute(&self.pool)
                .await
                .map_err(|err| StoreError::Query(format!("migration failed: {err}")))?;
        }

        debug!("SQLite migrations complete");
        Ok(())
    }
}

fn query_error(context: &str) -> impl Fn(sqlx::Error) -> StoreError + '_ {
    move |err| match err {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            StoreError::Duplicate(format!("{context}: {db}"))
        }
        sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
            StoreError::Unavailable(format!("{context}: {err}"))
        }
        sqlx::Error::Database(db) if is_busy(db.code().as_deref()) => {
            StoreError::Unavailable(format!("{context}: {db}"))
        }
        other => StoreError::Query(format!("{context}: {other}")),
    }
}

/// SQLITE_BUSY and its extended codes (`SQLITE_BUSY_SNAPSHOT` = 517, ...).
fn is_busy(code: Option<&str>) -> bool {
    code.and_then(|code| code.parse::<i32>().ok())
        .is_some_and(|code| code & 0xff == 5)
}

fn select_by_section() -> String {
    format!("SELECT {ASSIGNMENT_COLUMNS} FROM final_assignments fa WHERE fa.section_id = ?")
}

fn row_to_assignment(row: &SqliteRow) -> Result<Assignment, StoreError> {
    let column = |name: &str| -> Result<String, StoreError> {
        row.try_get::<String, _>(name)
            .map_err(|err| StoreError::Query(format!("{name} column: {err}")))
    };

    Ok(Assignment {
        section_id: SectionId(column("section_id")?),
        room_id: column("room_id")?,
        day_code: column("day_code")?,
        timeslot: column("timeslot")?,
        start_time: column("start_time")?,
        end_time: column("end_time")?,
        department: column("department")?,
        program_section: column("program_section")?,
    })
}

fn row_to_room(row: &SqliteRow) -> Result<Room, StoreError> {
    let read_error = |err: sqlx::Error| StoreError::Query(format!("rooms row: {err}"));
    let capacity: Option<i64> = row.try_get("capacity").map_err(read_error)?;

    Ok(Room {
        room_id: row.try_get("room_id").map_err(read_error)?,
        building: row.try_get("building").map_err(read_error)?,
        capacity: capacity.and_then(|value| u32::try_from(value).ok()),
        room_type: row.try_get("room_type").map_err(read_error)?,
    })
}

#[async_trait]
impl AssignmentStore for SqliteAssignmentStore {
    async fn begin(&self) -> Result<Box<dyn AssignmentTransaction>, StoreError> {
        let gate = self.write_gate.clone().lock_owned().await;
        let tx = self
            .pool
            .begin()
            .await
            .map_err(query_error("begin transaction"))?;
        Ok(Box::new(SqliteTransaction {
            tx: Some(tx),
            gate: Some(gate),
        }))
    }

    async fn get_assignment(
        &self,
        section_id: &SectionId,
    ) -> Result<Option<Assignment>, StoreError> {
        let sql = select_by_section();
        let row = sqlx::query(&sql)
            .bind(section_id.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(query_error("get assignment"))?;
        row.as_ref().map(row_to_assignment).transpose()
    }

    async fn list_assignments(
        &self,
        scope: &AssignmentScope,
    ) -> Result<Vec<Assignment>, StoreError> {
        let order = "ORDER BY fa.start_time, fa.end_time";
        let rows = match scope {
            AssignmentScope::All => {
                let sql =
                    format!("SELECT {ASSIGNMENT_COLUMNS} FROM final_assignments fa {order}");
                sqlx::query(&sql).fetch_all(&self.pool).await
            }
            AssignmentScope::Building(building) => {
                let sql = format!(
                    "SELECT {ASSIGNMENT_COLUMNS} FROM final_assignments fa \
                     JOIN rooms r ON fa.room_id = r.room_id \
                     WHERE r.building = ? {order}"
                );
                sqlx::query(&sql)
                    .bind(building.as_str())
                    .fetch_all(&self.pool)
                    .await
            }
            AssignmentScope::Room { building, room_id } => {
                let sql = format!(
                    "SELECT {ASSIGNMENT_COLUMNS} FROM final_assignments fa \
                     JOIN rooms r ON fa.room_id = r.room_id \
                     WHERE r.building = ? AND fa.room_id = ? {order}"
                );
                sqlx::query(&sql)
                    .bind(building.as_str())
                    .bind(room_id.as_str())
                    .fetch_all(&self.pool)
                    .await
            }
        }
        .map_err(query_error("list assignments"))?;

        rows.iter().map(row_to_assignment).collect()
    }

    async fn list_rooms(&self, building: &str) -> Result<Vec<Room>, StoreError> {
        let rows = sqlx::query(
            "SELECT room_id, building, capacity, room_type FROM rooms \
             WHERE building = ? ORDER BY room_id",
        )
        .bind(building)
        .fetch_all(&self.pool)
        .await
        .map_err(query_error("list rooms"))?;

        rows.iter().map(row_to_room).collect()
    }

    async fn list_timeslots(&self) -> Result<Vec<TimeslotDefinition>, StoreError> {
        let rows = sqlx::query("SELECT slot_key, timeslot FROM timeslots ORDER BY slot_key ASC")
            .fetch_all(&self.pool)
            .await
            .map_err(query_error("list timeslots"))?;

        rows.iter()
            .map(|row| -> Result<TimeslotDefinition, StoreError> {
                let read_error =
                    |err: sqlx::Error| StoreError::Query(format!("timeslots row: {err}"));
                let key: i64 = row.try_get("slot_key").map_err(read_error)?;
                let key = u32::try_from(key)
                    .map_err(|_| StoreError::Query(format!("timeslot key {key} out of range")))?;
                Ok(TimeslotDefinition {
                    key,
                    timeslot: row.try_get("timeslot").map_err(read_error)?,
                })
            })
            .collect()
    }

    async fn insert_room(&self, room: Room) -> Result<(), StoreError> {
        let _gate = self.write_gate.lock().await;
        sqlx::query(
            "INSERT INTO rooms (room_id, building, capacity, room_type) VALUES (?, ?, ?, ?)",
        )
        .bind(&room.room_id)
        .bind(&room.building)
        .bind(room.capacity.map(i64::from))
        .bind(room.room_type.as_deref())
        .execute(&self.pool)
        .await
        .map_err(query_error("insert room"))?;
        Ok(())
    }

    async fn insert_timeslot(&self, timeslot: TimeslotDefinition) -> Result<(), StoreError> {
        let _gate = self.write_gate.lock().await;
        sqlx::query("INSERT INTO timeslots (slot_key, timeslot) VALUES (?, ?)")
            .bind(i64::from(timeslot.key))
            .bind(&timeslot.timeslot)
            .execute(&self.pool)
            .await
            .map_err(query_error("insert timeslot"))?;
        Ok(())
    }

    async fn insert_assignment(&self, assignment: Assignment) -> Result<(), StoreError> {
        let _gate = self.write_gate.lock().await;
        sqlx::query(
            "INSERT INTO final_assignments \
             (section_id, room_id, day_code, timeslot, start_time, end_time, \
              department, program_section, updated_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(assignment.section_id.as_str())
        .bind(&assignment.room_id)
        .bind(&assignment.day_code)
        .bind(&assignment.timeslot)
        .bind(&assignment.start_time)
        .bind(&assignment.end_time)
        .bind(&assignment.department)
        .bind(&assignment.program_section)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(query_error("insert assignment"))?;
        Ok(())
    }
}

/// Rolls back on drop unless committed. The write gate is released after the
/// transaction ends, in field order.
struct SqliteTransaction {
    tx: Option<Transaction<'static, Sqlite>>,
    gate: Option<OwnedMutexGuard<()>>,
}

impl SqliteTransaction {
    fn tx(&mut self) -> Result<&mut Transaction<'static, Sqlite>, StoreError> {
        self.tx.as_mut().ok_or(StoreError::Finished)
    }
}

#[async_trait]
impl AssignmentTransaction for SqliteTransaction {
    async fn get_assignment(
        &mut self,
        section_id: &SectionId,
    ) -> Result<Option<Assignment>, StoreError> {
        let tx = self.tx()?;
        let sql = select_by_section();
        let row = sqlx::query(&sql)
            .bind(section_id.as_str())
            .fetch_optional(&mut **tx)
            .await
            .map_err(query_error("get assignment"))?;
        row.as_ref().map(row_to_assignment).transpose()
    }

    async fn find_assignments(
        &mut self,
        query: &SlotQuery,
    ) -> Result<Vec<Assignment>, StoreError> {
        if query.day_codes.is_empty() {
            return Ok(Vec::new());
        }

        let tx = self.tx()?;
        let placeholders = vec!["?"; query.day_codes.len()].join(", ");
        let sql = format!(
            "SELECT {ASSIGNMENT_COLUMNS} FROM final_assignments fa \
             WHERE fa.room_id = ? AND fa.day_code IN ({placeholders}) \
             AND fa.timeslot = ? AND fa.section_id != ?"
        );

        let mut statement = sqlx::query(&sql).bind(query.room_id.as_str());
        for day_code in &query.day_codes {
            statement = statement.bind(day_code.as_str());
        }
        let rows = statement
            .bind(query.timeslot.as_str())
            .bind(query.exclude_section_id.as_str())
            .fetch_all(&mut **tx)
            .await
            .map_err(query_error("find assignments"))?;

        rows.iter().map(row_to_assignment).collect()
    }

    async fn update_assignment(&mut self, update: &ScheduleUpdate) -> Result<(), StoreError> {
        let tx = self.tx()?;
        let result = sqlx::query(
            "UPDATE final_assignments \
             SET day_code = ?, timeslot = ?, start_time = ?, end_time = ?, updated_at = ? \
             WHERE section_id = ?",
        )
        .bind(update.day_code.as_str())
        .bind(update.timeslot.as_str())
        .bind(update.start_time.as_str())
        .bind(update.end_time.as_str())
        .bind(Utc::now().to_rfc3339())
        .bind(update.section_id.as_str())
        .execute(&mut **tx)
        .await
        .map_err(query_error("update assignment"))?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!("section {}", update.section_id)));
        }
        Ok(())
    }

    async fn commit(&mut self) -> Result<(), StoreError> {
        let tx = self.tx.take().ok_or(StoreError::Finished)?;
        let committed = tx.commit().await.map_err(query_error("commit"));
        self.gate.take();
        committed
    }
}
