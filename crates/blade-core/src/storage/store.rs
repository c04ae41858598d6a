use crate::model::{now_rfc3339, PreparationRecord, PreparationStatus};
use crate::storage::schema::{
    PREPARATION_COLUMNS, PREPARATION_DDL, PREPARATION_INDEX_DDL, PREPARATION_TABLE,
    TABLE_EXISTS_DQL,
};
use anyhow::Context;
use rusqlite::{params, Connection, OptionalExtension, Row, TransactionBehavior};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Clone)]
pub struct Store {
    pub conn: Arc<Mutex<Connection>>,
}

/// Outcome of a guarded insert of a `Running` record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InsertOutcome {
    Inserted,
    /// Nothing was written; this record already holds the slot.
    AlreadyRunning(PreparationRecord),
}

impl Store {
    pub fn open(path: &Path) -> anyhow::Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("failed to open sqlite db {}", path.display()))?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn memory() -> anyhow::Result<Self> {
        let conn = Connection::open_in_memory().context("failed to open in-memory sqlite db")?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn conn(&self) -> anyhow::Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| anyhow::anyhow!("sqlite connection lock poisoned"))
    }

    /// Creates the preparation table and its indexes unless the table already exists.
    pub fn init_schema(&self) -> anyhow::Result<()> {
        let conn = self.conn()?;
        if preparation_table_exists(&conn)? {
            return Ok(());
        }
        conn.execute_batch(PREPARATION_DDL)
            .context("create preparation table")?;
        for ddl in PREPARATION_INDEX_DDL {
            conn.execute(ddl, [])
                .with_context(|| format!("create preparation index: {}", ddl))?;
        }
        tracing::debug!(event = "storage.schema_created", table = PREPARATION_TABLE);
        Ok(())
    }

    pub fn preparation_table_exists(&self) -> anyhow::Result<bool> {
        let conn = self.conn()?;
        preparation_table_exists(&conn)
    }

    pub fn insert_preparation(&self, record: &PreparationRecord) -> anyhow::Result<()> {
        let conn = self.conn()?;
        insert_record(&conn, record)
    }

    /// Inserts `record` unless a Running record already exists for its
    /// `(program_type, process)`. Check and insert share one immediate transaction.
    pub fn insert_running_preparation(
        &self,
        record: &PreparationRecord,
    ) -> anyhow::Result<InsertOutcome> {
        let mut conn = self.conn()?;
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .context("begin preparation insert")?;

        if let Some(existing) = query_running_slot(&tx, &record.program_type, &record.process)? {
            return Ok(InsertOutcome::AlreadyRunning(existing));
        }
        insert_record(&tx, record)?;
        tx.commit().context("commit preparation insert")?;
        Ok(InsertOutcome::Inserted)
    }

    pub fn get_preparation_by_uid(&self, uid: &str) -> anyhow::Result<Option<PreparationRecord>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM preparation WHERE uid = ?1",
            PREPARATION_COLUMNS
        ))?;
        let record = stmt
            .query_row(params![uid], record_from_row)
            .optional()
            .with_context(|| format!("query preparation by uid {}", uid))?;
        Ok(record)
    }

    /// Running record for `program_type`; an empty `process` matches any process.
    pub fn get_running_preparation(
        &self,
        program_type: &str,
        process: &str,
    ) -> anyhow::Result<Option<PreparationRecord>> {
        let conn = self.conn()?;
        query_running(&conn, program_type, process)
    }

    pub fn list_preparations(&self) -> anyhow::Result<Vec<PreparationRecord>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM preparation ORDER BY id ASC",
            PREPARATION_COLUMNS
        ))?;
        let rows = stmt.query_map([], record_from_row)?;

        let mut records = Vec::new();
        for r in rows {
            records.push(r?);
        }
        Ok(records)
    }

    /// Overwrites status, error and update_time. An unknown uid is not an error.
    pub fn update_preparation_status(
        &self,
        uid: &str,
        status: PreparationStatus,
        error: &str,
    ) -> anyhow::Result<()> {
        let conn = self.conn()?;
        let changed = conn
            .execute(
                "UPDATE preparation SET status = ?1, error = ?2, update_time = ?3 WHERE uid = ?4",
                params![status.as_str(), error, now_rfc3339(), uid],
            )
            .with_context(|| format!("update preparation {}", uid))?;
        if changed == 0 {
            tracing::debug!(event = "storage.update_missed", uid = %uid);
        }
        Ok(())
    }
}

fn preparation_table_exists(conn: &Connection) -> anyhow::Result<bool> {
    let mut stmt = conn
        .prepare(TABLE_EXISTS_DQL)
        .context("select preparation table exists err when invoke db prepare")?;
    let count: i64 = stmt
        .query_row(params![PREPARATION_TABLE], |r| r.get(0))
        .context("select preparation table exists or not err")?;
    Ok(count != 0)
}

fn insert_record(conn: &Connection, record: &PreparationRecord) -> anyhow::Result<()> {
    let mut stmt = conn.prepare(&format!(
        "INSERT INTO preparation ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        PREPARATION_COLUMNS
    ))?;
    stmt.execute(params![
        record.uid,
        record.program_type,
        record.process,
        record.port,
        record.status,
        record.error,
        record.create_time,
        record.update_time,
    ])
    .with_context(|| format!("insert preparation {}", record.uid))?;
    Ok(())
}

fn query_running(
    conn: &Connection,
    program_type: &str,
    process: &str,
) -> anyhow::Result<Option<PreparationRecord>> {
    let running = PreparationStatus::Running.as_str();
    let record = if process.is_empty() {
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM preparation WHERE program_type = ?1 AND status = ?2 ORDER BY id ASC LIMIT 1",
            PREPARATION_COLUMNS
        ))?;
        stmt.query_row(params![program_type, running], record_from_row)
            .optional()?
    } else {
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM preparation WHERE program_type = ?1 AND process = ?2 AND status = ?3 ORDER BY id ASC LIMIT 1",
            PREPARATION_COLUMNS
        ))?;
        stmt.query_row(params![program_type, process, running], record_from_row)
            .optional()?
    };
    Ok(record)
}

// Exact `(program_type, process)` match; an empty process is its own slot,
// mirroring `pre_running_type_process_uidx`.
fn query_running_slot(
    conn: &Connection,
    program_type: &str,
    process: &str,
) -> anyhow::Result<Option<PreparationRecord>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM preparation WHERE program_type = ?1 AND process = ?2 AND status = ?3 ORDER BY id ASC LIMIT 1",
        PREPARATION_COLUMNS
    ))?;
    let record = stmt
        .query_row(
            params![program_type, process, PreparationStatus::Running.as_str()],
            record_from_row,
        )
        .optional()?;
    Ok(record)
}

// Nullable columns read back as empty strings.
fn record_from_row(row: &Row<'_>) -> rusqlite::Result<PreparationRecord> {
    let text = |idx: usize| -> rusqlite::Result<String> {
        Ok(row.get::<_, Option<String>>(idx)?.unwrap_or_default())
    };
    Ok(PreparationRecord {
        uid: text(0)?,
        program_type: text(1)?,
        process: text(2)?,
        port: text(3)?,
        status: text(4)?,
        error: text(5)?,
        create_time: text(6)?,
        update_time: text(7)?,
    })
}
