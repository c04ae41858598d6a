pub const PREPARATION_TABLE: &str = "preparation";

pub const PREPARATION_DDL: &str = r#"
CREATE TABLE IF NOT EXISTS preparation (
  id INTEGER PRIMARY KEY AUTOINCREMENT,
  uid VARCHAR(32) UNIQUE,
  program_type VARCHAR NOT NULL,
  process VARCHAR,
  port VARCHAR,
  status VARCHAR,
  error VARCHAR,
  create_time VARCHAR,
  update_time VARCHAR
);
"#;

pub const PREPARATION_INDEX_DDL: &[&str] = &[
    "CREATE INDEX IF NOT EXISTS pre_uid_uidx ON preparation (uid)",
    "CREATE INDEX IF NOT EXISTS pre_status_idx ON preparation (status)",
    "CREATE INDEX IF NOT EXISTS pre_type_process_idx ON preparation (program_type, process)",
    // At most one Running row per (program_type, process).
    "CREATE UNIQUE INDEX IF NOT EXISTS pre_running_type_process_uidx
       ON preparation (program_type, process) WHERE status = 'Running'",
];

pub const TABLE_EXISTS_DQL: &str =
    "SELECT count(*) FROM sqlite_master WHERE type = 'table' AND name = ?1";

pub const PREPARATION_COLUMNS: &str =
    "uid, program_type, process, port, status, error, create_time, update_time";
