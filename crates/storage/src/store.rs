//! SQLite report store implementation.

use crate::{CaseRecord, Error, Result, RunId};
use chrono::{DateTime, Utc};
use harness::{CaseReport, Report};
use rusqlite::{Connection, params};
use std::path::Path;
use tracing::debug;

/// Summary of a stored run.
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub id: RunId,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub case_count: usize,
    pub not_passed: usize,
}

/// SQLite-backed store of run reports.
pub struct ReportStore {
    conn: Connection,
}

impl ReportStore {
    /// Open or create a report store at the given path.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let conn = Connection::open(path)?;
        let store = Self { conn };
        store.init_schema()?;
        Ok(store)
    }

    /// Create an in-memory report store (useful for testing).
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let store = Self { conn };
        store.init_schema()?;
        Ok(store)
    }

    fn init_schema(&self) -> Result<()> {
        self.conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS runs (
                id TEXT PRIMARY KEY,
                started_at TEXT NOT NULL,
                finished_at TEXT
            );
            CREATE TABLE IF NOT EXISTS cases (
                run_id TEXT NOT NULL REFERENCES runs(id),
                seq INTEGER NOT NULL,
                case_name TEXT NOT NULL,
                outcome TEXT NOT NULL,
                recorded_at TEXT NOT NULL,
                data TEXT NOT NULL,
                PRIMARY KEY (run_id, seq)
            );
            "#,
        )?;
        Ok(())
    }

    /// Start a new run and return its id.
    pub fn begin_run(&self) -> Result<RunId> {
        let id = RunId::new();
        self.conn.execute(
            "INSERT INTO runs (id, started_at) VALUES (?1, ?2)",
            params![id.to_string(), Utc::now().to_rfc3339()],
        )?;
        debug!(run = %id, "Run started");
        Ok(id)
    }

    /// Append one case outcome to a run.
    pub fn append(&self, record: &CaseRecord) -> Result<()> {
        self.conn.execute(
            "INSERT INTO cases (run_id, seq, case_name, outcome, recorded_at, data)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                record.run_id.to_string(),
                record.seq,
                record.report.name,
                record.outcome().kind(),
                record.recorded_at.to_rfc3339(),
                serde_json::to_string(&record.report)?,
            ],
        )?;
        Ok(())
    }

    /// Mark a run as finished.
    pub fn finish_run(&self, run_id: RunId) -> Result<()> {
        let updated = self.conn.execute(
            "UPDATE runs SET finished_at = ?1 WHERE id = ?2",
            params![Utc::now().to_rfc3339(), run_id.to_string()],
        )?;
        if updated == 0 {
            return Err(Error::NotFound(run_id.to_string()));
        }
        Ok(())
    }

    /// Store a complete report as a finished run.
    ///
    /// The run is written in one transaction; on error nothing is kept.
    pub fn save_report(&self, report: &Report) -> Result<RunId> {
        let tx = self.conn.unchecked_transaction()?;
        let run_id = self.begin_run()?;
        for (seq, case) in report.cases.iter().enumerate() {
            self.append(&CaseRecord::new(run_id, seq as u32, case.clone()))?;
        }
        self.finish_run(run_id)?;
        tx.commit()?;
        Ok(run_id)
    }

    /// Load the records of a run in case order.
    pub fn load_run(&self, run_id: RunId) -> Result<Vec<CaseRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT seq, recorded_at, data FROM cases
             WHERE run_id = ?1 ORDER BY seq",
        )?;

        let rows = stmt
            .query_map([run_id.to_string()], |row| {
                let seq: u32 = row.get(0)?;
                let recorded_at: String = row.get(1)?;
                let data: String = row.get(2)?;
                Ok((seq, recorded_at, data))
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        rows.into_iter()
            .map(|(seq, recorded_at, data)| {
                let report: CaseReport = serde_json::from_str(&data)?;
                Ok(CaseRecord {
                    run_id,
                    seq,
                    recorded_at: parse_timestamp(&recorded_at)?,
                    report,
                })
            })
            .collect()
    }

    /// Load a run back into a report.
    pub fn load_report(&self, run_id: RunId) -> Result<Report> {
        let cases = self
            .load_run(run_id)?
            .into_iter()
            .map(|record| record.report)
            .collect();
        Ok(Report { cases })
    }

    /// List all runs, newest first.
    pub fn list_runs(&self) -> Result<Vec<RunSummary>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT r.id, r.started_at, r.finished_at,
                   COUNT(c.seq),
                   COALESCE(SUM(CASE WHEN c.outcome != 'passed' THEN 1 ELSE 0 END), 0)
            FROM runs r
            LEFT JOIN cases c ON c.run_id = r.id
            GROUP BY r.id
            ORDER BY r.started_at DESC
            "#,
        )?;

        let rows = stmt
            .query_map([], |row| {
                let id: String = row.get(0)?;
                let started_at: String = row.get(1)?;
                let finished_at: Option<String> = row.get(2)?;
                let case_count: i64 = row.get(3)?;
                let not_passed: i64 = row.get(4)?;
                Ok((id, started_at, finished_at, case_count, not_passed))
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        rows.into_iter()
            .map(|(id, started_at, finished_at, case_count, not_passed)| {
                Ok(RunSummary {
                    id: parse_run_id(&id)?,
                    started_at: parse_timestamp(&started_at)?,
                    finished_at: finished_at.as_deref().map(parse_timestamp).transpose()?,
                    case_count: case_count as usize,
                    not_passed: not_passed as usize,
                })
            })
            .collect()
    }
}

fn parse_run_id(s: &str) -> Result<RunId> {
    s.parse()
        .map(RunId)
        .map_err(|_| Error::Corrupt(format!("malformed run id {s}")))
}

fn parse_timestamp(s: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|_| Error::Corrupt(format!("malformed timestamp {s}")))
}
