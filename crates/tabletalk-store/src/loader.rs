//! Bulk CSV loader: one table per file, schema inferred by DuckDB

use crate::{quote_ident, StoreError};
use duckdb::Connection;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Outcome of a bulk load run.
#[derive(Debug, Default)]
pub struct LoadSummary {
    /// True when the store file already existed and the run was skipped.
    pub skipped: bool,
    /// Tables materialized this run, in load order.
    pub loaded: Vec<String>,
    /// Files that failed to load, with the store's error text.
    pub failed: Vec<FailedFile>,
}

#[derive(Debug)]
pub struct FailedFile {
    pub path: PathBuf,
    pub message: String,
}

/// Load every `*.csv` under `data_dir` into the store at `db_path`.
///
/// Each file becomes one table named after the file stem, replacing any
/// existing table of that name. Column types are inferred by DuckDB from the
/// header row and sampled values.
///
/// The run is skipped entirely when `db_path` already exists: presence of the
/// store file is the idempotence marker, not its contents. Re-loading after a
/// partial failure requires deleting the store file first.
///
/// A file that DuckDB cannot parse fails only that file's load; an unopenable
/// store fails the whole run.
pub fn load_dir<P: AsRef<Path>, Q: AsRef<Path>>(
    db_path: P,
    data_dir: Q,
) -> Result<LoadSummary, StoreError> {
    let db_path = db_path.as_ref();
    let data_dir = data_dir.as_ref();

    if db_path.exists() {
        info!(store = %db_path.display(), "store already exists, skipping bulk load");
        return Ok(LoadSummary {
            skipped: true,
            ..LoadSummary::default()
        });
    }

    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let conn = Connection::open(db_path)?;

    let mut files: Vec<PathBuf> = std::fs::read_dir(data_dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.extension().and_then(|ext| ext.to_str()) == Some("csv"))
        .collect();
    files.sort();

    let mut summary = LoadSummary::default();

    for path in files {
        let Some(table) = path.file_stem().and_then(|stem| stem.to_str()) else {
            warn!(file = %path.display(), "skipping file with unusable name");
            continue;
        };
        let table = table.to_string();

        match load_csv(&conn, &table, &path) {
            Ok(()) => {
                info!(table = %table, file = %path.display(), "loaded table");
                summary.loaded.push(table);
            }
            Err(e) => {
                warn!(file = %path.display(), error = %e, "failed to load file");
                summary.failed.push(FailedFile {
                    path,
                    message: e.to_string(),
                });
            }
        }
    }

    Ok(summary)
}

fn load_csv(conn: &Connection, table: &str, path: &Path) -> duckdb::Result<()> {
    let file = path.to_string_lossy().replace('\'', "''");
    let sql = format!(
        "CREATE OR REPLACE TABLE {} AS SELECT * FROM read_csv_auto('{}')",
        quote_ident(table),
        file
    );
    conn.execute_batch(&sql)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Store;

    fn write_csv(dir: &Path, name: &str, contents: &str) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn loads_each_csv_as_a_table() {
        let tmp = tempfile::tempdir().unwrap();
        let data = tmp.path().join("data");
        std::fs::create_dir(&data).unwrap();
        write_csv(&data, "players.csv", "id,name\n1,Alice\n2,Bob\n");
        write_csv(&data, "clubs.csv", "club_id,name\n10,Rovers\n");
        let db = tmp.path().join("store.db");

        let summary = load_dir(&db, &data).unwrap();
        assert!(!summary.skipped);
        assert_eq!(summary.loaded, vec!["clubs", "players"]);
        assert!(summary.failed.is_empty());

        let store = Store::open(&db).unwrap();
        assert_eq!(store.row_count("players").unwrap(), 2);
        assert_eq!(store.row_count("clubs").unwrap(), 1);
    }

    #[test]
    fn infers_column_types_from_values() {
        let tmp = tempfile::tempdir().unwrap();
        let data = tmp.path().join("data");
        std::fs::create_dir(&data).unwrap();
        write_csv(&data, "appearances.csv", "player_id,yellow_cards\np1,2\np2,0\n");
        let db = tmp.path().join("store.db");

        load_dir(&db, &data).unwrap();

        let store = Store::open(&db).unwrap();
        let columns = store.table_columns("appearances").unwrap();
        assert_eq!(columns[0].name, "player_id");
        assert!(columns[0].data_type.contains("VARCHAR"));
        assert!(columns[1].data_type.contains("INT"));
    }

    #[test]
    fn second_run_is_skipped_and_leaves_tables_alone() {
        let tmp = tempfile::tempdir().unwrap();
        let data = tmp.path().join("data");
        std::fs::create_dir(&data).unwrap();
        let csv = write_csv(&data, "players.csv", "id,name\n1,Alice\n");
        let db = tmp.path().join("store.db");

        load_dir(&db, &data).unwrap();

        // Grow the source file; a second run must not pick the change up.
        std::fs::write(&csv, "id,name\n1,Alice\n2,Bob\n3,Carol\n").unwrap();
        let summary = load_dir(&db, &data).unwrap();
        assert!(summary.skipped);
        assert!(summary.loaded.is_empty());

        let store = Store::open(&db).unwrap();
        assert_eq!(store.row_count("players").unwrap(), 1);
    }

    #[test]
    fn malformed_file_fails_only_itself() {
        let tmp = tempfile::tempdir().unwrap();
        let data = tmp.path().join("data");
        std::fs::create_dir(&data).unwrap();
        write_csv(&data, "empty.csv", "");
        write_csv(&data, "players.csv", "id,name\n1,Alice\n");
        let db = tmp.path().join("store.db");

        let summary = load_dir(&db, &data).unwrap();
        assert_eq!(summary.loaded, vec!["players"]);
        assert_eq!(summary.failed.len(), 1);
        assert!(summary.failed[0].path.ends_with("empty.csv"));

        let store = Store::open(&db).unwrap();
        assert_eq!(store.row_count("players").unwrap(), 1);
    }

    #[test]
    fn missing_data_dir_fails_the_run() {
        let tmp = tempfile::tempdir().unwrap();
        let db = tmp.path().join("store.db");
        let err = load_dir(&db, tmp.path().join("nowhere")).unwrap_err();
        assert!(matches!(err, StoreError::Io(_)));
    }
}
