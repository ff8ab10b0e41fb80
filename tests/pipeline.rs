use std::fs;
use std::path::{Path, PathBuf};

use clover::store::SqliteBackend;
use clover::watch::{Classifier, Dispatcher, SettleDelays};
use pretty_assertions::assert_eq;
use tempfile::TempDir;

fn layout() -> (TempDir, Classifier) {
    let dir = tempfile::tempdir().unwrap();
    fs::create_dir(dir.path().join("specs")).unwrap();
    fs::create_dir(dir.path().join("data")).unwrap();
    let classifier = Classifier::new(
        &dir.path().join("specs"),
        &dir.path().join("data"),
        "csv",
        "txt",
    )
    .unwrap();
    (dir, classifier)
}

fn write(dir: &Path, rel: &str, contents: &str) -> PathBuf {
    let path = dir.join(rel);
    fs::write(&path, contents).unwrap();
    path
}

fn select_all(backend: &SqliteBackend, table: &str, columns: &[&str]) -> Vec<Vec<String>> {
    // Declared types give columns numeric affinity; read everything back as text.
    let cols: Vec<String> = columns
        .iter()
        .map(|c| format!("CAST(\"{}\" AS TEXT)", c))
        .collect();
    let sql = format!(
        "SELECT {} FROM \"{}\" ORDER BY \"_row_id\"",
        cols.join(", "),
        table
    );
    let conn = backend.connection();
    let mut stmt = conn.prepare(&sql).unwrap();
    stmt.query_map([], |row| {
        (0..columns.len())
            .map(|i| row.get::<_, String>(i))
            .collect::<rusqlite::Result<Vec<_>>>()
    })
    .unwrap()
    .map(|r| r.unwrap())
    .collect()
}

#[test]
fn spec_and_data_files_land_in_sqlite() {
    let (dir, classifier) = layout();
    let spec = write(
        dir.path(),
        "specs/tester.csv",
        "\"column name\",width,datatype\nname,10,TEXT\nvalid,1,BOOLEAN\ncount,3,INTEGER\n",
    );
    let data = write(
        dir.path(),
        "data/tester_2016-3-1.txt",
        "Foonyor   1  1\nBarzane   0-12\n\nQuuxitude 1103\n",
    );

    let backend = SqliteBackend::open(&dir.path().join("clover.sqlite3")).unwrap();
    let mut dispatcher = Dispatcher::new(classifier, SettleDelays::default(), backend);

    assert_eq!(dispatcher.ingest(&[spec, data]), 2);
    assert_eq!(dispatcher.registry().widths("tester"), Some(&[10, 1, 3][..]));

    let rows = select_all(dispatcher.backend(), "tester", &["name", "valid", "count"]);
    assert_eq!(
        rows,
        vec![
            vec!["Foonyor", "1", "1"],
            vec!["Barzane", "0", "-12"],
            vec!["Quuxitude", "1", "103"],
        ]
    );
}

#[test]
fn rejected_rows_do_not_stop_the_file() {
    let (dir, classifier) = layout();
    let spec = write(
        dir.path(),
        "specs/codes.csv",
        "name,width,type\ncode,4,TEXT CHECK(code <> 'BAD!')\n",
    );
    let data = write(dir.path(), "data/codes_1.txt", "GOOD\nBAD!\nOKAY\n");

    let backend = SqliteBackend::in_memory().unwrap();
    let mut dispatcher = Dispatcher::new(classifier, SettleDelays::default(), backend);

    assert_eq!(dispatcher.ingest(&[spec, data]), 2);
    assert_eq!(
        select_all(dispatcher.backend(), "codes", &["code"]),
        vec![vec!["GOOD"], vec!["OKAY"]]
    );
}

#[test]
fn malformed_spec_leaves_partial_ddl_and_no_registration() {
    let (dir, classifier) = layout();
    let spec = write(dir.path(), "specs/broken.csv", "h\nfirst,2,TEXT\nsecond,wide,TEXT\n");
    let data = write(dir.path(), "data/broken_1.txt", "ab cd\n");

    let backend = SqliteBackend::in_memory().unwrap();
    let mut dispatcher = Dispatcher::new(classifier, SettleDelays::default(), backend);

    assert_eq!(dispatcher.ingest(&[spec, data]), 0);
    assert!(!dispatcher.registry().contains("broken"));

    // The first column was added before the bad row and stays.
    let count: i64 = dispatcher
        .backend()
        .connection()
        .query_row("SELECT COUNT(*) FROM \"broken\"", [], |r| r.get(0))
        .unwrap();
    assert_eq!(count, 0);
    assert_eq!(
        select_all(dispatcher.backend(), "broken", &["first"]),
        Vec::<Vec<String>>::new()
    );
}

#[test]
fn row_with_invalid_encoding_is_skipped_in_sqlite() {
    let (dir, classifier) = layout();
    let spec = write(dir.path(), "specs/words.csv", "name,width,type\nword,10,TEXT\n");
    let data = dir.path().join("data/words_1.txt");
    fs::write(&data, b"good1\ncaf\xe9\ngood2\n").unwrap();

    let backend = SqliteBackend::in_memory().unwrap();
    let mut dispatcher = Dispatcher::new(classifier, SettleDelays::default(), backend);

    assert_eq!(dispatcher.ingest(&[spec, data]), 2);
    assert_eq!(
        select_all(dispatcher.backend(), "words", &["word"]),
        vec![vec!["good1"], vec!["good2"]]
    );
}
