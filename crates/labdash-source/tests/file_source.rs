//! Loading registers from files on disk

use labdash_core::{CellValue, DataSource, FetchError};
use labdash_source::{load_table, parse_file, CachedSource, FileSource};
use pretty_assertions::assert_eq;
use std::io::Write;
use std::time::Duration;
use tempfile::NamedTempFile;

const REGISTER: &str = "\u{feff}Boletim,Data,Status_Amostra,Matriz,Qtdade,Química,Física\r\n\
B-01,02/01/2024,PRONTAS,Solo,3,pH,\r\n\
B-02,03/01/2024,\"EM ANÁLISE\",\"Água, bruta\",2,,Granulometria\r\n\
\r\n\
B-03,04/01/2024,NA FILA,Solo,1\r\n";

fn write_csv(content: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

#[test]
fn loads_register_from_file() {
    let file = write_csv(REGISTER);
    let table = load_table(&FileSource::new(file.path())).unwrap();

    assert_eq!(table.len(), 3);
    assert_eq!(table.columns()[0], "Boletim");
    let matrices: Vec<_> = table.column("Matriz").unwrap().cloned().collect();
    assert_eq!(
        matrices,
        vec![
            CellValue::text("Solo"),
            CellValue::text("Água, bruta"),
            CellValue::text("Solo"),
        ]
    );
    let quantities: Vec<_> = table.column("Qtdade").unwrap().filter_map(CellValue::as_number).collect();
    assert_eq!(quantities, vec![3.0, 2.0, 1.0]);
    // short last record padded
    assert!(table.row(2).unwrap().get("Física").is_missing());
}

#[test]
fn parse_file_matches_load_table() {
    let file = write_csv(REGISTER);
    let direct = parse_file(file.path()).unwrap();
    let loaded = load_table(&FileSource::new(file.path())).unwrap();
    assert_eq!(direct, loaded);
}

#[test]
fn missing_file_is_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let source = FileSource::new(dir.path().join("absent.csv"));
    assert!(matches!(source.fetch(), Err(FetchError::Io(_))));
    assert!(matches!(load_table(&source), Err(FetchError::Io(_))));
}

#[test]
fn empty_file_is_reported_as_empty() {
    let file = write_csv("");
    assert!(matches!(parse_file(file.path()), Err(FetchError::Empty)));
}

#[test]
fn cached_file_source_sees_updates_after_invalidate() {
    let file = write_csv("a\n1\n");
    let cached = CachedSource::new(FileSource::new(file.path()), Duration::from_secs(300));
    assert_eq!(cached.snapshot().unwrap().len(), 1);

    std::fs::write(file.path(), "a\n1\n2\n").unwrap();
    assert_eq!(cached.snapshot().unwrap().len(), 1);

    cached.invalidate();
    assert_eq!(cached.snapshot().unwrap().len(), 2);
}
