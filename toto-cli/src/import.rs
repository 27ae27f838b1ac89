use anyhow::{Context, Result};
use std::path::Path;
use toto_db::db::{append_draws, replace_draws};
use toto_db::models::{Game, NUMBERS_PER_DRAW};
use toto_db::rusqlite::Connection;

pub struct ImportResult {
    pub total_records: u32,
    pub inserted: u32,
    pub errors: u32,
}

/// Une ligne = les six premières colonnes ; case vide = numéro absent.
/// Les numéros présents sont triés, les absents placés à la fin.
fn parse_record(record: &csv::StringRecord) -> Result<[Option<i64>; NUMBERS_PER_DRAW]> {
    let mut present = Vec::with_capacity(NUMBERS_PER_DRAW);
    for idx in 0..NUMBERS_PER_DRAW {
        let cell = record.get(idx).map(str::trim).unwrap_or_default();
        if cell.is_empty() {
            continue;
        }
        let n = cell
            .parse::<i64>()
            .with_context(|| format!("Impossible de parser '{}' (colonne {})", cell, idx + 1))?;
        present.push(n);
    }
    present.sort_unstable();

    let mut numbers = [None; NUMBERS_PER_DRAW];
    for (slot, n) in numbers.iter_mut().zip(present) {
        *slot = Some(n);
    }
    Ok(numbers)
}

pub fn import_csv(conn: &Connection, path: &Path, game: Game, replace: bool) -> Result<ImportResult> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_path(path)
        .with_context(|| format!("Impossible d'ouvrir {:?}", path))?;

    let mut result = ImportResult { total_records: 0, inserted: 0, errors: 0 };
    let mut rows = Vec::new();

    for record_result in reader.records() {
        result.total_records += 1;
        match record_result {
            Ok(record) => match parse_record(&record) {
                Ok(numbers) => rows.push(numbers),
                Err(e) => {
                    log::warn!("Erreur parsing ligne {}: {}", result.total_records, e);
                    result.errors += 1;
                }
            },
            Err(e) => {
                log::warn!("Erreur lecture ligne {}: {}", result.total_records, e);
                result.errors += 1;
            }
        }
    }

    let inserted = if replace {
        replace_draws(conn, &rows, game)?
    } else {
        append_draws(conn, &rows, game)?
    };
    result.inserted = inserted as u32;
    Ok(result)
}
