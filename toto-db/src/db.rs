use anyhow::{Context, Result};
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};
use std::path::{Path, PathBuf};

use crate::models::{clamp_numbers, Draw, Game, NUMBERS_PER_DRAW};

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS draws (
    id           INTEGER PRIMARY KEY AUTOINCREMENT,
    draw_number  TEXT,
    number1      INTEGER,
    number2      INTEGER,
    number3      INTEGER,
    number4      INTEGER,
    number5      INTEGER,
    number6      INTEGER,
    sort_order   INTEGER
);
CREATE INDEX IF NOT EXISTS idx_draws_sort_order ON draws (sort_order);
";

const SELECT_DRAW: &str =
    "SELECT id, draw_number, number1, number2, number3, number4, number5, number6 FROM draws";

pub fn db_path(game: Game) -> PathBuf {
    let mut path = std::env::current_dir().unwrap_or_default();
    path.push("data");
    path.push(game.db_file());
    path
}

pub fn open_db(path: &Path) -> Result<Connection> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Impossible de créer le répertoire {:?}", parent))?;
    }
    let conn = Connection::open(path)
        .with_context(|| format!("Impossible d'ouvrir la base {:?}", path))?;
    Ok(conn)
}

pub fn migrate(conn: &Connection) -> Result<()> {
    conn.execute_batch(SCHEMA).context("Échec de la migration")?;
    Ok(())
}

fn row_to_draw(row: &Row<'_>) -> rusqlite::Result<Draw> {
    let mut numbers = [None; NUMBERS_PER_DRAW];
    for (i, slot) in numbers.iter_mut().enumerate() {
        *slot = row.get::<_, Option<u8>>(i + 2)?;
    }
    Ok(Draw {
        id: row.get(0)?,
        draw_number: row.get::<_, Option<String>>(1)?.unwrap_or_default(),
        numbers,
    })
}

pub fn count_draws(conn: &Connection) -> Result<u32> {
    let count: u32 = conn.query_row("SELECT COUNT(*) FROM draws", [], |row| row.get(0))?;
    Ok(count)
}

/// Les `limit` tirages les plus anciens, du plus ancien au plus récent.
pub fn fetch_oldest_draws(conn: &Connection, limit: u32) -> Result<Vec<Draw>> {
    let mut stmt = conn.prepare(&format!("{SELECT_DRAW} ORDER BY sort_order, id LIMIT ?1"))?;
    let draws = stmt
        .query_map([limit], row_to_draw)?
        .collect::<Result<Vec<_>, _>>()
        .context("Échec de la lecture des tirages")?;
    Ok(draws)
}

pub fn fetch_draws_page(conn: &Connection, limit: u32, offset: u32) -> Result<Vec<Draw>> {
    let mut stmt =
        conn.prepare(&format!("{SELECT_DRAW} ORDER BY sort_order, id LIMIT ?1 OFFSET ?2"))?;
    let draws = stmt
        .query_map([limit, offset], row_to_draw)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(draws)
}

pub fn fetch_all_draws(conn: &Connection) -> Result<Vec<Draw>> {
    let mut stmt = conn.prepare(&format!("{SELECT_DRAW} ORDER BY sort_order, id"))?;
    let draws = stmt.query_map([], row_to_draw)?.collect::<Result<Vec<_>, _>>()?;
    Ok(draws)
}

/// Réattribue `sort_order` = 1..n et `draw_number` = "0001".. dans l'ordre courant.
pub fn renumber_all(conn: &Connection) -> Result<()> {
    let ids: Vec<i64> = {
        let mut stmt = conn.prepare("SELECT id FROM draws ORDER BY sort_order, id")?;
        let ids = stmt.query_map([], |row| row.get(0))?.collect::<Result<Vec<_>, _>>()?;
        ids
    };
    let tx = conn.unchecked_transaction().context("Impossible de démarrer la transaction")?;
    for (i, id) in ids.iter().enumerate() {
        let position = i as i64 + 1;
        tx.execute(
            "UPDATE draws SET sort_order = ?1, draw_number = ?2 WHERE id = ?3",
            params![position, format!("{:04}", position), id],
        )?;
    }
    tx.commit().context("Échec de la renumérotation")?;
    Ok(())
}

/// Insère un tirage en fin de table, ou juste après `after_id` s'il existe.
/// Retourne l'identifiant du nouveau tirage.
pub fn insert_draw(
    conn: &Connection,
    numbers: &[Option<i64>; NUMBERS_PER_DRAW],
    game: Game,
    after_id: Option<i64>,
) -> Result<i64> {
    let numbers = clamp_numbers(numbers, game);

    let anchor: Option<i64> = match after_id {
        Some(id) => conn
            .query_row("SELECT sort_order FROM draws WHERE id = ?1", [id], |row| row.get(0))
            .optional()?,
        None => None,
    };

    let sort_order = match anchor {
        Some(after_sort) => {
            conn.execute(
                "UPDATE draws SET sort_order = sort_order + 1 WHERE sort_order > ?1",
                [after_sort],
            )?;
            after_sort + 1
        }
        None => {
            let max: Option<i64> =
                conn.query_row("SELECT MAX(sort_order) FROM draws", [], |row| row.get(0))?;
            max.unwrap_or(0) + 1
        }
    };

    conn.execute(
        "INSERT INTO draws (draw_number, number1, number2, number3, number4, number5, number6, sort_order)
         VALUES ('temp', ?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            numbers[0], numbers[1], numbers[2], numbers[3], numbers[4], numbers[5], sort_order
        ],
    )
    .context("Échec de l'insertion")?;
    let id = conn.last_insert_rowid();

    renumber_all(conn)?;
    Ok(id)
}

/// Ajoute des tirages en fin de table dans une seule transaction, puis renumérote.
pub fn append_draws(
    conn: &Connection,
    rows: &[[Option<i64>; NUMBERS_PER_DRAW]],
    game: Game,
) -> Result<usize> {
    write_draws(conn, rows, game, false)
}

/// Remplace tout l'historique par `rows`. En cas d'échec l'ancien historique est conservé.
pub fn replace_draws(
    conn: &Connection,
    rows: &[[Option<i64>; NUMBERS_PER_DRAW]],
    game: Game,
) -> Result<usize> {
    write_draws(conn, rows, game, true)
}

fn write_draws(
    conn: &Connection,
    rows: &[[Option<i64>; NUMBERS_PER_DRAW]],
    game: Game,
    clear_first: bool,
) -> Result<usize> {
    let tx = conn.unchecked_transaction().context("Impossible de démarrer la transaction")?;
    if clear_first {
        tx.execute("DELETE FROM draws", []).context("Échec du vidage de la table")?;
    }
    let max: Option<i64> = tx.query_row("SELECT MAX(sort_order) FROM draws", [], |row| row.get(0))?;
    let mut sort_order = max.unwrap_or(0);
    {
        let mut stmt = tx.prepare(
            "INSERT INTO draws (draw_number, number1, number2, number3, number4, number5, number6, sort_order)
             VALUES ('temp', ?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        )?;
        for row in rows {
            let n = clamp_numbers(row, game);
            sort_order += 1;
            stmt.execute(params![n[0], n[1], n[2], n[3], n[4], n[5], sort_order])
                .context("Échec de l'insertion")?;
        }
    }
    tx.commit().context("Échec du commit")?;
    renumber_all(conn)?;
    Ok(rows.len())
}

/// Retourne `false` si aucun tirage ne porte cet identifiant.
pub fn update_draw(
    conn: &Connection,
    id: i64,
    numbers: &[Option<i64>; NUMBERS_PER_DRAW],
    game: Game,
) -> Result<bool> {
    let numbers = clamp_numbers(numbers, game);
    let changed = conn
        .execute(
            "UPDATE draws SET number1 = ?1, number2 = ?2, number3 = ?3, number4 = ?4, number5 = ?5, number6 = ?6
             WHERE id = ?7",
            params![numbers[0], numbers[1], numbers[2], numbers[3], numbers[4], numbers[5], id],
        )
        .context("Échec de la mise à jour")?;
    Ok(changed > 0)
}

pub fn delete_draws(conn: &Connection, ids: &[i64]) -> Result<usize> {
    if ids.is_empty() {
        return Ok(0);
    }
    let placeholders = vec!["?"; ids.len()].join(",");
    let deleted = conn
        .execute(
            &format!("DELETE FROM draws WHERE id IN ({placeholders})"),
            params_from_iter(ids.iter()),
        )
        .context("Échec de la suppression")?;
    renumber_all(conn)?;
    Ok(deleted)
}

/// Applique un ordre complet : le i-ème id de `new_order` prend le rang i.
pub fn reorder_draws(conn: &Connection, new_order: &[i64]) -> Result<()> {
    let tx = conn.unchecked_transaction().context("Impossible de démarrer la transaction")?;
    for (i, id) in new_order.iter().enumerate() {
        tx.execute("UPDATE draws SET sort_order = ?1 WHERE id = ?2", params![i as i64 + 1, id])?;
    }
    tx.commit().context("Échec du réordonnancement")?;
    renumber_all(conn)
}

pub fn swap_draws(conn: &Connection, id1: i64, id2: i64) -> Result<()> {
    let sort_of = |id: i64| -> Result<i64> {
        conn.query_row("SELECT sort_order FROM draws WHERE id = ?1", [id], |row| row.get(0))
            .with_context(|| format!("Tirage {} introuvable", id))
    };
    let so1 = sort_of(id1)?;
    let so2 = sort_of(id2)?;
    conn.execute("UPDATE draws SET sort_order = ?1 WHERE id = ?2", params![so2, id1])?;
    conn.execute("UPDATE draws SET sort_order = ?1 WHERE id = ?2", params![so1, id2])?;
    renumber_all(conn)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        migrate(&conn).unwrap();
        conn
    }

    fn full(nums: [i64; 6]) -> [Option<i64>; 6] {
        nums.map(Some)
    }

    #[test]
    fn test_insert_and_count() {
        let conn = setup();
        assert_eq!(count_draws(&conn).unwrap(), 0);

        insert_draw(&conn, &full([1, 2, 3, 4, 5, 6]), Game::Toto642, None).unwrap();
        assert_eq!(count_draws(&conn).unwrap(), 1);
    }

    #[test]
    fn test_insert_clamps_and_keeps_absent() {
        let conn = setup();
        let raw = [Some(0), Some(99), None, Some(7), None, Some(8)];
        insert_draw(&conn, &raw, Game::Toto642, None).unwrap();

        let draws = fetch_all_draws(&conn).unwrap();
        assert_eq!(draws[0].numbers, [Some(1), Some(42), None, Some(7), None, Some(8)]);
        assert_eq!(draws[0].draw_number, "0001");
    }

    #[test]
    fn test_fetch_oldest_order() {
        let conn = setup();
        insert_draw(&conn, &full([1, 2, 3, 4, 5, 6]), Game::Toto642, None).unwrap();
        insert_draw(&conn, &full([7, 8, 9, 10, 11, 12]), Game::Toto642, None).unwrap();
        insert_draw(&conn, &full([13, 14, 15, 16, 17, 18]), Game::Toto642, None).unwrap();

        let draws = fetch_oldest_draws(&conn, 2).unwrap();
        assert_eq!(draws.len(), 2);
        assert_eq!(draws[0].numbers[0], Some(1));
        assert_eq!(draws[1].numbers[0], Some(7));
    }

    #[test]
    fn test_insert_after_shifts_following_rows() {
        let conn = setup();
        let first = insert_draw(&conn, &full([1, 2, 3, 4, 5, 6]), Game::Toto642, None).unwrap();
        insert_draw(&conn, &full([7, 8, 9, 10, 11, 12]), Game::Toto642, None).unwrap();
        insert_draw(&conn, &[None; 6], Game::Toto642, Some(first)).unwrap();

        let draws = fetch_all_draws(&conn).unwrap();
        assert_eq!(draws.len(), 3);
        assert_eq!(draws[1].numbers, [None; 6]);
        assert_eq!(draws[2].numbers[0], Some(7));
        let labels: Vec<&str> = draws.iter().map(|d| d.draw_number.as_str()).collect();
        assert_eq!(labels, vec!["0001", "0002", "0003"]);
    }

    #[test]
    fn test_update_draw() {
        let conn = setup();
        let id = insert_draw(&conn, &[None; 6], Game::Toto649, None).unwrap();
        assert!(update_draw(&conn, id, &full([3, 9, 14, 22, 31, 60]), Game::Toto649).unwrap());
        assert!(!update_draw(&conn, id + 100, &full([1, 2, 3, 4, 5, 6]), Game::Toto649).unwrap());

        let draws = fetch_all_draws(&conn).unwrap();
        assert_eq!(draws[0].numbers[5], Some(49));
    }

    #[test]
    fn test_delete_renumbers() {
        let conn = setup();
        let a = insert_draw(&conn, &full([1, 2, 3, 4, 5, 6]), Game::Toto642, None).unwrap();
        insert_draw(&conn, &full([7, 8, 9, 10, 11, 12]), Game::Toto642, None).unwrap();

        assert_eq!(delete_draws(&conn, &[a]).unwrap(), 1);
        let draws = fetch_all_draws(&conn).unwrap();
        assert_eq!(draws.len(), 1);
        assert_eq!(draws[0].draw_number, "0001");
        assert_eq!(delete_draws(&conn, &[]).unwrap(), 0);
    }

    #[test]
    fn test_reorder_and_swap() {
        let conn = setup();
        let a = insert_draw(&conn, &full([1, 2, 3, 4, 5, 6]), Game::Toto642, None).unwrap();
        let b = insert_draw(&conn, &full([7, 8, 9, 10, 11, 12]), Game::Toto642, None).unwrap();
        let c = insert_draw(&conn, &full([13, 14, 15, 16, 17, 18]), Game::Toto642, None).unwrap();

        reorder_draws(&conn, &[c, a, b]).unwrap();
        let ids: Vec<i64> = fetch_all_draws(&conn).unwrap().iter().map(|d| d.id).collect();
        assert_eq!(ids, vec![c, a, b]);

        swap_draws(&conn, c, b).unwrap();
        let ids: Vec<i64> = fetch_all_draws(&conn).unwrap().iter().map(|d| d.id).collect();
        assert_eq!(ids, vec![b, a, c]);

        assert!(swap_draws(&conn, a, 9999).is_err());
    }

    #[test]
    fn test_append_draws() {
        let conn = setup();
        insert_draw(&conn, &full([1, 2, 3, 4, 5, 6]), Game::Toto642, None).unwrap();
        let rows = vec![full([7, 8, 9, 10, 11, 12]), [Some(13), None, None, None, None, Some(77)]];
        assert_eq!(append_draws(&conn, &rows, Game::Toto642).unwrap(), 2);

        let draws = fetch_all_draws(&conn).unwrap();
        assert_eq!(draws.len(), 3);
        assert_eq!(draws[2].numbers, [Some(13), None, None, None, None, Some(42)]);
        assert_eq!(draws[2].draw_number, "0003");
    }

    #[test]
    fn test_replace_draws() {
        let conn = setup();
        insert_draw(&conn, &full([1, 2, 3, 4, 5, 6]), Game::Toto642, None).unwrap();
        insert_draw(&conn, &full([7, 8, 9, 10, 11, 12]), Game::Toto642, None).unwrap();

        let rows = vec![full([20, 21, 22, 23, 24, 25])];
        assert_eq!(replace_draws(&conn, &rows, Game::Toto642).unwrap(), 1);
        let draws = fetch_all_draws(&conn).unwrap();
        assert_eq!(draws.len(), 1);
        assert_eq!(draws[0].numbers[0], Some(20));
        assert_eq!(draws[0].draw_number, "0001");
    }

    #[test]
    fn test_failed_replace_keeps_history() {
        let conn = setup();
        insert_draw(&conn, &full([1, 2, 3, 4, 5, 6]), Game::Toto642, None).unwrap();
        insert_draw(&conn, &full([7, 8, 9, 10, 11, 12]), Game::Toto642, None).unwrap();
        conn.execute_batch(
            "CREATE TRIGGER reject_13 BEFORE INSERT ON draws WHEN NEW.number1 = 13
             BEGIN SELECT RAISE(ABORT, 'refusé'); END;",
        )
        .unwrap();

        let rows = vec![full([20, 21, 22, 23, 24, 25]), full([13, 14, 15, 16, 17, 18])];
        assert!(replace_draws(&conn, &rows, Game::Toto642).is_err());

        let draws = fetch_all_draws(&conn).unwrap();
        assert_eq!(draws.len(), 2);
        assert_eq!(draws[0].numbers[0], Some(1));
        assert_eq!(draws[1].numbers[0], Some(7));
    }

    #[test]
    fn test_fetch_page() {
        let conn = setup();
        for i in 0..5 {
            insert_draw(&conn, &full([i + 1, 10, 20, 30, 40, 41]), Game::Toto642, None).unwrap();
        }
        let page = fetch_draws_page(&conn, 2, 3).unwrap();
        assert_eq!(page.len(), 2);
        assert_eq!(page[0].draw_number, "0004");
    }
}
