use anyhow::Result;
use toto_db::db;
use toto_db::models::Draw;
use toto_db::rusqlite::Connection;

/// Read-only access to the ordered draw history.
pub trait DrawSource {
    fn total_draw_count(&self) -> Result<u32>;
    /// The `limit` oldest draws, oldest first.
    fn fetch_oldest_draws(&self, limit: u32) -> Result<Vec<Draw>>;
}

impl DrawSource for Connection {
    fn total_draw_count(&self) -> Result<u32> {
        db::count_draws(self)
    }

    fn fetch_oldest_draws(&self, limit: u32) -> Result<Vec<Draw>> {
        db::fetch_oldest_draws(self, limit)
    }
}

impl DrawSource for [Draw] {
    fn total_draw_count(&self) -> Result<u32> {
        Ok(self.len() as u32)
    }

    fn fetch_oldest_draws(&self, limit: u32) -> Result<Vec<Draw>> {
        Ok(self.iter().take(limit as usize).cloned().collect())
    }
}

pub fn clamp_offset(offset: u32, total: u32) -> u32 {
    offset.min(total)
}

/// Tous les tirages sauf les `offset` plus récents, en une seule lecture.
pub fn load_window<S: DrawSource + ?Sized>(source: &S, offset: u32) -> Result<Vec<Draw>> {
    let total = source.total_draw_count()?;
    let used = total - clamp_offset(offset, total);
    if used == 0 {
        return Ok(Vec::new());
    }
    source.fetch_oldest_draws(used)
}

/// Same windowing over an in-memory history.
pub fn window_of(history: &[Draw], offset: u32) -> &[Draw] {
    let total = history.len();
    let offset = (offset as usize).min(total);
    &history[..total - offset]
}

#[cfg(test)]
mod tests {
    use super::*;
    use toto_db::models::Game;

    fn history(n: usize) -> Vec<Draw> {
        (0..n)
            .map(|i| Draw {
                id: i as i64 + 1,
                draw_number: format!("{:04}", i + 1),
                numbers: [Some(i as u8 + 1), Some(20), Some(21), Some(22), Some(23), Some(24)],
            })
            .collect()
    }

    #[test]
    fn test_clamp_offset() {
        assert_eq!(clamp_offset(3, 10), 3);
        assert_eq!(clamp_offset(30, 10), 10);
    }

    #[test]
    fn test_window_of_excludes_most_recent() {
        let h = history(5);
        let w = window_of(&h, 2);
        assert_eq!(w.len(), 3);
        assert_eq!(w.last().unwrap().draw_number, "0003");
        assert!(window_of(&h, 5).is_empty());
        assert!(window_of(&h, 99).is_empty());
        assert_eq!(window_of(&h, 0).len(), 5);
    }

    #[test]
    fn test_load_window_from_slice() {
        let h = history(4);
        let w = load_window(&h[..], 1).unwrap();
        assert_eq!(w.len(), 3);
        assert_eq!(w[0].draw_number, "0001");
        assert!(load_window(&h[..], 4).unwrap().is_empty());
    }

    #[test]
    fn test_load_window_from_sqlite() {
        let conn = Connection::open_in_memory().unwrap();
        db::migrate(&conn).unwrap();
        for i in 0..6 {
            db::insert_draw(&conn, &[Some(i + 1), Some(10), Some(11), Some(12), Some(13), None], Game::Toto642, None)
                .unwrap();
        }
        let w = load_window(&conn, 2).unwrap();
        assert_eq!(w.len(), 4);
        assert_eq!(w[3].numbers[0], Some(4));
        assert_eq!(w[0].numbers[5], None);
        assert!(load_window(&conn, 6).unwrap().is_empty());
    }
}
