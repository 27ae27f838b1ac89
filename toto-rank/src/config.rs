use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};
use toto_db::models::Game;

use crate::combinations::{binomial, MAX_UNIVERSE};
use crate::error::{RankError, Result};

/// Candidates processed between two progress reports.
pub const PROGRESS_BATCH: u64 = 50_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ScoreMode {
    /// Plus petit retard parmi les sous-combinaisons
    #[default]
    Min,
    /// Retard moyen des sous-combinaisons
    Avg,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunParams {
    pub max_number: u8,
    /// Taille des combinaisons candidates.
    pub j: usize,
    /// Taille des sous-combinaisons indexées.
    pub k: usize,
    pub mode: ScoreMode,
    pub top_l: usize,
    /// 0 désactive la sélection diversifiée.
    pub diversity_count: usize,
    /// Nombre de tirages les plus récents exclus de la fenêtre.
    pub history_offset: u32,
    #[serde(default)]
    pub parallel: bool,
}

impl Default for RunParams {
    fn default() -> Self {
        Self::for_game(Game::default())
    }
}

impl RunParams {
    pub fn for_game(game: Game) -> Self {
        Self {
            max_number: game.max_number(),
            j: 6,
            k: 3,
            mode: ScoreMode::Min,
            top_l: 1,
            diversity_count: 0,
            history_offset: 0,
            parallel: false,
        }
    }

    pub fn validate(&self) -> Result<()> {
        let invalid = |msg: String| Err(RankError::InvalidParameter(msg));
        if self.max_number == 0 || self.max_number > MAX_UNIVERSE {
            return invalid(format!("max_number={} hors de 1..={}", self.max_number, MAX_UNIVERSE));
        }
        if self.k == 0 {
            return invalid("k doit être au moins 1".to_string());
        }
        if self.k > self.j {
            return invalid(format!("k={} supérieur à j={}", self.k, self.j));
        }
        if self.j > self.max_number as usize {
            return invalid(format!("j={} supérieur à max_number={}", self.j, self.max_number));
        }
        if self.top_l == 0 {
            return invalid("top_l doit être au moins 1".to_string());
        }
        if self.candidate_total().is_none() {
            return invalid(format!("C({}, {}) dépasse la capacité d'énumération", self.max_number, self.j));
        }
        if self.subsets_per_candidate().is_none() {
            return invalid(format!("C({}, {}) dépasse la capacité d'énumération", self.j, self.k));
        }
        Ok(())
    }

    /// C(max_number, j).
    pub fn candidate_total(&self) -> Option<u64> {
        binomial(self.max_number as u64, self.j as u64)
    }

    /// C(j, k).
    pub fn subsets_per_candidate(&self) -> Option<u64> {
        binomial(self.j as u64, self.k as u64)
    }

    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("Impossible de lire {:?}", path))?;
        let params: RunParams = serde_json::from_str(&json)
            .with_context(|| format!("JSON invalide dans {:?}", path))?;
        Ok(params)
    }

    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json).with_context(|| format!("Impossible d'écrire {:?}", path))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_params() {
        let params = RunParams::default();
        assert_eq!(params.max_number, 42);
        assert_eq!((params.j, params.k), (6, 3));
        assert_eq!(params.mode, ScoreMode::Min);
        assert_eq!(params.top_l, 1);
        assert_eq!(params.diversity_count, 0);
        assert!(params.validate().is_ok());
    }

    #[test]
    fn test_candidate_total() {
        let params = RunParams::for_game(Game::Toto649);
        assert_eq!(params.candidate_total(), Some(13_983_816));
        assert_eq!(params.subsets_per_candidate(), Some(20));
    }

    #[test]
    fn test_validate_rejects_bad_sizes() {
        let base = RunParams::default();

        let p = RunParams { k: 0, ..base.clone() };
        assert!(matches!(p.validate(), Err(RankError::InvalidParameter(_))));

        let p = RunParams { k: 7, ..base.clone() };
        assert!(matches!(p.validate(), Err(RankError::InvalidParameter(_))));

        let p = RunParams { j: 43, ..base.clone() };
        assert!(matches!(p.validate(), Err(RankError::InvalidParameter(_))));

        let p = RunParams { top_l: 0, ..base.clone() };
        assert!(matches!(p.validate(), Err(RankError::InvalidParameter(_))));

        let p = RunParams { max_number: 0, j: 0, k: 0, ..base };
        assert!(matches!(p.validate(), Err(RankError::InvalidParameter(_))));
    }

    #[test]
    fn test_validate_rejects_unenumerable_space() {
        let p = RunParams { max_number: 128, j: 64, k: 1, ..RunParams::default() };
        assert!(matches!(p.validate(), Err(RankError::InvalidParameter(_))));
    }

    #[test]
    fn test_diversity_zero_is_valid() {
        let p = RunParams { diversity_count: 0, history_offset: 10_000, ..RunParams::default() };
        assert!(p.validate().is_ok());
    }

    #[test]
    fn test_params_json_roundtrip() {
        let params = RunParams {
            mode: ScoreMode::Avg,
            top_l: 25,
            diversity_count: 5,
            ..RunParams::for_game(Game::Toto649)
        };
        let path = std::env::temp_dir().join("toto_rank_params_test.json");
        params.save(&path).unwrap();
        let restored = RunParams::load(&path).unwrap();
        assert_eq!(restored, params);
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_mode_serde_lowercase() {
        assert_eq!(serde_json::to_string(&ScoreMode::Avg).unwrap(), "\"avg\"");
    }
}
