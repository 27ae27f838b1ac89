//! Classement des combinaisons de loterie par retard de leurs sous-combinaisons.
//!
//! Historique → index de retard → score de chaque combinaison → top-L borné →
//! sélection diversifiée.

pub mod combinations;
pub mod config;
pub mod diversity;
pub mod error;
pub mod index;
pub mod run;
pub mod scorer;
pub mod source;
pub mod topk;

pub use combinations::SubsetKey;
pub use config::{RunParams, ScoreMode, PROGRESS_BATCH};
pub use diversity::{select_diverse, SelectedEntry};
pub use error::RankError;
pub use index::RecencyIndex;
pub use run::{
    run_ranking, CancelToken, DiversifiedResult, ProgressEvent, RankingResult, RunController,
    RunHandle, RunOutcome, RunStatus,
};
pub use scorer::{CandidateScore, CandidateScorer, ScoredCandidate, SubsetGap};
pub use source::DrawSource;
pub use topk::{TopEntry, TopKSelector};
