use thiserror::Error;

#[derive(Error, Debug)]
pub enum RankError {
    #[error("Paramètre invalide : {0}")]
    InvalidParameter(String),

    #[error("Lecture de l'historique impossible : {0}")]
    Source(#[from] anyhow::Error),

    #[error("Worker d'analyse : {0}")]
    Worker(String),
}

pub type Result<T> = std::result::Result<T, RankError>;
