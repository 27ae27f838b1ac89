use std::ops::ControlFlow;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, TryLockError};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use rayon::prelude::*;
use toto_db::models::Draw;

use crate::config::{RunParams, PROGRESS_BATCH};
use crate::diversity::{select_diverse, SelectedEntry};
use crate::error::{RankError, Result};
use crate::index::RecencyIndex;
use crate::scorer::{CandidateScore, CandidateScorer, Partition};
use crate::source::{load_window, window_of, DrawSource};
use crate::topk::{TopEntry, TopKSelector};

/// Cooperative stop signal shared between the caller and the worker.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    #[inline]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ProgressEvent {
    pub processed: u64,
    pub total: u64,
}

#[derive(Debug, Clone)]
pub struct RankingResult {
    pub entries: Vec<TopEntry>,
    pub elapsed: Duration,
    pub evaluated: u64,
    pub window_size: usize,
}

#[derive(Debug, Clone)]
pub struct DiversifiedResult {
    pub entries: Vec<SelectedEntry>,
}

#[derive(Debug, Clone)]
pub enum RunOutcome {
    Completed {
        ranking: RankingResult,
        diversified: Option<DiversifiedResult>,
    },
    Cancelled,
    /// La fenêtre ne contient aucun tirage.
    Empty,
}

/// Runs the whole pipeline on the calling thread. `history` is the full ordered
/// history; the most recent `params.history_offset` draws are left out.
pub fn run_ranking(
    params: &RunParams,
    history: &[Draw],
    cancel: &CancelToken,
    progress: &(dyn Fn(ProgressEvent) + Sync),
) -> Result<RunOutcome> {
    params.validate()?;
    Ok(execute(params, window_of(history, params.history_offset), cancel, progress))
}

fn execute(
    params: &RunParams,
    window: &[Draw],
    cancel: &CancelToken,
    progress: &(dyn Fn(ProgressEvent) + Sync),
) -> RunOutcome {
    let start = Instant::now();
    if window.is_empty() {
        log::info!("Fenêtre vide : aucune analyse");
        return RunOutcome::Empty;
    }
    if cancel.is_cancelled() {
        return RunOutcome::Cancelled;
    }

    let index = RecencyIndex::build(window, params.k);
    if cancel.is_cancelled() {
        return RunOutcome::Cancelled;
    }

    let scorer = CandidateScorer::from_params(&index, params);
    let total = scorer.total();
    log::info!(
        "Analyse j={} k={} mode={:?} sur {} tirages : {} combinaisons, {} sous-combinaisons indexées",
        params.j,
        params.k,
        params.mode,
        window.len(),
        total,
        index.len()
    );

    let selected = if params.parallel {
        scan_parallel(&scorer, params.top_l, cancel, progress)
    } else {
        scan_sequential(&scorer, params.top_l, cancel, progress)
    };
    let Some(selector) = selected else {
        log::info!("Analyse annulée");
        return RunOutcome::Cancelled;
    };
    progress(ProgressEvent { processed: total, total });

    let entries = selector.into_sorted();
    let diversified = (params.diversity_count > 0).then(|| DiversifiedResult {
        entries: select_diverse(&entries, params.diversity_count),
    });
    let elapsed = start.elapsed();
    log::info!("Analyse terminée en {:.1}s", elapsed.as_secs_f64());

    RunOutcome::Completed {
        ranking: RankingResult {
            entries,
            elapsed,
            evaluated: total,
            window_size: window.len(),
        },
        diversified,
    }
}

#[inline]
fn consider(selector: &mut TopKSelector, scorer: &CandidateScorer<'_>, ordinal: u64, combo: &[u8], score: CandidateScore) {
    let value = score.value(scorer.mode());
    if selector.admits(value) {
        selector.offer(TopEntry::new(ordinal, value, combo.to_vec(), score, scorer.breakdown(combo)));
    }
}

/// `None` si l'analyse a été annulée.
fn scan_sequential(
    scorer: &CandidateScorer<'_>,
    top_l: usize,
    cancel: &CancelToken,
    progress: &(dyn Fn(ProgressEvent) + Sync),
) -> Option<TopKSelector> {
    let total = scorer.total();
    let mut selector = TopKSelector::new(top_l);
    let mut processed = 0u64;

    let flow = scorer.scan(|ordinal, combo, score| {
        if cancel.is_cancelled() {
            return ControlFlow::Break(());
        }
        processed += 1;
        if processed % PROGRESS_BATCH == 0 {
            progress(ProgressEvent { processed, total });
            if cancel.is_cancelled() {
                return ControlFlow::Break(());
            }
        }
        consider(&mut selector, scorer, ordinal, combo, score);
        ControlFlow::Continue(())
    });

    match flow {
        ControlFlow::Continue(()) => Some(selector),
        ControlFlow::Break(()) => None,
    }
}

/// One partition per leading number, scored on the rayon pool. Each partition keeps its
/// own top-L; merging by (score desc, ordinal asc) gives the sequential result.
fn scan_parallel(
    scorer: &CandidateScorer<'_>,
    top_l: usize,
    cancel: &CancelToken,
    progress: &(dyn Fn(ProgressEvent) + Sync),
) -> Option<TopKSelector> {
    let total = scorer.total();
    let processed = AtomicU64::new(0);

    let scan_one = |part: &Partition| -> Option<TopKSelector> {
        let mut selector = TopKSelector::new(top_l);
        let mut pending = 0u64;
        let flow = scorer.scan_partition(part, |ordinal, combo, score| {
            if cancel.is_cancelled() {
                return ControlFlow::Break(());
            }
            pending += 1;
            if pending == PROGRESS_BATCH {
                let done = processed.fetch_add(pending, Ordering::Relaxed) + pending;
                pending = 0;
                progress(ProgressEvent { processed: done, total });
                if cancel.is_cancelled() {
                    return ControlFlow::Break(());
                }
            }
            consider(&mut selector, scorer, ordinal, combo, score);
            ControlFlow::Continue(())
        });
        processed.fetch_add(pending, Ordering::Relaxed);
        match flow {
            ControlFlow::Continue(()) => Some(selector),
            ControlFlow::Break(()) => None,
        }
    };

    let partials: Option<Vec<TopKSelector>> = scorer.partitions().par_iter().map(scan_one).collect();
    partials.map(|parts| parts.into_iter().fold(TopKSelector::new(top_l), TopKSelector::merge))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Running,
    Completed,
    Cancelled,
    Empty,
    /// Le thread d'analyse s'est arrêté sans produire de résultat.
    Failed,
}

#[derive(Debug)]
struct RunState {
    cancel: CancelToken,
    processed: AtomicU64,
    total: u64,
    outcome: Mutex<Option<RunOutcome>>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Handle on a run executing on its own worker thread. Clones share the same run.
#[derive(Debug, Clone)]
pub struct RunHandle {
    state: Arc<RunState>,
}

impl RunHandle {
    /// Starts `params` over an already loaded window.
    pub fn spawn(params: RunParams, window: Vec<Draw>) -> Result<Self> {
        params.validate()?;
        let state = Arc::new(RunState {
            cancel: CancelToken::new(),
            processed: AtomicU64::new(0),
            total: params.candidate_total().unwrap_or(0),
            outcome: Mutex::new(None),
            worker: Mutex::new(None),
        });

        if window.is_empty() {
            *lock(&state.outcome) = Some(RunOutcome::Empty);
            return Ok(Self { state });
        }

        Self::launch(state, move |cancel, on_progress| execute(&params, &window, cancel, on_progress))
    }

    fn launch<F>(state: Arc<RunState>, job: F) -> Result<Self>
    where
        F: FnOnce(&CancelToken, &(dyn Fn(ProgressEvent) + Sync)) -> RunOutcome + Send + 'static,
    {
        let worker_state = Arc::clone(&state);
        let worker = std::thread::Builder::new()
            .name("toto-run".to_string())
            .spawn(move || {
                let on_progress = |event: ProgressEvent| {
                    worker_state.processed.fetch_max(event.processed, Ordering::Relaxed);
                };
                let outcome = job(&worker_state.cancel, &on_progress);
                *lock(&worker_state.outcome) = Some(outcome);
            })
            .map_err(|e| RankError::Worker(e.to_string()))?;
        *lock(&state.worker) = Some(worker);

        Ok(Self { state })
    }

    fn recorded_status(&self) -> Option<RunStatus> {
        lock(&self.state.outcome).as_ref().map(|outcome| match outcome {
            RunOutcome::Completed { .. } => RunStatus::Completed,
            RunOutcome::Cancelled => RunStatus::Cancelled,
            RunOutcome::Empty => RunStatus::Empty,
        })
    }

    /// `false` while the thread runs or while another caller is joining it.
    fn worker_stopped(&self) -> bool {
        let stopped = |worker: &Option<JoinHandle<()>>| worker.as_ref().map_or(true, JoinHandle::is_finished);
        match self.state.worker.try_lock() {
            Ok(worker) => stopped(&worker),
            Err(TryLockError::Poisoned(poisoned)) => stopped(&poisoned.into_inner()),
            Err(TryLockError::WouldBlock) => false,
        }
    }

    pub fn status(&self) -> RunStatus {
        if let Some(status) = self.recorded_status() {
            return status;
        }
        if !self.worker_stopped() {
            return RunStatus::Running;
        }
        // Le résultat a pu être publié juste avant la fin du thread.
        self.recorded_status().unwrap_or(RunStatus::Failed)
    }

    pub fn is_finished(&self) -> bool {
        self.status() != RunStatus::Running
    }

    pub fn progress(&self) -> ProgressEvent {
        ProgressEvent {
            processed: self.state.processed.load(Ordering::Relaxed),
            total: self.state.total,
        }
    }

    /// Résultat disponible sans attendre, `None` tant que le calcul tourne.
    pub fn result(&self) -> Option<RunOutcome> {
        lock(&self.state.outcome).clone()
    }

    pub fn cancel(&self) {
        self.state.cancel.cancel();
    }

    /// Blocks until the worker has fully stopped.
    pub fn wait(&self) -> Result<RunOutcome> {
        {
            let mut worker = lock(&self.state.worker);
            if let Some(handle) = worker.take() {
                handle
                    .join()
                    .map_err(|_| RankError::Worker("le thread d'analyse a paniqué".to_string()))?;
            }
        }
        self.result()
            .ok_or_else(|| RankError::Worker("aucun résultat produit".to_string()))
    }
}

/// Keeps at most one run in progress: starting a new run cancels the active one and
/// waits for it to stop first.
#[derive(Debug, Default)]
pub struct RunController {
    active: Option<RunHandle>,
}

impl RunController {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validates `params` and reads the window synchronously, then starts the worker.
    pub fn start<S: DrawSource + ?Sized>(&mut self, params: RunParams, source: &S) -> Result<RunHandle> {
        params.validate()?;

        if let Some(previous) = self.active.take() {
            if !previous.is_finished() {
                log::info!("Annulation de l'analyse en cours");
                previous.cancel();
            }
            if let Err(e) = previous.wait() {
                log::warn!("Analyse précédente interrompue : {}", e);
            }
        }

        let window = load_window(source, params.history_offset)?;
        log::debug!("Fenêtre chargée : {} tirages", window.len());
        let handle = RunHandle::spawn(params, window)?;
        self.active = Some(handle.clone());
        Ok(handle)
    }

    pub fn current(&self) -> Option<&RunHandle> {
        self.active.as_ref()
    }

    pub fn cancel(&self) {
        if let Some(active) = &self.active {
            active.cancel();
        }
    }
}
