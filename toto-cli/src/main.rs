mod display;
mod export;
mod import;

use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};

use crate::display::{display_draws, display_import_summary, display_ranking, display_selection};
use toto_db::db::{
    count_draws, db_path, delete_draws, fetch_all_draws, fetch_draws_page, insert_draw, migrate,
    open_db, reorder_draws, swap_draws, update_draw,
};
use toto_db::models::{validate_numbers, Game, NUMBERS_PER_DRAW};
use toto_db::rusqlite::Connection;
use toto_rank::{RunController, RunOutcome, RunParams, ScoreMode};

#[derive(Parser)]
#[command(name = "toto", about = "Classement des combinaisons Toto par retard")]
struct Cli {
    /// Jeu : 6_42 ou 6_49
    #[arg(short, long, global = true, default_value = "6_42")]
    game: Game,

    /// Chemin de la base (par défaut data/<jeu>.db)
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Importer les tirages depuis un fichier CSV
    Import {
        /// Chemin vers le fichier CSV (ligne d'en-tête, six premières colonnes)
        #[arg(short, long)]
        file: PathBuf,

        /// Vider la table avant l'import
        #[arg(long)]
        replace: bool,
    },

    /// Exporter tous les tirages en CSV
    Export {
        #[arg(short, long)]
        file: PathBuf,
    },

    /// Afficher le chemin de la base de données
    DbPath,

    /// Lister les tirages, du plus ancien au plus récent
    List {
        #[arg(short, long, default_value = "20")]
        limit: u32,

        #[arg(short, long, default_value = "0")]
        offset: u32,
    },

    /// Ajouter un tirage manuellement
    Add {
        /// Insérer juste après ce tirage (par défaut : en fin de table)
        #[arg(long)]
        after: Option<i64>,
    },

    /// Remplacer les six numéros d'un tirage ("-" pour une case vide)
    Update {
        id: i64,
        #[arg(num_args = NUMBERS_PER_DRAW, allow_hyphen_values = true)]
        numbers: Vec<String>,
    },

    /// Supprimer des tirages
    Delete {
        #[arg(required = true)]
        ids: Vec<i64>,
    },

    /// Échanger la position de deux tirages
    Move { id1: i64, id2: i64 },

    /// Réordonner toute la table selon la liste d'identifiants
    Reorder {
        #[arg(required = true)]
        ids: Vec<i64>,
    },

    /// Classer les combinaisons par retard de leurs sous-combinaisons
    Analyze {
        /// Taille des combinaisons candidates
        #[arg(short)]
        j: Option<usize>,

        /// Taille des sous-combinaisons
        #[arg(short)]
        k: Option<usize>,

        /// Mode de score
        #[arg(short)]
        m: Option<ScoreMode>,

        /// Nombre de combinaisons conservées
        #[arg(short)]
        l: Option<usize>,

        /// Nombre de combinaisons diversifiées (0 = aucune)
        #[arg(short)]
        n: Option<usize>,

        /// Tirages les plus récents exclus
        #[arg(long)]
        offset: Option<u32>,

        /// Évaluation parallèle (rayon)
        #[arg(long)]
        parallel: bool,

        /// Écrire le classement en CSV
        #[arg(long)]
        top_csv: Option<PathBuf>,

        /// Écrire la sélection diversifiée en CSV
        #[arg(long)]
        selected_csv: Option<PathBuf>,

        /// Charger les paramètres depuis un fichier JSON
        #[arg(long)]
        params: Option<PathBuf>,

        /// Sauvegarder les paramètres effectifs en JSON
        #[arg(long)]
        save_params: Option<PathBuf>,
    },
}

/// Options de `analyze`, appliquées par-dessus les paramètres de base.
struct AnalyzeArgs {
    j: Option<usize>,
    k: Option<usize>,
    m: Option<ScoreMode>,
    l: Option<usize>,
    n: Option<usize>,
    offset: Option<u32>,
    parallel: bool,
    top_csv: Option<PathBuf>,
    selected_csv: Option<PathBuf>,
    params: Option<PathBuf>,
    save_params: Option<PathBuf>,
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();
    let game = cli.game;
    let path = cli.db.unwrap_or_else(|| db_path(game));
    let conn = open_db(&path)?;
    migrate(&conn)?;

    match cli.command {
        Command::Import { file, replace } => cmd_import(&conn, &file, game, replace),
        Command::Export { file } => cmd_export(&conn, &file),
        Command::DbPath => {
            println!("{}", path.display());
            Ok(())
        }
        Command::List { limit, offset } => cmd_list(&conn, limit, offset),
        Command::Add { after } => cmd_add(&conn, game, after),
        Command::Update { id, numbers } => cmd_update(&conn, game, id, &numbers),
        Command::Delete { ids } => {
            let deleted = delete_draws(&conn, &ids)?;
            println!("{} tirage(s) supprimé(s).", deleted);
            Ok(())
        }
        Command::Move { id1, id2 } => {
            swap_draws(&conn, id1, id2)?;
            println!("Tirages {} et {} échangés.", id1, id2);
            Ok(())
        }
        Command::Reorder { ids } => cmd_reorder(&conn, &ids),
        Command::Analyze {
            j,
            k,
            m,
            l,
            n,
            offset,
            parallel,
            top_csv,
            selected_csv,
            params,
            save_params,
        } => cmd_analyze(
            &conn,
            game,
            AnalyzeArgs { j, k, m, l, n, offset, parallel, top_csv, selected_csv, params, save_params },
        ),
    }
}

fn cmd_import(conn: &Connection, file: &Path, game: Game, replace: bool) -> Result<()> {
    let result = import::import_csv(conn, file, game, replace)?;
    display_import_summary(&result);
    Ok(())
}

fn cmd_export(conn: &Connection, file: &Path) -> Result<()> {
    let draws = fetch_all_draws(conn)?;
    let written = export::export_draws(&draws, file)?;
    println!("{} tirage(s) exporté(s) vers {}", written, file.display());
    Ok(())
}

fn cmd_list(conn: &Connection, limit: u32, offset: u32) -> Result<()> {
    let n = count_draws(conn)?;
    if n == 0 {
        println!("Base vide. Lancez d'abord : toto import --file <CSV>");
        return Ok(());
    }
    let draws = fetch_draws_page(conn, limit, offset)?;
    display_draws(&draws);
    println!("{} tirage(s) au total", n);
    Ok(())
}

fn cmd_add(conn: &Connection, game: Game, after: Option<i64>) -> Result<()> {
    println!("Ajout d'un tirage ({})\n", game);

    let numbers = prompt_numbers(game)?;
    let mut row = [None; NUMBERS_PER_DRAW];
    for (slot, n) in row.iter_mut().zip(&numbers) {
        *slot = Some(*n as i64);
    }

    let confirm = prompt("\nConfirmer l'insertion ? (o/n) : ")?;
    if confirm.trim().to_lowercase() == "o" {
        let id = insert_draw(conn, &row, game, after)?;
        println!("Tirage inséré (id {}).", id);
    } else {
        println!("Insertion annulée.");
    }
    Ok(())
}

fn cmd_update(conn: &Connection, game: Game, id: i64, raw: &[String]) -> Result<()> {
    let numbers = parse_cells(raw)?;
    check_cells(&numbers, game)?;
    if !update_draw(conn, id, &numbers, game)? {
        bail!("Tirage {} introuvable", id);
    }
    println!("Tirage {} mis à jour.", id);
    Ok(())
}

fn cmd_reorder(conn: &Connection, ids: &[i64]) -> Result<()> {
    let n = count_draws(conn)? as usize;
    if ids.len() != n {
        bail!("L'ordre doit lister les {} tirages (reçu {})", n, ids.len());
    }
    reorder_draws(conn, ids)?;
    println!("Ordre mis à jour.");
    Ok(())
}

/// Paramètres de base (fichier JSON ou défauts du jeu) surchargés par les options.
fn resolve_params(game: Game, args: &AnalyzeArgs) -> Result<RunParams> {
    let mut params = match &args.params {
        Some(file) => RunParams::load(file)?,
        None => RunParams::for_game(game),
    };
    if params.max_number != game.max_number() {
        bail!(
            "Paramètres prévus pour max_number={}, incompatibles avec le jeu {} (1-{})",
            params.max_number,
            game,
            game.max_number()
        );
    }
    if let Some(j) = args.j {
        params.j = j;
    }
    if let Some(k) = args.k {
        params.k = k;
    }
    if let Some(m) = args.m {
        params.mode = m;
    }
    if let Some(l) = args.l {
        params.top_l = l;
    }
    if let Some(n) = args.n {
        params.diversity_count = n;
    }
    if let Some(offset) = args.offset {
        params.history_offset = offset;
    }
    params.parallel |= args.parallel;
    Ok(params)
}

fn cmd_analyze(conn: &Connection, game: Game, args: AnalyzeArgs) -> Result<()> {
    let params = resolve_params(game, &args)?;

    if let Some(file) = &args.save_params {
        params.save(file)?;
        println!("Paramètres sauvegardés dans {}", file.display());
    }

    let requested = params.diversity_count;
    let mut controller = RunController::new();
    let handle = controller.start(params, conn)?;

    let pb = ProgressBar::new(handle.progress().total);
    pb.set_style(
        ProgressStyle::with_template(
            "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta})",
        )
        .context("Gabarit de progression invalide")?
        .progress_chars("=> "),
    );
    while !handle.is_finished() {
        pb.set_position(handle.progress().processed);
        std::thread::sleep(Duration::from_millis(100));
    }
    let outcome = handle.wait()?;
    pb.set_position(handle.progress().processed);
    pb.finish_and_clear();

    match outcome {
        RunOutcome::Empty => {
            println!("Aucun tirage dans la fenêtre d'analyse. Lancez d'abord : toto import --file <CSV>");
        }
        RunOutcome::Cancelled => println!("Analyse annulée."),
        RunOutcome::Completed { ranking, diversified } => {
            display_ranking(&ranking);
            if let Some(file) = &args.top_csv {
                export::export_top(&ranking.entries, file)?;
                println!("Classement écrit dans {}", file.display());
            }
            if let Some(diversified) = diversified {
                display_selection(&diversified.entries, requested);
                if let Some(file) = &args.selected_csv {
                    export::export_selected(&diversified.entries, file)?;
                    println!("Sélection écrite dans {}", file.display());
                }
            } else if args.selected_csv.is_some() {
                log::warn!("--selected-csv ignoré : aucune sélection demandée (-n 0)");
            }
        }
    }
    Ok(())
}

/// "-" ou case vide = numéro absent.
fn parse_cells(raw: &[String]) -> Result<[Option<i64>; NUMBERS_PER_DRAW]> {
    if raw.len() != NUMBERS_PER_DRAW {
        bail!("Attendu {} valeurs, reçu {}", NUMBERS_PER_DRAW, raw.len());
    }
    let mut numbers = [None; NUMBERS_PER_DRAW];
    for (slot, cell) in numbers.iter_mut().zip(raw) {
        let cell = cell.trim();
        if cell.is_empty() || cell == "-" {
            continue;
        }
        *slot = Some(cell.parse::<i64>().with_context(|| format!("Numéro invalide : '{}'", cell))?);
    }
    Ok(numbers)
}

/// Plage et doublons vérifiés sur les valeurs saisies, avant tout ramenage dans [1, max].
fn check_cells(numbers: &[Option<i64>; NUMBERS_PER_DRAW], game: Game) -> Result<()> {
    let mut present = Vec::with_capacity(NUMBERS_PER_DRAW);
    for &n in numbers.iter().flatten() {
        match u8::try_from(n) {
            Ok(v) => present.push(v),
            Err(_) => bail!("Numéro {} hors limites (1-{})", n, game.max_number()),
        }
    }
    validate_numbers(&present, game)
}

fn prompt(msg: &str) -> Result<String> {
    print!("{}", msg);
    io::stdout().flush()?;
    let mut input = String::new();
    io::stdin()
        .read_line(&mut input)
        .context("Erreur de lecture")?;
    Ok(input.trim().to_string())
}

fn prompt_numbers(game: Game) -> Result<Vec<u8>> {
    let max = game.max_number();
    loop {
        let input = prompt(&format!("Numéros (1 à 6, séparés par des espaces, 1-{}) : ", max))?;
        let nums: Result<Vec<u8>, _> = input.split_whitespace().map(|s| s.parse::<u8>()).collect();
        match nums {
            Ok(mut v) if !v.is_empty() => {
                if validate_numbers(&v, game).is_ok() {
                    v.sort_unstable();
                    return Ok(v);
                }
                println!("Numéros invalides (1-{}, pas de doublons, 6 au plus). Réessayez.", max);
            }
            _ => println!("Entrez entre 1 et 6 numéros. Réessayez."),
        }
    }
}
