use comfy_table::{presets::UTF8_FULL, Cell, Color, ContentArrangement, Table};

use crate::import::ImportResult;
use toto_db::models::Draw;
use toto_rank::{RankingResult, SelectedEntry, SubsetGap, TopEntry};

/// "(1, 2, 3)"
pub fn format_combination(numbers: &[u8]) -> String {
    let inner = numbers.iter().map(|n| n.to_string()).collect::<Vec<_>>().join(", ");
    format!("({inner})")
}

/// "[((1, 2, 3), 5), ((1, 2, 4), 0)]"
pub fn format_subsets(subsets: &[SubsetGap]) -> String {
    let inner = subsets
        .iter()
        .map(|s| format!("({}, {})", s.subset, s.gap))
        .collect::<Vec<_>>()
        .join(", ");
    format!("[{inner}]")
}

pub fn display_draws(draws: &[Draw]) {
    if draws.is_empty() {
        println!("Aucun tirage à afficher.");
        return;
    }

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec!["Id", "Tirage", "#1", "#2", "#3", "#4", "#5", "#6"]);

    for draw in draws {
        let mut row = vec![Cell::new(draw.id), Cell::new(&draw.draw_number)];
        for n in &draw.numbers {
            row.push(match n {
                Some(n) => Cell::new(format!("{:2}", n)),
                None => Cell::new("—").fg(Color::DarkGrey),
            });
        }
        table.add_row(row);
    }

    println!("{table}");
}

pub fn display_import_summary(result: &ImportResult) {
    println!("Import terminé :");
    println!("  Total lignes lues : {}", result.total_records);
    println!("  Insérés           : {}", result.inserted);
    if result.errors > 0 {
        println!("  Erreurs           : {}", result.errors);
    }
}

fn entry_cells(entry: &TopEntry) -> Vec<Cell> {
    vec![
        Cell::new(format_combination(&entry.numbers)).fg(Color::Green),
        Cell::new(format!("{:.2}", entry.avg_gap)),
        Cell::new(entry.min_gap),
        Cell::new(format_subsets(&entry.subsets)),
    ]
}

pub fn display_ranking(ranking: &RankingResult) {
    println!(
        "\n🏆 Meilleures combinaisons ({} évaluées sur {} tirages)\n",
        ranking.evaluated, ranking.window_size
    );

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec!["Combinaison", "Rang moyen", "Valeur min", "Sous-combinaisons"]);

    for entry in &ranking.entries {
        table.add_row(entry_cells(entry));
    }
    println!("{table}");
    println!("Durée : {:.2}s", ranking.elapsed.as_secs_f64());
}

pub fn display_selection(selected: &[SelectedEntry], requested: usize) {
    println!("\n🎯 Sélection diversifiée ({}/{})\n", selected.len(), requested);
    if selected.is_empty() {
        println!("Aucune combinaison retenue.");
        return;
    }

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec!["#", "Combinaison", "Rang moyen", "Valeur min", "Sous-combinaisons"]);

    for pick in selected {
        let mut row = vec![Cell::new(pick.number)];
        row.extend(entry_cells(&pick.entry));
        table.add_row(row);
    }
    println!("{table}");
}
