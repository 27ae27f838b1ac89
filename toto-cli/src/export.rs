use anyhow::{Context, Result};
use std::path::Path;
use toto_db::models::Draw;
use toto_rank::{SelectedEntry, TopEntry};

use crate::display::{format_combination, format_subsets};

fn writer(path: &Path) -> Result<csv::Writer<std::fs::File>> {
    csv::Writer::from_path(path).with_context(|| format!("Impossible de créer {:?}", path))
}

fn entry_fields(entry: &TopEntry) -> [String; 4] {
    [
        format_combination(&entry.numbers),
        format!("{:.2}", entry.avg_gap),
        entry.min_gap.to_string(),
        format_subsets(&entry.subsets),
    ]
}

/// Historique complet, case vide pour un numéro absent.
pub fn export_draws(draws: &[Draw], path: &Path) -> Result<usize> {
    let mut wtr = writer(path)?;
    wtr.write_record(["Draw", "#1", "#2", "#3", "#4", "#5", "#6"])?;
    for draw in draws {
        let mut record = vec![draw.draw_number.clone()];
        record.extend(draw.numbers.iter().map(|n| n.map(|v| v.to_string()).unwrap_or_default()));
        wtr.write_record(&record)?;
    }
    wtr.flush()?;
    Ok(draws.len())
}

pub fn export_top(entries: &[TopEntry], path: &Path) -> Result<()> {
    let mut wtr = writer(path)?;
    wtr.write_record(["Combination", "Average Rank", "MinValue", "Subsets"])?;
    for entry in entries {
        wtr.write_record(entry_fields(entry))?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn export_selected(selected: &[SelectedEntry], path: &Path) -> Result<()> {
    let mut wtr = writer(path)?;
    wtr.write_record(["Number", "Combination", "Average Rank", "MinValue", "Subsets"])?;
    for pick in selected {
        let [combo, avg, min, subsets] = entry_fields(&pick.entry);
        wtr.write_record([pick.number.to_string(), combo, avg, min, subsets])?;
    }
    wtr.flush()?;
    Ok(())
}
