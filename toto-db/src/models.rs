use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

pub const NUMBERS_PER_DRAW: usize = 6;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Draw {
    pub id: i64,
    pub draw_number: String,
    pub numbers: [Option<u8>; NUMBERS_PER_DRAW],
}

impl Draw {
    /// Numéros renseignés, dans l'ordre des colonnes.
    pub fn present_numbers(&self) -> Vec<u8> {
        self.numbers.iter().flatten().copied().collect()
    }

    pub fn is_complete(&self) -> bool {
        self.numbers.iter().all(Option::is_some)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
pub enum Game {
    #[default]
    #[serde(rename = "6_42")]
    #[value(name = "6_42")]
    Toto642,
    #[serde(rename = "6_49")]
    #[value(name = "6_49")]
    Toto649,
}

impl Game {
    pub fn max_number(&self) -> u8 {
        match self {
            Game::Toto642 => 42,
            Game::Toto649 => 49,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Game::Toto642 => "Toto 6/42",
            Game::Toto649 => "Toto 6/49",
        }
    }

    pub fn db_file(&self) -> &'static str {
        match self {
            Game::Toto642 => "toto_6_42_draws.db",
            Game::Toto649 => "toto_6_49_draws.db",
        }
    }
}

impl std::fmt::Display for Game {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Ramène chaque numéro présent dans [1, max] ; les cases vides restent vides.
pub fn clamp_numbers(numbers: &[Option<i64>; NUMBERS_PER_DRAW], game: Game) -> [Option<u8>; NUMBERS_PER_DRAW] {
    let max = game.max_number() as i64;
    let mut cleaned = [None; NUMBERS_PER_DRAW];
    for (slot, n) in cleaned.iter_mut().zip(numbers) {
        *slot = n.map(|v| v.clamp(1, max) as u8);
    }
    cleaned
}

pub fn validate_numbers(numbers: &[u8], game: Game) -> Result<()> {
    let max = game.max_number();
    if numbers.len() > NUMBERS_PER_DRAW {
        bail!("Trop de numéros : {} (maximum {})", numbers.len(), NUMBERS_PER_DRAW);
    }
    for &n in numbers {
        if n < 1 || n > max {
            bail!("Numéro {} hors limites (1-{})", n, max);
        }
    }
    for i in 0..numbers.len() {
        for j in (i + 1)..numbers.len() {
            if numbers[i] == numbers[j] {
                bail!("Numéro en double : {}", numbers[i]);
            }
        }
    }
    Ok(())
}
