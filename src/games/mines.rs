//! Mines: `Playing -> Cashed | Lost` over a 25-cell grid.
//!
//! Mine positions are drawn without replacement at round creation via the
//! uniform shuffle. Reveals are monotonic; the running multiplier compounds
//! the fair odds of each safe reveal, evaluated before the reveal decrements
//! the counts.

use crate::config::MinesConfig;
use crate::errors::{EngineError, EngineResult};
use crate::games::types::{Action, GameView, Outcome};
use crate::games::{Advance, GameState};
use crate::rng::RoundRng;
use crate::scheduler::TimerEvent;

/// Fixed grid size.
pub const GRID_CELLS: usize = 25;

/// Reject mine counts outside the configured allowed set.
pub fn validate(mine_count: u8, config: &MinesConfig) -> EngineResult<()> {
    if mine_count < config.min_mines || mine_count > config.max_mines {
        return Err(EngineError::InvalidParams(format!(
            "mine_count must lie within {}..={}",
            config.min_mines, config.max_mines
        )));
    }
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Playing,
    Finished,
}

pub(crate) struct MinesRound {
    mine_count: u8,
    is_mine: [bool; GRID_CELLS],
    revealed: [bool; GRID_CELLS],
    revealed_count: u8,
    multiplier: f64,
    phase: Phase,
}

impl MinesRound {
    pub(crate) fn new(rng: &RoundRng, mine_count: u8) -> Self {
        let mut cells: [u8; GRID_CELLS] = std::array::from_fn(|i| i as u8);
        rng.shuffle(&mut cells);

        let mut is_mine = [false; GRID_CELLS];
        for &cell in cells.iter().take(mine_count as usize) {
            is_mine[cell as usize] = true;
        }

        Self {
            mine_count,
            is_mine,
            revealed: [false; GRID_CELLS],
            revealed_count: 0,
            multiplier: 1.0,
            phase: Phase::Playing,
        }
    }

    fn safe_cells(&self) -> u8 {
        GRID_CELLS as u8 - self.mine_count
    }

    fn reveal(&mut self, cell: u8) -> EngineResult<Advance> {
        if cell as usize >= GRID_CELLS {
            return Err(EngineError::InvalidParams(format!(
                "cell index {} outside the {}-cell grid",
                cell, GRID_CELLS
            )));
        }
        if self.revealed[cell as usize] {
            return Err(EngineError::InvalidTransition {
                phase: self.phase_name().to_string(),
                action: Action::RevealCell { cell }.to_string(),
            });
        }

        if self.is_mine[cell as usize] {
            self.phase = Phase::Finished;
            // Terminal view shows the whole grid.
            self.revealed = [true; GRID_CELLS];
            return Ok(Advance::Settle {
                outcome: Outcome::Lose,
                multiplier: 0.0,
            });
        }

        // Fair odds of surviving this reveal, with counts taken before the
        // reveal itself: remaining / remaining_safe.
        let remaining = (GRID_CELLS as u8 - self.revealed_count) as f64;
        let remaining_safe = (self.safe_cells() - self.revealed_count) as f64;
        self.multiplier *= remaining / remaining_safe;

        self.revealed[cell as usize] = true;
        self.revealed_count += 1;

        if self.revealed_count == self.safe_cells() {
            // No legal reveal remains; the board is cleared.
            return Ok(self.cash_out());
        }
        Ok(Advance::Continue { arm: None })
    }

    fn cash_out(&mut self) -> Advance {
        self.phase = Phase::Finished;
        self.revealed = [true; GRID_CELLS];
        Advance::Settle {
            outcome: Outcome::Win,
            multiplier: self.multiplier,
        }
    }

    #[cfg(test)]
    fn is_mine_at(&self, cell: u8) -> bool {
        self.is_mine[cell as usize]
    }
}

impl GameState for MinesRound {
    fn phase_name(&self) -> &'static str {
        match self.phase {
            Phase::Playing => "playing",
            Phase::Finished => "finished",
        }
    }

    fn apply(&mut self, action: &Action, _rng: &RoundRng) -> EngineResult<Advance> {
        if self.phase != Phase::Playing {
            return Err(EngineError::InvalidTransition {
                phase: self.phase_name().to_string(),
                action: action.to_string(),
            });
        }
        match action {
            Action::RevealCell { cell } => self.reveal(*cell),
            Action::CashOut => Ok(self.cash_out()),
            other => Err(EngineError::InvalidTransition {
                phase: self.phase_name().to_string(),
                action: other.to_string(),
            }),
        }
    }

    fn on_timer(&mut self, _event: TimerEvent, _rng: &RoundRng) -> Option<Advance> {
        // Mines has no timed transitions.
        None
    }

    fn view(&self) -> GameView {
        let terminal = self.phase == Phase::Finished;
        GameView::Mines {
            mine_count: self.mine_count,
            revealed: (0..GRID_CELLS as u8)
                .filter(|&c| self.revealed[c as usize])
                .collect(),
            mines: terminal.then(|| {
                (0..GRID_CELLS as u8)
                    .filter(|&c| self.is_mine[c as usize])
                    .collect()
            }),
            multiplier: self.multiplier,
        }
    }
}
