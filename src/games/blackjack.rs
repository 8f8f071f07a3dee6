//! Blackjack: `PlayerTurn -> DealerTurn -> Finished`.
//!
//! The deck is a fresh 52-card Fisher-Yates shuffle per round, drawn without
//! replacement. The dealer is fully mechanical: one card per scheduled tick
//! until reaching the stand score. The hole card stays out of every view
//! until the dealer's turn begins.

use crate::config::BlackjackConfig;
use crate::errors::{EngineError, EngineResult};
use crate::games::types::{Action, GameView, Outcome};
use crate::games::{Advance, GameState};
use crate::rng::RoundRng;
use crate::scheduler::TimerEvent;
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Suit {
    Hearts,
    Diamonds,
    Clubs,
    Spades,
}

const SUITS: [Suit; 4] = [Suit::Hearts, Suit::Diamonds, Suit::Clubs, Suit::Spades];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Rank {
    Two,
    Three,
    Four,
    Five,
    Six,
    Seven,
    Eight,
    Nine,
    Ten,
    Jack,
    Queen,
    King,
    Ace,
}

const RANKS: [Rank; 13] = [
    Rank::Two,
    Rank::Three,
    Rank::Four,
    Rank::Five,
    Rank::Six,
    Rank::Seven,
    Rank::Eight,
    Rank::Nine,
    Rank::Ten,
    Rank::Jack,
    Rank::Queen,
    Rank::King,
    Rank::Ace,
];

impl Rank {
    /// Face value before ace devaluation: face cards 10, ace 11.
    pub fn value(&self) -> u8 {
        match self {
            Rank::Two => 2,
            Rank::Three => 3,
            Rank::Four => 4,
            Rank::Five => 5,
            Rank::Six => 6,
            Rank::Seven => 7,
            Rank::Eight => 8,
            Rank::Nine => 9,
            Rank::Ten | Rank::Jack | Rank::Queen | Rank::King => 10,
            Rank::Ace => 11,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Card {
    pub suit: Suit,
    pub rank: Rank,
}

/// Hand score with aces devalued from 11 to 1 while the hand would bust.
pub fn hand_score(cards: &[Card]) -> u8 {
    let mut score: u8 = cards.iter().map(|c| c.rank.value()).sum();
    let mut high_aces = cards.iter().filter(|c| c.rank == Rank::Ace).count();
    while score > 21 && high_aces > 0 {
        score -= 10;
        high_aces -= 1;
    }
    score
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    PlayerTurn,
    DealerTurn,
    Finished,
}

pub(crate) struct BlackjackRound {
    deck: Vec<Card>,
    player: Vec<Card>,
    dealer: Vec<Card>,
    phase: Phase,
    natural: bool,
    dealer_stand_score: u8,
    dealer_tick: Duration,
}

impl BlackjackRound {
    /// Shuffle a fresh deck and deal the opening hands. The wager has already
    /// been debited by the time this runs.
    pub(crate) fn new(rng: &RoundRng, config: &BlackjackConfig) -> Self {
        let mut deck: Vec<Card> = SUITS
            .iter()
            .flat_map(|&suit| RANKS.iter().map(move |&rank| Card { suit, rank }))
            .collect();
        rng.shuffle(&mut deck);

        let mut round = Self {
            deck,
            player: Vec::with_capacity(8),
            dealer: Vec::with_capacity(8),
            phase: Phase::PlayerTurn,
            natural: false,
            dealer_stand_score: config.dealer_stand_score,
            dealer_tick: Duration::from_millis(config.dealer_tick_ms),
        };

        // Alternating deal, player first.
        for _ in 0..2 {
            round.deal_to_player();
            round.deal_to_dealer();
        }
        round.natural = hand_score(&round.player) == 21;
        round
    }

    fn deal_to_player(&mut self) {
        if let Some(card) = self.deck.pop() {
            self.player.push(card);
        }
    }

    fn deal_to_dealer(&mut self) {
        if let Some(card) = self.deck.pop() {
            self.dealer.push(card);
        }
    }

    fn stand(&mut self) -> Advance {
        self.phase = Phase::DealerTurn;
        Advance::Continue {
            arm: Some((TimerEvent::DealerTick, self.dealer_tick)),
        }
    }

    /// Showdown once the dealer has stood: bust or lower score loses.
    fn showdown(&mut self) -> Advance {
        self.phase = Phase::Finished;
        let player = hand_score(&self.player);
        let dealer = hand_score(&self.dealer);
        let (outcome, multiplier) = if dealer > 21 || player > dealer {
            (Outcome::Win, 2.0)
        } else if player == dealer {
            (Outcome::Push, 1.0)
        } else {
            (Outcome::Lose, 0.0)
        };
        Advance::Settle {
            outcome,
            multiplier,
        }
    }

    fn invalid(&self, action: &Action) -> EngineError {
        EngineError::InvalidTransition {
            phase: self.phase_name().to_string(),
            action: action.to_string(),
        }
    }
}

impl GameState for BlackjackRound {
    fn phase_name(&self) -> &'static str {
        match self.phase {
            Phase::PlayerTurn => "player_turn",
            Phase::DealerTurn => "dealer_turn",
            Phase::Finished => "finished",
        }
    }

    fn apply(&mut self, action: &Action, _rng: &RoundRng) -> EngineResult<Advance> {
        if self.phase != Phase::PlayerTurn {
            return Err(self.invalid(action));
        }
        match action {
            Action::Hit => {
                self.deal_to_player();
                if hand_score(&self.player) > 21 {
                    self.phase = Phase::Finished;
                    Ok(Advance::Settle {
                        outcome: Outcome::Lose,
                        multiplier: 0.0,
                    })
                } else {
                    Ok(Advance::Continue { arm: None })
                }
            }
            Action::Stand => Ok(self.stand()),
            other => Err(self.invalid(other)),
        }
    }

    fn on_timer(&mut self, event: TimerEvent, _rng: &RoundRng) -> Option<Advance> {
        match (event, self.phase) {
            // Abandoned hand: resolve deterministically as a forced stand.
            (TimerEvent::PlayerTurnTimeout, Phase::PlayerTurn) => Some(self.stand()),
            (TimerEvent::DealerTick, Phase::DealerTurn) => {
                if hand_score(&self.dealer) >= self.dealer_stand_score {
                    return Some(self.showdown());
                }
                self.deal_to_dealer();
                if hand_score(&self.dealer) >= self.dealer_stand_score {
                    Some(self.showdown())
                } else {
                    Some(Advance::Continue {
                        arm: Some((TimerEvent::DealerTick, self.dealer_tick)),
                    })
                }
            }
            _ => None,
        }
    }

    fn view(&self) -> GameView {
        let hole_card_hidden = self.phase == Phase::PlayerTurn;
        let dealer_cards = if hole_card_hidden {
            self.dealer.first().map(|c| vec![*c]).unwrap_or_default()
        } else {
            self.dealer.clone()
        };
        GameView::Blackjack {
            player_cards: self.player.clone(),
            player_score: hand_score(&self.player),
            dealer_cards,
            dealer_score: (!hole_card_hidden).then(|| hand_score(&self.dealer)),
            hole_card_hidden,
            natural: self.natural,
        }
    }
}
