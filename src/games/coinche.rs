/*
Game: Coinche
A French partnership trick-taking game played with a 32 card deck.
Players 0 and 2 play against players 1 and 3. The trump suit (atout) is
drawn at random each round; bidding is not modeled.
*/

use enum_iterator::{all, Sequence};
use rand::rngs::StdRng;
use rand::{seq::SliceRandom, thread_rng, Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::ismcts::{self, IsmctsHandler};
use crate::utils::redeal_unseen_hands;

pub const NUM_PLAYERS: usize = 4;
pub const HAND_SIZE: usize = 8;
pub const JACK: i32 = 11;
pub const QUEEN: i32 = 12;
pub const KING: i32 = 13;
pub const ACE: i32 = 14;
/// 152 card points plus the 10 point bonus for the last trick
pub const MAX_ROUND_SCORE: i32 = 162;
const LAST_TRICK_BONUS: i32 = 10;

#[derive(Debug, Error, PartialEq)]
pub enum CoincheError {
    #[error("invalid rank {0}: must be between 7 and 14")]
    InvalidCard(i32),
    #[error("player {player} cannot play {card}: not in their hand")]
    IllegalMove { player: usize, card: Card },
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Sequence, Serialize, Deserialize, Default,
)]
pub enum Suit {
    #[default]
    Spades,
    Diamonds,
    Hearts,
    Clubs,
}

impl Suit {
    pub fn symbol(&self) -> &'static str {
        match self {
            Suit::Spades => "♠",
            Suit::Diamonds => "♦",
            Suit::Hearts => "♥",
            Suit::Clubs => "♣",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Card {
    pub rank: i32,
    pub suit: Suit,
}

impl Card {
    pub fn new(rank: i32, suit: Suit) -> Result<Self, CoincheError> {
        if !(7..=ACE).contains(&rank) {
            return Err(CoincheError::InvalidCard(rank));
        }
        Ok(Card { rank, suit })
    }

    /// Point value of the card for the round. Trump rank order differs
    /// from face order (the jack and nine outrank the ace).
    pub fn value(&self, atout: Suit) -> i32 {
        if self.suit == atout {
            match self.rank {
                JACK => 20,
                9 => 14,
                ACE => 11,
                10 => 10,
                KING => 4,
                QUEEN => 3,
                _ => 0,
            }
        } else {
            match self.rank {
                ACE => 11,
                10 => 10,
                KING => 4,
                QUEEN => 3,
                JACK => 2,
                _ => 0,
            }
        }
    }
}

impl fmt::Display for Card {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rank = match self.rank {
            JACK => "J".to_string(),
            QUEEN => "Q".to_string(),
            KING => "K".to_string(),
            ACE => "A".to_string(),
            rank => rank.to_string(),
        };
        write!(f, "{}{}", rank, self.suit.symbol())
    }
}

/// The standard 32 card deck: 8 ranks in each of the 4 suits.
pub fn deck() -> Vec<Card> {
    let mut cards = Vec::with_capacity(32);
    for suit in all::<Suit>() {
        for rank in 7..=ACE {
            cards.push(Card { rank, suit });
        }
    }
    cards
}

fn sort_hand(hand: &mut [Card]) {
    // Grouped by suit for readability only; legality never depends on order
    hand.sort_by_key(|card| (card.suit, card.rank));
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct CoincheGame {
    pub hands: [Vec<Card>; 4],
    pub atout: Suit,
    pub current_trick: Vec<(usize, Card)>,
    pub current_player: usize,
    pub current_round: i32,
    pub current_scores: [i32; 2], // team scores for the round in progress
    pub scores: [i32; 2],         // cumulative team scores over completed rounds
}

impl CoincheGame {
    pub fn new() -> Self {
        let mut game = Self::default();
        game.random_deal(&mut thread_rng());
        game
    }

    pub fn with_seed(seed: u64) -> Self {
        let mut game = Self::default();
        game.random_deal(&mut StdRng::seed_from_u64(seed));
        game
    }

    /// Start a new round: fold the round scores into the running totals,
    /// shuffle and deal 8 cards to each player and draw the atout. Redealing
    /// is always the caller's decision; finishing the 8th trick does not
    /// trigger it.
    pub fn random_deal(&mut self, rng: &mut impl Rng) {
        self.current_round += 1;
        self.current_player = rng.gen_range(0..NUM_PLAYERS);
        self.current_trick.clear();
        self.scores[0] += self.current_scores[0];
        self.scores[1] += self.current_scores[1];
        self.current_scores = [0, 0];

        let mut deck = deck();
        deck.shuffle(rng);
        for hand in self.hands.iter_mut() {
            *hand = deck.drain(..HAND_SIZE).collect();
            sort_hand(hand);
        }

        self.atout = all::<Suit>()
            .collect::<Vec<Suit>>()
            .choose(rng)
            .copied()
            .expect("there are four suits to draw the atout from");
    }

    /// All cards the player to move may legally play. Follow the lead suit
    /// when possible; otherwise trump, and among trumps beat the highest
    /// trump already played in this trick when able; otherwise anything.
    pub fn get_moves(&self) -> Vec<Card> {
        let hand = &self.hands[self.current_player];
        if self.current_trick.is_empty() {
            return hand.clone();
        }
        let (_, lead_card) = self.current_trick[0];

        let cards_in_suit: Vec<Card> = hand
            .iter()
            .copied()
            .filter(|card| card.suit == lead_card.suit)
            .collect();
        if !cards_in_suit.is_empty() {
            return cards_in_suit;
        }

        let cards_in_atout: Vec<Card> = hand
            .iter()
            .copied()
            .filter(|card| card.suit == self.atout)
            .collect();
        if cards_in_atout.is_empty() {
            // Cannot follow suit or trump, anything goes
            return hand.clone();
        }

        // Only trumps played in this trick matter for the overtrump rule
        let best_played_atout = self
            .current_trick
            .iter()
            .filter(|(_, card)| card.suit == self.atout)
            .map(|(_, card)| card.value(self.atout))
            .max();
        match best_played_atout {
            Some(best) => {
                let better_atout_cards: Vec<Card> = cards_in_atout
                    .iter()
                    .copied()
                    .filter(|card| card.value(self.atout) > best)
                    .collect();
                if better_atout_cards.is_empty() {
                    cards_in_atout
                } else {
                    better_atout_cards
                }
            }
            None => cards_in_atout,
        }
    }

    /// Play a card for the player to move. Callers must pick the card from
    /// `get_moves`; a card that is not even in the mover's hand is rejected.
    pub fn apply_move(&mut self, card: Card) -> Result<(), CoincheError> {
        let hand = &mut self.hands[self.current_player];
        let position = hand.iter().position(|&held| held == card).ok_or(
            CoincheError::IllegalMove {
                player: self.current_player,
                card,
            },
        )?;
        hand.remove(position);
        self.current_trick.push((self.current_player, card));
        self.current_player = (self.current_player + 1) % NUM_PLAYERS;

        if self.current_trick.len() == NUM_PLAYERS {
            self.resolve_trick();
        }
        Ok(())
    }

    fn resolve_trick(&mut self) {
        let (_, lead_card) = self.current_trick[0];
        let atout_plays: Vec<(usize, Card)> = self
            .current_trick
            .iter()
            .copied()
            .filter(|(_, card)| card.suit == self.atout)
            .collect();
        let contenders: Vec<(usize, Card)> = if atout_plays.is_empty() {
            self.current_trick
                .iter()
                .copied()
                .filter(|(_, card)| card.suit == lead_card.suit)
                .collect()
        } else {
            atout_plays
        };
        let (winner, _) = contenders
            .into_iter()
            .max_by_key(|(_, card)| card.value(self.atout))
            .expect("every trick contains its lead card");

        let mut points: i32 = self
            .current_trick
            .iter()
            .map(|(_, card)| card.value(self.atout))
            .sum();
        if self.hands[winner].is_empty() {
            // 10 de der: the winner of the last trick of the round
            points += LAST_TRICK_BONUS;
        }
        self.current_scores[winner % 2] += points;
        self.current_trick.clear();
        self.current_player = winner;
    }

    pub fn round_over(&self) -> bool {
        self.hands.iter().all(|hand| hand.is_empty())
    }

    /// Round score of the player's team, normalized by the 162 points at
    /// stake so it can be backpropagated directly.
    pub fn result_for(&self, player: usize) -> f64 {
        self.current_scores[player % 2] as f64 / MAX_ROUND_SCORE as f64
    }
}

impl fmt::Display for CoincheGame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Round {}", self.current_round)?;
        writeln!(f, " | Player to move: {}", self.current_player)?;
        for (player, hand) in self.hands.iter().enumerate() {
            let cards: Vec<String> = hand.iter().map(|card| card.to_string()).collect();
            writeln!(f, " | P{}: {}", player, cards.join(", "))?;
        }
        let trick: Vec<String> = self
            .current_trick
            .iter()
            .map(|(player, card)| format!("P{}:{}", player, card))
            .collect();
        writeln!(f, " | Current trick: {}", trick.join(", "))?;
        writeln!(f, " | Atout: {}", self.atout.symbol())?;
        writeln!(f, " | Scores: {:?}", self.scores)?;
        write!(f, " | Current scores: {:?}", self.current_scores)
    }
}

impl ismcts::Game for CoincheGame {
    type Move = Card;
    type PlayerTag = usize;
    type MoveList = Vec<Card>;

    fn randomize_determination(&mut self, observer: Self::PlayerTag, rng: &mut StdRng) {
        // The observer sees their own hand, the trick in progress and every
        // previously played card; the other three hands are interchangeable
        redeal_unseen_hands(observer, &mut self.hands, rng);
    }

    fn current_player(&self) -> Self::PlayerTag {
        self.current_player
    }

    fn available_moves(&self) -> Self::MoveList {
        self.get_moves()
    }

    fn make_move(&mut self, mov: &Self::Move) {
        self.apply_move(*mov)
            .expect("moves handed to make_move come from available_moves");
    }

    fn result(&self, player: Self::PlayerTag) -> Option<f64> {
        if self.round_over() {
            Some(self.result_for(player))
        } else {
            None
        }
    }
}

pub fn get_mcts_move(game: &CoincheGame, iterations: usize) -> Card {
    let mut ismcts = IsmctsHandler::new(game.clone());
    ismcts
        .run_iterations(iterations)
        .expect("expansion always precedes selection of a fresh determinization");
    ismcts.best_move().expect("should have a move to make")
}
