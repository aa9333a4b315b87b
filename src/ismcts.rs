/*
Information Set Monte Carlo Tree Search.

One persistent tree is grown across many determinizations of the root
player's information set: every iteration re-randomizes the hidden cards,
then runs the usual select / expand / simulate / backpropagate cycle
against that concrete state. Selection uses UCB1 with an availability
correction, since a child can be legal (available) in many more
determinizations than it is actually visited in.
*/

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use std::fmt::Debug;
use thiserror::Error;

/// Exploration constant for UCB1, approximately sqrt(2) / 2
pub const DEFAULT_EXPLORATION: f64 = 0.7;

const ROOT: usize = 0;

/// The contract a game must offer to be searchable: cloning, hiding-aware
/// re-randomization, legal move enumeration, move application and a result
/// per player once the playout is over.
pub trait Game: Clone {
    type Move: Copy + PartialEq + Debug;
    type PlayerTag: Copy + Debug;
    type MoveList: IntoIterator<Item = Self::Move>;

    /// Reshuffle everything the observer cannot see into a fresh concrete
    /// state drawn from their information set.
    fn randomize_determination(&mut self, observer: Self::PlayerTag, rng: &mut StdRng);
    fn current_player(&self) -> Self::PlayerTag;
    fn available_moves(&self) -> Self::MoveList;
    fn make_move(&mut self, mov: &Self::Move);
    /// `None` while the game is still in progress
    fn result(&self, player: Self::PlayerTag) -> Option<f64>;
}

#[derive(Debug, Error, PartialEq)]
pub enum MctsError {
    #[error("no legal child to select; expansion must run before selection can fail")]
    EmptySelection,
}

/// One explored move. Nodes live in a flat arena owned by the handler and
/// refer to each other by index; `parent` is only ever walked upward during
/// backpropagation.
#[derive(Debug, Clone)]
struct Node<M, P> {
    mov: Option<M>, // None only for the root
    parent: Option<usize>,
    children: Vec<usize>,
    mover: Option<P>, // the player whose move led to this node
    wins: f64,
    visits: u32,
    avails: u32,
}

impl<M, P> Node<M, P> {
    fn root() -> Self {
        Node {
            mov: None,
            parent: None,
            children: vec![],
            mover: None,
            wins: 0.0,
            visits: 0,
            avails: 1,
        }
    }
}

/// Per-root-child statistics, for diagnostics and driver output.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RootStat<M> {
    pub mov: M,
    pub visits: u32,
    pub avails: u32,
    pub wins: f64,
}

pub struct IsmctsHandler<G: Game> {
    root_state: G,
    nodes: Vec<Node<G::Move, G::PlayerTag>>,
    rng: StdRng,
    exploration: f64,
}

impl<G: Game> IsmctsHandler<G> {
    pub fn new(root_state: G) -> Self {
        Self::with_rng(root_state, StdRng::from_entropy())
    }

    /// Fixed seed, for reproducible searches
    pub fn with_seed(root_state: G, seed: u64) -> Self {
        Self::with_rng(root_state, StdRng::seed_from_u64(seed))
    }

    fn with_rng(root_state: G, rng: StdRng) -> Self {
        IsmctsHandler {
            root_state,
            nodes: vec![Node::root()],
            rng,
            exploration: DEFAULT_EXPLORATION,
        }
    }

    pub fn run_iterations(&mut self, iterations: usize) -> Result<(), MctsError> {
        for _ in 0..iterations {
            self.run_iteration()?;
        }
        Ok(())
    }

    fn run_iteration(&mut self) -> Result<(), MctsError> {
        let mut node = ROOT;

        // Determinize
        let mut state = self.root_state.clone();
        state.randomize_determination(state.current_player(), &mut self.rng);

        // Select: descend while the node is fully expanded and non-terminal
        let mut legal: Vec<G::Move> = state.available_moves().into_iter().collect();
        while !legal.is_empty() && self.untried_moves(node, &legal).is_empty() {
            node = self.select_child(node, &legal)?;
            let mov = self.nodes[node].mov.expect("non-root nodes record a move");
            state.make_move(&mov);
            legal = state.available_moves().into_iter().collect();
        }

        // Expand: grow exactly one child for a random untried move
        let untried = self.untried_moves(node, &legal);
        if let Some(&mov) = untried.choose(&mut self.rng) {
            let mover = state.current_player();
            state.make_move(&mov);
            node = self.add_child(node, mov, mover);
        }

        // Simulate: uniformly random playout to the end of the round
        loop {
            let moves: Vec<G::Move> = state.available_moves().into_iter().collect();
            match moves.choose(&mut self.rng) {
                Some(mov) => state.make_move(mov),
                None => break,
            }
        }

        // Backpropagate the terminal result up to the root
        let mut current = Some(node);
        while let Some(index) = current {
            self.nodes[index].visits += 1;
            if let Some(mover) = self.nodes[index].mover {
                let result = state
                    .result(mover)
                    .expect("playouts always end in a terminal state");
                self.nodes[index].wins += result;
            }
            current = self.nodes[index].parent;
        }
        Ok(())
    }

    /// The most visited root move, the robust child. Visit counts are less
    /// noisy than win averages at small sample sizes.
    pub fn best_move(&self) -> Option<G::Move> {
        self.nodes[ROOT]
            .children
            .iter()
            .copied()
            .max_by_key(|&child| self.nodes[child].visits)
            .and_then(|child| self.nodes[child].mov)
    }

    pub fn root_stats(&self) -> Vec<RootStat<G::Move>> {
        self.nodes[ROOT]
            .children
            .iter()
            .map(|&child| {
                let node = &self.nodes[child];
                RootStat {
                    mov: node.mov.expect("non-root nodes record a move"),
                    visits: node.visits,
                    avails: node.avails,
                    wins: node.wins,
                }
            })
            .collect()
    }

    fn untried_moves(&self, node: usize, legal_moves: &[G::Move]) -> Vec<G::Move> {
        legal_moves
            .iter()
            .copied()
            .filter(|&mov| {
                !self.nodes[node]
                    .children
                    .iter()
                    .any(|&child| self.nodes[child].mov == Some(mov))
            })
            .collect()
    }

    fn select_child(
        &mut self,
        node: usize,
        legal_moves: &[G::Move],
    ) -> Result<usize, MctsError> {
        let legal_children: Vec<usize> = self.nodes[node]
            .children
            .iter()
            .copied()
            .filter(|&child| {
                legal_moves
                    .iter()
                    .any(|&mov| self.nodes[child].mov == Some(mov))
            })
            .collect();
        let selected = legal_children
            .iter()
            .copied()
            .max_by(|&a, &b| {
                self.ucb1(a)
                    .partial_cmp(&self.ucb1(b))
                    .expect("ucb1 scores are finite")
            })
            .ok_or(MctsError::EmptySelection)?;

        // Every legal child was available this determinization, selected or
        // not; later iterations must see the updated counts
        for &child in &legal_children {
            self.nodes[child].avails += 1;
        }
        Ok(selected)
    }

    fn ucb1(&self, node: usize) -> f64 {
        let node = &self.nodes[node];
        let visits = node.visits as f64;
        node.wins / visits + self.exploration * ((node.avails as f64).ln() / visits).sqrt()
    }

    fn add_child(&mut self, parent: usize, mov: G::Move, mover: G::PlayerTag) -> usize {
        let child = self.nodes.len();
        self.nodes.push(Node {
            mov: Some(mov),
            parent: Some(parent),
            children: vec![],
            mover: Some(mover),
            wins: 0.0,
            visits: 0,
            avails: 1,
        });
        self.nodes[parent].children.push(child);
        child
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::games::coinche::CoincheGame;

    #[test]
    fn test_root_visits_equal_iterations() {
        let game = CoincheGame::with_seed(5);
        let mut ismcts = IsmctsHandler::with_seed(game, 1);
        ismcts.run_iterations(50).unwrap();
        assert_eq!(ismcts.nodes[ROOT].visits, 50);
    }

    #[test]
    fn test_child_visits_never_exceed_avails() {
        let game = CoincheGame::with_seed(5);
        let mut ismcts = IsmctsHandler::with_seed(game, 2);
        ismcts.run_iterations(200).unwrap();
        for node in &ismcts.nodes[1..] {
            assert!(node.visits <= node.avails);
            assert!(node.avails >= 1);
        }
    }

    #[test]
    fn test_best_move_is_legal() {
        let game = CoincheGame::with_seed(9);
        let legal = game.get_moves();
        let mut ismcts = IsmctsHandler::with_seed(game, 3);
        ismcts.run_iterations(100).unwrap();
        let best = ismcts.best_move().unwrap();
        assert!(legal.contains(&best));
    }

    #[test]
    fn test_best_move_is_the_most_visited_root_child() {
        let game = CoincheGame::with_seed(13);
        let mut ismcts = IsmctsHandler::with_seed(game, 4);
        ismcts.run_iterations(150).unwrap();
        let stats = ismcts.root_stats();
        let most_visited = stats.iter().map(|stat| stat.visits).max().unwrap();
        let best = ismcts.best_move().unwrap();
        let best_stat = stats.iter().find(|stat| stat.mov == best).unwrap();
        assert_eq!(best_stat.visits, most_visited);
    }

    #[test]
    fn test_same_seed_returns_same_move() {
        let game = CoincheGame::with_seed(17);
        let mut first = IsmctsHandler::with_seed(game.clone(), 42);
        let mut second = IsmctsHandler::with_seed(game, 42);
        first.run_iterations(200).unwrap();
        second.run_iterations(200).unwrap();
        assert_eq!(first.best_move(), second.best_move());
    }

    #[test]
    fn test_every_root_child_move_is_distinct() {
        let game = CoincheGame::with_seed(23);
        let mut ismcts = IsmctsHandler::with_seed(game, 6);
        ismcts.run_iterations(100).unwrap();
        let stats = ismcts.root_stats();
        for (i, a) in stats.iter().enumerate() {
            for b in &stats[i + 1..] {
                assert_ne!(a.mov, b.mov);
            }
        }
    }
}
