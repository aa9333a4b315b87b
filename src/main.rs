use coinche_rs::games::coinche::{CoincheGame, Card, Suit, MAX_ROUND_SCORE, NUM_PLAYERS};
use coinche_rs::ismcts::IsmctsHandler;
use colored::Colorize;
use rand::{seq::SliceRandom, thread_rng};
use std::time::Instant;

fn main() {
    // let _ = random_play();
    ismcts_play();
}

fn print_card(card: Card) -> String {
    let string = card.to_string();
    match card.suit {
        Suit::Hearts | Suit::Diamonds => string.red().to_string(),
        Suit::Spades | Suit::Clubs => string.normal().to_string(),
    }
}

fn display_game(game: &CoincheGame) {
    println!("Round {} | Atout: {}", game.current_round, game.atout.symbol());
    for (player, hand) in game.hands.iter().enumerate() {
        println!(
            "P{}: {}",
            player,
            hand.iter()
                .map(|card| print_card(*card))
                .collect::<Vec<_>>()
                .join(" ")
        );
    }
    println!(
        "current trick: {}",
        game.current_trick
            .iter()
            .map(|(player, card)| format!("P{}:{}", player, print_card(*card)))
            .collect::<Vec<_>>()
            .join(" ")
    );
    println!(
        "current scores: {:?} | scores: {:?}",
        game.current_scores, game.scores
    );
    println!("---");
}

fn ismcts_play() {
    let mut game = CoincheGame::new();
    while !game.round_over() {
        display_game(&game);
        let mut ismcts = IsmctsHandler::new(game.clone());
        ismcts
            .run_iterations(1000)
            .expect("the tree always has a selectable child after expansion");
        for stat in ismcts.root_stats() {
            println!(
                "  {} visits: {:4} avails: {:4} wins: {:.1}",
                print_card(stat.mov),
                stat.visits,
                stat.avails,
                stat.wins
            );
        }
        let mov = ismcts.best_move().expect("should have a move to make");
        println!("Player {} plays {}\n", game.current_player, print_card(mov));
        game.apply_move(mov).expect("search only returns legal moves");
    }
    println!(
        "Round over, {} points split {:?}",
        MAX_ROUND_SCORE, game.current_scores
    );
    for player in 0..NUM_PLAYERS {
        println!("Player {} result: {:.3}", player, game.result_for(player));
    }
    println!("{}", serde_json::to_string(&game).unwrap());
}

#[allow(dead_code)]
fn random_play() {
    let start = Instant::now();
    for _ in 0..10000 {
        let mut game = CoincheGame::new();
        while !game.round_over() {
            let mov = *game
                .get_moves()
                .choose(&mut thread_rng())
                .expect("should have a move to make");
            game.apply_move(mov).expect("moves come from get_moves");
        }
    }
    let duration = start.elapsed();
    println!("Time elapsed for 10,000 rounds in Rust: {:?}", duration);
}
