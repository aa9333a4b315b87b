use rand::{seq::SliceRandom, Rng};

/// Shuffle every card the observer cannot see and deal the pool back to the
/// other players, preserving each hand's size. Used to build one concrete
/// determinization of a hidden information game: the observer's own hand is
/// never touched and no card is created or lost.
pub fn redeal_unseen_hands<T: Copy>(observer: usize, hands: &mut [Vec<T>], rng: &mut impl Rng) {
    // Pre-allocate so we don't spend time growing the pool
    let mut unseen: Vec<T> = Vec::with_capacity(hands.iter().map(|hand| hand.len()).sum());
    for (player, hand) in hands.iter().enumerate() {
        if player != observer {
            unseen.extend(hand.iter().copied());
        }
    }

    unseen.shuffle(rng);

    for (player, hand) in hands.iter_mut().enumerate() {
        if player != observer {
            for card in hand.iter_mut() {
                *card = unseen.pop().expect("there should be a card left to pop");
            }
        }
    }

    // All the unseen cards were redistributed
    assert!(unseen.is_empty());
}
