use std::collections::BTreeMap;

use crate::config::{MAX_TABLE_SIZE, MIN_TABLE_SIZE};
use crate::error::{AppError, Result};
use crate::types::{HandRecord, Position};

/// Position labels clockwise from the button, indexed by table size.
/// Short tables drop the early positions first; heads-up labels the small blind BTN.
fn position_table(table_size: usize) -> &'static [Position] {
    use Position::*;
    match table_size {
        2 => &[Button, BigBlind],
        3 => &[Button, SmallBlind, BigBlind],
        4 => &[Button, SmallBlind, BigBlind, Cutoff],
        5 => &[Button, SmallBlind, BigBlind, Hijack, Cutoff],
        6 => &[Button, SmallBlind, BigBlind, Utg, Hijack, Cutoff],
        7 => &[Button, SmallBlind, BigBlind, Utg, Lojack, Hijack, Cutoff],
        8 => &[Button, SmallBlind, BigBlind, Utg, Utg1, Lojack, Hijack, Cutoff],
        _ => &[Button, SmallBlind, BigBlind, Utg, Utg1, Utg2, Lojack, Hijack, Cutoff],
    }
}

/// Map every occupied seat to its position for one hand.
///
/// `seats` may be given in any order; clockwise means ascending seat number, wrapping.
/// A button on an empty seat (dead button) moves to the nearest occupied seat
/// counter-clockwise. Fails with `InvalidTableSize` outside 2..=9 occupied seats.
pub fn assign(hand_id: &str, seats: &[u8], button_seat: u8) -> Result<BTreeMap<u8, Position>> {
    let mut order: Vec<u8> = seats.to_vec();
    order.sort_unstable();
    order.dedup();

    let table_size = order.len();
    if !(MIN_TABLE_SIZE..=MAX_TABLE_SIZE).contains(&table_size) {
        return Err(AppError::InvalidTableSize {
            hand_id: hand_id.to_string(),
            seats: table_size,
        });
    }

    let button_idx = order
        .iter()
        .rposition(|&s| s <= button_seat)
        .unwrap_or(table_size - 1);

    let table = position_table(table_size);
    Ok((0..table_size)
        .map(|offset| (order[(button_idx + offset) % table_size], table[offset]))
        .collect())
}

/// Convenience wrapper over `assign` for a whole hand.
pub fn assign_hand(hand: &HandRecord) -> Result<BTreeMap<u8, Position>> {
    let seats: Vec<u8> = hand.seats.keys().copied().collect();
    assign(&hand.id, &seats, hand.button_seat)
}

#[cfg(test)]
mod tests {
    use super::*;
    use Position::*;

    #[test]
    fn six_max_button_on_seat_three() {
        let positions = assign("h1", &[1, 2, 3, 4, 5, 6], 3).unwrap();
        assert_eq!(positions[&3], Button);
        assert_eq!(positions[&4], SmallBlind);
        assert_eq!(positions[&5], BigBlind);
        assert_eq!(positions[&6], Utg);
        assert_eq!(positions[&1], Hijack);
        assert_eq!(positions[&2], Cutoff);
    }

    #[test]
    fn full_ring_uses_every_position_once() {
        let positions = assign("h1", &[1, 2, 3, 4, 5, 6, 7, 8, 9], 9).unwrap();
        let mut labels: Vec<Position> = positions.values().copied().collect();
        labels.sort();
        assert_eq!(labels, Position::ALL.to_vec());
        assert_eq!(positions[&9], Button);
        assert_eq!(positions[&1], SmallBlind);
        assert_eq!(positions[&2], BigBlind);
        assert_eq!(positions[&8], Cutoff);
    }

    #[test]
    fn heads_up_is_button_and_big_blind() {
        let positions = assign("h1", &[2, 7], 7).unwrap();
        assert_eq!(positions[&7], Button);
        assert_eq!(positions[&2], BigBlind);
    }

    #[test]
    fn every_table_size_assigns_each_seat() {
        for size in 2..=9u8 {
            let seats: Vec<u8> = (1..=size).collect();
            let positions = assign("h", &seats, 1).unwrap();
            assert_eq!(positions.len(), size as usize);
            assert_eq!(positions[&1], Button);
        }
    }

    #[test]
    fn non_contiguous_seats_wrap_clockwise() {
        let positions = assign("h1", &[2, 5, 9], 9).unwrap();
        assert_eq!(positions[&9], Button);
        assert_eq!(positions[&2], SmallBlind);
        assert_eq!(positions[&5], BigBlind);
    }

    #[test]
    fn dead_button_moves_counter_clockwise() {
        let positions = assign("h1", &[1, 4, 6], 5).unwrap();
        assert_eq!(positions[&4], Button);
        assert_eq!(positions[&6], SmallBlind);
        assert_eq!(positions[&1], BigBlind);

        // Below the lowest seat wraps to the highest.
        let positions = assign("h1", &[3, 4, 6], 1).unwrap();
        assert_eq!(positions[&6], Button);
    }

    #[test]
    fn table_size_out_of_range_fails() {
        let err = assign("h9", &[1], 1).unwrap_err();
        assert!(matches!(err, AppError::InvalidTableSize { seats: 1, .. }));

        let seats: Vec<u8> = (1..=10).collect();
        let err = assign("h10", &seats, 1).unwrap_err();
        assert!(matches!(err, AppError::InvalidTableSize { seats: 10, .. }));
    }
}
