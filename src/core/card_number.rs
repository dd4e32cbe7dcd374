//! Card number generation
//!
//! Card numbers are 4 uppercase letters drawn uniformly at random followed by
//! 5 digits drawn uniformly at random (leading zeros allowed). The generator
//! is pure: it knows nothing about existing cards.

use super::traits::CardNumberSource;
use crate::types::CardNumber;
use rand::Rng;

/// Generate a card number from the given random source
pub fn generate<R: Rng + ?Sized>(rng: &mut R) -> CardNumber {
    let mut code = String::with_capacity(crate::types::card::CARD_NUMBER_LEN);
    for _ in 0..4 {
        code.push(char::from(rng.random_range(b'A'..=b'Z')));
    }
    for _ in 0..5 {
        code.push(char::from(rng.random_range(b'0'..=b'9')));
    }

    // Every character was drawn from the valid alphabet above
    CardNumber::parse(&code).unwrap_or_else(|_| unreachable!("generated card number {code}"))
}

/// Card number source backed by the thread-local random generator
#[derive(Debug, Default, Clone, Copy)]
pub struct RandomCardNumbers;

impl CardNumberSource for RandomCardNumbers {
    fn next_number(&self) -> CardNumber {
        generate(&mut rand::rng())
    }
}
