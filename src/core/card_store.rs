//! Thread-safe card storage
//!
//! This module provides the `CardStore` struct, the `university_cards` table
//! and its unique `card_number` index.
//!
//! # Design
//!
//! Cards live in a `DashMap` keyed by card id. Updates run a closure against a
//! copy of the row while the row's entry lock is held, and the copy is written
//! back only if the closure succeeds. A failed closure therefore leaves the row
//! exactly as it was, and two updates of the same card are serialized, so the
//! second always observes the first's committed state.

use crate::types::{Card, CardId, CardNumber, EntityType, LedgerError};
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};

/// Thread-safe card table
#[derive(Debug)]
pub struct CardStore {
    /// Cards by id
    pub(crate) cards: DashMap<CardId, Card>,

    /// Unique index: card number to card id
    pub(crate) numbers: DashMap<CardNumber, CardId>,

    next_id: AtomicU64,
}

impl CardStore {
    pub fn new() -> Self {
        Self {
            cards: DashMap::new(),
            numbers: DashMap::new(),
            next_id: AtomicU64::new(1),
        }
    }

    /// Reserve the next card id
    pub(crate) fn allocate_id(&self) -> CardId {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }

    /// Snapshot of a card
    pub fn get(&self, card_id: CardId) -> Option<Card> {
        self.cards.get(&card_id).map(|card| card.value().clone())
    }

    /// Card id registered for a card number
    pub fn find_by_number(&self, number: &CardNumber) -> Option<CardId> {
        self.numbers.get(number).map(|id| *id.value())
    }

    /// Update a card transactionally
    ///
    /// The closure receives a copy of the card while the card's entry lock is
    /// held. If it returns `Ok`, the copy replaces the stored row; if it returns
    /// `Err`, the stored row is untouched.
    ///
    /// # Arguments
    ///
    /// * `card_id` - The card to update
    /// * `f` - Closure computing the new row and a result value
    ///
    /// # Returns
    ///
    /// * `Ok(T)` - The closure's result, after the row was written back
    /// * `Err(LedgerError::NotFound)` - If the card does not exist
    /// * `Err(LedgerError)` - Whatever the closure returned
    pub fn update<T, F>(&self, card_id: CardId, f: F) -> Result<T, LedgerError>
    where
        F: FnOnce(&mut Card) -> Result<T, LedgerError>,
    {
        let mut entry = self
            .cards
            .get_mut(&card_id)
            .ok_or_else(|| LedgerError::not_found(EntityType::Card, card_id))?;

        let mut draft = entry.value().clone();
        let result = f(&mut draft)?;
        *entry.value_mut() = draft;
        Ok(result)
    }

    /// Number of cards
    pub fn len(&self) -> usize {
        self.cards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    /// Snapshot of all cards, sorted by card id
    pub fn all(&self) -> Vec<Card> {
        let mut cards: Vec<Card> = self.cards.iter().map(|c| c.value().clone()).collect();
        cards.sort_by_key(|card| card.card_id);
        cards
    }
}

impl Default for CardStore {
    fn default() -> Self {
        Self::new()
    }
}
