//! Card-related types
//!
//! A card is the prepaid balance carrier owned by exactly one student.

use super::actor::UserId;
use super::error::LedgerError;
use super::student::StudentId;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Card identifier, assigned by the system
pub type CardId = u64;

/// Length of a card number: 4 letters followed by 5 digits
pub const CARD_NUMBER_LEN: usize = 9;

/// Unique printed card number in the format `LLLLNNNNN`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CardNumber(String);

impl CardNumber {
    /// Parse and validate a card number
    ///
    /// The input must be exactly four uppercase ASCII letters followed by
    /// five ASCII digits.
    pub fn parse(value: &str) -> Result<Self, LedgerError> {
        let bytes = value.as_bytes();
        let valid = bytes.len() == CARD_NUMBER_LEN
            && bytes[..4].iter().all(u8::is_ascii_uppercase)
            && bytes[4..].iter().all(u8::is_ascii_digit);

        if !valid {
            return Err(LedgerError::validation(
                "card_number",
                format!("'{value}' must be 4 uppercase letters followed by 5 digits"),
            ));
        }
        Ok(CardNumber(value.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CardNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for CardNumber {
    type Error = LedgerError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        CardNumber::parse(&value)
    }
}

impl From<CardNumber> for String {
    fn from(value: CardNumber) -> Self {
        value.0
    }
}

/// University card state
///
/// The balance column is only ever written by provisioning (initial `0.00`)
/// and by the balance ledger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Card {
    pub card_id: CardId,

    /// Owning student (one-to-one)
    pub student_id: StudentId,

    pub card_number: CardNumber,

    /// Current balance, never negative, scale 2
    pub balance: Decimal,

    /// Whether the card has been marked as used
    pub used: bool,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub created_by: UserId,
    pub updated_by: UserId,
}

/// Direction of a balance adjustment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    /// Credit funds to the card
    Add,

    /// Debit funds from the card (admin only)
    Subtract,
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Add => "add",
            Operation::Subtract => "subtract",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of a successful balance adjustment
///
/// This is the one canonical shape returned by the ledger, so callers can
/// report the delta without re-reading the card.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BalanceChange {
    pub card_id: CardId,
    pub previous_balance: Decimal,
    pub new_balance: Decimal,
    pub amount: Decimal,
    pub operation: Operation,
}
