//! Payment credentials exchanged during checkout.
//!
//! Credentials are a sum type discriminated by their `type` field and are
//! resolved once at deserialization. Both parties handling card credentials
//! must be PCI DSS compliant.

use serde::{Deserialize, Serialize};

/// Kind of card number carried by a card credential.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CardNumberType {
    /// Funding primary account number.
    Fpan,
    NetworkToken,
    /// Device primary account number.
    Dpan,
}

/// Raw card details.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardCredential {
    pub card_number_type: CardNumberType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiry_month: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiry_year: Option<u16>,
    /// Cardholder name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cvc: Option<String>,
    /// Network token cryptogram.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cryptogram: Option<String>,
    /// Electronic commerce indicator for network tokens.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub eci_value: Option<String>,
}

/// An opaque token issued by a payment handler.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenCredential {
    pub token: String,
}

/// A payment credential, tagged by `type`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PaymentCredential {
    Card(CardCredential),
    Token(TokenCredential),
}

impl PaymentCredential {
    /// The `type` discriminator as it appears on the wire.
    pub fn kind(&self) -> &'static str {
        match self {
            PaymentCredential::Card(_) => "card",
            PaymentCredential::Token(_) => "token",
        }
    }

    pub fn as_card(&self) -> Option<&CardCredential> {
        match self {
            PaymentCredential::Card(card) => Some(card),
            PaymentCredential::Token(_) => None,
        }
    }

    /// Last four digits of the card number, if this is a card with a number.
    pub fn last_digits(&self) -> Option<&str> {
        let number = self.as_card()?.number.as_deref()?;
        number.get(number.len().checked_sub(4)?..)
    }
}
