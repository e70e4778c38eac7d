//! Domain-specific error types.
//!
//! Manual `Display`/`Error` impls rather than a derive macro, matching the rest
//! of this library's error style; `thiserror` stays at the binary boundary.

use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistrationError {
    IdClashWithAuctionHouse,
    IdClashWithExistingTrader,
}

impl fmt::Display for RegistrationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegistrationError::IdClashWithAuctionHouse => {
                write!(f, "ID clash with auction house")
            }
            RegistrationError::IdClashWithExistingTrader => {
                write!(f, "ID clash with existing trader")
            }
        }
    }
}

impl std::error::Error for RegistrationError {}

#[derive(Debug, Clone, PartialEq)]
pub enum OfferError {
    NonPositiveQuantity { quantity: i64 },
    NonPositivePrice { price: f64 },
}

impl fmt::Display for OfferError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OfferError::NonPositiveQuantity { quantity } => {
                write!(f, "offer quantity must be positive, got {}", quantity)
            }
            OfferError::NonPositivePrice { price } => {
                write!(f, "offer unit price must be positive, got {}", price)
            }
        }
    }
}

impl std::error::Error for OfferError {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StartupError {
    UnknownCommodity { commodity: String },
    ThreadSpawnFailed { participant: String },
}

impl fmt::Display for StartupError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StartupError::UnknownCommodity { commodity } => {
                write!(f, "unknown commodity '{}' at construction", commodity)
            }
            StartupError::ThreadSpawnFailed { participant } => {
                write!(f, "failed to spawn thread for '{}'", participant)
            }
        }
    }
}

impl std::error::Error for StartupError {}
