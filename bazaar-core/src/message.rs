//! Wire types exchanged through mailboxes.
//!
//! `Message` is a tagged union with one variant per message kind. The
//! original prototype encoded this as one struct with an optional slot per
//! kind; that's a type-encoding artefact of the source language, not part of
//! this design.

use crate::errors::RegistrationError;
use crate::ids::AgentId;
use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct Offer {
    pub sender: AgentId,
    pub commodity: String,
    pub quantity: u64,
    pub unit_price: f64,
    pub expiry_ms: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Bid,
    Ask,
}

#[derive(Debug, Clone)]
pub struct OfferResult {
    pub sender: AgentId,
    pub commodity: String,
    pub side: Side,
    pub broker_fee_paid: bool,
    pub traded_quantity: u64,
    pub untraded_quantity: u64,
    pub avg_fill_price: f64,
    /// Original limit price; meaningful for bids, carried on asks too for
    /// uniformity (equal to the ask's own posted price).
    pub limit_price: f64,
}

pub enum Message {
    Empty,
    /// Carries a strong handle to the registering agent so the auction house
    /// can reply directly if the id clashes (the registrant isn't in
    /// `known_traders` yet, so the normal outbox path can't reach it).
    RegisterRequest(Arc<crate::agent::AgentHandle>),
    RegisterResponse {
        accepted: bool,
        reason: Option<RegistrationError>,
    },
    Bid(Offer),
    Ask(Offer),
    BidResult(OfferResult),
    AskResult(OfferResult),
    ShutdownNotify {
        id: AgentId,
        class: String,
        age_ticks: u64,
    },
    ShutdownCommand,
}

impl std::fmt::Debug for Message {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Message::Empty => write!(f, "Empty"),
            Message::RegisterRequest(h) => write!(f, "RegisterRequest({})", h.id()),
            Message::RegisterResponse { accepted, reason } => {
                write!(f, "RegisterResponse {{ accepted: {}, reason: {:?} }}", accepted, reason)
            }
            Message::Bid(o) => write!(f, "Bid({:?})", o),
            Message::Ask(o) => write!(f, "Ask({:?})", o),
            Message::BidResult(r) => write!(f, "BidResult({:?})", r),
            Message::AskResult(r) => write!(f, "AskResult({:?})", r),
            Message::ShutdownNotify { id, class, age_ticks } => {
                write!(f, "ShutdownNotify {{ id: {}, class: {}, age_ticks: {} }}", id, class, age_ticks)
            }
            Message::ShutdownCommand => write!(f, "ShutdownCommand"),
        }
    }
}
