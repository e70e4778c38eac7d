//! Participant identifiers.

pub type AgentId = u64;

/// The auction house's own id in the id-space agents register into; no
/// agent may claim it (Scenario B's id-clash check against the house itself).
pub const AUCTION_HOUSE_ID: AgentId = 0;
