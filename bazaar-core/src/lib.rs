//! bazaar-core: the continuous double-auction simulation engine.
//!
//! This crate owns everything a host binary needs to run the simulation --
//! mailboxes, commodities, inventories, price history, the agent runtime,
//! the auction house, and the supervisor -- but knows nothing about
//! concrete production recipes. Those are a `Role`/`RoleCatalog`
//! implementation supplied by the caller (see `bazaar-roles`), kept out of
//! this crate so the clearing and settlement machinery can be exercised and
//! tested without pulling in any particular economy.
//!
//! ## Modules
//! - [`chart`]: optional per-commodity `.dat` series for the live display.
//! - [`config`]: process-wide numeric defaults and environment overlay.
//! - [`clock`]: injectable time source (`SystemClock` / `ManualClock`).
//! - [`errors`]: registration/offer/startup error types.
//! - [`ids`]: participant id type and the auction house's reserved id.
//! - [`mailbox`]: bounded lock-free inbox/outbox primitive.
//! - [`commodity`]: commodity registry entries.
//! - [`inventory`]: per-agent commodity stores, capacity, amortized cost.
//! - [`price_model`]: per-agent rolling observed-price window.
//! - [`history`]: auction house's six rolling time-stamped series.
//! - [`message`]: wire types exchanged through mailboxes.
//! - [`agent`]: `TraderOps`/`Role`/`RoleCatalog` traits and `AgentHandle`.
//! - [`agent_runtime`]: per-tick driver for one agent.
//! - [`auction_house`]: registration, clearing, settlement, history.
//! - [`supervisor`]: population control via weighted role spawning.

pub mod agent;
pub mod agent_runtime;
pub mod auction_house;
pub mod chart;
pub mod clock;
pub mod commodity;
pub mod config;
pub mod errors;
pub mod history;
pub mod ids;
pub mod inventory;
pub mod mailbox;
pub mod message;
pub mod price_model;
pub mod supervisor;

pub use agent::{AgentHandle, Role, RoleCatalog, TraderOps};
pub use agent_runtime::AgentRuntime;
pub use auction_house::AuctionHouseHandle;
pub use chart::ChartPoint;
pub use clock::{Clock, ManualClock, SystemClock};
pub use commodity::Commodity;
pub use config::Config;
pub use ids::{AgentId, AUCTION_HOUSE_ID};
pub use message::{Message, Offer, OfferResult, Side};
pub use supervisor::{Supervisor, SupervisorMetrics};
