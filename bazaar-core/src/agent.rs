//! The `TraderOps` capability set and the concrete agent handle the auction
//! house holds a strong reference to.
//!
//! Per the design notes on dynamic dispatch: the auction house only ever
//! needs two capability sets (`Mailbox`-like send, and `TraderOps`) to settle
//! a trade. It does not need to know which agent *variant* it's talking to,
//! so there is exactly one concrete handle type here rather than a
//! trait-object hierarchy.

use crate::inventory::Inventory;
use crate::mailbox::Mailbox;
use crate::message::Message;
use crate::price_model::PriceModel;
use crate::ids::AgentId;
use parking_lot::Mutex;

/// Read/mutate surface the auction house uses during clearing, invoked only
/// after it has looked the agent up in its registration map.
pub trait TraderOps: Send + Sync {
    fn id(&self) -> AgentId;
    fn class_name(&self) -> String;

    fn has_money(&self, q: f64) -> bool;
    fn has_commodity(&self, commodity: &str, q: u64) -> bool;

    /// Units currently stored, for roles whose throughput scales with the
    /// quantity on hand (e.g. a refiner processing all its ore).
    fn stored(&self, commodity: &str) -> u64;
    /// Current amortized unit cost, used by roles to fold consumed-input
    /// cost into the batch they stamp onto what they produce.
    fn query_cost(&self, commodity: &str) -> f64;

    /// `atomic == true`: take `q` only if the full amount is available,
    /// otherwise take nothing and return 0. `atomic == false`: take
    /// `min(balance, q)`.
    fn try_take_money(&self, q: f64, atomic: bool) -> f64;

    /// Same all-or-nothing/partial semantics as `try_take_money`, for goods.
    fn try_take_commodity(&self, commodity: &str, q: u64, atomic: bool) -> u64;

    fn add_money(&self, q: f64);

    /// `atomic == false` applies the overproduction markdown when inventory
    /// space can't hold all of `q`; `atomic == true` deposits nothing unless
    /// the full amount fits.
    fn try_add_commodity(&self, commodity: &str, q: u64, unit_price: Option<f64>, atomic: bool) -> u64;

    /// Unconditional debit, used for idleness tax; may drive balance negative.
    fn force_take_money(&self, q: f64);

    fn balance(&self) -> f64;
}

pub(crate) struct AgentStateInner {
    pub money: f64,
    pub inventory: Inventory,
    pub price_model: PriceModel,
    pub ready: bool,
    pub destroyed: bool,
    /// Per-cycle production/consumption cost scratch, stamped onto produced
    /// batches as `original_cost` and reset after each stamp.
    pub track_cost: f64,
    pub ticks: u64,
    pub age_ticks: u64,
}

pub struct AgentHandle {
    id: AgentId,
    class: String,
    pub(crate) inbox: Mailbox<Message>,
    pub(crate) outbox: Mailbox<Message>,
    pub(crate) state: Mutex<AgentStateInner>,
}

impl AgentHandle {
    pub fn new(
        id: AgentId,
        class: impl Into<String>,
        starting_money: f64,
        capacity: f64,
        price_model_window: usize,
        mailbox_capacity: usize,
    ) -> Self {
        Self {
            id,
            class: class.into(),
            inbox: Mailbox::new(mailbox_capacity, "agent-inbox"),
            outbox: Mailbox::new(mailbox_capacity, "agent-outbox"),
            state: Mutex::new(AgentStateInner {
                money: starting_money,
                inventory: Inventory::new(capacity),
                price_model: PriceModel::new(price_model_window),
                ready: false,
                destroyed: false,
                track_cost: 0.0,
                ticks: 0,
                age_ticks: 0,
            }),
        }
    }

    pub fn id(&self) -> AgentId {
        self.id
    }

    pub fn class(&self) -> &str {
        &self.class
    }

    /// The inbox entry point every other participant pushes into -- this is
    /// the agent's half of the `Mailbox { receive, send }` capability pair.
    pub fn receive(&self, msg: Message) {
        self.inbox.push(msg);
    }

    /// Pops one delivered message, if any. `AgentRuntime` drains the inbox
    /// itself via a budgeted loop; this is the other half of the pair for
    /// callers that want to inspect delivered mail without driving a full
    /// tick loop.
    pub fn next_message(&self) -> Option<Message> {
        self.inbox.pop()
    }

    pub fn is_ready(&self) -> bool {
        self.state.lock().ready
    }

    pub fn is_destroyed(&self) -> bool {
        self.state.lock().destroyed
    }

    pub fn mark_ready(&self) {
        self.state.lock().ready = true;
    }

    pub fn mark_destroyed(&self) {
        self.state.lock().destroyed = true;
    }

    pub fn age_ticks(&self) -> u64 {
        self.state.lock().age_ticks
    }

    /// Registers a commodity the agent should track, with an ideal target
    /// quantity. Idempotent; called once per commodity at spawn time.
    pub fn register_commodity(&self, commodity: &str, unit_size: f64, ideal: u64) {
        self.state.lock().inventory.register(commodity, unit_size, ideal);
    }
}

impl TraderOps for AgentHandle {
    fn id(&self) -> AgentId {
        self.id
    }

    fn class_name(&self) -> String {
        self.class.clone()
    }

    fn has_money(&self, q: f64) -> bool {
        self.state.lock().money >= q
    }

    fn has_commodity(&self, commodity: &str, q: u64) -> bool {
        self.state.lock().inventory.query(commodity) >= q
    }

    fn stored(&self, commodity: &str) -> u64 {
        self.state.lock().inventory.query(commodity)
    }

    fn query_cost(&self, commodity: &str) -> f64 {
        self.state.lock().inventory.query_cost(commodity)
    }

    fn try_take_money(&self, q: f64, atomic: bool) -> f64 {
        let mut state = self.state.lock();
        if atomic {
            if state.money >= q {
                state.money -= q;
                q
            } else {
                0.0
            }
        } else {
            let taken = state.money.max(0.0).min(q);
            state.money -= taken;
            taken
        }
    }

    fn try_take_commodity(&self, commodity: &str, q: u64, atomic: bool) -> u64 {
        let mut state = self.state.lock();
        let have = state.inventory.query(commodity);
        if atomic && have < q {
            return 0;
        }
        state.inventory.take(commodity, q)
    }

    fn add_money(&self, q: f64) {
        self.state.lock().money += q;
    }

    fn try_add_commodity(&self, commodity: &str, q: u64, unit_price: Option<f64>, atomic: bool) -> u64 {
        let mut state = self.state.lock();
        if atomic {
            let space = state.inventory.empty_space();
            let unit_size = state.inventory.unit_size(commodity);
            let fits = if unit_size > 0.0 { (space / unit_size).floor() as u64 } else { q };
            if fits < q {
                return 0;
            }
            state.inventory.add(commodity, q, unit_price);
            q
        } else {
            state.inventory.add_capped(commodity, q, unit_price)
        }
    }

    fn force_take_money(&self, q: f64) {
        self.state.lock().money -= q;
    }

    fn balance(&self) -> f64 {
        self.state.lock().money
    }
}

/// The abstract interface role recipes present to the agent runtime; the
/// runtime dispatches into it once per tick but never inspects which
/// concrete recipe is behind it.
pub trait Role: Send + 'static {
    fn class_name(&self) -> &'static str;

    /// One production/consumption step. Implementations read/write the
    /// agent's commodities and balance exclusively through `ops`, and
    /// accumulate any cost incurred (consumed inputs, idle tax) into
    /// `cost_acc` so the runtime can stamp it onto whatever gets produced.
    fn tick(&mut self, ops: &dyn TraderOps, cost_acc: &mut f64, rng: &mut dyn rand::RngCore);

    /// Commodities this role needs registered in the agent's inventory with
    /// an ideal target, e.g. a farmer wants a fertilizer and wood target.
    fn ideal_inventory(&self) -> Vec<(&'static str, u64)>;
}

/// Lets the supervisor spawn a role for a chosen commodity without the core
/// crate knowing any concrete recipe; implemented once, on the whole `Role`
/// enum, by the crate that defines the recipes.
pub trait RoleCatalog: Role + Sized {
    fn for_commodity(commodity: &str) -> Option<Self>;
    fn commodities() -> &'static [&'static str];
}
