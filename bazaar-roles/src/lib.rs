//! Concrete production recipes consumed by `bazaar_core::agent::Role`.
//!
//! A single tagged union dispatched by `match`, per the design notes'
//! rejection of dyn-dispatch for role variants -- the auction house and
//! agent runtime only ever see the abstract `Role`/`RoleCatalog` traits from
//! `bazaar_core`; this crate is the one place that knows the recipe table.

use bazaar_core::agent::{Role, RoleCatalog, TraderOps};
use rand::{Rng, RngCore};

/// Matches `bazaar_core::config::Config::default().idle_tax`. Kept as its
/// own constant rather than threading `Config` through `Role::tick`, so role
/// recipes stay decoupled from the core crate's configuration type.
const IDLE_TAX: f64 = 20.0;

fn consume(ops: &dyn TraderOps, cost_acc: &mut f64, commodity: &str, amount: u64) {
    let unit_cost = ops.query_cost(commodity);
    ops.try_take_commodity(commodity, amount, false);
    *cost_acc += amount as f64 * unit_cost;
}

fn consume_with_chance(ops: &dyn TraderOps, cost_acc: &mut f64, commodity: &str, amount: u64, chance: f64, rng: &mut dyn RngCore) {
    if rng.gen_bool(chance) {
        consume(ops, cost_acc, commodity, amount);
    }
}

/// Stamps the accumulated input cost (floored at 1, matching the source)
/// evenly across the produced batch, then resets the scratch accumulator.
fn produce(ops: &dyn TraderOps, cost_acc: &mut f64, commodity: &str, amount: u64) {
    if amount == 0 {
        *cost_acc = 0.0;
        return;
    }
    if *cost_acc < 1.0 {
        *cost_acc = 1.0;
    }
    let unit_price = *cost_acc / amount as f64;
    ops.try_add_commodity(commodity, amount, Some(unit_price), false);
    *cost_acc = 0.0;
}

fn idle(ops: &dyn TraderOps, cost_acc: &mut f64) {
    ops.force_take_money(IDLE_TAX);
    *cost_acc += IDLE_TAX;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoleKind {
    Farmer,
    Woodcutter,
    Composter,
    Miner,
    Refiner,
    Blacksmith,
    Empty,
}

impl Role for RoleKind {
    fn class_name(&self) -> &'static str {
        match self {
            RoleKind::Farmer => "farmer",
            RoleKind::Woodcutter => "woodcutter",
            RoleKind::Composter => "composter",
            RoleKind::Miner => "miner",
            RoleKind::Refiner => "refiner",
            RoleKind::Blacksmith => "blacksmith",
            RoleKind::Empty => "empty",
        }
    }

    fn tick(&mut self, ops: &dyn TraderOps, cost_acc: &mut f64, rng: &mut dyn RngCore) {
        match self {
            RoleKind::Farmer => tick_farmer(ops, cost_acc, rng),
            RoleKind::Woodcutter => tick_woodcutter(ops, cost_acc, rng),
            RoleKind::Composter => tick_composter(ops, cost_acc),
            RoleKind::Miner => tick_miner(ops, cost_acc, rng),
            RoleKind::Refiner => tick_refiner(ops, cost_acc, rng),
            RoleKind::Blacksmith => tick_blacksmith(ops, cost_acc),
            RoleKind::Empty => {}
        }
    }

    fn ideal_inventory(&self) -> Vec<(&'static str, u64)> {
        match self {
            RoleKind::Farmer => vec![("fertilizer", 10), ("wood", 10), ("tools", 2), ("food", 0)],
            RoleKind::Woodcutter => vec![("food", 10), ("tools", 2), ("wood", 0)],
            RoleKind::Composter => vec![("food", 10), ("fertilizer", 0)],
            RoleKind::Miner => vec![("food", 10), ("tools", 2), ("ore", 0)],
            RoleKind::Refiner => vec![("food", 10), ("ore", 10), ("tools", 2), ("metal", 0)],
            RoleKind::Blacksmith => vec![("food", 10), ("metal", 10), ("tools", 0)],
            RoleKind::Empty => vec![],
        }
    }
}

impl RoleCatalog for RoleKind {
    fn for_commodity(commodity: &str) -> Option<Self> {
        match commodity {
            "food" => Some(RoleKind::Farmer),
            "fertilizer" => Some(RoleKind::Composter),
            "wood" => Some(RoleKind::Woodcutter),
            "ore" => Some(RoleKind::Miner),
            "metal" => Some(RoleKind::Refiner),
            "tools" => Some(RoleKind::Blacksmith),
            _ => None,
        }
    }

    fn commodities() -> &'static [&'static str] {
        &["food", "fertilizer", "wood", "ore", "metal", "tools"]
    }
}

/// 1 fertilizer + 1 wood + (10% chance) 1 tool -> 6 food (tool+wood) / 3 food
/// (wood only) / 1 food (fertilizer only, no wood).
fn tick_farmer(ops: &dyn TraderOps, cost_acc: &mut f64, rng: &mut dyn RngCore) {
    if !ops.has_commodity("fertilizer", 1) {
        idle(ops, cost_acc);
        return;
    }
    consume(ops, cost_acc, "fertilizer", 1);
    let has_wood = ops.has_commodity("wood", 1);
    let has_tools = ops.has_commodity("tools", 1);
    if has_wood && has_tools {
        consume_with_chance(ops, cost_acc, "tools", 1, 0.1, rng);
        consume(ops, cost_acc, "wood", 1);
        produce(ops, cost_acc, "food", 6);
    } else if has_wood {
        consume(ops, cost_acc, "wood", 1);
        produce(ops, cost_acc, "food", 3);
    } else {
        produce(ops, cost_acc, "food", 1);
    }
}

/// 1 food + (10% chance) 1 tool -> 2 wood (tool) / 1 wood.
fn tick_woodcutter(ops: &dyn TraderOps, cost_acc: &mut f64, rng: &mut dyn RngCore) {
    if !ops.has_commodity("food", 1) {
        idle(ops, cost_acc);
        return;
    }
    let has_tools = ops.has_commodity("tools", 1);
    if has_tools {
        consume_with_chance(ops, cost_acc, "tools", 1, 0.1, rng);
        consume(ops, cost_acc, "food", 1);
        produce(ops, cost_acc, "wood", 2);
    } else {
        consume(ops, cost_acc, "food", 1);
        produce(ops, cost_acc, "wood", 1);
    }
}

/// 1 food -> 1 fertilizer.
fn tick_composter(ops: &dyn TraderOps, cost_acc: &mut f64) {
    if !ops.has_commodity("food", 1) {
        idle(ops, cost_acc);
        return;
    }
    consume(ops, cost_acc, "food", 1);
    produce(ops, cost_acc, "fertilizer", 1);
}

/// 1 food + (10% chance) 1 tool -> 4 ore (tool) / 2 ore.
fn tick_miner(ops: &dyn TraderOps, cost_acc: &mut f64, rng: &mut dyn RngCore) {
    if !ops.has_commodity("food", 1) {
        idle(ops, cost_acc);
        return;
    }
    let has_tools = ops.has_commodity("tools", 1);
    if has_tools {
        consume_with_chance(ops, cost_acc, "tools", 1, 0.1, rng);
        consume(ops, cost_acc, "food", 1);
        produce(ops, cost_acc, "ore", 4);
    } else {
        consume(ops, cost_acc, "food", 1);
        produce(ops, cost_acc, "ore", 2);
    }
}

/// 1 food + k ore + (10% chance) 1 tool -> k metal (tool) / min(k, 2) metal,
/// `k` being however much ore is on hand.
fn tick_refiner(ops: &dyn TraderOps, cost_acc: &mut f64, rng: &mut dyn RngCore) {
    let ore = ops.stored("ore");
    if !ops.has_commodity("food", 1) || ore == 0 {
        idle(ops, cost_acc);
        return;
    }
    let has_tools = ops.has_commodity("tools", 1);
    let throughput = if has_tools { ore } else { ore.min(2) };
    consume(ops, cost_acc, "food", 1);
    if has_tools {
        consume_with_chance(ops, cost_acc, "tools", 1, 0.1, rng);
    }
    consume(ops, cost_acc, "ore", throughput);
    produce(ops, cost_acc, "metal", throughput);
}

/// 1 food + k metal -> k tools, `k` being however much metal is on hand.
fn tick_blacksmith(ops: &dyn TraderOps, cost_acc: &mut f64) {
    let metal = ops.stored("metal");
    if !ops.has_commodity("food", 1) || metal == 0 {
        idle(ops, cost_acc);
        return;
    }
    consume(ops, cost_acc, "food", 1);
    consume(ops, cost_acc, "metal", metal);
    produce(ops, cost_acc, "tools", metal);
}
