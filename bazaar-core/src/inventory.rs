//! Per-agent commodity stores with capacity, ideal targets, and amortized
//! unit cost.

use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq)]
pub struct InventoryItem {
    pub commodity: String,
    pub stored: u64,
    pub ideal: u64,
    pub original_cost: f64,
    pub unit_size: f64,
}

pub struct Inventory {
    pub capacity: f64,
    items: HashMap<String, InventoryItem>,
}

impl Inventory {
    pub fn new(capacity: f64) -> Self {
        Self {
            capacity,
            items: HashMap::new(),
        }
    }

    /// Idempotent: re-registering an already-known commodity is a no-op.
    pub fn register(&mut self, commodity: &str, unit_size: f64, ideal: u64) {
        self.items.entry(commodity.to_string()).or_insert(InventoryItem {
            commodity: commodity.to_string(),
            stored: 0,
            ideal,
            original_cost: 0.0,
            unit_size,
        });
    }

    fn used_space(&self) -> f64 {
        self.items.values().map(|i| i.stored as f64 * i.unit_size).sum()
    }

    pub fn empty_space(&self) -> f64 {
        (self.capacity - self.used_space()).max(0.0)
    }

    /// Raw add: weighted-average cost update, no capacity enforcement. The
    /// caller is expected to have already bounded `q` (see `add_capped`) --
    /// used directly for trade settlement, where the other side's stake
    /// check already guarantees room was reserved.
    pub fn add(&mut self, commodity: &str, q: u64, unit_price: Option<f64>) {
        let Some(item) = self.items.get_mut(commodity) else {
            return;
        };
        if let Some(price) = unit_price {
            if price > 0.0 {
                let prior_total = item.stored as f64;
                let new_total = prior_total + q as f64;
                item.original_cost = if new_total > 0.0 {
                    (item.original_cost * prior_total + price * q as f64) / new_total
                } else {
                    price
                };
            }
        }
        item.stored += q;
    }

    /// Caps `q` at however much empty space remains, applying the
    /// overproduction markdown (`original_cost *= 1.3^-overflow`) to
    /// whatever overflowed. Returns the quantity actually stored.
    pub fn add_capped(&mut self, commodity: &str, q: u64, unit_price: Option<f64>) -> u64 {
        let Some(item) = self.items.get(commodity) else {
            return 0;
        };
        let unit_size = item.unit_size;
        let space = self.empty_space();
        let fits = if unit_size > 0.0 {
            (space / unit_size).floor() as u64
        } else {
            q
        };
        let accepted = q.min(fits);
        let overflow = q - accepted;
        self.add(commodity, accepted, unit_price);
        if overflow > 0 {
            if let Some(item) = self.items.get_mut(commodity) {
                item.original_cost *= 1.3f64.powi(-(overflow as i32));
            }
        }
        accepted
    }

    pub fn take(&mut self, commodity: &str, q: u64) -> u64 {
        let Some(item) = self.items.get_mut(commodity) else {
            return 0;
        };
        let taken = q.min(item.stored);
        item.stored -= taken;
        taken
    }

    pub fn query(&self, commodity: &str) -> u64 {
        self.items.get(commodity).map(|i| i.stored).unwrap_or(0)
    }

    pub fn query_cost(&self, commodity: &str) -> f64 {
        self.items.get(commodity).map(|i| i.original_cost).unwrap_or(0.0)
    }

    pub fn ideal(&self, commodity: &str) -> u64 {
        self.items.get(commodity).map(|i| i.ideal).unwrap_or(0)
    }

    pub fn unit_size(&self, commodity: &str) -> f64 {
        self.items.get(commodity).map(|i| i.unit_size).unwrap_or(0.0)
    }

    pub fn surplus(&self, commodity: &str) -> u64 {
        self.items
            .get(commodity)
            .map(|i| i.stored.saturating_sub(i.ideal))
            .unwrap_or(0)
    }

    pub fn shortage(&self, commodity: &str) -> u64 {
        self.items
            .get(commodity)
            .map(|i| i.ideal.saturating_sub(i.stored))
            .unwrap_or(0)
    }

    pub fn commodities(&self) -> impl Iterator<Item = &str> {
        self.items.keys().map(|s| s.as_str())
    }

    pub fn invariant_capacity_respected(&self) -> bool {
        self.used_space() <= self.capacity + f64::EPSILON
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn add_updates_weighted_average_cost() {
        let mut inv = Inventory::new(1000.0);
        inv.register("wood", 1.0, 10);
        inv.add("wood", 10, Some(2.0));
        inv.add("wood", 10, Some(4.0));
        assert_eq!(inv.query("wood"), 20);
        assert_relative_eq!(inv.query_cost("wood"), 3.0);
    }

    #[test]
    fn take_does_not_touch_cost() {
        let mut inv = Inventory::new(1000.0);
        inv.register("wood", 1.0, 10);
        inv.add("wood", 10, Some(2.0));
        inv.take("wood", 4);
        assert_eq!(inv.query("wood"), 6);
        assert_relative_eq!(inv.query_cost("wood"), 2.0);
    }

    #[test]
    fn overproduction_markdown_matches_property_7() {
        // produce p=10 units when only s=4 units of space remain.
        let mut inv = Inventory::new(4.0);
        inv.register("food", 1.0, 0);
        inv.add("food", 2, Some(1.0)); // 2 stored, cost 1.0, 2 space left
        let stored = inv.add_capped("food", 10, Some(1.0));
        assert_eq!(stored, 2);
        assert_eq!(inv.query("food"), 4);
        // overflow = 10 - 2 = 8
        assert_relative_eq!(inv.query_cost("food"), 1.0 * 1.3f64.powi(-8), epsilon = 1e-9);
    }

    #[test]
    fn surplus_and_shortage() {
        let mut inv = Inventory::new(1000.0);
        inv.register("tools", 1.0, 5);
        inv.add("tools", 8, None);
        assert_eq!(inv.surplus("tools"), 3);
        assert_eq!(inv.shortage("tools"), 0);
        inv.take("tools", 6);
        assert_eq!(inv.surplus("tools"), 0);
        assert_eq!(inv.shortage("tools"), 3);
    }
}
