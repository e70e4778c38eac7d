//! Per-agent, per-commodity rolling window of observed trade prices.

use std::collections::{HashMap, VecDeque};

pub struct PriceModel {
    window: usize,
    observed: HashMap<String, VecDeque<f64>>,
}

impl PriceModel {
    pub fn new(window: usize) -> Self {
        Self {
            window,
            observed: HashMap::new(),
        }
    }

    /// Appends `traded_quantity` copies of `fill_price`, evicting the oldest
    /// entries to keep the window bounded. A zero-quantity result (no trade)
    /// is a no-op.
    pub fn observe(&mut self, commodity: &str, fill_price: f64, traded_quantity: u64) {
        if traded_quantity == 0 {
            return;
        }
        let deque = self.observed.entry(commodity.to_string()).or_default();
        for _ in 0..traded_quantity {
            deque.push_back(fill_price);
            if deque.len() > self.window {
                deque.pop_front();
            }
        }
    }

    pub fn observed_range(&self, commodity: &str) -> (f64, f64) {
        match self.observed.get(commodity) {
            Some(d) if !d.is_empty() => {
                let min = d.iter().cloned().fold(f64::INFINITY, f64::min);
                let max = d.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
                (min, max)
            }
            _ => (0.0, 0.0),
        }
    }

    /// `1 - clamp((p-min)/(max-min), 0, 1)`; degenerates to 1.0 when no range
    /// has been observed yet (min == max), so a first-ever offer isn't
    /// starved by a favorability of zero.
    pub fn favorability(&self, commodity: &str, p: f64) -> f64 {
        let (min, max) = self.observed_range(commodity);
        if max <= min {
            return 1.0;
        }
        let normalized = (p - min) / (max - min);
        1.0 - normalized.clamp(0.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn observe_replicates_by_traded_quantity() {
        let mut pm = PriceModel::new(50);
        pm.observe("wood", 10.0, 3);
        let (min, max) = pm.observed_range("wood");
        assert_eq!(min, 10.0);
        assert_eq!(max, 10.0);
    }

    #[test]
    fn window_bounds_observations() {
        let mut pm = PriceModel::new(3);
        pm.observe("ore", 1.0, 1);
        pm.observe("ore", 2.0, 1);
        pm.observe("ore", 3.0, 1);
        pm.observe("ore", 4.0, 1);
        let (min, max) = pm.observed_range("ore");
        assert_eq!(min, 2.0);
        assert_eq!(max, 4.0);
    }

    #[test]
    fn favorability_at_midpoint_is_half() {
        let mut pm = PriceModel::new(50);
        pm.observe("food", 0.0, 1);
        pm.observe("food", 10.0, 1);
        assert_relative_eq!(pm.favorability("food", 5.0), 0.5);
    }

    #[test]
    fn favorability_clamps_outside_range() {
        let mut pm = PriceModel::new(50);
        pm.observe("food", 0.0, 1);
        pm.observe("food", 10.0, 1);
        assert_relative_eq!(pm.favorability("food", -5.0), 1.0);
        assert_relative_eq!(pm.favorability("food", 50.0), 0.0);
    }
}
