//! Commodity registry.

#[derive(Debug, Clone, PartialEq)]
pub struct Commodity {
    pub id: String,
    /// Space consumed per unit, a positive real.
    pub unit_size: f64,
}

impl Commodity {
    pub fn new(id: impl Into<String>, unit_size: f64) -> Self {
        Self {
            id: id.into(),
            unit_size,
        }
    }
}
