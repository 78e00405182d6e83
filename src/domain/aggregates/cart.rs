//! Cart snapshot

use serde::{Deserialize, Serialize};

use crate::domain::value_objects::ProductId;

/// Read-only view of a shopper's cart at the time an offer is requested.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartSnapshot {
    pub id: String,
    pub lines: Vec<CartLine>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLine {
    pub id: String,
    pub quantity: u32,
    pub product_id: Option<ProductId>,
}

impl CartSnapshot {
    pub fn new(id: impl Into<String>, lines: Vec<CartLine>) -> Self { Self { id: id.into(), lines } }

    /// Total units across all lines, not the number of lines.
    pub fn item_count(&self) -> u32 {
        self.lines.iter().fold(0u32, |acc, line| acc.saturating_add(line.quantity))
    }

    pub fn product_ids(&self) -> Vec<ProductId> {
        let mut ids: Vec<ProductId> = Vec::with_capacity(self.lines.len());
        for id in self.lines.iter().filter_map(|l| l.product_id.clone()) {
            if !ids.contains(&id) { ids.push(id); }
        }
        ids
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(id: &str, quantity: u32, product: Option<&str>) -> CartLine {
        CartLine { id: id.into(), quantity, product_id: product.map(|p| ProductId::new(p).unwrap()) }
    }

    #[test]
    fn test_item_count_sums_quantities() {
        let cart = CartSnapshot::new("c1", vec![line("l1", 2, Some("1")), line("l2", 1, Some("2"))]);
        assert_eq!(cart.item_count(), 3);
        assert_eq!(CartSnapshot::new("c2", vec![]).item_count(), 0);
    }

    #[test]
    fn test_product_ids_dedupe_in_order() {
        let cart = CartSnapshot::new("c1", vec![line("l1", 1, Some("2")), line("l2", 1, None), line("l3", 1, Some("1")), line("l4", 1, Some("2"))]);
        let ids: Vec<String> = cart.product_ids().iter().map(ToString::to_string).collect();
        assert_eq!(ids, ["2", "1"]);
    }
}
