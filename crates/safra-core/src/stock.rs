//! Stock product grouping
//!
//! Users register the same product many times, with typos and in different
//! units ("Ureia", "Uréia 46%", "ureia"). Grouping clusters entries by fuzzy
//! name similarity and reports one consolidated line per cluster.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::models::StockProduct;
use crate::normalize::are_similar;
use crate::units::{display_quantity, parse_unit};

const UNKNOWN_SUPPLIER: &str = "Desconhecido";

/// Stock held from one supplier at one price
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SupplierStock {
    pub supplier: String,
    pub unit_price: Option<f64>,
    /// Summed in each entry's own unit
    pub quantity: f64,
    pub product_ids: Vec<i64>,
}

/// Consolidated view of similar stock entries
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductGroup {
    /// Most frequent name in the group
    pub name: String,
    /// Price unit of the oldest entry
    pub reference_unit: String,
    /// Weighted by initial quantity, per `reference_unit`
    pub average_price: f64,
    /// Stock on hand in the base unit (mg or mL) or in counted units
    pub total_stock: f64,
    pub display_stock: f64,
    pub display_unit: String,
    pub brands: Vec<String>,
    pub categories: Vec<String>,
    pub suppliers: Vec<SupplierStock>,
    pub product_ids: Vec<i64>,
}

/// Cluster stock entries by similar names in input order, then sort each
/// cluster oldest first
pub fn group_products(products: &[StockProduct]) -> Vec<ProductGroup> {
    // (key name, members); a new entry joins the first similar group
    let mut clusters: Vec<(&str, Vec<&StockProduct>)> = Vec::new();
    for product in products.iter().filter(|p| !p.name.trim().is_empty()) {
        match clusters
            .iter_mut()
            .find(|(key, _)| are_similar(&product.name, key))
        {
            Some((_, members)) => members.push(product),
            None => clusters.push((product.name.as_str(), vec![product])),
        }
    }

    debug!(
        products = products.len(),
        groups = clusters.len(),
        "Grouped stock products"
    );

    clusters
        .into_iter()
        .map(|(_, mut members)| {
            members.sort_by_key(|p| p.created_at);
            summarize(&members)
        })
        .collect()
}

fn summarize(members: &[&StockProduct]) -> ProductGroup {
    let oldest = members[0];
    let reference_unit = oldest
        .price_unit
        .clone()
        .unwrap_or_else(|| oldest.unit.clone());

    let in_stock: Vec<&StockProduct> = members
        .iter()
        .copied()
        .filter(|p| p.quantity > 0.0 && p.unit_price.is_some())
        .collect();

    let (total_stock, display_stock, display_unit) = stock_totals(&oldest.unit, &in_stock);

    ProductGroup {
        name: most_common_name(members),
        average_price: weighted_average_price(members, &reference_unit),
        reference_unit,
        total_stock,
        display_stock,
        display_unit,
        brands: distinct(members.iter().filter_map(|p| p.brand.as_deref())),
        categories: distinct(members.iter().filter_map(|p| p.category.as_deref())),
        suppliers: supplier_stock(&in_stock),
        product_ids: members.iter().map(|p| p.id).collect(),
    }
}

/// Most frequent name; on a tie the later entry wins
fn most_common_name(members: &[&StockProduct]) -> String {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for p in members {
        *counts.entry(p.name.as_str()).or_insert(0) += 1;
    }

    let mut best = members[0].name.as_str();
    let mut best_count = 0;
    for p in members {
        let count = counts[p.name.as_str()];
        if count >= best_count {
            best = p.name.as_str();
            best_count = count;
        }
    }
    best.to_string()
}

/// `sum(quantity * price) / sum(quantity)` in the reference unit.
///
/// Initial quantities are stored in the base unit. Entries priced in a unit
/// that does not convert to the reference unit are left out.
fn weighted_average_price(members: &[&StockProduct], reference_unit: &str) -> f64 {
    let reference = parse_unit(reference_unit);
    let mut cost_sum = 0.0;
    let mut quantity_sum = 0.0;

    for p in members {
        let Some(price) = p.unit_price.filter(|v| *v > 0.0) else {
            continue;
        };
        let initial = p.initial_quantity.unwrap_or(0.0);
        if initial <= 0.0 {
            continue;
        }

        let price_unit = p.price_unit.as_deref().unwrap_or(&p.unit);
        let (quantity, price) = match (reference, parse_unit(price_unit)) {
            (Some(r), Some(u)) if r.family() == u.family() => {
                // R$/u -> R$/r scales by how many u fit in one r
                let factor = r.base_factor() as f64 / u.base_factor() as f64;
                (r.from_base(initial), price * factor)
            }
            (Some(r), None) if price_unit == reference_unit => (r.from_base(initial), price),
            (None, _) if price_unit == reference_unit => (initial, price),
            _ => {
                debug!(
                    product = %p.name,
                    unit = price_unit,
                    reference = reference_unit,
                    "Price unit does not convert to the reference unit"
                );
                continue;
            }
        };

        cost_sum += quantity * price;
        quantity_sum += quantity;
    }

    if quantity_sum > 0.0 {
        cost_sum / quantity_sum
    } else {
        0.0
    }
}

/// Stock on hand, summed in the base unit of the oldest entry's family
fn stock_totals(first_unit: &str, in_stock: &[&StockProduct]) -> (f64, f64, String) {
    match parse_unit(first_unit).map(|u| u.family()) {
        Some(family) => {
            let total: f64 = in_stock
                .iter()
                .filter_map(|p| {
                    parse_unit(&p.unit)
                        .filter(|u| u.family() == family)
                        .map(|u| u.to_base(p.quantity))
                })
                .sum();
            let (shown, unit) = display_quantity(total, family);
            (total, shown, unit.as_str().to_string())
        }
        None => {
            let total: f64 = in_stock.iter().map(|p| p.quantity).sum();
            (total, total, first_unit.to_string())
        }
    }
}

fn supplier_stock(in_stock: &[&StockProduct]) -> Vec<SupplierStock> {
    let mut suppliers: Vec<SupplierStock> = Vec::new();
    for p in in_stock {
        let name = p.supplier.as_deref().unwrap_or(UNKNOWN_SUPPLIER);
        match suppliers
            .iter_mut()
            .find(|s| s.supplier == name && s.unit_price == p.unit_price)
        {
            Some(entry) => {
                entry.quantity += p.quantity;
                entry.product_ids.push(p.id);
            }
            None => suppliers.push(SupplierStock {
                supplier: name.to_string(),
                unit_price: p.unit_price,
                quantity: p.quantity,
                product_ids: vec![p.id],
            }),
        }
    }
    suppliers
}

fn distinct<'a>(values: impl Iterator<Item = &'a str>) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for v in values {
        if !out.iter().any(|o| o == v) {
            out.push(v.to_string());
        }
    }
    out
}
