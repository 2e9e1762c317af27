//! Facet counts over a page of search results.

use std::collections::{BTreeMap, HashMap};

use crate::catalog::models::{
    Facets, PriceFacet, Product, RatingFacet, Term, TermFacet, ValueFacet,
};

/// Price buckets as `(min, max)`; `None` is open-ended.
const PRICE_BUCKETS: [(f64, Option<f64>); 6] = [
    (0.0, Some(25.0)),
    (25.0, Some(50.0)),
    (50.0, Some(100.0)),
    (100.0, Some(200.0)),
    (200.0, Some(500.0)),
    (500.0, None),
];

/// Counts categories, tags, price buckets, ratings and visible attribute
/// values across `products`.
///
/// Term and attribute facets keep first-seen order. Empty price buckets are
/// dropped and ratings are listed highest first.
pub fn generate_facets(products: &[Product]) -> Facets {
    Facets {
        categories: count_terms(products.iter().flat_map(|p| &p.categories), "Category"),
        tags: count_terms(products.iter().flat_map(|p| &p.tags), "Tag"),
        price_ranges: count_prices(products),
        ratings: count_ratings(products),
        attributes: count_attributes(products),
    }
}

fn count_terms<'a>(terms: impl Iterator<Item = &'a Term>, label: &str) -> Vec<TermFacet> {
    let mut facets: Vec<TermFacet> = Vec::new();
    let mut index: HashMap<u64, usize> = HashMap::new();

    for term in terms {
        match index.get(&term.id) {
            Some(&i) => facets[i].count += 1,
            None => {
                let name = if term.name.is_empty() {
                    format!("{} {}", label, term.id)
                } else {
                    term.name.clone()
                };
                index.insert(term.id, facets.len());
                facets.push(TermFacet {
                    id: term.id,
                    name,
                    count: 1,
                });
            }
        }
    }

    facets
}

fn count_prices(products: &[Product]) -> Vec<PriceFacet> {
    let mut counts = [0u64; PRICE_BUCKETS.len()];

    for price in products.iter().filter_map(|p| p.price.trim().parse::<f64>().ok()) {
        let bucket = PRICE_BUCKETS.iter().position(|(min, max)| {
            price >= *min && max.map_or(true, |max| price < max)
        });
        if let Some(i) = bucket {
            counts[i] += 1;
        }
    }

    PRICE_BUCKETS
        .iter()
        .zip(counts)
        .filter(|(_, count)| *count > 0)
        .map(|((min, max), count)| PriceFacet {
            min: *min,
            max: *max,
            count,
        })
        .collect()
}

fn count_ratings(products: &[Product]) -> Vec<RatingFacet> {
    let mut counts: BTreeMap<u8, u64> = BTreeMap::new();

    for product in products {
        let rating = product.average_rating.trim().parse::<f64>().unwrap_or(0.0).floor();
        if rating > 0.0 {
            *counts.entry(rating.min(u8::MAX as f64) as u8).or_default() += 1;
        }
    }

    counts
        .into_iter()
        .rev()
        .map(|(rating, count)| RatingFacet { rating, count })
        .collect()
}

fn count_attributes(products: &[Product]) -> BTreeMap<String, Vec<ValueFacet>> {
    let mut attributes: BTreeMap<String, Vec<ValueFacet>> = BTreeMap::new();

    for attribute in products.iter().flat_map(|p| &p.attributes).filter(|a| a.visible) {
        let values = attributes.entry(attribute.name.clone()).or_default();
        for option in &attribute.options {
            match values.iter_mut().find(|v| &v.value == option) {
                Some(existing) => existing.count += 1,
                None => values.push(ValueFacet {
                    value: option.clone(),
                    count: 1,
                }),
            }
        }
    }

    attributes
}
