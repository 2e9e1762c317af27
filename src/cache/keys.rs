//! Cache key generators for consistent key naming.
//!
//! Parameterized keys embed a canonical JSON rendering of their parameters:
//! object keys are sorted at every depth, so two logically identical filter
//! objects always produce the same key regardless of field order.

use serde::Serialize;
use serde_json::Value;

use crate::error::Result;

/// Prefix shared by every product-list key.
pub const PRODUCT_LIST_PREFIX: &str = "products:";

/// Prefix shared by every search-result and suggestion key.
pub const SEARCH_PREFIX: &str = "search:";

/// Renders `params` as canonical JSON.
pub fn canonical_params<P: Serialize + ?Sized>(params: &P) -> Result<String> {
    let value = serde_json::to_value(params)?;
    Ok(canonicalize(value).to_string())
}

// serde_json's default Map is ordered by key, but rebuilding explicitly keeps
// this correct even if another crate in the build enables `preserve_order`.
fn canonicalize(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(String, Value)> = map.into_iter().collect();
            entries.sort_by(|a, b| a.0.cmp(&b.0));
            Value::Object(
                entries
                    .into_iter()
                    .map(|(key, value)| (key, canonicalize(value)))
                    .collect(),
            )
        }
        Value::Array(items) => Value::Array(items.into_iter().map(canonicalize).collect()),
        other => other,
    }
}

#[must_use]
pub fn product(id: u64) -> String {
    format!("product:{}", id)
}

#[must_use]
pub fn product_slug(slug: &str) -> String {
    format!("product:slug:{}", slug)
}

pub fn products<P: Serialize + ?Sized>(params: &P) -> Result<String> {
    Ok(format!("{}{}", PRODUCT_LIST_PREFIX, canonical_params(params)?))
}

#[must_use]
pub fn category(id: u64) -> String {
    format!("category:{}", id)
}

pub fn categories<P: Serialize + ?Sized>(params: Option<&P>) -> Result<String> {
    match params {
        Some(params) => Ok(format!("categories:{}", canonical_params(params)?)),
        None => Ok("categories".to_string()),
    }
}

#[must_use]
pub fn cart(user_id: Option<u64>) -> String {
    match user_id {
        Some(id) => format!("cart:{}", id),
        None => "cart".to_string(),
    }
}

#[must_use]
pub fn user(id: u64) -> String {
    format!("user:{}", id)
}

#[must_use]
pub fn search(query: &str) -> String {
    format!("{}{}", SEARCH_PREFIX, query)
}

/// Key for one page of faceted search results.
pub fn search_results<F: Serialize + ?Sized>(filters: &F, page: u32, per_page: u32) -> Result<String> {
    #[derive(Serialize)]
    #[serde(rename_all = "camelCase")]
    struct SearchPage<'a, F: ?Sized> {
        filters: &'a F,
        page: u32,
        per_page: u32,
    }

    Ok(search(&canonical_params(&SearchPage {
        filters,
        page,
        per_page,
    })?))
}

#[must_use]
pub fn suggestions(query: &str) -> String {
    format!("suggestions:{}", query)
}
