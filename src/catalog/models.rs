//! Catalog data shapes.
//!
//! Only the fields the cache consumers read are modelled; anything else the
//! upstream catalog sends is ignored on deserialization.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A category or tag reference attached to a product.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Term {
    pub id: u64,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub slug: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductAttribute {
    pub name: String,
    #[serde(default)]
    pub visible: bool,
    #[serde(default)]
    pub options: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub slug: String,
    /// Decimal string as sent by the store, e.g. `"19.99"`
    #[serde(default)]
    pub price: String,
    /// Decimal string, `"0"` when unrated
    #[serde(default)]
    pub average_rating: String,
    #[serde(default)]
    pub categories: Vec<Term>,
    #[serde(default)]
    pub tags: Vec<Term>,
    #[serde(default)]
    pub attributes: Vec<ProductAttribute>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub slug: String,
    #[serde(default)]
    pub parent: u64,
    #[serde(default)]
    pub count: u64,
}

/// Product listing parameters passed to the upstream catalog.
///
/// Unset fields are omitted when serialized, which keeps cache keys short and
/// independent of which defaults a caller spelled out.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProductQuery {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub per_page: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search: Option<String>,
    /// Comma-separated category ids
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    /// Comma-separated tag ids
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_price: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_price: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_rating: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub on_sale: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stock_status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub featured: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub orderby: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CategoryQuery {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub per_page: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent: Option<u64>,
}

// == Search ==
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceRange {
    pub min: f64,
    pub max: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortBy {
    Date,
    Title,
    Price,
    Popularity,
    Rating,
}

impl SortBy {
    pub fn as_str(self) -> &'static str {
        match self {
            SortBy::Date => "date",
            SortBy::Title => "title",
            SortBy::Price => "price",
            SortBy::Popularity => "popularity",
            SortBy::Rating => "rating",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

impl SortOrder {
    pub fn as_str(self) -> &'static str {
        match self {
            SortOrder::Asc => "asc",
            SortOrder::Desc => "desc",
        }
    }
}

fn is_false(value: &bool) -> bool {
    !*value
}

/// Storefront search filters.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SearchFilters {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub query: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub category: Vec<u64>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tag: Vec<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price_range: Option<PriceRange>,
    /// Minimum average rating
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rating: Option<u8>,
    #[serde(skip_serializing_if = "is_false")]
    pub on_sale: bool,
    #[serde(skip_serializing_if = "is_false")]
    pub in_stock: bool,
    #[serde(skip_serializing_if = "is_false")]
    pub featured: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort_by: Option<SortBy>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort_order: Option<SortOrder>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub attributes: BTreeMap<String, Vec<String>>,
}

impl SearchFilters {
    /// Upstream listing parameters for one page of this search.
    pub fn to_query(&self, page: u32, per_page: u32) -> ProductQuery {
        let join = |ids: &[u64]| {
            (!ids.is_empty()).then(|| {
                ids.iter()
                    .map(u64::to_string)
                    .collect::<Vec<_>>()
                    .join(",")
            })
        };

        ProductQuery {
            page: Some(page),
            per_page: Some(per_page),
            status: Some("publish".to_string()),
            search: self.query.clone().filter(|q| !q.is_empty()),
            category: join(&self.category),
            tag: join(&self.tag),
            min_price: self.price_range.map(|range| range.min),
            max_price: self.price_range.map(|range| range.max),
            min_rating: self.rating.filter(|rating| *rating > 0),
            on_sale: self.on_sale.then_some(true),
            stock_status: self.in_stock.then(|| "instock".to_string()),
            featured: self.featured.then_some(true),
            orderby: self.sort_by.map(|sort| sort.as_str().to_string()),
            order: self
                .sort_by
                .map(|_| self.sort_order.unwrap_or_default().as_str().to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TermFacet {
    pub id: u64,
    pub name: String,
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceFacet {
    pub min: f64,
    /// `None` for the open-ended top bucket
    pub max: Option<f64>,
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RatingFacet {
    pub rating: u8,
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValueFacet {
    pub value: String,
    pub count: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Facets {
    pub categories: Vec<TermFacet>,
    pub tags: Vec<TermFacet>,
    pub price_ranges: Vec<PriceFacet>,
    pub ratings: Vec<RatingFacet>,
    pub attributes: BTreeMap<String, Vec<ValueFacet>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResult {
    pub products: Vec<Product>,
    pub total: u64,
    pub total_pages: u64,
    pub current_page: u32,
    pub facets: Facets,
    pub suggestions: Vec<String>,
}

impl SearchResult {
    pub fn empty(page: u32) -> Self {
        Self {
            products: Vec::new(),
            total: 0,
            total_pages: 0,
            current_page: page,
            facets: Facets::default(),
            suggestions: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_product_ignores_unknown_fields() {
        let product: Product = serde_json::from_value(json!({
            "id": 5,
            "name": "Mug",
            "price": "9.50",
            "permalink": "https://shop.example/mug",
            "categories": [{"id": 2, "name": "Kitchen"}]
        }))
        .unwrap();

        assert_eq!(product.id, 5);
        assert_eq!(product.categories[0].name, "Kitchen");
        assert!(product.tags.is_empty());
    }

    #[test]
    fn test_filters_to_query() {
        let filters = SearchFilters {
            query: Some("mug".to_string()),
            category: vec![3, 9],
            price_range: Some(PriceRange { min: 5.0, max: 20.0 }),
            in_stock: true,
            sort_by: Some(SortBy::Price),
            ..SearchFilters::default()
        };

        let query = filters.to_query(2, 20);

        assert_eq!(query.page, Some(2));
        assert_eq!(query.search.as_deref(), Some("mug"));
        assert_eq!(query.category.as_deref(), Some("3,9"));
        assert_eq!(query.tag, None);
        assert_eq!(query.min_price, Some(5.0));
        assert_eq!(query.stock_status.as_deref(), Some("instock"));
        assert_eq!(query.on_sale, None);
        assert_eq!(query.orderby.as_deref(), Some("price"));
        assert_eq!(query.order.as_deref(), Some("asc"));
    }

    #[test]
    fn test_default_filters_serialize_empty() {
        assert_eq!(serde_json::to_value(SearchFilters::default()).unwrap(), json!({}));
    }
}
