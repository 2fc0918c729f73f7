use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Per-language shipping fees. `doc_id` is a site key or the shared default id.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShippingPriceTable {
    pub doc_id: String,
    #[serde(default)]
    pub prices: HashMap<String, i64>,
}

/// Free-shipping rules. `doc_id` is a site key or the shared default id.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShippingPolicy {
    pub doc_id: String,
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub threshold_by_language: HashMap<String, i64>,
    /// Legacy scalar threshold used when no language key matches
    #[serde(default)]
    pub default_threshold: Option<i64>,
}
