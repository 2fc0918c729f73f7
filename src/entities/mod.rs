pub mod finalized_order;
pub mod merchant_account;
pub mod pending_checkout;
pub mod product_offering;
pub mod shipping_policy;
pub mod shipping_price_table;
