pub mod catalog;
pub mod orders;
pub mod shipping;

pub use catalog::{LocalizedText, MerchantAccount, ProductOffering, TranslationRow};
pub use orders::{
    CheckoutLine, CheckoutStatus, CustomerAddress, CustomerDetails, FinalizedOrder, OrderItem,
    OrderStatus, PendingCheckout, SettlementStyle,
};
pub use shipping::{ShippingPolicy, ShippingPriceTable};
