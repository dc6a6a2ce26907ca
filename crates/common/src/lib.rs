pub mod money;
pub mod types;

pub use money::Money;
pub use types::{CartLineId, OrderId, ProductId, UserId};
