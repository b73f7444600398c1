// 6.0: read projections. views are rebuilt from the repository on every query
// and dropped with it. an account view owns its order views; each order view
// reaches back to its account through a lazy link resolved in the same query,
// so the cycle exists at the view level without any ownership cycle.

mod account;
mod order;
mod resolver;

pub use account::TradeAccountView;
pub use order::OrderView;
pub use resolver::{Query, View, ViewCache, ViewLink, ViewResolver};
