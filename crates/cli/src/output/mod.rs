//! Output formatting for CLI results.

pub mod detail;
pub mod json;
pub mod table;

pub use detail::format_loop_summary;
pub use json::{format_loop_json, format_markets_json};
pub use table::{format_markets_table, format_steps_table, MarketRowData};
