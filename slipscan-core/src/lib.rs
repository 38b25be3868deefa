//! slipscan-core: Core types and date utilities for receipt/statement extraction

pub mod finance;
pub mod time;

pub use finance::{
    Category, CategoryLabel, NormalizedTransaction, SplitItem, SplitType, TxType,
};
pub use time::{format_iso, is_iso_date, iso_from_parts, today_local};
