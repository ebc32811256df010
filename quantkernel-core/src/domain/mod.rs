//! Domain types: candles, signals, and the row-aligned table.

pub mod candle;
pub mod export;
pub mod signal;
pub mod table;

pub use candle::Candle;
pub use export::ExportError;
pub use signal::Signal;
pub use table::{ColumnData, ContractError, Table, BASE_COLUMNS};

