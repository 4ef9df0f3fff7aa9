pub mod api;
pub mod app;
pub mod config;
pub mod conversion;
pub mod report;
pub mod session;
pub mod source;
pub mod utils;

pub use conversion::{convert, ConversionError, Converter, FormatKind};
pub use report::ResultTable;
pub use source::{CellValue, TabularSource};
