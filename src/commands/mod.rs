//! CLI command implementations.

pub mod charts;
pub mod monitor;
pub mod suggest;

pub use charts::ChartsCommand;
pub use monitor::MonitorCommand;
pub use suggest::SuggestCommand;
