//! Command implementations.

pub mod run;
pub mod stats;
pub mod sweep;

pub use self::run::execute_run;
pub use self::stats::execute_stats;
pub use self::sweep::execute_sweep;
