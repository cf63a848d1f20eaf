//! 循环引擎：规则判定、幂等物化、批量驱动

pub mod batch;
pub mod generate;
pub mod rule;

pub use batch::{run_batch, BatchEntry, BatchReport, BatchRequest};
pub use generate::{evaluate, generate, generate_for_date, Outcome};
pub use rule::{should_generate, Decision};
