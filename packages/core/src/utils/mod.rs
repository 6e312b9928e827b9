//! Utility types shared across the engine

mod period;

pub use period::PeriodKey;
