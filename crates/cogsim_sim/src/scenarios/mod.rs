//! One module per scenario script. Each builds its population, runs one
//! scheduler and returns a serialisable report.

pub mod congestion;
pub mod dataset;
pub mod queue;
pub mod redisen;
