pub mod index;
pub mod model;

pub use index::{StatusCounts, TimeIndex};
pub use model::{LoadPolicy, TimelineModel};
