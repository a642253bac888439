pub mod identity;
pub mod intervals;
pub mod tick_ranges;

pub use intervals::{ArchiveStatus, TickInterval};
pub use tick_ranges::TickRange;
