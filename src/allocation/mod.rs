//! Demand-driven spatial allocation.
//!
//! Each active type is brought to its demanded cell count by searching a
//! cascade of pools, from the least to the most constrained, and flipping
//! the most suitable candidates of each pool in one batch.

pub mod allocator;
pub mod pools;
pub mod ranking;

pub use allocator::{claim_type, AllocationOutcome, CascadingAllocator, ExhaustionEvent, PoolAllocation};
pub use pools::{AreaScope, DegreeOfLimitation, MaskInputs, ScenarioMode, Terrain};
pub use ranking::{order_ascending, CellIndex, rank_map, select_highest, select_lowest};
