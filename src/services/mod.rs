pub mod aggregation;
pub mod locks;
pub mod recommendations;
pub mod rewards;
pub mod scoring;
