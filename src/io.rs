/// CSV export of sample trajectories.
pub mod export;
