/// CSV export of rendered frames.
pub mod export;
