pub mod deal;
pub mod offer;
pub mod patch;
