pub mod data;
pub mod error;
pub mod format;
pub mod freeplay;
pub mod player;
pub mod surface;
