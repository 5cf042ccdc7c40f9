pub mod detection;
pub mod identity;
pub mod pipeline;
pub mod quality;
pub mod shared;
pub mod tracking;
pub mod video;
