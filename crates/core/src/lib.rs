pub mod annotation;
pub mod capture;
pub mod detection;
pub mod pipeline;
pub mod preview;
pub mod shared;
