pub mod engine;
pub mod render;
pub mod scene;
pub mod worker;

pub use engine::*;
