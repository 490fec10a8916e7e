pub mod constants;
pub mod engine;
pub mod entity;
pub mod grid;
pub mod log;
pub mod pathfinding;
pub mod protocol;
pub mod render;
pub mod rng;
pub mod types;
pub mod world;
