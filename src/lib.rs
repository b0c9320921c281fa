pub mod autopilot;
pub mod constants;
pub mod engine;
pub mod grid;
pub mod maze;
pub mod pathfinding;
pub mod rng;
pub mod types;
