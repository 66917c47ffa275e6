//! Pathfinding for 2d scenes made of destructible, material based terrain which may wrap around on either axis
//!

pub mod error;
pub mod navigation;
pub mod plugin;
pub mod scene;
pub mod scheduler;
pub mod settings;

pub mod prelude;
