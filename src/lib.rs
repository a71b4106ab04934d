//! This is a plugin for the Bevy game engine to handle hierarchical multi-resolution
//! path planning for large crowds of agents inside a lockstep simulation
//!

pub mod pathing;
pub mod plugin;

pub mod prelude;
