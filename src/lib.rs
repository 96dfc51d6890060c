//! This is a plugin for Bevy game engine to setup and handle the logic for calculating a single-goal grid FlowField
//!

pub mod flowfields;
pub mod plugin;
pub mod service;

pub mod prelude;
