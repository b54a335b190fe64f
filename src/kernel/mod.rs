//! The presence-reactive behavior kernel.
//!
//! Data flows one way each tick: presence monitor → controller → motion gate
//! and cue channel. Nothing calls back into the controller.

pub mod config;
pub mod controller;
pub mod cue;
pub mod error;
pub mod motion;
pub mod presence;
pub mod timers;
