//! Simulation core of a grid-based, turn-based tactics game.
//!
//! A [`Battle`](battle::Battle) validates commands, applies them and
//! reports what happened as an ordered list of events. Pathfinding,
//! dash attacks, cover and the data-driven ability engine all run
//! inside that one pipeline.

pub mod battle;
pub mod config;
pub mod error;
pub mod map;
pub mod repository;
pub mod sink;

mod utils;
