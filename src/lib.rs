//! `phaseloop` - Phase/cycle game loop engine
//!
//! A game loop that walks Fall, Repair, Resolve and Prepare phases on a
//! pulse clock, with reaction challenges armed during Fall and a fixed
//! number of cycles before the game is won or lost.

pub mod challenge;
pub mod cli;
pub mod config;
pub mod error;
pub mod observability;
pub mod phase;
pub mod session;
pub mod timing;
