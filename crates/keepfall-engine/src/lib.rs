//! Keepfall Engine - headless host for the Keepfall simulation.
//!
//! This crate provides the pieces a frontend needs around the gameplay
//! core: configuration loading, the asset registry, frame timing and a
//! scripted game session.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(clippy::unwrap_used)]

pub mod assets;
pub mod config;
pub mod session;
pub mod timing;
