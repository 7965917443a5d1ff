//! Cycle prediction engine with an encrypted, local calculation history.
//!
//! [`prediction::predict`] and [`calendar::expand_calendar`] are pure: the
//! caller always supplies the reference date. Everything with I/O lives in
//! [`storage`] and [`commands`].

pub mod calendar;
pub mod commands;
pub mod config;
pub mod crypto;
pub mod logging;
pub mod models;
pub mod prediction;
pub mod storage;
pub mod validation;

pub use models::{CycleInput, DayEntry, PredictionResult};
pub use prediction::predict;
