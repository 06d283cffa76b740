#![doc(test(attr(deny(warnings))))]

//! BoatBuild core: the hak ediş commission engine for boat-building expenses, with
//! override approval, vendor tracking, JSON persistence and an interactive shell.

pub mod cli;
pub mod config;
pub mod core;
pub mod domain;
pub mod engine;
pub mod storage;
pub mod utils;

use std::sync::Once;

static INIT_TRACING: Once = Once::new();

/// Initializes global tracing and emits a startup info log.
pub fn init() {
    INIT_TRACING.call_once(|| {
        utils::init_tracing();
        tracing::info!(rate = engine::HAK_EDIS_RATE, "BoatBuild core tracing initialized.");
    });
}
