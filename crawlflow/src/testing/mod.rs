//! Testing helpers: scripted strategies, recording observers and fixtures.

pub mod fixtures;
mod mocks;

pub use mocks::{CollectingFetchObserver, Scripted, ScriptedStrategy};
