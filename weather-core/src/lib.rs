//! Core library for the `weather` lookup.
//!
//! This crate defines:
//! - API key resolution from an ordered list of sources
//! - The search controller that owns UI state and the single in-flight fetch
//! - The WeatherAPI.com client behind the `WeatherProvider` trait
//! - Key-value storage, configuration and derived display values
//!
//! It is used by `weather-cli`, but can also be reused by other front ends.

pub mod config;
pub mod controller;
pub mod credential;
pub mod display;
pub mod model;
pub mod provider;
pub mod storage;

pub use config::{Config, Settings};
pub use controller::{Phase, SearchController, SearchState};
pub use credential::{CredentialSource, CredentialSources, choose_api_key};
pub use display::ReadingView;
pub use model::{Condition, Location, WeatherReading};
pub use provider::{FetchError, WeatherApiProvider, WeatherProvider};
pub use storage::{FileStore, KeyValueStore, MemoryStore};
