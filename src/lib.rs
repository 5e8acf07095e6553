pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::CliConfig;

pub use adapters::dom::{ElementFixture, ElementRef, MemoryDocument, PageFixture};
pub use adapters::events::{ChannelEventSource, ClickSender, ReplayEventSource};
pub use adapters::http::HttpFetcher;
pub use config::LoaderConfig;
pub use core::{dispatch::Dispatcher, loader::FragmentLoader};
pub use utils::error::{LoaderError, Result};
