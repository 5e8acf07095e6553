pub mod dispatch;
pub mod loader;

pub use crate::domain::model::{ClickEvent, DispatchReport, ExpansionRequest, Fragment};
pub use crate::domain::ports::{Document, ElementHandle, EventSource, FragmentFetcher};
pub use crate::utils::error::Result;
