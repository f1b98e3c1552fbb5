pub mod composer;
pub mod etl;
pub mod fragment;
pub mod geometry;
pub mod grouping;
pub mod layout;
pub mod sku;

pub use crate::domain::model::{ComposeReport, ComposeRequest};
pub use crate::domain::ports::{DrawingStore, LayoutSettingsProvider, Pipeline};
pub use crate::utils::error::Result;
pub use geometry::{bbox, Extent, Geometry};
