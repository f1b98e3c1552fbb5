pub mod compose_pipeline;

pub use compose_pipeline::{ComposePipeline, ComposedOutput, ExtractedPlan};
