//! Data model shared by adapters, the orchestrator and the sinks

mod product;

pub use product::{DraftRejection, ProductDraft, ProductRecord};
