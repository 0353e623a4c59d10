pub mod etl;
pub mod export;
pub mod pipeline;
pub mod transform;

pub use crate::domain::model::{DebtRecord, LoadSummary, Observation, TransformResult};
pub use crate::domain::ports::{DebtSource, DebtStore, Pipeline, Storage};
pub use crate::utils::error::Result;
