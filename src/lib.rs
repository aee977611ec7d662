//! Customer segmentation - RFM-скоринг и кластеризация клиентов

pub mod api;
pub mod config;
pub mod error;
pub mod models;
pub mod pipeline;
pub mod preprocessing;
pub mod types;

pub use config::ClusteringConfig;
pub use error::{Result, SegmentationError};
pub use models::{Clusterer, RfmScorer};
pub use pipeline::SegmentationPipeline;
pub use preprocessing::{DataNormalizer, FeatureBuilder, OutlierFilter};
pub use types::*;
