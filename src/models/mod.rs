/// Модели сегментации

pub mod rfm;
pub mod clustering;
pub mod summary;

pub use rfm::RfmScorer;
pub use clustering::Clusterer;
