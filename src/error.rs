//! Ошибки конвейера сегментации

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SegmentationError {
    /// Отсутствующая или нечисловая колонка, некорректная запись
    #[error("Data shape error: {0}")]
    DataShape(String),

    #[error("Insufficient data: {0}")]
    InsufficientData(String),

    /// Нарушены предусловия кластеризации (проверяются до вычислений)
    #[error("Clustering precondition violated: {0}")]
    ClusteringPrecondition(String),

    #[error("KMeans failed: {0}")]
    Clustering(#[from] linfa_clustering::KMeansError),
}

impl SegmentationError {
    /// Короткое машиночитаемое имя вида ошибки (для API)
    pub fn kind(&self) -> &'static str {
        match self {
            Self::DataShape(_) => "data_shape",
            Self::InsufficientData(_) => "insufficient_data",
            Self::ClusteringPrecondition(_) => "clustering_precondition",
            Self::Clustering(_) => "clustering",
        }
    }
}

pub type Result<T> = std::result::Result<T, SegmentationError>;
