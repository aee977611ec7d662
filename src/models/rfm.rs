//! RFM-скоринг: квантильные ранги давности, частоты и суммы покупок

use crate::error::{Result, SegmentationError};
use crate::types::{CustomerFeatureVector, RfmScore, RfmSegment, ScoredCustomer};

const N_BINS: usize = 5;
const NEUTRAL_RANK: u8 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RankOrder {
    /// Большее значение получает ранг 5 (частота, сумма)
    HigherIsBetter,
    /// Меньшее значение получает ранг 5 (давность)
    LowerIsBetter,
}

impl RankOrder {
    fn label(&self, bin: usize) -> u8 {
        let bin = bin as u8;
        match self {
            RankOrder::HigherIsBetter => bin,
            RankOrder::LowerIsBetter => N_BINS as u8 + 1 - bin,
        }
    }
}

/// Ранги 1..=5 по пяти корзинам равной численности.
///
/// Значения упорядочиваются по возрастанию, равные - в порядке появления,
/// так что и повторяющиеся значения получают различные порядковые номера,
/// которые режутся по квантилям. Если строк меньше пяти, все корзины
/// заполнить нельзя: равные значения получают один ранг, а различные уровни
/// равномерно раскладываются по шкале 1..=5 (единственный уровень получает
/// нейтральный ранг 3).
pub fn quantile_ranks(values: &[f64], order: RankOrder) -> Vec<u8> {
    let n = values.len();
    if n == 0 {
        return Vec::new();
    }

    if n < N_BINS {
        let mut levels = values.to_vec();
        levels.sort_by(|a, b| a.total_cmp(b));
        levels.dedup_by(|a, b| a.total_cmp(b).is_eq());
        tracing::warn!(
            "Only {} rows for {} quantile bins, collapsing bins over {} distinct values",
            n,
            N_BINS,
            levels.len()
        );
        return collapsed_ranks(values, &levels, order);
    }

    // rank(method = "first"): стабильная сортировка индексов по значению
    let mut positions: Vec<usize> = (0..n).collect();
    positions.sort_by(|&a, &b| values[a].total_cmp(&values[b]));

    let edges: Vec<f64> = (1..=N_BINS)
        .map(|j| 1.0 + (n - 1) as f64 * j as f64 / N_BINS as f64)
        .collect();

    let mut ranks = vec![0u8; n];
    for (position, &idx) in positions.iter().enumerate() {
        let ordinal = (position + 1) as f64;
        let bin = edges
            .iter()
            .position(|&edge| ordinal <= edge + 1e-9)
            .map(|j| j + 1)
            .unwrap_or(N_BINS);
        ranks[idx] = order.label(bin);
    }
    ranks
}

fn collapsed_ranks(values: &[f64], levels: &[f64], order: RankOrder) -> Vec<u8> {
    if levels.len() <= 1 {
        return vec![NEUTRAL_RANK; values.len()];
    }
    let span = (levels.len() - 1) as f64;
    values
        .iter()
        .map(|v| {
            let level = levels
                .iter()
                .position(|l| l.total_cmp(v).is_eq())
                .unwrap_or(0);
            let bin = 1 + (level as f64 * (N_BINS - 1) as f64 / span).round() as usize;
            order.label(bin)
        })
        .collect()
}

pub struct RfmScorer;

impl RfmScorer {
    /// Добавляет RFM-ранги и сегмент к каждому профилю, порядок сохраняется
    pub fn score(features: &[CustomerFeatureVector]) -> Result<Vec<ScoredCustomer>> {
        let recency: Vec<f64> = features.iter().map(|f| f.recency_days as f64).collect();
        let frequency: Vec<f64> = features.iter().map(|f| f.frequency as f64).collect();
        let monetary: Vec<f64> = features.iter().map(|f| f.monetary).collect();

        let scores = Self::score_columns(Some(&recency), &frequency, &monetary)?;

        let scored: Vec<ScoredCustomer> = features
            .iter()
            .cloned()
            .zip(scores)
            .map(|(features, rfm)| ScoredCustomer { features, rfm })
            .collect();

        tracing::info!("Scored {} customers", scored.len());
        Ok(scored)
    }

    /// Скоринг по отдельным колонкам. Отсутствующая или пустая давность
    /// даёт всем нейтральный ранг R = 3.
    pub fn score_columns(
        recency: Option<&[f64]>,
        frequency: &[f64],
        monetary: &[f64],
    ) -> Result<Vec<RfmScore>> {
        let n = frequency.len();
        if monetary.len() != n {
            return Err(SegmentationError::DataShape(format!(
                "frequency has {} rows but monetary has {}",
                n,
                monetary.len()
            )));
        }

        let r_ranks = match recency {
            Some(r) if r.iter().any(|v| v.is_finite()) => {
                if r.len() != n {
                    return Err(SegmentationError::DataShape(format!(
                        "recency has {} rows, expected {}",
                        r.len(),
                        n
                    )));
                }
                quantile_ranks(r, RankOrder::LowerIsBetter)
            }
            _ => vec![NEUTRAL_RANK; n],
        };
        let f_ranks = quantile_ranks(frequency, RankOrder::HigherIsBetter);
        let m_ranks = quantile_ranks(monetary, RankOrder::HigherIsBetter);

        Ok((0..n)
            .map(|i| {
                let rfm_sum = r_ranks[i] + f_ranks[i] + m_ranks[i];
                RfmScore {
                    r_rank: r_ranks[i],
                    f_rank: f_ranks[i],
                    m_rank: m_ranks[i],
                    rfm_sum,
                    rfm_segment: RfmSegment::from_sum(rfm_sum),
                }
            })
            .collect())
    }
}
