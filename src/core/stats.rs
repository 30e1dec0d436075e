use crate::domain::model::{DemandLevel, MarketSnapshot, PriceObservation, PriceRange};
use crate::utils::error::{Result, ValuationError};

/// Aggregate fields as reported upstream (by the analysis service).
/// Any of them may be absent or implausible; `summarize` decides what to
/// trust.
#[derive(Debug, Clone, Default)]
pub struct AggregateHints {
    pub average_price: Option<f64>,
    pub price_min: Option<f64>,
    pub price_max: Option<f64>,
    pub demand_level: Option<DemandLevel>,
}

/// Reduce price observations into a market snapshot.
///
/// Reported aggregates win when present and positive; otherwise the
/// numbers come straight from the observations (average rounded to the
/// nearest whole currency unit). Demand is never inferred from volume:
/// it is the reported level or Medium.
pub fn summarize(
    observations: Vec<PriceObservation>,
    hints: AggregateHints,
) -> Result<MarketSnapshot> {
    if observations.is_empty() {
        return Err(ValuationError::NoMarketData);
    }

    let prices: Vec<f64> = observations.iter().map(|o| o.price).collect();
    let computed_average = (prices.iter().sum::<f64>() / prices.len() as f64).round();
    let computed_min = prices.iter().copied().fold(f64::INFINITY, f64::min);
    let computed_max = prices.iter().copied().fold(f64::NEG_INFINITY, f64::max);

    let average_price = hints
        .average_price
        .filter(|p| *p > 0.0)
        .unwrap_or(computed_average);
    let min = hints.price_min.filter(|p| *p > 0.0).unwrap_or(computed_min);
    let max = hints.price_max.filter(|p| *p > 0.0).unwrap_or(computed_max);

    Ok(MarketSnapshot {
        recent_sales: observations,
        average_price,
        price_range: PriceRange { min, max },
        demand_level: hints.demand_level.unwrap_or(DemandLevel::Medium),
    })
}
