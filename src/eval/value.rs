use core::fmt;

use serde::{Deserialize, Serialize};

use crate::ast::ObsRange;
use crate::currency::Currency;
use crate::eval::evaluator::{EvalError, EvalResult};

/// Bounds `(lo, hi)` on the value of a single currency position.
///
/// Every combinator keeps `lo <= hi`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(from = "[f64; 2]", into = "[f64; 2]")]
pub struct Interval {
    pub lo: f64,
    pub hi: f64,
}

impl Interval {
    pub const ZERO: Interval = Interval { lo: 0.0, hi: 0.0 };
    pub const UNIT: Interval = Interval { lo: 1.0, hi: 1.0 };

    pub fn new(lo: f64, hi: f64) -> Self {
        Self { lo, hi }
    }

    pub fn point(value: f64) -> Self {
        Self {
            lo: value,
            hi: value,
        }
    }

    pub fn is_point(&self) -> bool {
        self.lo == self.hi
    }

    // Sorting the bounds keeps a negative factor from inverting the interval.
    fn sorted(a: f64, b: f64) -> Self {
        Self {
            lo: a.min(b),
            hi: a.max(b),
        }
    }

    /// Taking the opposite side of a position.
    pub fn negate(self) -> Self {
        Self {
            lo: -self.hi,
            hi: -self.lo,
        }
    }

    pub fn scale(self, factor: f64) -> Self {
        Self::sorted(self.lo * factor, self.hi * factor)
    }

    /// Envelope of `self` multiplied by any factor within `range`.
    pub fn scale_range(self, range: ObsRange) -> Self {
        let products = [
            range.min * self.lo,
            range.min * self.hi,
            range.max * self.lo,
            range.max * self.hi,
        ];
        let lo = products.iter().copied().fold(f64::INFINITY, f64::min);
        let hi = products.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        Self { lo, hi }
    }

    pub fn sum(self, other: Self) -> Self {
        Self {
            lo: self.lo + other.lo,
            hi: self.hi + other.hi,
        }
    }

    /// Smallest interval containing both operands.
    pub fn union(self, other: Self) -> Self {
        Self {
            lo: self.lo.min(other.lo),
            hi: self.hi.max(other.hi),
        }
    }
}

impl From<[f64; 2]> for Interval {
    fn from([lo, hi]: [f64; 2]) -> Self {
        Self { lo, hi }
    }
}

impl From<Interval> for [f64; 2] {
    fn from(interval: Interval) -> Self {
        [interval.lo, interval.hi]
    }
}

impl From<(f64, f64)> for Interval {
    fn from((lo, hi): (f64, f64)) -> Self {
        Self { lo, hi }
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if self.is_point() {
            write!(f, "{}", self.lo)
        } else {
            write!(f, "[{}, {}]", self.lo, self.hi)
        }
    }
}

/// One interval per currency, indexed by currency.
///
/// The length is fixed at construction; the only ways to build one are the
/// `zero`/`unit` constructors and the element-wise combinators below, all of
/// which preserve it.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct CurrencyVector(Vec<Interval>);

impl CurrencyVector {
    pub fn zero(currency_count: usize) -> Self {
        Self(vec![Interval::ZERO; currency_count])
    }

    /// `(1, 1)` at `currency`, `(0, 0)` everywhere else.
    pub fn unit(currency_count: usize, currency: usize) -> EvalResult<Self> {
        let mut values = vec![Interval::ZERO; currency_count];
        let slot = values
            .get_mut(currency)
            .ok_or(EvalError::InvalidCurrency {
                index: currency,
                count: currency_count,
            })?;
        *slot = Interval::UNIT;
        Ok(Self(values))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, currency: usize) -> Option<&Interval> {
        self.0.get(currency)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Interval> {
        self.0.iter()
    }

    pub fn as_slice(&self) -> &[Interval] {
        &self.0
    }

    pub fn map(self, f: impl Fn(Interval) -> Interval) -> Self {
        Self(self.0.into_iter().map(f).collect())
    }

    /// Pairs the two vectors by currency index.
    pub fn zip_with(self, other: Self, f: impl Fn(Interval, Interval) -> Interval) -> Self {
        debug_assert_eq!(self.0.len(), other.0.len());
        Self(
            self.0
                .into_iter()
                .zip(other.0)
                .map(|(a, b)| f(a, b))
                .collect(),
        )
    }

    /// Point values, if every position has collapsed to a single number.
    pub fn points(&self) -> Option<Vec<f64>> {
        self.0
            .iter()
            .map(|i| i.is_point().then_some(i.lo))
            .collect()
    }

    /// Non-zero positions labelled with their currency.
    pub fn labelled(&self) -> Vec<(Currency, Interval)> {
        self.0
            .iter()
            .enumerate()
            .filter(|(_, interval)| **interval != Interval::ZERO)
            .filter_map(|(i, interval)| Currency::from_index(i).map(|c| (c, *interval)))
            .collect()
    }

    /// Converts every position into a base currency and sums them.
    ///
    /// `rates[i]` is the price of one unit of currency `i` in the base
    /// currency. Rates must be non-negative and cover every position.
    pub fn collapse(&self, rates: &[f64]) -> EvalResult<Interval> {
        if rates.len() != self.0.len() {
            return Err(EvalError::InvalidExchangeRates(format!(
                "expected {} rates, got {}",
                self.0.len(),
                rates.len()
            )));
        }
        if let Some((i, rate)) = rates
            .iter()
            .enumerate()
            .find(|(_, rate)| !rate.is_finite() || **rate < 0.0)
        {
            return Err(EvalError::InvalidExchangeRates(format!(
                "rate for currency {} is {}",
                i, rate
            )));
        }
        Ok(self
            .0
            .iter()
            .zip(rates)
            .fold(Interval::ZERO, |acc, (interval, rate)| {
                acc.sum(interval.scale(*rate))
            }))
    }
}

impl fmt::Display for CurrencyVector {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let labelled = self.labelled();
        if labelled.is_empty() {
            return write!(f, "{{}}");
        }
        let parts: Vec<String> = labelled
            .iter()
            .map(|(currency, interval)| format!("{}: {}", currency, interval))
            .collect();
        write!(f, "{{{}}}", parts.join(", "))
    }
}

impl IntoIterator for CurrencyVector {
    type Item = Interval;
    type IntoIter = std::vec::IntoIter<Interval>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_negate_swaps_bounds() {
        assert_eq!(Interval::new(-2.0, 5.0).negate(), Interval::new(-5.0, 2.0));
    }

    #[test]
    fn test_scale_negative_factor_resorts() {
        assert_eq!(Interval::new(1.0, 3.0).scale(-2.0), Interval::new(-6.0, -2.0));
        assert_eq!(Interval::new(1.0, 3.0).scale(2.0), Interval::new(2.0, 6.0));
    }

    #[test]
    fn test_scale_range_default() {
        let result = Interval::new(10.0, 20.0).scale_range(ObsRange::default());
        assert_eq!(result.lo, 10.0);
        assert!((result.hi - 24.0).abs() < 1e-9);
    }

    #[test]
    fn test_scale_range_straddling_zero() {
        let result = Interval::new(-1.0, 2.0).scale_range(ObsRange::new(-3.0, 4.0));
        assert_eq!(result, Interval::new(-6.0, 8.0));
    }

    #[test]
    fn test_sum_and_union() {
        let a = Interval::new(1.0, 2.0);
        let b = Interval::new(-1.0, 5.0);
        assert_eq!(a.sum(b), Interval::new(0.0, 7.0));
        assert_eq!(a.union(b), Interval::new(-1.0, 5.0));
    }

    #[test]
    fn test_unit_vector() {
        let vector = CurrencyVector::unit(3, 1).unwrap();
        assert_eq!(
            vector.as_slice(),
            &[Interval::ZERO, Interval::UNIT, Interval::ZERO]
        );
    }

    #[test]
    fn test_unit_vector_out_of_range() {
        assert!(matches!(
            CurrencyVector::unit(3, 3),
            Err(EvalError::InvalidCurrency { index: 3, count: 3 })
        ));
    }

    #[test]
    fn test_points() {
        let vector = CurrencyVector::unit(2, 0).unwrap();
        assert_eq!(vector.points(), Some(vec![1.0, 0.0]));
        let widened = vector.map(|i| i.union(Interval::new(-1.0, 0.0)));
        assert_eq!(widened.points(), None);
    }

    #[test]
    fn test_collapse_with_rates() {
        let usd = CurrencyVector::unit(2, 0).unwrap();
        let eur = CurrencyVector::unit(2, 1).unwrap().map(|i| i.scale(10.0));
        let vector = usd.zip_with(eur, Interval::sum);
        assert_eq!(vector.collapse(&[1.0, 1.5]).unwrap(), Interval::point(16.0));
    }

    #[test]
    fn test_collapse_rejects_bad_rates() {
        let vector = CurrencyVector::zero(2);
        assert!(vector.collapse(&[1.0]).is_err());
        assert!(vector.collapse(&[1.0, -0.5]).is_err());
        assert!(vector.collapse(&[f64::NAN, 1.0]).is_err());
    }

    #[test]
    fn test_display_labels_currencies() {
        let vector = CurrencyVector::unit(6, 1)
            .unwrap()
            .zip_with(CurrencyVector::unit(6, 3).unwrap(), Interval::sum)
            .map(|i| i.scale_range(ObsRange::new(1.0, 2.0)));
        assert_eq!(vector.to_string(), "{EUR: [1, 2], JPY: [1, 2]}");
        assert_eq!(CurrencyVector::zero(6).to_string(), "{}");
    }

    #[test]
    fn test_interval_serializes_as_pair() {
        let json = serde_json::to_string(&CurrencyVector::unit(2, 0).unwrap()).unwrap();
        assert_eq!(json, "[[1.0,1.0],[0.0,0.0]]");
    }
}
