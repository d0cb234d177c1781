//! Bounded state and action domains
//!
//! A [`Domain`] is an interval over integers or reals with an inclusivity
//! flag on each bound. It answers membership queries and draws uniform
//! samples, and integer domains can additionally be enumerated, which is what
//! exhaustive (greedy) action selection relies on.

use std::fmt;
use std::ops::{Range, RangeInclusive};

use num_traits::ToPrimitive;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::{RLError, Result};

/// Element type of a domain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ElementType {
    /// Whole numbers
    Integer,
    /// Double precision reals
    Real,
}

/// A single value drawn from, or tested against, a [`Domain`]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Scalar {
    /// Integer value
    Integer(i64),
    /// Real value
    Real(f64),
}

impl Scalar {
    /// Element type of this value
    #[must_use]
    pub fn element_type(&self) -> ElementType {
        match self {
            Self::Integer(_) => ElementType::Integer,
            Self::Real(_) => ElementType::Real,
        }
    }

    /// Value widened to `f64`
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn as_f64(&self) -> f64 {
        match *self {
            Self::Integer(v) => v as f64,
            Self::Real(v) => v,
        }
    }

    /// Value as an integer, if it is one or is an integral real
    #[must_use]
    pub fn as_i64(&self) -> Option<i64> {
        match *self {
            Self::Integer(v) => Some(v),
            Self::Real(v) if v.fract() == 0.0 => v.to_i64(),
            Self::Real(_) => None,
        }
    }

    /// The same value expressed with element type `target`.
    ///
    /// Integers widen to reals; reals narrow to integers only when integral.
    #[must_use]
    pub fn coerce_to(self, target: ElementType) -> Option<Scalar> {
        match target {
            ElementType::Integer => self.as_i64().map(Self::Integer),
            ElementType::Real => Some(Self::Real(self.as_f64())),
        }
    }

    /// Value as a table index, if it is a non-negative integer
    #[must_use]
    pub fn as_index(&self) -> Option<usize> {
        self.as_i64().and_then(|v| v.to_usize())
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Integer(v) => write!(f, "{v}"),
            Self::Real(v) => write!(f, "{v:?}"),
        }
    }
}

impl From<i64> for Scalar {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<i32> for Scalar {
    fn from(value: i32) -> Self {
        Self::Integer(i64::from(value))
    }
}

impl From<f64> for Scalar {
    fn from(value: f64) -> Self {
        Self::Real(value)
    }
}

/// Inclusivity of one end of a domain
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Boundary {
    /// The bound itself is excluded
    Open,
    /// The bound itself is included
    #[default]
    Closed,
}

impl Boundary {
    fn is_closed(self) -> bool {
        matches!(self, Self::Closed)
    }
}

/// Serialized form of a [`Domain`]; validated on conversion
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DomainSpec {
    /// Lower bound
    pub lower: Scalar,
    /// Upper bound
    pub upper: Scalar,
    /// Inclusivity of the lower bound
    #[serde(default)]
    pub lower_boundary: Boundary,
    /// Inclusivity of the upper bound
    #[serde(default)]
    pub upper_boundary: Boundary,
}

/// Bounded interval over integers or reals.
///
/// Both bounds always share one [`ElementType`] and `lower <= upper`; both are
/// checked by every constructor, so a `Domain` in hand is always well formed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "DomainSpec", into = "DomainSpec")]
pub struct Domain {
    lower: Scalar,
    upper: Scalar,
    lower_boundary: Boundary,
    upper_boundary: Boundary,
}

impl Domain {
    /// Create a domain from its bounds and their inclusivity.
    ///
    /// Fails with [`RLError::Configuration`] when the bounds have different
    /// element types, either real bound is NaN, or `lower > upper`.
    pub fn new(
        lower: impl Into<Scalar>,
        upper: impl Into<Scalar>,
        lower_boundary: Boundary,
        upper_boundary: Boundary,
    ) -> Result<Self> {
        let (lower, upper) = (lower.into(), upper.into());
        let ordered = match (lower, upper) {
            (Scalar::Integer(lo), Scalar::Integer(hi)) => lo <= hi,
            (Scalar::Real(lo), Scalar::Real(hi)) => {
                if lo.is_nan() || hi.is_nan() {
                    return Err(RLError::Configuration(
                        "domain bounds must not be NaN".to_string(),
                    ));
                }
                lo <= hi
            }
            _ => {
                return Err(RLError::Configuration(format!(
                    "domain bounds {lower} and {upper} have different element types"
                )))
            }
        };
        if !ordered {
            return Err(RLError::Configuration(format!(
                "domain lower bound {lower} exceeds upper bound {upper}"
            )));
        }
        Ok(Self {
            lower,
            upper,
            lower_boundary,
            upper_boundary,
        })
    }

    /// `[lower, upper]`
    pub fn closed(lower: impl Into<Scalar>, upper: impl Into<Scalar>) -> Result<Self> {
        Self::new(lower, upper, Boundary::Closed, Boundary::Closed)
    }

    /// `(lower, upper)`
    pub fn open(lower: impl Into<Scalar>, upper: impl Into<Scalar>) -> Result<Self> {
        Self::new(lower, upper, Boundary::Open, Boundary::Open)
    }

    /// `[lower, upper)`
    pub fn closed_open(lower: impl Into<Scalar>, upper: impl Into<Scalar>) -> Result<Self> {
        Self::new(lower, upper, Boundary::Closed, Boundary::Open)
    }

    /// `(lower, upper]`
    pub fn open_closed(lower: impl Into<Scalar>, upper: impl Into<Scalar>) -> Result<Self> {
        Self::new(lower, upper, Boundary::Open, Boundary::Closed)
    }

    /// Lower bound
    #[must_use]
    pub fn lower(&self) -> Scalar {
        self.lower
    }

    /// Upper bound
    #[must_use]
    pub fn upper(&self) -> Scalar {
        self.upper
    }

    /// Whether the lower bound is a member
    #[must_use]
    pub fn lower_inclusive(&self) -> bool {
        self.lower_boundary.is_closed()
    }

    /// Whether the upper bound is a member
    #[must_use]
    pub fn upper_inclusive(&self) -> bool {
        self.upper_boundary.is_closed()
    }

    /// Element type shared by both bounds
    #[must_use]
    pub fn element_type(&self) -> ElementType {
        self.lower.element_type()
    }

    /// Membership test.
    ///
    /// A value of the other element type is coerced first: integers widen to
    /// reals, and a real value against an integer domain is only a member when
    /// it is integral. Never fails.
    pub fn contains(&self, value: impl Into<Scalar>) -> bool {
        let value = value.into();
        match (self.lower, self.upper) {
            (Scalar::Integer(lo), Scalar::Integer(hi)) => value
                .as_i64()
                .is_some_and(|v| self.within(lo, hi, v)),
            (Scalar::Real(lo), Scalar::Real(hi)) => self.within(lo, hi, value.as_f64()),
            _ => false,
        }
    }

    fn within<T: PartialOrd>(&self, lo: T, hi: T, value: T) -> bool {
        let above = if self.lower_inclusive() { value >= lo } else { value > lo };
        let below = if self.upper_inclusive() { value <= hi } else { value < hi };
        above && below
    }

    /// Closed-equivalent integer bounds, `None` when no integer is a member
    fn integer_bounds(&self) -> Option<(i64, i64)> {
        let (Scalar::Integer(lo), Scalar::Integer(hi)) = (self.lower, self.upper) else {
            return None;
        };
        let low = if self.lower_inclusive() { lo } else { lo.checked_add(1)? };
        let high = if self.upper_inclusive() { hi } else { hi.checked_sub(1)? };
        (low <= high).then_some((low, high))
    }

    /// Number of members of an integer domain; `None` for real domains
    #[must_use]
    pub fn cardinality(&self) -> Option<usize> {
        match self.element_type() {
            ElementType::Integer => Some(
                self.integer_bounds()
                    .and_then(|(low, high)| high.abs_diff(low).to_usize())
                    .map_or(0, |span| span.saturating_add(1)),
            ),
            ElementType::Real => None,
        }
    }

    /// Enumerate the members of an integer domain in ascending order.
    ///
    /// Real domains are not enumerable and fail with [`RLError::Unsupported`].
    pub fn values(&self) -> Result<impl Iterator<Item = Scalar>> {
        match self.element_type() {
            ElementType::Integer => {
                let range = self
                    .integer_bounds()
                    .map_or(1..=0, |(low, high)| low..=high);
                Ok(range.map(Scalar::Integer))
            }
            ElementType::Real => Err(RLError::Unsupported(format!(
                "real domain {self} cannot be enumerated"
            ))),
        }
    }

    /// Draw `size` uniform samples using the thread-local generator
    pub fn sample(&self, size: usize) -> Result<Vec<Scalar>> {
        self.sample_with(size, &mut rand::thread_rng())
    }

    /// Draw `size` uniform samples from `rng`.
    ///
    /// Integer domains sample uniformly over their members, with open bounds
    /// moved one step inward. Real domains do the same with one ulp, then
    /// draw uniformly over the closed interval that remains, so the result
    /// is always a member. A domain with no representable member fails with
    /// [`RLError::EmptyDomain`].
    pub fn sample_with<R: Rng + ?Sized>(&self, size: usize, rng: &mut R) -> Result<Vec<Scalar>> {
        match (self.lower, self.upper) {
            (Scalar::Integer(_), Scalar::Integer(_)) => {
                let (low, high) = self
                    .integer_bounds()
                    .ok_or_else(|| RLError::EmptyDomain(self.to_string()))?;
                Ok((0..size)
                    .map(|_| Scalar::Integer(rng.gen_range(low..=high)))
                    .collect())
            }
            (Scalar::Real(lo), Scalar::Real(hi)) => {
                if !(hi - lo).is_finite() {
                    return Err(RLError::Unsupported(format!(
                        "cannot sample unbounded real domain {self}"
                    )));
                }
                let low = if self.lower_inclusive() { lo } else { next_up(lo) };
                let high = if self.upper_inclusive() { hi } else { -next_up(-hi) };
                if low > high {
                    return Err(RLError::EmptyDomain(self.to_string()));
                }
                Ok((0..size)
                    .map(|_| Scalar::Real(rng.gen_range(low..=high)))
                    .collect())
            }
            _ => Err(RLError::Unsupported(format!(
                "domain {self} mixes element types"
            ))),
        }
    }
}

/// Smallest `f64` greater than a finite `x`
#[allow(clippy::float_cmp)]
fn next_up(x: f64) -> f64 {
    if x == 0.0 {
        f64::from_bits(1)
    } else if x > 0.0 {
        f64::from_bits(x.to_bits() + 1)
    } else {
        f64::from_bits(x.to_bits() - 1)
    }
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let open = if self.lower_inclusive() { '[' } else { '(' };
        let close = if self.upper_inclusive() { ']' } else { ')' };
        write!(f, "{open}{}, {}{close}", self.lower, self.upper)
    }
}

impl TryFrom<DomainSpec> for Domain {
    type Error = RLError;

    fn try_from(spec: DomainSpec) -> Result<Self> {
        Self::new(spec.lower, spec.upper, spec.lower_boundary, spec.upper_boundary)
    }
}

impl From<Domain> for DomainSpec {
    fn from(domain: Domain) -> Self {
        Self {
            lower: domain.lower,
            upper: domain.upper,
            lower_boundary: domain.lower_boundary,
            upper_boundary: domain.upper_boundary,
        }
    }
}

impl TryFrom<RangeInclusive<i64>> for Domain {
    type Error = RLError;

    fn try_from(range: RangeInclusive<i64>) -> Result<Self> {
        let (lower, upper) = range.into_inner();
        Self::closed(lower, upper)
    }
}

impl TryFrom<Range<i64>> for Domain {
    type Error = RLError;

    fn try_from(range: Range<i64>) -> Result<Self> {
        Self::closed_open(range.start, range.end)
    }
}

impl TryFrom<RangeInclusive<f64>> for Domain {
    type Error = RLError;

    fn try_from(range: RangeInclusive<f64>) -> Result<Self> {
        let (lower, upper) = range.into_inner();
        Self::closed(lower, upper)
    }
}

impl TryFrom<Range<f64>> for Domain {
    type Error = RLError;

    fn try_from(range: Range<f64>) -> Result<Self> {
        Self::closed_open(range.start, range.end)
    }
}
