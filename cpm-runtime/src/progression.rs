//! Bounded fixed-step integer progressions

use std::fmt;

use cpm_core::Value;
use num_bigint::BigInt;
use num_integer::Integer;
use num_traits::{One, Signed, Zero};
use serde::{Deserialize, Serialize};

use crate::error::{RuntimeError, RuntimeResult};

/// `start, start + step, …` up to (excluding) `stop`, with arbitrary
/// precision bounds. `stop` is normalized to the first value not produced.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Progression {
    start: BigInt,
    stop: BigInt,
    step: BigInt,
}

impl Progression {
    pub fn new(start: impl Into<BigInt>, stop: impl Into<BigInt>, step: impl Into<BigInt>) -> RuntimeResult<Self> {
        let start: BigInt = start.into();
        let mut stop: BigInt = stop.into();
        let step: BigInt = step.into();
        if step.is_zero() {
            return Err(RuntimeError::ZeroStep);
        }

        let rem = (&stop - &start).mod_floor(&step);
        if !rem.is_zero() {
            stop += &step - rem;
        }
        if (&stop - &start).signum() != step.signum() {
            stop = start.clone();
        }
        Ok(Self { start, stop, step })
    }

    /// `0, 1, …, stop - 1`
    pub fn upto(stop: impl Into<BigInt>) -> Self {
        let stop: BigInt = stop.into();
        let stop = stop.max(BigInt::zero());
        Self {
            start: BigInt::zero(),
            stop,
            step: BigInt::one(),
        }
    }

    pub fn start(&self) -> &BigInt {
        &self.start
    }

    pub fn stop(&self) -> &BigInt {
        &self.stop
    }

    pub fn step(&self) -> &BigInt {
        &self.step
    }

    pub fn len(&self) -> BigInt {
        (&self.stop - &self.start) / &self.step
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.stop
    }

    /// Element at `index`; negative indices count from the end
    pub fn get(&self, index: &BigInt) -> Option<BigInt> {
        let index = if index.is_negative() { self.len() + index } else { index.clone() };
        if index.is_negative() || index >= self.len() {
            return None;
        }
        Some(&self.start + &self.step * index)
    }

    pub fn first(&self) -> Option<BigInt> {
        (!self.is_empty()).then(|| self.start.clone())
    }

    pub fn last(&self) -> Option<BigInt> {
        (!self.is_empty()).then(|| &self.stop - &self.step)
    }

    pub fn iter(&self) -> impl Iterator<Item = BigInt> + '_ {
        let mut next = self.start.clone();
        std::iter::from_fn(move || {
            if next == self.stop {
                return None;
            }
            let current = next.clone();
            next += &self.step;
            Some(current)
        })
    }
}

impl fmt::Display for Progression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.start.is_zero() && self.step.is_one() {
            write!(f, "range({})", self.stop)
        } else if self.step.is_one() {
            write!(f, "range({}, {})", self.start, self.stop)
        } else {
            write!(f, "range({}, {}, {})", self.start, self.stop, self.step)
        }
    }
}

/// What a `for` loop iterates over
#[derive(Debug, Clone, PartialEq)]
pub enum Iterable {
    Range(Progression),
    Items(Vec<Value>),
}

impl Iterable {
    pub fn len(&self) -> BigInt {
        match self {
            Iterable::Range(p) => p.len(),
            Iterable::Items(items) => BigInt::from(items.len()),
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            Iterable::Range(p) => p.is_empty(),
            Iterable::Items(items) => items.is_empty(),
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Iterable::Range(_) => "range",
            Iterable::Items(_) => "list",
        }
    }

    /// Elements as host values
    pub fn values(&self) -> Box<dyn Iterator<Item = Value> + '_> {
        match self {
            Iterable::Range(p) => Box::new(p.iter().map(Value::Int)),
            Iterable::Items(items) => Box::new(items.iter().cloned()),
        }
    }
}

impl From<Progression> for Iterable {
    fn from(p: Progression) -> Self {
        Iterable::Range(p)
    }
}
