use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use xbench_core::{BenchError, ValueProvenance};
use xbench_engine::EngineId;

/// Numeric payload of a quantity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    /// One number.
    Scalar(f64),
    /// An ordered sequence, compared element-wise.
    Series(Vec<f64>),
}

impl Value {
    /// The number of a scalar; `None` for series.
    pub fn as_scalar(&self) -> Option<f64> {
        match self {
            Value::Scalar(value) => Some(*value),
            Value::Series(_) => None,
        }
    }

    /// Element count; a scalar counts as one.
    pub fn len(&self) -> usize {
        match self {
            Value::Scalar(_) => 1,
            Value::Series(values) => values.len(),
        }
    }

    /// Whether a series has no elements.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Whether a value was read from solver output or computed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "origin", rename_all = "snake_case")]
pub enum Origin {
    /// Read from solver output.
    Raw,
    /// Filled by a derivation.
    Derived {
        /// Derivation operation name.
        op: String,
    },
}

impl Origin {
    /// Whether the value was computed.
    pub fn is_derived(&self) -> bool {
        matches!(self, Origin::Derived { .. })
    }
}

/// One quantity of one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractedValue {
    /// The number or series.
    pub value: Value,
    /// Raw or derived.
    #[serde(flatten)]
    pub origin: Origin,
    /// Engine, command and source the value came from.
    pub provenance: ValueProvenance,
}

/// A quantity that could not be obtained.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractionFailure {
    /// Quantity that could not be obtained.
    pub quantity: String,
    /// Why, with a stable `extract.*` code.
    pub error: BenchError,
}

/// Every quantity extracted from one run, in extraction order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunQuantities {
    /// Engine and instance the values belong to.
    pub engine: EngineId,
    /// Values by quantity name, in extraction order.
    pub values: IndexMap<String, ExtractedValue>,
    /// Quantities without a value.
    pub failures: Vec<ExtractionFailure>,
}

impl RunQuantities {
    /// Empty set for `engine`.
    pub fn new(engine: EngineId) -> Self {
        Self {
            engine,
            values: IndexMap::new(),
            failures: Vec::new(),
        }
    }

    /// Value of `quantity`.
    pub fn get(&self, quantity: &str) -> Option<&ExtractedValue> {
        self.values.get(quantity)
    }

    /// Scalar value of `quantity`.
    pub fn scalar(&self, quantity: &str) -> Option<f64> {
        self.get(quantity).and_then(|value| value.value.as_scalar())
    }

    /// Merges a later run of the same engine; later values win.
    pub fn merge(&mut self, later: RunQuantities) {
        for (name, value) in later.values {
            self.values.insert(name, value);
        }
        self.failures
            .retain(|failure| !self.values.contains_key(&failure.quantity));
        for failure in later.failures {
            if !self.values.contains_key(&failure.quantity) {
                self.failures.push(failure);
            }
        }
    }
}
