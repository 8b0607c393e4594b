#![deny(missing_docs)]
//! Quantity extraction: turns a finished run into named scalar and series values.
//!
//! Extraction is a pure function of the run record (captured stdout plus the
//! collected artifacts) and the engine's declarative output specs. Scalars are
//! read first so that array transforms and derivations can refer to them.

mod array;
mod derive;
mod scalar;
mod sources;
mod value;

use xbench_core::{BenchError, ValueProvenance};
use xbench_engine::{AeffSpec, ArrayFormat, Derivation, EngineSpec, OutputSpec, ScalarSpec};
use xbench_run::RunRecord;

pub use array::{apply_transforms, read_columns, read_dataset, read_fixed_table};
pub use derive::{
    aeff_from_dipoles, apply_derivations, cross_section_from_efficiency,
    efficiency_from_cross_section, pressure_cross_section, torque_efficiency,
};
pub use scalar::{parse_number, scan};
pub use value::{ExtractedValue, ExtractionFailure, Origin, RunQuantities, Value};

/// Quantity name under which the effective radius is stored.
pub const AEFF: &str = "aeff";
/// Quantity name under which the wavelength is stored.
pub const LAMBDA: &str = "lambda";
/// Whether this build can read `dataset` arrays (the `hdf5` feature).
pub const DATASETS_SUPPORTED: bool = cfg!(feature = "hdf5");

/// Quantities of `spec` read from binary datasets.
pub fn dataset_outputs(spec: &EngineSpec) -> Vec<&str> {
    spec.outputs
        .iter()
        .filter(|(_, output)| {
            matches!(output, OutputSpec::Array(array) if matches!(array.format, ArrayFormat::Dataset { .. }))
        })
        .map(|(quantity, _)| quantity.as_str())
        .collect()
}

struct Extraction<'a> {
    spec: &'a EngineSpec,
    record: &'a RunRecord,
    quantities: RunQuantities,
}

impl<'a> Extraction<'a> {
    fn provenance(&self, source: Option<String>) -> ValueProvenance {
        ValueProvenance {
            engine: self.record.engine.label(),
            command: self.record.command.clone(),
            source,
            cpu_seconds: self.record.timing.cpu_seconds,
            max_rss_kb: self.record.timing.max_rss_kb,
        }
    }

    fn store(&mut self, quantity: &str, result: Result<(Value, String), BenchError>) {
        match result {
            Ok((value, source)) => {
                let provenance = self.provenance(Some(source));
                self.quantities.values.insert(
                    quantity.to_string(),
                    ExtractedValue {
                        value,
                        origin: Origin::Raw,
                        provenance,
                    },
                );
            }
            Err(error) => {
                tracing::debug!(
                    engine = %self.record.engine,
                    quantity,
                    error = %error,
                    "quantity not extracted"
                );
                self.quantities.failures.push(ExtractionFailure {
                    quantity: quantity.to_string(),
                    error,
                });
            }
        }
    }

    fn scalar(&self, quantity: &str, spec: &ScalarSpec) -> Result<(Value, String), BenchError> {
        scalar::extract_scalar(quantity, spec, self.record, &self.spec.extra_files)
    }

    fn aeff(&self, spec: &AeffSpec) -> Result<(Value, String), BenchError> {
        match spec {
            AeffSpec::Direct(direct) => self.scalar(AEFF, direct),
            AeffSpec::Dipoles { dipoles, spacing } => {
                let (count, count_source) = self.scalar("aeff.dipoles", dipoles)?;
                let (step, _) = self.scalar("aeff.spacing", spacing)?;
                match (count.as_scalar(), step.as_scalar()) {
                    (Some(count), Some(step)) => {
                        Ok((Value::Scalar(aeff_from_dipoles(count, step)), count_source))
                    }
                    _ => Err(scalar::extraction_error(
                        "extract.aeff_series",
                        AEFF,
                        "dipole count and spacing must be single values",
                    )),
                }
            }
        }
    }
}

/// Extracts every declared quantity of one run, then applies the derivations.
///
/// The exit status plays no part: a solver that printed results and then
/// failed still contributes them. Never fails as a whole: unobtainable
/// quantities are listed in [`RunQuantities::failures`], and a run that never
/// launched lists every declared quantity there.
pub fn extract_run(spec: &EngineSpec, record: &RunRecord, derivations: &[Derivation]) -> RunQuantities {
    let mut extraction = Extraction {
        spec,
        record,
        quantities: RunQuantities::new(record.engine.clone()),
    };

    if let Some(reason) = &record.launch_error {
        let declared = spec
            .outputs
            .keys()
            .map(String::as_str)
            .chain(spec.aeff.as_ref().map(|_| AEFF))
            .chain(spec.lambda.as_ref().map(|_| LAMBDA));
        for quantity in declared {
            extraction.quantities.failures.push(ExtractionFailure {
                quantity: quantity.to_string(),
                error: scalar::extraction_error("extract.not_launched", quantity, reason),
            });
        }
        return extraction.quantities;
    }

    for (quantity, output) in &spec.outputs {
        if let OutputSpec::Scalar(scalar_spec) = output {
            let result = extraction.scalar(quantity, scalar_spec);
            extraction.store(quantity, result);
        }
    }
    if let Some(aeff) = &spec.aeff {
        if !extraction.quantities.values.contains_key(AEFF) {
            let result = extraction.aeff(aeff);
            extraction.store(AEFF, result);
        }
    }
    if let Some(lambda) = &spec.lambda {
        if !extraction.quantities.values.contains_key(LAMBDA) {
            let result = extraction.scalar(LAMBDA, lambda);
            extraction.store(LAMBDA, result);
        }
    }
    for (quantity, output) in &spec.outputs {
        if let OutputSpec::Array(array_spec) = output {
            let result =
                array::extract_array(quantity, array_spec, record, &extraction.quantities.values);
            extraction.store(quantity, result);
        }
    }

    let mut quantities = extraction.quantities;
    apply_derivations(derivations, &mut quantities.values);
    quantities
        .failures
        .retain(|failure| !quantities.values.contains_key(&failure.quantity));
    quantities
}
