use std::f64::consts::PI;

use indexmap::IndexMap;
use xbench_core::ValueProvenance;
use xbench_engine::{Derivation, EPS0};

use crate::value::{ExtractedValue, Origin, Value};

/// Sphere-equivalent radius of `dipoles` cubes of edge `spacing`.
pub fn aeff_from_dipoles(dipoles: f64, spacing: f64) -> f64 {
    spacing * (3.0 * dipoles / (4.0 * PI)).cbrt()
}

/// `C = Q * pi * aeff^2`.
pub fn cross_section_from_efficiency(efficiency: f64, aeff: f64) -> f64 {
    efficiency * PI * aeff * aeff
}

/// `Q = C / (pi * aeff^2)`. `None` for a zero radius.
pub fn efficiency_from_cross_section(cross_section: f64, aeff: f64) -> Option<f64> {
    let area = PI * aeff * aeff;
    (area != 0.0).then(|| cross_section / area)
}

/// `Cpr = 2F / (eps0 * E0^2)`. `None` for a zero field.
pub fn pressure_cross_section(force: f64, field: f64) -> Option<f64> {
    (field != 0.0).then(|| 2.0 * force / (EPS0 * field * field))
}

/// `Qtrq = T * 2k / (pi * aeff^2 * eps0 * E0^2)` with `k = 2 pi / lambda`.
pub fn torque_efficiency(torque: f64, field: f64, wavelength: f64, aeff: f64) -> Option<f64> {
    if wavelength == 0.0 || aeff == 0.0 || field == 0.0 {
        return None;
    }
    let k = 2.0 * PI / wavelength;
    Some(torque * 2.0 * k / (PI * aeff * aeff * EPS0 * field * field))
}

fn scalar(values: &IndexMap<String, ExtractedValue>, name: &str) -> Option<f64> {
    values.get(name).and_then(|value| value.value.as_scalar())
}

fn insert_derived(
    values: &mut IndexMap<String, ExtractedValue>,
    target: &str,
    value: f64,
    op: &str,
    basis: &str,
) {
    let provenance = values
        .get(basis)
        .map(|value| ValueProvenance {
            source: None,
            ..value.provenance.clone()
        });
    let Some(provenance) = provenance else {
        return;
    };
    values.insert(
        target.to_string(),
        ExtractedValue {
            value: Value::Scalar(value),
            origin: Origin::Derived { op: op.to_string() },
            provenance,
        },
    );
}

/// Runs the derivations in order, filling only quantities that are absent.
pub fn apply_derivations(derivations: &[Derivation], values: &mut IndexMap<String, ExtractedValue>) {
    for derivation in derivations {
        let op = derivation.op_name();
        match derivation {
            Derivation::EfficiencyPair {
                cross_section,
                efficiency,
                radius,
            } => {
                let Some(aeff) = scalar(values, radius) else {
                    continue;
                };
                let has_c = values.contains_key(cross_section);
                let has_q = values.contains_key(efficiency);
                if !has_c {
                    if let Some(q) = scalar(values, efficiency) {
                        let c = cross_section_from_efficiency(q, aeff);
                        insert_derived(values, cross_section, c, op, efficiency);
                    }
                } else if !has_q {
                    if let Some(q) = scalar(values, cross_section)
                        .and_then(|c| efficiency_from_cross_section(c, aeff))
                    {
                        insert_derived(values, efficiency, q, op, cross_section);
                    }
                }
            }
            Derivation::PressureCrossSection {
                force,
                field,
                target,
            } => {
                if values.contains_key(target) {
                    continue;
                }
                if let Some(cpr) = scalar(values, force)
                    .zip(scalar(values, field))
                    .and_then(|(f, e0)| pressure_cross_section(f, e0))
                {
                    insert_derived(values, target, cpr, op, force);
                }
            }
            Derivation::TorqueEfficiency {
                torque,
                field,
                wavelength,
                radius,
                target,
            } => {
                if values.contains_key(target) {
                    continue;
                }
                let inputs = (
                    scalar(values, torque),
                    scalar(values, field),
                    scalar(values, wavelength),
                    scalar(values, radius),
                );
                if let (Some(t), Some(e0), Some(lambda), Some(aeff)) = inputs {
                    if let Some(qtrq) = torque_efficiency(t, e0, lambda, aeff) {
                        insert_derived(values, target, qtrq, op, torque);
                    }
                }
            }
        }
    }
}
