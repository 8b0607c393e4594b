use xbench_case::{parse_cases, Case};
use xbench_core::{Family, ValueProvenance};
use xbench_engine::{default_family_rule, EngineId, FamilyRule};
use xbench_extract::{ExtractedValue, Origin, RunQuantities, Value};

pub const ENGINES: [&str; 3] = ["alpha", "beta", "gamma"];

pub fn case(tags: &str) -> Case {
    let text = format!("# @case: sphere_x\n{tags}alpha -run\nbeta -run\n");
    parse_cases(&text, &ENGINES)
        .expect("case parses")
        .remove(0)
}

pub fn engine(name: &str, values: &[(&str, Value, bool)]) -> RunQuantities {
    let mut quantities = RunQuantities::new(EngineId::new(name, None));
    for (quantity, value, derived) in values {
        let origin = if *derived {
            Origin::Derived {
                op: "efficiency_pair".into(),
            }
        } else {
            Origin::Raw
        };
        quantities.values.insert(
            quantity.to_string(),
            ExtractedValue {
                value: value.clone(),
                origin,
                provenance: ValueProvenance {
                    engine: name.to_string(),
                    command: format!("{name} -run"),
                    source: Some("stdout".into()),
                    cpu_seconds: None,
                    max_rss_kb: None,
                },
            },
        );
    }
    quantities
}

pub fn rules(family: Family) -> FamilyRule {
    default_family_rule(family)
}
