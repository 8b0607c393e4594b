mod common;

use xbench_compare::{compare_case, Status};
use xbench_core::Family;
use xbench_extract::Value;

use common::{case, engine, rules};

const SPHERE_TAGS: &str = "# @tol: 11 16\n# @tol_res: 11 16\n";

#[test]
fn sphere_x_disagreement_in_fifth_digit_fails() {
    let case = case(SPHERE_TAGS);
    let engines = [
        engine("alpha", &[("Cext", Value::Scalar(1.2345), false)]),
        engine("beta", &[("Cext", Value::Scalar(1.2346), false)]),
    ];
    let comparison = compare_case(&case, &engines, rules);
    let pair = comparison.pair("alpha", "beta").expect("pair compared");
    let ext = pair.verdict(Family::Ext).expect("ext verdict");

    let rel = ext.rel_err.expect("relative error");
    assert!((rel - 8.1e-5).abs() < 1e-6, "rel = {rel}");
    let digits = ext.digits.expect("digits");
    assert!((digits - 4.09).abs() < 0.01, "digits = {digits}");
    assert_eq!(ext.status, Status::BelowTolerance);
    assert_eq!(ext.quantity.as_deref(), Some("Cext"));
    assert!(comparison.failed());
    assert_eq!(comparison.failures(), 1);

    // abs and res were produced by neither engine and are not required.
    let missing: Vec<Family> = pair.missing.iter().map(|entry| entry.family).collect();
    assert_eq!(missing, vec![Family::Abs, Family::Res]);
}

#[test]
fn identical_values_pass_with_exact_match() {
    let case = case(SPHERE_TAGS);
    let engines = [
        engine("alpha", &[("Cext", Value::Scalar(2.0), false)]),
        engine("beta", &[("Cext", Value::Scalar(2.0), false)]),
    ];
    let comparison = compare_case(&case, &engines, rules);
    let ext = comparison.pairs[0].verdict(Family::Ext).expect("ext verdict");
    assert_eq!(ext.digits, Some(16.0));
    assert_eq!(ext.status, Status::Pass);
    assert!(ext.exact_match);
    assert!(!ext.above_maximum);
    assert!(!comparison.failed());
}

#[test]
fn raw_candidates_win_over_derived_ones() {
    let case = case(SPHERE_TAGS);
    let engines = [
        engine(
            "alpha",
            &[
                ("Cext", Value::Scalar(3.0), true),
                ("Qext", Value::Scalar(1.5), false),
            ],
        ),
        engine(
            "beta",
            &[
                ("Cext", Value::Scalar(3.0), false),
                ("Qext", Value::Scalar(1.5), false),
            ],
        ),
    ];
    let comparison = compare_case(&case, &engines, rules);
    let ext = comparison.pairs[0].verdict(Family::Ext).expect("ext verdict");
    assert_eq!(ext.quantity.as_deref(), Some("Qext"));
    assert!(!ext.derived);

    let derived_only = [
        engine("alpha", &[("Cext", Value::Scalar(3.0), true)]),
        engine("beta", &[("Cext", Value::Scalar(3.0), false)]),
    ];
    let comparison = compare_case(&case, &derived_only, rules);
    let ext = comparison.pairs[0].verdict(Family::Ext).expect("ext verdict");
    assert_eq!(ext.quantity.as_deref(), Some("Cext"));
    assert!(ext.derived);
}

#[test]
fn needed_family_missing_on_one_side_fails() {
    let case = case("# @tol: 11 16\n# @tol_res: 11 16\n# @tol_force: 4 10\n# @need_force\n");
    let engines = [
        engine("alpha", &[("Cpr", Value::Scalar(1.0e-14), false)]),
        engine("beta", &[]),
    ];
    let comparison = compare_case(&case, &engines, rules);
    let force = comparison.pairs[0].verdict(Family::Force).expect("force verdict");
    assert_eq!(force.status, Status::MissingRequired);
    assert!(comparison.failed());
}

#[test]
fn force_without_cpr_compares_the_raw_force() {
    let case = case("# @tol: 11 16\n# @tol_res: 11 16\n# @tol_force: 4 10\n# @need_force\n");
    let engines = [
        engine("alpha", &[("force", Value::Scalar(5.0), false)]),
        engine("beta", &[("force", Value::Scalar(5.0), false)]),
    ];
    let comparison = compare_case(&case, &engines, rules);
    let force = comparison.pairs[0].verdict(Family::Force).expect("force verdict");
    assert_eq!(force.quantity.as_deref(), Some("force"));
    assert_eq!(force.status, Status::Pass);
}

#[test]
fn optional_family_missing_is_recorded_not_failed() {
    let case = case("# @tol: 11 16\n# @tol_res: 11 16\n# @tol_force: 4 10\n");
    let engines = [
        engine("alpha", &[("Cpr", Value::Scalar(1.0e-14), false)]),
        engine("beta", &[]),
    ];
    let comparison = compare_case(&case, &engines, rules);
    let pair = &comparison.pairs[0];
    assert!(pair.verdict(Family::Force).is_none());
    let force = pair
        .missing
        .iter()
        .find(|entry| entry.family == Family::Force)
        .expect("force recorded as missing");
    assert_eq!(force.missing_on, vec!["beta".to_string()]);
    assert!(!comparison.failed());
}

#[test]
fn series_compare_by_worst_element() {
    let case = case("# @tol: 11 16\n# @tol_res: 11 16\n# @tol_mueller: 3 16\n");
    let engines = [
        engine("alpha", &[("mueller", Value::Series(vec![1.0, 0.5, 0.25]), false)]),
        engine("beta", &[("mueller", Value::Series(vec![1.0, 0.5, 0.2]), false)]),
        engine("gamma", &[("mueller", Value::Series(vec![1.0, 0.5]), false)]),
    ];
    let comparison = compare_case(&case, &engines, rules);

    let ab = comparison.pair("alpha", "beta").expect("alpha/beta");
    let mueller = ab.verdict(Family::Mueller).expect("mueller verdict");
    assert!((mueller.rel_err.expect("rel") - 0.2).abs() < 1e-12);
    assert_eq!(mueller.status, Status::BelowTolerance);

    let ag = comparison.pair("alpha", "gamma").expect("alpha/gamma");
    let shape = ag.verdict(Family::Mueller).expect("mueller verdict");
    assert_eq!(shape.status, Status::Incomparable);
}

#[test]
fn non_finite_values_are_incomparable() {
    let case = case(SPHERE_TAGS);
    let engines = [
        engine("alpha", &[("Cext", Value::Scalar(f64::NAN), false)]),
        engine("beta", &[("Cext", Value::Scalar(1.0), false)]),
    ];
    let comparison = compare_case(&case, &engines, rules);
    let ext = comparison.pairs[0].verdict(Family::Ext).expect("ext verdict");
    assert_eq!(ext.status, Status::Incomparable);
    assert_eq!(ext.digits, None);
}

#[test]
fn skipped_pairs_produce_no_verdicts_in_either_order() {
    let engines = [
        engine("alpha", &[("Cext", Value::Scalar(1.0), false)]),
        engine("beta", &[("Cext", Value::Scalar(5.0), false)]),
        engine("gamma", &[("Cext", Value::Scalar(1.0), false)]),
    ];
    for tag in ["# @skip_pairs: alpha beta\n", "# @skip_pairs: beta alpha\n"] {
        let case = case(&format!("{SPHERE_TAGS}{tag}"));
        let comparison = compare_case(&case, &engines, rules);
        assert!(comparison.pair("alpha", "beta").is_none());
        assert_eq!(comparison.skipped.len(), 1);
        assert_eq!(comparison.pairs.len(), 2);
        assert!(comparison.pair("alpha", "gamma").is_some());
    }
}
