use std::io::Write;

use xbench_case::{parse_cases, read_command_file, EnginePair};
use xbench_core::{BenchError, DigitRange, Family};

const ENGINES: [&str; 3] = ["adda", "ifdda", "ddscat"];

#[test]
fn sphere_case_parses_tolerances_and_commands() -> Result<(), BenchError> {
    let text = "\
# engines under test
# @case: sphere_x
# @tol: 11 16
# @tol_res: 11 16
adda -shape sphere -grid 16

ifdda -object sphere 1.0
";
    let cases = parse_cases(text, &ENGINES)?;
    assert_eq!(cases.len(), 1);
    let case = &cases[0];
    assert_eq!(case.id, "sphere_x");
    assert_eq!(case.line, 2);
    assert!(case.shared_ext_abs);
    assert_eq!(case.tolerance(Family::Ext), DigitRange::new(11, 16));
    assert_eq!(case.tolerance(Family::Abs), DigitRange::new(11, 16));
    assert_eq!(case.tolerance(Family::Force), None);
    assert_eq!(case.commands.len(), 2);
    assert_eq!(case.commands[0].text, "adda -shape sphere -grid 16");
    assert_eq!(case.commands[1].line, 7);
    Ok(())
}

#[test]
fn split_tolerances_and_flags() -> Result<(), BenchError> {
    let text = "\
#@case:cube
# @tol_ext: 6 12
# @tol_abs: 5 12
# @tol_res: 3 16
# @tol_force: 4 10
# @need_force
# @skip_pairs: ifdda adda
# @skip_pairs: ddscat,adda
adda -shape cube
";
    let cases = parse_cases(text, &ENGINES)?;
    let case = &cases[0];
    assert!(!case.shared_ext_abs);
    assert_eq!(case.tolerance(Family::Abs), DigitRange::new(5, 12));
    assert!(case.requires(Family::Force));
    assert!(!case.requires(Family::Torque));
    assert_eq!(case.skip_pairs.len(), 2);
    assert!(case.skips("adda", "ifdda"));
    assert!(case.skips("ifdda", "adda"));
    assert!(!case.skips("ifdda", "ddscat"));
    let families: Vec<Family> = case.compared_families().map(|(family, _)| family).collect();
    assert_eq!(
        families,
        vec![Family::Ext, Family::Abs, Family::Res, Family::Force]
    );
    Ok(())
}

#[test]
fn need_without_tolerance_is_config_error() {
    let text = "\
# @case: pressure
# @tol: 11 16
# @tol_res: 11 16
# @need_force
adda -shape sphere
";
    let err = parse_cases(text, &ENGINES).unwrap_err();
    assert!(matches!(err, BenchError::Config(_)));
    assert_eq!(err.code(), "case.need_without_tol");
    assert_eq!(err.info().context.get("line").map(String::as_str), Some("4"));
}

#[test]
fn shared_and_split_tolerance_conflict() {
    let text = "# @case: a\n# @tol_ext: 1 2\n# @tol: 1 2\n";
    let err = parse_cases(text, &ENGINES).unwrap_err();
    assert_eq!(err.code(), "case.shared_and_split_tolerance");

    let text = "# @case: a\n# @tol: 1 2\n# @tol_abs: 1 2\n";
    let err = parse_cases(text, &ENGINES).unwrap_err();
    assert_eq!(err.code(), "case.shared_and_split_tolerance");
}

#[test]
fn missing_required_tolerances_are_reported_at_case_end() {
    let missing_res = "# @case: a\n# @tol: 1 2\nadda\n# @case: b\n";
    assert_eq!(
        parse_cases(missing_res, &ENGINES).unwrap_err().code(),
        "case.missing_tol_res"
    );

    let half_split = "# @case: a\n# @tol_ext: 1 2\n# @tol_res: 1 2\nadda\n";
    assert_eq!(
        parse_cases(half_split, &ENGINES).unwrap_err().code(),
        "case.missing_tol_ext_abs"
    );
}

#[test]
fn structural_errors() {
    let cases = [
        ("# @tol: 1 2\n", "case.tag_before_case"),
        ("adda -x\n", "case.command_before_case"),
        ("# @case:\n", "case.empty_id"),
        (
            "# @case: a\n# @tol: 1 2\n# @tol_res: 1 2\n# @case: a\n",
            "case.duplicate_id",
        ),
        ("# @case: a\n# @tolerance: 1 2\n", "case.unknown_tag"),
        ("# @case: a\n# @tol_res: 1 2\n# @tol_res: 1 2\n", "case.repeated_tag"),
        ("# @case: a\n# @skip_pairs: adda\n", "case.malformed_skip_pair"),
        ("# @case: a\n# @skip_pairs: adda mystery\n", "case.unknown_skip_engine"),
        ("# @case: a\n# @skip_pairs: adda adda\n", "case.degenerate_skip_pair"),
        ("# @case: a\n# @need_force: maybe\n", "case.malformed_flag"),
    ];
    for (text, code) in cases {
        let err = parse_cases(text, &ENGINES).unwrap_err();
        assert_eq!(err.code(), code, "input: {text:?}");
    }
}

#[test]
fn skip_pairs_accept_instance_labels() -> Result<(), BenchError> {
    let known = ["adda", "adda@gpu", "ifdda"];
    let text = "# @case: a\n# @tol: 1 2\n# @tol_res: 1 2\n# @skip_pairs: adda@gpu adda\n";
    let cases = parse_cases(text, &known)?;
    assert_eq!(cases[0].skip_pairs, vec![EnginePair::new("adda", "adda@gpu").unwrap()]);
    Ok(())
}

#[test]
fn reads_from_disk_and_tags_errors_with_path() -> Result<(), Box<dyn std::error::Error>> {
    let mut file = tempfile::NamedTempFile::new()?;
    writeln!(file, "# @case: a")?;
    writeln!(file, "# @tol: 2 16")?;
    writeln!(file, "# @tol_res: 2 16")?;
    writeln!(file, "adda -size 1")?;
    let cases = read_command_file(file.path(), &ENGINES)?;
    assert_eq!(cases[0].commands[0].text, "adda -size 1");

    let missing = file.path().with_extension("absent");
    let err = read_command_file(&missing, &ENGINES).unwrap_err();
    assert_eq!(err.code(), "case.read");
    assert!(err.info().context.contains_key("path"));
    Ok(())
}
