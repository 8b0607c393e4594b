use std::fs;
use std::path::{Path, PathBuf};

pub const ENGINES_YAML: &str = r#"
engines:
  adda:
    detect: ["adda"]
    executable: bin/adda
    env:
      ADDA_TABLES: ./tables
      ADDA_MODE: fast
    instances:
      gpu:
        detect: ["adda_ocl"]
        executable: bin/adda_ocl
        env:
          GPU: "1"
    outputs:
      Cext:
        kind: scalar
        pattern: 'Cext\s*=\s*(?P<value>\S+)'
        unit_factor: 1.0e-12
        occurrence: last
      force:
        kind: scalar
        pattern: 'Frad = \((?P<x>\S+),(?P<y>\S+),(?P<z>\S+)\)'
    aeff:
      pattern: 'aeff\s*=\s*(?P<value>\S+)'
  ifdda:
    detect: ["ifdda", "mpirun -np 2 ifdda"]
    executable: /opt/ifdda/ifdda
    threads_env: null
    prepare:
      - action: copy_env
        var: IFDDA_TABLE
        rewrite: true
        when_contains: -table
    outputs:
      mueller:
        kind: array
        format: columns
        columns: [1, 2]
        source: { glob: "mueller*.dat" }
        transforms: [nonzero, square]
families:
  ext: { quantities: [Qext, Cext], aggregate: mean }
derivations: []
"#;

pub fn write_config(dir: &Path, name: &str, body: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, body).expect("write engine config");
    path
}
