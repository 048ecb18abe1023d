//! End-to-end runs of the analysis pipeline over files on disk.

use std::fs;
use std::path::PathBuf;

use connascence::detect::{Category, SafetyRule, Severity};
use connascence::{
    analyze, AnalysisConfig, Detector, DetectorError, Engine, SourceUnit, Violation,
};
use tempfile::TempDir;

fn write(dir: &TempDir, name: &str, content: &str) -> PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, content).expect("should write fixture");
    path
}

/// A Python class spanning exactly `loc` lines with `methods` asserted
/// one-line methods, padded with comments.
///
/// Every method carries an `assert` so the class stays above the assertion
/// density floor. Without them a class this size would emit assertion
/// density violations and compliance would drop below 100.
fn big_class(loc: usize, methods: usize) -> String {
    let mut lines = vec!["class Inventory:".to_string()];
    let padding = loc - 1 - methods * 3;
    for i in 0..padding {
        lines.push(format!("    # note {}", i));
    }
    for i in 0..methods {
        lines.push(format!("    def item_{}(self):", i));
        lines.push("        assert self is not None".to_string());
        lines.push(format!("        return self.slot_{}", i));
    }
    lines.join("\n") + "\n"
}

/// Three renamed copies of one loader.
fn triplets() -> String {
    ["a", "b", "c"]
        .iter()
        .map(|suffix| {
            format!(
                r#"def load_{s}(path_{s}):
    rows_{s} = []
    with open(path_{s}) as handle_{s}:
        for line_{s} in handle_{s}:
            line_{s} = line_{s}.strip()
            if not line_{s}:
                continue
            parts_{s} = line_{s}.split(",")
            rows_{s}.append(parts_{s})
    assert rows_{s} is not None
    return rows_{s}
"#,
                s = suffix
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn safety_violations(violations: &[Violation]) -> Vec<&Violation> {
    violations.iter().filter(|v| v.category.is_safety()).collect()
}

#[test]
fn god_object_and_duplicates_without_safety_violations() {
    let dir = TempDir::new().unwrap();
    let class_file = write(&dir, "inventory.py", &big_class(650, 25));
    let loaders = write(&dir, "loaders.py", &triplets());

    let result = analyze(&[class_file, loaders], AnalysisConfig::default()).unwrap();

    assert_eq!(result.files_analyzed, 2);
    assert!(safety_violations(&result.violations).is_empty());

    assert_eq!(result.god_objects.len(), 1);
    let god = &result.god_objects[0];
    assert_eq!(god.type_name, "Inventory");
    assert_eq!(god.loc, 650);
    assert_eq!(god.method_count, 25);
    assert_eq!(god.score, 2.55);

    assert_eq!(result.duplicate_groups.len(), 1);
    let group = &result.duplicate_groups[0];
    assert_eq!(group.members.len(), 3);
    assert_eq!(group.signature, "load_a/1");
    assert!(group.similarity >= 0.85);

    assert_eq!(result.nasa_compliance_pct, 100.0);
    assert!(result.quality_score < 1.0);
    assert!(result
        .recommendations
        .iter()
        .any(|r| r.title.contains("load_a/1")));
}

#[test]
fn discarded_result_and_missing_assertions() {
    let dir = TempDir::new().unwrap();
    let path = write(
        &dir,
        "process.py",
        r#"def process(path, limit):
    open(path)
    total = 0
    count = 0
    total = total + limit
    count = count + 1
    if total > limit:
        total = limit
    result = total * count
    return result
"#,
    );

    let result = analyze(&[path], AnalysisConfig::default()).unwrap();
    let safety = safety_violations(&result.violations);
    assert_eq!(safety.len(), 2);

    let density: Vec<_> = safety
        .iter()
        .filter(|v| v.category == Category::Safety(SafetyRule::AssertionDensity))
        .collect();
    let returns: Vec<_> = safety
        .iter()
        .filter(|v| v.category == Category::Safety(SafetyRule::ReturnValueCheck))
        .collect();
    assert_eq!(density.len(), 1);
    assert_eq!(density[0].severity, Severity::Medium);
    assert_eq!(returns.len(), 1);
    assert_eq!(returns[0].severity, Severity::High);
    assert_eq!(returns[0].line, 2);

    // (1 + 2) weighted points over 10 logical lines
    assert_eq!(result.logical_lines, 10);
    assert_eq!(result.nasa_compliance_pct, 70.0);
}

#[test]
fn repeated_runs_are_identical() {
    let dir = TempDir::new().unwrap();
    let paths = vec![
        write(&dir, "inventory.py", &big_class(120, 22)),
        write(&dir, "loaders.py", &triplets()),
        write(
            &dir,
            "worker.go",
            "package w\n\nimport \"os\"\n\nfunc clean(p string, n int, m int, k int) {\n\tos.Remove(p)\n}\n",
        ),
    ];

    let first = analyze(&paths, AnalysisConfig::default()).unwrap();
    let second = analyze(&paths, AnalysisConfig::default()).unwrap();
    assert_eq!(first, second);
    assert_eq!(
        serde_json::to_string(&first).unwrap(),
        serde_json::to_string(&second).unwrap()
    );
}

struct Exploding;

impl Detector for Exploding {
    fn name(&self) -> &str {
        "exploding"
    }

    fn category(&self) -> Category {
        Category::Safety(SafetyRule::BoundedIndexing)
    }

    fn detect(&self, unit: &SourceUnit) -> Result<Vec<Violation>, DetectorError> {
        if unit.path.ends_with(".go") {
            panic!("unexpected node");
        }
        Err(DetectorError::Internal("always fails".to_string()))
    }
}

#[test]
fn failing_detector_does_not_change_other_results() {
    let dir = TempDir::new().unwrap();
    let paths = vec![
        write(&dir, "loaders.py", &triplets()),
        write(
            &dir,
            "worker.go",
            "package w\n\nimport \"os\"\n\nfunc clean(p string) {\n\tos.Remove(p)\n}\n",
        ),
    ];

    let baseline = Engine::new(AnalysisConfig::default())
        .unwrap()
        .analyze(&paths);

    let mut engine = Engine::new(AnalysisConfig::default()).unwrap();
    engine.register(Box::new(Exploding)).unwrap();
    let with_failure = engine.analyze(&paths);

    assert_eq!(with_failure.violations, baseline.violations);
    assert_eq!(with_failure.violations_by_category, baseline.violations_by_category);
    assert_eq!(with_failure.detector_failures.len(), 2);
    assert!(with_failure
        .detector_failures
        .iter()
        .all(|f| f.detector == "exploding"));
    assert!(with_failure.detector_failures[1]
        .reason
        .contains("unexpected node"));
}

fn function_of(logical_lines: usize) -> String {
    let mut source = String::from("def long_one(x):\n    assert x is not None\n");
    for i in 0..logical_lines - 3 {
        source.push_str(&format!("    x = x + {}\n", i % 2));
    }
    source.push_str("    return x\n");
    source
}

#[test]
fn function_size_boundary() {
    let dir = TempDir::new().unwrap();
    let config = AnalysisConfig::default().with_enabled(["function_size"]);

    let at_limit = write(&dir, "sixty.py", &function_of(60));
    let result = analyze(&[at_limit], config.clone()).unwrap();
    assert!(result.violations.is_empty());

    let over = write(&dir, "sixty_one.py", &function_of(61));
    let result = analyze(&[over], config).unwrap();
    assert_eq!(result.violations.len(), 1);
    let v = &result.violations[0];
    assert_eq!(v.line, 1);
    assert_eq!(v.span_end.0, 61);
    assert!(v.message.contains("61 logical lines"));
}

#[test]
fn god_object_boundary() {
    let dir = TempDir::new().unwrap();
    let config = AnalysisConfig::default().with_enabled(["god_objects"]);

    let edge = write(&dir, "edge.py", &big_class(500, 20));
    let result = analyze(&[edge], config.clone()).unwrap();
    assert!(result.god_objects.is_empty());

    let long = write(&dir, "long.py", &big_class(501, 20));
    let result = analyze(&[long], config.clone()).unwrap();
    assert_eq!(result.god_objects.len(), 1);

    let wide = write(&dir, "wide.py", &big_class(100, 21));
    let result = analyze(&[wide], config).unwrap();
    assert_eq!(result.god_objects.len(), 1);
}

#[test]
fn unreadable_files_become_ingestion_failures() {
    let dir = TempDir::new().unwrap();
    let good = write(&dir, "ok.py", "def f():\n    assert True\n    return 1\n");
    let missing = dir.path().join("gone.py");

    let result = analyze(&[good, missing], AnalysisConfig::default()).unwrap();
    assert_eq!(result.files_analyzed, 1);
    assert_eq!(result.ingestion_failures.len(), 1);
    assert!(result.ingestion_failures[0].path.ends_with("gone.py"));
    assert!(!result.incomplete);
}

#[test]
fn over_deep_file_is_an_ingestion_failure() {
    let dir = TempDir::new().unwrap();
    let terms = vec!["a"; 20_000].join(" + ");
    let deep = write(
        &dir,
        "generated.py",
        &format!("def f(a):\n    assert a\n    return {}\n", terms),
    );
    let good = write(&dir, "ok.py", "def g():\n    assert True\n    return 1\n");

    let result = analyze(&[deep, good], AnalysisConfig::default()).unwrap();
    assert_eq!(result.files_analyzed, 1);
    assert_eq!(result.ingestion_failures.len(), 1);
    assert!(result.ingestion_failures[0].path.ends_with("generated.py"));
    assert!(result.ingestion_failures[0].reason.contains("nests deeper than"));
    assert!(result.detector_failures.is_empty());
}

#[test]
fn module_functions_are_analyzed_next_to_a_class() {
    let dir = TempDir::new().unwrap();
    let mut source = String::from("class Tiny:\n    pass\n\n");
    for i in 0..25 {
        source.push_str(&format!("def step_{}(x):\n    assert x\n    return x\n\n", i));
    }
    let path = write(&dir, "pipeline.py", &source);

    let config = AnalysisConfig::default().with_enabled(["god_objects"]);
    let result = analyze(&[path], config).unwrap();
    assert_eq!(result.god_objects.len(), 1);
    assert_eq!(result.god_objects[0].type_name, "pipeline");
    assert_eq!(result.god_objects[0].method_count, 25);
}
