//! Integration tests for DICE
//!
//! Runs the `.dice` programs in `demos/` through the library pipeline
//! and checks the ordering properties the language guarantees. Output of
//! parallel blocks interleaves freely, so assertions are about sets and
//! happens-before, not exact transcripts.

use std::fs;
use std::path::{Path, PathBuf};

fn discover_dice_files(dir: &str) -> Vec<PathBuf> {
    let path = Path::new(dir);
    if !path.exists() {
        return vec![];
    }

    fs::read_dir(path)
        .unwrap()
        .filter_map(|entry| {
            let entry = entry.ok()?;
            let path = entry.path();
            if path.extension()?.to_str()? == "dice" {
                Some(path)
            } else {
                None
            }
        })
        .collect()
}

fn run_demo(name: &str) -> String {
    let path = Path::new("demos").join(name);
    let source = fs::read_to_string(&path).unwrap();
    dice::run_code(&source)
        .unwrap_or_else(|e| panic!("demo {} failed: {}", name, e))
        .stdout
}

#[test]
fn test_demos_syntax() {
    let files = discover_dice_files("demos");

    assert!(!files.is_empty(), "No demo files found in demos/");

    for file in &files {
        let filename = file.file_name().unwrap().to_str().unwrap();
        let content = fs::read_to_string(file).unwrap();

        let result = dice::check_syntax(&content);
        assert!(result.is_ok(), "Syntax error in {}: {:?}", filename, result.err());
    }
}

#[test]
fn test_hello() {
    let stdout = run_demo("hello.dice");
    assert_eq!(stdout, "Hello, DICE\none\ntwo\n0\n1\n2\n");
}

#[test]
fn test_pipeline() {
    let stdout = run_demo("pipeline.dice");
    let lines: Vec<&str> = stdout.lines().collect();
    assert_eq!(lines.len(), 8);

    // The three workers appear in any order, strictly before the join line.
    let workers: std::collections::HashSet<&str> = lines[..3].iter().copied().collect();
    assert_eq!(
        workers,
        ["worker A done", "worker B done", "worker C done"].into_iter().collect()
    );
    assert_eq!(lines[3], "all workers joined");

    // One branch line per iteration value, in any order.
    let branches: std::collections::HashSet<&str> = lines[4..].iter().copied().collect();
    assert_eq!(
        branches,
        ["branch 0", "branch 1", "branch 2", "branch 3"].into_iter().collect()
    );
}

#[test]
fn test_sensors() {
    let stdout = run_demo("sensors.dice");
    let lines: Vec<&str> = stdout.lines().collect();

    let sensor_positions: Vec<usize> = lines
        .iter()
        .enumerate()
        .filter(|(_, l)| l.contains("センサー値"))
        .map(|(i, _)| i)
        .collect();
    let ready_positions: Vec<usize> = lines
        .iter()
        .enumerate()
        .filter(|(_, l)| l.ends_with("ready"))
        .map(|(i, _)| i)
        .collect();

    assert_eq!(sensor_positions.len(), 2);
    assert_eq!(ready_positions.len(), 2);

    // group.next() is a barrier: every step1 sensor line lands before
    // any step2 ready line.
    let last_sensor = *sensor_positions.iter().max().unwrap();
    let first_ready = *ready_positions.iter().min().unwrap();
    assert!(last_sensor < first_ready);

    // One timed line for the whole startup block, after everything else.
    let timed: Vec<&str> = lines
        .iter()
        .copied()
        .filter(|l| l.starts_with("[TIMED: startup] "))
        .collect();
    assert_eq!(timed.len(), 1);
    assert!(lines.last().unwrap().starts_with("[TIMED: startup] "));
}

#[test]
fn test_error_exit_is_reported() {
    let result = dice::run_code("func main() { p { print(\"ok\"); fail(); } }");
    match result {
        Err(dice::Error::Eval(msg)) => assert!(msg.contains("fail")),
        other => panic!("expected eval error, got {:?}", other),
    }
}
