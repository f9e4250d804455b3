//! End-to-end slicing tests over real files on disk.

use std::fs;
use std::path::{Path, PathBuf};

use dfslice::slice::SliceNode;
use dfslice::{Criterion, SliceDirection, SliceError, Slicer};

fn write(dir: &Path, name: &str, source: &str) {
    let path = dir.join(name);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, source).unwrap();
}

fn backward(dir: &Path, criterion: Criterion) -> Vec<SliceNode> {
    Slicer::new(dir)
        .slice(&criterion, SliceDirection::Backward)
        .unwrap()
        .backward
        .unwrap()
}

fn forward(dir: &Path, criterion: Criterion) -> Vec<SliceNode> {
    Slicer::new(dir)
        .slice(&criterion, SliceDirection::Forward)
        .unwrap()
        .forward
        .unwrap()
}

#[test]
fn backward_simple_assignment() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "example.py", "x = 10\ny = x + 5\n");

    let nodes = backward(dir.path(), Criterion::new("example.py", 2, "y"));
    let target = nodes
        .iter()
        .find(|n| n.line == 2 && n.variable == "y")
        .expect("target assignment");
    assert!(target.dependencies.contains(&"x".to_string()));
    // The producer of x is discovered on the next pass.
    assert!(nodes.iter().any(|n| n.line == 1 && n.variable == "x"));
}

#[test]
fn forward_into_call_argument() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "example.py", "x = 10\ny = x + 5\nprint(y)\n");

    let nodes = forward(dir.path(), Criterion::new("example.py", 2, "y"));
    assert!(nodes
        .iter()
        .any(|n| n.line == 3 && n.operation == "passed to print()"));
}

#[test]
fn backward_across_file_boundary() {
    let dir = tempfile::tempdir().unwrap();
    write(
        dir.path(),
        "utils.py",
        "def process_data(input_file):\n    cleaned = input_file.strip()\n    return cleaned\n",
    );
    write(
        dir.path(),
        "main.py",
        "from utils import process_data\nfile_path = \"data.csv\"\nresult = process_data(file_path)\n",
    );

    let nodes = backward(dir.path(), Criterion::new("main.py", 3, "result"));
    assert!(nodes
        .iter()
        .any(|n| n.file == PathBuf::from("main.py") && n.line == 3 && n.variable == "result"));
    assert!(nodes
        .iter()
        .any(|n| n.file == PathBuf::from("utils.py") && n.function == "process_data"));
}

#[test]
fn unresolved_import_degrades_gracefully() {
    let dir = tempfile::tempdir().unwrap();
    write(
        dir.path(),
        "main.py",
        "from nonexistent import helper\nvalue = 1\nresult = helper(value)\n",
    );

    let nodes = backward(dir.path(), Criterion::new("main.py", 3, "result"));
    assert!(nodes.iter().any(|n| n.line == 3 && n.variable == "result"));
}

#[test]
fn reexport_traced_through_package_root() {
    let dir = tempfile::tempdir().unwrap();
    write(
        dir.path(),
        "pkg/__init__.py",
        "from .engine import transform\n",
    );
    write(
        dir.path(),
        "pkg/engine.py",
        "def transform(raw):\n    shaped = raw.lower()\n    return shaped\n",
    );
    write(
        dir.path(),
        "main.py",
        "from pkg import transform\ntext = \"A\"\nout = transform(text)\n",
    );

    let nodes = backward(dir.path(), Criterion::new("main.py", 3, "out"));
    assert!(nodes
        .iter()
        .any(|n| n.file == PathBuf::from("engine.py") && n.function == "transform"));
}

#[test]
fn forward_skips_unrelated_functions() {
    let dir = tempfile::tempdir().unwrap();
    write(
        dir.path(),
        "scopes.py",
        concat!(
            "def main():\n",
            "    data = load()\n",
            "    out = data\n",
            "\n",
            "def unrelated():\n",
            "    data = other()\n",
            "    print(data)\n",
        ),
    );

    let nodes = forward(dir.path(), Criterion::new("scopes.py", 2, "data"));
    assert!(nodes.iter().any(|n| n.line == 3));
    assert!(
        nodes.iter().all(|n| n.function != "unrelated"),
        "forward slice leaked into a sibling function"
    );
}

#[test]
fn attribute_paths_filtered_to_most_specific() {
    let dir = tempfile::tempdir().unwrap();
    write(
        dir.path(),
        "attrs.py",
        "args = parse()\npath = args.file\n",
    );

    let nodes = backward(dir.path(), Criterion::new("attrs.py", 2, "path"));
    let target = nodes.iter().find(|n| n.line == 2).expect("target node");
    assert!(target.dependencies.contains(&"args.file".to_string()));
    assert!(
        !target.dependencies.contains(&"args".to_string()),
        "prefix survived filtering: {:?}",
        target.dependencies
    );
}

#[test]
fn backward_nodes_are_unique_by_key() {
    let dir = tempfile::tempdir().unwrap();
    write(
        dir.path(),
        "loops.py",
        concat!(
            "items = build()\n",
            "total = 0\n",
            "for item in items:\n",
            "    total = total + item\n",
            "result = total\n",
        ),
    );

    let nodes = backward(dir.path(), Criterion::new("loops.py", 5, "result"));
    let mut keys: Vec<_> = nodes.iter().map(SliceNode::key).collect();
    let before = keys.len();
    keys.sort();
    keys.dedup();
    assert_eq!(before, keys.len());
}

#[test]
fn deep_reassignment_chain_terminates() {
    let dir = tempfile::tempdir().unwrap();
    // Deeper than the pass cap; each pass discovers at most one new link.
    let mut source = String::from("v0 = 1\n");
    for i in 1..=20 {
        source.push_str(&format!("v{i} = v{}\n", i - 1));
    }
    write(dir.path(), "deep.py", &source);

    let nodes = backward(dir.path(), Criterion::new("deep.py", 21, "v20"));
    // Terminates at the cap having collected the nearest links of the chain.
    assert!(nodes.iter().any(|n| n.variable == "v20"));
    assert!(nodes.len() >= 9);
}

#[test]
fn cross_file_disabled_keeps_local_analysis() {
    let dir = tempfile::tempdir().unwrap();
    write(
        dir.path(),
        "utils.py",
        "def process_data(input_file):\n    return input_file\n",
    );
    write(
        dir.path(),
        "main.py",
        "from utils import process_data\nraw = \"x\"\nresult = process_data(raw)\n",
    );

    let slicer = Slicer::with_cross_file(dir.path(), false);
    let result = slicer
        .slice(&Criterion::new("main.py", 3, "result"), SliceDirection::Backward)
        .unwrap();
    let nodes = result.backward.unwrap();
    assert!(nodes.iter().any(|n| n.line == 3));
    assert!(nodes.iter().all(|n| n.file == PathBuf::from("main.py")));
}

#[test]
fn missing_and_broken_files_report_distinct_errors() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "broken.py", "def oops(:\n");
    let slicer = Slicer::new(dir.path());

    let missing = slicer
        .slice(&Criterion::new("absent.py", 1, "x"), SliceDirection::Both)
        .unwrap_err();
    assert!(matches!(missing, SliceError::FileNotFound(_)));

    let broken = slicer
        .slice(&Criterion::new("broken.py", 1, "x"), SliceDirection::Both)
        .unwrap_err();
    assert!(matches!(broken, SliceError::Parse { .. }));
}

#[test]
fn method_call_receiver_joins_backward_slice() {
    let dir = tempfile::tempdir().unwrap();
    write(
        dir.path(),
        "methods.py",
        "rows = []\nrows.append(record)\nout = rows\n",
    );

    let nodes = backward(dir.path(), Criterion::new("methods.py", 3, "out"));
    let call = nodes
        .iter()
        .find(|n| n.operation == ".append()")
        .expect("method call node");
    assert_eq!(call.variable, "rows");
    assert_eq!(call.dependencies, vec!["record"]);
}

#[test]
fn convenience_function_matches_slicer() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "one.py", "a = 1\nb = a\n");
    let criterion = Criterion::new("one.py", 2, "b");

    let via_fn = dfslice::slice(dir.path(), &criterion, SliceDirection::Backward).unwrap();
    let via_slicer = Slicer::new(dir.path())
        .slice(&criterion, SliceDirection::Backward)
        .unwrap();
    assert_eq!(via_fn.backward, via_slicer.backward);
}
