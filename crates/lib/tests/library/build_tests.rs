//! Building: solve, image config and tests.

use pkgimage_lib::frontend::{FrontendError, Reference, SkipTests};
use pkgimage_lib::graph::{FileAction, Op};

use super::common::{FakeRegistry, LocalPackages, RecordingGraph, RecordingTests, frontend, load_spec, platform};

const SPEC: &str = r#"
name: hello
args:
  VERSION: "1.0"
version: ${VERSION}
image:
  cmd: ["--help"]
targets:
  mariner2:
    image:
      entrypoint: ["/usr/bin/hello"]
"#;

#[test]
fn container_build_solves_once_and_tests_result() {
  let registry = FakeRegistry::default();
  let graph = RecordingGraph::default();
  let tests = RecordingTests::default();
  let spec = load_spec(SPEC);

  let result = frontend(&registry, &LocalPackages)
    .build(&graph, &tests, &platform(), &spec, "mariner2")
    .unwrap();

  assert_eq!(result.reference, Reference("ref-1".to_string()));
  assert_eq!(graph.solved.borrow().len(), 1);
  assert_eq!(
    *tests.runs.borrow(),
    [("mariner2".to_string(), Reference("ref-1".to_string()))]
  );

  let image = result.image.unwrap();
  assert_eq!(image.config.entrypoint, Some(vec!["/usr/bin/hello".to_string()]));
  assert_eq!(image.config.cmd, Some(vec!["--help".to_string()]));
  assert_eq!(image.architecture, "amd64");
}

#[test]
fn test_failures_surface_verbatim() {
  let registry = FakeRegistry::default();
  let graph = RecordingGraph::default();
  let tests = RecordingTests {
    failure: Some("check /usr/bin/hello: file does not exist".to_string()),
    ..Default::default()
  };
  let spec = load_spec(SPEC);

  let err = frontend(&registry, &LocalPackages)
    .build(&graph, &tests, &platform(), &spec, "container")
    .unwrap_err();

  assert!(matches!(err, FrontendError::Tests(_)));
  assert_eq!(err.to_string(), "check /usr/bin/hello: file does not exist");
  assert_eq!(tests.runs.borrow().len(), 1);
}

#[test]
fn resolve_build_writes_expanded_spec() {
  let registry = FakeRegistry::default();
  let graph = RecordingGraph::default();
  let spec = load_spec(SPEC);

  let result = frontend(&registry, &LocalPackages)
    .build(&graph, &SkipTests, &platform(), &spec, "resolve")
    .unwrap();
  assert!(result.image.is_none());

  let solved = graph.solved.borrow();
  let Op::File { action, .. } = &solved[0].ops[0].op else {
    panic!("resolve output is not a file op");
  };
  let FileAction::Mkfile { path, data, .. } = action;
  assert_eq!(path, "spec.yml");
  assert!(data.contains("version: '1.0'") || data.contains("version: \"1.0\""));
  assert!(!data.contains("${VERSION}"));
}

#[test]
fn resolve_keeps_sources_build_and_tests() {
  let registry = FakeRegistry::default();
  let graph = RecordingGraph::default();
  let spec = load_spec(
    r#"
name: hello
args:
  VERSION: "1.0"
sources:
  src:
    git:
      url: https://example.invalid/hello.git
      commit: v${VERSION}
build:
  steps:
    - command: make VERSION=${VERSION}
tests:
  - name: binary exists
    files:
      /usr/bin/hello: {}
"#,
  );

  frontend(&registry, &LocalPackages)
    .build(&graph, &SkipTests, &platform(), &spec, "resolve")
    .unwrap();

  let solved = graph.solved.borrow();
  let Op::File { action, .. } = &solved[0].ops[0].op else {
    panic!("resolve output is not a file op");
  };
  let FileAction::Mkfile { data, .. } = action;
  let resolved = load_spec(data);
  assert_eq!(resolved.extra["sources"]["src"]["git"]["commit"].as_str(), Some("v1.0"));
  assert_eq!(
    resolved.extra["build"]["steps"][0]["command"].as_str(),
    Some("make VERSION=1.0")
  );
  assert_eq!(resolved.extra["tests"][0]["name"].as_str(), Some("binary exists"));
  assert_eq!(resolved, spec);
}

#[test]
fn buildroot_build_skips_tests() {
  let registry = FakeRegistry::default();
  let graph = RecordingGraph::default();
  let tests = RecordingTests::default();
  let spec = load_spec(SPEC);

  let result = frontend(&registry, &LocalPackages)
    .build(&graph, &tests, &platform(), &spec, "buildroot")
    .unwrap();
  assert!(result.image.is_none());
  assert!(tests.runs.borrow().is_empty());
}
