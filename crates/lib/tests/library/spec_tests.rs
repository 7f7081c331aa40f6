//! Spec loading and per-target precedence.

use std::collections::BTreeMap;
use std::fs;

use pkgimage_lib::frontend::list_targets;
use pkgimage_lib::image::base_image_ref;
use pkgimage_lib::spec::{SpecError, SpecLoader, YamlSpecLoader};
use tempfile::TempDir;

const SPEC: &str = r#"
name: hello
args:
  BASE: registry.example/base:1
image:
  base: ${BASE}
  post:
    symlinks:
      /usr/bin/a:
        path: /a
targets:
  mariner2:
    image:
      base: registry.example/mariner:2
  windows:
    image:
      post: {}
"#;

fn write_spec(dir: &TempDir) -> YamlSpecLoader {
  let path = dir.path().join("hello.yml");
  fs::write(&path, SPEC).unwrap();
  YamlSpecLoader::new(path)
}

#[test]
fn build_args_override_declared_defaults() {
  let temp = TempDir::new().unwrap();
  let loader = write_spec(&temp);

  let spec = loader.load(&BTreeMap::new()).unwrap();
  assert_eq!(base_image_ref(&spec, "other", "fallback"), "registry.example/base:1");

  let args = BTreeMap::from([("BASE".to_string(), "registry.example/base:9".to_string())]);
  let spec = loader.load(&args).unwrap();
  assert_eq!(base_image_ref(&spec, "other", "fallback"), "registry.example/base:9");
}

#[test]
fn target_base_beats_spec_base() {
  let temp = TempDir::new().unwrap();
  let spec = write_spec(&temp).load(&BTreeMap::new()).unwrap();

  assert_eq!(base_image_ref(&spec, "mariner2", "fallback"), "registry.example/mariner:2");
  assert_eq!(base_image_ref(&spec, "windows", "fallback"), "registry.example/base:1");
}

#[test]
fn target_post_install_replaces_spec_level() {
  let temp = TempDir::new().unwrap();
  let spec = write_spec(&temp).load(&BTreeMap::new()).unwrap();

  assert_eq!(spec.post_install("mariner2").unwrap().symlinks.len(), 1);
  assert!(spec.post_install("windows").unwrap().is_empty());
}

#[test]
fn undeclared_build_arg_is_rejected() {
  let temp = TempDir::new().unwrap();
  let args = BTreeMap::from([("NOPE".to_string(), "1".to_string())]);

  let err = write_spec(&temp).load(&args).unwrap_err();
  assert!(matches!(err, SpecError::UndeclaredArg(ref name) if name == "NOPE"));
}

#[test]
fn missing_file_error_names_the_path() {
  let temp = TempDir::new().unwrap();
  let loader = YamlSpecLoader::new(temp.path().join("missing.yml"));

  let err = loader.load(&BTreeMap::new()).unwrap_err();
  assert!(err.to_string().contains("missing.yml"));
}

#[test]
fn spec_targets_are_listed() {
  let temp = TempDir::new().unwrap();
  let spec = write_spec(&temp).load(&BTreeMap::new()).unwrap();

  let names: Vec<String> = list_targets(&spec).into_iter().map(|t| t.name).collect();
  assert!(names.contains(&"mariner2".to_string()));
  assert!(names.contains(&"windows".to_string()));
}
