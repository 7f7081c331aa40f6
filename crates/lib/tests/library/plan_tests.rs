//! Planning: routing plus graph construction, without a graph engine.

use pkgimage_lib::frontend::{FrontendError, Route};
use pkgimage_lib::graph::Op;
use pkgimage_lib::image::ImageSpec;
use pkgimage_lib::pipeline::{STEP_INSTALL, STEP_SYMLINKS};

use super::common::{FailingPackages, FakeRegistry, LocalPackages, frontend, load_spec, platform};

const SPEC: &str = r#"
name: hello
version: "1.0"
image:
  entrypoint: ["/usr/bin/hello"]
  env:
    GREETING: hi
targets:
  mariner2:
    image:
      base: registry.example/mariner/base:2.0
      post:
        symlinks:
          /usr/bin/hello:
            path: /bin/hello
"#;

#[test]
fn container_target_uses_target_base_and_symlinks() {
  let registry = FakeRegistry::default();
  let spec = load_spec(SPEC);

  let plan = frontend(&registry, &LocalPackages)
    .plan(&platform(), &spec, "mariner2")
    .unwrap();

  assert_eq!(
    plan.route,
    Route::Container {
      target_key: "mariner2".to_string()
    }
  );
  let sources: Vec<&str> = plan.definition.sources().collect();
  assert!(sources.contains(&"docker-image://registry.example/mariner/base:2.0"));
  assert!(sources.contains(&"local://rpms-hello"));
  assert!(plan.definition.position_by_name(STEP_SYMLINKS).is_some());

  let image = plan.image.unwrap();
  assert_eq!(image.env_value("GREETING"), Some("hi"));
  assert_eq!(image.config.entrypoint, Some(vec!["/usr/bin/hello".to_string()]));
}

#[test]
fn generic_container_target_uses_spec_defaults() {
  let registry = FakeRegistry::default();
  let spec = load_spec(SPEC);

  let plan = frontend(&registry, &LocalPackages)
    .plan(&platform(), &spec, "container")
    .unwrap();

  let sources: Vec<&str> = plan.definition.sources().collect();
  assert!(sources.contains(&"docker-image://mcr.microsoft.com/cbl-mariner/distroless/base:2.0"));
  assert!(plan.definition.position_by_name(STEP_SYMLINKS).is_none());
  assert_eq!(plan.definition.execs().count(), 1);
}

#[test]
fn worker_runs_install_with_its_image_environment() {
  let mut worker = ImageSpec::for_platform(&platform());
  worker.config.env.push("TDNF_OPTS=--quiet".to_string());
  let registry = FakeRegistry::default().with_image("mcr.microsoft.com/cbl-mariner/base/core:2.0", worker);
  let spec = load_spec(SPEC);

  let plan = frontend(&registry, &LocalPackages)
    .plan(&platform(), &spec, "container")
    .unwrap();

  let install = &plan.definition.ops[plan.definition.position_by_name(STEP_INSTALL).unwrap()];
  let Op::Exec { meta, .. } = &install.op else {
    panic!("install step is not an exec");
  };
  assert!(meta.env.contains(&"TDNF_OPTS=--quiet".to_string()));
}

#[test]
fn every_op_is_tagged_with_the_platform() {
  let registry = FakeRegistry::default();
  let spec = load_spec(SPEC);

  let plan = frontend(&registry, &LocalPackages)
    .plan(&platform(), &spec, "mariner2")
    .unwrap();

  for entry in plan.definition.execs() {
    assert_eq!(entry.constraints.platform.as_ref(), Some(&platform()));
    assert_eq!(entry.constraints.progress_group.as_deref(), Some("Build container: hello"));
  }
}

#[test]
fn buildroot_is_the_default_target() {
  let registry = FakeRegistry::default();
  let spec = load_spec(SPEC);

  let plan = frontend(&registry, &LocalPackages).plan(&platform(), &spec, "").unwrap();
  assert_eq!(plan.route, Route::Buildroot);
  assert_eq!(plan.definition.sources().collect::<Vec<_>>(), ["local://buildroot-hello"]);
  assert!(plan.image.is_none());
}

#[test]
fn resolve_has_no_image_lookups() {
  let registry = FakeRegistry::default();
  let spec = load_spec(SPEC);

  let plan = frontend(&registry, &LocalPackages)
    .plan(&platform(), &spec, "resolve")
    .unwrap();
  assert_eq!(plan.route, Route::Resolve);
  assert!(registry.lookups.borrow().is_empty());
}

#[test]
fn unknown_target_fails_before_any_work() {
  let registry = FakeRegistry::default();
  let spec = load_spec(SPEC);

  let err = frontend(&registry, &LocalPackages)
    .plan(&platform(), &spec, "garbage")
    .unwrap_err();
  assert!(err.to_string().contains("garbage"));
  assert!(registry.lookups.borrow().is_empty());
}

#[test]
fn package_failures_name_the_target() {
  let registry = FakeRegistry::default();
  let spec = load_spec(SPEC);

  let err = frontend(&registry, &FailingPackages)
    .plan(&platform(), &spec, "mariner2")
    .unwrap_err();
  assert!(matches!(err, FrontendError::Packages { ref target, .. } if target == "mariner2"));
  assert!(err.to_string().contains("rpmbuild exited with status 1"));
}
