//! Loading specs from YAML with build-arg substitution.
//!
//! Build args are declared in the spec's `args` block with default values.
//! Callers may override declared args; passing an arg the spec does not
//! declare is an error. Every string value outside the `args` block has
//! `${NAME}` and `$NAME` references replaced with the effective value.
//! References to names that are not args are left as written, and `$$`
//! produces a literal `$`.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde_yaml::{Mapping, Value};
use tracing::debug;

use super::{Spec, SpecError};

/// Something that can produce a resolved [`Spec`] for a set of build args.
pub trait SpecLoader {
  fn load(&self, build_args: &BTreeMap<String, String>) -> Result<Spec, SpecError>;
}

/// Loads a spec from a YAML file on disk.
#[derive(Debug, Clone)]
pub struct YamlSpecLoader {
  path: PathBuf,
}

impl YamlSpecLoader {
  pub fn new(path: impl Into<PathBuf>) -> Self {
    Self { path: path.into() }
  }

  pub fn path(&self) -> &Path {
    &self.path
  }
}

impl SpecLoader for YamlSpecLoader {
  fn load(&self, build_args: &BTreeMap<String, String>) -> Result<Spec, SpecError> {
    let source = fs::read_to_string(&self.path).map_err(|source| SpecError::Read {
      path: self.path.display().to_string(),
      source,
    })?;
    debug!(path = ?self.path, "loaded spec source");
    parse(source.trim(), build_args)
  }
}

/// Parse a YAML spec and substitute build args.
pub fn parse(source: &str, build_args: &BTreeMap<String, String>) -> Result<Spec, SpecError> {
  let mut doc: Value = serde_yaml::from_str(source)?;
  let root = doc.as_mapping_mut().ok_or(SpecError::NotAMapping)?;

  let mut args = declared_args(root)?;
  for (name, value) in build_args {
    match args.get_mut(name) {
      Some(slot) => *slot = value.clone(),
      None => return Err(SpecError::UndeclaredArg(name.clone())),
    }
  }

  for (key, value) in root.iter_mut() {
    if key.as_str() == Some("args") {
      continue;
    }
    substitute_value(value, &args);
  }

  let effective: Mapping = args
    .iter()
    .map(|(k, v)| (Value::String(k.clone()), Value::String(v.clone())))
    .collect();
  root.insert(Value::String("args".to_string()), Value::Mapping(effective));

  let spec: Spec = serde_yaml::from_value(doc)?;
  if spec.name.trim().is_empty() {
    return Err(SpecError::MissingName);
  }
  Ok(spec)
}

fn declared_args(root: &Mapping) -> Result<BTreeMap<String, String>, SpecError> {
  let Some(block) = root.get("args") else {
    return Ok(BTreeMap::new());
  };
  if block.is_null() {
    return Ok(BTreeMap::new());
  }
  let block = block.as_mapping().ok_or(SpecError::InvalidArgs)?;

  let mut args = BTreeMap::new();
  for (key, value) in block {
    let name = key.as_str().ok_or(SpecError::InvalidArgs)?;
    let value = match value {
      Value::Null => String::new(),
      Value::String(s) => s.clone(),
      Value::Bool(b) => b.to_string(),
      Value::Number(n) => n.to_string(),
      _ => return Err(SpecError::InvalidArgs),
    };
    args.insert(name.to_string(), value);
  }
  Ok(args)
}

fn substitute_value(value: &mut Value, args: &BTreeMap<String, String>) {
  match value {
    Value::String(s) => *s = expand(s, args),
    Value::Sequence(items) => items.iter_mut().for_each(|v| substitute_value(v, args)),
    Value::Mapping(map) => map.iter_mut().for_each(|(_, v)| substitute_value(v, args)),
    Value::Tagged(tagged) => substitute_value(&mut tagged.value, args),
    Value::Null | Value::Bool(_) | Value::Number(_) => {}
  }
}

/// Expand `${NAME}`, `$NAME` and `$$` in `input`.
pub fn expand(input: &str, args: &BTreeMap<String, String>) -> String {
  let mut out = String::with_capacity(input.len());
  let mut rest = input;

  while let Some(pos) = rest.find('$') {
    out.push_str(&rest[..pos]);
    let after = &rest[pos + 1..];

    if let Some(tail) = after.strip_prefix('$') {
      out.push('$');
      rest = tail;
      continue;
    }

    if let Some(braced) = after.strip_prefix('{')
      && let Some(end) = braced.find('}')
    {
      let name = &braced[..end];
      match args.get(name) {
        Some(v) => out.push_str(v),
        None => out.push_str(&rest[pos..pos + end + 3]),
      }
      rest = &braced[end + 1..];
      continue;
    }

    let len = after
      .bytes()
      .enumerate()
      .take_while(|(i, b)| *b == b'_' || b.is_ascii_alphabetic() || (*i > 0 && b.is_ascii_digit()))
      .count();
    if len == 0 {
      out.push('$');
      rest = after;
      continue;
    }

    let name = &after[..len];
    match args.get(name) {
      Some(v) => out.push_str(v),
      None => {
        out.push('$');
        out.push_str(name);
      }
    }
    rest = &after[len..];
  }

  out.push_str(rest);
  out
}

#[cfg(test)]
mod tests {
  use super::*;
  use tempfile::TempDir;

  fn args(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
    pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
  }

  const SPEC: &str = r#"
name: hello
version: ${VERSION}
description: "hello at $VERSION built with $$HOME"
args:
  VERSION: "1.0"
  BASE:
image:
  base: registry.example/base:${VERSION}
  entrypoint: ["/usr/bin/hello", "${UNKNOWN}"]
targets:
  mariner2:
    image:
      post:
        symlinks:
          /usr/bin/hello:
            path: /bin/hello-$VERSION
"#;

  mod expand_fn {
    use super::*;

    #[test]
    fn braced_and_bare_references() {
      let vars = args(&[("A", "1"), ("B_2", "two")]);
      assert_eq!(expand("x${A}y-$B_2/z", &vars), "x1y-two/z");
    }

    #[test]
    fn unknown_names_are_left_intact() {
      let vars = args(&[]);
      assert_eq!(expand("${NOPE} $NOPE", &vars), "${NOPE} $NOPE");
    }

    #[test]
    fn double_dollar_is_literal() {
      let vars = args(&[("A", "1")]);
      assert_eq!(expand("$$A", &vars), "$A");
    }

    #[test]
    fn dangling_dollar_and_unclosed_brace() {
      let vars = args(&[("A", "1")]);
      assert_eq!(expand("cost: 5$", &vars), "cost: 5$");
      assert_eq!(expand("${A", &vars), "${A");
    }
  }

  mod parse_fn {
    use super::*;

    #[test]
    fn defaults_are_substituted() {
      let spec = parse(SPEC, &BTreeMap::new()).unwrap();
      assert_eq!(spec.version, "1.0");
      assert_eq!(spec.description, "hello at 1.0 built with $HOME");
      assert_eq!(spec.base_image("mariner2"), Some("registry.example/base:1.0"));
      assert_eq!(spec.args["BASE"], "");
    }

    #[test]
    fn null_arg_default_is_empty() {
      let spec = parse("name: hello\nargs:\n  BASE:\n  TAG: ~\n", &BTreeMap::new()).unwrap();
      assert_eq!(spec.args["BASE"], "");
      assert_eq!(spec.args["TAG"], "");
    }

    #[test]
    fn numeric_arg_defaults_expand_as_text() {
      let spec = parse("name: hello\nversion: ${VERSION}\nrevision: 2\nargs:\n  VERSION: 1.2\n", &BTreeMap::new()).unwrap();
      assert_eq!(spec.version, "1.2");
      assert_eq!(spec.revision, "2");
      assert_eq!(spec.args["VERSION"], "1.2");
    }

    #[test]
    fn unmodeled_keys_are_substituted() {
      let source = "name: hello\nargs:\n  VERSION: \"1.0\"\nsources:\n  src:\n    git:\n      commit: v${VERSION}\n";
      let spec = parse(source, &args(&[("VERSION", "2.0")])).unwrap();
      assert_eq!(spec.extra["sources"]["src"]["git"]["commit"].as_str(), Some("v2.0"));
    }

    #[test]
    fn caller_args_override_defaults() {
      let spec = parse(SPEC, &args(&[("VERSION", "2.3")])).unwrap();
      assert_eq!(spec.version, "2.3");
      assert_eq!(spec.args["VERSION"], "2.3");
      let post = spec.post_install("mariner2").unwrap();
      assert_eq!(post.symlinks["/usr/bin/hello"].path, "/bin/hello-2.3");
    }

    #[test]
    fn unknown_references_survive() {
      let spec = parse(SPEC, &BTreeMap::new()).unwrap();
      let entrypoint = spec.image.unwrap().entrypoint.unwrap();
      assert_eq!(entrypoint[1], "${UNKNOWN}");
    }

    #[test]
    fn undeclared_arg_is_rejected() {
      let err = parse(SPEC, &args(&[("NOT_DECLARED", "x")])).unwrap_err();
      assert!(matches!(err, SpecError::UndeclaredArg(ref n) if n == "NOT_DECLARED"));
      assert!(err.to_string().contains("NOT_DECLARED"));
    }

    #[test]
    fn missing_name_is_rejected() {
      let err = parse("version: 1", &BTreeMap::new()).unwrap_err();
      assert!(matches!(err, SpecError::MissingName));
    }

    #[test]
    fn non_mapping_document_is_rejected() {
      let err = parse("- a\n- b", &BTreeMap::new()).unwrap_err();
      assert!(matches!(err, SpecError::NotAMapping));
    }

    #[test]
    fn invalid_yaml_is_a_parse_error() {
      let err = parse("name: [unterminated", &BTreeMap::new()).unwrap_err();
      assert!(matches!(err, SpecError::Parse(_)));
    }
  }

  mod yaml_loader {
    use super::*;

    #[test]
    fn loads_from_disk() {
      let temp = TempDir::new().unwrap();
      let path = temp.path().join("spec.yml");
      fs::write(&path, SPEC).unwrap();

      let spec = YamlSpecLoader::new(&path).load(&BTreeMap::new()).unwrap();
      assert_eq!(spec.name, "hello");
    }

    #[test]
    fn missing_file_reports_path() {
      let err = YamlSpecLoader::new("/nonexistent/spec.yml")
        .load(&BTreeMap::new())
        .unwrap_err();
      assert!(err.to_string().contains("/nonexistent/spec.yml"));
    }

    #[test]
    fn resolved_spec_round_trips_through_yaml() {
      let spec = parse(SPEC, &args(&[("VERSION", "9")])).unwrap();
      let yaml = spec.to_yaml().unwrap();
      assert!(yaml.contains("version: '9'") || yaml.contains("version: \"9\""));

      let reparsed = parse(&yaml, &BTreeMap::new()).unwrap();
      assert_eq!(reparsed, spec);
    }
  }
}
