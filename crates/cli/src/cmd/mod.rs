mod info;
mod plan;
mod root;
mod script;
mod targets;

pub use info::cmd_info;
pub use plan::{PlanArgs, cmd_plan};
pub use root::cmd_root;
pub use script::cmd_script;
pub use targets::cmd_targets;

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result};

use pkgimage_lib::spec::{Spec, SpecLoader, YamlSpecLoader};

fn load_spec(path: &Path, build_args: &BTreeMap<String, String>) -> Result<Spec> {
  YamlSpecLoader::new(path)
    .load(build_args)
    .with_context(|| format!("Failed to load spec: {}", path.display()))
}
