use anyhow::Result;

use pkgimage_lib::config::FrontendConfig;
use pkgimage_lib::consts::APP_NAME;
use pkgimage_lib::platform::Platform;

use crate::output::{print_json, print_stat};

pub fn cmd_info(config: &FrontendConfig, json: bool) -> Result<()> {
  let platform = Platform::current();

  if json {
    return print_json(&serde_json::json!({
      "version": env!("CARGO_PKG_VERSION"),
      "platform": platform.to_string(),
      "distroless_ref": config.distroless_ref,
      "worker_image": config.worker_image,
      "releasever": config.releasever,
    }));
  }

  println!("{} {}", APP_NAME, env!("CARGO_PKG_VERSION"));
  print_stat("Platform", &platform.to_string());
  print_stat("Default base", &config.distroless_ref);
  print_stat("Worker image", &config.worker_image);
  print_stat("Release", &config.releasever);
  Ok(())
}
