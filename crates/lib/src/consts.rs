//! Fixed paths and references shared by the script builders and the pipeline.

pub const APP_NAME: &str = "pkgimage";

/// Directory inside the worker where the final root filesystem is assembled.
pub const STAGING_PATH: &str = "/tmp/rootfs";

/// Mount point of the package artifact set inside the worker.
pub const ARTIFACTS_MOUNT: &str = "/tmp/rpms";

/// Directory inside the package resolver output that holds the artifact set.
pub const ARTIFACTS_SOURCE_PATH: &str = "/RPMS";

/// Mount point of the generated install script inside the worker.
pub const INSTALL_SCRIPT_MOUNT: &str = "/tmp/install.sh";
pub const INSTALL_SCRIPT_NAME: &str = "install.sh";

pub const NOARCH_DIR: &str = "noarch";

/// Base image used when neither the target nor the spec names one.
pub const DISTROLESS_REF: &str = "mcr.microsoft.com/cbl-mariner/distroless/base:2.0";

/// Image that runs the install script.
pub const WORKER_IMAGE_REF: &str = "mcr.microsoft.com/cbl-mariner/base/core:2.0";

pub const RELEASEVER: &str = "2.0";

pub const PACKAGE_MANAGER: &str = "tdnf";
pub const RPM_BIN: &str = "rpm";

pub const TDNF_CACHE_DIR: &str = "/var/cache/tdnf";
pub const TDNF_CACHE_ID: &str = "mariner2-tdnf-cache";

/// Relative to the staging path.
pub const RPM_MANIFEST_DIR: &str = "var/lib/rpmmanifest";
pub const RPM_MANIFEST_1: &str = "container-manifest-1";
pub const RPM_MANIFEST_2: &str = "container-manifest-2";
pub const RPMDB_DIR: &str = "var/lib/rpm";

/// Query format for the second manifest. The field order is consumed by image scanners.
pub const RPM_MANIFEST_2_QUERY_FORMAT: &str = "%{NAME}\\t%{VERSION}-%{RELEASE}\\t%{INSTALLTIME}\\t%{BUILDTIME}\\t%{VENDOR}\\t(none)\\t%{SIZE}\\t%{ARCH}\\t%{EPOCHNUM}\\t%{SOURCERPM}\\n";

/// Executable search path used to check the staged root, in lookup order.
pub const CHROOT_SEARCH_PATH: &[&str] = &[
  "/usr/local/bin",
  "/usr/local/sbin",
  "/usr/bin",
  "/usr/sbin",
  "/bin",
  "/sbin",
];

/// Name of the file written by the resolve target.
pub const RESOLVED_SPEC_FILE: &str = "spec.yml";

pub const DEFAULT_PATH_ENV: &str = "PATH=/usr/local/sbin:/usr/local/bin:/usr/sbin:/usr/bin:/sbin:/bin";
