//! Build metadata for the running binary.
//!
//! `build.rs` records the packages the binary was built from as a compact
//! `name@version;name@version` list. Lookups never fail: a binary built
//! without that list, or without the requested entry, reports
//! [`UNKNOWN_VERSION`].

/// Module path identifying portico in the recorded build list.
pub const MODULE_PATH: &str = "portico";
/// Version reported when no build information is available.
pub const UNKNOWN_VERSION: &str = "unknown";

/// Build list recorded at compile time, if any.
const RECORDED_MODULES: Option<&str> = option_env!("PORTICO_BUILD_MODULES");

/// A module path paired with the version it was built at.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BuildModule {
    /// Module path as recorded by the build.
    pub path: String,
    /// Recorded version, or [`UNKNOWN_VERSION`].
    pub version: String,
}

impl BuildModule {
    fn unknown(path: &str) -> Self {
        Self {
            path: path.to_owned(),
            version: UNKNOWN_VERSION.to_owned(),
        }
    }

    /// Whether the version came from recorded build information.
    #[must_use]
    pub fn is_known(&self) -> bool { self.version != UNKNOWN_VERSION }
}

/// Find `path` in a recorded build list.
///
/// Entries are separated by `;` and have the form `path@version`. Malformed
/// entries and empty versions are skipped.
#[must_use]
pub fn lookup_build_module(recorded: Option<&str>, path: &str) -> BuildModule {
    recorded
        .into_iter()
        .flat_map(|list| list.split(';'))
        .filter_map(|entry| entry.trim().split_once('@'))
        .find(|(entry_path, version)| *entry_path == path && !version.is_empty())
        .map_or_else(
            || BuildModule::unknown(path),
            |(entry_path, version)| BuildModule {
                path: entry_path.to_owned(),
                version: version.to_owned(),
            },
        )
}

/// Build metadata for portico itself.
#[must_use]
pub fn build_module() -> BuildModule { lookup_build_module(RECORDED_MODULES, MODULE_PATH) }
