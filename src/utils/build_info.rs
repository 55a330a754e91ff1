use std::fmt;

/// Compile-time build metadata produced by `build.rs`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BuildMetadata {
    pub version: &'static str,
    pub git_hash: &'static str,
    pub git_status: &'static str,
    pub timestamp: &'static str,
    pub target: &'static str,
    pub profile: &'static str,
    pub rustc: &'static str,
}

impl fmt::Display for BuildMetadata {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "compta_core {} ({} {}, {} {}, built {})",
            self.version, self.git_hash, self.git_status, self.target, self.profile, self.timestamp
        )
    }
}

macro_rules! build_env {
    ($name:literal) => {
        match option_env!($name) {
            Some(value) => value,
            None => "unknown",
        }
    };
}

/// Returns the statically-embedded build metadata.
pub fn current() -> BuildMetadata {
    BuildMetadata {
        version: env!("CARGO_PKG_VERSION"),
        git_hash: build_env!("COMPTA_CORE_BUILD_HASH"),
        git_status: build_env!("COMPTA_CORE_BUILD_STATUS"),
        timestamp: build_env!("COMPTA_CORE_BUILD_TIMESTAMP"),
        target: build_env!("COMPTA_CORE_BUILD_TARGET"),
        profile: build_env!("COMPTA_CORE_BUILD_PROFILE"),
        rustc: build_env!("COMPTA_CORE_BUILD_RUSTC"),
    }
}
