//! Command: print version information.

/// Version string: `TILDE_VERSION` at build time, else `dev-` plus the crate version.
#[must_use]
pub const fn version() -> &'static str {
    match option_env!("TILDE_VERSION") {
        Some(v) => v,
        None => concat!("dev-", env!("CARGO_PKG_VERSION")),
    }
}

/// Print the tilde version to stdout.
pub fn run() {
    println!("tilde {}", version());
}
