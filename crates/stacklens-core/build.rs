//! Build script for stacklens-core
//!
//! This script checks build requirements before compilation:
//! - Minimum Rust version (let-else and `OnceCell` APIs need Rust 1.70.0+)
//! - Whether the target has a native stack-walk facility
//!
//! ## Backends per target
//!
//! - **Unix** with the `debuginfo` feature: `backtrace` + DWARF
//! - **Linux (glibc)** / **macOS**: `backtrace(3)` + `dladdr(3)`
//! - **Windows**: `RtlCaptureStackBackTrace`
//! - Anything else builds, but captures are always empty

use std::env;

fn main()
{
    println!("cargo:rerun-if-changed=build.rs");

    match rustc_version::version() {
        Ok(rustc_version) => {
            let min_rust_version = rustc_version::Version::new(1, 70, 0);
            if rustc_version < min_rust_version {
                panic!("stacklens-core requires Rust {min_rust_version} or newer, found {rustc_version}");
            }
        }
        // Some build environments hide the compiler version
        Err(_) => println!("cargo:warning=could not verify Rust version"),
    }

    // `cfg!` would describe the host here, the target comes from the environment
    let target_os = env::var("CARGO_CFG_TARGET_OS").unwrap_or_default();
    let target_env = env::var("CARGO_CFG_TARGET_ENV").unwrap_or_default();
    let target_family = env::var("CARGO_CFG_TARGET_FAMILY").unwrap_or_default();
    let debuginfo = env::var_os("CARGO_FEATURE_DEBUGINFO").is_some();

    let unix = target_family.split(',').any(|family| family == "unix");
    let supported = (debuginfo && unix)
        || (target_os == "linux" && target_env == "gnu")
        || target_os == "macos"
        || target_os == "windows";

    if !supported {
        println!(
            "cargo:warning=stacklens-core has no stack capture backend for {target_os}-{target_env}; traces will be empty"
        );
    }
}
