// Copyright 2022-2023 VMware, Inc.
// SPDX-License-Identifier: BSD-2-Clause

//! Utilities for finding verifier binaries in the filesystem.

use std::{
    env,
    path::{Path, PathBuf},
};

#[allow(non_snake_case)]
fn REPO_ROOT_PATH() -> &'static Path {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .parent()
        .unwrap_or_else(|| Path::new("."))
}

fn env_var_name(bin: &str) -> String {
    bin.to_uppercase().replace(['-', '.'], "_") + "_BIN"
}

/// Get the right invocation of the verifier with binary name bin.
///
/// First checks if the verifier environment variable is set (eg,
/// UPPAAL_ADAPTER_BIN for uppaal-adapter), which takes first priority. Then
/// checks if the binary is in the `verifiers` directory of the repository.
/// Finally falls back to just using bin as-is (that is, relying on $PATH).
pub fn verifier_path(bin: &str) -> String {
    if let Some(val) = env::var_os(env_var_name(bin)) {
        return val.to_string_lossy().into();
    }
    let bin = if env::consts::OS == "windows" && !bin.ends_with(".exe") {
        bin.to_owned() + ".exe"
    } else {
        bin.to_owned()
    };
    let src_bin_path = REPO_ROOT_PATH().join("verifiers").join(&bin);
    if src_bin_path.exists() {
        return src_bin_path.to_string_lossy().into();
    }
    bin
}

/// Locate the executable a command would launch, searching $PATH for bare
/// names. Returns `None` if it does not exist.
pub fn find_executable(cmd: &str) -> Option<PathBuf> {
    let path = Path::new(cmd);
    if path.components().count() > 1 || path.is_absolute() {
        return path.is_file().then(|| path.to_path_buf());
    }
    let dirs = env::var_os("PATH")?;
    env::split_paths(&dirs)
        .map(|dir| dir.join(cmd))
        .find(|candidate| candidate.is_file())
}
