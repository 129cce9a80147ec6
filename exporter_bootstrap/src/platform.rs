// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Platform Abstraction Module
//!
//! Platform-specific abstractions for operating system functionality.
//!
//! ## Architecture Pattern
//!
//! - **Interface**: `Platform` trait defines the contract
//! - **Implementations**:
//!   - `UnixPlatform`: POSIX implementation (Linux + macOS)
//!   - `WindowsPlatform`: Windows API implementation
//! - **Selection**: Compile-time platform selection via `#[cfg]`
//!
//! The bootstrap crate sits outside the enterprise application layers, so it
//! can access platform-specific APIs directly rather than behind a port
//! defined in the domain.
//!
//! ## Usage
//!
//! ```rust
//! use exporter_bootstrap::platform::create_platform;
//!
//! let platform = create_platform();
//! println!("Running on: {}", platform.platform_name());
//! println!("CPU cores: {}", platform.cpu_count());
//! ```

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[cfg(unix)]
mod unix;

#[cfg(windows)]
mod windows;

#[cfg(unix)]
pub use unix::UnixPlatform;

#[cfg(windows)]
pub use windows::WindowsPlatform;

/// Platform-specific errors
#[derive(Debug, Error)]
pub enum PlatformError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Not supported on this platform: {0}")]
    NotSupported(String),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Platform error: {0}")]
    Other(String),
}

/// Platform abstraction trait for OS-specific operations used by the
/// exporter's bootstrap sequence (temp-directory discovery, privilege
/// checks, and resource limit reporting used in startup diagnostics).
#[async_trait]
pub trait Platform: Send + Sync {
    /// System page size, in bytes (typically 4096).
    fn page_size(&self) -> usize;

    /// Number of logical CPU cores available to the process.
    fn cpu_count(&self) -> usize;

    /// Total physical memory, in bytes.
    fn total_memory(&self) -> Result<u64, PlatformError>;

    /// Available (free) memory, in bytes.
    fn available_memory(&self) -> Result<u64, PlatformError>;

    /// Platform-specific line separator (`"\n"` on Unix, `"\r\n"` on Windows).
    fn line_separator(&self) -> &'static str;

    /// Platform-specific `PATH` entry separator (`':'` on Unix, `';'` on
    /// Windows).
    fn path_separator(&self) -> char;

    /// Platform identifier: `"linux"`, `"macos"`, `"windows"`, etc.
    fn platform_name(&self) -> &'static str;

    /// System temporary directory.
    fn temp_dir(&self) -> PathBuf;

    /// `true` if running with elevated privileges (root on Unix,
    /// Administrator on Windows).
    fn is_elevated(&self) -> bool;

    /// Sets file permissions. A no-op returning `Ok` on Windows.
    fn set_permissions(&self, path: &Path, mode: u32) -> Result<(), PlatformError>;

    /// `true` if `path` points to an executable file.
    fn is_executable(&self, path: &Path) -> bool;

    /// Flushes file buffers to disk.
    async fn sync_file(&self, file: &tokio::fs::File) -> Result<(), PlatformError>;
}

#[cfg(unix)]
type PlatformImpl = UnixPlatform;

#[cfg(windows)]
type PlatformImpl = WindowsPlatform;

/// Creates the platform implementation appropriate for the current
/// operating system, selected at compile time.
pub fn create_platform() -> Box<dyn Platform> {
    Box::new(PlatformImpl::new())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_platform_reports_sane_values() {
        let platform = create_platform();

        assert!(platform.cpu_count() >= 1);

        let page_size = platform.page_size();
        assert!(page_size >= 512);
        assert!(page_size <= 65536);

        assert!(!platform.platform_name().is_empty());
    }

    #[test]
    fn line_separator_matches_os() {
        let platform = create_platform();
        let sep = platform.line_separator();

        #[cfg(unix)]
        assert_eq!(sep, "\n");

        #[cfg(windows)]
        assert_eq!(sep, "\r\n");
    }

    #[test]
    fn path_separator_matches_os() {
        let platform = create_platform();
        let sep = platform.path_separator();

        #[cfg(unix)]
        assert_eq!(sep, ':');

        #[cfg(windows)]
        assert_eq!(sep, ';');
    }
}
