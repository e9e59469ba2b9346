//! Shared test utilities for integration and E2E tests.
//!
//! Add `mod common;` to your test file, then use the helpers:
//!
//! ```rust,ignore
//! mod common;
//! use common::prelude::*;
//!
//! #[test]
//! fn test_example() {
//!     let fixture = TestFixture::new().with_config(configs::TWO_GROUPS);
//!     // ... test code
//! }
//! ```

use assert_fs::prelude::*;

/// Re-export commonly used test dependencies for convenience.
pub mod prelude {
    pub use assert_cmd::cargo::cargo_bin_cmd;
    pub use assert_fs::prelude::*;
    #[allow(unused_imports)]
    pub use assert_fs::TempDir;
    pub use predicates::prelude::*;

    #[allow(unused_imports)]
    pub use super::configs;
    pub use super::TestFixture;
}

/// Common configuration documents for testing.
#[allow(dead_code)]
pub mod configs {
    /// Two groups, three repositories.
    pub const TWO_GROUPS: &str = "\
## Tools
- alpha
- beta

## Libraries
- gamma
";

    /// A single group carrying a numeric hill tag.
    pub const TAGGED: &str = "\
## Frontline <!-- 1.1高地 -->
- delta
";
}

/// A scratch mirror root with an optional configuration document.
pub struct TestFixture {
    pub temp: assert_fs::TempDir,
}

#[allow(dead_code)]
impl TestFixture {
    pub fn new() -> Self {
        Self {
            temp: assert_fs::TempDir::new().unwrap(),
        }
    }

    /// Write `content` as the `repos.md` document at the root.
    pub fn with_config(self, content: &str) -> Self {
        self.temp.child("repos.md").write_str(content).unwrap();
        self
    }

    pub fn path(&self) -> &std::path::Path {
        self.temp.path()
    }

    pub fn config_path(&self) -> std::path::PathBuf {
        self.temp.path().join("repos.md")
    }
}
