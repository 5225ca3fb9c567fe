//! Test environment abstraction for isolated testing.
//!
//! Provides `TestEnvironment` to manage:
//! - A temporary working directory
//! - Header inputs and generated outputs
//! - Project-local config files
//!
//! # Usage
//!
//! ```ignore
//! use dlwrap_config::testing::TestEnvironment;
//!
//! let env = TestEnvironment::new().unwrap();
//! let input = env.write_input("void foo(int x);\n").unwrap();
//! // run the generator with `input` and `env.output_path`
//! ```

use std::path::PathBuf;
use std::sync::atomic::{AtomicU32, Ordering};
use tempfile::TempDir;

/// Atomic counter for unique test IDs
static TEST_COUNTER: AtomicU32 = AtomicU32::new(0);

/// Isolated test environment with unique paths
pub struct TestEnvironment {
    /// Temporary directory (dropped on cleanup)
    _temp_dir: TempDir,
    /// Working directory for the run (acts as the project root)
    pub project_root: PathBuf,
    /// Default input header path
    pub input_path: PathBuf,
    /// Default generated C path
    pub output_path: PathBuf,
    /// Unique test ID
    pub test_id: u32,
}

impl TestEnvironment {
    /// Create a new isolated test environment
    pub fn new() -> anyhow::Result<Self> {
        let test_id = TEST_COUNTER.fetch_add(1, Ordering::Relaxed);
        let temp_dir = TempDir::new()?;
        let project_root = temp_dir.path().join("project");
        std::fs::create_dir_all(&project_root)?;

        let input_path = project_root.join(format!("wrap-{}.h", test_id));
        let output_path = project_root.join(format!("wrap-{}.c", test_id));

        Ok(Self {
            _temp_dir: temp_dir,
            project_root,
            input_path,
            output_path,
            test_id,
        })
    }

    /// Write the default input header
    pub fn write_input(&self, contents: &str) -> anyhow::Result<PathBuf> {
        std::fs::write(&self.input_path, contents)?;
        Ok(self.input_path.clone())
    }

    /// Write `.dlwrap/config.toml` under the project root
    pub fn write_project_config(&self, contents: &str) -> anyhow::Result<PathBuf> {
        let dir = self.project_root.join(".dlwrap");
        std::fs::create_dir_all(&dir)?;
        let path = dir.join("config.toml");
        std::fs::write(&path, contents)?;
        Ok(path)
    }

    /// Create a test file with content
    pub fn create_file(&self, relative_path: &str, content: &str) -> anyhow::Result<PathBuf> {
        let path = self.project_root.join(relative_path);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&path, content)?;
        Ok(path)
    }

    /// Read back the generated output
    pub fn read_output(&self) -> anyhow::Result<String> {
        Ok(std::fs::read_to_string(&self.output_path)?)
    }
}

impl Default for TestEnvironment {
    fn default() -> Self {
        Self::new().expect("Failed to create test environment")
    }
}
