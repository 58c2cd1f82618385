//! Resolved modules.

use crate::pin::ModulePin;
use serde::Serialize;

/// Dependency pins plus documentation and license text
///
/// Holds no reference to the bucket it was read from.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Module {
    pins: Vec<ModulePin>,
    documentation: String,
    documentation_path: Option<String>,
    license: String,
    license_path: Option<String>,
}

impl Module {
    /// Create a module
    #[must_use]
    pub fn new(
        pins: Vec<ModulePin>,
        documentation: Option<(String, String)>,
        license: Option<(String, String)>,
    ) -> Self {
        let (documentation_path, documentation) = split(documentation);
        let (license_path, license) = split(license);
        Self {
            pins,
            documentation,
            documentation_path,
            license,
            license_path,
        }
    }

    /// Dependency pins in lock file order
    #[must_use]
    pub fn pins(&self) -> &[ModulePin] {
        &self.pins
    }

    /// Documentation text, empty if none
    #[must_use]
    pub fn documentation(&self) -> &str {
        &self.documentation
    }

    /// Path the documentation was read from
    #[must_use]
    pub fn documentation_path(&self) -> Option<&str> {
        self.documentation_path.as_deref()
    }

    /// License text, empty if none
    #[must_use]
    pub fn license(&self) -> &str {
        &self.license
    }

    /// Path the license was read from
    #[must_use]
    pub fn license_path(&self) -> Option<&str> {
        self.license_path.as_deref()
    }
}

fn split(file: Option<(String, String)>) -> (Option<String>, String) {
    match file {
        Some((path, text)) => (Some(path), text),
        None => (None, String::new()),
    }
}
