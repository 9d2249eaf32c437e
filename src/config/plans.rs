//! Plan catalog configuration

use serde::Deserialize;
use std::path::PathBuf;

use crate::domain::subscription::{CatalogError, PlanCatalog};

use super::error::ValidationError;

/// Source of the plan catalog
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PlansConfig {
    /// YAML catalog to load instead of the built-in one
    pub catalog_path: Option<PathBuf>,
}

impl PlansConfig {
    /// Loads the configured catalog, or the built-in one when no path is set.
    pub fn catalog(&self) -> Result<PlanCatalog, CatalogError> {
        match &self.catalog_path {
            Some(path) => PlanCatalog::from_path(path),
            None => Ok(PlanCatalog::default()),
        }
    }

    /// Validate plans configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if let Some(path) = &self.catalog_path {
            if !path.is_file() {
                return Err(ValidationError::CatalogNotFound(path.display().to_string()));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::subscription::PlanName;
    use std::io::Write;

    #[test]
    fn test_builtin_catalog_without_path() {
        let config = PlansConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.catalog().unwrap().plans.len(), 3);
    }

    #[test]
    fn test_catalog_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "plans:\n  - name: premium\n    price: \"99.00\"").unwrap();

        let config = PlansConfig {
            catalog_path: Some(file.path().to_path_buf()),
        };
        assert!(config.validate().is_ok());

        let catalog = config.catalog().unwrap();
        assert_eq!(catalog.plans.len(), 1);
        assert_eq!(catalog.plans[0].name, PlanName::Premium);
    }

    #[test]
    fn test_missing_catalog_file_rejected() {
        let config = PlansConfig {
            catalog_path: Some(PathBuf::from("/nonexistent/plans.yaml")),
        };
        assert!(config.validate().is_err());
    }
}
