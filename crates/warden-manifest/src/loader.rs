//! Manifest file discovery and loading.

use std::path::Path;

use crate::error::{ManifestError, ManifestResult};
use crate::types::Manifest;
use crate::validate;

/// Conventional manifest file name at the root of an agent bundle.
const MANIFEST_FILE_NAME: &str = "warden.toml";

/// Load and validate the manifest inside a bundle directory.
///
/// Looks for `warden.toml` at `bundle_dir`'s root.
///
/// # Errors
///
/// Returns [`ManifestError::NotFound`] if no manifest file exists,
/// [`ManifestError::ParseError`] if it is not valid TOML, or
/// [`ManifestError::SchemaError`] if it fails validation.
pub fn load_dir(bundle_dir: &Path) -> ManifestResult<Manifest> {
    let path = bundle_dir.join(MANIFEST_FILE_NAME);
    if !path.is_file() {
        return Err(ManifestError::NotFound(path.display().to_string()));
    }
    load_file_impl(&path, Some(bundle_dir))
}

/// Load and validate a manifest from a direct file path. Dependency-file
/// existence is checked relative to the file's parent directory.
///
/// # Errors
///
/// Same as [`load_dir`].
pub fn load_file(path: &Path) -> ManifestResult<Manifest> {
    if !path.is_file() {
        return Err(ManifestError::NotFound(path.display().to_string()));
    }
    let bundle_root = path.parent();
    load_file_impl(path, bundle_root)
}

fn load_file_impl(path: &Path, bundle_root: Option<&Path>) -> ManifestResult<Manifest> {
    let raw = std::fs::read_to_string(path).map_err(|source| ManifestError::Io {
        path: path.display().to_string(),
        source,
    })?;

    let manifest: Manifest = toml::from_str(&raw).map_err(|source| ManifestError::ParseError {
        path: path.display().to_string(),
        source,
    })?;

    validate::validate(&manifest, bundle_root)?;
    tracing::info!(agent = %manifest.identity.name, path = %path.display(), "manifest loaded and validated");
    Ok(manifest)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_manifest(dir: &Path, body: &str) {
        std::fs::write(dir.join(MANIFEST_FILE_NAME), body).unwrap();
    }

    #[test]
    fn load_dir_reports_not_found_without_manifest() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_dir(dir.path()).unwrap_err();
        assert!(matches!(err, ManifestError::NotFound(_)));
    }

    #[test]
    fn load_dir_reports_parse_error_on_malformed_toml() {
        let dir = tempfile::tempdir().unwrap();
        write_manifest(dir.path(), "not = [valid");
        let err = load_dir(dir.path()).unwrap_err();
        assert!(matches!(err, ManifestError::ParseError { .. }));
    }

    #[test]
    fn load_dir_reports_schema_error_on_invalid_manifest() {
        let dir = tempfile::tempdir().unwrap();
        write_manifest(dir.path(), "name = \"ab\"\n");
        let err = load_dir(dir.path()).unwrap_err();
        assert!(matches!(err, ManifestError::SchemaError(_)));
    }

    #[test]
    fn load_dir_accepts_a_minimal_valid_manifest() {
        let dir = tempfile::tempdir().unwrap();
        write_manifest(
            dir.path(),
            r#"
            name = "my-agent"

            [runtime]
            run_command = "python3 run.py"
            "#,
        );
        let manifest = load_dir(dir.path()).unwrap();
        assert_eq!(manifest.identity.name, "my-agent");
    }

    #[test]
    fn load_dir_validates_dependency_file_presence() {
        let dir = tempfile::tempdir().unwrap();
        write_manifest(
            dir.path(),
            r#"
            name = "my-agent"

            [runtime]
            run_command = "python3 run.py"
            dependencies = "requirements.txt"
            "#,
        );
        assert!(load_dir(dir.path()).is_err());
        std::fs::write(dir.path().join("requirements.txt"), "anthropic\n").unwrap();
        assert!(load_dir(dir.path()).is_ok());
    }

    #[test]
    fn load_file_rejects_missing_path() {
        let err = load_file(Path::new("/nonexistent/warden.toml")).unwrap_err();
        assert!(matches!(err, ManifestError::NotFound(_)));
    }
}
