//! The manifest: a JSON file mapping normalized paths to the version
//! currently published for them.

use std::collections::BTreeMap;
use std::path::Path;

use crate::VersionedError;

/// `path -> version` map, serialized as sorted, 4-space indented JSON — the
/// same on-disk shape a hand-maintained manifest file would have, so it
/// diffs cleanly in version control.
pub type Manifest = BTreeMap<String, String>;

pub fn load(path: &Path) -> Result<Manifest, VersionedError> {
    match fs_err::read(path) {
        Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(Manifest::new()),
        Err(err) => Err(err.into()),
    }
}

pub fn save(path: &Path, manifest: &Manifest) -> Result<(), VersionedError> {
    let mut buf = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut serializer = serde_json::Serializer::with_formatter(&mut buf, formatter);
    serde::Serialize::serialize(manifest, &mut serializer)?;
    pod_fs::persist_atomic(path, &buf)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_manifest_loads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let manifest = load(&dir.path().join("manifest.json")).unwrap();
        assert!(manifest.is_empty());
    }

    #[test]
    fn save_then_load_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("manifest.json");
        let mut manifest = Manifest::new();
        manifest.insert("/characters/hero.obj".to_string(), "1.2.3".to_string());

        save(&path, &manifest).unwrap();
        let reloaded = load(&path).unwrap();
        assert_eq!(reloaded, manifest);

        let contents = fs_err::read_to_string(&path).unwrap();
        assert!(contents.contains("    \""));
    }
}
