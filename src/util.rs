use anyhow::Context;
use chrono::{Local, Utc};
use std::fs;
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// Create `<base>/runs/<uuid>` and return it.
pub fn create_run_dir(base: &Path) -> anyhow::Result<PathBuf> {
    let run_id = Uuid::new_v4().to_string();
    let dir = base.join("runs").join(run_id);
    fs::create_dir_all(&dir).with_context(|| format!("failed to create run dir {:?}", dir))?;
    Ok(dir)
}

pub fn write_artifact(dir: &Path, name: &str, content: &str) -> anyhow::Result<()> {
    let path = dir.join(name);
    fs::write(&path, content).with_context(|| format!("failed to write {:?}", path))?;
    Ok(())
}

/// RFC 3339, UTC.
pub fn timestamp() -> String {
    Utc::now().to_rfc3339()
}

/// Name for a materialised inline file spec, e.g. `20240131_142501.123_spec.json`.
pub fn spec_file_name() -> String {
    format!("{}_spec.json", Local::now().format("%Y%m%d_%H%M%S%.3f"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spec_file_name_shape() {
        let name = spec_file_name();
        assert!(name.ends_with("_spec.json"));
        // yyyymmdd_hhmmss.mmm
        assert_eq!(name.len(), "20240131_142501.123_spec.json".len());
        assert_eq!(&name[8..9], "_");
        assert_eq!(&name[15..16], ".");
    }

    #[test]
    fn run_dir_and_artifacts() {
        let base = tempfile::tempdir().unwrap();
        let dir = create_run_dir(base.path()).unwrap();
        assert!(dir.starts_with(base.path().join("runs")));
        write_artifact(&dir, "step-01.log", "hello").unwrap();
        assert_eq!(fs::read_to_string(dir.join("step-01.log")).unwrap(), "hello");
    }
}
