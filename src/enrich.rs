use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::models::{ArgumentSpec, ComponentGroup};

/// Argument metadata written next to a component's story template, so server
/// templates can be checked against what discovery inferred.
#[derive(Serialize, Deserialize)]
pub struct ArgTypesSidecar {
    pub hash: String,
    pub component: String,
    pub stories: serde_json::Value,
}

pub fn sidecar_path(dir: &Path, component: &str) -> PathBuf {
    dir.join(format!("{}.stories.argtypes.json", component))
}

pub fn compute_hash(payload: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(payload.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Writes sidecars for every server-capable component whose story template
/// exists. Unchanged sidecars are left alone. Returns how many were written.
pub fn enrich_templates(
    components: &[(&Path, &ComponentGroup)],
    template_extension: &str,
) -> io::Result<usize> {
    let mut written = 0;

    for (dir, component) in components {
        if !component.can_ssr {
            continue;
        }
        let template = dir.join(format!("{}.stories.{}", component.name, template_extension));
        if !template.is_file() {
            debug!(path = %template.display(), "skipping enrichment, template not found");
            continue;
        }

        let stories: IndexMap<&str, &IndexMap<String, ArgumentSpec>> = component
            .variants
            .iter()
            .map(|v| (v.key.as_str(), &v.args))
            .collect();
        let stories = serde_json::to_value(stories)?;
        let hash = compute_hash(&stories.to_string());
        let path = sidecar_path(dir, &component.name);

        if existing_hash(&path).as_deref() == Some(hash.as_str()) {
            debug!(component = %component.name, "sidecar up to date");
            continue;
        }

        let sidecar = ArgTypesSidecar {
            hash,
            component: component.name.clone(),
            stories,
        };
        fs::write(&path, serde_json::to_string_pretty(&sidecar)?)?;
        debug!(path = %path.display(), "wrote argument sidecar");
        written += 1;
    }

    Ok(written)
}

fn existing_hash(path: &Path) -> Option<String> {
    let data = fs::read_to_string(path).ok()?;
    match serde_json::from_str::<ArgTypesSidecar>(&data) {
        Ok(sidecar) => Some(sidecar.hash),
        Err(e) => {
            warn!(path = %path.display(), "corrupt sidecar will be replaced: {}", e);
            None
        }
    }
}
