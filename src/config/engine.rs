use crate::engine::{EngineParams, StemEngine};
use crate::stem::Constants;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct OutputConfig {
    /// JSON linking report.
    pub report: PathBuf,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StemToolConfig {
    /// Page fixture (scale, systems, heads, beams).
    pub page: PathBuf,
    /// Grayscale page image.
    pub image: PathBuf,
    pub output: OutputConfig,
    #[serde(default)]
    pub engine: EngineParams,
    #[serde(default)]
    pub constants: Constants,
}

impl StemToolConfig {
    pub fn to_engine(&self) -> StemEngine {
        StemEngine::new(self.engine.clone(), self.constants.clone())
    }
}

pub fn load_config(path: &Path) -> Result<StemToolConfig, String> {
    let contents = fs::read_to_string(path)
        .map_err(|e| format!("Failed to read config {}: {e}", path.display()))?;
    serde_json::from_str(&contents)
        .map_err(|e| format!("Failed to parse config {}: {e}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sheet::Profile;

    #[test]
    fn minimal_config_uses_defaults() {
        let json = r#"{
            "page": "page.json",
            "image": "page.png",
            "output": { "report": "out/report.json" },
            "constants": { "minStemTail": 1.5 }
        }"#;
        let config: StemToolConfig = serde_json::from_str(json).expect("config parses");
        assert_eq!(config.image, PathBuf::from("page.png"));
        assert_eq!(config.engine.max_head_profile, Profile::POOR);
        assert_eq!(config.constants.min_stem_tail, 1.5);
        assert_eq!(
            config.constants.best_stem_tail,
            Constants::default().best_stem_tail
        );
    }

    #[test]
    fn missing_file_is_reported_with_its_path() {
        let err = load_config(Path::new("does/not/exist.json")).unwrap_err();
        assert!(err.contains("does/not/exist.json"), "{err}");
    }
}
