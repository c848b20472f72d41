use crate::sheet::Profile;
use crate::stem::FinalizePasses;
use serde::{Deserialize, Serialize};

/// Engine-wide parameters.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EngineParams {
    /// Highest profile a head linking may escalate to.
    pub max_head_profile: Profile,
    pub finalize: FinalizePasses,
}

impl Default for EngineParams {
    fn default() -> Self {
        Self {
            max_head_profile: Profile::POOR,
            finalize: FinalizePasses::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_keeps_defaults() {
        let params: EngineParams =
            serde_json::from_str(r#"{ "finalize": { "mutualExclusions": false } }"#)
                .expect("params parse");
        assert_eq!(params.max_head_profile, Profile::POOR);
        assert!(!params.finalize.mutual_exclusions);
        assert!(params.finalize.clean_head_stems);
    }
}
