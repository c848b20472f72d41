use crate::engine::{Page, SystemInput};
use crate::image::ImageU8;
use crate::sheet::Scale;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::Path;

/// Upstream results for one page, as stored next to its image.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageFixture {
    pub scale: Scale,
    /// Global slope of staff lines.
    #[serde(default)]
    pub slope: f64,
    pub systems: Vec<SystemInput>,
}

impl PageFixture {
    /// Reject fixtures the linker cannot make sense of.
    pub fn validate(&self) -> Result<(), String> {
        let scale = &self.scale;
        if scale.interline <= 0 || scale.main_stem <= 0 || scale.max_stem < scale.main_stem {
            return Err(format!(
                "Invalid scale: interline {}, main stem {}, max stem {}",
                scale.interline, scale.main_stem, scale.max_stem
            ));
        }
        if !self.slope.is_finite() {
            return Err("Slope is not finite".to_string());
        }

        let mut ids = HashSet::new();
        for system in &self.systems {
            let id = system.info.id;
            if !ids.insert(id) {
                return Err(format!("Duplicate system id {id}"));
            }
            let bounds = system.info.bounds;
            if bounds.is_empty() {
                return Err(format!("System#{id} has empty bounds"));
            }
            for (i, head) in system.heads.iter().enumerate() {
                if head.bounds.is_empty() || !head.bounds.intersects(&bounds) {
                    return Err(format!("System#{id} head {i} lies outside its system"));
                }
                if !(0.0..=1.0).contains(&head.grade) {
                    return Err(format!("System#{id} head {i} has grade {}", head.grade));
                }
            }
            for (i, beam) in system.beams.iter().enumerate() {
                let median = beam.median();
                let length = (median.p2 - median.p1).norm();
                if !length.is_finite() || length <= 0.0 {
                    return Err(format!("System#{id} beam {i} has a zero-length median"));
                }
                if beam.height.is_nan() || beam.height <= 0.0 {
                    return Err(format!("System#{id} beam {i} has height {}", beam.height));
                }
                if !(0.0..=1.0).contains(&beam.grade) {
                    return Err(format!("System#{id} beam {i} has grade {}", beam.grade));
                }
            }
        }
        Ok(())
    }

    /// Validated page over `image`.
    pub fn into_page(self, image: ImageU8<'_>) -> Result<Page<'_>, String> {
        self.validate()?;
        Ok(Page {
            image,
            scale: self.scale,
            slope: self.slope,
            systems: self.systems,
        })
    }
}

pub fn load_page_fixture(path: &Path) -> Result<PageFixture, String> {
    let contents = fs::read_to_string(path)
        .map_err(|e| format!("Failed to read page fixture {}: {e}", path.display()))?;
    serde_json::from_str(&contents)
        .map_err(|e| format!("Failed to parse page fixture {}: {e}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    const FIXTURE: &str = r#"{
        "scale": { "interline": 20, "mainStem": 3, "maxStem": 4 },
        "systems": [{
            "info": {
                "id": 0,
                "bounds": { "x": 0, "y": 0, "w": 400, "h": 200 },
                "staffTop": 60.0,
                "staffBottom": 140.0
            },
            "heads": [{ "bounds": { "x": 100, "y": 90, "w": 23, "h": 18 }, "shape": "black", "grade": 0.8 }],
            "beams": [{ "p1": [100.0, 30.0], "p2": [200.0, 30.0], "height": 10.0, "grade": 0.9 }],
            "seeds": [{ "x": 120, "y": 30, "w": 6, "h": 70 }],
            "exclusions": [[{ "kind": "head", "index": 0 }, { "kind": "beam", "index": 0 }]]
        }]
    }"#;

    #[test]
    fn fixture_parses_and_validates() {
        let fixture: PageFixture = serde_json::from_str(FIXTURE).expect("fixture parses");
        assert_eq!(fixture.slope, 0.0);
        let system = &fixture.systems[0];
        assert_eq!(system.heads.len(), 1);
        assert!(system.beams[0].group.is_none());
        assert!(system.no_stem_areas.is_empty());
        assert!(fixture.validate().is_ok());
    }

    #[test]
    fn degenerate_beam_is_rejected() {
        let mut fixture: PageFixture = serde_json::from_str(FIXTURE).expect("fixture parses");
        fixture.systems[0].beams[0].p2 = fixture.systems[0].beams[0].p1;
        let err = fixture.validate().unwrap_err();
        assert!(err.contains("beam 0"), "{err}");
    }

    #[test]
    fn head_outside_system_is_rejected() {
        let mut fixture: PageFixture = serde_json::from_str(FIXTURE).expect("fixture parses");
        fixture.systems[0].heads[0].bounds.y = 500;
        let err = fixture.validate().unwrap_err();
        assert!(err.contains("head 0"), "{err}");
    }
}
