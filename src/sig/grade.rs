use serde::Serialize;

/// Result of one check within a suite.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckImpact {
    pub name: String,
    /// Measured value, in the unit of the check.
    pub value: f64,
    /// Normalized result in `[0, 1]`.
    pub result: f64,
    /// Weight in the suite. Checks with a weight `<= 0` do not count.
    pub weight: f64,
}

/// Detailed outcome of a check suite.
#[derive(Clone, Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GradeImpacts {
    pub impacts: Vec<CheckImpact>,
    pub grade: f64,
}

impl GradeImpacts {
    pub fn push(&mut self, name: &str, value: f64, result: f64, weight: f64) {
        self.impacts.push(CheckImpact {
            name: name.to_string(),
            value,
            result,
            weight,
        });
    }

    /// Weighted geometric mean of the counted results. A counted result of
    /// zero yields zero.
    pub fn compute_grade(&mut self) -> f64 {
        let mut total_weight = 0.0;
        let mut sum = 0.0;
        for impact in self.impacts.iter().filter(|i| i.weight > 0.0) {
            if impact.result <= 0.0 {
                self.grade = 0.0;
                return 0.0;
            }
            total_weight += impact.weight;
            sum += impact.weight * impact.result.ln();
        }
        self.grade = if total_weight > 0.0 {
            (sum / total_weight).exp()
        } else {
            0.0
        };
        self.grade
    }

    pub fn get(&self, name: &str) -> Option<&CheckImpact> {
        self.impacts.iter().find(|i| i.name == name)
    }
}

/// Combine an intrinsic grade with the contribution `c` of its supporting
/// relations.
pub fn contextual(grade: f64, contribution: f64) -> f64 {
    let c = contribution.max(0.0);
    grade * (1.0 + c) / (1.0 + grade * c)
}

/// Contribution of one partner through a relation: partner grade times
/// `ratio - 1`, where `ratio = 1 + coeff * relation_grade`.
pub fn support(partner_grade: f64, coeff: f64, relation_grade: f64) -> f64 {
    partner_grade * coeff * relation_grade
}

/// Linear ramp between `low` and `high`, clamped to `[0, 1]`.
/// A covariant ramp rises with the value, a contravariant one falls.
/// When `high <= low` the ramp degenerates to a step at `low`.
pub fn ramp(value: f64, low: f64, high: f64, covariant: bool) -> f64 {
    if high <= low {
        return match (covariant, value >= low, value <= low) {
            (true, true, _) => 1.0,
            (false, _, true) => 1.0,
            _ => 0.0,
        };
    }
    let t = ((value - low) / (high - low)).clamp(0.0, 1.0);
    if covariant {
        t
    } else {
        1.0 - t
    }
}
