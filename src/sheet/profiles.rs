use serde::{Deserialize, Serialize};

/// Ordered strictness level. Higher values relax acceptance thresholds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Profile(pub u8);

impl Profile {
    pub const STRICT: Profile = Profile(0);
    pub const STANDARD: Profile = Profile(1);
    pub const POOR: Profile = Profile(2);
    /// Stems departing from a beam interior stump.
    pub const BEAM_SEED: Profile = Profile(3);
    /// Stems departing from a beam side, the loosest level.
    pub const BEAM_SIDE: Profile = Profile(4);
    pub const MAX: Profile = Profile::BEAM_SIDE;

    /// All levels in ascending order.
    pub fn all() -> impl Iterator<Item = Profile> {
        (0..=Profile::MAX.0).map(Profile)
    }

    /// Levels from `self` up to `max` inclusive.
    pub fn up_to(self, max: Profile) -> impl Iterator<Item = Profile> {
        (self.0..=max.0).map(Profile)
    }

    pub fn next(self) -> Option<Profile> {
        (self < Profile::MAX).then(|| Profile(self.0 + 1))
    }
}

impl std::fmt::Display for Profile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "p{}", self.0)
    }
}

/// Constant with per-profile variants: a lookup returns the variant of the
/// highest level not above the requested profile.
#[derive(Clone, Debug, PartialEq)]
pub struct Profiled<T> {
    variants: Vec<(Profile, T)>,
}

impl<T: Copy> Profiled<T> {
    /// Single value valid for every profile.
    pub fn new(base: T) -> Self {
        Self {
            variants: vec![(Profile::STRICT, base)],
        }
    }

    /// Add (or replace) the variant starting at `profile`.
    pub fn with(mut self, profile: Profile, value: T) -> Self {
        self.variants.retain(|(p, _)| *p != profile);
        self.variants.push((profile, value));
        self.variants.sort_by_key(|(p, _)| *p);
        self
    }

    pub fn get(&self, profile: Profile) -> T {
        let mut value = self.variants[0].1;
        for (p, v) in &self.variants {
            if *p <= profile {
                value = *v;
            } else {
                break;
            }
        }
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_uses_highest_variant_not_above_profile() {
        let gap = Profiled::new(0.0)
            .with(Profile(1), 0.3)
            .with(Profile(2), 0.6)
            .with(Profile(4), 4.0);
        assert_eq!(gap.get(Profile::STRICT), 0.0);
        assert_eq!(gap.get(Profile::STANDARD), 0.3);
        assert_eq!(gap.get(Profile::BEAM_SEED), 0.6);
        assert_eq!(gap.get(Profile::BEAM_SIDE), 4.0);
    }

    #[test]
    fn next_stops_at_max() {
        assert_eq!(Profile::POOR.next(), Some(Profile::BEAM_SEED));
        assert_eq!(Profile::MAX.next(), None);
        assert_eq!(Profile::STANDARD.up_to(Profile::POOR).count(), 2);
    }
}
