use super::glyph::{Glyph, GlyphId};
use super::section::{Section, SectionId};
use std::collections::HashMap;

/// Per-system registry of glyphs. A given set of sections is registered
/// once; later registrations of the same set return the original id.
#[derive(Clone, Debug, Default)]
pub struct GlyphIndex {
    glyphs: Vec<Glyph>,
    by_sections: HashMap<Vec<SectionId>, GlyphId>,
}

impl GlyphIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.glyphs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.glyphs.is_empty()
    }

    pub fn get(&self, id: GlyphId) -> &Glyph {
        &self.glyphs[id.0 as usize]
    }

    /// Register the glyph made of `members` (ids into `table`), or return the
    /// already registered one. `None` when no valid section is given.
    pub fn register(&mut self, table: &[Section], members: &[SectionId]) -> Option<GlyphId> {
        let mut key: Vec<SectionId> = members
            .iter()
            .copied()
            .filter(|s| (s.0 as usize) < table.len())
            .collect();
        key.sort();
        key.dedup();
        if key.is_empty() {
            return None;
        }
        if let Some(id) = self.by_sections.get(&key) {
            return Some(*id);
        }
        let id = GlyphId(self.glyphs.len() as u32);
        let refs: Vec<&Section> = key.iter().map(|s| &table[s.0 as usize]).collect();
        self.glyphs.push(Glyph::from_sections(id, &refs));
        self.by_sections.insert(key, id);
        Some(id)
    }

    /// Union of several glyphs, registered once.
    pub fn union(&mut self, table: &[Section], parts: &[GlyphId]) -> Option<GlyphId> {
        match parts {
            [] => None,
            [single] => Some(*single),
            _ => {
                let members: Vec<SectionId> = parts
                    .iter()
                    .flat_map(|g| self.get(*g).sections().iter().copied())
                    .collect();
                self.register(table, &members)
            }
        }
    }
}
