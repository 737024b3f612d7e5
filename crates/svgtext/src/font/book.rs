use std::sync::Arc;

use fontdb::{Database, Family, Query, ID};
use hashbrown::HashMap;

use crate::font::face::FontFace;
use crate::style::{FontQuery, FontStretch, FontStyle};

/// The font service: fontdb-backed face selection with a loaded-face
/// cache and per-character fallback.
///
/// The book is owned by the caller and passed into each layout pass;
/// nothing in here is process-global. Repeated lookups for the same face
/// hit the cache instead of re-parsing font data.
pub struct FontBook {
    db: Database,
    cache: HashMap<ID, Arc<FontFace>>,
}

impl Default for FontBook {
    fn default() -> Self {
        FontBook::new()
    }
}

impl FontBook {
    pub fn new() -> Self {
        FontBook {
            db: Database::new(),
            cache: HashMap::new(),
        }
    }

    pub fn with_database(db: Database) -> Self {
        FontBook {
            db,
            cache: HashMap::new(),
        }
    }

    /// Register every font the OS knows about.
    pub fn load_system_fonts(&mut self) {
        self.db.load_system_fonts();
    }

    /// Register an in-memory font (TTF/OTF/collection).
    pub fn load_font_data(&mut self, data: Vec<u8>) {
        self.db.load_font_data(data);
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    /// Load (or fetch from cache) the face behind a fontdb id.
    pub fn face(&mut self, id: ID) -> Option<Arc<FontFace>> {
        if let Some(face) = self.cache.get(&id) {
            return Some(face.clone());
        }
        let face = self
            .db
            .with_face_data(id, |data, index| {
                FontFace::from_bytes(Arc::from(data.to_vec()), index as usize).ok()
            })
            .flatten()?;
        let face = Arc::new(face);
        self.cache.insert(id, face.clone());
        Some(face)
    }

    /// Resolve a style's font query to a concrete face.
    pub fn query(&mut self, font: &FontQuery) -> Option<Arc<FontFace>> {
        let mut families: Vec<Family<'_>> = font
            .families
            .iter()
            .map(|family| match family.as_str() {
                "serif" => Family::Serif,
                "sans-serif" => Family::SansSerif,
                "cursive" => Family::Cursive,
                "fantasy" => Family::Fantasy,
                "monospace" => Family::Monospace,
                name => Family::Name(name),
            })
            .collect();
        // Use the default serif as the last resort.
        families.push(Family::Serif);

        let query = Query {
            families: &families,
            weight: fontdb::Weight(font.weight),
            stretch: stretch_to_fontdb(font.stretch),
            style: style_to_fontdb(font.style),
        };

        let id = self.db.query(&query);
        if id.is_none() {
            log::warn!("No match for '{}' font-family.", font.families.join(", "));
        }
        self.face(id?)
    }

    /// Partition `text` into maximal same-face runs, starting from the
    /// face the query resolves to and falling back per character when it
    /// lacks coverage. Returns `(face, char count)` pairs covering the
    /// whole text; empty when no face matched at all.
    pub fn faces_for_text(
        &mut self,
        font: &FontQuery,
        text: &str,
    ) -> Vec<(Arc<FontFace>, usize)> {
        let Some(primary) = self.query(font) else {
            return Vec::new();
        };

        let mut runs: Vec<(Arc<FontFace>, usize)> = Vec::new();
        for c in text.chars() {
            // Controls and whitespace never force a fallback switch.
            let face = if primary.has_char(c) || c.is_whitespace() || c.is_control() {
                primary.clone()
            } else {
                self.fallback_for_char(c, font).unwrap_or_else(|| {
                    log::warn!("No fonts with a {}/U+{:X} character were found.", c, c as u32);
                    primary.clone()
                })
            };

            match runs.last_mut() {
                Some((last, count)) if Arc::ptr_eq(last, &face) => *count += 1,
                _ => runs.push((face, 1)),
            }
        }
        runs
    }

    /// Rudimentary per-character fallback: the first registered face
    /// with a matching style that covers the character.
    fn fallback_for_char(&mut self, c: char, font: &FontQuery) -> Option<Arc<FontFace>> {
        let style = style_to_fontdb(font.style);
        let candidates: Vec<ID> = self
            .db
            .faces()
            .filter(|info| info.style == style)
            .map(|info| info.id)
            .collect();
        for id in candidates {
            if let Some(face) = self.face(id) {
                if face.has_char(c) {
                    return Some(face);
                }
            }
        }
        None
    }
}

fn style_to_fontdb(style: FontStyle) -> fontdb::Style {
    match style {
        FontStyle::Normal => fontdb::Style::Normal,
        FontStyle::Italic => fontdb::Style::Italic,
        FontStyle::Oblique => fontdb::Style::Oblique,
    }
}

fn stretch_to_fontdb(stretch: FontStretch) -> fontdb::Stretch {
    match stretch {
        FontStretch::UltraCondensed => fontdb::Stretch::UltraCondensed,
        FontStretch::ExtraCondensed => fontdb::Stretch::ExtraCondensed,
        FontStretch::Condensed => fontdb::Stretch::Condensed,
        FontStretch::SemiCondensed => fontdb::Stretch::SemiCondensed,
        FontStretch::Normal => fontdb::Stretch::Normal,
        FontStretch::SemiExpanded => fontdb::Stretch::SemiExpanded,
        FontStretch::Expanded => fontdb::Stretch::Expanded,
        FontStretch::ExtraExpanded => fontdb::Stretch::ExtraExpanded,
        FontStretch::UltraExpanded => fontdb::Stretch::UltraExpanded,
    }
}
