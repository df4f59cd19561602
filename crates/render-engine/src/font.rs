//! Font resolution for text overlays.
//!
//! A family name resolves to an outline font found on disk, or to the
//! DejaVu Sans Mono face bundled with the crate when nothing usable is
//! installed. Unknown families fall back through a list of common
//! sans-serif faces first.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, OnceLock};

use ab_glyph::{Font, FontArc, FontVec, PxScale, ScaleFont};
use image::{Rgba, RgbaImage};
use imageproc::drawing::{draw_text_mut, text_size};

use scenecast_scene_model::BUILTIN_FONT_FAMILY;

/// Families tried, in order, when the requested one is not installed.
const FALLBACK_FAMILIES: &[&str] = &[
    "DejaVu Sans",
    "Liberation Sans",
    "Arial",
    "Helvetica",
    "Noto Sans",
    "FreeSans",
];

const FONT_EXTENSIONS: &[&str] = &["ttf", "otf", "ttc"];
const MAX_SCAN_DEPTH: usize = 5;

static EMBEDDED_FONT: &[u8] = include_bytes!("../assets/fonts/DejaVuSansMono.ttf");

/// A drawable outline font face.
#[derive(Debug, Clone)]
pub struct FontFace(FontArc);

impl FontFace {
    /// Advance width of `text` and the line height at `px` pixels.
    ///
    /// The line runs from ascender to descender, so every glyph drawn at
    /// the same origin stays inside it.
    pub fn text_size(&self, px: f32, text: &str) -> (u32, u32) {
        let scale = PxScale::from(px.max(1.0));
        let (width, _) = text_size(scale, &self.0, text);
        let line_height = self.0.as_scaled(scale).height().ceil().max(0.0) as u32;
        (width, line_height)
    }

    /// Draw `text` with the top of its line at (`x`, `y`).
    pub fn draw(&self, canvas: &mut RgbaImage, color: Rgba<u8>, x: i32, y: i32, px: f32, text: &str) {
        draw_text_mut(canvas, color, x, y, PxScale::from(px.max(1.0)), &self.0, text);
    }
}

/// The bundled face behind [`BUILTIN_FONT_FAMILY`].
pub fn embedded_font() -> Option<FontFace> {
    static FACE: OnceLock<Option<FontFace>> = OnceLock::new();
    FACE.get_or_init(|| match FontArc::try_from_slice(EMBEDDED_FONT) {
        Ok(font) => Some(FontFace(font)),
        Err(e) => {
            tracing::error!(error = %e, "Bundled font is unreadable");
            None
        }
    })
    .clone()
}

fn cache() -> &'static Mutex<HashMap<String, FontFace>> {
    static CACHE: OnceLock<Mutex<HashMap<String, FontFace>>> = OnceLock::new();
    CACHE.get_or_init(|| Mutex::new(HashMap::new()))
}

/// Resolve a family name (or a font file path) to a face.
///
/// Returns `None` only if even the bundled face cannot be parsed.
pub fn resolve_font(family: &str) -> Option<FontFace> {
    if family.trim().is_empty() || family.eq_ignore_ascii_case(BUILTIN_FONT_FAMILY) {
        return embedded_font();
    }

    if let Ok(cache) = cache().lock() {
        if let Some(face) = cache.get(family) {
            return Some(face.clone());
        }
    }

    let face = load_family(family)
        .or_else(|| {
            FALLBACK_FAMILIES.iter().find_map(|fallback| {
                let face = load_family(fallback)?;
                tracing::debug!(requested = family, fallback, "Font family not found, using fallback");
                Some(face)
            })
        })
        .or_else(|| {
            tracing::warn!(requested = family, "No installed outline font matched, using bundled font");
            embedded_font()
        })?;

    if let Ok(mut cache) = cache().lock() {
        cache.insert(family.to_string(), face.clone());
    }
    Some(face)
}

fn load_family(family: &str) -> Option<FontFace> {
    let direct = Path::new(family);
    if direct.is_file() {
        return load_font_file(direct);
    }
    let path = find_font_file(family, installed_fonts())?;
    load_font_file(&path)
}

fn load_font_file(path: &Path) -> Option<FontFace> {
    let data = std::fs::read(path).ok()?;
    match FontVec::try_from_vec_and_index(data, 0) {
        Ok(font) => Some(FontFace(FontArc::new(font))),
        Err(e) => {
            tracing::debug!(path = %path.display(), error = %e, "Unreadable font file");
            None
        }
    }
}

/// Lowercased alphanumerics only, so "DejaVu Sans" matches "DejaVuSans.ttf".
fn normalize(name: &str) -> String {
    name.chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

/// Best match for `family` among `candidates`, preferring the regular style.
pub fn find_font_file(family: &str, candidates: &[PathBuf]) -> Option<PathBuf> {
    let wanted = normalize(family);
    if wanted.is_empty() {
        return None;
    }

    let mut best: Option<(u8, &PathBuf)> = None;
    for path in candidates {
        let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
            continue;
        };
        let stem = normalize(stem);
        let rank = if stem == wanted {
            0
        } else if stem == format!("{wanted}regular") || stem == format!("{wanted}book") {
            1
        } else if stem.starts_with(&wanted) {
            2
        } else {
            continue;
        };
        if best.map_or(true, |(r, _)| rank < r) {
            best = Some((rank, path));
        }
    }
    best.map(|(_, path)| path.clone())
}

fn installed_fonts() -> &'static [PathBuf] {
    static INDEX: OnceLock<Vec<PathBuf>> = OnceLock::new();
    INDEX.get_or_init(|| {
        let mut files = Vec::new();
        for dir in font_dirs() {
            scan_dir(&dir, 0, &mut files);
        }
        files.sort();
        tracing::debug!(count = files.len(), "Indexed installed fonts");
        files
    })
}

fn font_dirs() -> Vec<PathBuf> {
    let mut dirs_list = Vec::new();
    if let Some(dir) = dirs::font_dir() {
        dirs_list.push(dir);
    }
    if let Some(home) = dirs::home_dir() {
        dirs_list.push(home.join(".fonts"));
    }
    for dir in [
        "/usr/share/fonts",
        "/usr/local/share/fonts",
        "/System/Library/Fonts",
        "/Library/Fonts",
        "C:\\Windows\\Fonts",
    ] {
        dirs_list.push(PathBuf::from(dir));
    }
    dirs_list
}

fn scan_dir(dir: &Path, depth: usize, out: &mut Vec<PathBuf>) {
    if depth > MAX_SCAN_DEPTH {
        return;
    }
    let Ok(entries) = std::fs::read_dir(dir) else {
        return;
    };
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            scan_dir(&path, depth + 1, out);
        } else if path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| FONT_EXTENSIONS.iter().any(|x| e.eq_ignore_ascii_case(x)))
        {
            out.push(path);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_family_uses_bundled_font() {
        let face = resolve_font("builtin").expect("bundled font parses");
        assert!(resolve_font("  ").is_some());
        let (w, h) = face.text_size(16.0, "AB");
        assert!(w > 0 && h > 0);
    }

    #[test]
    fn text_size_grows_with_px() {
        let face = embedded_font().expect("bundled font parses");
        let small = face.text_size(8.0, "REC");
        let large = face.text_size(32.0, "REC");
        assert!(large.0 > small.0 * 2 && large.1 > small.1 * 2, "{small:?} vs {large:?}");
        assert_eq!(face.text_size(16.0, "").0, 0);
    }

    #[test]
    fn draw_marks_pixels_and_clips() {
        let face = embedded_font().expect("bundled font parses");
        let mut canvas = RgbaImage::from_pixel(40, 40, Rgba([0, 0, 0, 255]));
        face.draw(&mut canvas, Rgba([255, 0, 0, 255]), 2, 2, 32.0, "H");
        assert!(canvas.pixels().any(|p| p[0] > 200 && p[1] == 0));

        // Partially off-canvas text must not panic.
        face.draw(&mut canvas, Rgba([255, 0, 0, 255]), -7, -3, 24.0, "REC");
        face.draw(&mut canvas, Rgba([255, 0, 0, 255]), 38, 38, 24.0, "REC");
    }

    #[test]
    fn font_file_matching_prefers_exact_and_regular() {
        let candidates = vec![
            PathBuf::from("/fonts/DejaVuSans-Bold.ttf"),
            PathBuf::from("/fonts/DejaVuSans.ttf"),
            PathBuf::from("/fonts/LiberationSans-Regular.ttf"),
            PathBuf::from("/fonts/LiberationSans-Italic.ttf"),
        ];
        assert_eq!(
            find_font_file("DejaVu Sans", &candidates),
            Some(PathBuf::from("/fonts/DejaVuSans.ttf"))
        );
        assert_eq!(
            find_font_file("Liberation Sans", &candidates),
            Some(PathBuf::from("/fonts/LiberationSans-Regular.ttf"))
        );
        assert_eq!(find_font_file("Comic Sans", &candidates), None);
    }
}
