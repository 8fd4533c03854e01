//! Host font catalog

use crate::Result;
use pdf_core::{Font, FontData, StandardFont};
use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};

/// Listing written before the font prompt
pub const FONTS_README: &str = "FONTS_README.md";

/// Extra font directories, separated like `PATH`
pub const FONTS_ENV_VAR: &str = "CERTGEN_FONTS";

/// Where a catalog font comes from
#[derive(Debug, Clone, PartialEq)]
pub enum FontSource {
    Builtin(StandardFont),
    File(PathBuf),
}

/// Fonts usable for certificates, keyed by display name
#[derive(Debug, Clone)]
pub struct FontCatalog {
    fonts: BTreeMap<String, FontSource>,
}

/// Platform font directories plus those named in `CERTGEN_FONTS`
pub fn default_font_dirs() -> Vec<PathBuf> {
    let mut dirs: Vec<PathBuf> = Vec::new();

    if let Some(val) = std::env::var_os(FONTS_ENV_VAR) {
        dirs.extend(std::env::split_paths(&val).filter(|p| !p.as_os_str().is_empty()));
    }

    #[cfg(target_os = "macos")]
    {
        dirs.extend(["/Library/Fonts".into(), "/System/Library/Fonts".into()]);
        if let Ok(home) = std::env::var("HOME") {
            dirs.push(PathBuf::from(home).join("Library/Fonts"));
        }
    }

    #[cfg(target_os = "linux")]
    {
        dirs.extend(["/usr/share/fonts".into(), "/usr/local/share/fonts".into()]);
        if let Ok(home) = std::env::var("HOME") {
            dirs.push(PathBuf::from(home).join(".local/share/fonts"));
        }
    }

    #[cfg(target_os = "windows")]
    {
        if let Ok(windir) = std::env::var("WINDIR") {
            dirs.push(PathBuf::from(windir).join("Fonts"));
        } else {
            dirs.push("C:\\Windows\\Fonts".into());
        }
    }

    dirs
}

fn is_font_file(path: &Path) -> bool {
    matches!(
        path.extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .as_deref(),
        Some("ttf" | "otf")
    )
}

/// Recursively collect font files under `dirs`, sorted by path
///
/// Symlinks are resolved, so a linked or looping directory is walked once
/// and a file reachable by several paths is listed once.
fn collect_font_files(dirs: Vec<PathBuf>) -> Vec<PathBuf> {
    let mut visited: HashSet<PathBuf> = HashSet::new();
    let mut files = Vec::new();

    let mut stack = dirs;
    while let Some(dir) = stack.pop() {
        let dir = std::fs::canonicalize(&dir).unwrap_or(dir);
        if !visited.insert(dir.clone()) {
            continue;
        }
        let Ok(entries) = std::fs::read_dir(&dir) else {
            continue;
        };
        for entry in entries.flatten() {
            let path = entry.path();
            if path.is_dir() {
                stack.push(path);
            } else if is_font_file(&path) {
                files.push(std::fs::canonicalize(&path).unwrap_or(path));
            }
        }
    }

    files.sort();
    files.dedup();
    files
}

fn is_parseable_font(path: &Path) -> bool {
    match std::fs::read(path) {
        Ok(data) => ttf_parser::Face::parse(&data, 0).is_ok(),
        Err(e) => {
            log::debug!("skipping font {}: {e}", path.display());
            false
        }
    }
}

impl FontCatalog {
    /// Scan `dirs` for usable fonts
    ///
    /// The built-in standard fonts are always present. A file's name is its
    /// stem; a stem that is already taken (ignoring case) gets `_1`, `_2`, …
    /// in sorted path order. Nothing is cached between calls.
    pub fn discover<I, P>(dirs: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        let mut fonts = BTreeMap::new();
        let mut taken: HashSet<String> = HashSet::new();

        for std_font in StandardFont::ALL {
            let name = std_font.base_font_name().to_string();
            taken.insert(name.to_ascii_lowercase());
            fonts.insert(name, FontSource::Builtin(std_font));
        }

        let files = collect_font_files(dirs.into_iter().map(Into::into).collect());
        let mut skipped = 0usize;
        for path in files {
            let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            if !is_parseable_font(&path) {
                skipped += 1;
                continue;
            }

            let mut name = stem.to_string();
            let mut suffix = 1;
            while taken.contains(&name.to_ascii_lowercase()) {
                name = format!("{stem}_{suffix}");
                suffix += 1;
            }
            taken.insert(name.to_ascii_lowercase());
            fonts.insert(name, FontSource::File(path));
        }

        log::debug!(
            "font catalog: {} fonts ({} unreadable files skipped)",
            fonts.len(),
            skipped
        );

        Self { fonts }
    }

    /// Font names in sorted order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.fonts.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.fonts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fonts.is_empty()
    }

    /// Canonical spelling of `name`, matched ASCII case-insensitively
    pub fn lookup(&self, name: &str) -> Option<&str> {
        let name = name.trim();
        self.fonts
            .keys()
            .find(|known| known.eq_ignore_ascii_case(name))
            .map(String::as_str)
    }

    pub fn source(&self, name: &str) -> Option<&FontSource> {
        self.lookup(name).and_then(|canonical| self.fonts.get(canonical))
    }

    /// Load a catalog font ready for drawing
    pub fn load_font(&self, name: &str) -> Result<Font> {
        let canonical = self
            .lookup(name)
            .ok_or_else(|| pdf_core::PdfError::FontNotFound(name.to_string()))?;
        match &self.fonts[canonical] {
            FontSource::Builtin(std_font) => Ok(Font::Standard(*std_font)),
            FontSource::File(path) => Ok(Font::TrueType(FontData::from_file(canonical, path)?)),
        }
    }

    /// Markdown listing of every font name
    pub fn render_readme(&self) -> String {
        let mut content = String::from("# Available Fonts\n\n");
        content.push_str(
            "You can use any of the following fonts in the application. \
             Just copy the font name and paste it when prompted.\n\n",
        );
        content.push_str("| Font Name |\n");
        content.push_str("|-----------|\n");
        for name in self.names() {
            content.push_str(&format!("| `{name}` |\n"));
        }
        content
    }

    /// Write the listing to `path`, replacing any previous file
    pub fn write_readme<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        std::fs::write(path.as_ref(), self.render_readme())?;
        log::info!("wrote {} font names to {}", self.len(), path.as_ref().display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_builtins_always_present() {
        let catalog = FontCatalog::discover(Vec::<PathBuf>::new());
        assert_eq!(catalog.names().collect::<Vec<_>>(), vec!["Courier", "Helvetica"]);
        assert_eq!(
            catalog.source("HELVETICA"),
            Some(&FontSource::Builtin(StandardFont::Helvetica))
        );
    }

    #[test]
    fn test_missing_dirs_are_ignored() {
        let catalog = FontCatalog::discover(["/definitely/not/a/font/dir"]);
        assert_eq!(catalog.len(), 2);
    }

    #[test]
    fn test_unparseable_files_skipped() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("Broken.ttf"), b"not a font").unwrap();
        std::fs::write(dir.path().join("notes.txt"), b"hello").unwrap();

        let catalog = FontCatalog::discover([dir.path()]);
        assert_eq!(catalog.lookup("Broken"), None);
        assert_eq!(catalog.len(), 2);
    }

    const SERIF: &[u8] = include_bytes!("../../pdf-core/tests/fixtures/DejaVuSerif.ttf");

    #[test]
    fn test_discovers_real_font() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("DejaVuSerif.ttf"), SERIF).unwrap();

        let catalog = FontCatalog::discover([dir.path()]);
        assert_eq!(
            catalog.names().collect::<Vec<_>>(),
            vec!["Courier", "DejaVuSerif", "Helvetica"]
        );
        assert!(matches!(
            catalog.source("dejavuserif"),
            Some(FontSource::File(path)) if path.ends_with("DejaVuSerif.ttf")
        ));

        match catalog.load_font("dejavuserif").unwrap() {
            Font::TrueType(data) => {
                assert_eq!(data.name, "DejaVuSerif");
                assert_eq!(data.units_per_em(), 2048);
            }
            other => panic!("expected an embedded font, got {other:?}"),
        }
    }

    #[test]
    fn test_same_stem_gets_suffix() {
        let dir = tempfile::tempdir().unwrap();
        for sub in ["a", "b"] {
            std::fs::create_dir(dir.path().join(sub)).unwrap();
            std::fs::write(dir.path().join(sub).join("DejaVuSerif.ttf"), SERIF).unwrap();
        }

        let catalog = FontCatalog::discover([dir.path()]);
        assert_eq!(
            catalog.names().collect::<Vec<_>>(),
            vec!["Courier", "DejaVuSerif", "DejaVuSerif_1", "Helvetica"]
        );
        assert!(matches!(
            catalog.source("DejaVuSerif"),
            Some(FontSource::File(path)) if path.ends_with("a/DejaVuSerif.ttf")
        ));
        assert!(matches!(
            catalog.source("DejaVuSerif_1"),
            Some(FontSource::File(path)) if path.ends_with("b/DejaVuSerif.ttf")
        ));
    }

    #[cfg(unix)]
    #[test]
    fn test_symlinks_listed_once() {
        use std::os::unix::fs::symlink;

        let dir = tempfile::tempdir().unwrap();
        let fonts = dir.path().join("fonts");
        std::fs::create_dir(&fonts).unwrap();
        std::fs::write(fonts.join("DejaVuSerif.ttf"), SERIF).unwrap();
        symlink(&fonts, fonts.join("loop")).unwrap();
        symlink(&fonts, dir.path().join("linked")).unwrap();
        symlink(fonts.join("DejaVuSerif.ttf"), fonts.join("Alias.ttf")).unwrap();

        let catalog = FontCatalog::discover([dir.path(), fonts.as_path()]);
        assert_eq!(
            catalog.names().collect::<Vec<_>>(),
            vec!["Courier", "DejaVuSerif", "Helvetica"]
        );
    }

    #[test]
    fn test_is_font_file() {
        assert!(is_font_file(Path::new("a/DejaVuSans.ttf")));
        assert!(is_font_file(Path::new("a/Inter.OTF")));
        assert!(!is_font_file(Path::new("a/Noto.ttc")));
        assert!(!is_font_file(Path::new("a/readme")));
    }

    #[test]
    fn test_lookup_canonical_spelling() {
        let catalog = FontCatalog::discover(Vec::<PathBuf>::new());
        assert_eq!(catalog.lookup("courier"), Some("Courier"));
        assert_eq!(catalog.lookup(" Courier "), Some("Courier"));
        assert_eq!(catalog.lookup("Times"), None);
    }

    #[test]
    fn test_load_builtin_font() {
        let catalog = FontCatalog::discover(Vec::<PathBuf>::new());
        assert!(matches!(
            catalog.load_font("helvetica").unwrap(),
            Font::Standard(StandardFont::Helvetica)
        ));
        assert!(catalog.load_font("Times").is_err());
    }

    #[test]
    fn test_readme_format() {
        let catalog = FontCatalog::discover(Vec::<PathBuf>::new());
        let readme = catalog.render_readme();

        assert!(readme.starts_with("# Available Fonts\n\n"));
        assert!(readme.ends_with("| Font Name |\n|-----------|\n| `Courier` |\n| `Helvetica` |\n"));
    }

    #[test]
    fn test_write_readme_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(FONTS_README);
        std::fs::write(&path, "stale").unwrap();

        FontCatalog::discover(Vec::<PathBuf>::new())
            .write_readme(&path)
            .unwrap();

        let written = std::fs::read_to_string(&path).unwrap();
        assert!(!written.contains("stale"));
        assert!(written.contains("| `Helvetica` |"));
    }
}
