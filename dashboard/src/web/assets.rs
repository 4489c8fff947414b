use std::fs;
use std::path::Path;

pub const LOGO_FILES: [&str; 2] = ["pavesafe_logo.jpg", "pccoe_logo.png"];

/// Presentation assets read for each page. Nothing here is fatal.
#[derive(Debug, Clone, Default)]
pub struct PageAssets {
    pub stylesheet: Option<String>,
    pub stylesheet_error: Option<String>,
    pub logos: Vec<&'static str>,
    pub missing_logos: Vec<&'static str>,
}

impl PageAssets {
    pub fn load(stylesheet: &Path, assets_dir: &Path) -> Self {
        let (stylesheet, stylesheet_error) = match fs::read_to_string(stylesheet) {
            Ok(css) => (Some(css), None),
            Err(err) => {
                log::warn!("stylesheet {} unavailable: {err}", stylesheet.display());
                (None, Some(format!("CSS file not found: {}", stylesheet.display())))
            }
        };
        let (logos, missing_logos) = LOGO_FILES
            .iter()
            .copied()
            .partition(|name| assets_dir.join(name).is_file());
        Self {
            stylesheet,
            stylesheet_error,
            logos,
            missing_logos,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_files_degrade_to_notices() {
        let dir = tempfile::tempdir().unwrap();
        let assets = PageAssets::load(&dir.path().join("style.css"), dir.path());
        assert!(assets.stylesheet.is_none());
        assert!(assets.stylesheet_error.unwrap().contains("style.css"));
        assert_eq!(assets.missing_logos.len(), 2);
    }

    #[test]
    fn present_files_are_picked_up() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("style.css"), "h1 { color: gold; }").unwrap();
        fs::write(dir.path().join("pccoe_logo.png"), b"png").unwrap();
        let assets = PageAssets::load(&dir.path().join("style.css"), dir.path());
        assert_eq!(assets.stylesheet.as_deref(), Some("h1 { color: gold; }"));
        assert_eq!(assets.logos, vec!["pccoe_logo.png"]);
        assert_eq!(assets.missing_logos, vec!["pavesafe_logo.jpg"]);
    }
}
