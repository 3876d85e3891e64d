use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;

use crate::error::ThemeError;

/// The document surface a theme is applied to: one injected style element
/// with a stable id, plus theme-identifying attributes on the document root
/// and body. This is the entire DOM contract.
pub trait DocumentSurface: Send {
    /// Remove-then-insert so exactly one theme style exists at a time.
    fn replace_style(&mut self, id: &str, css: &str) -> Result<(), ThemeError>;
    fn remove_style(&mut self, id: &str) -> Result<(), ThemeError>;
    fn set_root_attribute(&mut self, name: &str, value: &str) -> Result<(), ThemeError>;
    fn set_body_attribute(&mut self, name: &str, value: &str) -> Result<(), ThemeError>;
}

/// In-memory document, used by tests and as a stand-in surface when no
/// output directory is available.
#[derive(Debug, Default)]
pub struct MemoryDocument {
    styles: BTreeMap<String, String>,
    root: BTreeMap<String, String>,
    body: BTreeMap<String, String>,
}

impl MemoryDocument {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn style_count(&self) -> usize {
        self.styles.len()
    }

    pub fn style(&self, id: &str) -> Option<&str> {
        self.styles.get(id).map(String::as_str)
    }

    pub fn root_attribute(&self, name: &str) -> Option<&str> {
        self.root.get(name).map(String::as_str)
    }

    pub fn body_attribute(&self, name: &str) -> Option<&str> {
        self.body.get(name).map(String::as_str)
    }

    pub fn root_attributes(&self) -> &BTreeMap<String, String> {
        &self.root
    }
}

impl DocumentSurface for MemoryDocument {
    fn replace_style(&mut self, id: &str, css: &str) -> Result<(), ThemeError> {
        self.styles.remove(id);
        self.styles.insert(id.to_string(), css.to_string());
        Ok(())
    }

    fn remove_style(&mut self, id: &str) -> Result<(), ThemeError> {
        self.styles.remove(id);
        Ok(())
    }

    fn set_root_attribute(&mut self, name: &str, value: &str) -> Result<(), ThemeError> {
        self.root.insert(name.to_string(), value.to_string());
        Ok(())
    }

    fn set_body_attribute(&mut self, name: &str, value: &str) -> Result<(), ThemeError> {
        self.body.insert(name.to_string(), value.to_string());
        Ok(())
    }
}

/// Clonable handle over a [`MemoryDocument`], for callers that need to keep
/// inspecting the document after handing the surface to an applier.
#[derive(Clone, Default)]
pub struct SharedDocument(std::sync::Arc<std::sync::Mutex<MemoryDocument>>);

impl SharedDocument {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with<R>(&self, f: impl FnOnce(&MemoryDocument) -> R) -> R {
        let guard = self.0.lock().unwrap_or_else(|e| e.into_inner());
        f(&guard)
    }

    fn with_mut<R>(&self, f: impl FnOnce(&mut MemoryDocument) -> R) -> R {
        let mut guard = self.0.lock().unwrap_or_else(|e| e.into_inner());
        f(&mut guard)
    }
}

impl DocumentSurface for SharedDocument {
    fn replace_style(&mut self, id: &str, css: &str) -> Result<(), ThemeError> {
        self.with_mut(|doc| doc.replace_style(id, css))
    }

    fn remove_style(&mut self, id: &str) -> Result<(), ThemeError> {
        self.with_mut(|doc| doc.remove_style(id))
    }

    fn set_root_attribute(&mut self, name: &str, value: &str) -> Result<(), ThemeError> {
        self.with_mut(|doc| doc.set_root_attribute(name, value))
    }

    fn set_body_attribute(&mut self, name: &str, value: &str) -> Result<(), ThemeError> {
        self.with_mut(|doc| doc.set_body_attribute(name, value))
    }
}

/// Writes the stylesheet to `<dir>/<id>.css` and mirrors the document
/// attributes into `<dir>/document.json` so companion tooling can discover
/// the active mode without re-querying storage.
#[derive(Debug)]
pub struct FileSurface {
    dir: PathBuf,
    root: BTreeMap<String, String>,
    body: BTreeMap<String, String>,
}

impl FileSurface {
    pub fn new(dir: PathBuf) -> Self {
        Self {
            dir,
            root: BTreeMap::new(),
            body: BTreeMap::new(),
        }
    }

    pub fn stylesheet_path(&self, id: &str) -> PathBuf {
        self.dir.join(format!("{}.css", id))
    }

    fn write_meta(&self) -> Result<(), ThemeError> {
        let meta = serde_json::json!({
            "root": self.root,
            "body": self.body,
        });
        let path = self.dir.join("document.json");
        let tmp = self.dir.join("document.json.tmp");
        fs::write(&tmp, serde_json::to_string_pretty(&meta).unwrap_or_default())?;
        fs::rename(&tmp, &path)?;
        Ok(())
    }

    fn ensure_dir(&self) -> Result<(), ThemeError> {
        if !self.dir.exists() {
            fs::create_dir_all(&self.dir)?;
        }
        Ok(())
    }
}

impl DocumentSurface for FileSurface {
    fn replace_style(&mut self, id: &str, css: &str) -> Result<(), ThemeError> {
        self.ensure_dir()?;
        let path = self.stylesheet_path(id);
        let tmp = self.dir.join(format!("{}.css.tmp", id));
        fs::write(&tmp, css)?;
        fs::rename(&tmp, &path)?;
        Ok(())
    }

    fn remove_style(&mut self, id: &str) -> Result<(), ThemeError> {
        let path = self.stylesheet_path(id);
        if path.exists() {
            fs::remove_file(&path)?;
        }
        Ok(())
    }

    fn set_root_attribute(&mut self, name: &str, value: &str) -> Result<(), ThemeError> {
        self.ensure_dir()?;
        self.root.insert(name.to_string(), value.to_string());
        self.write_meta()
    }

    fn set_body_attribute(&mut self, name: &str, value: &str) -> Result<(), ThemeError> {
        self.ensure_dir()?;
        self.body.insert(name.to_string(), value.to_string());
        self.write_meta()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_replace_keeps_single_style() {
        let mut doc = MemoryDocument::new();
        doc.replace_style("x", "a {}").unwrap();
        doc.replace_style("x", "b {}").unwrap();
        assert_eq!(doc.style_count(), 1);
        assert_eq!(doc.style("x"), Some("b {}"));
    }

    #[test]
    fn test_file_surface_writes_and_removes() {
        let tmp = tempfile::tempdir().unwrap();
        let mut surface = FileSurface::new(tmp.path().to_path_buf());
        surface.replace_style("test-theme", ":root {}").unwrap();
        let css_path = surface.stylesheet_path("test-theme");
        assert!(css_path.exists());

        surface.set_root_attribute("data-theme-mode", "night").unwrap();
        let meta = std::fs::read_to_string(tmp.path().join("document.json")).unwrap();
        assert!(meta.contains("data-theme-mode"));

        surface.remove_style("test-theme").unwrap();
        assert!(!css_path.exists());
    }
}
