//! File-system source loader for `\input` / `\include`.

use paperscope::latex::SourceLoader;
use std::path::PathBuf;
use tracing::debug;

/// Loads included files relative to the directory of the main source.
pub struct FsLoader {
    root: PathBuf,
}

impl FsLoader {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl SourceLoader for FsLoader {
    fn load(&self, name: &str) -> Option<String> {
        let path = self.root.join(name);
        match std::fs::read_to_string(&path) {
            Ok(text) => Some(text),
            Err(e) => {
                debug!(path = %path.display(), error = %e, "include not loaded");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use paperscope::ParseOptions;

    #[test]
    fn test_loads_relative_to_root() {
        let root = std::env::temp_dir().join(format!("paperscope-loader-{}", std::process::id()));
        std::fs::create_dir_all(root.join("chapters")).unwrap();
        std::fs::write(root.join("chapters/intro.tex"), "\\section{Intro}\nHello.").unwrap();

        let loader = FsLoader::new(&root);
        assert!(loader.load("chapters/intro.tex").is_some());
        assert!(loader.load("missing.tex").is_none());

        let doc = paperscope::latex::parse_with_includes(
            "\\input{chapters/intro}",
            &loader,
            &ParseOptions::default(),
        )
        .unwrap()
        .value;
        assert_eq!(doc.sections.len(), 1);
        assert_eq!(doc.sections[0].title, "Intro");

        std::fs::remove_dir_all(&root).unwrap();
    }
}
