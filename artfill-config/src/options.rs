use serde::{Deserialize, Serialize};

fn default_priority() -> Vec<String> {
    vec!["tmdb".into(), "fanart".into(), "omdb".into()]
}

fn default_language() -> String {
    "en".into()
}

fn default_min_poster_width() -> u32 {
    600
}

fn default_min_background_width() -> u32 {
    1920
}

/// Which libraries a run covers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LibrarySelection {
    #[default]
    All,
    Named(Vec<String>),
}

impl LibrarySelection {
    pub fn includes(&self, library_name: &str) -> bool {
        match self {
            LibrarySelection::All => true,
            LibrarySelection::Named(names) => {
                names.iter().any(|n| n == library_name)
            }
        }
    }
}

/// Immutable per-run option set, validated once at run start and threaded
/// explicitly through the resolver and coordinator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunOptions {
    pub libraries: LibrarySelection,
    /// Process the background slot in addition to posters.
    pub include_backgrounds: bool,
    /// Replace artwork even when a slot is already filled.
    pub overwrite: bool,
    /// Never touch filled slots. Takes precedence over `overwrite` when
    /// both are set (the documented behavior of the original config
    /// surface).
    pub only_missing: bool,
    /// Log decisions without uploading or writing history.
    pub dry_run: bool,
    /// Queue proposals for external approval instead of auto-applying.
    pub final_approval: bool,
    /// Provider names in query order.
    #[serde(default = "default_priority")]
    pub provider_priority: Vec<String>,
    /// Preferred artwork language (ISO 639-1).
    #[serde(default = "default_language")]
    pub language: String,
    /// Treat an auto-generated poster as a missing one.
    pub treat_generated_as_missing: bool,
    #[serde(default = "default_min_poster_width")]
    pub min_poster_width: u32,
    #[serde(default = "default_min_background_width")]
    pub min_background_width: u32,
    /// Extend processing beyond movies and shows.
    pub include_seasons: bool,
    pub include_episodes: bool,
    pub include_collections: bool,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            libraries: LibrarySelection::All,
            include_backgrounds: true,
            overwrite: false,
            only_missing: false,
            dry_run: false,
            final_approval: false,
            provider_priority: default_priority(),
            language: default_language(),
            treat_generated_as_missing: false,
            min_poster_width: default_min_poster_width(),
            min_background_width: default_min_background_width(),
            include_seasons: false,
            include_episodes: false,
            include_collections: false,
        }
    }
}

impl RunOptions {
    /// Resolve contradictory flags into a consistent option set.
    ///
    /// `only_missing` overrides `overwrite`; the original configuration
    /// surface documents `ONLY_MISSING` as the stronger setting, so the
    /// combination is resolved rather than rejected.
    pub fn normalized(mut self) -> Self {
        if self.only_missing && self.overwrite {
            tracing::warn!(
                "both only_missing and overwrite set; only_missing wins"
            );
            self.overwrite = false;
        }
        self
    }

    /// Effective overwrite behavior after precedence resolution.
    pub fn effective_overwrite(&self) -> bool {
        self.overwrite && !self.only_missing
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_missing_beats_overwrite() {
        let opts = RunOptions {
            overwrite: true,
            only_missing: true,
            ..RunOptions::default()
        }
        .normalized();
        assert!(!opts.overwrite);
        assert!(!opts.effective_overwrite());
    }

    #[test]
    fn defaults_match_documented_surface() {
        let opts = RunOptions::default();
        assert_eq!(opts.provider_priority, vec!["tmdb", "fanart", "omdb"]);
        assert_eq!(opts.min_poster_width, 600);
        assert_eq!(opts.min_background_width, 1920);
        assert!(opts.include_backgrounds);
        assert!(!opts.final_approval);
    }

    #[test]
    fn named_library_selection_filters() {
        let sel = LibrarySelection::Named(vec!["Movies".into()]);
        assert!(sel.includes("Movies"));
        assert!(!sel.includes("TV Shows"));
    }
}
