use serde::{Deserialize, Serialize};

/// A single image option returned by a provider for an item/slot query.
///
/// Candidates are ephemeral: constructed per query and discarded after
/// scoring, except for the winner which is recorded in the decision and
/// proposal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtworkCandidate {
    /// Name of the provider that produced this candidate.
    pub provider: String,
    pub url: String,
    /// Pixel width; zero when the provider reports no (or malformed)
    /// dimensions.
    #[serde(default)]
    pub width: u32,
    /// Pixel height; zero when unknown.
    #[serde(default)]
    pub height: u32,
    /// ISO 639-1 language code of any text on the image, when reported.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    /// Provider-reported vote or popularity score, when available.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vote: Option<f64>,
}

impl ArtworkCandidate {
    /// Aspect ratio (width / height), or `None` when either dimension is
    /// unknown.
    pub fn aspect_ratio(&self) -> Option<f64> {
        if self.width == 0 || self.height == 0 {
            None
        } else {
            Some(f64::from(self.width) / f64::from(self.height))
        }
    }
}
