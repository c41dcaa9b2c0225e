//! Pure, deterministic candidate ranking.
//!
//! Score = width minus a penalty proportional to the distance between the
//! candidate's aspect ratio and the slot's target ratio. Undersized
//! candidates are never dropped; they are partitioned after every
//! qualifying candidate so a "best available though undersized" result
//! survives when nothing better exists.

use std::cmp::Ordering;

use artfill_model::{ArtworkCandidate, ArtworkSlot};

/// Penalty per unit of aspect-ratio error. Sized so a badly letterboxed
/// 1500px poster loses to a perfectly proportioned 1000px one.
const ASPECT_PENALTY: f64 = 6000.0;

/// Raw score of one candidate for a slot. Candidates with unknown
/// dimensions are treated as width 0 with maximal ratio error.
pub fn score(candidate: &ArtworkCandidate, slot: ArtworkSlot) -> f64 {
    let target = slot.target_aspect_ratio();
    let ratio_error = match candidate.aspect_ratio() {
        Some(ratio) => (ratio - target).abs(),
        None => target,
    };
    f64::from(candidate.width) - ASPECT_PENALTY * ratio_error
}

/// Select the best candidate deterministically.
///
/// Ordering: qualifying (width >= `min_width`) before undersized, then
/// score, then pixel area, then provider priority rank, then language
/// match against `language`, then first-seen order.
pub fn select_best<'a>(
    candidates: &'a [ArtworkCandidate],
    slot: ArtworkSlot,
    min_width: u32,
    provider_priority: &[String],
    language: &str,
) -> Option<&'a ArtworkCandidate> {
    candidates
        .iter()
        .enumerate()
        .max_by(|(index_a, a), (index_b, b)| {
            compare(
                a, *index_a, b, *index_b, slot, min_width,
                provider_priority, language,
            )
        })
        .map(|(_, candidate)| candidate)
}

fn provider_rank(provider: &str, priority: &[String]) -> usize {
    priority
        .iter()
        .position(|name| name == provider)
        .unwrap_or(usize::MAX)
}

#[allow(clippy::too_many_arguments)]
fn compare(
    a: &ArtworkCandidate,
    index_a: usize,
    b: &ArtworkCandidate,
    index_b: usize,
    slot: ArtworkSlot,
    min_width: u32,
    priority: &[String],
    language: &str,
) -> Ordering {
    let qualifies_a = a.width >= min_width;
    let qualifies_b = b.width >= min_width;
    qualifies_a
        .cmp(&qualifies_b)
        .then_with(|| score(a, slot).total_cmp(&score(b, slot)))
        .then_with(|| {
            let area_a = u64::from(a.width) * u64::from(a.height);
            let area_b = u64::from(b.width) * u64::from(b.height);
            area_a.cmp(&area_b)
        })
        .then_with(|| {
            // Lower rank index is better.
            provider_rank(&b.provider, priority)
                .cmp(&provider_rank(&a.provider, priority))
        })
        .then_with(|| {
            let match_a = a.language.as_deref() == Some(language);
            let match_b = b.language.as_deref() == Some(language);
            match_a.cmp(&match_b)
        })
        // First-seen wins the final tie.
        .then_with(|| index_b.cmp(&index_a))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(
        provider: &str,
        width: u32,
        height: u32,
        language: Option<&str>,
    ) -> ArtworkCandidate {
        ArtworkCandidate {
            provider: provider.into(),
            url: format!("https://img/{provider}/{width}x{height}"),
            width,
            height,
            language: language.map(Into::into),
            vote: None,
        }
    }

    fn priority() -> Vec<String> {
        vec!["tmdb".into(), "fanart".into()]
    }

    #[test]
    fn aspect_fit_beats_raw_width_for_posters() {
        // width=1000 ratio 0.667 vs width=1500 ratio 0.50; the first must
        // rank higher for the poster slot despite being smaller.
        let candidates = vec![
            candidate("tmdb", 1500, 3000, None),
            candidate("tmdb", 1000, 1500, None),
        ];
        let best = select_best(
            &candidates,
            ArtworkSlot::Poster,
            600,
            &priority(),
            "en",
        )
        .unwrap();
        assert_eq!(best.width, 1000);
    }

    #[test]
    fn undersized_candidates_rank_after_qualifying_ones() {
        let candidates = vec![
            candidate("tmdb", 300, 450, None),
            candidate("tmdb", 700, 1050, None),
        ];
        let best = select_best(
            &candidates,
            ArtworkSlot::Poster,
            600,
            &priority(),
            "en",
        )
        .unwrap();
        assert_eq!(best.width, 700);
    }

    #[test]
    fn undersized_best_available_is_still_returned() {
        let candidates = vec![candidate("tmdb", 300, 450, None)];
        let best = select_best(
            &candidates,
            ArtworkSlot::Poster,
            600,
            &priority(),
            "en",
        );
        assert!(best.is_some());
    }

    #[test]
    fn provider_priority_breaks_score_ties() {
        let candidates = vec![
            candidate("fanart", 1000, 1500, None),
            candidate("tmdb", 1000, 1500, None),
        ];
        let best = select_best(
            &candidates,
            ArtworkSlot::Poster,
            600,
            &priority(),
            "en",
        )
        .unwrap();
        assert_eq!(best.provider, "tmdb");
    }

    #[test]
    fn language_match_breaks_remaining_ties() {
        let candidates = vec![
            candidate("tmdb", 1000, 1500, Some("fr")),
            candidate("tmdb", 1000, 1500, Some("en")),
        ];
        let best = select_best(
            &candidates,
            ArtworkSlot::Poster,
            600,
            &priority(),
            "en",
        )
        .unwrap();
        assert_eq!(best.language.as_deref(), Some("en"));
    }

    #[test]
    fn first_seen_wins_the_final_tie() {
        let candidates = vec![
            candidate("tmdb", 1000, 1500, Some("en")),
            candidate("tmdb", 1000, 1500, Some("en")),
        ];
        let best = select_best(
            &candidates,
            ArtworkSlot::Poster,
            600,
            &priority(),
            "en",
        )
        .unwrap();
        assert!(std::ptr::eq(best, &candidates[0]));
    }

    #[test]
    fn unknown_dimensions_score_lowest() {
        let candidates = vec![
            candidate("omdb", 0, 0, None),
            candidate("tmdb", 700, 1050, None),
        ];
        let best = select_best(
            &candidates,
            ArtworkSlot::Poster,
            600,
            &priority(),
            "en",
        )
        .unwrap();
        assert_eq!(best.provider, "tmdb");
    }

    #[test]
    fn background_slot_targets_sixteen_by_nine() {
        let candidates = vec![
            // 16:9 at 1920 wide.
            candidate("tmdb", 1920, 1080, None),
            // 2:3 poster-shaped image, wider on paper after rotation.
            candidate("tmdb", 2000, 3000, None),
        ];
        let best = select_best(
            &candidates,
            ArtworkSlot::Background,
            1920,
            &priority(),
            "en",
        )
        .unwrap();
        assert_eq!(best.height, 1080);
    }
}
