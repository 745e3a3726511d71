//! Hand-authored spawn patterns for the static variant of the orchestrator.

use rand::Rng;
use serde::{Deserialize, Serialize};
use sf_core::{select_weighted, total_weight, TemplateCatalog, TemplateId, WorldPos};

use crate::config::ConfigError;

/// One element of a pattern.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatternEntry {
    pub template: TemplateId,
    /// Lane index, must be below the pattern's lane count.
    pub lane: u32,
    /// Offset from the pattern's base row.
    #[serde(default)]
    pub y_offset: f64,
}

/// A fixed arrangement of templates across lanes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpawnPattern {
    pub name: String,
    /// Likelihood of this pattern against the others.
    pub weight: f64,
    /// Vertical space consumed; the frontier advances by this much.
    pub vertical_extent: f64,
    pub lanes: u32,
    /// Maximum random lateral displacement per entry.
    #[serde(default)]
    pub x_jitter: Option<f64>,
    /// Maximum random vertical displacement per entry.
    #[serde(default)]
    pub y_jitter: Option<f64>,
    pub entries: Vec<PatternEntry>,
}

impl SpawnPattern {
    pub fn validate(&self, catalog: &TemplateCatalog) -> Result<(), ConfigError> {
        if !self.weight.is_finite() || self.weight < 0.0 {
            return Err(ConfigError::InvalidValue {
                field: "pattern weight",
                value: self.weight,
            });
        }
        for entry in &self.entries {
            if !catalog.contains(entry.template) {
                return Err(ConfigError::UnknownTemplate {
                    context: format!("pattern '{}'", self.name),
                    template: entry.template,
                });
            }
        }
        Ok(())
    }

    /// Centre of `lane` on a track of `track_width` with `clip_margin` kept free on both sides.
    ///
    /// A single-lane pattern sits on the centre line.
    pub fn lane_x(&self, lane: u32, track_width: f64, clip_margin: f64) -> f64 {
        let lanes = self.lanes.max(1);
        if lanes == 1 {
            return 0.0;
        }
        let usable = (track_width - 2.0 * clip_margin).max(0.0);
        let spacing = usable / (lanes - 1) as f64;
        -usable / 2.0 + lane as f64 * spacing
    }

    /// Frontier advance for this pattern; non-positive extents use `fallback`.
    pub fn advance(&self, fallback: f64) -> f64 {
        if self.vertical_extent.is_finite() && self.vertical_extent > 0.0 {
            self.vertical_extent
        } else {
            fallback
        }
    }

    /// Resolve entries into positions for a pattern based at `row_y`.
    ///
    /// Entries with an out-of-range lane, or whose jittered position leaves
    /// the clipped track, are dropped.
    pub fn layout(
        &self,
        row_y: f64,
        track_width: f64,
        clip_margin: f64,
        rng: &mut impl Rng,
    ) -> Vec<(TemplateId, WorldPos)> {
        let lanes = self.lanes.max(1);
        let half = track_width / 2.0;
        let (min_x, max_x) = (-half + clip_margin, half - clip_margin);
        if min_x > max_x {
            return Vec::new();
        }

        let mut placed = Vec::with_capacity(self.entries.len());
        for entry in &self.entries {
            if entry.lane >= lanes {
                continue;
            }

            let mut x = self
                .lane_x(entry.lane, track_width, clip_margin)
                .clamp(min_x, max_x);
            if let Some(jitter) = self.x_jitter.filter(|j| *j > 0.0) {
                x += rng.gen_range(-jitter..=jitter);
            }
            if x < min_x || x > max_x {
                continue;
            }

            let mut y = row_y + entry.y_offset;
            if let Some(jitter) = self.y_jitter.filter(|j| *j > 0.0) {
                y += rng.gen_range(-jitter..=jitter);
            }
            placed.push((entry.template, WorldPos::new(x, y)));
        }
        placed
    }
}

/// Weighted pick over `patterns`, falling back to the first one.
pub fn pick_pattern<'a>(patterns: &'a [SpawnPattern], rng: &mut impl Rng) -> Option<&'a SpawnPattern> {
    let total = total_weight(patterns, |p| p.weight);
    select_weighted(patterns, total, |p| p.weight, rng).or_else(|| patterns.first())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;
    use sf_core::{ItemCategory, Template};

    fn row_of_three() -> SpawnPattern {
        SpawnPattern {
            name: "three coins".into(),
            weight: 1.0,
            vertical_extent: 3.0,
            lanes: 3,
            x_jitter: None,
            y_jitter: None,
            entries: (0..3)
                .map(|lane| PatternEntry {
                    template: TemplateId(1),
                    lane,
                    y_offset: lane as f64 * 0.5,
                })
                .collect(),
        }
    }

    #[test]
    fn lanes_span_clipped_track() {
        let pattern = row_of_three();
        assert_eq!(pattern.lane_x(0, 5.0, 0.5), -2.0);
        assert_eq!(pattern.lane_x(1, 5.0, 0.5), 0.0);
        assert_eq!(pattern.lane_x(2, 5.0, 0.5), 2.0);

        let single = SpawnPattern { lanes: 1, ..row_of_three() };
        assert_eq!(single.lane_x(0, 5.0, 0.5), 0.0);
    }

    #[test]
    fn layout_applies_offsets_without_jitter() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let placed = row_of_three().layout(10.0, 5.0, 0.2, &mut rng);
        assert_eq!(placed.len(), 3);
        assert_eq!(placed[2].1.y, 11.0);
        assert!((placed[0].1.x + 2.3).abs() < 1e-9);
    }

    #[test]
    fn out_of_range_lanes_are_skipped() {
        let mut pattern = row_of_three();
        pattern.entries.push(PatternEntry {
            template: TemplateId(1),
            lane: 7,
            y_offset: 0.0,
        });
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        assert_eq!(pattern.layout(0.0, 5.0, 0.2, &mut rng).len(), 3);
    }

    #[test]
    fn jittered_entries_stay_on_track() {
        let pattern = SpawnPattern {
            x_jitter: Some(1.0),
            y_jitter: Some(0.5),
            ..row_of_three()
        };
        let mut rng = ChaCha8Rng::seed_from_u64(2);
        for _ in 0..200 {
            for (_, pos) in pattern.layout(4.0, 5.0, 0.2, &mut rng) {
                assert!(pos.x >= -2.3 && pos.x <= 2.3);
                assert!(pos.y >= 3.5 && pos.y <= 5.5 + 1.0);
            }
        }
    }

    #[test]
    fn non_positive_extent_uses_fallback() {
        let pattern = SpawnPattern {
            vertical_extent: 0.0,
            ..row_of_three()
        };
        assert_eq!(pattern.advance(0.5), 0.5);
        assert_eq!(row_of_three().advance(0.5), 3.0);
    }

    #[test]
    fn validate_rejects_unknown_templates() {
        let catalog =
            TemplateCatalog::new(vec![Template::new(2, "Bomb", 1.0, ItemCategory::Hazard)]).unwrap();
        assert!(matches!(
            row_of_three().validate(&catalog),
            Err(ConfigError::UnknownTemplate { .. })
        ));
    }

    #[test]
    fn pick_pattern_prefers_heavier() {
        let light = SpawnPattern {
            name: "light".into(),
            weight: 1.0,
            ..row_of_three()
        };
        let heavy = SpawnPattern {
            name: "heavy".into(),
            weight: 9.0,
            ..row_of_three()
        };
        let patterns = [light, heavy];
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let heavy_picks = (0..1000)
            .filter(|_| pick_pattern(&patterns, &mut rng).unwrap().name == "heavy")
            .count();
        assert!(heavy_picks > 850, "heavy picks {}", heavy_picks);
    }
}
