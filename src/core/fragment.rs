use crate::core::geometry::{bbox, Geometry};
use serde::{Deserialize, Serialize};

/// Width/height substituted when a drawing has no measurable geometry.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FallbackSize {
    pub width: f64,
    pub height: f64,
}

impl FallbackSize {
    pub const fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }
}

/// Fallback presets per fragment role.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FallbackPresets {
    pub item: FallbackSize,
    pub plan_info: FallbackSize,
    pub separator: FallbackSize,
}

impl Default for FallbackPresets {
    fn default() -> Self {
        Self {
            item: FallbackSize::new(129.0, 225.998),
            plan_info: FallbackSize::new(236.0, 21.5),
            separator: FallbackSize::new(10.0, 250.0),
        }
    }
}

/// What a fragment represents in the final layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FragmentRole {
    Item,
    PlanInfo,
    Separator,
}

impl FallbackPresets {
    pub fn for_role(&self, role: FragmentRole) -> FallbackSize {
        match role {
            FragmentRole::Item => self.item,
            FragmentRole::PlanInfo => self.plan_info,
            FragmentRole::Separator => self.separator,
        }
    }
}

/// A bounded, translatable unit of geometry loaded from one source drawing.
///
/// `width`/`height` are either the measured extent of `entities` or the
/// fallback size for the fragment's role; `origin_min_x`/`origin_min_y` is the
/// lower-left corner of the measured extent (or `(0, 0)` with a fallback).
#[derive(Debug, Clone)]
pub struct Fragment<E> {
    pub entities: Vec<E>,
    pub width: f64,
    pub height: f64,
    pub origin_min_x: f64,
    pub origin_min_y: f64,
    pub source_key: String,
    pub role: FragmentRole,
    pub uses_fallback: bool,
}

impl<E: Geometry> Fragment<E> {
    /// Builds a fragment from raw entities.
    ///
    /// The entities are cloned so translating the fragment never mutates the
    /// source drawing.
    pub fn load(
        raw: &[E],
        fallback: FallbackSize,
        role: FragmentRole,
        label: impl Into<String>,
    ) -> Self {
        let source_key = label.into();
        let entities: Vec<E> = raw.to_vec();

        // bbox() reports degenerate boxes as Empty, so a measured extent is never 0x0.
        let Some(extent) = bbox(&entities) else {
            tracing::warn!(
                "{:?} '{}' measured 0x0, using fallback size {}x{} mm",
                role,
                source_key,
                fallback.width,
                fallback.height
            );
            return Self {
                entities,
                width: fallback.width,
                height: fallback.height,
                origin_min_x: 0.0,
                origin_min_y: 0.0,
                source_key,
                role,
                uses_fallback: true,
            };
        };

        tracing::debug!(
            "{:?} '{}' loaded: {:.2}x{:.2} mm, {} entities",
            role,
            source_key,
            extent.width(),
            extent.height(),
            entities.len()
        );

        Self {
            entities,
            width: extent.width(),
            height: extent.height(),
            origin_min_x: extent.min_x,
            origin_min_y: extent.min_y,
            source_key,
            role,
            uses_fallback: false,
        }
    }

    /// A copy of the entities moved so the fragment's lower-left corner lands on `(x, y)`.
    pub fn placed_entities(&self, x: f64, y: f64) -> Vec<E> {
        let dx = x - self.origin_min_x;
        let dy = y - self.origin_min_y;
        self.entities
            .iter()
            .cloned()
            .map(|mut e| {
                e.translate(dx, dy);
                e
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::geometry::testing::Rect;
    use crate::core::geometry::Extent;

    #[test]
    fn test_load_measures_entities() {
        let raw = vec![Rect::new(10.0, 20.0, 30.0, 5.0), Rect::new(15.0, 22.0, 100.0, 40.0)];

        let fragment = Fragment::load(
            &raw,
            FallbackPresets::default().item,
            FragmentRole::Item,
            "PLAC-3010-2FH-AC-DOU-070-00000",
        );

        assert_eq!(fragment.width, 105.0);
        assert_eq!(fragment.height, 42.0);
        assert_eq!(fragment.origin_min_x, 10.0);
        assert_eq!(fragment.origin_min_y, 20.0);
        assert!(!fragment.uses_fallback);
        assert_eq!(fragment.entities.len(), 2);
    }

    #[test]
    fn test_load_uses_fallback_for_unmeasurable_drawing() {
        let raw = vec![Rect::opaque(), Rect::opaque()];

        let fragment = Fragment::load(
            &raw,
            FallbackSize::new(129.0, 225.998),
            FragmentRole::Item,
            "sku",
        );

        assert_eq!(fragment.width, 129.0);
        assert_eq!(fragment.height, 225.998);
        assert_eq!((fragment.origin_min_x, fragment.origin_min_y), (0.0, 0.0));
        assert!(fragment.uses_fallback);
        // entities are kept even though they have no extent
        assert_eq!(fragment.entities.len(), 2);
    }

    #[test]
    fn test_load_uses_fallback_for_degenerate_geometry() {
        // a lone vertical line measures as Empty
        let raw = vec![Rect::new(50.0, 50.0, 0.0, 30.0)];
        let presets = FallbackPresets::default();

        let fragment = Fragment::load(
            &raw,
            presets.for_role(FragmentRole::Separator),
            FragmentRole::Separator,
            "separator",
        );

        assert_eq!(fragment.width, 10.0);
        assert_eq!(fragment.height, 250.0);
        assert!(fragment.uses_fallback);
    }

    #[test]
    fn test_load_does_not_alias_source() {
        let raw = vec![Rect::new(0.0, 0.0, 1.0, 1.0)];
        let fragment = Fragment::load(&raw, FallbackSize::new(1.0, 1.0), FragmentRole::Item, "a");

        let moved = fragment.placed_entities(100.0, 100.0);

        assert_eq!(raw[0].extent, Some(Extent::new(0.0, 0.0, 1.0, 1.0)));
        assert_eq!(fragment.entities[0].extent, Some(Extent::new(0.0, 0.0, 1.0, 1.0)));
        assert_eq!(moved[0].extent, Some(Extent::new(100.0, 100.0, 101.0, 101.0)));
    }

    #[test]
    fn test_placed_entities_align_lower_left() {
        let raw = vec![Rect::new(-20.0, 7.5, 40.0, 10.0)];
        let fragment = Fragment::load(&raw, FallbackSize::new(1.0, 1.0), FragmentRole::Item, "a");

        let moved = fragment.placed_entities(50.0, -300.0);

        assert_eq!(moved[0].extent, Some(Extent::new(50.0, -300.0, 90.0, -290.0)));
    }
}
