use crate::core::geometry::Geometry;
use crate::core::layout::LayoutResult;
use crate::utils::error::{CutsheetError, Result};
use serde::{Deserialize, Serialize};

/// How plans are arranged relative to each other in the output document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stacking {
    /// First plan on top, the rest below it.
    #[default]
    Vertical,
    /// First plan on the left, the rest to its right.
    Horizontal,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ComposeSettings {
    pub stacking: Stacking,
    /// Gap between two neighbouring plans.
    pub spacing: f64,
}

impl Default for ComposeSettings {
    fn default() -> Self {
        Self {
            stacking: Stacking::Vertical,
            spacing: 300.0,
        }
    }
}

/// Layout of one named plan, as produced by the layout engine.
#[derive(Debug, Clone)]
pub struct PlanLayout<E> {
    pub name: String,
    pub layout: LayoutResult<E>,
}

/// Where a plan ended up in the shared document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlacedPlan {
    pub name: String,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub placed_items: usize,
    pub bounds_estimated: bool,
}

/// Every plan merged into one coordinate space with its lower-left corner at the origin.
#[derive(Debug, Clone)]
pub struct ComposedDocument<E> {
    pub entities: Vec<E>,
    pub plans: Vec<PlacedPlan>,
    pub skipped_plans: Vec<String>,
    pub width: f64,
    pub height: f64,
}

/// Stitches plan layouts into one document.
///
/// Plans are placed in ascending name order and never overlap. Plans without
/// any placement are reported in `skipped_plans`; when every plan is empty
/// the composition fails with [`CutsheetError::EmptyComposition`].
pub fn compose<E: Geometry>(
    mut plans: Vec<PlanLayout<E>>,
    settings: &ComposeSettings,
) -> Result<ComposedDocument<E>> {
    plans.sort_by(|a, b| a.name.cmp(&b.name));

    let (plans, empty): (Vec<_>, Vec<_>) = plans.into_iter().partition(|p| !p.layout.is_empty());
    let skipped_plans: Vec<String> = empty.into_iter().map(|p| p.name).collect();
    for name in &skipped_plans {
        tracing::warn!("plan '{}' has nothing to place, skipping", name);
    }

    if plans.is_empty() {
        return Err(CutsheetError::EmptyComposition {
            plans: skipped_plans.len(),
        });
    }

    // Offsets are first computed top-down / left-to-right and then shifted so
    // the lowest plan sits on y = 0.
    let mut offsets = Vec::with_capacity(plans.len());
    let mut cursor = 0.0;
    for plan in &plans {
        let (w, h) = (plan.layout.width, plan.layout.height);
        let offset = match settings.stacking {
            Stacking::Vertical => {
                let y = cursor - h;
                cursor = y - settings.spacing;
                (0.0, y)
            }
            Stacking::Horizontal => {
                let x = cursor;
                cursor = x + w + settings.spacing;
                (x, 0.0)
            }
        };
        offsets.push(offset);
    }
    let lift = -offsets.iter().map(|(_, y)| *y).fold(0.0, f64::min);

    let mut entities = Vec::new();
    let mut placed = Vec::with_capacity(plans.len());
    let (mut width, mut height) = (0.0_f64, 0.0_f64);

    for (plan, (x, y)) in plans.into_iter().zip(offsets) {
        let y = y + lift;
        let (origin_x, origin_y) = local_origin(&plan.layout);
        let (dx, dy) = (x - origin_x, y - origin_y);

        let placed_items = plan.layout.item_count();
        for placement in plan.layout.placements {
            entities.extend(placement.entities.into_iter().map(|mut e| {
                e.translate(dx, dy);
                e
            }));
        }

        width = width.max(x + plan.layout.width);
        height = height.max(y + plan.layout.height);

        tracing::debug!(
            "plan '{}' placed at x={:.2} y={:.2} ({:.2}x{:.2})",
            plan.name,
            x,
            y,
            plan.layout.width,
            plan.layout.height
        );
        placed.push(PlacedPlan {
            name: plan.name,
            x,
            y,
            width: plan.layout.width,
            height: plan.layout.height,
            placed_items,
            bounds_estimated: plan.layout.bounds_estimated,
        });
    }

    Ok(ComposedDocument {
        entities,
        plans: placed,
        skipped_plans,
        width,
        height,
    })
}

/// Lower-left corner of a plan in its own coordinates. Normal layouts are
/// already at the origin; estimated ones fall back to their slots.
fn local_origin<E>(layout: &LayoutResult<E>) -> (f64, f64) {
    if !layout.bounds_estimated {
        return (0.0, 0.0);
    }
    layout.placements.iter().fold((f64::INFINITY, f64::INFINITY), |(x, y), p| {
        (x.min(p.x), y.min(p.y))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::fragment::{FallbackSize, Fragment, FragmentRole};
    use crate::core::geometry::testing::Rect;
    use crate::core::geometry::{bbox, Extent};
    use crate::core::grouping::GroupingIndex;
    use crate::core::layout::{LayoutEngine, LayoutSettings};

    fn plan(name: &str, w: f64, h: f64) -> PlanLayout<Rect> {
        let info = Fragment::load(
            &[Rect::new(0.0, 0.0, w, h)],
            FallbackSize::new(1.0, 1.0),
            FragmentRole::PlanInfo,
            name,
        );
        let engine = LayoutEngine::new(LayoutSettings::default(), None);
        PlanLayout {
            name: name.to_string(),
            layout: engine.layout(&GroupingIndex::new(), Some(&info)),
        }
    }

    fn empty_plan(name: &str) -> PlanLayout<Rect> {
        PlanLayout {
            name: name.to_string(),
            layout: LayoutResult::empty(),
        }
    }

    #[test]
    fn test_vertical_stacking_in_name_order() {
        let plans = vec![plan("B", 100.0, 50.0), plan("A", 200.0, 20.0)];

        let doc = compose(plans, &ComposeSettings::default()).unwrap();

        assert_eq!(doc.plans[0].name, "A");
        assert_eq!(doc.plans[1].name, "B");
        // A on top of B with a 300 gap
        assert_eq!(doc.plans[1].y, 0.0);
        assert_eq!(doc.plans[0].y, 50.0 + 300.0);
        assert_eq!(doc.height, 50.0 + 300.0 + 20.0);
        assert_eq!(doc.width, 200.0);

        let extent = bbox(&doc.entities).unwrap();
        assert_eq!(extent, Extent::new(0.0, 0.0, 200.0, 370.0));
    }

    #[test]
    fn test_horizontal_stacking() {
        let settings = ComposeSettings {
            stacking: Stacking::Horizontal,
            spacing: 50.0,
        };
        let plans = vec![plan("02", 100.0, 50.0), plan("01", 200.0, 20.0)];

        let doc = compose(plans, &settings).unwrap();

        assert_eq!(doc.plans[0].name, "01");
        assert_eq!((doc.plans[0].x, doc.plans[0].y), (0.0, 0.0));
        assert_eq!((doc.plans[1].x, doc.plans[1].y), (250.0, 0.0));
        assert_eq!(doc.width, 350.0);
        assert_eq!(doc.height, 50.0);
    }

    #[test]
    fn test_plans_never_overlap() {
        let plans = vec![plan("A", 120.0, 80.0), plan("B", 60.0, 300.0), plan("C", 10.0, 10.0)];

        let doc = compose(plans, &ComposeSettings::default()).unwrap();

        for (i, a) in doc.plans.iter().enumerate() {
            for b in doc.plans.iter().skip(i + 1) {
                let disjoint_y = a.y >= b.y + b.height || b.y >= a.y + a.height;
                let disjoint_x = a.x >= b.x + b.width || b.x >= a.x + a.width;
                assert!(disjoint_x || disjoint_y, "{} overlaps {}", a.name, b.name);
            }
        }
    }

    #[test]
    fn test_empty_plans_are_skipped() {
        let plans = vec![empty_plan("A"), plan("B", 10.0, 10.0)];

        let doc = compose(plans, &ComposeSettings::default()).unwrap();

        assert_eq!(doc.skipped_plans, vec!["A".to_string()]);
        assert_eq!(doc.plans.len(), 1);
        assert_eq!(doc.plans[0].y, 0.0);
    }

    #[test]
    fn test_all_empty_is_an_error() {
        let plans = vec![empty_plan("A"), empty_plan("B")];

        let err = compose(plans, &ComposeSettings::default()).unwrap_err();

        assert!(matches!(err, CutsheetError::EmptyComposition { plans: 2 }));
    }
}
