use crate::core::fragment::{Fragment, FragmentRole};
use crate::core::geometry::{bbox, Extent, Geometry};
use crate::core::grouping::{ColorRow, GroupingIndex};
use serde::{Deserialize, Serialize};

/// Spacing constants of a plan layout, in millimetres.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutSettings {
    /// X of the first fragment in every row.
    pub left_margin: f64,
    /// Vertical gap between the plan-info drawing and the first row.
    pub plan_spacing: f64,
    /// Vertical gap between color rows.
    pub row_spacing: f64,
    /// Horizontal gap between fragments of the same group.
    pub item_spacing: f64,
    /// Horizontal gap on each side of a separator bar.
    pub separator_spacing: f64,
    /// Horizontal gap between groups when no separator bar is available.
    pub group_spacing: f64,
    /// Extra width reported around the margin when the layout bounds cannot be measured.
    pub min_width: f64,
}

impl Default for LayoutSettings {
    fn default() -> Self {
        Self {
            left_margin: 50.0,
            plan_spacing: 100.0,
            row_spacing: 200.0,
            item_spacing: 100.0,
            separator_spacing: 100.0,
            group_spacing: 100.0,
            min_width: 100.0,
        }
    }
}

/// One fragment copied into the plan's coordinate space.
#[derive(Debug, Clone)]
pub struct Placement<E> {
    pub role: FragmentRole,
    pub source_key: String,
    /// Lower-left corner of the fragment's box.
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub uses_fallback: bool,
    pub entities: Vec<E>,
}

impl<E> Placement<E> {
    pub fn slot(&self) -> Extent {
        Extent::new(self.x, self.y, self.x + self.width, self.y + self.height)
    }

    fn shift(&mut self, dx: f64, dy: f64)
    where
        E: Geometry,
    {
        self.x += dx;
        self.y += dy;
        for entity in &mut self.entities {
            entity.translate(dx, dy);
        }
    }
}

/// Placements of one plan plus its overall size.
///
/// After a normal layout the composition's lower-left corner is `(0, 0)`.
/// `bounds_estimated` flags the defect path where the placed geometry could
/// not be measured; width/height are then estimates and no normalization was
/// applied.
#[derive(Debug, Clone)]
pub struct LayoutResult<E> {
    pub placements: Vec<Placement<E>>,
    pub width: f64,
    pub height: f64,
    pub bounds_estimated: bool,
}

impl<E> LayoutResult<E> {
    pub fn empty() -> Self {
        Self {
            placements: Vec::new(),
            width: 0.0,
            height: 0.0,
            bounds_estimated: false,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.placements.is_empty()
    }

    pub fn item_count(&self) -> usize {
        self.placements
            .iter()
            .filter(|p| p.role == FragmentRole::Item)
            .count()
    }
}

/// Packs classified fragments into color rows.
///
/// The separator bar is owned by the engine so it is loaded once and shared by
/// every plan laid out with it.
#[derive(Debug, Clone)]
pub struct LayoutEngine<E> {
    settings: LayoutSettings,
    separator: Option<Fragment<E>>,
}

impl<E: Geometry> LayoutEngine<E> {
    pub fn new(settings: LayoutSettings, separator: Option<Fragment<E>>) -> Self {
        Self {
            settings,
            separator,
        }
    }

    pub fn settings(&self) -> &LayoutSettings {
        &self.settings
    }

    pub fn separator(&self) -> Option<&Fragment<E>> {
        self.separator.as_ref()
    }

    /// Lays out one plan.
    ///
    /// Works top-down from y = 0: the plan-info drawing first, then one row per
    /// color. Each row's fragments sit on a shared baseline below the tallest
    /// fragment of the row. The result is finally shifted so its lower-left
    /// corner is the origin.
    pub fn layout(
        &self,
        index: &GroupingIndex<E>,
        plan_info: Option<&Fragment<E>>,
    ) -> LayoutResult<E> {
        let s = &self.settings;
        let mut placements = Vec::with_capacity(index.len() + 1);
        let mut cursor_y = 0.0;
        let mut bottom = 0.0;

        if let Some(info) = plan_info {
            let y = cursor_y - info.height;
            placements.push(place(info, s.left_margin, y));
            tracing::debug!("plan info '{}' at x={:.2} y={:.2}", info.source_key, s.left_margin, y);
            bottom = y;
            cursor_y = y - s.plan_spacing;
        }

        for row in index.rows() {
            let row_height = self.row_height(&row);
            let baseline = cursor_y - row_height;
            tracing::debug!(
                "row '{}': {} groups, height {:.2}, baseline {:.2}",
                row.color,
                row.groups.len(),
                row_height,
                baseline
            );

            let mut cursor_x = s.left_margin;
            for (group_index, group) in row.groups.iter().enumerate() {
                if group_index > 0 {
                    cursor_x = self.insert_break(&mut placements, cursor_x, baseline);
                }

                for (n, fragment) in group.fragments.iter().enumerate() {
                    if n > 0 {
                        cursor_x += s.item_spacing;
                    }
                    placements.push(place(fragment, cursor_x, baseline));
                    tracing::debug!(
                        "item '{}' at x={:.2} y={:.2} ({:.2}x{:.2})",
                        fragment.source_key,
                        cursor_x,
                        baseline,
                        fragment.width,
                        fragment.height
                    );
                    cursor_x += fragment.width;
                }
            }

            bottom = baseline;
            cursor_y = baseline - s.row_spacing;
        }

        if placements.is_empty() {
            tracing::info!("nothing to lay out");
            return LayoutResult::empty();
        }

        let Some(bounds) = measure(&placements) else {
            let width = s.left_margin * 2.0 + s.min_width;
            let height = -bottom;
            tracing::error!(
                "layout bounds are degenerate for {} placements, reporting estimated {:.2}x{:.2} mm",
                placements.len(),
                width,
                height
            );
            return LayoutResult {
                placements,
                width,
                height,
                bounds_estimated: true,
            };
        };

        let (dx, dy) = (-bounds.min_x, -bounds.min_y);
        for placement in &mut placements {
            placement.shift(dx, dy);
        }

        LayoutResult {
            placements,
            width: bounds.width(),
            height: bounds.height(),
            bounds_estimated: false,
        }
    }

    /// Tallest fragment of the row, including the separator bar when the row has
    /// more than one group and therefore receives one.
    fn row_height(&self, row: &ColorRow<'_, E>) -> f64 {
        let tallest = row.fragments().map(|f| f.height).fold(0.0, f64::max);
        match &self.separator {
            Some(bar) if row.groups.len() > 1 => tallest.max(bar.height),
            _ => tallest,
        }
    }

    /// Visual break between two sibling groups. Returns the advanced cursor.
    fn insert_break(&self, placements: &mut Vec<Placement<E>>, cursor_x: f64, baseline: f64) -> f64 {
        let s = &self.settings;
        match &self.separator {
            Some(bar) => {
                let x = cursor_x + s.separator_spacing;
                placements.push(place(bar, x, baseline));
                x + bar.width + s.separator_spacing
            }
            None => cursor_x + s.group_spacing,
        }
    }
}

fn place<E: Geometry>(fragment: &Fragment<E>, x: f64, y: f64) -> Placement<E> {
    Placement {
        role: fragment.role,
        source_key: fragment.source_key.clone(),
        x,
        y,
        width: fragment.width,
        height: fragment.height,
        uses_fallback: fragment.uses_fallback,
        entities: fragment.placed_entities(x, y),
    }
}

/// Union of the placed geometry. Fragments sized by a fallback have no
/// measurable geometry, so their reserved slot stands in for it.
fn measure<E: Geometry>(placements: &[Placement<E>]) -> Option<Extent> {
    let mut bounds = bbox(placements.iter().flat_map(|p| p.entities.iter()));
    for placement in placements.iter().filter(|p| p.uses_fallback) {
        let slot = placement.slot();
        bounds = Some(match bounds {
            Some(b) => b.union(slot),
            None => slot,
        });
    }
    bounds.filter(|b| b.is_finite() && !b.is_degenerate())
}
