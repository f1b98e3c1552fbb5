use serde::{Deserialize, Serialize};

/// Axis-aligned bounding box in drawing units (millimetres).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Extent {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl Extent {
    /// Conventional representation of "no geometry".
    pub const EMPTY: Extent = Extent {
        min_x: 0.0,
        min_y: 0.0,
        max_x: 0.0,
        max_y: 0.0,
    };

    pub fn new(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        Self {
            min_x,
            min_y,
            max_x,
            max_y,
        }
    }

    /// Box spanning a single point.
    pub fn from_point(x: f64, y: f64) -> Self {
        Self::new(x, y, x, y)
    }

    /// Smallest box containing every point, `None` for an empty or non-finite set.
    pub fn from_points<I>(points: I) -> Option<Self>
    where
        I: IntoIterator<Item = (f64, f64)>,
    {
        let mut acc: Option<Extent> = None;
        for (x, y) in points {
            if !x.is_finite() || !y.is_finite() {
                return None;
            }
            acc = Some(match acc {
                Some(e) => e.include_point(x, y),
                None => Extent::from_point(x, y),
            });
        }
        acc
    }

    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }

    pub fn include_point(self, x: f64, y: f64) -> Self {
        Self::new(
            self.min_x.min(x),
            self.min_y.min(y),
            self.max_x.max(x),
            self.max_y.max(y),
        )
    }

    pub fn union(self, other: Extent) -> Self {
        Self::new(
            self.min_x.min(other.min_x),
            self.min_y.min(other.min_y),
            self.max_x.max(other.max_x),
            self.max_y.max(other.max_y),
        )
    }

    pub fn translated(self, dx: f64, dy: f64) -> Self {
        Self::new(
            self.min_x + dx,
            self.min_y + dy,
            self.max_x + dx,
            self.max_y + dy,
        )
    }

    /// True when the box collapses to a point or a line, or is inverted.
    pub fn is_degenerate(&self) -> bool {
        self.min_x >= self.max_x || self.min_y >= self.max_y
    }

    pub fn is_finite(&self) -> bool {
        self.min_x.is_finite()
            && self.min_y.is_finite()
            && self.max_x.is_finite()
            && self.max_y.is_finite()
    }
}

/// A single piece of vector geometry the layout can measure and move.
///
/// Implementations report `None` from [`Geometry::try_extent`] when the entity
/// has no measurable extent (text without metrics, unsupported types, broken
/// data); such entities are still carried and translated, they just do not
/// contribute to any bounding box.
pub trait Geometry: Clone {
    fn try_extent(&self) -> Option<Extent>;

    fn translate(&mut self, dx: f64, dy: f64);
}

/// Bounding box of a collection of entities.
///
/// Entities without an extent are skipped. Returns `None` (the Empty result)
/// when nothing contributed or the accumulated box is degenerate.
pub fn bbox<'a, G, I>(entities: I) -> Option<Extent>
where
    G: Geometry + 'a,
    I: IntoIterator<Item = &'a G>,
{
    let mut acc: Option<Extent> = None;
    for entity in entities {
        let Some(extent) = entity.try_extent().filter(Extent::is_finite) else {
            continue;
        };
        acc = Some(match acc {
            Some(current) => current.union(extent),
            None => extent,
        });
    }

    acc.filter(|e| !e.is_degenerate())
}

/// Same as [`bbox`] but using the all-zero convention for the Empty result.
pub fn bbox_or_empty<'a, G, I>(entities: I) -> Extent
where
    G: Geometry + 'a,
    I: IntoIterator<Item = &'a G>,
{
    bbox(entities).unwrap_or(Extent::EMPTY)
}
