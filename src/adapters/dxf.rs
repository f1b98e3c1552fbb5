use crate::core::geometry::{Extent, Geometry};
use crate::utils::error::Result;
use dxf::entities::{Entity, EntityType, LwPolyline, MText, Polyline, Text};
use dxf::enums::{AcadVersion, AttachmentPoint, HorizontalTextJustification};
use dxf::{Block, Drawing, LwPolylineVertex, Point};
use std::collections::{HashMap, HashSet};
use std::io::Cursor;
use std::sync::Arc;

/// Nesting depth after which INSERTs inside blocks are no longer followed.
const MAX_BLOCK_DEPTH: usize = 8;

const POLYLINE_3D: i32 = 8;
const POLYLINE_MESH: i32 = 16;
const POLYLINE_POLYFACE: i32 = 64;

/// A DXF entity together with what is needed to measure and re-emit it
/// elsewhere: for INSERTs, the referenced block definitions (the block itself
/// first, then the blocks it nests) and the block's extent in block space.
#[derive(Debug, Clone)]
pub struct DxfEntity {
    pub entity: Entity,
    blocks: Vec<Arc<Block>>,
    block_extent: Option<Extent>,
}

impl DxfEntity {
    pub fn new(entity: Entity) -> Self {
        Self {
            entity,
            blocks: Vec::new(),
            block_extent: None,
        }
    }

    pub fn blocks(&self) -> &[Arc<Block>] {
        &self.blocks
    }
}

impl Geometry for DxfEntity {
    fn try_extent(&self) -> Option<Extent> {
        match &self.entity.specific {
            EntityType::Line(line) => {
                Extent::from_points([(line.p1.x, line.p1.y), (line.p2.x, line.p2.y)])
            }
            EntityType::Circle(circle) => {
                let (cx, cy, r) = (circle.center.x, circle.center.y, circle.radius.abs());
                Some(Extent::new(cx - r, cy - r, cx + r, cy + r))
            }
            EntityType::Arc(arc) => Some(arc_extent(
                arc.center.x,
                arc.center.y,
                arc.radius.abs(),
                arc.start_angle,
                arc.end_angle,
            )),
            EntityType::Ellipse(ellipse) => {
                // Whole ellipse, ignoring start/end parameters.
                let (mx, my) = (ellipse.major_axis.x, ellipse.major_axis.y);
                let a = (mx * mx + my * my).sqrt();
                let b = a * ellipse.minor_axis_ratio.abs();
                let angle = my.atan2(mx);
                let (cos, sin) = (angle.cos(), angle.sin());
                let half_w = ((a * cos).powi(2) + (b * sin).powi(2)).sqrt();
                let half_h = ((a * sin).powi(2) + (b * cos).powi(2)).sqrt();
                let (cx, cy) = (ellipse.center.x, ellipse.center.y);
                Some(Extent::new(cx - half_w, cy - half_h, cx + half_w, cy + half_h))
            }
            EntityType::LwPolyline(polyline) => {
                Extent::from_points(polyline.vertices.iter().map(|v| (v.x, v.y)))
            }
            EntityType::Polyline(polyline) => {
                Extent::from_points(polyline.vertices().map(|v| (v.location.x, v.location.y)))
            }
            EntityType::Spline(spline) => Extent::from_points(
                spline
                    .control_points
                    .iter()
                    .chain(spline.fit_points.iter())
                    .map(|p| (p.x, p.y)),
            ),
            EntityType::Solid(solid) => Extent::from_points(
                [
                    &solid.first_corner,
                    &solid.second_corner,
                    &solid.third_corner,
                    &solid.fourth_corner,
                ]
                .into_iter()
                .map(|p| (p.x, p.y)),
            ),
            EntityType::Text(text) => Some(single_line_text_extent(text)),
            EntityType::MText(text) => Some(mtext_extent(text)),
            EntityType::Attribute(attribute) => Extent::from_points(
                [&attribute.location, &attribute.second_alignment_point]
                    .into_iter()
                    .map(|p| (p.x, p.y)),
            ),
            EntityType::Face3D(face) => Extent::from_points(
                [
                    &face.first_corner,
                    &face.second_corner,
                    &face.third_corner,
                    &face.fourth_corner,
                ]
                .into_iter()
                .map(|p| (p.x, p.y)),
            ),
            EntityType::Trace(trace) => Extent::from_points(
                [
                    &trace.first_corner,
                    &trace.second_corner,
                    &trace.third_corner,
                    &trace.fourth_corner,
                ]
                .into_iter()
                .map(|p| (p.x, p.y)),
            ),
            EntityType::Leader(leader) => {
                Extent::from_points(leader.vertices.iter().map(|p| (p.x, p.y)))
            }
            EntityType::ModelPoint(point) => {
                Some(Extent::from_point(point.location.x, point.location.y))
            }
            EntityType::Insert(insert) => {
                let block = self.blocks.first()?;
                let local = self.block_extent?;
                let base = &block.base_point;
                let (sx, sy) = (insert.x_scale_factor, insert.y_scale_factor);
                let (sin, cos) = insert.rotation.to_radians().sin_cos();
                let corners = [
                    (local.min_x, local.min_y),
                    (local.max_x, local.min_y),
                    (local.max_x, local.max_y),
                    (local.min_x, local.max_y),
                ];
                Extent::from_points(corners.into_iter().map(|(x, y)| {
                    let (x, y) = ((x - base.x) * sx, (y - base.y) * sy);
                    (
                        insert.location.x + x * cos - y * sin,
                        insert.location.y + x * sin + y * cos,
                    )
                }))
            }
            _ => None,
        }
    }

    fn translate(&mut self, dx: f64, dy: f64) {
        let shift = |p: &mut Point| {
            p.x += dx;
            p.y += dy;
        };
        match &mut self.entity.specific {
            EntityType::Line(line) => {
                shift(&mut line.p1);
                shift(&mut line.p2);
            }
            EntityType::Circle(circle) => shift(&mut circle.center),
            EntityType::Arc(arc) => shift(&mut arc.center),
            EntityType::Ellipse(ellipse) => shift(&mut ellipse.center),
            EntityType::LwPolyline(polyline) => {
                for v in polyline.vertices.iter_mut() {
                    v.x += dx;
                    v.y += dy;
                }
            }
            EntityType::Spline(spline) => {
                spline.control_points.iter_mut().for_each(&shift);
                spline.fit_points.iter_mut().for_each(&shift);
            }
            EntityType::Solid(solid) => {
                shift(&mut solid.first_corner);
                shift(&mut solid.second_corner);
                shift(&mut solid.third_corner);
                shift(&mut solid.fourth_corner);
            }
            EntityType::Polyline(polyline) => {
                polyline.vertices_mut().for_each(|v| shift(&mut v.location));
            }
            EntityType::Text(text) => {
                shift(&mut text.location);
                shift(&mut text.second_alignment_point);
            }
            EntityType::MText(text) => shift(&mut text.insertion_point),
            EntityType::ModelPoint(point) => shift(&mut point.location),
            EntityType::Insert(insert) => {
                shift(&mut insert.location);
                for attribute in insert.attributes_mut() {
                    shift(&mut attribute.location);
                    shift(&mut attribute.second_alignment_point);
                }
            }
            EntityType::Attribute(attribute) => {
                shift(&mut attribute.location);
                shift(&mut attribute.second_alignment_point);
            }
            EntityType::AttributeDefinition(definition) => {
                shift(&mut definition.location);
                shift(&mut definition.second_alignment_point);
            }
            EntityType::Face3D(face) => {
                shift(&mut face.first_corner);
                shift(&mut face.second_corner);
                shift(&mut face.third_corner);
                shift(&mut face.fourth_corner);
            }
            EntityType::Trace(trace) => {
                shift(&mut trace.first_corner);
                shift(&mut trace.second_corner);
                shift(&mut trace.third_corner);
                shift(&mut trace.fourth_corner);
            }
            EntityType::Leader(leader) => leader.vertices.iter_mut().for_each(&shift),
            EntityType::Shape(shape) => shift(&mut shape.location),
            EntityType::Tolerance(tolerance) => shift(&mut tolerance.insertion_point),
            EntityType::Ray(ray) => shift(&mut ray.start_point),
            EntityType::XLine(xline) => shift(&mut xline.first_point),
            EntityType::Image(image) => shift(&mut image.location),
            EntityType::Wipeout(wipeout) => shift(&mut wipeout.location),
            EntityType::RotatedDimension(dim) => {
                shift(&mut dim.dimension_base.definition_point_1);
                shift(&mut dim.dimension_base.text_mid_point);
                shift(&mut dim.insertion_point);
                shift(&mut dim.definition_point_2);
                shift(&mut dim.definition_point_3);
            }
            EntityType::RadialDimension(dim) => {
                shift(&mut dim.dimension_base.definition_point_1);
                shift(&mut dim.dimension_base.text_mid_point);
                shift(&mut dim.definition_point_2);
            }
            EntityType::DiameterDimension(dim) => {
                shift(&mut dim.dimension_base.definition_point_1);
                shift(&mut dim.dimension_base.text_mid_point);
                shift(&mut dim.definition_point_2);
            }
            EntityType::AngularThreePointDimension(dim) => {
                shift(&mut dim.dimension_base.definition_point_1);
                shift(&mut dim.dimension_base.text_mid_point);
                shift(&mut dim.definition_point_2);
                shift(&mut dim.definition_point_3);
                shift(&mut dim.definition_point_4);
                shift(&mut dim.definition_point_5);
            }
            EntityType::OrdinateDimension(dim) => {
                shift(&mut dim.dimension_base.definition_point_1);
                shift(&mut dim.dimension_base.text_mid_point);
                shift(&mut dim.definition_point_2);
                shift(&mut dim.definition_point_3);
            }
            // ACIS bodies, regions and underlays carry no editable coordinates.
            _ => tracing::debug!("entity kept in place: {:?}", self.entity.common.handle),
        }
    }
}

/// Glyph advance as a fraction of the text height.
const GLYPH_WIDTH_RATIO: f64 = 0.6;
/// MTEXT line pitch as a fraction of the text height.
const MTEXT_LINE_PITCH: f64 = 5.0 / 3.0;

/// Estimated box of a single-line TEXT from its height and character count.
fn single_line_text_extent(text: &Text) -> Extent {
    let h = text.text_height.abs();
    let w = h * GLYPH_WIDTH_RATIO * text.value.chars().count() as f64 * text.relative_x_scale_factor.abs();
    let (anchor, fx) = match text.horizontal_text_justification {
        HorizontalTextJustification::Center | HorizontalTextJustification::Middle => {
            (&text.second_alignment_point, 0.5)
        }
        HorizontalTextJustification::Right => (&text.second_alignment_point, 1.0),
        _ => (&text.location, 0.0),
    };
    rotated_box(anchor.x, anchor.y, w, h, fx, 0.0, text.rotation)
}

/// Estimated box of an MTEXT: the reference width when set, otherwise its
/// longest `\P`-separated line.
fn mtext_extent(text: &MText) -> Extent {
    let h = text.initial_text_height.abs();
    let lines: Vec<&str> = text.text.split("\\P").collect();
    let longest = lines.iter().map(|l| l.chars().count()).max().unwrap_or(0);
    let w = if text.reference_rectangle_width > 0.0 {
        text.reference_rectangle_width
    } else {
        h * GLYPH_WIDTH_RATIO * longest as f64
    };
    let total_h = h * (1.0 + (lines.len().max(1) - 1) as f64 * MTEXT_LINE_PITCH);

    let (fx, fy) = match text.attachment_point {
        AttachmentPoint::TopCenter => (0.5, 1.0),
        AttachmentPoint::TopRight => (1.0, 1.0),
        AttachmentPoint::MiddleLeft => (0.0, 0.5),
        AttachmentPoint::MiddleCenter => (0.5, 0.5),
        AttachmentPoint::MiddleRight => (1.0, 0.5),
        AttachmentPoint::BottomLeft => (0.0, 0.0),
        AttachmentPoint::BottomCenter => (0.5, 0.0),
        AttachmentPoint::BottomRight => (1.0, 0.0),
        _ => (0.0, 1.0),
    };
    let p = &text.insertion_point;
    rotated_box(p.x, p.y, w, total_h, fx, fy, text.rotation_angle)
}

/// Extent of a `w` x `h` box anchored at (x, y) by the fractions (fx, fy) of
/// its size, rotated about the anchor by `degrees`.
fn rotated_box(x: f64, y: f64, w: f64, h: f64, fx: f64, fy: f64, degrees: f64) -> Extent {
    let (left, bottom) = (-fx * w, -fy * h);
    let (sin, cos) = degrees.to_radians().sin_cos();
    let corners = [
        (left, bottom),
        (left + w, bottom),
        (left + w, bottom + h),
        (left, bottom + h),
    ];
    corners
        .into_iter()
        .map(|(cx, cy)| (x + cx * cos - cy * sin, y + cx * sin + cy * cos))
        .fold(Extent::from_point(x, y), |e, (px, py)| e.include_point(px, py))
}

/// Extent of a counter-clockwise arc from `start` to `end` (degrees).
fn arc_extent(cx: f64, cy: f64, r: f64, start: f64, end: f64) -> Extent {
    let start = start.rem_euclid(360.0);
    let mut end = end.rem_euclid(360.0);
    if end <= start {
        end += 360.0;
    }
    let at = |deg: f64| {
        let (sin, cos) = deg.to_radians().sin_cos();
        (cx + r * cos, cy + r * sin)
    };

    let (x, y) = at(start);
    let mut extent = Extent::from_point(x, y);
    let (x, y) = at(end);
    extent = extent.include_point(x, y);

    // Axis crossings inside the sweep.
    let mut quadrant = (start / 90.0).floor() * 90.0 + 90.0;
    while quadrant < end {
        let (x, y) = at(quadrant);
        extent = extent.include_point(x, y);
        quadrant += 90.0;
    }
    extent
}

/// Entities of one parsed drawing, ready to be loaded into a fragment.
#[derive(Debug, Clone, Default)]
pub struct DxfDrawing {
    pub entities: Vec<DxfEntity>,
}

impl DxfDrawing {
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }
}

/// Parses DXF bytes in memory.
///
/// 2D POLYLINEs are rewritten as LWPOLYLINEs and every INSERT is bound to
/// the block definitions it needs.
pub fn read_drawing(bytes: &[u8]) -> Result<DxfDrawing> {
    let drawing = Drawing::load(&mut Cursor::new(bytes))?;

    let blocks: HashMap<String, Arc<Block>> = drawing
        .blocks()
        .map(|b| (b.name.clone(), Arc::new(b.clone())))
        .collect();

    let mut entities = Vec::new();
    let mut unsupported = 0usize;
    for entity in drawing.entities() {
        let entity = normalize_polyline(entity.clone());
        let loaded = bind_blocks(entity, &blocks, 0);
        if loaded.try_extent().is_none() {
            unsupported += 1;
        }
        entities.push(loaded);
    }

    if unsupported > 0 {
        tracing::debug!(
            "{} of {} entities have no measurable extent",
            unsupported,
            entities.len()
        );
    }
    Ok(DxfDrawing { entities })
}

fn normalize_polyline(entity: Entity) -> Entity {
    let EntityType::Polyline(polyline) = &entity.specific else {
        return entity;
    };
    if polyline.flags & (POLYLINE_3D | POLYLINE_MESH | POLYLINE_POLYFACE) != 0 {
        return entity;
    }

    let lw = to_lw_polyline(polyline);
    Entity {
        common: entity.common.clone(),
        specific: EntityType::LwPolyline(lw),
    }
}

fn to_lw_polyline(polyline: &Polyline) -> LwPolyline {
    let mut lw = LwPolyline::default();
    lw.flags = polyline.flags & 1;
    lw.vertices = polyline
        .vertices()
        .map(|v| LwPolylineVertex {
            x: v.location.x,
            y: v.location.y,
            starting_width: v.starting_width,
            ending_width: v.ending_width,
            bulge: v.bulge,
            ..Default::default()
        })
        .collect();
    lw
}

fn bind_blocks(entity: Entity, blocks: &HashMap<String, Arc<Block>>, depth: usize) -> DxfEntity {
    let mut loaded = DxfEntity::new(entity);
    let EntityType::Insert(insert) = &loaded.entity.specific else {
        return loaded;
    };
    if depth >= MAX_BLOCK_DEPTH {
        tracing::warn!("block '{}' nested too deep, ignoring its extent", insert.name);
        return loaded;
    }
    let Some(block) = blocks.get(&insert.name) else {
        tracing::warn!("INSERT references unknown block '{}'", insert.name);
        return loaded;
    };

    let mut required = vec![Arc::clone(block)];
    let mut extent: Option<Extent> = None;
    for inner in &block.entities {
        let inner = bind_blocks(normalize_polyline(inner.clone()), blocks, depth + 1);
        required.extend(inner.blocks.iter().cloned());
        if let Some(e) = inner.try_extent().filter(Extent::is_finite) {
            extent = Some(extent.map_or(e, |acc| acc.union(e)));
        }
    }

    loaded.blocks = required;
    loaded.block_extent = extent;
    loaded
}

/// Serializes entities into a fresh R2010 drawing.
///
/// Block definitions are written once per name; the first definition seen
/// wins. Handles are cleared so the drawing assigns new, unique ones.
pub fn write_drawing<'a, I>(entities: I) -> Result<Vec<u8>>
where
    I: IntoIterator<Item = &'a DxfEntity>,
{
    let mut drawing = Drawing::new();
    drawing.header.version = AcadVersion::R2010;

    let mut written_blocks = HashSet::new();
    let mut count = 0usize;
    for loaded in entities {
        for block in &loaded.blocks {
            if written_blocks.insert(block.name.clone()) {
                let mut block = (**block).clone();
                block.handle = dxf::Handle::empty();
                for inner in block.entities.iter_mut() {
                    inner.common.handle = dxf::Handle::empty();
                }
                drawing.add_block(block);
            }
        }

        let mut entity = loaded.entity.clone();
        entity.common.handle = dxf::Handle::empty();
        drawing.add_entity(entity);
        count += 1;
    }

    let mut buffer = Vec::new();
    drawing.save(&mut buffer)?;
    tracing::debug!(
        "wrote {} entities and {} blocks ({} bytes)",
        count,
        written_blocks.len(),
        buffer.len()
    );
    Ok(buffer)
}

#[cfg(test)]
pub(crate) mod fixtures {
    use dxf::entities::{Circle, Entity, EntityType, Line};
    use dxf::{Drawing, Point};

    /// DXF bytes of a `w` x `h` rectangle drawn with lines, starting at (x, y).
    pub fn rectangle(x: f64, y: f64, w: f64, h: f64) -> Vec<u8> {
        let mut drawing = Drawing::new();
        let corners = [(x, y), (x + w, y), (x + w, y + h), (x, y + h)];
        for i in 0..4 {
            let (a, b) = (corners[i], corners[(i + 1) % 4]);
            let line = Line::new(Point::new(a.0, a.1, 0.0), Point::new(b.0, b.1, 0.0));
            drawing.add_entity(Entity::new(EntityType::Line(line)));
        }
        save(&drawing)
    }

    pub fn circle(cx: f64, cy: f64, r: f64) -> Vec<u8> {
        let mut drawing = Drawing::new();
        let circle = Circle::new(Point::new(cx, cy, 0.0), r);
        drawing.add_entity(Entity::new(EntityType::Circle(circle)));
        save(&drawing)
    }

    pub fn save(drawing: &Drawing) -> Vec<u8> {
        let mut buffer = Vec::new();
        drawing.save(&mut buffer).unwrap();
        buffer
    }
}
