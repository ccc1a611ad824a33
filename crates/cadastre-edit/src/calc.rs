//! Construction solving
//!
//! [`solve`] turns an edit kind plus the current geometry of its inputs into
//! a [`Solution`]: the geometry of every feature the edit owns, keyed by
//! output name, and the lines it splits. Solving is pure; the session applies
//! a solution only once it has succeeded, so a failed construction commits
//! nothing. Initial execution, redo and rollforward all go through the same
//! function, which is what makes recomputation reproduce the original answer.

use crate::config::EditorConfig;
use crate::edit::{Direction, EditKind, TextAnchor};
use crate::error::EditError;
use crate::feature::FeatureGeometry;
use crate::store::FeatureStore;
use crate::types::{FeatureId, FeatureKind};
use cadastre_geom::{
    adjust, cumulative, direction_distance, direction_line, distance_distance, intersect_rays,
    line_line, radial, redistribute, signed_area, Arc, GeomError, LineGeometry, PathSpan, Position,
    Ray, Segment, SpatialSystem,
};
use indexmap::IndexMap;

/// Reference to a line end point
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EndRef {
    /// An existing point feature
    Feature(FeatureId),
    /// A point created by the same edit
    Output(String),
}

/// Geometry planned for one output feature
#[derive(Debug, Clone, PartialEq)]
pub enum Planned {
    /// Point position
    Point(Position),
    /// Line with its end points
    Line {
        /// Start point
        start: EndRef,
        /// End point
        end: EndRef,
        /// Shape
        shape: LineGeometry,
    },
    /// Text label
    Text {
        /// Label position
        position: Position,
        /// Label content
        text: String,
    },
    /// Polygon ring
    Polygon {
        /// Boundary vertices
        ring: Vec<Position>,
        /// Enclosed area
        area: f64,
    },
}

impl Planned {
    /// Kind of feature this output becomes
    #[must_use]
    pub fn kind(&self) -> FeatureKind {
        match self {
            Self::Point(_) => FeatureKind::Point,
            Self::Line { .. } => FeatureKind::Line,
            Self::Text { .. } => FeatureKind::Text,
            Self::Polygon { .. } => FeatureKind::Polygon,
        }
    }

    /// Final geometry once output names are bound to feature ids
    ///
    /// Panics if an end point names an output the edit does not have.
    #[must_use]
    pub fn resolve(&self, outputs: &IndexMap<String, FeatureId>) -> FeatureGeometry {
        let bind = |end: &EndRef| match end {
            EndRef::Feature(id) => *id,
            EndRef::Output(name) => match outputs.get(name) {
                Some(id) => *id,
                None => panic!("line end refers to unknown output `{name}`"),
            },
        };
        match self {
            Self::Point(position) => FeatureGeometry::Point { position: *position },
            Self::Line { start, end, shape } => FeatureGeometry::Line {
                start: bind(start),
                end: bind(end),
                shape: *shape,
            },
            Self::Text { position, text } => FeatureGeometry::Text {
                position: *position,
                text: text.clone(),
            },
            Self::Polygon { ring, area } => FeatureGeometry::Polygon {
                ring: ring.clone(),
                area: *area,
            },
        }
    }
}

/// A line replaced by sections
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedSplit {
    /// Line being split
    pub parent: FeatureId,
    /// Output names of the sections, start to end
    pub sections: Vec<String>,
}

/// Result of solving an edit
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Solution {
    /// Output geometry by name, in creation order
    pub outputs: IndexMap<String, Planned>,
    /// Lines split by the edit
    pub splits: Vec<PlannedSplit>,
}

impl Solution {
    fn add(&mut self, name: impl Into<String>, planned: Planned) {
        self.outputs.insert(name.into(), planned);
    }

    /// Does this solution create the same features as `outputs`?
    #[must_use]
    pub fn matches(&self, outputs: &IndexMap<String, FeatureId>) -> bool {
        self.outputs.len() == outputs.len() && self.outputs.keys().all(|k| outputs.contains_key(k))
    }
}

/// Inputs to a solve
#[derive(Debug, Clone, Copy)]
pub struct CalcContext<'a> {
    /// Current feature geometry
    pub store: &'a FeatureStore,
    /// Tolerance and projection
    pub config: &'a EditorConfig,
    /// Outputs of an earlier solve of the same edit, when recomputing
    pub previous: Option<&'a IndexMap<String, FeatureId>>,
}

impl<'a> CalcContext<'a> {
    /// Context for a first execution
    #[must_use]
    pub fn new(store: &'a FeatureStore, config: &'a EditorConfig) -> Self {
        Self {
            store,
            config,
            previous: None,
        }
    }

    /// Context for recomputing an edit that created `previous`
    #[must_use]
    pub fn recompute(
        store: &'a FeatureStore,
        config: &'a EditorConfig,
        previous: &'a IndexMap<String, FeatureId>,
    ) -> Self {
        Self {
            store,
            config,
            previous: Some(previous),
        }
    }

    fn tolerance(&self) -> f64 {
        self.config.tolerance
    }

    fn system(&self) -> &dyn SpatialSystem {
        &self.config.projection
    }

    fn ray(&self, direction: &Direction) -> Result<Ray, EditError> {
        Ok(Ray::with_offset(
            self.store.position(direction.from)?,
            direction.bearing,
            direction.offset,
        ))
    }
}

#[derive(Debug, Clone, Copy)]
enum SplitMode {
    /// Split when the flag is set and the point is inside the line
    Optional(bool),
    /// Always split; fail when the point is not inside the line
    Required,
}

/// Solve an edit against the current geometry of its inputs
///
/// # Errors
/// Returns error if an input is missing or of the wrong kind, or the
/// construction is geometrically impossible
pub fn solve(kind: &EditKind, ctx: &CalcContext<'_>) -> Result<Solution, EditError> {
    let mut out = Solution::default();
    let tol = ctx.tolerance();

    match kind {
        EditKind::NewPoint { position } => out.add("point", Planned::Point(*position)),

        EditKind::NewLine {
            start,
            end,
            center,
            clockwise,
        } => {
            let s = ctx.store.position(*start)?;
            let e = ctx.store.position(*end)?;
            let shape = match center {
                Some(c) => {
                    let c = ctx.store.position(*c)?;
                    let radius = c.distance(&s);
                    let offset = c.distance(&e) - radius;
                    if offset.abs() > tol {
                        return Err(GeomError::OffLine { offset }.into());
                    }
                    LineGeometry::Arc(Arc::new(c, radius, s, e, *clockwise)?)
                }
                None => {
                    if s.is_coincident(&e, tol) {
                        return Err(GeomError::ZeroLength.into());
                    }
                    LineGeometry::Segment(Segment::new(s, e))
                }
            };
            out.add(
                "line",
                Planned::Line {
                    start: EndRef::Feature(*start),
                    end: EndRef::Feature(*end),
                    shape,
                },
            );
        }

        EditKind::Radial {
            direction,
            distance,
            add_line,
        } => {
            let ray = ctx.ray(direction)?;
            let p = radial(&ray.origin, ray.bearing, *distance, ctx.system())?;
            out.add("point", Planned::Point(p));
            if *add_line {
                connector(&mut out, ctx, "line", direction.from, p)?;
            }
        }

        EditKind::IntersectDirections { a, b, add_lines } => {
            let p = intersect_rays(&ctx.ray(a)?, &ctx.ray(b)?)?;
            out.add("point", Planned::Point(p));
            if *add_lines {
                connector(&mut out, ctx, "line.a", a.from, p)?;
                connector(&mut out, ctx, "line.b", b.from, p)?;
            }
        }

        EditKind::IntersectDistances {
            a,
            b,
            use_default,
            add_lines,
        } => {
            let p = distance_distance(
                &ctx.store.position(a.center)?,
                a.distance,
                &ctx.store.position(b.center)?,
                b.distance,
                *use_default,
                ctx.system(),
            )?;
            out.add("point", Planned::Point(p));
            if *add_lines {
                connector(&mut out, ctx, "line.a", a.center, p)?;
                connector(&mut out, ctx, "line.b", b.center, p)?;
            }
        }

        EditKind::IntersectDirectionAndDistance {
            direction,
            circle,
            use_default,
        } => {
            let p = direction_distance(
                &ctx.ray(direction)?,
                &ctx.store.position(circle.center)?,
                circle.distance,
                *use_default,
                ctx.system(),
            )?;
            out.add("point", Planned::Point(p));
        }

        EditKind::IntersectDirectionAndLine {
            direction,
            line,
            close_to,
            split,
        } => {
            let (_, _, geometry) = ctx.store.line(*line)?;
            let p = direction_line(&ctx.ray(direction)?, &geometry, close_to.as_ref(), tol)?;
            out.add("point", Planned::Point(p));
            plan_split(&mut out, ctx, "line", *line, p, SplitMode::Optional(*split))?;
        }

        EditKind::IntersectLines {
            a,
            b,
            close_to,
            split_a,
            split_b,
        } => {
            if a == b {
                return Err(GeomError::NoIntersection.into());
            }
            let (_, _, ga) = ctx.store.line(*a)?;
            let (_, _, gb) = ctx.store.line(*b)?;
            let p = line_line(&ga, &gb, close_to.as_ref(), tol)?;
            out.add("point", Planned::Point(p));
            plan_split(&mut out, ctx, "a", *a, p, SplitMode::Optional(*split_a))?;
            plan_split(&mut out, ctx, "b", *b, p, SplitMode::Optional(*split_b))?;
        }

        EditKind::Path { from, to, legs } => {
            let layout = adjust(&ctx.store.position(*from)?, &ctx.store.position(*to)?, legs)?;
            let flags: Vec<PathSpan> = legs
                .iter()
                .flat_map(|l| l.spans.iter().copied())
                .collect();
            let last = flags.len() - 1;
            // end of the previous span, when it has a point
            let mut start = Some(EndRef::Feature(*from));
            for (i, (span, shape)) in flags.iter().zip(layout.spans()).enumerate() {
                let end = if i == last {
                    Some(EndRef::Feature(*to))
                } else if span.omit_point {
                    None
                } else {
                    out.add(format!("point.{i}"), Planned::Point(shape.end()));
                    Some(EndRef::Output(format!("point.{i}")))
                };
                if let (Some(start), Some(end)) = (&start, &end) {
                    if !span.omit_point && !span.miss_connect {
                        out.add(
                            format!("line.{i}"),
                            Planned::Line {
                                start: start.clone(),
                                end: end.clone(),
                                shape: *shape,
                            },
                        );
                    }
                }
                start = end;
            }
        }

        EditKind::SimpleLineSubdivision { line, distance } => {
            let (_, _, geometry) = ctx.store.line(*line)?;
            let p = subdivision_point(&geometry, *distance, ctx)?;
            out.add("point", Planned::Point(p));
            plan_split(&mut out, ctx, "line", *line, p, SplitMode::Required)?;
        }

        EditKind::LineSubdivision { line, spans } => {
            let (s, e, geometry) = ctx.store.line(*line)?;
            let length = geometry.length();
            if spans.len() < 2 {
                return Err(GeomError::SplitOutsideLine {
                    distance: length,
                    length,
                }
                .into());
            }
            let lengths = redistribute(spans, length)?;
            let marks = cumulative(&lengths);

            let mut points = Vec::with_capacity(spans.len() - 1);
            let mut last_at = 0.0;
            for (i, at) in marks.iter().take(spans.len() - 1).enumerate() {
                if *at <= last_at + tol || *at >= length - tol {
                    return Err(GeomError::SplitOutsideLine {
                        distance: *at,
                        length,
                    }
                    .into());
                }
                last_at = *at;
                let p = geometry.position_at(*at)?;
                out.add(format!("point.{i}"), Planned::Point(p));
                points.push(p);
            }

            let mut sections = Vec::with_capacity(spans.len());
            for i in 0..spans.len() {
                let (from, start) = if i == 0 {
                    (geometry.start(), EndRef::Feature(s))
                } else {
                    (points[i - 1], EndRef::Output(format!("point.{}", i - 1)))
                };
                let (to, end) = if i == points.len() {
                    (geometry.end(), EndRef::Feature(e))
                } else {
                    (points[i], EndRef::Output(format!("point.{i}")))
                };
                let name = format!("section.{i}");
                out.add(
                    name.clone(),
                    Planned::Line {
                        start,
                        end,
                        shape: geometry.with_ends(from, to),
                    },
                );
                sections.push(name);
            }
            out.splits.push(PlannedSplit {
                parent: *line,
                sections,
            });
        }

        EditKind::AttachPoint {
            line,
            position_ratio,
            split,
        } => {
            let (_, _, geometry) = ctx.store.line(*line)?;
            let length = geometry.length();
            if !(0.0..=1.0).contains(position_ratio) {
                return Err(GeomError::SplitOutsideLine {
                    distance: position_ratio * length,
                    length,
                }
                .into());
            }
            let p = geometry.position_at(position_ratio * length)?;
            out.add("point", Planned::Point(p));
            plan_split(&mut out, ctx, "line", *line, p, SplitMode::Optional(*split))?;
        }

        EditKind::LineExtension {
            line,
            from_end,
            distance,
            add_line,
        } => {
            let (s, e, geometry) = ctx.store.line(*line)?;
            let approx = geometry.extension(*from_end, *distance)?;
            let grid = ctx.system().to_grid(*distance, &approx.start(), &approx.end());
            let extension = geometry.extension(*from_end, grid)?;
            out.add("point", Planned::Point(extension.end()));
            if *add_line {
                out.add(
                    "line",
                    Planned::Line {
                        start: EndRef::Feature(if *from_end { e } else { s }),
                        end: EndRef::Output("point".into()),
                        shape: extension,
                    },
                );
            }
        }

        EditKind::NewText { text, anchor } => {
            let position = match anchor {
                TextAnchor::Fixed { position } => *position,
                TextAnchor::Point { point } => ctx.store.position(*point)?,
            };
            out.add(
                "text",
                Planned::Text {
                    position,
                    text: text.clone(),
                },
            );
        }

        EditKind::MoveText { text, position } => {
            let (_, content) = ctx.store.text(*text)?;
            out.add(
                "text",
                Planned::Text {
                    position: *position,
                    text: content,
                },
            );
        }

        EditKind::NewPolygon { boundary } => {
            let ring = close_boundary(boundary, ctx.store)?;
            let area = signed_area(&ring).abs();
            out.add("polygon", Planned::Polygon { ring, area });
        }

        EditKind::TrimLines { lines } => {
            for id in lines {
                ctx.store.line(*id)?;
            }
        }

        EditKind::Deletion { features } => {
            for id in features {
                ctx.store.require(*id)?;
            }
        }

        EditKind::Update { .. } => {}
    }

    Ok(out)
}

/// Straight line from an existing point to the edit's new `point`
fn connector(
    out: &mut Solution,
    ctx: &CalcContext<'_>,
    name: &str,
    from: FeatureId,
    to: Position,
) -> Result<(), EditError> {
    let start = ctx.store.position(from)?;
    if start.is_coincident(&to, ctx.tolerance()) {
        return Err(GeomError::ZeroLength.into());
    }
    out.add(
        name,
        Planned::Line {
            start: EndRef::Feature(from),
            end: EndRef::Output("point".into()),
            shape: LineGeometry::Segment(Segment::new(start, to)),
        },
    );
    Ok(())
}

/// Replace `line` by two sections meeting at the edit's new `point`
fn plan_split(
    out: &mut Solution,
    ctx: &CalcContext<'_>,
    role: &str,
    line: FeatureId,
    at: Position,
    mode: SplitMode,
) -> Result<(), EditError> {
    let (s, e, geometry) = ctx.store.line(line)?;
    let tol = ctx.tolerance();
    let before = format!("{role}.before");
    let after = format!("{role}.after");

    // once an edit has split a line it keeps doing so on recompute
    let split = match (ctx.previous, mode) {
        (Some(previous), _) => previous.contains_key(&before),
        (None, SplitMode::Required) => true,
        (None, SplitMode::Optional(flag)) => flag && geometry.is_interior(&at, tol),
    };
    if !split {
        return Ok(());
    }

    let (first, second) = geometry.split_at(at, tol)?;
    out.add(
        before.clone(),
        Planned::Line {
            start: EndRef::Feature(s),
            end: EndRef::Output("point".into()),
            shape: first,
        },
    );
    out.add(
        after.clone(),
        Planned::Line {
            start: EndRef::Output("point".into()),
            end: EndRef::Feature(e),
            shape: second,
        },
    );
    out.splits.push(PlannedSplit {
        parent: line,
        sections: vec![before, after],
    });
    Ok(())
}

/// Position at a signed ground distance along a line, scale corrected
fn subdivision_point(
    geometry: &LineGeometry,
    distance: f64,
    ctx: &CalcContext<'_>,
) -> Result<Position, EditError> {
    if distance.is_nan() || distance == 0.0 {
        return Err(GeomError::NonPositiveDistance(distance).into());
    }
    let length = geometry.length();
    let tol = ctx.tolerance();
    let ground = distance.abs();
    let from_end = distance < 0.0;
    let origin = if from_end { geometry.end() } else { geometry.start() };
    let along = |d: f64| if from_end { length - d } else { d };
    let inside = |at: f64| at > tol && at < length - tol;

    let approx_at = along(ground);
    if !inside(approx_at) {
        return Err(GeomError::SplitOutsideLine { distance, length }.into());
    }
    let approx = geometry.position_at(approx_at)?;
    let at = along(ctx.system().to_grid(ground, &origin, &approx));
    if !inside(at) {
        return Err(GeomError::SplitOutsideLine { distance, length }.into());
    }
    Ok(geometry.position_at(at)?)
}

/// Chain boundary lines into a closed ring of vertex positions
fn close_boundary(
    boundary: &[FeatureId],
    store: &FeatureStore,
) -> Result<Vec<Position>, EditError> {
    let mut edges = Vec::with_capacity(boundary.len());
    for id in boundary {
        let (s, e, _) = store.line(*id)?;
        edges.push((s, e));
    }
    let Some(&(first, mut current)) = edges.first() else {
        return Err(GeomError::OpenBoundary.into());
    };

    let mut remaining = edges[1..].to_vec();
    let mut vertices = vec![first];
    while !remaining.is_empty() {
        if current == first {
            // closed early with lines left over
            return Err(GeomError::OpenBoundary.into());
        }
        vertices.push(current);
        let next = remaining
            .iter()
            .position(|(s, e)| *s == current || *e == current)
            .ok_or(GeomError::OpenBoundary)?;
        let (s, e) = remaining.swap_remove(next);
        current = if s == current { e } else { s };
    }
    if current != first {
        return Err(GeomError::OpenBoundary.into());
    }

    vertices.iter().map(|id| store.position(*id)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::edit::CircleObservation;
    use crate::types::{EditSequence, EntityType};
    use cadastre_geom::{Leg, ObservedSpan, PathSpan, Projection};

    struct Fixture {
        store: FeatureStore,
        config: EditorConfig,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                store: FeatureStore::new(),
                config: EditorConfig::default(),
            }
        }

        fn point(&mut self, x: f64, y: f64) -> FeatureId {
            let id = self
                .store
                .insert(None, FeatureKind::Point, EntityType::new("point"), EditSequence(1))
                .unwrap();
            self.store
                .set_geometry(id, FeatureGeometry::Point { position: Position::new(x, y) });
            id
        }

        fn line(&mut self, a: FeatureId, b: FeatureId) -> FeatureId {
            let shape = LineGeometry::Segment(Segment::new(
                self.store.position(a).unwrap(),
                self.store.position(b).unwrap(),
            ));
            let id = self
                .store
                .insert(None, FeatureKind::Line, EntityType::new("line"), EditSequence(1))
                .unwrap();
            self.store
                .set_geometry(id, FeatureGeometry::Line { start: a, end: b, shape });
            id
        }

        fn solve(&self, kind: &EditKind) -> Result<Solution, EditError> {
            solve(kind, &CalcContext::new(&self.store, &self.config))
        }
    }

    fn point_of(solution: &Solution, name: &str) -> Position {
        match &solution.outputs[name] {
            Planned::Point(p) => *p,
            other => panic!("{name} is not a point: {other:?}"),
        }
    }

    #[test]
    fn distance_intersection_default_and_alternate() {
        let mut f = Fixture::new();
        let a = f.point(0.0, 0.0);
        let b = f.point(8.0, 0.0);
        let kind = |use_default| EditKind::IntersectDistances {
            a: CircleObservation::new(a, 5.0),
            b: CircleObservation::new(b, 5.0),
            use_default,
            add_lines: true,
        };
        let default = f.solve(&kind(true)).unwrap();
        assert!(point_of(&default, "point").is_coincident(&Position::new(4.0, 3.0), 1e-9));
        assert_eq!(default.outputs.len(), 3);
        let other = f.solve(&kind(false)).unwrap();
        assert!(point_of(&other, "point").is_coincident(&Position::new(4.0, -3.0), 1e-9));
    }

    #[test]
    fn direction_line_split_only_inside() {
        let mut f = Fixture::new();
        let a = f.point(0.0, 0.0);
        let b = f.point(10.0, 0.0);
        let o = f.point(4.0, -5.0);
        let line = f.line(a, b);
        let kind = EditKind::IntersectDirectionAndLine {
            direction: Direction::new(o, 0.0),
            line,
            close_to: None,
            split: true,
        };
        let s = f.solve(&kind).unwrap();
        assert!(point_of(&s, "point").is_coincident(&Position::new(4.0, 0.0), 1e-9));
        assert_eq!(s.splits, vec![PlannedSplit {
            parent: line,
            sections: vec!["line.before".into(), "line.after".into()],
        }]);

        // crossing at an end point does not split
        let at_end = f.point(10.0, -5.0);
        let kind = EditKind::IntersectDirectionAndLine {
            direction: Direction::new(at_end, 0.0),
            line,
            close_to: None,
            split: true,
        };
        assert!(f.solve(&kind).unwrap().splits.is_empty());
    }

    #[test]
    fn path_outputs_chain_between_known_points() {
        let mut f = Fixture::new();
        let a = f.point(0.0, 0.0);
        let b = f.point(0.0, 19.0);
        let kind = EditKind::Path {
            from: a,
            to: b,
            legs: vec![Leg::straight(0.0, vec![10.0]), Leg::straight(0.0, vec![10.0])],
        };
        let s = f.solve(&kind).unwrap();
        assert!(point_of(&s, "point.0").is_coincident(&Position::new(0.0, 9.5), 1e-12));
        let keys: Vec<_> = s.outputs.keys().cloned().collect();
        assert_eq!(keys, vec!["point.0", "line.0", "line.1"]);
        match &s.outputs["line.1"] {
            Planned::Line { start, end, .. } => {
                assert_eq!(start, &EndRef::Output("point.0".into()));
                assert_eq!(end, &EndRef::Feature(b));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn path_span_flags_drop_points_and_lines() {
        let mut f = Fixture::new();
        let a = f.point(0.0, 0.0);
        let b = f.point(0.0, 40.0);
        let spans = [
            PathSpan::new(10.0).miss_connect(),
            PathSpan::new(10.0).omit_point(),
            PathSpan::new(10.0),
            PathSpan::new(10.0),
        ];
        let kind = EditKind::Path {
            from: a,
            to: b,
            legs: vec![Leg::straight(0.0, spans)],
        };
        let s = f.solve(&kind).unwrap();
        let keys: Vec<_> = s.outputs.keys().cloned().collect();
        // no line along span 0, no point after span 1, so no line for 1 or 2
        assert_eq!(keys, vec!["point.0", "point.2", "line.3"]);
        assert!(point_of(&s, "point.2").is_coincident(&Position::new(0.0, 30.0), 1e-9));
        match &s.outputs["line.3"] {
            Planned::Line { start, end, .. } => {
                assert_eq!(start, &EndRef::Output("point.2".into()));
                assert_eq!(end, &EndRef::Feature(b));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn simple_subdivision_from_either_end() {
        let mut f = Fixture::new();
        let a = f.point(0.0, 0.0);
        let b = f.point(10.0, 0.0);
        let line = f.line(a, b);
        let s = f
            .solve(&EditKind::SimpleLineSubdivision { line, distance: 3.0 })
            .unwrap();
        assert!(point_of(&s, "point").is_coincident(&Position::new(3.0, 0.0), 1e-9));
        let s = f
            .solve(&EditKind::SimpleLineSubdivision { line, distance: -3.0 })
            .unwrap();
        assert!(point_of(&s, "point").is_coincident(&Position::new(7.0, 0.0), 1e-9));
        let err = f
            .solve(&EditKind::SimpleLineSubdivision { line, distance: 12.0 })
            .unwrap_err();
        assert!(matches!(err, EditError::Geometry(GeomError::SplitOutsideLine { .. })));
    }

    #[test]
    fn simple_subdivision_applies_scale() {
        let mut f = Fixture::new();
        f.config = f.config.clone().with_projection(Projection::Constant { factor: 0.5 });
        let a = f.point(0.0, 0.0);
        let b = f.point(10.0, 0.0);
        let line = f.line(a, b);
        let s = f
            .solve(&EditKind::SimpleLineSubdivision { line, distance: 8.0 })
            .unwrap();
        assert!(point_of(&s, "point").is_coincident(&Position::new(4.0, 0.0), 1e-9));
    }

    #[test]
    fn line_subdivision_redistributes() {
        let mut f = Fixture::new();
        let a = f.point(0.0, 0.0);
        let b = f.point(33.0, 0.0);
        let line = f.line(a, b);
        let s = f
            .solve(&EditKind::LineSubdivision {
                line,
                spans: vec![
                    ObservedSpan::free(10.0),
                    ObservedSpan::fixed(10.0),
                    ObservedSpan::free(10.0),
                ],
            })
            .unwrap();
        assert!(point_of(&s, "point.0").is_coincident(&Position::new(11.5, 0.0), 1e-9));
        assert!(point_of(&s, "point.1").is_coincident(&Position::new(21.5, 0.0), 1e-9));
        assert_eq!(s.splits[0].sections.len(), 3);
    }

    #[test]
    fn attach_point_splits_only_on_request() {
        let mut f = Fixture::new();
        let a = f.point(0.0, 0.0);
        let b = f.point(0.0, 20.0);
        let line = f.line(a, b);
        let attach = |split| EditKind::AttachPoint { line, position_ratio: 0.25, split };

        let s = f.solve(&attach(false)).unwrap();
        assert!(point_of(&s, "point").is_coincident(&Position::new(0.0, 5.0), 1e-9));
        assert_eq!(s.outputs.len(), 1);
        assert!(s.splits.is_empty());

        let s = f.solve(&attach(true)).unwrap();
        let keys: Vec<_> = s.outputs.keys().map(String::as_str).collect();
        assert_eq!(keys, ["point", "line.before", "line.after"]);
        assert_eq!(s.splits[0].parent, line);

        // an end point is never split off
        let end = EditKind::AttachPoint { line, position_ratio: 1.0, split: true };
        let s = f.solve(&end).unwrap();
        assert!(point_of(&s, "point").is_coincident(&Position::new(0.0, 20.0), 1e-9));
        assert!(s.splits.is_empty());

        let outside = EditKind::AttachPoint { line, position_ratio: 1.5, split: false };
        assert!(matches!(
            f.solve(&outside),
            Err(EditError::Geometry(GeomError::SplitOutsideLine { .. }))
        ));
    }

    #[test]
    fn line_extension_applies_scale() {
        let mut f = Fixture::new();
        f.config = f.config.clone().with_projection(Projection::Constant { factor: 0.5 });
        let a = f.point(0.0, 0.0);
        let b = f.point(10.0, 0.0);
        let line = f.line(a, b);
        let s = f
            .solve(&EditKind::LineExtension {
                line,
                from_end: false,
                distance: 8.0,
                add_line: true,
            })
            .unwrap();
        assert!(point_of(&s, "point").is_coincident(&Position::new(-4.0, 0.0), 1e-9));
        match &s.outputs["line"] {
            Planned::Line { start, end, shape } => {
                assert_eq!(start, &EndRef::Feature(a));
                assert_eq!(end, &EndRef::Output("point".into()));
                assert!((shape.length() - 4.0).abs() < 1e-9);
            }
            other => panic!("unexpected {other:?}"),
        }
        assert!(matches!(
            f.solve(&EditKind::LineExtension {
                line,
                from_end: true,
                distance: -1.0,
                add_line: false,
            }),
            Err(EditError::Geometry(GeomError::NonPositiveDistance(_)))
        ));
    }

    #[test]
    fn moved_text_keeps_its_content() {
        let mut f = Fixture::new();
        let label = f
            .store
            .insert(None, FeatureKind::Text, EntityType::new("text"), EditSequence(1))
            .unwrap();
        f.store.set_geometry(
            label,
            FeatureGeometry::Text {
                position: Position::new(1.0, 1.0),
                text: "Lot 7".into(),
            },
        );
        let to = Position::new(4.0, 2.0);
        let s = f.solve(&EditKind::MoveText { text: label, position: to }).unwrap();
        assert_eq!(
            s.outputs["text"],
            Planned::Text {
                position: to,
                text: "Lot 7".into(),
            }
        );
        let point = f.point(0.0, 0.0);
        assert!(matches!(
            f.solve(&EditKind::MoveText { text: point, position: to }),
            Err(EditError::WrongFeatureKind { .. })
        ));
    }

    #[test]
    fn polygon_needs_closed_boundary() {
        let mut f = Fixture::new();
        let a = f.point(0.0, 0.0);
        let b = f.point(10.0, 0.0);
        let c = f.point(10.0, 10.0);
        let ab = f.line(a, b);
        let bc = f.line(b, c);
        let ca = f.line(c, a);
        let s = f.solve(&EditKind::NewPolygon { boundary: vec![ab, ca, bc] }).unwrap();
        match &s.outputs["polygon"] {
            Planned::Polygon { ring, area } => {
                assert_eq!(ring.len(), 3);
                assert!((area - 50.0).abs() < 1e-9);
            }
            other => panic!("unexpected {other:?}"),
        }
        let err = f.solve(&EditKind::NewPolygon { boundary: vec![ab, bc] }).unwrap_err();
        assert!(matches!(err, EditError::Geometry(GeomError::OpenBoundary)));
    }

    #[test]
    fn arc_end_must_be_on_circle() {
        let mut f = Fixture::new();
        let c = f.point(0.0, 0.0);
        let s = f.point(0.0, 10.0);
        let on = f.point(10.0, 0.0);
        let off = f.point(11.0, 0.0);
        let arc = |end| EditKind::NewLine { start: s, end, center: Some(c), clockwise: true };
        assert!(f.solve(&arc(on)).is_ok());
        assert!(matches!(
            f.solve(&arc(off)),
            Err(EditError::Geometry(GeomError::OffLine { .. }))
        ));
        assert!(matches!(
            f.solve(&EditKind::NewLine { start: s, end: s, center: None, clockwise: false }),
            Err(EditError::Geometry(GeomError::ZeroLength))
        ));
    }

    #[test]
    fn wrong_input_kind_is_rejected() {
        let mut f = Fixture::new();
        let a = f.point(0.0, 0.0);
        let err = f
            .solve(&EditKind::SimpleLineSubdivision { line: a, distance: 1.0 })
            .unwrap_err();
        assert!(matches!(err, EditError::WrongFeatureKind { .. }));
    }
}
