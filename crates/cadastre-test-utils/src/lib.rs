//! Testing utilities for the cadastre workspace
//!
//! Shared session fixtures and tolerance assertions.

#![allow(missing_docs)]

use cadastre_edit::{
    CircleObservation, Direction, EditKind, EditSequence, EditorConfig, FeatureId, Session,
};
use cadastre_geom::{LineGeometry, Position};

pub const TOLERANCE: f64 = 1e-9;

pub fn new_session() -> Session {
    Session::new(EditorConfig::default())
}

/// Execute an edit that must succeed
pub fn run(session: &mut Session, kind: EditKind) -> EditSequence {
    match session.execute(kind) {
        Ok(seq) => seq,
        Err(err) => panic!("edit rejected: {err}"),
    }
}

/// Feature created by `seq` under output name `name`
pub fn output(session: &Session, seq: EditSequence, name: &str) -> FeatureId {
    session
        .operation(seq)
        .and_then(|op| op.output(name))
        .unwrap_or_else(|| panic!("edit {seq} has no output `{name}`"))
}

pub fn add_point(session: &mut Session, x: f64, y: f64) -> FeatureId {
    let seq = run(session, EditKind::NewPoint { position: Position::new(x, y) });
    output(session, seq, "point")
}

pub fn add_line(session: &mut Session, start: FeatureId, end: FeatureId) -> FeatureId {
    let seq = run(
        session,
        EditKind::NewLine {
            start,
            end,
            center: None,
            clockwise: false,
        },
    );
    output(session, seq, "line")
}

pub fn radial(from: FeatureId, bearing: f64, distance: f64) -> EditKind {
    EditKind::Radial {
        direction: Direction::new(from, bearing),
        distance,
        add_line: false,
    }
}

pub fn distance_intersection(
    a: FeatureId,
    da: f64,
    b: FeatureId,
    db: f64,
    use_default: bool,
) -> EditKind {
    EditKind::IntersectDistances {
        a: CircleObservation::new(a, da),
        b: CircleObservation::new(b, db),
        use_default,
        add_lines: false,
    }
}

/// Two points and the line between them
pub fn line_fixture(
    session: &mut Session,
    from: (f64, f64),
    to: (f64, f64),
) -> (FeatureId, FeatureId, FeatureId) {
    let a = add_point(session, from.0, from.1);
    let b = add_point(session, to.0, to.1);
    let line = add_line(session, a, b);
    (a, b, line)
}

pub fn position(session: &Session, id: FeatureId) -> Position {
    session
        .store()
        .position(id)
        .unwrap_or_else(|err| panic!("{id} has no position: {err}"))
}

pub fn line_shape(session: &Session, id: FeatureId) -> LineGeometry {
    match session.store().line(id) {
        Ok((_, _, shape)) => shape,
        Err(err) => panic!("{id} is not a line: {err}"),
    }
}

pub fn is_active(session: &Session, id: FeatureId) -> bool {
    session.feature(id).is_some_and(cadastre_edit::Feature::is_active)
}

#[track_caller]
pub fn assert_close(actual: f64, expected: f64) {
    assert!(
        (actual - expected).abs() < TOLERANCE,
        "expected {expected}, got {actual}"
    );
}

#[track_caller]
pub fn assert_position(actual: Position, x: f64, y: f64) {
    assert!(
        actual.is_coincident(&Position::new(x, y), TOLERANCE),
        "expected ({x}, {y}), got {actual}"
    );
}
