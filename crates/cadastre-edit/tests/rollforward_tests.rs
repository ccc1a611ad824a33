use cadastre_edit::{
    EditKind, EditSequence, FeatureGeometry, Field, FieldValue, RollforwardReport, Session,
    TextAnchor,
};
use cadastre_geom::Position;
use cadastre_test_utils::*;
use proptest::prelude::*;

fn move_point(session: &mut Session, seq: EditSequence, x: f64, y: f64) -> RollforwardReport {
    let (_, report) = session
        .correct(
            seq,
            vec![Field::new("position", FieldValue::Position(Position::new(x, y)))],
        )
        .unwrap();
    report
}

#[test]
fn test_correction_moves_dependents_in_place() {
    let mut session = new_session();
    let a = add_point(&mut session, 0.0, 0.0);
    let seq = run(&mut session, radial(a, 0.0, 10.0));
    let p = output(&session, seq, "point");
    let label = run(
        &mut session,
        EditKind::NewText {
            text: "corner".into(),
            anchor: TextAnchor::Point { point: p },
        },
    );
    let text = output(&session, label, "text");

    let report = move_point(&mut session, EditSequence(1), 5.0, 0.0);

    assert!(report.is_complete());
    assert_eq!(report.recomputed, vec![EditSequence(1), seq, label]);
    assert_eq!(report.moved, vec![a, p, text]);
    assert_position(position(&session, p), 5.0, 10.0);
    match session.feature(text).and_then(|f| f.geometry()) {
        Some(FeatureGeometry::Text { position, .. }) => assert_position(*position, 5.0, 10.0),
        other => panic!("expected text, got {other:?}"),
    }
    assert!(session.feature(p).unwrap().is_moved());
    assert_eq!(session.clear_moved(), 3);
    assert!(!session.feature(p).unwrap().is_moved());
}

#[test]
fn test_rollforward_is_idempotent() {
    let mut session = new_session();
    let a = add_point(&mut session, 0.0, 0.0);
    let b = add_point(&mut session, 8.0, 0.0);
    let x = run(&mut session, distance_intersection(a, 5.0, b, 5.0, true));
    let p = output(&session, x, "point");
    run(&mut session, radial(p, 1.0, 12.0));
    move_point(&mut session, EditSequence(2), 9.0, 1.0);

    let first = session.snapshot();
    let again = session.rollforward(EditSequence(1));
    assert!(again.recomputed.is_empty());
    assert!(again.moved.is_empty());
    assert_eq!(session.snapshot(), first);
}

#[test]
fn test_polygon_follows_boundary() {
    let mut session = new_session();
    let corners = [(0.0, 0.0), (10.0, 0.0), (10.0, 10.0), (0.0, 10.0)];
    let points: Vec<_> = corners
        .iter()
        .map(|(x, y)| add_point(&mut session, *x, *y))
        .collect();
    let boundary: Vec<_> = (0..4)
        .map(|i| add_line(&mut session, points[i], points[(i + 1) % 4]))
        .collect();
    let polygon = run(&mut session, EditKind::NewPolygon { boundary });
    let id = output(&session, polygon, "polygon");

    let third = session.feature(points[2]).unwrap().creator();
    let report = move_point(&mut session, third, 20.0, 10.0);

    assert!(report.recomputed.contains(&polygon));
    match session.feature(id).and_then(|f| f.geometry()) {
        Some(FeatureGeometry::Polygon { area, .. }) => assert_close(*area, 150.0),
        other => panic!("expected polygon, got {other:?}"),
    }
}

#[test]
fn test_halt_reports_problem_operation() {
    let mut session = new_session();
    let a = add_point(&mut session, 0.0, 0.0);
    let b = add_point(&mut session, 8.0, 0.0);
    let x = run(&mut session, distance_intersection(a, 5.0, b, 5.0, true));
    let p = output(&session, x, "point");
    let tail = run(&mut session, radial(p, 0.0, 1.0));

    let report = move_point(&mut session, EditSequence(2), 20.0, 0.0);

    let problem = report.problem.clone().unwrap();
    assert_eq!(problem.sequence, x);
    assert_eq!(problem.inputs, vec![a, b]);
    assert!(!problem.reason.is_empty());
    assert!(!report.recomputed.contains(&tail));
    assert_eq!(session.pending_problem(), Some(&problem));
    // the failed edit keeps its last good geometry
    assert_position(position(&session, p), 4.0, 3.0);

    let report = move_point(&mut session, EditSequence(2), 8.0, 2.0);
    assert!(report.is_complete());
    assert!(session.pending_problem().is_none());
    assert!(report.recomputed.contains(&x));
    assert!(session.check_references().is_empty());
}

#[test]
fn test_problem_stays_pending_after_later_correction() {
    let mut session = new_session();
    let a = add_point(&mut session, 0.0, 0.0);
    let b = add_point(&mut session, 8.0, 0.0);
    let x = run(&mut session, distance_intersection(a, 5.0, b, 5.0, true));
    assert!(!move_point(&mut session, EditSequence(2), 20.0, 0.0).is_complete());

    let later = run(&mut session, EditKind::NewPoint { position: Position::new(50.0, 50.0) });
    let report = move_point(&mut session, later, 60.0, 60.0);

    assert!(report.is_complete());
    assert_eq!(session.pending_problem().map(|p| p.sequence), Some(x));
    assert!(session.operation(x).unwrap().is_changed());

    let report = move_point(&mut session, EditSequence(2), 8.0, 0.0);
    assert!(report.is_complete());
    assert!(session.pending_problem().is_none());
    assert!(!session.operation(x).unwrap().is_changed());
}

#[test]
fn test_undoing_problem_edit_clears_it() {
    let mut session = new_session();
    let a = add_point(&mut session, 0.0, 0.0);
    let b = add_point(&mut session, 8.0, 0.0);
    let x = run(&mut session, distance_intersection(a, 5.0, b, 5.0, true));
    move_point(&mut session, EditSequence(2), 20.0, 0.0);
    assert!(session.pending_problem().is_some());

    session.undo(x).unwrap();
    let report = session.rollforward(EditSequence(1));
    assert!(report.is_complete());
    assert!(session.pending_problem().is_none());
}

#[test]
fn test_split_is_kept_on_recompute() {
    let mut session = new_session();
    let (a, _, line) = line_fixture(&mut session, (0.0, 0.0), (10.0, 0.0));
    let split = run(&mut session, EditKind::SimpleLineSubdivision { line, distance: 4.0 });
    let before = output(&session, split, "line.before");

    let first = session.feature(a).unwrap().creator();
    let report = move_point(&mut session, first, 2.0, 0.0);

    assert!(report.is_complete());
    assert_position(position(&session, output(&session, split, "point")), 6.0, 0.0);
    assert_close(line_shape(&session, before).length(), 4.0);
    assert_eq!(session.get_predecessor(before), Some(line));
}

#[test]
fn test_undoing_correction_rolls_back() {
    let mut session = new_session();
    let a = add_point(&mut session, 0.0, 0.0);
    let seq = run(&mut session, radial(a, 0.0, 10.0));
    let p = output(&session, seq, "point");
    let original = session.snapshot();

    let (update, _) = session
        .correct(seq, vec![Field::new("distance", FieldValue::Float(15.0))])
        .unwrap();
    assert_position(position(&session, p), 0.0, 15.0);

    session.undo(update).unwrap();
    assert_position(position(&session, p), 0.0, 10.0);
    assert_eq!(session.snapshot(), original);
}

proptest! {
    #[test]
    fn prop_rollforward_twice_changes_nothing(
        starts in proptest::collection::vec((0.0..500.0f64, 0.0..500.0f64), 1..4),
        shots in proptest::collection::vec((0usize..16, 0.0..6.28f64, 1.0..100.0f64), 1..10),
        shift in (-20.0..20.0f64, -20.0..20.0f64),
    ) {
        let mut session = new_session();
        let mut points: Vec<_> = starts
            .iter()
            .map(|(x, y)| add_point(&mut session, *x, *y))
            .collect();
        for (from, bearing, distance) in shots {
            let from = points[from % points.len()];
            let seq = run(&mut session, radial(from, bearing, distance));
            points.push(output(&session, seq, "point"));
        }

        let (x, y) = starts[0];
        let report = move_point(&mut session, EditSequence(1), x + shift.0, y + shift.1);
        prop_assert!(report.is_complete());

        let first = session.snapshot();
        let again = session.rollforward(EditSequence(1));
        prop_assert!(again.moved.is_empty());
        prop_assert_eq!(session.snapshot(), first);
        prop_assert!(session.check_references().is_empty());
    }
}
