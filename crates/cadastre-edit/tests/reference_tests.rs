use cadastre_edit::{CircleObservation, EditError, EditKind, EditSequence, OperationState};
use cadastre_test_utils::*;
use std::collections::BTreeSet;

#[test]
fn test_execute_then_undo_restores_snapshot() {
    let mut session = new_session();
    let a = add_point(&mut session, 0.0, 0.0);
    let b = add_point(&mut session, 8.0, 0.0);
    let before = session.snapshot();

    let seq = run(
        &mut session,
        EditKind::IntersectDistances {
            a: CircleObservation::new(a, 5.0),
            b: CircleObservation::new(b, 5.0),
            use_default: true,
            add_lines: true,
        },
    );
    assert_ne!(session.snapshot(), before);
    assert_eq!(
        session.feature(a).unwrap().dependents(),
        &BTreeSet::from([seq])
    );

    session.undo(seq).unwrap();
    assert_eq!(session.snapshot(), before);
    assert_eq!(session.operation(seq).unwrap().state(), OperationState::Undone);

    session.redo(seq).unwrap();
    session.undo(seq).unwrap();
    assert_eq!(session.snapshot(), before);
    assert!(session.check_references().is_empty());
}

#[test]
fn test_redo_keeps_ids_and_sequence() {
    let mut session = new_session();
    let a = add_point(&mut session, 0.0, 0.0);
    let seq = run(&mut session, radial(a, 0.0, 10.0));
    let p = output(&session, seq, "point");
    let after = session.snapshot();

    session.undo(seq).unwrap();
    assert!(!is_active(&session, p));
    session.redo(seq).unwrap();

    assert_eq!(output(&session, seq, "point"), p);
    assert_eq!(session.snapshot(), after);
    assert_eq!(session.next_sequence(), EditSequence(3));
}

#[test]
fn test_undo_refused_while_outputs_are_used() {
    let mut session = new_session();
    let a = add_point(&mut session, 0.0, 0.0);
    let seq = run(&mut session, radial(a, 0.0, 10.0));

    let err = session.undo(EditSequence(1)).unwrap_err();
    match err {
        EditError::HasDependents { feature, dependents } => {
            assert_eq!(feature, a);
            assert_eq!(dependents, vec![seq]);
        }
        other => panic!("unexpected error {other}"),
    }
    assert!(is_active(&session, a));

    session.undo(seq).unwrap();
    session.undo(EditSequence(1)).unwrap();
    assert!(!is_active(&session, a));
    assert!(session.store().active().next().is_none());
}

#[test]
fn test_undo_twice_is_rejected() {
    let mut session = new_session();
    add_point(&mut session, 0.0, 0.0);
    session.undo(EditSequence(1)).unwrap();
    let err = session.undo(EditSequence(1)).unwrap_err();
    assert!(matches!(err, EditError::InvalidState { .. }));
    session.redo(EditSequence(1)).unwrap();
    assert!(matches!(
        session.redo(EditSequence(1)),
        Err(EditError::InvalidState { .. })
    ));
}

#[test]
fn test_redo_needs_active_inputs() {
    let mut session = new_session();
    let b = add_point(&mut session, 5.0, 5.0);
    let seq = run(&mut session, radial(b, 0.0, 3.0));
    session.undo(seq).unwrap();
    run(&mut session, EditKind::Deletion { features: vec![b] });

    let err = session.redo(seq).unwrap_err();
    assert!(matches!(err, EditError::InactiveFeature(id) if id == b));
    assert_eq!(session.operation(seq).unwrap().state(), OperationState::Undone);
}

#[test]
fn test_deletion_respects_dependents() {
    let mut session = new_session();
    let a = add_point(&mut session, 0.0, 0.0);
    let b = add_point(&mut session, 3.0, 4.0);
    let line = add_line(&mut session, a, b);

    let err = session
        .execute(EditKind::Deletion { features: vec![a] })
        .unwrap_err();
    assert!(err.is_referential_integrity());

    let del = run(&mut session, EditKind::Deletion { features: vec![line] });
    assert!(!is_active(&session, line));
    assert!(session.check_references().is_empty());

    session.undo(del).unwrap();
    assert!(is_active(&session, line));
    assert!(session.feature(line).unwrap().dependents().is_empty());
}

#[test]
fn test_trim_and_undo() {
    let mut session = new_session();
    let (_, _, line) = line_fixture(&mut session, (0.0, 0.0), (10.0, 0.0));
    let first = run(&mut session, EditKind::TrimLines { lines: vec![line] });
    let second = run(&mut session, EditKind::TrimLines { lines: vec![line] });
    assert!(session.feature(line).unwrap().is_trimmed());

    session.undo(second).unwrap();
    assert!(session.feature(line).unwrap().is_trimmed());
    session.undo(first).unwrap();
    assert!(!session.feature(line).unwrap().is_trimmed());
}

#[test]
fn test_dependency_closure() {
    let mut session = new_session();
    let a = add_point(&mut session, 0.0, 0.0);
    let b = add_point(&mut session, 8.0, 0.0);
    let x = run(&mut session, distance_intersection(a, 5.0, b, 5.0, true));
    let p = output(&session, x, "point");
    let tail = run(&mut session, radial(p, 0.5, 4.0));
    let lone = add_point(&mut session, 50.0, 50.0);

    assert_eq!(
        session.required_edits(tail),
        BTreeSet::from([EditSequence(1), EditSequence(2), x])
    );
    assert_eq!(session.dependent_edits(EditSequence(1)), BTreeSet::from([x, tail]));
    let lone_seq = session.feature(lone).unwrap().creator();
    assert!(session.dependent_edits(lone_seq).is_empty());
    assert!(session.validate_order().is_ok());

    session.undo(tail).unwrap();
    assert_eq!(session.dependent_edits(EditSequence(1)), BTreeSet::from([x]));
}

#[test]
fn test_rekey_respects_dependents() {
    let mut session = new_session();
    let a = add_point(&mut session, 0.0, 0.0);
    let b = add_point(&mut session, 1.0, 1.0);
    run(&mut session, radial(a, 0.0, 2.0));

    assert!(session.rekey(a, Some("P100".into())).is_err());
    session.rekey(b, Some("P200".into())).unwrap();
}

#[test]
fn test_mixed_history_keeps_references_symmetric() {
    let mut session = new_session();
    let (a, b, line) = line_fixture(&mut session, (0.0, 0.0), (20.0, 0.0));
    let split = run(&mut session, EditKind::SimpleLineSubdivision { line, distance: 5.0 });
    let x = run(&mut session, distance_intersection(a, 12.0, b, 12.0, false));
    let after = output(&session, split, "line.after");
    let trim = run(&mut session, EditKind::TrimLines { lines: vec![after] });
    session.undo(trim).unwrap();
    session.undo(x).unwrap();
    session.redo(x).unwrap();
    let p = output(&session, x, "point");
    run(&mut session, radial(p, 3.0, 7.0));

    assert!(session.check_references().is_empty());
    assert!(session.validate_order().is_ok());
}

#[test]
fn test_purge_drops_undone_edits() {
    let mut session = new_session();
    let a = add_point(&mut session, 0.0, 0.0);
    let seq = run(&mut session, radial(a, 0.0, 10.0));
    let p = output(&session, seq, "point");
    session.undo(seq).unwrap();

    assert_eq!(session.purge_undone().unwrap(), 1);
    assert!(session.operation(seq).is_none());
    assert!(session.feature(p).is_none());
    assert!(matches!(session.redo(seq), Err(EditError::UnknownEdit(_))));
    // numbers are still not reused
    assert_eq!(run(&mut session, radial(a, 1.0, 1.0)), EditSequence(3));
}
