use outliner_core::db::{open_db, open_db_in_memory};
use outliner_core::{
    MemoryNoteRepository, MutationOutcome, NoteId, NoteRepository, SqliteNoteRepository,
};

fn note(repo: &mut impl NoteRepository, text: &str) -> NoteId {
    repo.create_note(text).unwrap().id
}

fn children(repo: &impl NoteRepository, id: &NoteId) -> Vec<NoteId> {
    repo.get_note(id).unwrap().unwrap().children
}

/// Runs `check` against a fresh memory store and a fresh SQLite store.
fn for_each_store(check: impl Fn(&mut dyn NoteRepository)) {
    let mut memory = MemoryNoteRepository::new();
    check(&mut memory);

    let conn = open_db_in_memory().unwrap();
    let mut sqlite = SqliteNoteRepository::try_new(&conn).unwrap();
    check(&mut sqlite);
}

#[test]
fn duplicate_children_are_removed_one_occurrence_at_a_time() {
    for_each_store(|repo| {
        let a = repo.create_note("a").unwrap().id;
        let b = repo.create_note("b").unwrap().id;
        repo.set_children(&a, &[b.clone(), b.clone()]).unwrap();

        assert_eq!(repo.remove_child(&a, &b, 1).unwrap(), MutationOutcome::Applied);
        assert_eq!(repo.get_note(&a).unwrap().unwrap().children, vec![b.clone()]);
        // The second occurrence is gone; the same request is now stale.
        assert_eq!(repo.remove_child(&a, &b, 1).unwrap(), MutationOutcome::Stale);
        assert_eq!(repo.remove_child(&a, &b, 0).unwrap(), MutationOutcome::Applied);
        assert!(repo.get_note(&b).unwrap().unwrap().parents.is_empty());
    });
}

#[test]
fn same_parent_move_uses_pre_removal_positions() {
    for_each_store(|repo| {
        let p = repo.create_note("p").unwrap().id;
        let a = repo.create_note("a").unwrap().id;
        let b = repo.create_note("b").unwrap().id;
        let c = repo.create_note("c").unwrap().id;
        let abc = [a.clone(), b.clone(), c.clone()];

        repo.set_children(&p, &abc).unwrap();
        repo.move_child(&a, &p, 0, &p, 2).unwrap();
        assert_eq!(
            repo.get_note(&p).unwrap().unwrap().children,
            vec![b.clone(), a.clone(), c.clone()]
        );

        repo.set_children(&p, &abc).unwrap();
        repo.move_child(&a, &p, 0, &p, -1).unwrap();
        assert_eq!(
            repo.get_note(&p).unwrap().unwrap().children,
            vec![b.clone(), c.clone(), a.clone()]
        );

        repo.set_children(&p, &abc).unwrap();
        repo.move_child(&c, &p, 0, &p, 0).unwrap();
        assert_eq!(
            repo.get_note(&p).unwrap().unwrap().children,
            vec![c.clone(), a.clone(), b.clone()]
        );

        let missing = repo.move_child(&c, &p, 1, &p, 0).unwrap();
        assert_eq!(missing, MutationOutcome::Stale);
    });
}

#[test]
fn delete_strips_every_occurrence_and_parent_link() {
    for_each_store(|repo| {
        let p = repo.create_note("p").unwrap().id;
        let q = repo.create_note("q").unwrap().id;
        let x = repo.create_note("x").unwrap().id;
        let y = repo.create_note("y").unwrap().id;
        repo.set_children(&p, &[x.clone(), y.clone(), x.clone()]).unwrap();
        repo.set_children(&q, &[x.clone()]).unwrap();
        repo.set_children(&x, &[y.clone()]).unwrap();

        let before = repo.store_id().unwrap();
        assert_eq!(repo.delete_note(&x).unwrap(), MutationOutcome::Applied);
        assert_eq!(repo.store_id().unwrap(), before + 1);

        assert!(repo.get_note(&x).unwrap().is_none());
        assert_eq!(repo.get_note(&p).unwrap().unwrap().children, vec![y.clone()]);
        assert!(repo.get_note(&q).unwrap().unwrap().children.is_empty());
        let parents = repo.get_note(&y).unwrap().unwrap().parents;
        assert_eq!(parents.into_iter().collect::<Vec<_>>(), vec![p.clone()]);

        assert_eq!(repo.delete_note(&x).unwrap(), MutationOutcome::Stale);
        assert_eq!(repo.note_count().unwrap(), 3);
    });
}

#[test]
fn add_child_resolves_signed_positions() {
    for_each_store(|repo| {
        let p = repo.create_note("p").unwrap().id;
        let a = repo.create_note("a").unwrap().id;
        let b = repo.create_note("b").unwrap().id;
        let c = repo.create_note("c").unwrap().id;

        repo.add_child(&p, &a, -1).unwrap();
        repo.add_child(&p, &b, 0).unwrap();
        repo.add_child(&p, &c, -2).unwrap();
        repo.add_child(&p, &a, 99).unwrap();
        assert_eq!(
            repo.get_note(&p).unwrap().unwrap().children,
            vec![b.clone(), c.clone(), a.clone(), a.clone()]
        );

        repo.add_child(&p, &c, -99).unwrap();
        assert_eq!(repo.get_note(&p).unwrap().unwrap().children[0], c);
    });
}

#[test]
fn cross_parent_move_and_cycles_are_allowed() {
    for_each_store(|repo| {
        let p = repo.create_note("p").unwrap().id;
        let q = repo.create_note("q").unwrap().id;
        repo.add_child(&p, &q, -1).unwrap();
        repo.add_child(&q, &p, -1).unwrap();

        let loaded = repo.get_note(&p).unwrap().unwrap();
        assert_eq!(loaded.children, vec![q.clone()]);
        assert!(loaded.parents.contains(&q));

        assert_eq!(
            repo.move_child(&p, &q, 0, &p, 0).unwrap(),
            MutationOutcome::Applied
        );
        assert_eq!(
            repo.get_note(&p).unwrap().unwrap().children,
            vec![p.clone(), q.clone()]
        );
        assert!(repo.get_note(&q).unwrap().unwrap().children.is_empty());
    });
}

#[test]
fn sqlite_store_persists_graph_and_revision_across_connections() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("graph.db");

    let (root, child, revision) = {
        let conn = open_db(&path).unwrap();
        let mut repo = SqliteNoteRepository::try_new(&conn).unwrap();
        let root = note(&mut repo, "root");
        let child = note(&mut repo, "child");
        repo.add_child(&root, &child, -1).unwrap();
        repo.add_child(&root, &child, -1).unwrap();
        repo.set_text(&child, "renamed").unwrap();
        (root, child, repo.store_id().unwrap())
    };
    assert_eq!(revision, 5);

    let conn = open_db(&path).unwrap();
    let repo = SqliteNoteRepository::try_new(&conn).unwrap();
    assert_eq!(repo.store_id().unwrap(), revision);
    assert_eq!(children(&repo, &root), vec![child.clone(), child.clone()]);
    assert_eq!(repo.get_note(&child).unwrap().unwrap().text, "renamed");
}

#[test]
fn sqlite_clear_all_removes_notes_and_advances_revision() {
    let conn = open_db_in_memory().unwrap();
    let mut repo = SqliteNoteRepository::try_new(&conn).unwrap();
    let root = note(&mut repo, "root");
    let child = note(&mut repo, "child");
    repo.add_child(&root, &child, 0).unwrap();
    let before = repo.store_id().unwrap();

    repo.clear_all().unwrap();
    assert_eq!(repo.note_count().unwrap(), 0);
    assert_eq!(repo.store_id().unwrap(), before + 1);
    assert!(repo.get_note(&root).unwrap().is_none());
}
