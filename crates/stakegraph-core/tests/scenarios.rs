//! End-to-end graph scenarios through the coordinator and the query layer.

use stakegraph_core::db::query::{FilterCriteria, Pagination};
use stakegraph_core::db::{self, query};
use stakegraph_core::error::{ErrorCode, WriteError};
use stakegraph_core::model::{NewRelation, Stakeholder, StakeholderDraft, StakeholderFields};
use stakegraph_core::service::{CreateRequest, DeleteRequest, StakeholderService};
use stakegraph_core::session::Session;
use tempfile::TempDir;

fn session() -> Session {
    Session::from_connection(db::open_in_memory().expect("open in-memory store"))
}

fn org(id: &str, name: &str) -> CreateRequest {
    CreateRequest {
        stakeholder: StakeholderDraft {
            id: Some(id.to_string()),
            fields: StakeholderFields {
                org_name: Some(name.to_string()),
                ..StakeholderFields::default()
            },
        },
        ..CreateRequest::default()
    }
}

fn ids(records: &[Stakeholder]) -> Vec<&str> {
    records.iter().map(|s| s.id.as_str()).collect()
}

/// Acme (1) is the parent of Zenith (2) through a `partner`/`org` edge.
fn acme_and_zenith(session: &Session) {
    let service = StakeholderService::new(session);
    service
        .create_with_relation(None, &org("1", "Acme"))
        .expect("create acme");

    let mut zenith = org("2", "Zenith");
    zenith.role = "partner".to_string();
    zenith.relation_type = "org".to_string();
    service
        .create_with_relation(Some("1"), &zenith)
        .expect("create zenith under acme");
}

#[test]
fn roots_children_and_parents_of_a_two_node_graph() {
    let session = session();
    acme_and_zenith(&session);
    let conn = session.connection();

    let roots = query::list_roots(conn, Pagination::UNBOUNDED).expect("roots");
    assert_eq!(ids(&roots.records), vec!["1"]);

    let children = query::get_children(conn, "1").expect("children");
    assert_eq!(ids(&children), vec!["2"]);
    assert_eq!(children[0].org_name.as_deref(), Some("Zenith"));

    let parents = query::get_parents(conn, "2").expect("parents");
    assert_eq!(ids(&parents), vec!["1"]);
}

#[test]
fn search_finds_zenith_only() {
    let session = session();
    acme_and_zenith(&session);

    let criteria = FilterCriteria {
        search: Some("zen".to_string()),
        ..FilterCriteria::default()
    };
    let page = query::filter(session.connection(), &criteria, Pagination::UNBOUNDED)
        .expect("filter");
    assert_eq!(ids(&page.records), vec!["2"]);
    assert_eq!(page.total_count, 1);
}

#[test]
fn typed_delete_of_parent_promotes_child_to_root() {
    let session = session();
    acme_and_zenith(&session);
    let conn = session.connection();
    let before = query::list_roots(conn, Pagination::UNBOUNDED).expect("roots before");

    let service = StakeholderService::new(&session);
    service
        .delete_with_relation(Some("1"), &DeleteRequest::new("1", Some("org".to_string())))
        .expect("delete acme");

    assert!(query::get_stakeholder(conn, "1").expect("lookup").is_none());
    assert!(query::list_edges(conn, "2").expect("edges").is_empty());

    let after = query::list_roots(conn, Pagination::UNBOUNDED).expect("roots after");
    assert_eq!(ids(&after.records), vec!["2"]);
    assert_eq!(after.total_count, before.total_count - 1);
}

#[test]
fn failed_edge_insert_rolls_back_the_stakeholder() {
    let session = session();
    let service = StakeholderService::new(&session);

    let err = service
        .create_with_relation(Some("missing-parent"), &org("orphan", "Orphan"))
        .expect_err("parent does not exist");
    assert_eq!(err.code(), ErrorCode::TransactionFailed);
    assert!(!matches!(err, WriteError::RollbackFailed { .. }));

    assert!(
        query::get_stakeholder(session.connection(), "orphan")
            .expect("lookup")
            .is_none()
    );
    assert!(!session.is_transaction_in_progress());
}

#[test]
fn isolated_stakeholder_has_empty_neighbourhood() {
    let session = session();
    acme_and_zenith(&session);
    StakeholderService::new(&session)
        .create_with_relation(None, &org("3", "Solo"))
        .expect("create solo");
    let conn = session.connection();

    assert!(query::get_parents(conn, "3").expect("parents").is_empty());
    assert!(query::get_children(conn, "3").expect("children").is_empty());
    assert!(query::get_related_ids(conn, "3").expect("related").is_empty());
    assert_eq!(
        ids(&query::get_relations(conn, "3").expect("relations").records),
        vec!["3"]
    );
}

#[test]
fn duplicate_edges_do_not_duplicate_related_ids() {
    let session = session();
    acme_and_zenith(&session);
    let service = StakeholderService::new(&session);
    service
        .link(&NewRelation::new("1", "2"))
        .expect("duplicate edge");
    service
        .link(&NewRelation::new("2", "1"))
        .expect("reverse edge");

    let related = query::get_related_ids(session.connection(), "1").expect("related");
    assert_eq!(related, vec!["1", "2"]);
    assert_eq!(
        query::get_children_ids(session.connection(), "1").expect("children"),
        vec!["2"]
    );
}

#[test]
fn on_disk_store_survives_reopen() {
    let dir = TempDir::new().expect("temp dir");
    let path = dir.path().join("graph.db");

    {
        let session = Session::from_connection(db::open_store(&path).expect("open"));
        acme_and_zenith(&session);
        session.close().expect("close");
    }

    let conn = db::open_store(&path).expect("reopen");
    let tree = query::get_tree_by_id(&conn, "2")
        .expect("tree")
        .expect("zenith exists");
    assert_eq!(ids(&tree.parents), vec!["1"]);
    assert!(tree.children.is_empty());
}
