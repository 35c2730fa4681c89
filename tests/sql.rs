use roombook_schema::adminapi;
use roombook_schema::db::{render, RenderedTransition};

mod common;

fn rendered(number: u32) -> RenderedTransition {
    let _ = common::setup_logging();

    render(&adminapi::graph().unwrap(), adminapi::APP_LABEL)
        .unwrap()
        .into_iter()
        .find(|t| t.version == number)
        .unwrap()
}

#[test]
fn resource_details_owns_its_resource() {
    let sql = rendered(3).sql;

    assert!(sql.contains("resources_details"));
    assert!(sql.contains(
        "\"resource_id\" INTEGER PRIMARY KEY REFERENCES \"resources\" (\"resource_id\") ON DELETE CASCADE"
    ));
}

#[test]
fn rents_reference_with_cascade_and_unique_triple() {
    let sql = rendered(3).sql;

    assert!(sql.contains(
        "\"payment_id\" INTEGER NOT NULL REFERENCES \"adminapi_payment\" (\"payment_id\") ON DELETE CASCADE"
    ));
    assert!(sql.contains(
        "\"user_id\" INTEGER NOT NULL REFERENCES \"adminapi_userroombooking\" (\"user_id\") ON DELETE CASCADE"
    ));
    assert!(sql.contains(
        "CONSTRAINT \"rents_resource_id_payment_id_user_id_uniq\" UNIQUE (\"resource_id\", \"payment_id\", \"user_id\")"
    ));
}

#[test]
fn room_policy_user_is_set_null() {
    let sql = rendered(3).sql;

    assert!(sql.contains("room_policy"));
    assert!(sql.contains(
        "\"room_id\" INTEGER NOT NULL REFERENCES \"adminapi_room\" (\"room_id\") ON DELETE CASCADE"
    ));
    assert!(sql.contains(
        "\"user_id\" INTEGER REFERENCES \"adminapi_userroombooking\" (\"user_id\") ON DELETE SET NULL"
    ));
}

#[test]
fn rename_keeps_the_resources_table() {
    let sql = rendered(3).sql;

    assert!(!sql.contains("RENAME"));
    assert!(sql.contains("adminapi_book"));
    assert!(sql.contains("adminapi_hardware"));
}

#[test]
fn user_role_has_a_default() {
    let sql = rendered(2).sql;

    assert!(sql.contains(
        "ALTER TABLE \"adminapi_userroombooking\" ADD COLUMN \"user_role\" VARCHAR(20) NOT NULL DEFAULT 'user'"
    ));
}
