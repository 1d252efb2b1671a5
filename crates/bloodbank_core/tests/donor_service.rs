use bloodbank_core::db::open_db_in_memory;
use bloodbank_core::{
    Donor, DonorRepository, DonorService, DonorServiceError, SqliteDonorRepository,
};
use rusqlite::Connection;
use serde_json::{json, Value};
use uuid::Uuid;

fn service(conn: &Connection) -> DonorService<SqliteDonorRepository<'_>> {
    DonorService::new(SqliteDonorRepository::try_new(conn).unwrap())
}

fn create(service: &DonorService<SqliteDonorRepository<'_>>, payload: Value) -> Donor {
    service.create_donor(Some(&payload)).unwrap()
}

fn donor_count(conn: &Connection) -> i64 {
    conn.query_row("SELECT COUNT(*) FROM donors;", [], |row| row.get(0))
        .unwrap()
}

#[test]
fn create_normalizes_names_and_persists() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn);

    let donor = create(
        &service,
        json!({"cedula": "V-1001", "nombre": "MARIA", "apellido": "lOPEZ"}),
    );
    assert_eq!(donor.given_name, "Maria");
    assert_eq!(donor.family_name, "Lopez");

    let loaded = service.get_donor(donor.id).unwrap();
    assert_eq!(loaded, donor);
}

#[test]
fn created_donor_serializes_to_four_keys() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn);

    let donor = create(
        &service,
        json!({"cedula": "123", "nombre": "ana", "apellido": "ruiz"}),
    );
    assert_eq!(
        serde_json::to_value(donor.record()).unwrap(),
        json!({
            "cedula": "123",
            "nombre": "Ana",
            "apellido": "Ruiz",
            "nombre_completo": "Ana Ruiz"
        })
    );
}

#[test]
fn long_cedula_is_rejected_without_writing() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn);

    let err = service
        .create_donor(Some(&json!({
            "cedula": "123456789012345",
            "nombre": "ana",
            "apellido": "ruiz"
        })))
        .unwrap_err();
    assert!(matches!(err, DonorServiceError::InvalidFieldValues(_)));
    assert_eq!(donor_count(&conn), 0);
}

#[test]
fn missing_key_is_reported_before_persistence() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn);

    let err = service
        .create_donor(Some(&json!({"cedula": "1", "nombre": "ana"})))
        .unwrap_err();
    match err {
        DonorServiceError::MissingFields(fields) => assert_eq!(fields, vec!["apellido"]),
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(donor_count(&conn), 0);
}

#[test]
fn empty_value_is_an_invalid_value() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn);

    let err = service
        .create_donor(Some(&json!({"cedula": "1", "nombre": "", "apellido": "ruiz"})))
        .unwrap_err();
    assert!(matches!(err, DonorServiceError::InvalidFieldValues(_)));
}

#[test]
fn duplicate_cedula_is_a_persistence_failure_and_keeps_one_row() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn);

    create(
        &service,
        json!({"cedula": "555", "nombre": "ana", "apellido": "ruiz"}),
    );
    let err = service
        .create_donor(Some(&json!({"cedula": "555", "nombre": "eva", "apellido": "diaz"})))
        .unwrap_err();
    match err {
        DonorServiceError::Persistence(message) => assert!(message.contains("UNIQUE")),
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(donor_count(&conn), 1);
}

#[test]
fn over_long_name_surfaces_store_message() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn);

    let err = service
        .create_donor(Some(&json!({
            "cedula": "9",
            "nombre": "a".repeat(81),
            "apellido": "ruiz"
        })))
        .unwrap_err();
    assert!(matches!(err, DonorServiceError::Persistence(_)));
    assert_eq!(donor_count(&conn), 0);
}

#[test]
fn name_filter_is_case_insensitive_substring() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn);

    create(&service, json!({"cedula": "1", "nombre": "maria", "apellido": "lopez"}));
    create(&service, json!({"cedula": "2", "nombre": "carlos", "apellido": "marin"}));
    create(&service, json!({"cedula": "3", "nombre": "juan", "apellido": "perez"}));

    let names: Vec<String> = service
        .list_donors(Some("MAR"))
        .unwrap()
        .iter()
        .map(Donor::full_name)
        .collect();
    assert_eq!(names.len(), 2);
    assert!(names.contains(&"Maria Lopez".to_string()));
    assert!(names.contains(&"Carlos Marin".to_string()));

    assert_eq!(service.list_donors(None).unwrap().len(), 3);
    assert!(service.list_donors(Some("zzz")).unwrap().is_empty());
}

#[test]
fn unknown_id_and_deleted_donor_are_not_found() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn);

    assert!(matches!(
        service.get_donor(Uuid::new_v4()),
        Err(DonorServiceError::NotFound(_))
    ));

    let donor = create(&service, json!({"cedula": "7", "nombre": "ana", "apellido": "ruiz"}));
    service.delete_donor(donor.id).unwrap();

    assert!(matches!(
        service.get_donor(donor.id),
        Err(DonorServiceError::NotFound(id)) if id == donor.id
    ));
    assert!(matches!(
        service.delete_donor(donor.id),
        Err(DonorServiceError::NotFound(_))
    ));
    assert!(matches!(
        service.update_donor(donor.id, Some(&json!({"nombre": "eva"}))),
        Err(DonorServiceError::NotFound(_))
    ));
}

#[test]
fn patch_with_unknown_key_changes_nothing() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn);

    let donor = create(&service, json!({"cedula": "8", "nombre": "ana", "apellido": "ruiz"}));
    let patched = service
        .update_donor(donor.id, Some(&json!({"edad": 30, "cedula": "999"})))
        .unwrap();
    assert_eq!(patched, donor);
    assert_eq!(service.get_donor(donor.id).unwrap(), donor);
}

#[test]
fn patch_updates_allowed_names_only() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn);

    let donor = create(&service, json!({"cedula": "10", "nombre": "ana", "apellido": "ruiz"}));
    let patched = service
        .update_donor(donor.id, Some(&json!({"apellido": "Diaz"})))
        .unwrap();
    assert_eq!(patched.given_name, "Ana");
    assert_eq!(patched.family_name, "Diaz");
    assert_eq!(patched.cedula, "10");
    assert_eq!(service.get_donor(donor.id).unwrap(), patched);
}

#[test]
fn patch_with_mistyped_value_is_rejected_before_write() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn);

    let donor = create(&service, json!({"cedula": "11", "nombre": "ana", "apellido": "ruiz"}));
    let err = service
        .update_donor(donor.id, Some(&json!({"nombre": 5, "apellido": "Diaz"})))
        .unwrap_err();
    assert!(matches!(err, DonorServiceError::InvalidFieldValues(_)));
    assert_eq!(service.get_donor(donor.id).unwrap(), donor);

    assert!(matches!(
        service.update_donor(donor.id, None),
        Err(DonorServiceError::MalformedRequest)
    ));
}

#[test]
fn import_and_export_go_through_donor_file() {
    let dir = tempfile::tempdir().unwrap();
    let source = dir.path().join("donante.json");
    std::fs::write(
        &source,
        r#"[{"cedula":"1","nombre":"MARIA","apellido":"lopez"},
            {"cedula":"2","nombre":"carlos","apellido":"marin","nombre_completo":"x"}]"#,
    )
    .unwrap();

    let conn = open_db_in_memory().unwrap();
    let service = service(&conn);
    assert_eq!(service.import_from_file(&source).unwrap(), 2);
    assert_eq!(donor_count(&conn), 2);

    let target = dir.path().join("export.json");
    assert_eq!(service.export_to_file(&target).unwrap(), 2);
    let exported: Value = serde_json::from_str(&std::fs::read_to_string(&target).unwrap()).unwrap();
    assert_eq!(exported[0]["nombre_completo"], "Maria Lopez");
    assert_eq!(exported[1]["cedula"], "2");
}

#[test]
fn import_with_duplicate_cedula_inserts_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let source = dir.path().join("donante.json");
    std::fs::write(
        &source,
        r#"[{"cedula":"1","nombre":"ana","apellido":"ruiz"},
            {"cedula":"1","nombre":"eva","apellido":"diaz"}]"#,
    )
    .unwrap();

    let conn = open_db_in_memory().unwrap();
    let service = service(&conn);
    assert!(matches!(
        service.import_from_file(&source),
        Err(DonorServiceError::Persistence(_))
    ));
    assert_eq!(donor_count(&conn), 0);
}

#[test]
fn repository_rejects_unmigrated_connection() {
    let conn = Connection::open_in_memory().unwrap();
    assert!(SqliteDonorRepository::try_new(&conn).is_err());

    let migrated = open_db_in_memory().unwrap();
    let repo = SqliteDonorRepository::try_new(&migrated).unwrap();
    assert!(repo.list_donors().unwrap().is_empty());
}
