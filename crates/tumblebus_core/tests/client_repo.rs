use chrono::{NaiveDate, TimeZone, Utc};
use rusqlite::{params, Connection};
use rust_decimal_macros::dec;
use std::sync::Mutex;
use tumblebus_core::{
    Child, ClientRepository, DbError, DocumentClientRepository, DocumentSchoolRepository, Parent,
    Payment, PaymentFrequency, PaymentMethod, PaymentType, RepoError, School, SchoolRepository,
    StoreConfig, StoreConnection,
};

#[test]
fn add_client_keeps_children_order_and_school_reference() {
    let store = seeded_store();
    let clients = DocumentClientRepository::new(&store);
    let schools = DocumentSchoolRepository::new(&store);

    let children = vec![
        Child::new("Jennifer", "Keys", date(1999, 4, 13), 17),
        Child::new("Mark", "Keys", date(2001, 11, 30), 15),
    ];
    let id = clients
        .add_client("Oakmont", &mary_keys(), &children, &monthly_plan())
        .unwrap();

    let client = clients.find_client_by_name("Mary", "Keys").unwrap();
    assert_eq!(client.id.as_ref(), Some(&id));
    assert_eq!(client.parent, mary_keys());
    assert_eq!(client.children, children);
    assert_eq!(client.payment_method, monthly_plan());
    assert!(client.payments.is_empty());

    let school_id = client.school.expect("client references its school");
    assert_eq!(schools.get_school_by_id(&school_id).unwrap().name, "Oakmont");
}

#[test]
fn add_client_to_unknown_school_creates_nothing() {
    let store = seeded_store();
    let clients = DocumentClientRepository::new(&store);

    let err = clients
        .add_client("Nowhere", &mary_keys(), &[], &monthly_plan())
        .unwrap_err();
    assert!(matches!(err, RepoError::SchoolNotFound(ref name) if name == "Nowhere"));
    assert!(clients.list_clients().unwrap().is_empty());
}

#[test]
fn birth_month_search_matches_any_child_in_window() {
    let store = seeded_store();
    let clients = DocumentClientRepository::new(&store);
    clients
        .add_client(
            "Oakmont",
            &mary_keys(),
            &[Child::new("Jennifer", "Keys", date(1999, 4, 13), 17)],
            &monthly_plan(),
        )
        .unwrap();
    clients
        .add_client(
            "Oakmont",
            &Parent::named("Tom", "Hardy"),
            &[
                Child::new("Ann", "Hardy", date(1998, 2, 2), 18),
                Child::new("Mark", "Hardy", date(2001, 11, 30), 15),
            ],
            &monthly_plan(),
        )
        .unwrap();

    let april = clients.find_clients_by_birth_month(date(1999, 4, 1)).unwrap();
    assert_eq!(april.len(), 1);
    assert_eq!(april[0].parent.first_name, "Mary");

    let november = clients
        .find_clients_by_birth_month(date(2001, 11, 1))
        .unwrap();
    assert_eq!(november.len(), 1);
    assert_eq!(november[0].parent.first_name, "Tom");
    assert_eq!(november[0].children.len(), 2);

    assert!(clients
        .find_clients_by_birth_month(date(1971, 1, 1))
        .unwrap()
        .is_empty());
}

#[test]
fn birth_month_window_excludes_first_day_of_next_month() {
    let store = seeded_store();
    let clients = DocumentClientRepository::new(&store);
    clients
        .add_client(
            "Oakmont",
            &mary_keys(),
            &[Child::new("Jennifer", "Keys", date(1999, 5, 1), 17)],
            &monthly_plan(),
        )
        .unwrap();

    assert!(clients
        .find_clients_by_birth_month(date(1999, 4, 1))
        .unwrap()
        .is_empty());
    assert_eq!(
        clients
            .find_clients_by_birth_month(date(1999, 5, 1))
            .unwrap()
            .len(),
        1
    );
}

#[test]
fn payments_append_in_order() {
    let store = seeded_store();
    let clients = DocumentClientRepository::new(&store);
    let id = clients
        .add_client("Oakmont", &mary_keys(), &[], &monthly_plan())
        .unwrap();

    let payments = [
        Payment::new(
            PaymentType::Cash,
            Utc.with_ymd_and_hms(2016, 5, 19, 0, 0, 0).unwrap(),
            dec!(7.50),
        ),
        Payment::new(
            PaymentType::Check,
            Utc.with_ymd_and_hms(2016, 6, 19, 0, 0, 0).unwrap(),
            dec!(100),
        ),
        Payment::new(
            PaymentType::CreditCard,
            Utc.with_ymd_and_hms(2016, 7, 19, 0, 0, 0).unwrap(),
            dec!(42.25),
        ),
    ];
    for payment in &payments {
        clients.add_payment(&id, payment).unwrap();
    }

    let client = clients.find_client_by_name("Mary", "Keys").unwrap();
    assert_eq!(client.id, Some(id));
    assert_eq!(client.payments, payments);
}

#[test]
fn money_keeps_every_digit_on_each_write_path() {
    let store = seeded_store();
    let clients = DocumentClientRepository::new(&store);

    let precise = PaymentMethod {
        unit_cost: dec!(123456789.12345679),
        ..monthly_plan()
    };
    let id = clients
        .add_client("Oakmont", &mary_keys(), &[], &precise)
        .unwrap();
    let stored = clients.find_client_by_name("Mary", "Keys").unwrap();
    assert_eq!(stored.payment_method.unit_cost, dec!(123456789.12345679));

    let replaced = PaymentMethod {
        unit_cost: dec!(98765432.987654321),
        ..monthly_plan()
    };
    clients.update_payment_method(&id, &replaced).unwrap();

    let payment = Payment::new(
        PaymentType::Cash,
        Utc.with_ymd_and_hms(2016, 5, 19, 0, 0, 0).unwrap(),
        dec!(123456789.12345679),
    );
    clients.add_payment(&id, &payment).unwrap();

    let stored = clients.find_client_by_name("Mary", "Keys").unwrap();
    assert_eq!(stored.payment_method.unit_cost, dec!(98765432.987654321));
    assert_eq!(stored.payments, vec![payment]);
    assert_eq!(
        stored.payments[0].amount.to_string(),
        "123456789.12345679"
    );
}

#[test]
fn payments_on_unknown_client_are_not_found() {
    let store = seeded_store();
    let clients = DocumentClientRepository::new(&store);
    let id = clients.create_empty_client().unwrap();

    let missing = tumblebus_core::DocumentId::generate();
    let ok = Payment::new(PaymentType::Cash, Utc::now(), dec!(10));
    assert!(clients.add_payment(&missing, &ok).unwrap_err().is_not_found());
    assert!(clients.get_client_by_id(&id).unwrap().payments.is_empty());
}

#[test]
fn empty_client_gains_parent_and_becomes_findable() {
    let store = seeded_store();
    let clients = DocumentClientRepository::new(&store);

    assert_eq!(clients.client_exists("Mary", "Keys"), None);

    let id = clients.create_empty_client().unwrap();
    let blank = clients.get_client_by_id(&id).unwrap();
    assert_eq!(blank.parent, Parent::default());
    assert!(blank.children.is_empty());
    assert_eq!(blank.school, None);

    clients.add_parent(&id, &mary_keys()).unwrap();

    assert_eq!(clients.client_exists("Mary", "Keys"), Some(id.clone()));
    assert_eq!(clients.get_client_id("Mary", "Keys").unwrap(), id);
    let found = clients.find_client_by_name("Mary", "Keys").unwrap();
    assert_eq!(found.parent, mary_keys());
    assert_eq!(found.id, Some(id));
}

#[test]
fn name_lookups_require_both_names_to_match() {
    let store = seeded_store();
    let clients = DocumentClientRepository::new(&store);
    clients
        .add_client("Oakmont", &mary_keys(), &[], &monthly_plan())
        .unwrap();

    assert_eq!(clients.client_exists("Mary", "Smith"), None);
    assert_eq!(clients.client_exists("mary", "keys"), None);
    assert!(matches!(
        clients.get_client_id("Mary", "Smith"),
        Err(RepoError::NotFound { entity: "client", .. })
    ));
    assert!(clients
        .find_client_by_name("Jane", "Keys")
        .unwrap_err()
        .is_not_found());
}

#[test]
fn add_parent_on_unknown_client_is_not_found() {
    let store = seeded_store();
    let clients = DocumentClientRepository::new(&store);

    let err = clients
        .add_parent(&tumblebus_core::DocumentId::generate(), &mary_keys())
        .unwrap_err();
    assert!(matches!(err, RepoError::NotFound { entity: "client", .. }));
}

#[test]
fn update_payment_method_replaces_every_field() {
    let store = seeded_store();
    let clients = DocumentClientRepository::new(&store);
    let id = clients
        .add_client("Oakmont", &mary_keys(), &[], &monthly_plan())
        .unwrap();

    let card = PaymentMethod {
        method: PaymentType::CreditCard,
        frequency: PaymentFrequency::Quarterly,
        unit_cost: dec!(95.00),
        start_date: Some(Utc.with_ymd_and_hms(2016, 9, 1, 0, 0, 0).unwrap()),
        end_date: Some(Utc.with_ymd_and_hms(2017, 6, 1, 0, 0, 0).unwrap()),
        cc_number: "4111111111111111".to_string(),
        expiration_date: Some(Utc.with_ymd_and_hms(2019, 1, 1, 0, 0, 0).unwrap()),
        security_code: "123".to_string(),
        cc_name: "Mary Keys".to_string(),
    };
    clients.update_payment_method(&id, &card).unwrap();

    let reloaded = clients.get_client_by_id(&id).unwrap();
    assert_eq!(reloaded.payment_method, card);
    assert_eq!(reloaded.payment_method.unit_cost, dec!(95));
    assert_eq!(reloaded.parent, mary_keys());
}

#[test]
fn clients_are_listed_per_school() {
    let store = seeded_store();
    let clients = DocumentClientRepository::new(&store);
    clients
        .add_client("Oakmont", &mary_keys(), &[], &monthly_plan())
        .unwrap();
    clients
        .add_client("Holy Family", &Parent::named("Tom", "Hardy"), &[], &monthly_plan())
        .unwrap();
    clients.create_empty_client().unwrap();

    assert_eq!(clients.list_clients().unwrap().len(), 3);

    let oakmont = clients.find_clients_by_school("Oakmont").unwrap();
    assert_eq!(oakmont.len(), 1);
    assert_eq!(oakmont[0].parent.last_name, "Keys");

    assert!(matches!(
        clients.find_clients_by_school("Nowhere"),
        Err(RepoError::SchoolNotFound(_))
    ));
}

#[test]
fn update_client_replaces_embedded_documents_but_keeps_payments() {
    let store = seeded_store();
    let clients = DocumentClientRepository::new(&store);
    let schools = DocumentSchoolRepository::new(&store);
    let id = clients
        .add_client("Oakmont", &mary_keys(), &[], &monthly_plan())
        .unwrap();
    let payment = Payment::new(
        PaymentType::Cash,
        Utc.with_ymd_and_hms(2016, 5, 19, 0, 0, 0).unwrap(),
        dec!(7.5),
    );
    clients.add_payment(&id, &payment).unwrap();

    let mut client = clients.get_client_by_id(&id).unwrap();
    client.parent.city = "Boxborough".to_string();
    client
        .children
        .push(Child::new("Jennifer", "Keys", date(1999, 4, 13), 17));
    client.school = schools.find_school_by_name("Holy Family").unwrap().id;
    client.payments.clear();
    clients.update_client(&client).unwrap();

    let reloaded = clients.get_client_by_id(&id).unwrap();
    assert_eq!(reloaded.parent.city, "Boxborough");
    assert_eq!(reloaded.children.len(), 1);
    assert_eq!(reloaded.payments, vec![payment]);
    assert_eq!(
        clients.find_clients_by_school("Holy Family").unwrap().len(),
        1
    );
    assert!(clients.find_clients_by_school("Oakmont").unwrap().is_empty());
}

#[test]
fn delete_client_by_parent_name() {
    let store = seeded_store();
    let clients = DocumentClientRepository::new(&store);
    clients
        .add_client("Oakmont", &mary_keys(), &[], &monthly_plan())
        .unwrap();
    clients
        .add_client("Oakmont", &Parent::named("Tom", "Hardy"), &[], &monthly_plan())
        .unwrap();

    let unsaved = tumblebus_core::Client {
        parent: mary_keys(),
        ..tumblebus_core::Client::default()
    };
    clients.delete_client(&unsaved).unwrap();

    let remaining = clients.list_clients().unwrap();
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].parent.first_name, "Tom");
    assert!(clients.delete_client(&unsaved).unwrap_err().is_not_found());
}

#[test]
fn deleting_a_school_leaves_client_reference_dangling() {
    let store = seeded_store();
    let clients = DocumentClientRepository::new(&store);
    let schools = DocumentSchoolRepository::new(&store);
    let id = clients
        .add_client("Oakmont", &mary_keys(), &[], &monthly_plan())
        .unwrap();

    schools.delete_school(&School::named("Oakmont")).unwrap();

    let client = clients.get_client_by_id(&id).unwrap();
    let school_id = client.school.expect("reference is kept");
    assert!(schools.get_school_by_id(&school_id).unwrap_err().is_not_found());
    assert!(matches!(
        clients.find_clients_by_school("Oakmont"),
        Err(RepoError::SchoolNotFound(_))
    ));
}

#[test]
fn birth_month_window_from_month_end_rolls_into_following_month() {
    let store = seeded_store();
    let clients = DocumentClientRepository::new(&store);
    clients
        .add_client(
            "Oakmont",
            &mary_keys(),
            &[Child::new("Jennifer", "Keys", date(2001, 2, 28), 15)],
            &monthly_plan(),
        )
        .unwrap();
    clients
        .add_client(
            "Oakmont",
            &Parent::named("Tom", "Hardy"),
            &[Child::new("Mark", "Hardy", date(2001, 3, 3), 15)],
            &monthly_plan(),
        )
        .unwrap();

    let window = clients
        .find_clients_by_birth_month(date(2001, 1, 31))
        .unwrap();
    assert_eq!(window.len(), 1);
    assert_eq!(window[0].parent.first_name, "Mary");
}

#[test]
fn lookup_failures_are_narrowed_by_exists_but_surfaced_by_get_id() {
    let dir = tempfile::tempdir().unwrap();
    let config = StoreConfig::in_dir(dir.path());
    StoreConnection::open(&config).unwrap().close();

    let conn = Connection::open(config.database_path().unwrap()).unwrap();
    conn.execute(
        "INSERT INTO documents (collection, doc_id, body) VALUES (?1, ?2, json(?3));",
        params![
            "clients",
            "zz",
            r#"{"parent":{"firstname":"Mary","lastname":"Keys"}}"#
        ],
    )
    .unwrap();
    drop(conn);

    let store = StoreConnection::open(&config).unwrap();
    let clients = DocumentClientRepository::new(&store);

    assert_eq!(clients.client_exists("Mary", "Keys"), None);
    let err = clients.get_client_id("Mary", "Keys").unwrap_err();
    assert!(matches!(
        err,
        RepoError::Store(DbError::CorruptDocument(_))
    ));
    assert!(!err.is_not_found());
}

// Check-then-create through the repository is not atomic. Racing callers
// may each create a client; the service layer serializes this path.
#[test]
fn raw_check_then_create_is_not_serialized() {
    let store = seeded_store();
    let clients = DocumentClientRepository::new(&store);
    let created = Mutex::new(Vec::new());

    std::thread::scope(|scope| {
        for _ in 0..8 {
            scope.spawn(|| {
                let id = match clients.client_exists("Mary", "Keys") {
                    Some(id) => id,
                    None => {
                        let id = clients.create_empty_client().unwrap();
                        clients.add_parent(&id, &mary_keys()).unwrap();
                        id
                    }
                };
                created.lock().unwrap().push(id);
            });
        }
    });

    let ids = created.into_inner().unwrap();
    assert_eq!(ids.len(), 8);
    let stored = clients.list_clients().unwrap();
    assert!(!stored.is_empty());
    assert!(stored.len() <= 8);
    assert!(stored.iter().all(|client| client.parent == mary_keys()));
}

fn seeded_store() -> StoreConnection {
    let store = StoreConnection::open(&StoreConfig::in_memory()).unwrap();
    let schools = DocumentSchoolRepository::new(&store);
    schools.add_school(&School::named("Oakmont")).unwrap();
    schools.add_school(&School::named("Holy Family")).unwrap();
    store
}

fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).unwrap()
}

fn mary_keys() -> Parent {
    Parent {
        address: "14 Stonehedge Rd".to_string(),
        city: "Acton".to_string(),
        state: "MA".to_string(),
        zip_code: "01732".to_string(),
        home_phone: "978-555-0100".to_string(),
        mobile_phone: "978-555-0199".to_string(),
        email_address: "mkeys@someemail.com".to_string(),
        ..Parent::named("Mary", "Keys")
    }
}

fn monthly_plan() -> PaymentMethod {
    PaymentMethod {
        method: PaymentType::Check,
        frequency: PaymentFrequency::Monthly,
        unit_cost: dec!(55.00),
        start_date: Some(Utc.with_ymd_and_hms(2016, 9, 1, 0, 0, 0).unwrap()),
        end_date: Some(Utc.with_ymd_and_hms(2017, 6, 1, 0, 0, 0).unwrap()),
        ..PaymentMethod::default()
    }
}
