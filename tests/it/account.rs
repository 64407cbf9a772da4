use filemail_client::api::{ApiResponse, Operation};
use filemail_client::config::{ConfigValue, API_KEY_PLACEHOLDER};
use filemail_client::contact::Contact;
use filemail_client::transfer::{Owner, Transfer};
use filemail_client::{Error, User, UserOptions};
use serde_json::json;

use crate::helpers::{Env, LogCapture, SpyTransport};

fn bob() -> Contact {
    serde_json::from_value(json!({"contactid": "c2", "name": "Bob", "email": "bob@example.com"}))
        .unwrap()
}

#[test]
fn guarded_operations_fail_without_network_calls() {
    let env = Env::new();
    let spy = SpyTransport::new();
    let mut user = env.anonymous(&spy);
    assert!(user.is_anonymous());

    let results = vec![
        user.get_sent(false, false).map(|_| ()),
        user.get_received_files(None, true).map(|_| ()),
        user.get_contacts().map(|_| ()),
        user.get_contact("bob@example.com").map(|_| ()),
        user.update_contact(&bob()),
        user.add_contact("Bob", "bob@example.com").map(|_| ()),
        user.delete_contact(&bob()),
        user.get_user_info(true).map(|_| ()),
        user.update_user_info([("name", "Alice")]),
        user.logout(),
    ];
    for result in results {
        assert!(result.unwrap_err().is_auth_required());
    }
    assert_eq!(spy.call_count(), 0);
    // the guard runs before the config is touched
    assert_eq!(user.config().get("name"), None);
}

#[test]
fn login_at_open_sends_credentials() {
    let env = Env::new();
    let spy = SpyTransport::new();
    let user = env.logged_in(&spy);

    assert!(user.logged_in());
    assert_eq!(user.session().logintoken(), Some("TOKEN"));
    let calls = spy.calls();
    assert_eq!(calls.len(), 1);
    let (op, params) = &calls[0];
    assert_eq!(*op, Operation::Login);
    assert_eq!(params.get("apikey"), Some("KEY"));
    assert_eq!(params.get("username"), Some("alice"));
    assert_eq!(params.get("password"), Some("secret"));
}

#[test]
fn rejected_login_surfaces_remote_code() {
    let env = Env::new();
    let spy = SpyTransport::new();
    let mut user = env.anonymous(&spy);
    spy.respond(ApiResponse::new(
        403,
        json!({"errorcode": 1001, "errormessage": "bad credentials"}),
    ));

    let err = user.login("wrong").unwrap_err();
    assert_eq!(err.remote_code(), Some(1001));
    assert!(!user.logged_in());
}

#[test]
fn logout_refused_while_transfer_incomplete() {
    let env = Env::new();
    let spy = SpyTransport::new();
    let mut user = env.logged_in(&spy);
    user.new_transfer();

    let err = user.logout().unwrap_err();
    assert_eq!(err.remote_code(), Some(4003));
    assert!(user.logged_in());
    assert_eq!(spy.operations(), vec![Operation::Login]);

    user.transfers_mut()[0].mark_complete();
    spy.respond_ok(json!({}));
    user.logout().unwrap();
    assert!(user.is_anonymous());
    assert_eq!(spy.operations(), vec![Operation::Login, Operation::Logout]);
}

#[test]
fn tracked_transfer_blocks_logout() {
    let env = Env::new();
    let spy = SpyTransport::new();
    let mut user = env.logged_in(&spy);
    let info = json!({"transferid": "t9", "from": "bob"});
    user.track_transfer(Transfer::restore(
        Owner::Remote("bob".into()),
        info.as_object().cloned().unwrap(),
    ));

    assert_eq!(user.transfers().len(), 1);
    assert!(user.transfers()[0].is_restored());
    assert_eq!(user.logout().unwrap_err().remote_code(), Some(4003));
    assert!(user.logged_in());
    assert_eq!(spy.operations(), vec![Operation::Login]);
}

#[test]
fn new_transfer_is_owned_by_user() {
    let env = Env::new();
    let spy = SpyTransport::new();
    let mut user = env.anonymous(&spy);
    let owned = user.new_transfer().owner().clone();
    assert!(owned.is_user(&user));
}

#[test]
fn contacts_are_listed_and_searched_locally() {
    let env = Env::new();
    let spy = SpyTransport::new();
    let user = env.logged_in(&spy);
    let listing = json!({"contacts": [
        {"contactid": "c1", "name": "Carol", "email": "carol@example.com"},
        {"contactid": "c2", "name": "Bob", "email": "bob@example.com"}
    ]});
    spy.respond_ok(listing.clone()).respond_ok(listing);

    let contacts = user.get_contacts().unwrap();
    assert_eq!(contacts.len(), 2);
    assert_eq!(user.get_contact("bob@example.com").unwrap(), bob());

    let (op, params) = &spy.calls()[2];
    assert_eq!(*op, Operation::ContactsGet);
    assert_eq!(params.get("logintoken"), Some("TOKEN"));
}

#[test]
fn contact_with_null_name_is_listed() {
    let env = Env::new();
    let spy = SpyTransport::new();
    let user = env.logged_in(&spy);
    spy.respond_ok(json!({"contacts": [
        {"contactid": 3, "name": null, "email": "carol@example.com"}
    ]}));

    let carol = user.get_contact("carol@example.com").unwrap();
    assert_eq!(carol.contactid, "3");
    assert_eq!(carol.name, "");
}

#[test]
fn missing_contact_is_not_found() {
    let env = Env::new();
    let spy = SpyTransport::new();
    let user = env.logged_in(&spy);
    spy.respond_ok(json!({"contacts": []}));

    let err = user.get_contact("nobody@example.com").unwrap_err();
    assert!(err.is_not_found());
    assert_eq!(err.remote_code(), None);
}

#[test]
fn contact_listing_error_propagates() {
    let env = Env::new();
    let spy = SpyTransport::new();
    let user = env.logged_in(&spy);
    spy.respond(ApiResponse::new(
        500,
        json!({"errorcode": 5000, "errormessage": "down"}),
    ));

    let err = user.get_contact("bob@example.com").unwrap_err();
    assert_eq!(err.remote_code(), Some(5000));
}

#[test]
fn add_update_delete_contact() {
    let env = Env::new();
    let spy = SpyTransport::new();
    let user = env.logged_in(&spy);
    spy.respond_ok(json!({"contact": {"contactid": "c2", "name": "Bob", "email": "bob@example.com"}}))
        .respond_ok(json!({}))
        .respond_ok(json!({}));

    let contact = user.add_contact("Bob", "bob@example.com").unwrap();
    assert_eq!(contact, bob());
    user.update_contact(&contact).unwrap();
    user.delete_contact(&contact).unwrap();

    let calls = spy.calls();
    assert_eq!(calls[1].0, Operation::ContactsAdd);
    assert_eq!(calls[1].1.get("email"), Some("bob@example.com"));
    assert_eq!(calls[2].0, Operation::ContactsUpdate);
    assert_eq!(calls[2].1.get("contactid"), Some("c2"));
    assert_eq!(calls[3].0, Operation::ContactsDelete);
    assert_eq!(calls[3].1.get("contactid"), Some("c2"));
    assert!(!calls[3].1.contains("email"));
}

#[test]
fn add_contact_without_contact_field_is_malformed() {
    let env = Env::new();
    let spy = SpyTransport::new();
    let user = env.logged_in(&spy);
    spy.respond_ok(json!({"ok": true}));

    let err = user.add_contact("Bob", "bob@example.com").unwrap_err();
    assert!(matches!(err, Error::MalformedResponse { .. }));
}

#[test]
fn user_info_merges_into_config() {
    let env = Env::new();
    let spy = SpyTransport::new();
    let mut user = env.logged_in(&spy);
    let info = json!({"user": {
        "username": "someone-else",
        "email": "alice@example.com",
        "maxdays": 7,
        "userid": 99
    }});
    spy.respond_ok(info.clone()).respond_ok(info);

    let fetched = user.get_user_info(false).unwrap();
    assert_eq!(fetched["userid"], 99);
    assert_eq!(user.config().get("email"), None);

    user.get_user_info(true).unwrap();
    assert_eq!(
        user.config().get("email"),
        Some(&ConfigValue::from("alice@example.com"))
    );
    assert_eq!(user.config().get("maxdays"), Some(&ConfigValue::Int(7)));
    assert_eq!(user.config().username(), "alice");
}

#[test]
fn update_user_info_sends_merged_settings() {
    let env = Env::new();
    let spy = SpyTransport::new();
    let mut user = env.logged_in(&spy);
    spy.respond_ok(json!({}));

    user.update_user_info([("name", "Alice"), ("signature", "-- A")])
        .unwrap();

    let (op, params) = &spy.calls()[1];
    assert_eq!(*op, Operation::UserUpdate);
    assert_eq!(params.get("name"), Some("Alice"));
    assert_eq!(params.get("signature"), Some("-- A"));
    assert_eq!(params.get("apikey"), Some("KEY"));
    assert_eq!(params.get("logintoken"), Some("TOKEN"));
    assert!(!params.contains("password"));
}

#[test]
fn update_user_info_rejects_unknown_keys_before_calling() {
    let env = Env::new();
    let spy = SpyTransport::new();
    let mut user = env.logged_in(&spy);

    let err = user.update_user_info([("favourite", "blue")]).unwrap_err();
    assert!(err.is_schema());
    assert_eq!(spy.call_count(), 1);
}

#[test]
fn received_age_is_validated_and_sent() {
    let env = Env::new();
    let spy = SpyTransport::new();
    let user = env.logged_in(&spy);

    let err = user.get_received_files(Some(91), true).unwrap_err();
    assert!(matches!(err, Error::InvalidArgument { .. }));
    assert_eq!(spy.call_count(), 1);

    spy.respond_ok(json!({"transfers": []}));
    let transfers = user.get_received_files(Some(7), true).unwrap();
    assert!(transfers.is_empty());

    let (op, params) = &spy.calls()[1];
    assert_eq!(*op, Operation::ReceivedGet);
    assert_eq!(params.get("getForAllUsers"), Some("true"));
    let from: i64 = params.get("from").unwrap().parse().unwrap();
    let expected = chrono::Utc::now().timestamp() - 7 * 24 * 60 * 60;
    assert!((from - expected).abs() < 60);
}

#[test]
fn first_open_uses_placeholder_key() {
    let env = Env::new();
    let spy = SpyTransport::new();
    let options = UserOptions {
        apikey: None,
        ..env.options()
    };
    let logs = LogCapture::new();
    let user = logs.run(|| User::open("alice", spy.clone(), options)).unwrap();

    assert_eq!(user.session().apikey(), API_KEY_PLACEHOLDER);
    assert!(env.dir.path().join("filemail.json").is_file());
    let output = logs.output();
    assert!(output.contains("WARN"), "{output}");
    assert!(output.contains("No API KEY set in config"), "{output}");
}

#[test]
fn real_key_opens_without_warning() {
    let env = Env::new();
    let spy = SpyTransport::new();
    let logs = LogCapture::new();
    logs.run(|| env.anonymous(&spy));
    assert!(!logs.output().contains("No API KEY"), "{}", logs.output());
}

#[test]
fn saved_config_is_picked_up_on_next_open() {
    let env = Env::new();
    let spy = SpyTransport::new();
    let mut user = env.anonymous(&spy);
    user.config_mut().set("name", "Alice").unwrap();
    user.save_config().unwrap();

    let options = UserOptions {
        apikey: None,
        ..env.options()
    };
    let reopened = User::open("alice", spy.clone(), options).unwrap();
    assert_eq!(reopened.session().apikey(), "KEY");
    assert_eq!(reopened.config().get("name"), Some(&ConfigValue::from("Alice")));
}
