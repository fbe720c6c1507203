use std::sync::{Arc, Mutex};
use std::time::Duration;

use eds_client::{
    Attachment, Error, MailServiceError, Mailer, Message, RawResponse, RequestOptions,
    ValidationError,
};
use httpmock::prelude::*;
use reqwest::header::{HeaderName, HeaderValue};
use serde_json::json;

const APP_KEY: &str = "fooKey";
const MESSAGES_PATH: &str = "/api/v1/fooKey/messages";

fn mailer(server: &MockServer) -> Mailer {
    Mailer::new(server.base_url(), APP_KEY).unwrap()
}

fn message() -> Message {
    Message::compose(
        "Foo",
        ("someone@example.com", Some("John")),
        ("internal@example.com", Some("Mike")),
    )
    .unwrap()
}

fn service_error(err: Error) -> MailServiceError {
    match err {
        Error::MailService(err) => err,
        other => panic!("expected a mail service error, got {other:?}"),
    }
}

#[test]
fn send_returns_message_id_on_accept() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(POST)
            .path(MESSAGES_PATH)
            .header("content-type", "application/json")
            .header("accept", "application/json")
            .json_body(json!({
                "subject": "Foo",
                "to": { "address": "someone@example.com", "name": "John" },
                "from": { "address": "internal@example.com", "name": "Mike" },
                "exposeRecipients": true,
            }));
        then.status(200)
            .json_body(json!({ "status": "ACCEPTED", "messageId": "abc" }));
    });

    let id = mailer(&server)
        .send(&message(), &RequestOptions::default())
        .unwrap();

    mock.assert();
    assert_eq!(id, "abc");
}

#[test]
fn send_carries_attachments_and_recipients() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("file.png");
    std::fs::write(&path, [0x89, 0x50, 0x4E, 0x47]).unwrap();

    let mut message = message();
    message
        .add_cc([("joe@example.com", "Joe")])
        .add_bcc([("mary@example.com", "Mary")])
        .add_meta([("campaign", "spring")])
        .set_body("Hello")
        .add_attachment(&Attachment::new(&path, None).unwrap());

    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(POST).path(MESSAGES_PATH).json_body(json!({
            "subject": "Foo",
            "to": { "address": "someone@example.com", "name": "John" },
            "from": { "address": "internal@example.com", "name": "Mike" },
            "meta": [{ "name": "campaign", "value": "spring" }],
            "attachments": [{
                "attachmentName": "file.png",
                "content": "data:image/png;base64,iVBORw==",
                "contentType": "image/png",
            }],
            "ccs": [{ "address": "joe@example.com", "name": "Joe" }],
            "bccs": [{ "address": "mary@example.com", "name": "Mary" }],
            "body": "Hello",
            "exposeRecipients": true,
        }));
        then.status(200)
            .json_body(json!({ "status": "ACCEPTED", "messageId": "with-files" }));
    });

    let id = mailer(&server)
        .send(&message, &RequestOptions::default())
        .unwrap();

    mock.assert();
    assert_eq!(id, "with-files");
}

#[test]
fn send_reports_rejection_reason() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST).path(MESSAGES_PATH);
        then.status(200)
            .json_body(json!({ "status": "REJECTED", "rejectionReason": "spam" }));
    });

    let err = mailer(&server)
        .send(&message(), &RequestOptions::default())
        .unwrap_err();

    assert!(err.to_string().contains("spam"));
    assert_eq!(
        service_error(err),
        MailServiceError::Rejected("spam".to_string())
    );
}

#[test]
fn send_reports_unknown_application_key() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST).path(MESSAGES_PATH);
        then.status(404).body("Not Found");
    });

    let err = mailer(&server)
        .send(&message(), &RequestOptions::default())
        .unwrap_err();

    assert_eq!(service_error(err), MailServiceError::NotFound);
}

#[test]
fn send_reports_unexpected_response() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST).path(MESSAGES_PATH);
        then.status(500).body("Internal Server Error");
    });

    let err = mailer(&server)
        .send(&message(), &RequestOptions::default())
        .unwrap_err();

    assert_eq!(service_error(err), MailServiceError::UnexpectedResponse);
}

#[test]
fn send_reports_transport_timeout() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST).path(MESSAGES_PATH);
        then.status(200)
            .delay(Duration::from_millis(500))
            .json_body(json!({ "status": "ACCEPTED", "messageId": "late" }));
    });

    let options = RequestOptions::new().timeout(Duration::from_millis(50));
    let err = mailer(&server).send(&message(), &options).unwrap_err();

    assert!(matches!(
        service_error(err),
        MailServiceError::Transport(_)
    ));
}

#[test]
fn invalid_message_is_not_sent() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(POST).path(MESSAGES_PATH);
        then.status(200)
            .json_body(json!({ "status": "ACCEPTED", "messageId": "abc" }));
    });

    let mut message = Message::new();
    message.set_subject("Foo");
    message.set_from("foo@example.com", None).unwrap();

    let err = mailer(&server)
        .send(&message, &RequestOptions::default())
        .unwrap_err();

    assert!(matches!(
        err,
        Error::Validation(ValidationError::MissingField("to"))
    ));
    mock.assert_hits(0);
}

#[test]
fn request_options_add_headers() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(GET)
            .path(format!("{MESSAGES_PATH}/abc"))
            .header("x-request-id", "r-1");
        then.status(200).json_body(json!({ "messageId": "abc" }));
    });

    let options = RequestOptions::new().header(
        HeaderName::from_static("x-request-id"),
        HeaderValue::from_static("r-1"),
    );
    mailer(&server).get_message("abc", &options).unwrap();

    mock.assert();
}

#[test]
fn get_message_returns_response_verbatim() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(GET).path(format!("{MESSAGES_PATH}/abc"));
        then.status(200)
            .json_body(json!({ "messageId": "abc", "status": "DELIVERED" }));
    });

    let response = mailer(&server)
        .get_message("abc", &RequestOptions::default())
        .unwrap();

    mock.assert();
    assert_eq!(response.status, Some(200));
    assert_eq!(
        response.body,
        json!({ "messageId": "abc", "status": "DELIVERED" })
    );
}

#[test]
fn get_message_reports_not_found() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path(format!("{MESSAGES_PATH}/missing"));
        then.status(404);
    });

    let err = mailer(&server)
        .get_message("missing", &RequestOptions::default())
        .unwrap_err();

    assert_eq!(service_error(err), MailServiceError::NotFound);
}

#[test]
fn custom_version_changes_routes() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(GET).path("/api/v2/fooKey/messages/7");
        then.status(200).json_body(json!({}));
    });

    let mailer = Mailer::builder(server.base_url(), APP_KEY)
        .api_version("2")
        .build()
        .unwrap();
    mailer.get_message(7, &RequestOptions::default()).unwrap();

    mock.assert();
}

#[test]
fn upstream_parser_sees_raw_response() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST).path(MESSAGES_PATH);
        then.status(200)
            .json_body(json!({ "status": "REJECTED", "rejectionReason": "spam" }));
    });

    let mut mailer = mailer(&server);
    mailer.set_upstream_parser(|response: RawResponse| {
        Ok(response.str_field("rejectionReason").unwrap_or_default().to_string())
    });

    let result = mailer.send(&message(), &RequestOptions::default()).unwrap();
    assert_eq!(result, "spam");
}

#[test]
fn downstream_parser_replaces_default() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path(format!("{MESSAGES_PATH}/1"));
        then.status(404);
    });

    let mut mailer = mailer(&server);
    mailer.set_downstream_parser(Ok);

    let response = mailer.get_message(1, &RequestOptions::default()).unwrap();
    assert!(response.is_not_found());
}

#[test]
fn logger_receives_transport_output() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST).path(MESSAGES_PATH);
        then.status(200)
            .json_body(json!({ "status": "ACCEPTED", "messageId": "abc" }));
    });

    let lines = Arc::new(Mutex::new(Vec::<String>::new()));
    let sink = lines.clone();
    let mut mailer = mailer(&server);
    mailer.set_logger(move |line| sink.lock().unwrap().push(line.to_string()));

    mailer.send(&message(), &RequestOptions::default()).unwrap();

    let lines = lines.lock().unwrap();
    assert_eq!(lines[0], format!("POST {}", server.url(MESSAGES_PATH)));
    assert!(lines.iter().any(|l| l.starts_with("request body: {\"subject\":\"Foo\"")));
    assert!(lines.iter().any(|l| l == "response status: 200"));
    assert!(lines.iter().any(|l| l.contains("ACCEPTED")));
}
