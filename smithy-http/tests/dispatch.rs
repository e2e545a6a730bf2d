/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0.
 */

use smithy_http::connector::DynConnector;
use smithy_http::test_connection::{ReplayEvent, TestConnection};
use smithy_http::{Header, Headers, HttpMessage, InputStream, MessageKind, MessageRecord};

#[tokio::test]
async fn message_round_trips_through_a_connector() {
    let conn = TestConnection::new(vec![ReplayEvent::respond(201, "created")]);
    let connector = DynConnector::new(conn.clone());

    let mut defaults = Headers::new();
    defaults.push(Header::new("user-agent", "smithy-http-test").unwrap());
    defaults.push(Header::new("x-dup", "1").unwrap());

    let mut message = HttpMessage::new_request("POST", "/things?id=7").unwrap();
    message.add_headers(&defaults);
    message.add_header(Header::new("x-dup", "2").unwrap());
    assert!(message.set_body(Some(InputStream::from("payload"))).is_none());

    let response = connector
        .call(message.into_http_request("http://localhost:8000/").unwrap())
        .await
        .expect("replayed response");
    assert_eq!(response.status(), 201);
    assert_eq!(response.body().as_ref(), b"created");

    let requests = conn.requests();
    assert_eq!(requests.len(), 1);
    let request = &requests[0];
    assert_eq!(request.method, "POST");
    assert_eq!(request.uri.to_string(), "http://localhost:8000/things?id=7");
    assert_eq!(request.headers["user-agent"], "smithy-http-test");
    let dups: Vec<_> = request.headers.get_all("x-dup").iter().collect();
    assert_eq!(dups, vec!["1", "2"]);
    assert_eq!(request.body.as_ref(), b"payload");
}

#[test]
fn borrowed_record_outlives_its_wrapper() {
    let mut record = MessageRecord::new(MessageKind::Response {
        status: http::StatusCode::OK,
    });
    {
        let mut message = HttpMessage::borrowed(&mut record);
        message.add_header(Header::new("content-type", "application/json").unwrap());
        message.set_body(Some(InputStream::from(r#"{"ok":true}"#)));
        assert!(!message.is_owned());
        assert_eq!(message.status(), Some(http::StatusCode::OK));
    }
    assert_eq!(record.headers().len(), 1);
    assert!(record.body().is_none());
}
