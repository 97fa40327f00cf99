use lingo_reader::api::{HttpTextApi, TextApi};
use lingo_reader::error::NetworkError;
use lingo_reader::models::{LearningLevel, Lookup, Term};
use std::io::{BufRead, BufReader, Read, Write};
use std::net::{TcpListener, TcpStream};
use std::thread;
use std::time::Duration;

struct Request {
    line: String,
    headers: Vec<String>,
    body: String,
}

fn read_request(stream: TcpStream) -> (TcpStream, Request) {
    let mut reader = BufReader::new(stream);
    let mut line = String::new();
    reader.read_line(&mut line).unwrap();

    let mut headers = Vec::new();
    let mut content_length = 0;
    loop {
        let mut header = String::new();
        reader.read_line(&mut header).unwrap();
        let header = header.trim_end().to_ascii_lowercase();
        if header.is_empty() {
            break;
        }
        if let Some(value) = header.strip_prefix("content-length:") {
            content_length = value.trim().parse().unwrap();
        }
        headers.push(header);
    }

    let mut body = vec![0; content_length];
    reader.read_exact(&mut body).unwrap();
    let request = Request {
        line,
        headers,
        body: String::from_utf8(body).unwrap(),
    };
    (reader.into_inner(), request)
}

fn write_json_response(stream: &mut TcpStream, status: &str, body: &str) {
    let response = format!(
        "HTTP/1.1 {status}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        body.len(),
        body
    );
    stream.write_all(response.as_bytes()).unwrap();
    stream.flush().unwrap();
}

/// Serve one request per `(status, body)` pair and hand back what was received.
fn serve(
    responses: Vec<(&'static str, &'static str)>,
) -> (String, thread::JoinHandle<Vec<Request>>) {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let base = format!("http://{}/api", listener.local_addr().unwrap());
    let server = thread::spawn(move || {
        responses
            .into_iter()
            .map(|(status, body)| {
                let (stream, _) = listener.accept().unwrap();
                let (mut stream, request) = read_request(stream);
                write_json_response(&mut stream, status, body);
                request
            })
            .collect()
    });
    (base, server)
}

fn client(base: &str, token: Option<&str>) -> HttpTextApi {
    HttpTextApi::new(base, token.map(str::to_string), Duration::from_secs(2)).unwrap()
}

#[test]
fn test_get_text_read_sends_bearer_token() {
    let (base, server) = serve(vec![(
        "200 OK",
        r#"{"id":7,"title":"La Regenta","languageCode":"es","bookmark":1000,"termCount":5000,"processedTermCount":5000}"#,
    )]);

    let text = client(&base, Some("secret")).get_text_read(7).unwrap();
    let requests = server.join().unwrap();

    assert!(requests[0].line.starts_with("GET /api/text/7 "));
    assert!(requests[0].headers.contains(&"authorization: bearer secret".to_string()));
    assert_eq!(text.title, "La Regenta");
    assert_eq!(text.bookmark, Some(1000));
    assert_eq!(text.term_count, 5000);
    assert!(text.terms_count_by_learning_level.is_none());
}

#[test]
fn test_get_text_terms_assigns_indices_from_served_begin() {
    let (base, server) = serve(vec![(
        "200 OK",
        r#"{"begin":500,"end":503,"terms":[
            {"id":11,"content":"Era","learningLevel":"UnKnow"},
            {"content":" ","learningLevel":"Skipped"},
            {"id":12,"content":"noche","learningLevel":"WellKnow"}
        ]}"#,
    )]);

    let range = client(&base, None).get_text_terms(7, 500, 2000).unwrap();
    let requests = server.join().unwrap();

    assert!(requests[0].line.contains("/api/text/7/terms?"));
    assert!(requests[0].line.contains("indexfrom=500"));
    assert!(requests[0].line.contains("indexto=2000"));
    assert!(!requests[0].headers.iter().any(|h| h.starts_with("authorization:")));

    assert_eq!((range.begin, range.end), (500, 503));
    let indices: Vec<usize> = range.terms.iter().map(|t| t.index).collect();
    assert_eq!(indices, vec![500, 501, 502]);
    assert_eq!(range.terms[0].learning_level, LearningLevel::Unknown);
    assert_eq!(range.terms[2].learning_level, LearningLevel::WellKnown);
    assert_eq!(range.terms[1].id, None);
}

#[test]
fn test_counts_and_lookups() {
    let (base, server) = serve(vec![
        ("200 OK", r#"{"termCount":200}"#),
        ("200 OK", r#"{"processedTermCount":50}"#),
        ("200 OK", r#"{"meaning":"night"}"#),
        ("200 OK", r#"{"meaning":"  "}"#),
        ("200 OK", r#"{"count":4}"#),
        ("200 OK", r#"{"UnKnow":20,"WellKnow":30,"Skipped":40}"#),
    ]);
    let api = client(&base, None);

    assert_eq!(api.get_term_count(7).unwrap(), 200);
    assert_eq!(api.get_processed_term_count(7).unwrap(), 50);
    assert_eq!(api.get_term_meaning(12, 502).unwrap().as_deref(), Some("night"));
    assert_eq!(api.get_term_meaning(12, 502).unwrap(), None);
    assert_eq!(api.get_term_count_in_text(12, 7).unwrap(), Some(4));
    let counts = api.get_term_count_by_learning_level(7).unwrap();
    let requests = server.join().unwrap();

    assert_eq!(counts.get(LearningLevel::WellKnown), 30);
    assert_eq!(counts.practice(100), 30);
    assert!(requests[0].line.starts_with("GET /api/text/7/term-count "));
    assert!(requests[1].line.starts_with("GET /api/text/7/processed-term-count "));
    assert!(requests[2].line.contains("/api/term/12/meaning?index=502"));
    assert!(requests[4].line.contains("/api/term/12/count?textId=7"));
    assert!(requests[5].line.starts_with("GET /api/text/7/term-count-by-level "));
}

#[test]
fn test_bookmark_and_edit_send_json_bodies() {
    let (base, server) = serve(vec![("200 OK", "{}"), ("200 OK", "{}")]);
    let api = client(&base, Some("secret"));

    api.set_text_bookmark(7, 1002).unwrap();
    let mut term = Term::new(502, "noche", LearningLevel::Learning2);
    term.id = Some(12);
    term.meaning = Lookup::Resolved("night".to_string());
    api.edit_term(&term).unwrap();
    let requests = server.join().unwrap();

    assert!(requests[0].line.starts_with("PATCH /api/text/7/bookmark "));
    let bookmark: serde_json::Value = serde_json::from_str(&requests[0].body).unwrap();
    assert_eq!(bookmark, serde_json::json!({"index": 1002}));

    assert!(requests[1].line.starts_with("PUT /api/term/12 "));
    assert!(requests[1].headers.contains(&"authorization: bearer secret".to_string()));
    let edited: serde_json::Value = serde_json::from_str(&requests[1].body).unwrap();
    assert_eq!(
        edited,
        serde_json::json!({"id": 12, "content": "noche", "learningLevel": "Learning2"})
    );
}

#[test]
fn test_edit_without_id_is_not_sent() {
    let api = client("http://127.0.0.1:9/api", None);
    let term = Term::new(501, " ", LearningLevel::Skipped);
    assert!(api.edit_term(&term).is_ok());
}

#[test]
fn test_unavailable_server_maps_to_connect_notice() {
    let (base, server) = serve(vec![("503 Service Unavailable", "{}")]);

    let err = client(&base, None).get_term_count(7).unwrap_err();
    server.join().unwrap();

    assert!(matches!(err, NetworkError::Status { status: 503, .. }));
    assert_eq!(err.notice(), "Failed to connect to server.");
}

#[test]
fn test_malformed_body_is_a_decode_error() {
    let (base, server) = serve(vec![("200 OK", r#"{"unexpected":true}"#)]);

    let err = client(&base, None).get_term_count(7).unwrap_err();
    server.join().unwrap();

    assert!(matches!(err, NetworkError::Decode(_)));
}
