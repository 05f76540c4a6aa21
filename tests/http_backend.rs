use std::io::Read;
use std::net::TcpListener;
use std::sync::{Arc, Mutex};
use std::thread;

use scan_client::{
    AnalysisHandle, FileUpload, HttpBackend, ManualClock, RecordingRenderer, ScanBackend,
    ScanClient, ScanError, Submission, UiClass,
};
use tiny_http::{Header, Response, Server};

#[derive(Debug, Clone)]
struct Recorded {
    method: String,
    path: String,
    content_type: String,
    body: Vec<u8>,
}

type Requests = Arc<Mutex<Vec<Recorded>>>;

/// Serves every request with `respond(method, path, n)`, where `n` counts
/// requests to that path, and records what came in.
fn serve<F>(respond: F) -> (String, Requests)
where
    F: Fn(&str, &str, usize) -> (u16, String) + Send + 'static,
{
    let server = Server::http("127.0.0.1:0").unwrap();
    let port = server.server_addr().to_ip().unwrap().port();
    let requests: Requests = Arc::new(Mutex::new(Vec::new()));
    let recorded = Arc::clone(&requests);

    thread::spawn(move || {
        for mut request in server.incoming_requests() {
            let content_type = request
                .headers()
                .iter()
                .find(|h| h.field.as_str().to_ascii_lowercase() == "content-type")
                .map(|h| h.value.as_str().to_string())
                .unwrap_or_default();
            let mut body = Vec::new();
            request.as_reader().read_to_end(&mut body).unwrap();

            let method = request.method().as_str().to_string();
            let path = request.url().to_string();
            let seen = {
                let mut requests = recorded.lock().unwrap();
                requests.push(Recorded {
                    method: method.clone(),
                    path: path.clone(),
                    content_type,
                    body,
                });
                requests.iter().filter(|r| r.path == path).count()
            };

            let (status, body) = respond(&method, &path, seen);
            let response = Response::from_string(body)
                .with_status_code(status)
                .with_header(
                    Header::from_bytes(&b"Content-Type"[..], &b"application/json"[..]).unwrap(),
                );
            let _ = request.respond(response);
        }
    });

    (format!("http://127.0.0.1:{}", port), requests)
}

fn analysis(status: &str) -> String {
    format!(
        r#"{{"data": {{"attributes": {{"status": "{}", "md5": "abc", "sha256": "def", "results": {{
            "EngineA": {{"category": "malicious", "result": "Trojan"}},
            "EngineB": {{"category": "undetected", "result": "clean"}}
        }}}}}}}}"#,
        status
    )
}

fn body_text(recorded: &Recorded) -> String {
    String::from_utf8_lossy(&recorded.body).into_owned()
}

#[test]
fn submits_url_as_multipart_field() {
    let (addr, requests) = serve(|_, _, _| (200, r#"{"data": {"id": "u-1"}}"#.to_string()));
    let backend = HttpBackend::new_for_server(&addr).unwrap();

    let handle = backend
        .submit(&Submission::Url("https://example.com/payload".into()))
        .unwrap();

    assert_eq!(handle, AnalysisHandle::new("u-1"));
    let requests = requests.lock().unwrap();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].method, "POST");
    assert_eq!(requests[0].path, "/analyze");
    assert!(requests[0].content_type.starts_with("multipart/form-data"));
    let body = body_text(&requests[0]);
    assert!(body.contains(r#"name="url""#));
    assert!(body.contains("https://example.com/payload"));
    assert!(!body.contains(r#"name="file""#));
}

#[test]
fn submits_file_with_its_name() {
    let (addr, requests) = serve(|_, _, _| (200, r#"{"data": {"id": 77}}"#.to_string()));
    let backend = HttpBackend::new_for_server(&addr).unwrap();

    let handle = backend
        .submit(&Submission::File(FileUpload::new("sample.txt", b"EICAR-ish".to_vec())))
        .unwrap();

    assert_eq!(handle, AnalysisHandle::new("77"));
    let requests = requests.lock().unwrap();
    let body = body_text(&requests[0]);
    assert!(body.contains(r#"name="file"; filename="sample.txt""#));
    assert!(body.contains("EICAR-ish"));
    assert!(!body.contains(r#"name="url""#));
}

#[test]
fn missing_id_is_malformed() {
    let (addr, _) = serve(|_, _, _| (200, r#"{"data": {}}"#.to_string()));
    let backend = HttpBackend::new_for_server(&addr).unwrap();

    let err = backend
        .submit(&Submission::Url("https://example.com".into()))
        .unwrap_err();

    assert!(matches!(err, ScanError::MalformedResponse { .. }));
}

#[test]
fn non_json_analysis_is_malformed() {
    let (addr, _) = serve(|_, _, _| (200, "<html>oops</html>".to_string()));
    let backend = HttpBackend::new_for_server(&addr).unwrap();

    let err = backend.fetch_analysis(&AnalysisHandle::new("x")).unwrap_err();

    assert!(matches!(err, ScanError::MalformedResponse { .. }));
}

#[test]
fn full_scan_against_server() {
    let (addr, requests) = serve(|method, path, seen| match (method, path) {
        ("POST", "/analyze") => (200, r#"{"data": {"id": "abc"}}"#.to_string()),
        ("GET", "/analysis/abc") if seen < 3 => (200, analysis("queued")),
        ("GET", "/analysis/abc") => (200, analysis("completed")),
        _ => (404, "{}".to_string()),
    });
    let client = ScanClient::with_clock(HttpBackend::new_for_server(&addr).unwrap(), ManualClock::new());
    let renderer = RecordingRenderer::new();

    let state = client
        .scan(None, Some("https://example.com".into()), &renderer)
        .unwrap()
        .unwrap();

    assert_eq!(state.class, UiClass::Malicious);
    let summary = state.summary().unwrap();
    assert_eq!(summary.ratio_text(), "1 out of 2 engines detected this as malicious.");
    assert_eq!(summary.detected[0].engine, "EngineA");
    assert_eq!(summary.undetected[0].engine, "EngineB");

    let polls = requests
        .lock()
        .unwrap()
        .iter()
        .filter(|r| r.method == "GET")
        .count();
    assert_eq!(polls, 3);
}

#[test]
fn submission_error_aborts_before_polling() {
    let (addr, requests) = serve(|method, _, _| match method {
        "POST" => (500, r#"{"error": "boom"}"#.to_string()),
        _ => (200, analysis("completed")),
    });
    let client = ScanClient::with_clock(HttpBackend::new_for_server(&addr).unwrap(), ManualClock::new());
    let renderer = RecordingRenderer::new();

    let state = client
        .scan(None, Some("https://example.com".into()), &renderer)
        .unwrap()
        .unwrap();

    assert_eq!(state.class, UiClass::Error);
    assert_eq!(state.text(), Some("Error: 500 Internal Server Error"));
    assert!(requests.lock().unwrap().iter().all(|r| r.method == "POST"));
}

#[test]
fn connection_failure_is_rendered() {
    let port = {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };
    let backend = HttpBackend::new_for_server(&format!("http://127.0.0.1:{}", port)).unwrap();
    let client = ScanClient::with_clock(backend, ManualClock::new());
    let renderer = RecordingRenderer::new();

    let state = client.check_status(&AnalysisHandle::new("abc"), &renderer);

    assert_eq!(state.class, UiClass::Error);
    assert!(state.text().unwrap().starts_with("Error: "));
}
