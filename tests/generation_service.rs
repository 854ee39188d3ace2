use bytes::Bytes;
use clipthumb_lib::error::GENERATION_FAILED_MESSAGE;
use clipthumb_lib::{
    CandidateFile, ResultView, Session, SessionEvent, Settings, Style, SubmitError,
};
use pretty_assertions::assert_eq;
use std::net::TcpListener;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use wiremock::matchers::{body_string_contains, header_regex, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const JPEG: &[u8] = b"\xFF\xD8\xFF\xE0fake-jpeg";
const VIDEO: &[u8] = b"fake-mp4-bytes";

fn settings_for(base_url: String) -> Settings {
    Settings {
        api_base_url: base_url,
        request_timeout_secs: 5,
        startup_delay_ms: 0,
        ..Settings::default()
    }
}

fn session_for(base_url: String) -> (Session, broadcast::Receiver<SessionEvent>) {
    let (tx, rx) = broadcast::channel(64);
    let session = Session::connect(settings_for(base_url), Arc::new(tx)).expect("session");
    (session, rx)
}

fn clip() -> CandidateFile {
    CandidateFile::new("clip.mp4", "video/mp4", Bytes::from_static(VIDEO))
}

fn drain(rx: &mut broadcast::Receiver<SessionEvent>) -> Vec<SessionEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

fn loading_transitions(events: &[SessionEvent]) -> Vec<bool> {
    events
        .iter()
        .filter_map(|event| match event {
            SessionEvent::StateChanged { is_loading, .. } => Some(*is_loading),
            _ => None,
        })
        .collect()
}

fn free_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind temp port");
    let port = listener.local_addr().expect("local addr").port();
    drop(listener);
    port
}

#[tokio::test]
async fn test_retro_blue_clip_returns_image() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/generate/"))
        .and(header_regex("content-type", "^multipart/form-data"))
        .and(body_string_contains(r#"name="file"; filename="clip.mp4""#))
        .and(body_string_contains("fake-mp4-bytes"))
        .and(body_string_contains("name=\"style\"\r\n\r\nretro"))
        .and(body_string_contains("name=\"color\"\r\n\r\nblue"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "image/jpeg")
                .set_body_bytes(JPEG),
        )
        .expect(1)
        .mount(&server)
        .await;

    let (session, mut rx) = session_for(server.uri());
    session.select_file(clip()).expect("mp4 accepted");
    session.set_parameters(Some(Style::Retro), "blue");

    session.submit().await.expect("generation succeeds");

    let state = session.state().snapshot();
    assert!(!state.is_loading);
    assert_eq!(state.last_error, None);
    let result = state.current_result.expect("result stored");
    assert_eq!(result.binary_data, Bytes::from_static(JPEG));
    assert_eq!(result.content_type.as_deref(), Some("image/jpeg"));
    assert_eq!(
        std::fs::read(result.display_reference().path()).unwrap(),
        JPEG
    );

    let snapshot = session.snapshot();
    assert_eq!(snapshot.file_name, None);
    assert!(matches!(snapshot.view, ResultView::Image { .. }));

    let events = drain(&mut rx);
    assert_eq!(loading_transitions(&events), vec![true, false]);
    let last_progress = events
        .iter()
        .rev()
        .find_map(|event| match event {
            SessionEvent::UploadProgress {
                uploaded,
                total_size,
                ..
            } => Some((*uploaded, *total_size)),
            _ => None,
        })
        .expect("upload progress reported");
    assert_eq!(last_progress, (VIDEO.len() as u64, VIDEO.len() as u64));
}

#[tokio::test]
async fn test_picked_file_is_streamed_from_disk() {
    let server = MockServer::start().await;
    // Spans several upload chunks.
    let video: Vec<u8> = b"frame-".iter().copied().cycle().take(200 * 1024).collect();

    Mock::given(method("POST"))
        .and(path("/generate/"))
        .and(body_string_contains(r#"name="file"; filename="holiday.mp4""#))
        .and(body_string_contains("frame-frame-"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(JPEG))
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().expect("temp dir");
    let clip_path = dir.path().join("holiday.mp4");
    std::fs::write(&clip_path, &video).expect("write clip");

    let (session, mut rx) = session_for(server.uri());
    let picked = session.select_path(&clip_path).await.expect("metadata readable");
    assert_eq!(picked.as_deref(), Some("holiday.mp4"));

    session.submit().await.expect("generation succeeds");

    let progress: Vec<u64> = drain(&mut rx)
        .into_iter()
        .filter_map(|event| match event {
            SessionEvent::UploadProgress { uploaded, .. } => Some(uploaded),
            _ => None,
        })
        .collect();
    assert!(progress.len() > 2, "one event per chunk, got {progress:?}");
    assert_eq!(progress.last().copied(), Some(video.len() as u64));
}

#[tokio::test]
async fn test_empty_style_is_sent_as_empty_field() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/generate/"))
        .and(body_string_contains("name=\"style\"\r\n\r\n\r\n"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(JPEG))
        .expect(1)
        .mount(&server)
        .await;

    let (session, _rx) = session_for(server.uri());
    session.select_file(clip());

    session.submit().await.expect("generation succeeds");
}

#[tokio::test]
async fn test_server_error_keeps_previous_image() {
    let server = MockServer::start().await;
    let (session, mut rx) = session_for(server.uri());

    let ok = Mock::given(method("POST"))
        .and(path("/generate/"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(JPEG))
        .expect(1)
        .mount_as_scoped(&server)
        .await;
    session.select_file(clip());
    session.submit().await.expect("first generation succeeds");
    drop(ok);
    let before = session.state().current_result().expect("first image");

    Mock::given(method("POST"))
        .and(path("/generate/"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&server)
        .await;
    session.select_file(clip());
    session.set_parameters(Some(Style::Minimalist), "green");
    drain(&mut rx);

    let err = session.submit().await.unwrap_err();

    assert!(matches!(err, SubmitError::ServiceError { status: 500, .. }));
    let state = session.state().snapshot();
    assert!(!state.is_loading);
    assert_eq!(state.last_error.as_deref(), Some(GENERATION_FAILED_MESSAGE));
    assert!(Arc::ptr_eq(&before, &state.current_result.unwrap()));

    // Form and file survive so the user can simply retry.
    let snapshot = session.snapshot();
    assert_eq!(snapshot.file_name.as_deref(), Some("clip.mp4"));
    assert_eq!(snapshot.style, Some(Style::Minimalist));
    assert_eq!(snapshot.color, "green");

    let events = drain(&mut rx);
    assert_eq!(loading_transitions(&events), vec![true, false]);
    assert!(events.contains(&SessionEvent::Error {
        message: GENERATION_FAILED_MESSAGE.to_string()
    }));
}

#[tokio::test]
async fn test_no_file_sends_nothing() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(JPEG))
        .expect(0)
        .mount(&server)
        .await;

    let (session, _rx) = session_for(server.uri());
    session.set_parameters(Some(Style::Retro), "blue");

    let err = session.submit().await.unwrap_err();

    assert!(matches!(err, SubmitError::MissingFile));
    assert!(!session.state().is_loading());
    assert_eq!(
        session.state().last_error().as_deref(),
        Some("Please add a file before submitting.")
    );
}

#[tokio::test]
async fn test_unreachable_service_is_network_failure() {
    let (session, _rx) = session_for(format!("http://127.0.0.1:{}", free_port()));
    session.select_file(clip());

    let err = session.submit().await.unwrap_err();

    assert!(matches!(err, SubmitError::NetworkFailure(_)));
    assert!(!session.state().is_loading());
    assert_eq!(
        session.state().last_error().as_deref(),
        Some(GENERATION_FAILED_MESSAGE)
    );
    assert!(session.state().current_result().is_none());
}

#[tokio::test]
async fn test_slow_service_times_out() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/generate/"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_bytes(JPEG)
                .set_delay(Duration::from_secs(3)),
        )
        .mount(&server)
        .await;

    let (tx, _rx) = broadcast::channel(64);
    let settings = Settings {
        request_timeout_secs: 1,
        ..settings_for(server.uri())
    };
    let session = Session::connect(settings, Arc::new(tx)).expect("session");
    session.select_file(clip());

    let err = session.submit().await.unwrap_err();

    assert!(matches!(err, SubmitError::NetworkFailure(_)));
    assert!(!session.state().is_loading());
}

#[tokio::test]
async fn test_only_latest_selection_is_uploaded() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/generate/"))
        .and(body_string_contains(r#"filename="second.mp4""#))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(JPEG))
        .expect(1)
        .mount(&server)
        .await;

    let (session, _rx) = session_for(server.uri());
    session.select_file(CandidateFile::new("first.mp4", "video/mp4", "one"));
    session.select_file(CandidateFile::new("second.mp4", "video/mp4", "two"));

    session.submit().await.expect("generation succeeds");
}
