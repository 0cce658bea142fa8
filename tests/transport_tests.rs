//! Transport client tests against a scripted HTTP connection

mod common;

use common::{test_config, BodyStep, FakeClock, ScriptedHttp, ScriptedResponse};
use voice_satellite::arena::{AudioArena, Phase};
use voice_satellite::config::{AudioFormat, SatelliteConfig};
use voice_satellite::transport::{ResponseHead, ResponseKind, TransportClient};
use voice_satellite::SatelliteError;

/// Arena in `Sending` with a finalized request of `pcm` bytes.
fn outbound(capacity: usize, pcm: usize) -> (AudioArena, usize) {
    let mut arena = AudioArena::allocate(capacity).unwrap();
    arena.begin_capture().unwrap();
    arena.append(&vec![3u8; pcm]).unwrap();
    let payload = arena.finish_capture(&AudioFormat::SPEECH).unwrap();
    (arena, payload + 44)
}

fn client(config: &SatelliteConfig, responses: Vec<ScriptedResponse>) -> TransportClient<ScriptedHttp> {
    TransportClient::new(ScriptedHttp::with(responses), config)
}

#[test]
fn test_request_carries_container() {
    let config = test_config();
    let mut tc = client(&config, vec![ScriptedResponse::status(204)]);
    let (mut arena, total) = outbound(4096, 640);

    tc.exchange(&mut arena, total, &mut FakeClock::default()).unwrap();

    let req = &tc.connection().requests[0];
    assert_eq!(req.url, config.network.server_url);
    assert_eq!(tc.url(), req.url);
    assert_eq!(req.content_type, "audio/wav");
    assert_eq!(req.body.len(), 684);
    assert_eq!(&req.body[..4], b"RIFF");
    assert_eq!(tc.connection().finishes, 1);
}

#[test]
fn test_non_success_status_is_transport_error() {
    let config = test_config();
    let mut tc = client(&config, vec![ScriptedResponse::status(500)]);
    let (mut arena, total) = outbound(4096, 640);

    let err = tc.exchange(&mut arena, total, &mut FakeClock::default()).unwrap_err();

    assert_eq!(
        err,
        SatelliteError::Transport {
            status: Some(500),
            reason: "Internal Server Error".into(),
        }
    );
    assert_eq!(err.to_string(), "transport error: HTTP 500 - Internal Server Error");
    // Request untouched, connection released
    assert_eq!(arena.phase(), Phase::Sending);
    assert_eq!(tc.connection().finishes, 1);
}

#[test]
fn test_server_status_message_is_kept() {
    let config = test_config();
    let response = ScriptedResponse {
        head: Ok(ResponseHead {
            status: 400,
            status_message: Some("Audio too small".into()),
            ..Default::default()
        }),
        body: Vec::new(),
    };
    let mut tc = client(&config, vec![response]);
    let (mut arena, total) = outbound(4096, 640);

    let err = tc.exchange(&mut arena, total, &mut FakeClock::default()).unwrap_err();
    assert_eq!(
        err,
        SatelliteError::Transport {
            status: Some(400),
            reason: "Audio too small".into(),
        }
    );
}

#[test]
fn test_connection_error_passes_through() {
    let config = test_config();
    let mut tc = client(&config, vec![ScriptedResponse::failure("timeout")]);
    let (mut arena, total) = outbound(4096, 640);

    let err = tc.exchange(&mut arena, total, &mut FakeClock::default()).unwrap_err();
    assert_eq!(err, SatelliteError::connection("timeout"));
    assert_eq!(tc.connection().finishes, 1);
}

#[test]
fn test_audio_reply_streams_into_arena_through_empty_polls() {
    let config = test_config();
    let reply = common::wav_container(1600);
    let response = ScriptedResponse {
        head: Ok(ResponseHead {
            status: 200,
            content_type: Some("audio/wav".into()),
            content_length: Some(reply.len()),
            processing_time: Some("1.42".into()),
            pipeline_mode: Some("cloud".into()),
            ..Default::default()
        }),
        body: vec![
            BodyStep::Pause,
            BodyStep::Data(reply[..500].to_vec()),
            BodyStep::Pause,
            BodyStep::Pause,
            BodyStep::Data(reply[500..].to_vec()),
        ],
    };
    let mut tc = client(&config, vec![response]);
    let (mut arena, total) = outbound(4096, 2000);
    let mut clock = FakeClock::default();

    let kind = tc.exchange(&mut arena, total, &mut clock).unwrap();

    assert_eq!(kind, ResponseKind::Audio { len: 1644 });
    assert_eq!(arena.phase(), Phase::Playing);
    assert_eq!(arena.playable().unwrap(), reply.as_slice());
    // One poll delay per empty poll
    assert_eq!(voice_satellite::hal::Clock::now_ms(&clock), 3);
}

#[test]
fn test_audio_reply_larger_than_arena_is_refused() {
    let config = test_config();
    let response = ScriptedResponse {
        head: Ok(ResponseHead {
            status: 200,
            content_type: Some("audio/wav".into()),
            content_length: Some(5000),
            ..Default::default()
        }),
        body: vec![BodyStep::Data(vec![0; 5000])],
    };
    let mut tc = client(&config, vec![response]);
    let (mut arena, total) = outbound(4096, 640);

    let err = tc.exchange(&mut arena, total, &mut FakeClock::default()).unwrap_err();

    assert_eq!(
        err,
        SatelliteError::ResponseTooLarge {
            declared: 5000,
            capacity: 4096,
        }
    );
    // Nothing was received over the request
    assert_eq!(arena.phase(), Phase::Sending);
    assert_eq!(&arena.outbound().unwrap()[..4], b"RIFF");
}

#[test]
fn test_stalled_audio_reply_times_out() {
    let mut config = test_config();
    config.http_timeout_ms = 200;
    let reply = common::wav_container(1600);
    let response = ScriptedResponse {
        head: Ok(ResponseHead {
            status: 200,
            content_type: Some("audio/wav".into()),
            content_length: Some(reply.len()),
            ..Default::default()
        }),
        body: vec![BodyStep::Data(reply[..800].to_vec())],
    };
    let mut tc = client(&config, vec![response]);
    let (mut arena, total) = outbound(4096, 640);
    let mut clock = FakeClock::default();

    let err = tc.exchange(&mut arena, total, &mut clock).unwrap_err();

    assert!(matches!(err, SatelliteError::Transport { status: None, .. }));
    assert!(err.to_string().contains("800 of 1644"));
    assert_eq!(voice_satellite::hal::Clock::now_ms(&clock), 200);
    assert_eq!(tc.connection().finishes, 1);
}

#[test]
fn test_header_only_wav_is_not_audio() {
    let config = test_config();
    let reply = common::wav_container(0);
    let mut tc = client(&config, vec![ScriptedResponse::wav_bytes(reply)]);
    let (mut arena, total) = outbound(4096, 640);

    let kind = tc.exchange(&mut arena, total, &mut FakeClock::default()).unwrap();

    assert!(matches!(kind, ResponseKind::Text(_)));
    assert_eq!(arena.phase(), Phase::Sending);
}

#[test]
fn test_json_reply_is_text() {
    let config = test_config();
    let body = r#"{"error":"Audio too small"}"#;
    let mut tc = client(&config, vec![ScriptedResponse::text("application/json", body)]);
    let (mut arena, total) = outbound(4096, 640);

    let kind = tc.exchange(&mut arena, total, &mut FakeClock::default()).unwrap();

    let ResponseKind::Text(text) = kind else {
        panic!("expected text, got {:?}", kind);
    };
    assert_eq!(text.content_type.as_deref(), Some("application/json"));
    assert_eq!(text.body, body);
    assert!(!text.truncated);
    assert_eq!(text.hub_reply().unwrap().error.as_deref(), Some("Audio too small"));
    assert_eq!(text.summary(), "hub error: Audio too small");
}

#[test]
fn test_long_text_is_truncated() {
    let mut config = test_config();
    config.text_limit_bytes = 100;
    let long = "x".repeat(1000);
    let response = ScriptedResponse {
        head: Ok(ResponseHead {
            status: 200,
            content_type: Some("text/plain".into()),
            ..Default::default()
        }),
        body: vec![BodyStep::Data(long.into_bytes())],
    };
    let mut tc = client(&config, vec![response]);
    let (mut arena, total) = outbound(4096, 640);

    let ResponseKind::Text(text) = tc.exchange(&mut arena, total, &mut FakeClock::default()).unwrap() else {
        panic!("expected text");
    };
    assert_eq!(text.body.len(), 100);
    assert!(text.truncated);
}

#[test]
fn test_alternate_wav_content_type_is_audio() {
    let config = test_config();
    let reply = common::wav_container(320);
    let mut response = ScriptedResponse::wav_bytes(reply.clone());
    if let Ok(head) = response.head.as_mut() {
        head.content_type = Some("audio/x-wav".into());
    }
    let mut tc = client(&config, vec![response]);
    let (mut arena, total) = outbound(4096, 640);

    let kind = tc.exchange(&mut arena, total, &mut FakeClock::default()).unwrap();
    assert_eq!(kind, ResponseKind::Audio { len: reply.len() });
}
