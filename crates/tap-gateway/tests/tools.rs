mod common;

use serde_json::{json, Value};

use tap_gateway::Gateway;
use tap_types::config::LiveConfig;
use tap_types::tool::{ToolCall, ToolResult};

use common::{chat, eventually, handshake, Outcome, ScriptedSource};

fn gateway(source: &std::sync::Arc<ScriptedSource>) -> Gateway {
    let mut config = LiveConfig::default();
    config.reconnect.delay_ms = 10;
    Gateway::with_source(config, source.clone())
}

async fn call(gateway: &Gateway, tool: &str, input: Value) -> ToolResult {
    gateway
        .execute(&ToolCall {
            id: format!("{tool}-call"),
            name: tool.to_string(),
            input,
        })
        .await
}

#[tokio::test]
async fn connect_list_info_disconnect() {
    let source = ScriptedSource::new([Outcome::Accept(handshake("7001"))]);
    let gw = gateway(&source);

    let res = call(&gw, "live_list", json!({})).await;
    assert_eq!(res.content, "No active connections to any livestreams");

    let res = call(&gw, "live_connect", json!({"key": "@alice"})).await;
    assert!(!res.is_error, "{}", res.content);
    assert_eq!(
        res.content,
        "Successfully connected to @alice's livestream (Room ID: 7001) with stream url https://cdn.example/7001.flv"
    );

    let res = call(&gw, "live_connect", json!({"key": "@alice"})).await;
    assert_eq!(res.content, "Already connected to @alice's livestream (Room ID: 7001)");
    assert_eq!(source.opens(), 1);

    let res = call(&gw, "live_list", json!({})).await;
    assert!(res.content.contains("@alice (Room ID: 7001, Viewers: 7)"));

    let res = call(&gw, "live_info", json!({"key": "@alice"})).await;
    assert!(res.content.starts_with("Stream information for @alice:"));
    assert!(res.content.contains("Total Messages: 0"));

    let res = call(&gw, "live_disconnect", json!({"key": "@alice"})).await;
    assert_eq!(res.content, "Successfully disconnected from @alice's livestream");

    let res = call(&gw, "live_info", json!({"key": "@alice"})).await;
    assert!(res.is_error);
    assert_eq!(
        res.content,
        "Not connected to @alice's livestream. Use live_connect first."
    );
}

#[tokio::test]
async fn history_text_and_json() {
    let source = ScriptedSource::accepting();
    let gw = gateway(&source);
    call(&gw, "live_connect", json!({"key": "@alice"})).await;

    let res = call(&gw, "live_history", json!({"key": "@alice", "kind": "gift"})).await;
    assert_eq!(res.content, "No gifts yet in @alice's livestream");

    source.emit("@alice", chat("bob", "first")).await;
    source.emit("@alice", chat("bob", "second")).await;
    eventually(|| {
        gw.manager()
            .info("@alice")
            .map(|s| s.counts.chat == 2)
            .unwrap_or(false)
    })
    .await;

    let res = call(&gw, "live_history", json!({"key": "@alice", "count": 1})).await;
    assert!(res.content.starts_with("Recent messages from @alice's livestream:"));
    assert!(res.content.ends_with(" - bob: second"));
    assert!(!res.content.contains("first"));

    let res = call(
        &gw,
        "live_history",
        json!({"key": "@alice", "kind": "chat", "format": "json"}),
    )
    .await;
    let records: Vec<Value> = serde_json::from_str(&res.content).unwrap();
    assert_eq!(records.len(), 2);
    assert_eq!(records[0]["comment"], "first");
    assert_eq!(records[0]["kind"], "chat");

    let res = call(&gw, "live_history", json!({"key": "@alice", "kind": "emotes"})).await;
    assert!(res.is_error);
    assert!(res.content.contains("emotes"));
}

#[tokio::test]
async fn stream_url_probe_and_missing_parameters() {
    let source = ScriptedSource::new([Outcome::Accept(handshake("42"))]);
    let gw = gateway(&source);

    let res = call(&gw, "live_stream_url", json!({"key": "@alice"})).await;
    assert_eq!(res.content, "Stream url for @alice is https://cdn.example/42.flv");
    assert!(gw.manager().list().is_empty());

    let res = call(&gw, "live_connect", json!({})).await;
    assert!(res.is_error);
    assert!(res.content.contains("missing 'key'"));

    let res = call(&gw, "video_stop", json!({"pid": 999_999})).await;
    assert!(res.is_error);
}

#[tokio::test]
async fn definitions_cover_every_tool() {
    let gw = gateway(&ScriptedSource::accepting());
    let names: Vec<_> = gw.tool_definitions().into_iter().map(|t| t.name).collect();
    for expected in [
        "live_connect",
        "live_disconnect",
        "live_list",
        "live_info",
        "live_history",
        "live_stream_url",
        "video_play",
        "video_record",
        "video_list",
        "video_stop",
    ] {
        assert!(names.iter().any(|n| n == expected), "missing {expected}");
    }
}

#[cfg(unix)]
#[tokio::test]
async fn video_list_shows_started_processes() {
    let mut config = LiveConfig::default();
    // `sleep -autoexit <url>` exits straight away, which is all this needs.
    config.media.player = "sleep".into();
    let gw = Gateway::with_source(config, ScriptedSource::accepting());

    let res = call(&gw, "video_list", json!({})).await;
    assert!(!res.is_error);
    assert_eq!(res.content, "No video processes.");

    let res = call(&gw, "video_play", json!({"url": "http://cdn.example/live.flv"})).await;
    assert!(!res.is_error, "{}", res.content);
    let pid = res
        .content
        .trim_start_matches("Video playback started with PID: ")
        .to_string();

    let res = call(&gw, "video_list", json!({})).await;
    assert!(res.content.contains(&format!("  {pid} | playback | ")));
    assert!(res.content.contains("sleep -autoexit http://cdn.example/live.flv"));
}
