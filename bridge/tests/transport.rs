//! Drive the bridge transport loop with in-memory streams

use rov_autopilot::Settings;
use rov_bridge::run;
use serde_json::Value;
use tokio::io::AsyncReadExt;

async fn run_lines(input: &str, settings: Option<Settings>) -> Vec<Value> {
    let (client, mut server) = tokio::io::duplex(64 * 1024);
    run(input.as_bytes(), client, settings, 256).await.unwrap();

    let mut output = String::new();
    server.read_to_string(&mut output).await.unwrap();
    output
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect()
}

fn names(lines: &[Value]) -> Vec<String> {
    lines
        .iter()
        .map(|v| v["event"].as_str().unwrap_or_default().to_string())
        .collect()
}

#[tokio::test]
async fn route_of_unknown_kinds_completes_and_stops_on_eof() {
    let input = concat!(
        r#"{"event":"navigation-update","payload":{"heading":12.0,"depth":1.5}}"#,
        "\n",
        "this line is not json\n",
        "\n",
        r#"{"event":"route-start","payload":[{"type":"hover","value":3}]}"#,
        "\n",
    );
    let lines = run_lines(input, Some(Settings::default())).await;
    let names = names(&lines);

    assert!(names.contains(&"route-completed".to_string()));

    // Commands keep their order; observer events may trail them
    let last_command = names
        .iter()
        .filter(|n| n.starts_with("motor.") || n.starts_with("hold."))
        .last();
    assert_eq!(last_command.map(String::as_str), Some("motor.all-stop"));

    let depth_hold = lines
        .iter()
        .find(|v| v["event"] == "hold.set-depth" && v["payload"]["enabled"] == true)
        .unwrap();
    assert_eq!(depth_hold["payload"]["target"], 150.0);
}

#[tokio::test]
async fn missing_settings_reports_configuration_not_ready() {
    let input = concat!(r#"{"event":"route-start","payload":[{"type":"frw","value":"2"}]}"#, "\n");
    let lines = run_lines(input, None).await;

    let not_ready = lines
        .iter()
        .find(|v| v["event"] == "configuration-not-ready")
        .unwrap();
    assert_eq!(not_ready["payload"]["index"], 0);
    assert!(!names(&lines).contains(&"motor.set-throttle".to_string()));
}

#[tokio::test]
async fn invalid_route_is_rejected() {
    let input = concat!(r#"{"event":"route-start","payload":[{"type":"left","value":"ninety"}]}"#, "\n");
    let lines = run_lines(input, Some(Settings::default())).await;

    assert!(names(&lines).contains(&"route-rejected".to_string()));
    assert!(!names(&lines).contains(&"motor.set-yaw".to_string()));
}

#[tokio::test]
async fn end_of_input_aborts_route_in_flight() {
    let input = concat!(r#"{"event":"route-start","payload":[{"type":"forward","value":50}]}"#, "\n");
    let lines = run_lines(input, Some(Settings::default())).await;
    let names = names(&lines);

    assert!(names.contains(&"motor.set-throttle".to_string()));
    assert!(names.contains(&"route-aborted".to_string()));
    assert!(!names.contains(&"route-completed".to_string()));
    let last_command = names
        .iter()
        .filter(|n| n.starts_with("motor.") || n.starts_with("hold."))
        .last();
    assert_eq!(last_command.map(String::as_str), Some("motor.all-stop"));
}
