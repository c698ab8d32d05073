use super::*;

fn msg(id: &str, timestamp: &str) -> Message {
    Message {
        id: id.into(),
        content: format!("content {id}"),
        sender: "ana".into(),
        kind: MessageKind::Text,
        timestamp: timestamp.into(),
    }
}

// =============================================================================
// MessageKind
// =============================================================================

#[test]
fn kind_parse_accepts_known_names() {
    assert_eq!(MessageKind::parse("text"), Some(MessageKind::Text));
    assert_eq!(MessageKind::parse("image"), Some(MessageKind::Image));
    assert_eq!(MessageKind::parse("audio"), Some(MessageKind::Audio));
}

#[test]
fn kind_parse_rejects_unknown_and_wrong_case() {
    assert_eq!(MessageKind::parse("video"), None);
    assert_eq!(MessageKind::parse("Text"), None);
    assert_eq!(MessageKind::parse(""), None);
}

#[test]
fn kind_from_content_type_uses_category() {
    assert_eq!(MessageKind::from_content_type("image/png"), Some(MessageKind::Image));
    assert_eq!(MessageKind::from_content_type("IMAGE/JPEG"), Some(MessageKind::Image));
    assert_eq!(MessageKind::from_content_type("audio/mpeg"), Some(MessageKind::Audio));
    assert_eq!(MessageKind::from_content_type("video/mp4"), None);
    assert_eq!(MessageKind::from_content_type("text/plain"), None);
    assert_eq!(MessageKind::from_content_type(""), None);
}

#[test]
fn message_serializes_kind_under_type_key() {
    let json = serde_json::to_value(msg("a", "2024-01-01T00:00:00.000Z")).unwrap();
    assert_eq!(json["type"], "text");
    assert!(json.get("kind").is_none());
}

// =============================================================================
// NewMessage::into_message
// =============================================================================

#[test]
fn into_message_fills_id_and_timestamp() {
    let m = NewMessage::new("hi", "ana", MessageKind::Text).into_message().unwrap();
    assert!(Uuid::parse_str(&m.id).is_ok());
    assert!(parse_timestamp(&m.timestamp).is_some());
    assert!(m.timestamp.ends_with('Z'));
    assert_eq!(m.content, "hi");
    assert_eq!(m.sender, "ana");
    assert_eq!(m.kind, MessageKind::Text);
}

#[test]
fn into_message_keeps_supplied_id_and_timestamp() {
    let m = NewMessage::new("hi", "ana", MessageKind::Image)
        .with_id("client-1")
        .with_timestamp("2020-05-01T10:00:00.000Z")
        .into_message()
        .unwrap();
    assert_eq!(m.id, "client-1");
    assert_eq!(m.timestamp, "2020-05-01T10:00:00.000Z");
}

#[test]
fn into_message_treats_empty_id_as_absent() {
    let m = NewMessage::new("hi", "ana", MessageKind::Text).with_id("").into_message().unwrap();
    assert!(!m.id.is_empty());
}

#[test]
fn into_message_missing_sender_is_rejected() {
    let draft = NewMessage { sender: None, ..NewMessage::new("hi", "ana", MessageKind::Text) };
    assert_eq!(draft.into_message().unwrap_err(), ValidationError::MissingFields);
}

#[test]
fn into_message_empty_content_is_rejected() {
    let draft = NewMessage::new("", "ana", MessageKind::Text);
    assert_eq!(draft.into_message().unwrap_err(), ValidationError::MissingFields);
}

#[test]
fn into_message_unknown_kind_is_rejected() {
    let draft = NewMessage { kind: Some("video".into()), ..NewMessage::new("hi", "ana", MessageKind::Text) };
    assert_eq!(draft.into_message().unwrap_err(), ValidationError::InvalidKind("video".into()));
}

#[test]
fn new_message_skips_absent_fields_when_serialized() {
    let json = serde_json::to_value(NewMessage::new("hi", "ana", MessageKind::Audio)).unwrap();
    assert_eq!(json, serde_json::json!({"content": "hi", "sender": "ana", "type": "audio"}));
}

// =============================================================================
// Timestamps
// =============================================================================

#[test]
fn format_timestamp_pads_and_truncates_to_millis() {
    let at = time::macros::datetime!(2024-03-07 04:05:06.789123 UTC);
    assert_eq!(format_timestamp(at).unwrap(), "2024-03-07T04:05:06.789Z");
}

#[test]
fn format_timestamp_normalizes_offset() {
    let at = time::macros::datetime!(2024-03-07 04:05:06 +02:00);
    assert_eq!(format_timestamp(at).unwrap(), "2024-03-07T02:05:06.000Z");
}

#[test]
fn parse_timestamp_accepts_rfc3339_with_offset() {
    let a = parse_timestamp("2024-01-01T12:00:00+02:00").unwrap();
    let b = parse_timestamp("2024-01-01T10:00:00.000Z").unwrap();
    assert_eq!(a, b);
}

#[test]
fn parse_timestamp_reads_offsetless_forms_as_utc() {
    assert_eq!(
        parse_timestamp("2024-06-01T10:00:00").unwrap(),
        time::macros::datetime!(2024-06-01 10:00:00 UTC)
    );
    assert_eq!(
        parse_timestamp("2024-06-01T10:00:00.250").unwrap(),
        time::macros::datetime!(2024-06-01 10:00:00.25 UTC)
    );
    assert_eq!(parse_timestamp("2025-01-01").unwrap(), time::macros::datetime!(2025-01-01 00:00:00 UTC));
}

#[test]
fn now_timestamp_round_trips_through_parse() {
    let now = now_timestamp().unwrap();
    assert_eq!(now.len(), "2024-01-01T00:00:00.000Z".len());
    assert!(now.ends_with('Z'));
    assert!(parse_timestamp(&now).is_some());
}

#[test]
fn parse_timestamp_rejects_garbage() {
    assert!(parse_timestamp("yesterday").is_none());
    assert!(parse_timestamp("").is_none());
}

#[test]
fn sort_orders_by_instant_not_by_string() {
    let mut list = vec![
        msg("late", "2024-01-01T12:00:00+00:00"),
        msg("early", "2024-01-01T13:00:00+02:00"),
    ];
    sort_by_timestamp(&mut list);
    assert_eq!(list[0].id, "early");
    assert_eq!(list[1].id, "late");
}

#[test]
fn sort_puts_unparseable_first_and_is_stable() {
    let mut list = vec![
        msg("t2", "2024-01-02T00:00:00.000Z"),
        msg("same-a", "2024-01-01T00:00:00.000Z"),
        msg("bad", "not a date"),
        msg("same-b", "2024-01-01T00:00:00.000Z"),
    ];
    sort_by_timestamp(&mut list);
    let ids: Vec<&str> = list.iter().map(|m| m.id.as_str()).collect();
    assert_eq!(ids, ["bad", "same-a", "same-b", "t2"]);
}

#[test]
fn sort_mixes_offset_local_and_date_only_values() {
    let mut list = vec![
        msg("date2025", "2025-01-01"),
        msg("local2024", "2024-06-01T10:00:00"),
        msg("z2020", "2020-01-01T00:00:00.000Z"),
    ];
    sort_by_timestamp(&mut list);
    let ids: Vec<&str> = list.iter().map(|m| m.id.as_str()).collect();
    assert_eq!(ids, ["z2020", "local2024", "date2025"]);
}
