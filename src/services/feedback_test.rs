use super::*;

fn feedback(message: &str) -> NewFeedback {
    NewFeedback { message: message.into(), category: None, page: None }
}

#[test]
fn prepare_trims_message_and_optional_fields() {
    let prepared = prepare(NewFeedback {
        message: "  icons look blurry ".into(),
        category: Some(" BUG ".into()),
        page: Some("   ".into()),
    })
    .unwrap();
    assert_eq!(prepared.message, "icons look blurry");
    assert_eq!(prepared.category.as_deref(), Some("bug"));
    assert_eq!(prepared.page, None);
}

#[test]
fn prepare_rejects_blank_message() {
    assert!(matches!(prepare(feedback(" \n ")), Err(FeedbackError::EmptyMessage)));
}

#[test]
fn prepare_rejects_overlong_message() {
    assert!(matches!(prepare(feedback(&"a".repeat(MESSAGE_MAX_LEN + 1))), Err(FeedbackError::MessageTooLong)));
    assert!(prepare(feedback(&"a".repeat(MESSAGE_MAX_LEN))).is_ok());
}

#[test]
fn status_parses_stored_values() {
    assert_eq!(FeedbackStatus::parse("Resolved").unwrap(), FeedbackStatus::Resolved);
    assert_eq!(FeedbackStatus::parse("new").unwrap().as_str(), "new");
    assert!(matches!(FeedbackStatus::parse("archived"), Err(FeedbackError::UnknownStatus(s)) if s == "archived"));
}

#[test]
fn query_defaults_to_all_statuses_newest_first() {
    let query: FeedbackQuery = serde_json::from_value(serde_json::json!({})).unwrap();
    assert_eq!(query.status, None);
    assert!(!query.oldest_first);
    let query: FeedbackQuery = serde_json::from_value(serde_json::json!({"status": "read"})).unwrap();
    assert_eq!(query.status, Some(FeedbackStatus::Read));
}
