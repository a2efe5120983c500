/// Continuation token tests
///
/// Encode/decode behaviour of the public token codecs.
/// Run with: cargo test --test continuation_token_tests
use docfeed::token::{self, offset};
use docfeed::{ContinuationToken, OffsetContinuationToken, TakeContinuationToken, TokenParseError};

#[test]
fn test_offset_token_literal_round_trip() {
    let text = offset::encode(42, Some("asdf"));
    let parsed = offset::decode(&text).unwrap();

    assert_eq!(parsed.offset(), 42);
    assert_eq!(parsed.source_token(), Some("asdf"));
}

#[test]
fn test_offset_token_rejects_unrelated_json() {
    let parsed = OffsetContinuationToken::try_parse("{\"property\": \"Not a valid token\"}");
    assert!(parsed.is_err());
    assert!(!OffsetContinuationToken::is_valid("{\"property\": \"Not a valid token\"}"));
}

#[test]
fn test_offset_token_never_defaults_on_failure() {
    // A failed parse must not be mistaken for a fresh start at offset 0.
    for text in ["{}", "{\"sourceToken\":\"abc\"}", "{\"offset\":0}"] {
        assert!(offset::decode(text).is_err(), "{} should not decode", text);
    }
}

#[test]
fn test_offset_token_reencoding_is_idempotent() {
    let original = offset::encode(7, Some("+RID:~xyz#RT:2#TRC:10"));
    let reencoded = offset::decode(&original).unwrap().encode();
    assert_eq!(original, reencoded);
    assert_eq!(offset::decode(&reencoded).unwrap().offset(), 7);
}

#[test]
fn test_null_source_token_round_trips() {
    let token = OffsetContinuationToken::new(0, None);
    let parsed = OffsetContinuationToken::try_parse(&token.encode()).unwrap();
    assert_eq!(parsed.source_token(), None);
    assert_eq!(parsed, token);
}

#[test]
fn test_take_token_round_trip() {
    let token = TakeContinuationToken::new(3, Some("inner".to_string()));
    let parsed: TakeContinuationToken = token.to_string().parse().unwrap();
    assert_eq!(parsed.limit_count(), 3);
    assert_eq!(parsed.source_token(), Some("inner"));
}

#[test]
fn test_parse_errors_are_descriptive() {
    assert_eq!(
        OffsetContinuationToken::try_parse("[]"),
        Err(TokenParseError::NotAnObject)
    );
    assert_eq!(
        TakeContinuationToken::try_parse(r#"{"sourceToken":null}"#),
        Err(TokenParseError::MissingField("limitCount"))
    );
    assert!(matches!(
        OffsetContinuationToken::try_parse("not a token"),
        Err(TokenParseError::InvalidJson(_))
    ));
}

#[test]
fn test_describe_layers() {
    let inner = OffsetContinuationToken::new(2, Some("src".to_string()));
    let outer = TakeContinuationToken::new(8, Some(inner.encode()));

    let layers = token::describe(&outer.encode());
    assert_eq!(layers.limit_count, Some(8));
    assert_eq!(layers.offset, Some(2));
    assert_eq!(layers.source_token.as_deref(), Some("src"));
}
