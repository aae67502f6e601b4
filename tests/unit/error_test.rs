//! Tests for error types

use prometheus_drain::core::{AddError, CodecError, CollectionError, SchedulerError, StoreError};

#[test]
fn test_disposed_error() {
    let err = SchedulerError::Disposed;
    assert_eq!(format!("{}", err), "scheduler has been disposed");
}

#[test]
fn test_missing_argument_error() {
    let err = SchedulerError::MissingArgument("callback");
    assert_eq!(format!("{}", err), "missing required argument: callback");
}

#[test]
fn test_invalid_config_error() {
    let err = SchedulerError::InvalidConfig("thread_name must not be empty".to_string());
    assert_eq!(
        format!("{}", err),
        "invalid configuration: thread_name must not be empty"
    );
}

#[test]
fn test_store_error_converts_into_scheduler_error() {
    let err: SchedulerError =
        CollectionError::from(StoreError::Backend("connection refused".to_string())).into();
    assert_eq!(
        format!("{}", err),
        "collection error: store error: backend error: connection refused"
    );
}

#[test]
fn test_codec_error_display() {
    let err = CollectionError::from(CodecError::Decode("unexpected eof".to_string()));
    assert_eq!(format!("{}", err), "codec error: decode failed: unexpected eof");
}

#[test]
fn test_add_error_hands_item_back() {
    let err = AddError::Exhausted {
        item: "job-7",
        attempts: 3,
    };
    assert!(!err.is_disposed());
    assert_eq!(
        format!("{}", err),
        "backing collection rejected the item after 3 attempts"
    );
    assert_eq!(err.into_item(), "job-7");

    let err = AddError::Disposed(42);
    assert!(err.is_disposed());
    assert_eq!(format!("{:?}", err), "Disposed(..)");
    assert_eq!(err.into_item(), 42);
}
