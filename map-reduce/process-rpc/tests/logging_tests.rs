use page_map_reduce_rpc::logging::log_filter;

#[test]
fn test_rust_log_is_used_as_given() {
    for verbose in [false, true] {
        let filter = log_filter(Some("page_map_reduce=trace"), verbose)
            .unwrap()
            .to_string();
        assert!(filter.contains("page_map_reduce=trace"), "{filter}");
        assert!(!filter.contains("page_map_reduce=info"), "{filter}");
        assert!(!filter.contains("page_map_reduce=debug"), "{filter}");
    }
}

#[test]
fn test_defaults_apply_without_rust_log() {
    for rust_log in [None, Some(""), Some("  ")] {
        let filter = log_filter(rust_log, false).unwrap().to_string();
        assert!(filter.contains("page_map_reduce=info"), "{filter}");
        assert!(filter.contains("page_mr=info"), "{filter}");
    }

    let filter = log_filter(None, true).unwrap().to_string();
    assert!(filter.contains("page_map_reduce=debug"), "{filter}");
}

#[test]
fn test_malformed_rust_log_is_an_error() {
    assert!(log_filter(Some("page_map_reduce=loud"), false).is_err());
}
