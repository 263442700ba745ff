// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use tracing_subscriber::filter::ParseError;
use tracing_subscriber::EnvFilter;

/// Log filter for the `page-mr` processes.
///
/// A non-empty `rust_log` (the `RUST_LOG` value) is used as given. Otherwise
/// this crate family logs at info, or debug when `verbose`.
pub fn log_filter(rust_log: Option<&str>, verbose: bool) -> Result<EnvFilter, ParseError> {
    match rust_log.map(str::trim).filter(|directives| !directives.is_empty()) {
        Some(directives) => EnvFilter::builder().parse(directives),
        None => {
            let level = if verbose { "debug" } else { "info" };
            EnvFilter::builder().parse(format!("page_map_reduce={level},page_mr={level}"))
        }
    }
}
