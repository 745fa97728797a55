// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Redaction of error strings destined for externally visible fields.
//!
//! Every error message written to status documents or surfaced through
//! the manager's status tracker passes through [`sanitize`]. The rules
//! run in a fixed order and the whole transform is idempotent, so already
//! sanitized text can safely be sanitized again.

use regex::Regex;
use std::sync::LazyLock;

// NOTE(expect): patterns are literals, exercised by every test below.
#[allow(clippy::expect_used)]
static PATH_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?:/[\w.\-]+)+/").expect("path pattern"));

#[allow(clippy::expect_used)]
static SECRET_VALUE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(bearer\s+|(?:token|apikey|password|secret)\s*[=:]\s*)\S+")
        .expect("secret pattern")
});

#[allow(clippy::expect_used)]
static BASE64_BLOB: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[A-Za-z0-9+/=]{41,}").expect("base64 pattern"));

/// Sanitize an error message for external visibility.
///
/// Applied in order:
/// 1. absolute-looking path runs (`/a/b/`) collapse to `[path]/`;
/// 2. values after `bearer `, `token=`/`:`, `apikey=`/`:`, `password=`/`:`,
///    `secret=`/`:` (case-insensitive) become `[REDACTED]`;
/// 3. base64-looking blobs longer than 40 characters become `[REDACTED]`.
pub fn sanitize(input: &str) -> String {
    let s = PATH_RUN.replace_all(input, "[path]/");
    let s = SECRET_VALUE.replace_all(&s, "${1}[REDACTED]");
    let s = BASE64_BLOB.replace_all(&s, "[REDACTED]");
    s.into_owned()
}

#[cfg(test)]
#[path = "sanitize_tests.rs"]
mod tests;
