//! Scrubbing of credentials out of provider error text before it is logged
//! or returned.

const MAX_API_ERROR_CHARS: usize = 200;

/// Token prefixes issued by the social providers (Facebook user tokens,
/// Instagram graph tokens).
const TOKEN_PREFIXES: [&str; 3] = ["EAA", "IGQV", "IGAA"];

/// Parameter names whose values are credentials.
const SECRET_PARAMS: [&str; 3] = ["access_token=", "client_secret=", "code="];

const REDACTED: &str = "[REDACTED]";

fn is_secret_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | '%')
}

fn token_end(input: &str, from: usize) -> usize {
    let mut end = from;
    for (i, c) in input[from..].char_indices() {
        if is_secret_char(c) {
            end = from + i + c.len_utf8();
        } else {
            break;
        }
    }
    end
}

/// Replace `input[start + keep..end-of-token]` with `[REDACTED]` for every
/// occurrence of `marker`.
fn redact_after(scrubbed: &mut String, marker: &str, keep_marker: bool) {
    let mut search_from = 0;
    loop {
        let Some(rel) = scrubbed[search_from..].find(marker) else {
            break;
        };

        let start = search_from + rel;
        let content_start = start + marker.len();
        let end = token_end(scrubbed, content_start);

        if end == content_start {
            search_from = content_start;
            continue;
        }

        let replace_from = if keep_marker { content_start } else { start };
        scrubbed.replace_range(replace_from..end, REDACTED);
        search_from = replace_from + REDACTED.len();
    }
}

/// Scrub access tokens, client secrets and authorization codes.
pub fn scrub_secret_patterns(input: &str) -> String {
    let mut scrubbed = input.to_string();

    for param in SECRET_PARAMS {
        redact_after(&mut scrubbed, param, true);
    }
    for prefix in TOKEN_PREFIXES {
        redact_after(&mut scrubbed, prefix, false);
    }

    scrubbed
}

/// Sanitize API error text by scrubbing secrets and truncating length.
pub fn sanitize_api_error(input: &str) -> String {
    let scrubbed = scrub_secret_patterns(input);

    if scrubbed.chars().count() <= MAX_API_ERROR_CHARS {
        return scrubbed;
    }

    let mut end = MAX_API_ERROR_CHARS;
    while end > 0 && !scrubbed.is_char_boundary(end) {
        end -= 1;
    }

    format!("{}...", &scrubbed[..end])
}
