use url::form_urlencoded;

const REDACTED_PARAMS: &[&str] = &["key", "signature"];

/// Mask credential-bearing query parameters so a URL can be logged.
pub(crate) fn redact_url(url: &str) -> String {
    let Some((base, query)) = url.split_once('?') else {
        return url.to_string();
    };

    let mut out = form_urlencoded::Serializer::new(String::new());
    for (name, value) in form_urlencoded::parse(query.as_bytes()) {
        if REDACTED_PARAMS.contains(&&*name) {
            out.append_pair(&name, "REDACTED");
        } else {
            out.append_pair(&name, &value);
        }
    }
    format!("{}?{}", base, out.finish())
}

/// Stand-in for a credential in `Debug` output.
pub(crate) fn redact_secret(value: &Option<String>) -> Option<&'static str> {
    value.as_ref().map(|_| "<redacted>")
}

pub(crate) fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    if body.len() <= MAX {
        return body.to_string();
    }
    let mut end = MAX;
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &body[..end])
}
