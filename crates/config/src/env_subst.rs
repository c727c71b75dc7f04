/// Replace `${ENV_VAR}` and `${ENV_VAR:-fallback}` placeholders in raw
/// config text.
///
/// Unresolvable variables without a fallback are left as-is.
pub fn substitute_env(input: &str) -> String {
    substitute_env_with(input, |name| std::env::var(name).ok())
}

/// Same as [`substitute_env`] with a custom lookup, so tests need not touch
/// the process environment.
fn substitute_env_with(input: &str, lookup: impl Fn(&str) -> Option<String>) -> String {
    let mut result = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch != '$' || chars.peek() != Some(&'{') {
            result.push(ch);
            continue;
        }

        chars.next(); // '{'
        let mut inner = String::new();
        let mut closed = false;
        for c in chars.by_ref() {
            if c == '}' {
                closed = true;
                break;
            }
            inner.push(c);
        }

        if !closed || inner.is_empty() {
            result.push_str("${");
            result.push_str(&inner);
            if closed {
                result.push('}');
            }
            continue;
        }

        let (name, fallback) = match inner.split_once(":-") {
            Some((name, fallback)) => (name, Some(fallback)),
            None => (inner.as_str(), None),
        };
        match (lookup(name).filter(|v| !v.is_empty()), fallback) {
            (Some(val), _) => result.push_str(&val),
            (None, Some(fallback)) => result.push_str(fallback),
            (None, None) => {
                result.push_str("${");
                result.push_str(&inner);
                result.push('}');
            },
        }
    }

    result
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    fn lookup(name: &str) -> Option<String> {
        match name {
            "PARLEY_LISTEN" => Some(":8080".to_string()),
            "PARLEY_EMPTY" => Some(String::new()),
            _ => None,
        }
    }

    #[test]
    fn substitutes_known_var() {
        assert_eq!(
            substitute_env_with("listen_addr = \"${PARLEY_LISTEN}\"", lookup),
            "listen_addr = \":8080\""
        );
    }

    #[test]
    fn leaves_unknown_var() {
        assert_eq!(
            substitute_env_with("${PARLEY_NONEXISTENT_XYZ}", lookup),
            "${PARLEY_NONEXISTENT_XYZ}"
        );
    }

    #[test]
    fn fallback_used_for_missing_or_empty() {
        assert_eq!(substitute_env_with("${PARLEY_MISSING:-:9090}", lookup), ":9090");
        assert_eq!(substitute_env_with("${PARLEY_EMPTY:-x}", lookup), "x");
        assert_eq!(substitute_env_with("${PARLEY_LISTEN:-:9090}", lookup), ":8080");
    }

    #[test]
    fn unterminated_placeholder_is_literal() {
        assert_eq!(substitute_env_with("cost ${5", lookup), "cost ${5");
        assert_eq!(substitute_env_with("just $ sign", lookup), "just $ sign");
        assert_eq!(substitute_env_with("empty ${} braces", lookup), "empty ${} braces");
    }

    #[test]
    fn no_placeholders() {
        assert_eq!(substitute_env("plain text"), "plain text");
    }
}
