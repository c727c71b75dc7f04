use std::sync::Arc;

type PrefixFn = dyn for<'a> Fn(&'a str) -> Option<&'a str> + Send + Sync;

/// Recognizes a leading token in a message body.
///
/// [`Prefix::matches`] returns the remainder of the body after the token, or
/// `None` when the body does not start with it. Only the first word is ever
/// inspected.
#[derive(Clone)]
pub struct Prefix(Arc<PrefixFn>);

impl std::fmt::Debug for Prefix {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Prefix")
    }
}

impl Prefix {
    pub fn new<F>(f: F) -> Self
    where
        F: for<'a> Fn(&'a str) -> Option<&'a str> + Send + Sync + 'static,
    {
        Self(Arc::new(f))
    }

    /// Matches the phrase `"<name>, "`, e.g. `"Discord, message alice hi"`.
    /// The name is compared case-insensitively; the comma is required.
    pub fn natural(name: &str) -> Self {
        let prefix = format!("{},", name.to_lowercase());
        Self::new(move |body| {
            let (first, tail) = pop_first_word(body)?;
            (first.to_lowercase() == prefix).then_some(tail)
        })
    }

    /// Matches `"/<name>"`, e.g. `"/message alice hi"`. Case-sensitive.
    pub fn slash(name: &str) -> Self {
        let prefix = format!("/{name}");
        Self::new(move |body| {
            let (first, tail) = pop_first_word(body)?;
            (first == prefix).then_some(tail)
        })
    }

    /// Matches a bare leading word, case-sensitively when `cased` is set.
    pub fn word(word: &str, cased: bool) -> Self {
        let word = if cased {
            word.to_string()
        } else {
            word.to_lowercase()
        };
        Self::new(move |body| {
            let (first, tail) = pop_first_word(body)?;
            let matched = if cased {
                first == word
            } else {
                first.to_lowercase() == word
            };
            matched.then_some(tail)
        })
    }

    /// Tries each prefix in order; the first one that matches wins.
    pub fn any(prefixes: impl IntoIterator<Item = Prefix>) -> Self {
        let prefixes: Vec<Prefix> = prefixes.into_iter().collect();
        Self::new(move |body| prefixes.iter().find_map(|p| p.matches(body)))
    }

    pub fn matches<'a>(&self, body: &'a str) -> Option<&'a str> {
        (self.0)(body)
    }
}

/// Split `body` into its first whitespace-delimited word and the rest.
///
/// Leading whitespace is skipped on both parts. Returns `None` for a blank
/// body.
pub fn pop_first_word(body: &str) -> Option<(&str, &str)> {
    let body = body.trim_start();
    if body.is_empty() {
        return None;
    }
    match body.find(char::is_whitespace) {
        Some(idx) => Some((&body[..idx], body[idx..].trim_start())),
        None => Some((body, "")),
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pop_first_word_splits_on_whitespace() {
        assert_eq!(pop_first_word("  hello   big world"), Some(("hello", "big world")));
        assert_eq!(pop_first_word("single"), Some(("single", "")));
        assert_eq!(pop_first_word("line\nbreak"), Some(("line", "break")));
        assert_eq!(pop_first_word("   "), None);
        assert_eq!(pop_first_word(""), None);
    }

    #[test]
    fn natural_prefix_ignores_name_case() {
        let p = Prefix::natural("Discord");
        assert_eq!(p.matches("discord, hello"), Some("hello"));
        assert_eq!(p.matches("DISCORD, send alice hi"), Some("send alice hi"));
        assert_eq!(p.matches("Discord,"), Some(""));
    }

    #[test]
    fn natural_prefix_requires_exact_comma_token() {
        let p = Prefix::natural("Discord");
        assert_eq!(p.matches("Discordx, hello"), None);
        assert_eq!(p.matches("Discord hello"), None);
        assert_eq!(p.matches("Discord,hello"), None);
        assert_eq!(p.matches("hello Discord, there"), None);
    }

    #[test]
    fn slash_prefix_is_case_sensitive() {
        let p = Prefix::slash("msg");
        assert_eq!(p.matches("/msg hi"), Some("hi"));
        assert_eq!(p.matches("/Msg hi"), None);
        assert_eq!(p.matches("msg hi"), None);
        assert_eq!(p.matches("/msgs hi"), None);
    }

    #[test]
    fn word_prefix_case_modes() {
        let cased = Prefix::word("Send", true);
        assert_eq!(cased.matches("Send it"), Some("it"));
        assert_eq!(cased.matches("send it"), None);

        let folded = Prefix::word("Send", false);
        assert_eq!(folded.matches("sEnD it"), Some("it"));
        assert_eq!(folded.matches("sender it"), None);
    }

    #[test]
    fn unmatched_body_yields_none() {
        let prefixes = [
            Prefix::natural("bot"),
            Prefix::slash("bot"),
            Prefix::word("bot", false),
        ];
        for p in &prefixes {
            assert_eq!(p.matches("hello there"), None);
            assert_eq!(p.matches(""), None);
        }
    }

    #[test]
    fn any_prefers_first_match() {
        let a = Prefix::new(|body| body.strip_prefix("ab"));
        let b = Prefix::new(|body| body.strip_prefix("a"));
        let p = Prefix::any([a, b]);
        assert_eq!(p.matches("abc"), Some("c"));
        assert_eq!(p.matches("ac"), Some("c"));
        assert_eq!(p.matches("xc"), None);
    }

    #[test]
    fn any_matches_when_either_matches() {
        let p = Prefix::any([Prefix::natural("ping"), Prefix::slash("ping")]);
        assert_eq!(p.matches("Ping, now"), Some("now"));
        assert_eq!(p.matches("/ping now"), Some("now"));
        assert_eq!(p.matches("pong now"), None);
    }
}
