//! Text cleaning ahead of sentiment classification.
//!
//! # Pipeline
//!
//! 1. **Unicode NFC normalization** - accented letters become single code points
//! 2. **URL removal** - `http...` and `www...` tokens
//! 3. **Mention removal** - `@user`
//! 4. **Hashtag markers** - `#` is dropped, the tagged word stays
//! 5. **Character filtering** - only letters, digits, whitespace and `.,!?-` survive
//! 6. **Whitespace normalization** - runs collapse to one space, edges trimmed
//!
//! ```
//! use xharvest::clean::clean_text;
//!
//! assert_eq!(clean_text("Check http://x.co now! #Go @bob"), "Check now! Go");
//! ```

use once_cell::sync::Lazy;
use regex::Regex;
use unicode_normalization::UnicodeNormalization;

static URL_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"http\S+|www\S+").expect("valid regex"));
static MENTION_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"@\w+").expect("valid regex"));
static DISALLOWED_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^\p{L}\p{N}\s.,!?\-]").expect("valid regex"));
static WHITESPACE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid regex"));

/// Clean a post's text for classification.
#[must_use]
pub fn clean_text(text: &str) -> String {
    let normalized: String = text.nfc().collect();
    let text = URL_RE.replace_all(&normalized, "");
    let text = MENTION_RE.replace_all(&text, "");
    let text = text.replace('#', "");
    let text = DISALLOWED_RE.replace_all(&text, "");
    WHITESPACE_RE.replace_all(&text, " ").trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_url_mention_and_hashtag_marker() {
        assert_eq!(clean_text("Check http://x.co now! #Go @bob"), "Check now! Go");
    }

    #[test]
    fn strips_www_links_and_https() {
        assert_eq!(
            clean_text("veja www.globo.com e https://ge.globo.com/futebol agora"),
            "veja e agora"
        );
    }

    #[test]
    fn keeps_allowed_punctuation_and_accents() {
        assert_eq!(
            clean_text("Não acredito... que golaço?! -- São Paulo, 2x1"),
            "Não acredito... que golaço?! -- São Paulo, 2x1"
        );
    }

    #[test]
    fn drops_emoji_and_symbols() {
        assert_eq!(clean_text("Vamos 🔥🔥 (verdão) & \"campeão\" :)"), "Vamos verdão campeão");
        assert_eq!(clean_text("snake_case"), "snakecase");
    }

    #[test]
    fn normalizes_decomposed_accents() {
        let decomposed = "Gre\u{0302}mio e\u{0301} campea\u{0303}o";
        assert_eq!(clean_text(decomposed), "Grêmio é campeão");
    }

    #[test]
    fn collapses_whitespace() {
        assert_eq!(clean_text("  a \n\t b   c  "), "a b c");
        assert_eq!(clean_text(""), "");
        assert_eq!(clean_text("@only #"), "");
    }

    #[test]
    fn cleaning_is_idempotent() {
        let once = clean_text("RT @user: Que jogo!!! #Palmeiras https://t.co/abc 🏆");
        assert_eq!(clean_text(&once), once);
    }
}
