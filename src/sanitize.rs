// src/sanitize.rs
//! Message sanitizer: the chat composer receives a single ASCII line.
//! Multi-line posts, smart punctuation and emoji all have to be flattened
//! before typing, and mention line breaks must not glue a handle onto the
//! surrounding words.

use once_cell::sync::OnceCell;
use regex::Regex;

/// Flatten a post body into one plain-ASCII line. Output never contains a
/// raw newline.
pub fn clean_message(s: &str) -> String {
    // 1) Drop astral-plane chars (emoji etc.); the composer chokes on them.
    let mut out: String = s.chars().filter(|c| (*c as u32) <= 0xFFFF).collect();

    // 2) Smart quotes, dashes and ellipsis to ASCII.
    out = out
        .replace(['\u{2018}', '\u{2019}'], "'")
        .replace(['\u{201C}', '\u{201D}'], "\"")
        .replace(['\u{2013}', '\u{2014}'], "-")
        .replace('\u{2026}', "...");

    // 3) Rejoin mention line breaks so handles keep their spacing.
    static RE_NL_BEFORE_AT: OnceCell<Regex> = OnceCell::new();
    let re = RE_NL_BEFORE_AT.get_or_init(|| Regex::new(r"\n\s*@").unwrap());
    out = re.replace_all(&out, " @").to_string();

    static RE_NL_AFTER_AT: OnceCell<Regex> = OnceCell::new();
    let re = RE_NL_AFTER_AT.get_or_init(|| Regex::new(r"@(\w+)\s*\n").unwrap());
    out = re.replace_all(&out, "@$1 ").to_string();

    // 4) Collapse remaining newlines, then any whitespace runs.
    static RE_NL: OnceCell<Regex> = OnceCell::new();
    let re = RE_NL.get_or_init(|| Regex::new(r"\n+").unwrap());
    out = re.replace_all(&out, " ").to_string();

    static RE_WS: OnceCell<Regex> = OnceCell::new();
    let re = RE_WS.get_or_init(|| Regex::new(r"\s+").unwrap());
    out = re.replace_all(&out, " ").to_string();
    out = out.trim().to_string();

    // 5) Whatever survived that is still non-ASCII gets dropped; that can
    //    re-expose edge whitespace, so trim once more.
    let ascii: String = out.chars().filter(|c| c.is_ascii()).collect();
    ascii.trim().to_string()
}
