// tests/message_format.rs
// The exact line the composer types: sanitized text, prefix, separator,
// link. Mirrors what the chat writer does before touching the page.

use timeline_relay::sanitize::clean_message;
use timeline_relay::sink::compose_line;

fn relayed(prefix: &str, raw: &str, link: &str) -> String {
    compose_line(prefix, &clean_message(raw), link)
}

#[test]
fn multiline_post_becomes_one_line() {
    let line = relayed(
        "*AUTOMATED*: ",
        "Great game\n@Arsenal\nwin!",
        "https://x.com/a/status/9",
    );
    assert_eq!(
        line,
        "*AUTOMATED*: Great game @Arsenal win! | https://x.com/a/status/9"
    );
    assert!(!line.contains('\n'));
}

#[test]
fn typography_is_flattened_to_ascii() {
    let raw = "\u{201C}Big\u{201D} move \u{2013} it\u{2019}s close\u{2026}";
    let line = relayed("", raw, "https://x.com/a/status/10");
    assert_eq!(line, "\"Big\" move - it's close... | https://x.com/a/status/10");
    assert!(line.is_ascii());
}

#[test]
fn emoji_heavy_post_still_produces_clean_line() {
    let raw = "Arsenal \u{1F534} win \u{1F3C6}\nmore soon \u{26AA}";
    let line = relayed("*AUTOMATED*: ", raw, "https://x.com/a/status/11");
    assert_eq!(
        line,
        "*AUTOMATED*: Arsenal win more soon | https://x.com/a/status/11"
    );
}
