// tests/filter_rules.rs
// Hand-picked cases for the keyword gate, built over the public config
// surface the daemon itself uses.

use timeline_relay::config::RelayConfig;
use timeline_relay::FilterEngine;

const TEST_TOML: &str = r##"
[source]
accounts = ["David_Ornstein", "HandofArsenal", "SamiMokbel_BBC"]
accept_all = ["HandofArsenal"]
keywords = ["Arsenal", "#AFC", "Gunners", "Emirates"]

[sink]
chat_name = "Arteta FC"
"##;

fn eng() -> FilterEngine {
    let cfg = RelayConfig::from_toml_str(TEST_TOML).unwrap();
    FilterEngine::from_config(&cfg.source).unwrap()
}

#[test]
fn hashtag_matches_only_complete_tags() {
    let e = eng();
    assert!(e.matches("David_Ornstein", "Great day for #AFC fans"));
    assert!(e.matches("David_Ornstein", "top of the table #AFC"));
    assert!(e.matches("David_Ornstein", "#AFC!"));
    assert!(!e.matches("David_Ornstein", "#AFCB win again"));
    assert!(!e.matches("David_Ornstein", "#AFCWimbledon news"));
}

#[test]
fn words_match_on_boundaries_only() {
    let e = eng();
    assert!(e.matches("SamiMokbel_BBC", "Arsenal closing in on a deal"));
    assert!(e.matches("SamiMokbel_BBC", "deal close (Arsenal)"));
    assert!(!e.matches("SamiMokbel_BBC", "the Arsenalization of football"));
    assert!(!e.matches("SamiMokbel_BBC", "GunnersBlog roundup"));
}

#[test]
fn matching_is_case_insensitive() {
    let e = eng();
    assert!(e.matches("David_Ornstein", "ARSENAL have agreed terms"));
    assert!(e.matches("David_Ornstein", "big night at the emirates"));
    assert!(e.matches("David_Ornstein", "#afc till I die"));
}

#[test]
fn accept_all_origin_passes_everything() {
    let e = eng();
    assert!(e.matches("HandofArsenal", "completely unrelated words"));
    assert!(e.matches("HANDOFARSENAL", "origin compare ignores case"));
    assert!(!e.matches("David_Ornstein", "completely unrelated words"));
}

#[test]
fn first_match_names_the_keyword() {
    let e = eng();
    assert_eq!(e.first_match("Gunners on top"), Some("Gunners"));
    assert_eq!(e.first_match("no football here"), None);
}
