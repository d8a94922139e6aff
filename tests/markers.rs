// tests/markers.rs

use encarun::sink::markers::{find_marker, message_of};
use encarun::sink::{LineKind, MarkerParser};
use encarun::types::Severity;

#[test]
fn recognises_the_tool_level_tags() {
    let cases = [
        ("2024-01-01 12:00:00 enca [CRITICAL] - boom", Severity::Error),
        ("2024-01-01 12:00:00 enca [ERROR] - bad", Severity::Error),
        ("2024-01-01 12:00:00 enca [WARNING] - hmm", Severity::Warning),
        ("2024-01-01 12:00:00 enca [INFO] - ok", Severity::Info),
        ("2024-01-01 12:00:00 enca [DEBUG] - detail", Severity::Info),
    ];
    for (line, expected) in cases {
        let (severity, _) = find_marker(line).expect("tag should be found");
        assert_eq!(severity, expected, "{line}");
    }
}

#[test]
fn lowercase_or_unbracketed_words_are_not_tags() {
    assert!(find_marker("an error occurred").is_none());
    assert!(find_marker("WARNING: not the logger format").is_none());
    assert!(find_marker("[warning] lowercase").is_none());
}

#[test]
fn message_strips_prefix_up_to_the_tag() {
    assert_eq!(
        message_of("2024-01-01 12:00:00 enca [WARNING] - missing year 2019"),
        "missing year 2019"
    );
    assert_eq!(message_of("plain text"), "plain text");
}

#[test]
fn untagged_lines_continue_the_previous_record() {
    let mut parser = MarkerParser::new();

    assert_eq!(
        parser.classify("Traceback (most recent call last):"),
        LineKind {
            severity: Severity::Info,
            continuation: false
        }
    );
    assert_eq!(
        parser.classify("t enca [ERROR] - processing failed"),
        LineKind {
            severity: Severity::Error,
            continuation: false
        }
    );
    assert_eq!(
        parser.classify("  File \"enca/run.py\", line 3"),
        LineKind {
            severity: Severity::Error,
            continuation: true
        }
    );
    assert_eq!(
        parser.classify("t enca [INFO] - next step"),
        LineKind {
            severity: Severity::Info,
            continuation: false
        }
    );
    assert_eq!(
        parser.classify("more info"),
        LineKind {
            severity: Severity::Info,
            continuation: true
        }
    );
}

#[test]
fn severity_parses_case_insensitively() {
    assert_eq!("critical".parse::<Severity>().ok(), Some(Severity::Error));
    assert_eq!("Warning".parse::<Severity>().ok(), Some(Severity::Warning));
    assert_eq!("DEBUG".parse::<Severity>().ok(), Some(Severity::Info));
    assert!("fatal".parse::<Severity>().is_err());
}
