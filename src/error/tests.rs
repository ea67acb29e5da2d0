use super::*;

#[test]
fn tokens_are_substituted() {
    let err = AdiError::not_found("Class ^CLS has no member called ^MEM")
        .token("CLS", "Point")
        .token("MEM", "z");
    assert_eq!(err.message(), "Class Point has no member called z");
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[test]
fn missing_token_leaves_message_alone() {
    let err = AdiError::invalid("Invalid access mode").token("MODE", "FOO");
    assert_eq!(err.message(), "Invalid access mode");
}

#[test]
fn conversion_error_reports_count() {
    let err = AdiError::conversion(3);
    assert_eq!(err.kind(), ErrorKind::Conversion { count: 3 });
    assert_eq!(err.to_string(), "3 data conversion error(s) occurred");
}

#[test]
fn display_includes_suggestions() {
    let err = AdiError::unknown_name(
        ErrorKind::InvalidArgument,
        "Unknown class name /INTEGR/",
        "INTEGR",
        ["INTEGER", "REAL", "DOUBLE"],
    );
    assert_eq!(err.suggestions(), &["did you mean 'INTEGER'?".to_string()]);
    assert!(err.to_string().contains("did you mean 'INTEGER'?"));
}

#[test]
fn levenshtein_basics() {
    assert_eq!(levenshtein_distance("", "abc"), 3);
    assert_eq!(levenshtein_distance("kitten", "sitting"), 3);
    assert_eq!(levenshtein_distance("Word", "WORD"), 0);
}

#[test]
fn similar_names_sorted_by_distance() {
    let names = find_similar_names("UWRD", ["UWORD", "WORD", "UBYTE"], 2);
    assert_eq!(names, vec!["UWORD".to_string(), "WORD".to_string()]);
}

#[test]
fn kind_codes_are_stable() {
    assert_eq!(ErrorKind::AlreadyMapped.code(), "MAPPED");
    assert_eq!(ErrorKind::Conversion { count: 2 }.to_string(), "CONER(2)");
}
