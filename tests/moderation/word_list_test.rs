//! Tests for `src/moderation/word_list.rs`.

use std::io::Write;

use meteobot::moderation::word_list::{parse_lines, WordFilter};

fn filter(patterns: &[&str]) -> WordFilter {
    WordFilter::from_patterns(patterns.iter().copied())
}

#[test]
fn parse_lines_skips_blanks_and_comments() {
    let parsed = parse_lines("# header\n\n  дурак  \nбляха\n   \n# tail\n");
    assert_eq!(parsed, vec!["дурак".to_owned(), "бляха".to_owned()]);
}

#[test]
fn matches_whole_words_case_insensitively() {
    let f = filter(&["дурак"]);
    assert!(f.is_match("ну ты дурак"));
    assert!(f.is_match("ДУРАК!"));
    assert!(!f.is_match("придурковатый"));
    assert!(!f.is_match("дураками"));
}

#[test]
fn patterns_are_regex_fragments() {
    let f = filter(&["дура(к|ки)"]);
    assert!(f.is_match("дураки"));
    assert!(f.is_match("дурак"));
    assert!(!f.is_match("дура"));
}

#[test]
fn invalid_patterns_are_skipped_individually() {
    let f = filter(&["(broken", "плохо"]);
    assert!(f.is_active());
    assert_eq!(f.pattern_count(), 1);
    assert!(f.is_match("это плохо"));
}

#[test]
fn empty_pattern_list_is_inactive() {
    let f = filter(&[]);
    assert!(!f.is_active());
    assert!(!f.is_match("anything"));
}

#[test]
fn load_reads_word_list_file() {
    let mut file = tempfile::NamedTempFile::new().expect("temp file should be created");
    assert!(writeln!(file, "# words\nдурак\nbadword").is_ok());

    let f = WordFilter::load(file.path());
    assert!(f.is_active());
    assert_eq!(f.pattern_count(), 2);
    assert!(f.is_match("a BADWORD here"));
}

#[test]
fn missing_word_list_yields_inactive_filter() {
    let tmp = tempfile::tempdir().expect("should create temp dir");
    let f = WordFilter::load(&tmp.path().join("absent.txt"));
    assert!(!f.is_active());
    assert!(!f.is_match("дурак"));
}

#[test]
fn comment_only_file_yields_inactive_filter() {
    let tmp = tempfile::tempdir().expect("should create temp dir");
    let path = tmp.path().join("words.txt");
    assert!(std::fs::write(&path, "# nothing yet\n\n").is_ok());
    assert!(!WordFilter::load(&path).is_active());
}
