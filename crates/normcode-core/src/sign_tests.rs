use crate::sign::*;

#[test]
fn parse_with_id() {
    let sign = PerceptualSign::parse("%{file_location}7f2(data/input.txt)").unwrap();
    assert_eq!(sign.norm(), "file_location");
    assert_eq!(sign.id(), Some("7f2"));
    assert_eq!(sign.signifier(), "data/input.txt");
}

#[test]
fn parse_without_id() {
    let sign = PerceptualSign::parse("%{truth_value}(True)").unwrap();
    assert_eq!(sign.norm(), "truth_value");
    assert_eq!(sign.id(), None);
    assert_eq!(sign.signifier(), "True");
}

#[test]
fn round_trip_display() {
    for text in [
        "%{file_location}7f2(data/input.txt)",
        "%{truth_value}(True)",
        "%{literal}(123)",
        "%{in-memory}deadbeef(slot 4)",
        "%{prompt_location}(prompts/extract digit.md)",
    ] {
        let sign = PerceptualSign::parse(text).unwrap();
        assert_eq!(sign.to_string(), text);
    }
}

#[test]
fn empty_signifier_is_fine() {
    let sign = PerceptualSign::parse("%{literal}()").unwrap();
    assert_eq!(sign.signifier(), "");
}

#[test]
fn rejects_missing_prefix() {
    assert_eq!(
        PerceptualSign::parse("{literal}(x)"),
        Err(SignParseError::MissingPrefix)
    );
}

#[test]
fn rejects_unterminated_norm() {
    assert_eq!(
        PerceptualSign::parse("%{literal(x)"),
        Err(SignParseError::UnterminatedNorm)
    );
}

#[test]
fn rejects_bad_id() {
    // Uppercase hex is not a valid id.
    assert!(matches!(
        PerceptualSign::parse("%{literal}DEAD(x)"),
        Err(SignParseError::BadId(_))
    ));
    // Longer than 8 chars.
    assert!(matches!(
        PerceptualSign::parse("%{literal}123456789(x)"),
        Err(SignParseError::BadId(_))
    ));
}

#[test]
fn rejects_unterminated_signifier() {
    assert_eq!(
        PerceptualSign::parse("%{literal}(x"),
        Err(SignParseError::UnterminatedSignifier)
    );
}

#[test]
fn serde_as_string() {
    let sign = PerceptualSign::parse("%{file_location}7f2(data/input.txt)").unwrap();
    let json = serde_json::to_string(&sign).unwrap();
    assert_eq!(json, r#""%{file_location}7f2(data/input.txt)""#);
    let back: PerceptualSign = serde_json::from_str(&json).unwrap();
    assert_eq!(back, sign);
}

#[test]
fn truth_shorthand() {
    assert_eq!(PerceptualSign::truth(true).to_string(), "%{truth_value}(True)");
    assert_eq!(PerceptualSign::truth(false).to_string(), "%{truth_value}(False)");
}
