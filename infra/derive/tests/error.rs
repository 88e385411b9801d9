use std::borrow::Cow;

#[fauna_derive::fauna_error]
pub enum SeedingError {
    #[error("Parse failure{}: {source}", format_context(.context))]
    Parse { source: std::num::ParseIntError, context: Option<Cow<'static, str>> },

    #[error("Missing {what}")]
    Missing { what: &'static str },

    #[error("Internal seeding error{}: {message}", format_context(.context))]
    Internal { message: Cow<'static, str>, context: Option<Cow<'static, str>> },
}

fn parse(raw: &str) -> Result<i64, SeedingError> {
    let value = raw.parse::<i64>()?;
    Ok(value)
}

#[test]
fn source_errors_convert_without_context() {
    let err = parse("nope").expect_err("should fail");
    assert!(matches!(err, SeedingError::Parse { context: None, .. }));
    assert!(err.to_string().starts_with("Parse failure: "));
}

#[test]
fn context_labels_source_results() {
    let err = "x".parse::<i64>().context("reading capacity").expect_err("should fail");
    assert!(err.to_string().starts_with("Parse failure (reading capacity): "));
}

#[test]
fn context_relabels_own_results() {
    let err = parse("x").context("seeding branch").expect_err("should fail");
    assert!(matches!(err, SeedingError::Parse { context: Some(ref c), .. } if c == "seeding branch"));
}

#[test]
fn context_skips_variants_without_slot() {
    let res: Result<(), SeedingError> = Err(SeedingError::Missing { what: "habitat" });
    let err = res.context("ignored").expect_err("should fail");
    assert_eq!(err.to_string(), "Missing habitat");
}

#[test]
fn strings_become_internal_errors() {
    let from_static = SeedingError::from("boom");
    let from_owned = SeedingError::from(String::from("bang"));
    assert_eq!(from_static.to_string(), "Internal seeding error: boom");
    assert_eq!(from_owned.to_string(), "Internal seeding error: bang");
}
