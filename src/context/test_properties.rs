//! Property-based tests for the identifier grammars.
//!
//! Uses `proptest` to verify that every well-formed case ID and datastream
//! parses, decomposes back into its parts, and is found when embedded in a
//! longer path string, while malformed shapes are rejected.

use std::path::Path;

use proptest::prelude::*;

use super::{CaseId, ContextPatterns, DatastreamId, SITE_CODES, infer_from_path};

// ──────────────────── strategies ────────────────────

fn arb_site() -> impl Strategy<Value = &'static str> {
    prop::sample::select(&SITE_CODES[..])
}

fn arb_case_id() -> impl Strategy<Value = String> {
    ("[0-9]{6}", prop::option::of("[0-9]{1,3}")).prop_map(|(digits, revision)| match revision {
        Some(revision) => format!("D{digits}.{revision}"),
        None => format!("D{digits}"),
    })
}

fn arb_datastream() -> impl Strategy<Value = String> {
    (arb_site(), "[0-9A-Za-z_]{1,12}", "[0-9A-Za-z_]{2}")
        .prop_map(|(site, body, level)| format!("{site}{body}.{level}"))
}

fn arb_date_token() -> impl Strategy<Value = String> {
    ("[12]", "[0-9]{7}").prop_map(|(head, rest)| format!("{head}{rest}"))
}

// ──────────────────── property tests ────────────────────

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// Every generated case ID parses and round-trips through `as_str`.
    #[test]
    fn well_formed_case_ids_parse(case in arb_case_id()) {
        let parsed: CaseId = case.parse().expect("well-formed case ID");
        prop_assert_eq!(parsed.as_str(), case.as_str());
    }

    /// Surrounding whitespace never changes what a case ID parses to.
    #[test]
    fn case_ids_parse_with_surrounding_whitespace(case in arb_case_id()) {
        let parsed: CaseId = format!("  {case}\n").parse().expect("trimmed parse");
        prop_assert_eq!(parsed.as_str(), case.as_str());
    }

    /// Too few digits is never a case ID.
    #[test]
    fn truncated_case_ids_are_rejected(digits in "[0-9]{1,5}") {
        let err = format!("D{digits}").parse::<CaseId>().expect_err("must reject");
        prop_assert_eq!(err.code(), "VAT-2002");
    }

    /// Every generated datastream parses and decomposes into its parts.
    #[test]
    fn well_formed_datastreams_decompose(
        (site, body, level) in (arb_site(), "[0-9A-Za-z_]{1,12}", "[0-9A-Za-z_]{2}")
    ) {
        let name = format!("{site}{body}.{level}");
        let parsed: DatastreamId = name.parse().expect("well-formed datastream");
        let prefix = format!("{site}{body}");
        prop_assert_eq!(parsed.site(), site);
        prop_assert_eq!(parsed.level(), level.as_str());
        prop_assert_eq!(parsed.archive_prefix(), prefix.as_str());
    }

    /// Site codes are lowercase; an uppercase prefix is never a datastream.
    #[test]
    fn unknown_site_prefixes_are_rejected(fake_site in "[A-Z]{3}") {
        let err = format!("{fake_site}30ebbrC1.00")
            .parse::<DatastreamId>()
            .expect_err("must reject");
        prop_assert_eq!(err.code(), "VAT-2002");
    }

    /// A path assembled from valid identifiers always infers completely.
    #[test]
    fn constructed_case_paths_infer_completely(
        case in arb_case_id(),
        stream in arb_datastream(),
    ) {
        let path = format!("/reproc/{case}/{stream}");
        let inference = infer_from_path(Path::new(&path)).expect("grammars compile");
        let ctx = inference.complete().expect("complete inference");
        prop_assert_eq!(ctx.case_id.as_str(), case.as_str());
        prop_assert_eq!(ctx.datastream.as_str(), stream.as_str());
    }

    /// The scan returns the first date token when several are present.
    #[test]
    fn first_date_token_wins(
        first in arb_date_token(),
        second in arb_date_token(),
    ) {
        let patterns = ContextPatterns::new().expect("grammars compile");
        let hay = format!("x{first}y{second}z");
        prop_assert_eq!(patterns.find_date_token(&hay), Some(first));
    }

    /// Eight digits starting outside 1/2 never form a date token.
    #[test]
    fn wrong_century_is_not_a_date_token(token in "[03-9][0-9]{7}") {
        let patterns = ContextPatterns::new().expect("grammars compile");
        prop_assert_eq!(patterns.find_date_token(&token), None);
    }
}
