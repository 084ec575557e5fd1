//! Metadata-header parsing: pull the ingest command out of processed output.
//!
//! Processed files record the exact command line that produced them as a
//! `command` attribute in their metadata header. Dumped headers are
//! line-oriented CDL text such as
//!
//! ```text
//! :command = "ingest_sgp_ebbr -f input.dat";
//! ```
//!
//! The scan is byte-based and line-scoped: for each occurrence of the
//! attribute name, the surrounding line is searched for its first pair of
//! double quotes; the first non-empty quoted value wins.

#![allow(missing_docs)]

use memchr::{memchr, memmem};

/// Attribute name carrying the production command line.
pub const COMMAND_ATTRIBUTE: &str = "command";

/// Extract the first non-empty quoted value on a line mentioning the
/// `command` attribute. Returns `None` when no such line exists in `header`.
#[must_use]
pub fn extract_command_attribute(header: &[u8]) -> Option<String> {
    let needle = COMMAND_ATTRIBUTE.as_bytes();
    let mut start = 0;
    while let Some(rel) = memmem::find(&header[start..], needle) {
        let at = start + rel;
        let line_start = header[..at]
            .iter()
            .rposition(|&b| b == b'\n')
            .map_or(0, |i| i + 1);
        let line_end = memchr(b'\n', &header[at..]).map_or(header.len(), |i| at + i);

        if let Some(value) = first_quoted(&header[line_start..line_end])
            && !value.is_empty()
        {
            return Some(value);
        }
        start = at + needle.len();
    }
    None
}

fn first_quoted(line: &[u8]) -> Option<String> {
    let open = memchr(b'"', line)?;
    let rest = &line[open + 1..];
    let close = memchr(b'"', rest)?;
    String::from_utf8(rest[..close].to_vec()).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recovers_command_from_cdl_header() {
        let header = b"netcdf sgp30ebbrC1 {\n\
            // global attributes:\n\
            \t\t:command = \"ingest_sgp_ebbr -f input.dat\";\n\
            \t\t:process_version = \"v1.12\";\n}\n";
        assert_eq!(
            extract_command_attribute(header),
            Some("ingest_sgp_ebbr -f input.dat".to_string())
        );
    }

    #[test]
    fn header_without_the_attribute_yields_none() {
        let header = b":history = \"created 2018-02-04\";\n";
        assert_eq!(extract_command_attribute(header), None);
    }

    #[test]
    fn attribute_without_quotes_is_skipped() {
        let header = b":command = unquoted;\n:command = \"real_one\";\n";
        assert_eq!(
            extract_command_attribute(header),
            Some("real_one".to_string())
        );
    }

    #[test]
    fn empty_quoted_value_is_skipped() {
        let header = b":command = \"\";\n:command_line = \"fallback -x\";\n";
        assert_eq!(
            extract_command_attribute(header),
            Some("fallback -x".to_string())
        );
    }

    #[test]
    fn mention_inside_another_value_stays_line_scoped() {
        let header = b":history = \"reran the command by hand\";\n\
            :command = \"ingest_nsa_mfrsr -d 20180204\";\n";
        // The history line mentions the attribute name and has quotes, so the
        // line-scoped scan takes its value first, exactly like a line grep.
        assert_eq!(
            extract_command_attribute(header),
            Some("reran the command by hand".to_string())
        );
    }

    #[test]
    fn quotes_never_bridge_across_lines() {
        let header = b":command = no quotes on this line\n:note = \"aside\";\n";
        assert_eq!(extract_command_attribute(header), None);
    }

    #[test]
    fn non_utf8_quoted_bytes_are_skipped() {
        let header = b":command = \"\xff\xfe\";\n:command = \"clean_cmd\";\n";
        assert_eq!(
            extract_command_attribute(header),
            Some("clean_cmd".to_string())
        );
    }
}
