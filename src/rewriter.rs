use crate::docx::{DocxPackage, find_paragraphs, find_runs, xml_escape, xml_unescape};
use crate::error::FillError;
use crate::resolver::Mapping;
use crate::tag::TAG_REGEX;
use log::debug;

/// Counts reported by a document rewrite.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RewriteStats {
    /// Tag occurrences substituted with a resolved value.
    pub replaced: usize,
    /// Well-formed tag occurrences left in place because no key matched.
    pub unresolved: usize,
}

/// Result of rewriting one paragraph's concatenated text.
#[derive(Debug, PartialEq)]
pub struct ContainerRewrite {
    pub text: String,
    pub stats: RewriteStats,
}

/// Rewrite the full text of one container against the mapping.
///
/// Returns `None` when the text holds no tags at all, in which case the
/// container must be left entirely untouched. Otherwise every tag occurrence
/// is replaced, in scan order, by one literal substring substitution of its
/// exact bracketed form: a resolved tag becomes its value, an unresolved tag
/// is substituted by itself and so survives verbatim. Surrounding text that
/// happens to repeat a tag body without brackets is never touched.
pub fn rewrite_text(full_text: &str, mapping: &Mapping) -> Option<ContainerRewrite> {
    let bodies: Vec<String> = TAG_REGEX
        .captures_iter(full_text)
        .map(|caps| caps[1].to_string())
        .collect();
    if bodies.is_empty() {
        return None;
    }

    let mut text = full_text.to_string();
    let mut stats = RewriteStats::default();
    for body in &bodies {
        let tag = format!("[{}]", body);
        match mapping.get(body) {
            Some(value) => {
                text = text.replacen(&tag, value, 1);
                stats.replaced += 1;
            }
            None => {
                // Left as-is: the inert tag stays visible and searchable so a
                // reviewer can find it in the output document
                stats.unresolved += 1;
            }
        }
    }

    Some(ContainerRewrite { text, stats })
}

/// Outcome of rewriting a whole document part.
#[derive(Debug)]
pub struct RewriteOutcome {
    pub xml: String,
    pub stats: RewriteStats,
}

/// Rewrite every paragraph of the main document part.
///
/// Each paragraph's run texts are concatenated and scanned as one string, so
/// tags split across run boundaries by the authoring tool are still found.
/// A paragraph with no tags keeps its bytes exactly, run boundaries and
/// styling included. A paragraph with tags has all of its text collapsed into
/// the first run and the remaining runs emptied; the per-run styling of such
/// a paragraph is deliberately discarded. Paragraphs are patched back to
/// front so earlier spans stay valid.
pub fn rewrite_document_xml(xml: &str, mapping: &Mapping) -> RewriteOutcome {
    let mut result = xml.to_string();
    let mut stats = RewriteStats::default();

    for (p_start, p_end) in find_paragraphs(xml).into_iter().rev() {
        let para = &xml[p_start..p_end];
        let runs = find_runs(para);
        if runs.is_empty() {
            continue;
        }

        let full_text: String = runs.iter().map(|r| xml_unescape(&r.text)).collect();
        let Some(rewrite) = rewrite_text(&full_text, mapping) else {
            continue;
        };
        stats.replaced += rewrite.stats.replaced;
        stats.unresolved += rewrite.stats.unresolved;

        let mut new_para = para.to_string();
        for (i, run) in runs.iter().enumerate().rev() {
            let content = if i == 0 {
                xml_escape(&rewrite.text)
            } else {
                String::new()
            };
            new_para.replace_range(run.start..run.end, &content);
        }
        result.replace_range(p_start..p_end, &new_para);
    }

    RewriteOutcome { xml: result, stats }
}

/// Fill a whole document package against the mapping.
///
/// Parses the main document part, rewrites it, and re-serializes the package.
/// A package that cannot be parsed or re-serialized aborts the operation with
/// no partial output.
pub fn fill_document(
    mut package: DocxPackage,
    mapping: &Mapping,
) -> Result<(DocxPackage, RewriteStats), FillError> {
    let xml = package.document_xml()?;
    let outcome = rewrite_document_xml(&xml, mapping);
    debug!(
        "document rewrite: {} replaced, {} unresolved",
        outcome.stats.replaced, outcome.stats.unresolved
    );
    package.set_document_xml(outcome.xml);
    Ok((package, outcome.stats))
}

/// Convenience wrapper over [`fill_document`] for in-memory docx bytes.
pub fn fill_bytes(docx: &[u8], mapping: &Mapping) -> Result<(Vec<u8>, RewriteStats), FillError> {
    let package = DocxPackage::read_bytes(docx)?;
    let (package, stats) = fill_document(package, mapping)?;
    Ok((package.to_bytes()?, stats))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mapping(pairs: &[(&str, &str)]) -> Mapping {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn para(runs: &[&str]) -> String {
        let mut xml = String::from("<w:p><w:pPr><w:jc w:val=\"both\"/></w:pPr>");
        for run in runs {
            xml.push_str(&format!(
                "<w:r><w:rPr><w:b/></w:rPr><w:t>{}</w:t></w:r>",
                run
            ));
        }
        xml.push_str("</w:p>");
        xml
    }

    fn doc(paragraphs: &[String]) -> String {
        format!(
            "<w:document><w:body>{}</w:body></w:document>",
            paragraphs.concat()
        )
    }

    #[test]
    fn text_without_tags_is_not_rewritten() {
        let m = mapping(&[("Data:A1", "Alice")]);
        assert_eq!(rewrite_text("plain Data:A1 text", &m), None);
        assert_eq!(rewrite_text("", &m), None);
        assert_eq!(rewrite_text("[Data] [A1]", &m), None);
    }

    #[test]
    fn resolved_tag_is_substituted() {
        let m = mapping(&[("Data:A1", "Alice")]);
        let rewrite = rewrite_text("Hello [Data:A1]!", &m).unwrap();
        assert_eq!(rewrite.text, "Hello Alice!");
        assert_eq!(rewrite.stats.replaced, 1);
        assert_eq!(rewrite.stats.unresolved, 0);
    }

    #[test]
    fn unresolved_tag_is_inert() {
        let m = mapping(&[]);
        let rewrite = rewrite_text("[Data:A1]", &m).unwrap();
        assert_eq!(rewrite.text, "[Data:A1]");
        assert_eq!(rewrite.stats.unresolved, 1);

        // A second pass over the output is a fixed point
        let again = rewrite_text(&rewrite.text, &m).unwrap();
        assert_eq!(again.text, "[Data:A1]");
    }

    #[test]
    fn duplicate_tags_replace_each_occurrence() {
        let m = mapping(&[("Data:A1", "x")]);
        let rewrite = rewrite_text("[Data:A1] and [Data:A1]", &m).unwrap();
        assert_eq!(rewrite.text, "x and x");
        assert_eq!(rewrite.stats.replaced, 2);
    }

    #[test]
    fn unbracketed_body_text_is_left_alone() {
        let m = mapping(&[("Data:A1", "x")]);
        let rewrite = rewrite_text("Data:A1 is [Data:A1]", &m).unwrap();
        assert_eq!(rewrite.text, "Data:A1 is x");
    }

    #[test]
    fn mixed_resolved_and_unresolved_tags() {
        let m = mapping(&[("Data:A1", "Alice")]);
        let rewrite = rewrite_text("[Data:A1] owes [Data:B9]", &m).unwrap();
        assert_eq!(rewrite.text, "Alice owes [Data:B9]");
        assert_eq!(rewrite.stats.replaced, 1);
        assert_eq!(rewrite.stats.unresolved, 1);
    }

    #[test]
    fn paragraph_without_tags_is_byte_identical() {
        let xml = doc(&[para(&["Hello ", "world"]), para(&["[Data:A1]"])]);
        let m = mapping(&[("Data:A1", "X")]);
        let outcome = rewrite_document_xml(&xml, &m);

        // First paragraph untouched, run boundaries and styling included
        assert!(outcome.xml.contains(&para(&["Hello ", "world"])));
        assert!(!outcome.xml.contains("[Data:A1]"));
    }

    #[test]
    fn tag_split_across_runs_collapses_to_one_run() {
        let xml = doc(&[para(&["[Da", "ta:A1]"])]);
        let m = mapping(&[("Data:A1", "X")]);
        let outcome = rewrite_document_xml(&xml, &m);

        assert_eq!(outcome.stats.replaced, 1);
        // All text lands in the first run, the second is emptied
        assert!(outcome.xml.contains("<w:t>X</w:t>"));
        assert!(outcome.xml.contains("<w:t></w:t>"));
        assert!(!outcome.xml.contains("[Da"));
    }

    #[test]
    fn surrounding_text_survives_the_collapse() {
        let xml = doc(&[para(&["Dear [Data:", "A1], hello"])]);
        let m = mapping(&[("Data:A1", "Alice")]);
        let outcome = rewrite_document_xml(&xml, &m);
        assert!(outcome.xml.contains("<w:t>Dear Alice, hello</w:t>"));
    }

    #[test]
    fn rewrite_is_idempotent_once_resolved() {
        let xml = doc(&[para(&["[Data:A1]"]), para(&["[Gone:B2]"])]);
        let m = mapping(&[("Data:A1", "X")]);

        let first = rewrite_document_xml(&xml, &m);
        let second = rewrite_document_xml(&first.xml, &m);

        assert_eq!(first.xml, second.xml);
        assert_eq!(second.stats.replaced, 0);
        assert_eq!(second.stats.unresolved, 1);
    }

    #[test]
    fn empty_paragraph_before_a_tag_does_not_corrupt_the_document() {
        // Word inserts self-closing paragraphs with rsid attributes for every
        // blank line; rewriting the paragraph after one must not disturb the
        // surrounding markup
        let xml = concat!(
            r#"<w:document><w:body>"#,
            r#"<w:p w:rsidR="00AB12CD" w:rsidRDefault="00AB12CD"/>"#,
            r#"<w:p><w:r><w:t>[Data:A1]</w:t></w:r></w:p>"#,
            r#"</w:body></w:document>"#,
        );
        let m = mapping(&[("Data:A1", "X")]);
        let outcome = rewrite_document_xml(xml, &m);

        assert_eq!(
            outcome.xml,
            concat!(
                r#"<w:document><w:body>"#,
                r#"<w:p w:rsidR="00AB12CD" w:rsidRDefault="00AB12CD"/>"#,
                r#"<w:p><w:r><w:t>X</w:t></w:r></w:p>"#,
                r#"</w:body></w:document>"#,
            )
        );
        assert_eq!(outcome.stats.replaced, 1);
    }

    #[test]
    fn table_cell_paragraphs_are_rewritten() {
        let xml = format!(
            "<w:document><w:body><w:tbl><w:tr><w:tc>{}</w:tc></w:tr></w:tbl></w:body></w:document>",
            para(&["[Data:B2]"])
        );
        let m = mapping(&[("Data:B2", "42")]);
        let outcome = rewrite_document_xml(&xml, &m);
        assert!(outcome.xml.contains("<w:t>42</w:t>"));
    }

    #[test]
    fn replacement_values_are_xml_escaped() {
        let xml = doc(&[para(&["[Data:A1]"])]);
        let m = mapping(&[("Data:A1", "Smith & Sons <Ltd>")]);
        let outcome = rewrite_document_xml(&xml, &m);
        assert!(outcome.xml.contains("<w:t>Smith &amp; Sons &lt;Ltd&gt;</w:t>"));
    }

    #[test]
    fn escaped_run_text_is_decoded_before_matching() {
        // "&amp;" in the source XML is "&" in the document text
        let xml = doc(&[String::from(
            "<w:p><w:r><w:t>A &amp; B [Data:A1]</w:t></w:r></w:p>",
        )]);
        let m = mapping(&[("Data:A1", "C")]);
        let outcome = rewrite_document_xml(&xml, &m);
        assert!(outcome.xml.contains("<w:t>A &amp; B C</w:t>"));
    }

    #[test]
    fn unresolved_only_paragraph_still_collapses_runs() {
        let xml = doc(&[para(&["[No", "pe:Z9]"])]);
        let outcome = rewrite_document_xml(&xml, &mapping(&[]));
        assert_eq!(outcome.stats.unresolved, 1);
        assert!(outcome.xml.contains("<w:t>[Nope:Z9]</w:t>"));
    }
}
