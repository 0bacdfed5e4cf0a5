//! BODYSTRUCTURE traversal.
//!
//! Flattens a parsed BODYSTRUCTURE tree into an ordered list of part
//! descriptors with dotted 1-based section paths, ready for
//! `BODY.PEEK[<section>]` fetches. The walker performs no decoding and no
//! I/O; the engine fetches each planned section and the MIME decoder
//! handles content afterwards.

use crate::parser::{BodyStructure, Disposition};

/// One fetchable part of a message, in traversal order.
#[derive(Debug, Clone, PartialEq)]
pub struct PartPlan {
    /// Dotted 1-based section path (`1`, `1.2.1`); `0` for the synthetic
    /// descriptor of a multipart root.
    pub section: String,
    /// Top-level media type, uppercased as parsed.
    pub media_type: String,
    /// Media subtype, uppercased as parsed.
    pub media_subtype: String,
    /// Content-Disposition, when the server reported one.
    pub disposition: Option<Disposition>,
    /// Content-Transfer-Encoding, lowercased.
    pub encoding: String,
    /// Filename from the disposition parameters or the `name` body
    /// parameter, matched case-insensitively.
    pub filename: Option<String>,
    /// Content-ID with the angle brackets trimmed.
    pub content_id: Option<String>,
    /// Declared charset body parameter, if any.
    pub charset: Option<String>,
    /// True for the synthetic multipart-root descriptor; it carries no
    /// bytes and no fetch is issued for it.
    pub is_container: bool,
}

/// Flattens a BODYSTRUCTURE into fetchable part descriptors.
///
/// Depth-first: a single-part node at the root becomes section `1`;
/// multipart children at index `i` extend the path with `i + 1`. A
/// multipart root additionally appends a synthetic part `0` descriptor so
/// container metadata survives for the caller.
#[must_use]
pub fn flatten_structure(structure: &BodyStructure) -> Vec<PartPlan> {
    let mut parts = Vec::new();
    walk(structure, &mut Vec::new(), &mut parts);

    if let BodyStructure::Multipart { subtype, .. } = structure {
        parts.push(PartPlan {
            section: "0".to_string(),
            media_type: "MULTIPART".to_string(),
            media_subtype: subtype.clone(),
            disposition: None,
            encoding: String::new(),
            filename: None,
            content_id: None,
            charset: None,
            is_container: true,
        });
    }

    parts
}

fn walk(node: &BodyStructure, path: &mut Vec<u32>, out: &mut Vec<PartPlan>) {
    match node {
        BodyStructure::Multipart { parts, .. } => {
            for (i, child) in parts.iter().enumerate() {
                #[allow(clippy::cast_possible_truncation)]
                path.push(i as u32 + 1);
                walk(child, path, out);
                path.pop();
            }
        }
        _ => out.push(describe(node, path)),
    }
}

fn describe(node: &BodyStructure, path: &[u32]) -> PartPlan {
    let section = if path.is_empty() {
        // A single-part message still has its body addressable as part 1.
        "1".to_string()
    } else {
        path.iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(".")
    };

    let disposition = node.extension().and_then(|e| e.disposition.clone());
    let filename = disposition
        .as_ref()
        .and_then(|d| d.param("filename"))
        .or_else(|| param(node.params(), "name"))
        .map(ToString::to_string);

    PartPlan {
        section,
        media_type: node.media_type().to_string(),
        media_subtype: node.media_subtype().to_string(),
        encoding: node.encoding().to_lowercase(),
        filename,
        content_id: node
            .content_id()
            .map(|id| id.trim_matches(['<', '>']).to_string()),
        charset: param(node.params(), "charset").map(ToString::to_string),
        disposition,
        is_container: false,
    }
}

fn param<'a>(params: &'a [(String, String)], name: &str) -> Option<&'a str> {
    params
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case(name))
        .map(|(_, v)| v.as_str())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::parser::PartExtension;

    fn text(subtype: &str) -> BodyStructure {
        BodyStructure::Text {
            subtype: subtype.to_string(),
            params: vec![("CHARSET".to_string(), "utf-8".to_string())],
            id: None,
            description: None,
            encoding: "QUOTED-PRINTABLE".to_string(),
            size: 100,
            lines: 5,
            extension: None,
        }
    }

    fn basic(media_type: &str, subtype: &str, filename: Option<&str>) -> BodyStructure {
        BodyStructure::Basic {
            media_type: media_type.to_string(),
            media_subtype: subtype.to_string(),
            params: vec![],
            id: Some("<cid-1>".to_string()),
            description: None,
            encoding: "BASE64".to_string(),
            size: 2048,
            extension: filename.map(|f| PartExtension {
                md5: None,
                disposition: Some(Disposition {
                    name: "attachment".to_string(),
                    params: vec![("filename".to_string(), f.to_string())],
                }),
                language: Vec::new(),
                location: None,
                raw: None,
            }),
        }
    }

    fn multipart(subtype: &str, parts: Vec<BodyStructure>) -> BodyStructure {
        BodyStructure::Multipart {
            parts,
            subtype: subtype.to_string(),
            params: vec![],
            extension: None,
        }
    }

    #[test]
    fn single_part_root_is_section_one() {
        let parts = flatten_structure(&text("PLAIN"));
        assert_eq!(parts.len(), 1);
        assert_eq!(parts[0].section, "1");
        assert_eq!(parts[0].media_type, "TEXT");
        assert_eq!(parts[0].encoding, "quoted-printable");
        assert_eq!(parts[0].charset.as_deref(), Some("utf-8"));
    }

    #[test]
    fn nested_multipart_sections_in_order() {
        // multipart/alternative [text/plain, text/html,
        //   multipart/mixed [image/png, application/pdf]]
        let tree = multipart(
            "ALTERNATIVE",
            vec![
                text("PLAIN"),
                text("HTML"),
                multipart(
                    "MIXED",
                    vec![
                        basic("IMAGE", "PNG", None),
                        basic("APPLICATION", "PDF", Some("r.pdf")),
                    ],
                ),
            ],
        );

        let parts = flatten_structure(&tree);
        let sections: Vec<&str> = parts.iter().map(|p| p.section.as_str()).collect();
        assert_eq!(sections, vec!["1", "2", "3.1", "3.2", "0"]);

        // The synthetic container descriptor preserves the root subtype.
        let container = parts.last().unwrap();
        assert!(container.is_container);
        assert_eq!(container.media_subtype, "ALTERNATIVE");
    }

    #[test]
    fn filename_from_disposition() {
        let parts = flatten_structure(&basic("APPLICATION", "PDF", Some("report.pdf")));
        assert_eq!(parts[0].filename.as_deref(), Some("report.pdf"));
        assert!(parts[0].disposition.as_ref().unwrap().is_attachment());
    }

    #[test]
    fn filename_falls_back_to_name_param() {
        let node = BodyStructure::Basic {
            media_type: "IMAGE".to_string(),
            media_subtype: "PNG".to_string(),
            params: vec![("NAME".to_string(), "pic.png".to_string())],
            id: None,
            description: None,
            encoding: "BASE64".to_string(),
            size: 10,
            extension: None,
        };
        let parts = flatten_structure(&node);
        assert_eq!(parts[0].filename.as_deref(), Some("pic.png"));
    }

    #[test]
    fn content_id_trims_brackets() {
        let parts = flatten_structure(&basic("IMAGE", "PNG", None));
        assert_eq!(parts[0].content_id.as_deref(), Some("cid-1"));
    }

    #[test]
    fn message_rfc822_is_one_part() {
        let tree = BodyStructure::Message {
            params: vec![],
            id: None,
            description: None,
            encoding: "7BIT".to_string(),
            size: 512,
            envelope: Box::new(crate::parser::Envelope::default()),
            body: Box::new(text("PLAIN")),
            lines: 12,
            extension: None,
        };
        let parts = flatten_structure(&tree);
        assert_eq!(parts.len(), 1);
        assert_eq!(parts[0].media_type, "MESSAGE");
        assert_eq!(parts[0].section, "1");
    }
}
