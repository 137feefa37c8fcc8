//! DZX mark parsing
//!
//! DZX files come in more than one layout under the same extension and the
//! same namespace, with nothing in the file saying which one it is. Each
//! known layout is a [`DzxSchema`]; [`parse_dzx_str`] tries them in order
//! and keeps the first that yields marks.

use crate::error::{DzgError, FileType, Result};
use crate::types::{MarkSource, MarkStore};
use log::{debug, info, warn};
use quick_xml::events::Event;
use quick_xml::name::{Namespace, ResolveResult};
use quick_xml::NsReader;
use std::path::Path;

pub const DZX_NAMESPACE: &str = "www.geophysical.com/DZX/1.02";

/// Element on the path from the document root to a text node
#[derive(Debug, Clone, PartialEq)]
pub struct XmlElement {
    pub name: String,
    pub in_dzx_namespace: bool,
}

/// Text content together with the element path leading to it
#[derive(Debug, Clone, PartialEq)]
pub struct XmlLeaf {
    pub path: Vec<XmlElement>,
    pub text: String,
}

impl XmlLeaf {
    /// True when the path is `root / {dzx}top / *parts[0]* / *parts[1]* ...`,
    /// each later part matched as a substring of the local name
    fn matches(&self, top: &str, parts: &[&str]) -> bool {
        if self.path.len() != parts.len() + 2 {
            return false;
        }
        let child = &self.path[1];
        if !child.in_dzx_namespace || child.name != top {
            return false;
        }
        self.path[2..]
            .iter()
            .zip(parts)
            .all(|(element, part)| element.name.contains(part))
    }
}

/// Flatten an XML document into its text leaves
pub fn read_leaves(xml: &str) -> Result<Vec<XmlLeaf>> {
    let mut reader = NsReader::from_str(xml);
    reader.trim_text(true);

    let mut stack: Vec<XmlElement> = Vec::new();
    let mut leaves = Vec::new();
    loop {
        match reader.read_resolved_event()? {
            (ns, Event::Start(e)) => {
                let in_dzx_namespace = matches!(
                    ns,
                    ResolveResult::Bound(Namespace(uri)) if uri == DZX_NAMESPACE.as_bytes()
                );
                stack.push(XmlElement {
                    name: String::from_utf8_lossy(e.local_name().as_ref()).into_owned(),
                    in_dzx_namespace,
                });
            }
            (_, Event::End(_)) => {
                stack.pop();
            }
            (_, Event::Text(t)) => {
                leaves.push(XmlLeaf {
                    path: stack.clone(),
                    text: t.unescape()?.into_owned(),
                });
            }
            (_, Event::CData(c)) => {
                leaves.push(XmlLeaf {
                    path: stack.clone(),
                    text: String::from_utf8_lossy(&c).into_owned(),
                });
            }
            (_, Event::Eof) => break,
            _ => {}
        }
    }
    Ok(leaves)
}

/// One known DZX layout
pub trait DzxSchema {
    fn name(&self) -> &'static str;

    fn source(&self) -> MarkSource;

    /// Scan text carried by `leaf`, if the leaf is a mark in this layout
    fn mark_text<'a>(&self, leaf: &'a XmlLeaf) -> Option<&'a str>;

    /// The part of the mark text holding the scan number
    fn scan_field<'a>(&self, text: &'a str) -> &'a str {
        text
    }

    /// Collect marks from the document. `None` means the layout did not
    /// match: no marks beyond the implicit start were found.
    fn extract(&self, leaves: &[XmlLeaf]) -> Result<Option<MarkStore>> {
        let source = self.source();
        let mut store = MarkStore::new(source);
        for text in leaves.iter().filter_map(|leaf| self.mark_text(leaf)) {
            let scan = parse_scan(self.scan_field(text), text)?;
            if scan < 0 || (scan == 0 && source.seeds_start()) {
                warn!(
                    "discarding {} mark at scan {} (duplicate of the start mark)",
                    self.name(),
                    scan
                );
                continue;
            }
            store.push(scan as u64);
        }
        Ok((store.len() > 1).then_some(store))
    }
}

/// Marks nested under `TargetGroup/TargetWayPt/scanSampChanProp`
pub struct TargetGroupSchema;

impl DzxSchema for TargetGroupSchema {
    fn name(&self) -> &'static str {
        "TargetGroup"
    }

    fn source(&self) -> MarkSource {
        MarkSource::DzxTargetGroup
    }

    fn mark_text<'a>(&self, leaf: &'a XmlLeaf) -> Option<&'a str> {
        leaf.matches("TargetGroup", &["TargetWayPt", "scanSampChanProp"])
            .then_some(leaf.text.as_str())
    }

    // "scan,sample,channel"
    fn scan_field<'a>(&self, text: &'a str) -> &'a str {
        text.split(',').next().unwrap_or("")
    }
}

/// Marks nested under `File/Profile/WayPt/scan`
pub struct FileSchema;

impl DzxSchema for FileSchema {
    fn name(&self) -> &'static str {
        "File"
    }

    fn source(&self) -> MarkSource {
        MarkSource::DzxFile
    }

    fn mark_text<'a>(&self, leaf: &'a XmlLeaf) -> Option<&'a str> {
        leaf.matches("File", &["Profile", "WayPt", "scan"])
            .then_some(leaf.text.as_str())
    }
}

/// Known layouts, in the order they are tried
pub fn known_schemas() -> Vec<Box<dyn DzxSchema>> {
    vec![Box::new(TargetGroupSchema), Box::new(FileSchema)]
}

fn parse_scan(field: &str, text: &str) -> Result<i64> {
    field.trim().parse::<i64>().map_err(|_| {
        DzgError::format(
            FileType::Dzx,
            format!("mark scan number '{}' is not an integer", text.trim()),
        )
    })
}

/// Parse DZX marks from XML text
pub fn parse_dzx_str(xml: &str) -> Result<MarkStore> {
    let leaves = read_leaves(xml)?;
    let schemas = known_schemas();
    let names: Vec<&str> = schemas.iter().map(|s| s.name()).collect();
    info!(
        "testing DZX data type (currently supported types are {})",
        names
            .iter()
            .map(|n| format!("\"{}\"", n))
            .collect::<Vec<_>>()
            .join(" and ")
    );

    for schema in &schemas {
        match schema.extract(&leaves)? {
            Some(store) => {
                info!("DZX type is \"{}\"", schema.name());
                debug!("DZX marks: {:?}", store.scans);
                return Ok(store);
            }
            None => warn!("DZX type is not \"{}\"", schema.name()),
        }
    }

    Err(DzgError::format(
        FileType::Dzx,
        format!(
            "no marks found using any known DZX schema (tried {})",
            names.join(", ")
        ),
    ))
}

/// Read and parse a DZX file
pub fn read_dzx(path: &Path) -> Result<MarkStore> {
    let xml = std::fs::read_to_string(path)?;
    let store = parse_dzx_str(&xml)?;
    info!(
        "DZX read successful. marks: {}, traces: {}",
        store.len(),
        store.last_scan().unwrap_or(0)
    );
    Ok(store)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn target_group(scans: &[&str]) -> String {
        let waypoints: String = scans
            .iter()
            .map(|s| {
                format!(
                    "<TargetWayPt><scanSampChanProp>{},0,0</scanSampChanProp><Name>m</Name></TargetWayPt>",
                    s
                )
            })
            .collect();
        format!(
            r#"<?xml version="1.0"?><DZX xmlns="{}"><TargetGroup><Name>marks</Name>{}</TargetGroup></DZX>"#,
            DZX_NAMESPACE, waypoints
        )
    }

    fn file_layout(scans: &[&str]) -> String {
        let waypoints: String = scans
            .iter()
            .map(|s| format!("<WayPt><scan>{}</scan><distance>0</distance></WayPt>", s))
            .collect();
        format!(
            r#"<DZX xmlns="{}"><File><Profile><Name>p</Name>{}</Profile></File></DZX>"#,
            DZX_NAMESPACE, waypoints
        )
    }

    #[test]
    fn test_target_group_seeds_start_mark() {
        let store = parse_dzx_str(&target_group(&["120", "340"])).unwrap();
        assert_eq!(store.source, MarkSource::DzxTargetGroup);
        assert_eq!(store.scans, vec![0, 120, 340]);
    }

    #[test]
    fn test_target_group_discards_duplicate_start() {
        let store = parse_dzx_str(&target_group(&["0", "120", "-3", "340"])).unwrap();
        assert_eq!(store.scans, vec![0, 120, 340]);
    }

    #[test]
    fn test_falls_back_to_file_layout() {
        let store = parse_dzx_str(&file_layout(&["0", "512", "1024"])).unwrap();
        assert_eq!(store.source, MarkSource::DzxFile);
        assert_eq!(store.scans, vec![0, 512, 1024]);
    }

    #[test]
    fn test_file_layout_scan_must_be_a_single_integer() {
        let err = parse_dzx_str(&file_layout(&["0", "12,7", "1024"])).unwrap_err();
        match err {
            DzgError::Format { file_type, message } => {
                assert_eq!(file_type, FileType::Dzx);
                assert!(message.contains("12,7"), "message {}", message);
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn test_target_group_takes_scan_from_first_field() {
        let store = parse_dzx_str(&target_group(&["120", "340"])).unwrap();
        assert_eq!(store.scans, vec![0, 120, 340]);
        assert_eq!(TargetGroupSchema.scan_field("340,12,1"), "340");
        assert_eq!(FileSchema.scan_field("340,12,1"), "340,12,1");
    }

    #[test]
    fn test_file_layout_drops_negative_scans() {
        let store = parse_dzx_str(&file_layout(&["-1", "512", "1024"])).unwrap();
        assert_eq!(store.scans, vec![512, 1024]);
    }

    #[test]
    fn test_unknown_layout_names_both_schemas() {
        let xml = format!(r#"<DZX xmlns="{}"><Other><scan>5</scan></Other></DZX>"#, DZX_NAMESPACE);
        let err = parse_dzx_str(&xml).unwrap_err();
        match err {
            DzgError::Format { file_type, message } => {
                assert_eq!(file_type, FileType::Dzx);
                assert!(message.contains("TargetGroup"));
                assert!(message.contains("File"));
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn test_target_group_with_only_start_mark_does_not_match() {
        // A lone duplicate start mark leaves the seeded store at one entry
        let err = parse_dzx_str(&target_group(&["0"])).unwrap_err();
        assert!(matches!(err, DzgError::Format { .. }));
    }

    #[test]
    fn test_namespace_is_required() {
        let xml = target_group(&["120", "340"]).replace(DZX_NAMESPACE, "urn:other");
        assert!(parse_dzx_str(&xml).is_err());
    }

    #[test]
    fn test_non_integer_scan_is_format_error() {
        let err = parse_dzx_str(&target_group(&["abc"])).unwrap_err();
        assert!(err.to_string().contains("abc"));
    }

    #[test]
    fn test_malformed_xml() {
        let err = parse_dzx_str("<DZX><TargetGroup></DZX>").unwrap_err();
        assert!(matches!(err, DzgError::Xml(_)));
    }
}
