//! Decoder for the XML emitted by `svn --xml` subcommands.
//!
//! Decoding is isolated from execution: a structurally invalid document is
//! a [`SvnError::Decode`], never a panic. Field-level oddities are softer —
//! a missing or garbled commit revision becomes [`UNKNOWN_REVISION`]
//! rather than an error, matching how the tool itself reports unversioned
//! metadata.

use crate::svn::{SvnEntry, SvnError, UNKNOWN_REVISION};
use roxmltree::{Document, Node};

fn child<'a, 'd>(node: Node<'a, 'd>, name: &str) -> Option<Node<'a, 'd>> {
    node.children().find(|n| n.has_tag_name(name))
}

fn child_text(node: Node<'_, '_>, name: &str) -> String {
    child(node, name)
        .and_then(|n| n.text())
        .unwrap_or_default()
        .trim()
        .to_string()
}

/// Extract (revision, author, date) from an entry's `<commit>` child.
fn commit_fields(entry: Node<'_, '_>) -> (i64, String, String) {
    let Some(commit) = child(entry, "commit") else {
        return (UNKNOWN_REVISION, String::new(), String::new());
    };
    let revision = commit
        .attribute("revision")
        .and_then(|v| v.parse::<i64>().ok())
        .unwrap_or(UNKNOWN_REVISION);
    (
        revision,
        child_text(commit, "author"),
        child_text(commit, "date"),
    )
}

/// Decode `svn info --xml` output into at most one entry.
///
/// A well-formed document with no `<entry>` yields `None`, which callers
/// report as "no info available".
pub fn decode_info(xml: &str) -> Result<Option<SvnEntry>, SvnError> {
    let doc = Document::parse(xml).map_err(|e| SvnError::Decode(e.to_string()))?;
    let root = doc.root_element();
    if !root.has_tag_name("info") {
        return Err(SvnError::Decode(format!(
            "expected <info> root, found <{}>",
            root.tag_name().name()
        )));
    }
    let Some(entry) = child(root, "entry") else {
        return Ok(None);
    };
    let (revision, author, date) = commit_fields(entry);
    Ok(Some(SvnEntry {
        kind: entry.attribute("kind").unwrap_or_default().to_string(),
        name: entry.attribute("path").unwrap_or_default().to_string(),
        revision,
        author,
        date,
    }))
}

/// Decode `svn list --xml` output into zero or more entries, in document
/// order.
pub fn decode_list(xml: &str) -> Result<Vec<SvnEntry>, SvnError> {
    let doc = Document::parse(xml).map_err(|e| SvnError::Decode(e.to_string()))?;
    let root = doc.root_element();
    if !root.has_tag_name("lists") {
        return Err(SvnError::Decode(format!(
            "expected <lists> root, found <{}>",
            root.tag_name().name()
        )));
    }
    let Some(list) = child(root, "list") else {
        return Err(SvnError::Decode("missing <list> element".to_string()));
    };

    let mut entries = Vec::new();
    for entry in list.children().filter(|n| n.has_tag_name("entry")) {
        let (revision, author, date) = commit_fields(entry);
        entries.push(SvnEntry {
            kind: entry.attribute("kind").unwrap_or_default().to_string(),
            name: child_text(entry, "name"),
            revision,
            author,
            date,
        });
    }
    Ok(entries)
}
