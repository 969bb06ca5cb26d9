// src/system/xml_patch.rs

//! Applies the `configXmlWidget` directives to a project's `config.xml`.
//!
//! This is deliberately not a general XML processor. It finds the root element,
//! locates the root's direct children, replaces every child whose name matches a
//! directive, and leaves the rest of the document byte-for-byte intact.

use crate::constants::CONFIG_XML_FILENAME;
use crate::models::{XmlContent, XmlElement, XmlNode};
use crate::system::executor::CommandRunner;
use lazy_static::lazy_static;
use regex::{Captures, Regex};
use std::collections::BTreeSet;
use std::env;
use std::fmt::Write;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

lazy_static! {
    // `$env(NAME)`, `$git(user.name)`, `$npm(registry)`
    static ref PLACEHOLDER_RE: Regex = Regex::new(r"\$(git|npm|env)\(([^)]+)\)").unwrap();
}

/// Attributes whose values may contain placeholders.
const SUBSTITUTED_ATTRIBUTES: [&str; 2] = ["href", "email"];
const INDENT: &str = "    ";

#[derive(Error, Debug)]
pub enum XmlPatchError {
    #[error(
        "config.xml cannot be found in directory '{0}'. Looks like the Cordova project was not created correctly."
    )]
    MissingConfigXml(PathBuf),
    #[error("Filesystem Error: {0}")]
    Io(#[from] std::io::Error),
    #[error("'{0}' has no root element.")]
    NoRootElement(PathBuf),
    #[error("Malformed XML near byte {0}.")]
    Malformed(usize),
}

/// Patches `<project_dir>/config.xml` in place and returns the new content.
pub fn adjust_config_xml(
    project_dir: &Path,
    directives: &[XmlElement],
    runner: &mut dyn CommandRunner,
) -> Result<String, XmlPatchError> {
    let path = project_dir.join(CONFIG_XML_FILENAME);
    if !path.is_file() {
        return Err(XmlPatchError::MissingConfigXml(project_dir.to_path_buf()));
    }

    let current = fs::read_to_string(&path)?;
    log::debug!("Old config.xml:\n{}", current);

    let mut resolve = |text: &str| substitute_placeholders(text, runner, project_dir);
    let patched = patch_document(&current, directives, &mut resolve).map_err(|e| match e {
        XmlPatchError::NoRootElement(_) => XmlPatchError::NoRootElement(path.clone()),
        other => other,
    })?;

    log::debug!("New config.xml:\n{}", patched);
    fs::write(&path, &patched)?;
    Ok(patched)
}

/// Replaces `$git(..)`, `$npm(..)` and `$env(..)` placeholders in `text`.
/// Anything that cannot be resolved becomes an empty string.
pub fn substitute_placeholders(text: &str, runner: &mut dyn CommandRunner, cwd: &Path) -> String {
    PLACEHOLDER_RE
        .replace_all(text, |caps: &Captures<'_>| {
            let kind = caps.get(1).map_or("", |m| m.as_str());
            let key = caps.get(2).map_or("", |m| m.as_str());
            let value = match kind {
                "env" => env::var(key).ok(),
                "git" => runner.capture(&format!("git config --get {}", key), cwd).ok(),
                "npm" => runner.capture(&format!("npm config get {}", key), cwd).ok(),
                _ => None,
            };
            match value {
                Some(v) => {
                    let v = v.trim_end_matches(['\n', '\r']).to_string();
                    if v == "undefined" { String::new() } else { v }
                }
                None => String::new(),
            }
        })
        .into_owned()
}

/// Applies `directives` to an XML document held in memory.
///
/// `resolve` is applied to element text and to substitutable attribute values.
pub fn patch_document(
    xml: &str,
    directives: &[XmlElement],
    resolve: &mut dyn FnMut(&str) -> String,
) -> Result<String, XmlPatchError> {
    let directives: Vec<&XmlElement> = directives
        .iter()
        .filter(|d| !d.element_name.is_empty())
        .collect();
    if directives.is_empty() {
        return Ok(xml.to_string());
    }

    let layout = scan(xml)?;
    let replaced: BTreeSet<&str> = directives.iter().map(|d| d.element_name.as_str()).collect();

    let mut rendered = String::new();
    for directive in &directives {
        rendered.push_str(INDENT);
        render_element(directive, 1, resolve, &mut rendered);
        rendered.push('\n');
    }

    let mut out = String::with_capacity(xml.len() + rendered.len());
    let mut cursor = 0;
    for child in layout.children.iter().filter(|c| replaced.contains(c.name.as_str())) {
        let start = extend_over_leading_whitespace(xml, child.start);
        out.push_str(slice(xml, cursor, start)?);
        cursor = child.end;
    }

    let insert_at = line_start_if_blank(xml, layout.root_close);
    if insert_at < cursor {
        return Err(XmlPatchError::Malformed(insert_at));
    }
    out.push_str(slice(xml, cursor, insert_at)?);
    if insert_at == layout.root_close && !out.ends_with('\n') {
        out.push('\n');
    }
    out.push_str(&rendered);
    out.push_str(slice(xml, insert_at, xml.len())?);
    Ok(out)
}

// --- Rendering ---

fn render_element(
    element: &XmlElement,
    depth: usize,
    resolve: &mut dyn FnMut(&str) -> String,
    out: &mut String,
) {
    out.push('<');
    out.push_str(&element.element_name);
    for (name, value) in &element.attributes {
        let value = if SUBSTITUTED_ATTRIBUTES.contains(&name.as_str()) && !value.is_empty() {
            resolve(value)
        } else {
            value.clone()
        };
        let _ = write!(out, " {}=\"{}\"", name, escape(&value, true));
    }

    let nodes: Vec<&XmlNode> = match &element.content {
        XmlContent::Text(text) => {
            let _ = write!(out, ">{}</{}>", escape(&resolve(text), false), element.element_name);
            return;
        }
        XmlContent::Nodes(nodes) => nodes
            .iter()
            .filter(|n| !matches!(n, XmlNode::Element(e) if e.element_name.is_empty()))
            .collect(),
    };

    if nodes.is_empty() {
        out.push_str("/>");
        return;
    }

    if nodes.iter().all(|n| matches!(n, XmlNode::Text(_))) {
        out.push('>');
        for node in &nodes {
            if let XmlNode::Text(text) = node {
                out.push_str(&escape(&resolve(text), false));
            }
        }
        let _ = write!(out, "</{}>", element.element_name);
        return;
    }

    out.push('>');
    for node in nodes {
        out.push('\n');
        out.push_str(&INDENT.repeat(depth + 1));
        match node {
            XmlNode::Text(text) => out.push_str(&escape(&resolve(text), false)),
            XmlNode::Element(child) => render_element(child, depth + 1, resolve, out),
        }
    }
    out.push('\n');
    out.push_str(&INDENT.repeat(depth));
    let _ = write!(out, "</{}>", element.element_name);
}

fn escape(value: &str, attribute: bool) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' if attribute => escaped.push_str("&quot;"),
            other => escaped.push(other),
        }
    }
    escaped
}

// --- Scanning ---

#[derive(Debug, PartialEq, Eq)]
struct ChildSpan {
    name: String,
    start: usize,
    end: usize,
}

#[derive(Debug, PartialEq, Eq)]
struct Layout {
    children: Vec<ChildSpan>,
    /// Byte offset of the root's closing tag.
    root_close: usize,
}

fn scan(xml: &str) -> Result<Layout, XmlPatchError> {
    let mut children = Vec::new();
    let mut depth = 0usize;
    let mut seen_root = false;
    let mut open_child: Option<(String, usize)> = None;
    let mut pos = 0;

    while let Some(offset) = xml.get(pos..).and_then(|rest| rest.find('<')) {
        let start = pos + offset;
        let rest = xml.get(start..).unwrap_or_default();

        let skip_to = |terminator: &str| {
            rest.find(terminator)
                .map(|i| start + i + terminator.len())
                .ok_or(XmlPatchError::Malformed(start))
        };

        if rest.starts_with("<?") {
            pos = skip_to("?>")?;
        } else if rest.starts_with("<!--") {
            pos = skip_to("-->")?;
        } else if rest.starts_with("<![CDATA[") {
            pos = skip_to("]]>")?;
        } else if rest.starts_with("<!") {
            pos = skip_to(">")?;
        } else if rest.starts_with("</") {
            let end = skip_to(">")?;
            depth = depth.checked_sub(1).ok_or(XmlPatchError::Malformed(start))?;
            match depth {
                0 => {
                    return Ok(Layout {
                        children,
                        root_close: start,
                    });
                }
                1 => {
                    if let Some((name, child_start)) = open_child.take() {
                        children.push(ChildSpan {
                            name,
                            start: child_start,
                            end,
                        });
                    }
                }
                _ => {}
            }
            pos = end;
        } else {
            let end = tag_end(xml, start).ok_or(XmlPatchError::Malformed(start))?;
            let tag = xml.get(start + 1..end - 1).unwrap_or_default();
            let self_closing = tag.ends_with('/');
            let name: String = tag
                .chars()
                .take_while(|c| !c.is_whitespace() && *c != '/' && *c != '>')
                .collect();
            if name.is_empty() {
                return Err(XmlPatchError::Malformed(start));
            }

            if depth == 0 {
                if seen_root {
                    return Err(XmlPatchError::Malformed(start));
                }
                seen_root = true;
                if self_closing {
                    // `<widget/>` has no closing tag to insert before.
                    return Err(XmlPatchError::Malformed(start));
                }
            } else if depth == 1 {
                if self_closing {
                    children.push(ChildSpan {
                        name,
                        start,
                        end,
                    });
                } else {
                    open_child = Some((name, start));
                }
            }
            if !self_closing {
                depth += 1;
            }
            pos = end;
        }
    }

    if seen_root {
        Err(XmlPatchError::Malformed(xml.len()))
    } else {
        Err(XmlPatchError::NoRootElement(PathBuf::new()))
    }
}

/// Offset just past the `>` closing the tag that starts at `start`,
/// ignoring `>` inside quoted attribute values.
fn tag_end(xml: &str, start: usize) -> Option<usize> {
    let mut quote: Option<char> = None;
    for (i, c) in xml.get(start..)?.char_indices() {
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '"') | (None, '\'') => quote = Some(c),
            (None, '>') => return Some(start + i + 1),
            _ => {}
        }
    }
    None
}

/// Moves `start` back over indentation and the preceding line break,
/// so a removed element does not leave a blank line behind.
fn extend_over_leading_whitespace(xml: &str, start: usize) -> usize {
    let before = xml.get(..start).unwrap_or_default();
    let trimmed = before.trim_end_matches([' ', '\t']);
    match trimmed.strip_suffix('\n') {
        Some(rest) => rest.strip_suffix('\r').unwrap_or(rest).len(),
        None => start,
    }
}

/// The start of the line containing `pos` if only whitespace precedes `pos` on it.
fn line_start_if_blank(xml: &str, pos: usize) -> usize {
    let before = xml.get(..pos).unwrap_or_default();
    match before.rfind('\n') {
        Some(nl) if before.get(nl + 1..).is_some_and(|s| s.trim().is_empty()) => nl + 1,
        _ => pos,
    }
}

fn slice(xml: &str, from: usize, to: usize) -> Result<&str, XmlPatchError> {
    xml.get(from..to).ok_or(XmlPatchError::Malformed(from))
}
