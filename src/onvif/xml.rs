//! Namespace-agnostic XML value extraction
//!
//! ONVIF responses vary in namespace prefixes across vendors (`tds:`,
//! `tt:`, `trt:`, or none), so matching is on the local element name only.
//! Responses are small and flat; a full XML framework is not pulled in.

/// Span of one start tag: the text between `<` and `>`, where its content
/// begins, and whether the element is self-closing.
struct StartTag<'a> {
    body: &'a str,
    content_start: usize,
    self_closing: bool,
}

fn local_name_matches(name: &str, tag: &str) -> bool {
    !name.is_empty()
        && !name.starts_with('/')
        && !name.starts_with('?')
        && !name.starts_with('!')
        && name.rsplit(':').next() == Some(tag)
}

fn next_start_tag<'a>(xml: &'a str, tag: &str, from: usize) -> Option<StartTag<'a>> {
    let mut pos = from;
    while let Some(rel) = xml[pos..].find('<') {
        let start = pos + rel;
        let rest = &xml[start + 1..];
        let gt = rest.find('>')?;
        let body = &rest[..gt];
        let name_len = body
            .find(|c: char| c.is_whitespace() || c == '/')
            .unwrap_or(body.len());
        if local_name_matches(&body[..name_len], tag) {
            return Some(StartTag {
                body,
                content_start: start + 1 + gt + 1,
                self_closing: body.ends_with('/'),
            });
        }
        pos = start + 1;
    }
    None
}

/// Text content of the first element whose local name is `tag`.
pub fn first_value(xml: &str, tag: &str) -> Option<String> {
    all_values(xml, tag).into_iter().next()
}

/// Text contents of every element whose local name is `tag`, in document
/// order. Assumes leaf elements: content runs to the next close tag.
pub fn all_values(xml: &str, tag: &str) -> Vec<String> {
    let mut values = Vec::new();
    let mut pos = 0;
    while let Some(start_tag) = next_start_tag(xml, tag, pos) {
        if !start_tag.self_closing {
            if let Some(close) = xml[start_tag.content_start..].find("</") {
                let value = xml[start_tag.content_start..start_tag.content_start + close].trim();
                if !value.is_empty() {
                    values.push(value.to_string());
                }
            }
        }
        pos = start_tag.content_start;
    }
    values
}

/// Value of `attr` on the first element whose local name is `tag`.
pub fn first_attribute(xml: &str, tag: &str, attr: &str) -> Option<String> {
    all_attributes(xml, tag, attr).into_iter().next()
}

/// Values of `attr` on every element whose local name is `tag`, in
/// document order. Elements without the attribute are skipped.
pub fn all_attributes(xml: &str, tag: &str, attr: &str) -> Vec<String> {
    let mut values = Vec::new();
    let mut pos = 0;
    while let Some(start_tag) = next_start_tag(xml, tag, pos) {
        if let Some(value) = attribute_in_tag(start_tag.body, attr) {
            values.push(value);
        }
        pos = start_tag.content_start;
    }
    values
}

fn attribute_in_tag(tag_body: &str, attr: &str) -> Option<String> {
    let pattern = format!("{}=", attr);
    for (at, _) in tag_body.match_indices(&pattern) {
        // attribute names are preceded by whitespace, never at offset 0
        // (the element name comes first)
        if at == 0 || !tag_body[..at].ends_with(|c: char| c.is_whitespace()) {
            continue;
        }
        let after = &tag_body[at + pattern.len()..];
        let quote = after.chars().next()?;
        if quote != '"' && quote != '\'' {
            continue;
        }
        let value = &after[1..];
        if let Some(end) = value.find(quote) {
            return Some(value[..end].to_string());
        }
    }
    None
}

/// Inner content of the first element whose local name is `tag`, for
/// scoping nested lookups. Returns None for self-closing or unclosed
/// elements. Same-name nesting is not handled.
pub fn section<'a>(xml: &'a str, tag: &str) -> Option<&'a str> {
    let start_tag = next_start_tag(xml, tag, 0)?;
    if start_tag.self_closing {
        return None;
    }
    let content = &xml[start_tag.content_start..];
    let mut pos = 0;
    while let Some(rel) = content[pos..].find("</") {
        let name_start = pos + rel + 2;
        let name_end = name_start + content[name_start..].find('>')?;
        if content[name_start..name_end].trim().rsplit(':').next() == Some(tag) {
            return Some(&content[..pos + rel]);
        }
        pos = name_end;
    }
    None
}
