//! Text normalisation before synthesis.
//!
//! Chat replies often carry markdown. Voices read `*` as "asterisk" and
//! announce list markers, so decoration is stripped while the words stay.

/// Strip markdown decoration and collapse whitespace for natural speech.
///
/// Returns an empty string when nothing speakable is left.
pub fn clean_for_speech(text: &str) -> String {
    let without_fences = strip_code_fences(text);
    let without_links = unwrap_links(&without_fences);

    let mut lines = Vec::new();
    for line in without_links.lines() {
        lines.push(strip_line_marker(line.trim_start()));
    }
    let joined = lines.join(" ");

    let decorated: &[char] = &['*', '_', '~', '`', '#'];
    let mut out = String::with_capacity(joined.len());
    let mut last_was_space = true;
    for ch in joined.chars() {
        if decorated.contains(&ch) {
            continue;
        }
        if ch.is_whitespace() {
            if !last_was_space {
                out.push(' ');
            }
            last_was_space = true;
        } else {
            // no space before closing punctuation
            if matches!(ch, ',' | '.' | '!' | '?' | ';' | ':') && out.ends_with(' ') {
                out.pop();
            }
            out.push(ch);
            last_was_space = false;
        }
    }
    out.trim().to_string()
}

fn strip_code_fences(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(start) = rest.find("```") {
        let Some(len) = rest[start + 3..].find("```") else {
            break;
        };
        out.push_str(&rest[..start]);
        rest = &rest[start + 3 + len + 3..];
    }
    out.push_str(rest);
    out
}

/// `[label](target)` becomes `label`.
fn unwrap_links(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(open) = rest.find('[') {
        let after = &rest[open + 1..];
        let link = after.find("](").and_then(|mid| {
            after[mid + 2..]
                .find(')')
                .map(|close| (mid, mid + 2 + close + 1))
        });
        match link {
            Some((mid, end)) => {
                out.push_str(&rest[..open]);
                out.push_str(&after[..mid]);
                rest = &after[end..];
            }
            None => {
                out.push_str(&rest[..=open]);
                rest = after;
            }
        }
    }
    out.push_str(rest);
    out
}

fn strip_line_marker(line: &str) -> &str {
    if let Some(rest) = line
        .strip_prefix("- ")
        .or_else(|| line.strip_prefix("* "))
        .or_else(|| line.strip_prefix("+ "))
    {
        return rest;
    }
    if let Some(dot) = line.find(". ") {
        if dot > 0 && line[..dot].chars().all(|c| c.is_ascii_digit()) {
            return &line[dot + 2..];
        }
    }
    line.trim_start_matches('#').trim_start()
}
