//! Plain-text rendering of content for the terminal

use std::fmt::Write;

use chrono::NaiveDate;

use crate::data::{GospelDay, HomeInfo};
use crate::highlights::Highlight;

/// Long date label, e.g. "Monday 19 October 2026"
pub fn date_label(date: NaiveDate) -> String {
    date.format("%A %-d %B %Y").to_string()
}

/// Renders the day summary
pub fn render_home(date: NaiveDate, info: &HomeInfo) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}", date_label(date));
    if let Some(saints) = info.saints() {
        let _ = writeln!(out, "{}", saints);
    }
    if let Some(season) = non_empty(&info.season) {
        let _ = writeln!(out, "{}", season);
    }
    if let Some(note) = non_empty(&info.booklet_note) {
        let _ = writeln!(out, "\n{}", note);
    }
    out
}

/// Renders the daily reading record
pub fn render_gospel(date: NaiveDate, day: &GospelDay) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}", date_label(date));
    for line in [&day.saints, &day.liturgical_season, &day.sacred_texts]
        .into_iter()
        .filter_map(non_empty)
    {
        let _ = writeln!(out, "{}", line);
    }

    let gospel = &day.gospel;
    if let Some(text) = non_empty(&gospel.text) {
        let evangelist = non_empty(&gospel.evangelist).unwrap_or_default().to_uppercase();
        let _ = writeln!(out, "\nFROM THE GOSPEL ACCORDING TO {}", evangelist);
        if let Some(reference) = non_empty(&gospel.reference) {
            let _ = writeln!(out, "{}", reference);
        }
        let _ = writeln!(out, "\n{}", text.trim());
    }

    for (title, html) in [
        ("COMMENT", &day.comments.main),
        ("REFLECTION", &day.comments.reflection),
    ] {
        if let Some(text) = non_empty(html).map(strip_html).filter(|t| !t.is_empty()) {
            let _ = writeln!(out, "\n{}\n{}", title, text);
        }
    }

    if !day.media.videos.is_empty() {
        let _ = writeln!(out, "\nVIDEOS");
        for video in &day.media.videos {
            let title = non_empty(&video.title).unwrap_or("Video");
            match non_empty(&video.url) {
                Some(url) => {
                    let _ = writeln!(out, "  {} <{}>", title, url);
                }
                None => {
                    let _ = writeln!(out, "  {}", title);
                }
            }
        }
    }

    if !day.related.is_empty() {
        let _ = writeln!(out, "\nEARLIER COMMENTS");
        for item in &day.related {
            let when = non_empty(&item.date).unwrap_or("?");
            let _ = write!(out, "  {}", when);
            if let Some(saints) = non_empty(&item.saints) {
                let _ = write!(out, " ({})", saints);
            }
            let _ = writeln!(out);
            if let Some(excerpt) = non_empty(&item.excerpt) {
                let _ = writeln!(out, "    {}", excerpt);
            }
        }
    }

    out
}

/// Renders the date list, one per line
pub fn render_dates(dates: &[NaiveDate]) -> String {
    dates
        .iter()
        .map(|d| format!("{}\n", d.format("%Y-%m-%d")))
        .collect()
}

/// Renders saved highlights
pub fn render_highlights(highlights: &[Highlight]) -> String {
    if highlights.is_empty() {
        return "No highlights saved\n".to_string();
    }
    let mut out = String::new();
    for h in highlights {
        let _ = writeln!(out, "[{}] {} ({})\n  {}", h.id, h.date, h.section, h.text);
    }
    out
}

/// Reduces commentary HTML to plain text
///
/// Block-level closing tags and `<br>` become line breaks and other tags are
/// dropped. Numeric entities and the named ones used in Italian text are
/// decoded; unknown entities are kept as written.
pub fn strip_html(html: &str) -> String {
    let mut text = String::with_capacity(html.len());
    let mut chars = html.chars();

    while let Some(c) = chars.next() {
        if c != '<' {
            text.push(c);
            continue;
        }
        let tag: String = chars.by_ref().take_while(|&c| c != '>').collect();
        let name = tag
            .trim_start_matches('/')
            .split(|c: char| c.is_whitespace() || c == '/')
            .next()
            .unwrap_or("")
            .to_ascii_lowercase();
        let is_close = tag.starts_with('/');
        if name == "br" || (is_close && matches!(name.as_str(), "p" | "div" | "li" | "h1" | "h2" | "h3")) {
            text.push('\n');
        }
    }

    let decoded = decode_entities(&text);

    decoded
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Decodes `&#NNN;`, `&#xHH;` and common named entities
fn decode_entities(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;

    while let Some(start) = rest.find('&') {
        out.push_str(&rest[..start]);
        rest = &rest[start..];
        let decoded = rest[1..]
            .find(';')
            .filter(|&end| end <= 10)
            .and_then(|end| decode_entity(&rest[1..=end]).map(|c| (c, end + 2)));
        match decoded {
            Some((c, len)) => {
                out.push(c);
                rest = &rest[len..];
            }
            None => {
                out.push('&');
                rest = &rest[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

fn decode_entity(name: &str) -> Option<char> {
    if let Some(num) = name.strip_prefix('#') {
        let code = match num.strip_prefix(['x', 'X']) {
            Some(hex) => u32::from_str_radix(hex, 16).ok()?,
            None => num.parse().ok()?,
        };
        return char::from_u32(code);
    }
    let c = match name {
        "amp" => '&',
        "lt" => '<',
        "gt" => '>',
        "quot" => '"',
        "apos" => '\'',
        "nbsp" => ' ',
        "laquo" => '\u{ab}',
        "raquo" => '\u{bb}',
        "lsquo" => '\u{2018}',
        "rsquo" => '\u{2019}',
        "ldquo" => '\u{201c}',
        "rdquo" => '\u{201d}',
        "ndash" => '\u{2013}',
        "mdash" => '\u{2014}',
        "hellip" => '\u{2026}',
        "agrave" => 'à',
        "egrave" => 'è',
        "eacute" => 'é',
        "igrave" => 'ì',
        "ograve" => 'ò',
        "ugrave" => 'ù',
        "Agrave" => 'À',
        "Egrave" => 'È',
        "Eacute" => 'É',
        _ => return None,
    };
    Some(c)
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}
