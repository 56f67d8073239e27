//! # Rich-Text Helpers
//!
//! Post and product bodies arrive as HTML from the dashboard editor. These
//! helpers derive plain-text excerpts and reading times from that HTML. They
//! are not sanitizers: markup is stored as submitted.

/// Words per minute used for reading-time estimates.
pub const WORDS_PER_MINUTE: usize = 200;

/// Strip tags and decode the common entities, collapsing whitespace.
///
/// The contents of `<script>` and `<style>` elements are dropped.
pub fn plain_text(html: &str) -> String {
    let mut out = String::with_capacity(html.len());
    let mut rest = html;

    while let Some(open) = rest.find('<') {
        out.push_str(&rest[..open]);
        out.push(' ');
        let after = &rest[open..];
        let Some(close) = after.find('>') else {
            rest = "";
            break;
        };
        let tag = after[1..close].trim_start().to_ascii_lowercase();
        rest = &after[close + 1..];

        for raw in ["script", "style"] {
            if tag.starts_with(raw) {
                let end_tag = format!("</{raw}");
                rest = match rest.to_ascii_lowercase().find(&end_tag) {
                    Some(pos) => match rest[pos..].find('>') {
                        Some(gt) => &rest[pos + gt + 1..],
                        None => "",
                    },
                    None => "",
                };
            }
        }
    }
    out.push_str(rest);

    let decoded = decode_entities(&out);
    decoded.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn decode_entities(s: &str) -> String {
    s.replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}

/// Build an excerpt of at most `max_chars` characters from HTML.
///
/// Cuts at the last word boundary that fits and appends an ellipsis when
/// anything was removed.
pub fn excerpt(html: &str, max_chars: usize) -> String {
    let text = plain_text(html);
    if text.chars().count() <= max_chars {
        return text;
    }

    let mut cut = String::new();
    for word in text.split(' ') {
        let extra = if cut.is_empty() { 0 } else { 1 };
        if cut.chars().count() + extra + word.chars().count() + 1 > max_chars {
            break;
        }
        if !cut.is_empty() {
            cut.push(' ');
        }
        cut.push_str(word);
    }
    if cut.is_empty() {
        cut = text.chars().take(max_chars.saturating_sub(1)).collect();
    }
    cut.push('…');
    cut
}

/// Number of words in the plain text of `html`.
pub fn word_count(html: &str) -> usize {
    plain_text(html).split_whitespace().count()
}

/// Estimated reading time in whole minutes, never less than one.
pub fn reading_time_minutes(html: &str) -> u32 {
    let words = word_count(html);
    let minutes = words.div_ceil(WORDS_PER_MINUTE).max(1);
    u32::try_from(minutes).unwrap_or(u32::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_text_strips_tags() {
        let html = "<h1>Title</h1><p>Hello <strong>world</strong>!</p>";
        assert_eq!(plain_text(html), "Title Hello world !");
    }

    #[test]
    fn plain_text_decodes_entities() {
        assert_eq!(plain_text("<p>Fish &amp; chips&nbsp;&lt;3</p>"), "Fish & chips <3");
    }

    #[test]
    fn plain_text_drops_script_and_style() {
        let html = "<p>Keep</p><script>alert('x')</script><STYLE>p{}</STYLE><p>this</p>";
        assert_eq!(plain_text(html), "Keep this");
    }

    #[test]
    fn plain_text_handles_unclosed_tag() {
        assert_eq!(plain_text("text <img src="), "text");
    }

    #[test]
    fn excerpt_short_text_unchanged() {
        assert_eq!(excerpt("<p>Short one.</p>", 50), "Short one.");
    }

    #[test]
    fn excerpt_cuts_on_word_boundary() {
        let e = excerpt("<p>The quick brown fox jumps over the lazy dog</p>", 20);
        assert_eq!(e, "The quick brown fox…");
        assert!(e.chars().count() <= 20);
    }

    #[test]
    fn excerpt_single_long_word() {
        let e = excerpt("Supercalifragilisticexpialidocious", 10);
        assert_eq!(e.chars().count(), 10);
        assert!(e.ends_with('…'));
    }

    #[test]
    fn reading_time_rounds_up_with_minimum_one() {
        assert_eq!(reading_time_minutes(""), 1);
        assert_eq!(reading_time_minutes(&"word ".repeat(200)), 1);
        assert_eq!(reading_time_minutes(&"word ".repeat(201)), 2);
    }
}
