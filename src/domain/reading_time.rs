//! Reading-time estimation for markdown bodies.
//!
//! Medium-style model: prose is read at 265 words per minute, Hangul
//! syllables count as half a word, and images cost 12 seconds for the
//! first one, one second less per subsequent image, with a 3 second floor.
//! Code blocks are excluded from the word count.

const WORDS_PER_MINUTE: f64 = 265.0;
const HANGUL_CHAR_WORD_RATIO: f64 = 0.5;
const FIRST_IMAGE_SECONDS: f64 = 12.0;
const IMAGE_SECONDS_DECREMENT: f64 = 1.0;
const MIN_IMAGE_SECONDS: f64 = 3.0;

/// Estimate reading time in whole minutes. Never returns zero.
pub fn estimate_minutes(content: &str) -> u32 {
    let images = count_images(content);
    let prose = strip_markdown(&strip_code(content));
    let words = count_words(&prose);

    let word_minutes = words / WORDS_PER_MINUTE;
    let image_minutes = image_seconds(images) / 60.0;
    let total = (word_minutes + image_minutes).ceil() as u32;

    total.max(1)
}

fn count_images(content: &str) -> usize {
    let markdown = content.matches("![").count();
    let html = content.to_ascii_lowercase().matches("<img").count();
    markdown + html
}

/// Drop fenced blocks and inline spans; code is not prose.
fn strip_code(content: &str) -> String {
    let mut out = String::with_capacity(content.len());
    let mut in_fence = false;

    for line in content.lines() {
        if line.trim_start().starts_with("```") {
            in_fence = !in_fence;
            continue;
        }
        if in_fence {
            continue;
        }
        strip_inline_code(line, &mut out);
        out.push('\n');
    }

    out
}

fn strip_inline_code(line: &str, out: &mut String) {
    let mut in_span = false;
    for ch in line.chars() {
        if ch == '`' {
            in_span = !in_span;
            continue;
        }
        if !in_span {
            out.push(ch);
        }
    }
}

/// Remove structural markdown so syntax does not inflate the word count.
/// Link labels and emphasis text are kept; image syntax is dropped
/// entirely since images are timed separately.
fn strip_markdown(content: &str) -> String {
    let mut out = String::with_capacity(content.len());

    for line in content.lines() {
        let trimmed = line.trim_start();
        let rest = trimmed
            .trim_start_matches('#')
            .trim_start_matches('>')
            .trim_start();
        if rest.chars().all(|ch| matches!(ch, '-' | '*' | '_')) && rest.len() >= 3 {
            continue;
        }

        let rest = strip_list_marker(rest);
        strip_spans(rest, &mut out);
        out.push('\n');
    }

    out
}

fn strip_list_marker(line: &str) -> &str {
    if let Some(rest) = line
        .strip_prefix("- ")
        .or_else(|| line.strip_prefix("* "))
        .or_else(|| line.strip_prefix("+ "))
    {
        return rest;
    }

    let digits = line.chars().take_while(char::is_ascii_digit).count();
    if digits > 0 {
        if let Some(rest) = line[digits..].strip_prefix(". ") {
            return rest;
        }
    }

    line
}

/// Unwraps `[label](target)` to `label`, drops `![alt](target)` and HTML
/// tags, and removes emphasis markers.
fn strip_spans(line: &str, out: &mut String) {
    let mut chars = line.chars().peekable();

    while let Some(ch) = chars.next() {
        match ch {
            '!' if chars.peek() == Some(&'[') => {
                chars.next();
                skip_bracketed(&mut chars, '[', ']');
                if chars.peek() == Some(&'(') {
                    chars.next();
                    skip_bracketed(&mut chars, '(', ')');
                }
            }
            '[' => {
                for inner in chars.by_ref() {
                    if inner == ']' {
                        break;
                    }
                    out.push(inner);
                }
                if chars.peek() == Some(&'(') {
                    chars.next();
                    skip_bracketed(&mut chars, '(', ')');
                }
            }
            '<' => {
                for inner in chars.by_ref() {
                    if inner == '>' {
                        break;
                    }
                }
                out.push(' ');
            }
            '*' | '_' => {}
            _ => out.push(ch),
        }
    }
}

fn skip_bracketed(chars: &mut std::iter::Peekable<std::str::Chars<'_>>, open: char, close: char) {
    let mut depth = 1usize;
    for ch in chars.by_ref() {
        if ch == open {
            depth += 1;
        } else if ch == close {
            depth -= 1;
            if depth == 0 {
                break;
            }
        }
    }
}

fn is_hangul(ch: char) -> bool {
    ('\u{AC00}'..='\u{D7A3}').contains(&ch)
}

fn count_words(text: &str) -> f64 {
    let hangul_chars = text.chars().filter(|ch| is_hangul(*ch)).count();

    let latin: String = text
        .chars()
        .map(|ch| if is_hangul(ch) { ' ' } else { ch })
        .collect();
    let latin_words = latin.split_whitespace().count();

    latin_words as f64 + hangul_chars as f64 * HANGUL_CHAR_WORD_RATIO
}

fn image_seconds(count: usize) -> f64 {
    (0..count)
        .map(|i| (FIRST_IMAGE_SECONDS - i as f64 * IMAGE_SECONDS_DECREMENT).max(MIN_IMAGE_SECONDS))
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_content_reads_in_one_minute() {
        assert_eq!(estimate_minutes(""), 1);
    }

    #[test]
    fn short_content_rounds_up_to_one_minute() {
        assert_eq!(estimate_minutes("A few words only."), 1);
    }

    #[test]
    fn long_content_scales_with_word_count() {
        // 600 words at 265 wpm is a little over two minutes.
        let body = "word ".repeat(600);
        assert_eq!(estimate_minutes(&body), 3);
    }

    #[test]
    fn hangul_counts_at_half_word_per_syllable() {
        // 1,060 syllables = 530 word-equivalents = exactly two minutes.
        let body = "글".repeat(1060);
        assert_eq!(estimate_minutes(&body), 2);
    }

    #[test]
    fn fenced_code_is_excluded() {
        let prose = "word ".repeat(300);
        let with_code = format!("{prose}\n```\n{}\n```\n", "code ".repeat(5000));
        assert_eq!(estimate_minutes(&prose), estimate_minutes(&with_code));
    }

    #[test]
    fn image_time_decreases_with_a_floor() {
        assert_eq!(image_seconds(0), 0.0);
        assert_eq!(image_seconds(1), 12.0);
        assert_eq!(image_seconds(3), 12.0 + 11.0 + 10.0);
        // Images beyond the tenth all cost the 3 second floor.
        assert_eq!(image_seconds(12), image_seconds(10) + 6.0);
    }

    #[test]
    fn images_are_counted_in_both_syntaxes() {
        let body = "![alt](a.png)\ntext\n<IMG src=\"b.png\">";
        assert_eq!(count_images(body), 2);
    }

    #[test]
    fn link_labels_survive_stripping() {
        let stripped = strip_markdown("See [the docs](https://example.com) for more.");
        assert!(stripped.contains("the docs"));
        assert!(!stripped.contains("example.com"));
    }
}
