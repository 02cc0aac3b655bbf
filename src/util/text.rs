use std::borrow::Cow;

use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

/// Calculates the display width of a string in terminal columns.
///
/// CJK characters and most emoji take two columns, combining marks take none.
pub fn display_width(s: &str) -> usize {
    UnicodeWidthStr::width(s)
}

/// Ellipsis string used for truncation
const ELLIPSIS: &str = "...";
/// Display width of the ellipsis (3 columns for ASCII "...")
const ELLIPSIS_WIDTH: usize = 3;

/// Truncates a string to fit within a maximum display width.
///
/// If truncation is necessary, appends "..." to indicate text was cut off.
/// Widths of 3 columns or less return as many characters as fit, without an
/// ellipsis. A string that already fits is returned borrowed.
pub fn truncate_to_width(s: &str, max_width: usize) -> Cow<'_, str> {
    if max_width == 0 {
        return Cow::Borrowed("");
    }

    if max_width <= ELLIPSIS_WIDTH {
        let mut byte_end = 0;
        let mut current_width = 0;
        for (idx, c) in s.char_indices() {
            let char_width = UnicodeWidthChar::width(c).unwrap_or(0);
            if current_width + char_width > max_width {
                break;
            }
            current_width += char_width;
            byte_end = idx + c.len_utf8();
        }
        if byte_end == s.len() {
            return Cow::Borrowed(s);
        }
        return Cow::Owned(s[..byte_end].to_string());
    }
    let target_width = max_width.saturating_sub(ELLIPSIS_WIDTH);

    let mut current_width = 0;
    let mut cut_point = None;
    let mut exceeded_max = false;

    for (idx, c) in s.char_indices() {
        let char_width = UnicodeWidthChar::width(c).unwrap_or(0);

        // First position past which the ellipsis would no longer fit
        if cut_point.is_none() && current_width + char_width > target_width {
            cut_point = Some(idx);
        }

        if current_width + char_width > max_width {
            exceeded_max = true;
            break;
        }

        current_width += char_width;
    }

    if exceeded_max {
        let cut = cut_point.unwrap_or(s.len());
        Cow::Owned(format!("{}{}", &s[..cut], ELLIPSIS))
    } else {
        Cow::Borrowed(s)
    }
}

/// Strip terminal control characters and ANSI escape sequences from text.
///
/// Category names and task titles come from the user and from the server and
/// are printed straight to the terminal, so escape sequences must not survive.
///
/// Strips:
/// - ASCII control chars: 0x00-0x08, 0x0B-0x0C, 0x0E-0x1F, 0x7F
/// - ANSI CSI sequences: `\x1b[` ... (terminal byte 0x40-0x7E)
/// - ANSI OSC sequences: `\x1b]` ... (until BEL 0x07 or ST `\x1b\\`)
/// - Bare ESC (0x1b) not followed by `[` or `]`
///
/// Preserves tab, newline and carriage return. Returns `Cow::Borrowed` when
/// nothing needs stripping.
pub fn strip_control_chars(s: &str) -> Cow<'_, str> {
    let bytes = s.as_bytes();
    let len = bytes.len();

    let needs_strip = bytes.iter().any(|&b| is_stripped_byte(b));

    if !needs_strip {
        return Cow::Borrowed(s);
    }

    let mut out = String::with_capacity(len);
    let mut i = 0;

    while i < len {
        let b = bytes[i];

        if b == 0x1b {
            if i + 1 < len && bytes[i + 1] == b'[' {
                // CSI: skip parameter bytes until the final byte
                i += 2;
                while i < len {
                    let c = bytes[i];
                    i += 1;
                    if (0x40..=0x7e).contains(&c) {
                        break;
                    }
                }
            } else if i + 1 < len && bytes[i + 1] == b']' {
                // OSC: skip until BEL or ST
                i += 2;
                while i < len {
                    if bytes[i] == 0x07 {
                        i += 1;
                        break;
                    }
                    if bytes[i] == 0x1b && i + 1 < len && bytes[i + 1] == b'\\' {
                        i += 2;
                        break;
                    }
                    i += 1;
                }
            } else {
                i += 1;
            }
        } else if is_stripped_byte(b) {
            i += 1;
        } else {
            let start = i;
            i += 1;
            while i < len && !is_stripped_byte(bytes[i]) {
                i += 1;
            }
            // SAFETY: we only break on ASCII control bytes, which cannot appear
            // mid-codepoint in valid UTF-8, so s[start..i] is valid UTF-8.
            out.push_str(&s[start..i]);
        }
    }

    Cow::Owned(out)
}

fn is_stripped_byte(b: u8) -> bool {
    b == 0x1b || b == 0x7f || (b < 0x20 && b != 0x09 && b != 0x0a && b != 0x0d)
}

/// Normalize a user-supplied name or title: control characters stripped,
/// surrounding whitespace trimmed. An empty result means the input was blank.
pub fn clean_text(s: &str) -> String {
    strip_control_chars(s).trim().to_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ascii_truncation() {
        assert_eq!(truncate_to_width("Hello World", 8), "Hello...");
        assert_eq!(truncate_to_width("Short", 10), "Short");
    }

    #[test]
    fn test_cjk_truncation() {
        // Each CJK character is two columns wide
        assert_eq!(truncate_to_width("你好世界", 7), "你好...");
        assert_eq!(truncate_to_width("你好", 10), "你好");
        assert_eq!(truncate_to_width("你好世界", 5), "你...");
    }

    #[test]
    fn test_edge_case_widths() {
        assert_eq!(truncate_to_width("Test", 0), "");
        assert_eq!(truncate_to_width("Test", 1), "T");
        assert_eq!(truncate_to_width("你好", 1), "");
        assert_eq!(truncate_to_width("Test", 3), "Tes");
        assert_eq!(truncate_to_width("Hi", 3), "Hi");
    }

    #[test]
    fn test_exact_fit_is_borrowed() {
        let result = truncate_to_width("12345", 5);
        assert!(matches!(result, Cow::Borrowed(_)));
        assert_eq!(result, "12345");
    }

    #[test]
    fn test_display_width() {
        assert_eq!(display_width("Work"), 4);
        assert_eq!(display_width("你好"), 4);
    }

    #[test]
    fn test_strip_clean_text_returns_borrowed() {
        let input = "Groceries for the week";
        let result = strip_control_chars(input);
        assert!(matches!(result, Cow::Borrowed(_)));
        assert_eq!(result, input);
    }

    #[test]
    fn test_strip_control_chars_removes_controls() {
        let input = "he\x00ll\x07o\x08 w\x0bor\x0cld\x01!";
        assert_eq!(strip_control_chars(input), "hello world!");
    }

    #[test]
    fn test_strip_ansi_sequences() {
        assert_eq!(strip_control_chars("\x1b[31mRed text\x1b[0m"), "Red text");
        assert_eq!(
            strip_control_chars("\x1b]0;malicious title\x07safe text"),
            "safe text"
        );
        assert_eq!(
            strip_control_chars("\x1b]0;malicious title\x1b\\safe text"),
            "safe text"
        );
        assert_eq!(strip_control_chars("before\x1bafter"), "beforeafter");
    }

    #[test]
    fn test_strip_unicode_preserved() {
        assert_eq!(
            strip_control_chars("日本語 \x1b[31m赤い\x1b[0m テキスト"),
            "日本語 赤い テキスト"
        );
    }

    #[test]
    fn test_clean_text_trims_and_strips() {
        assert_eq!(clean_text("  Errands\x07 "), "Errands");
        assert_eq!(clean_text(" \t\n "), "");
        assert_eq!(clean_text("\x1b[1m\x1b[0m"), "");
    }
}
