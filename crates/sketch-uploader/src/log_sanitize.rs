const MAX_LINE_CHARS: usize = 2048;
const REDACTED: &str = "****";

#[derive(Clone, Copy)]
enum Scan {
    Text,
    Esc,
    Csi,
    // OSC/DCS/APC/PM payload, ended by BEL (OSC only) or ESC '\'.
    Payload { bel_ends: bool, saw_esc: bool },
}

/// Clean a line of uploader tool output for display: drop terminal escape
/// sequences and control characters, cap the length, and blank out any secret
/// field value the tool echoed back.
pub fn sanitize_tool_line(input: &str, secrets: &[&str]) -> String {
    let mut out = String::with_capacity(input.len().min(MAX_LINE_CHARS));
    let mut scan = Scan::Text;
    let mut kept = 0usize;
    let mut truncated = false;

    for c in input.chars() {
        scan = match scan {
            Scan::Esc => match c {
                '[' => Scan::Csi,
                ']' => Scan::Payload {
                    bel_ends: true,
                    saw_esc: false,
                },
                'P' | 'X' | '^' | '_' => Scan::Payload {
                    bel_ends: false,
                    saw_esc: false,
                },
                _ => Scan::Text,
            },
            Scan::Csi if ('@'..='~').contains(&c) => Scan::Text,
            Scan::Csi => Scan::Csi,
            Scan::Payload { bel_ends, saw_esc } => {
                if (bel_ends && c == '\x07') || (saw_esc && c == '\\') {
                    Scan::Text
                } else {
                    Scan::Payload {
                        bel_ends,
                        saw_esc: c == '\x1b',
                    }
                }
            }
            Scan::Text => {
                if c == '\x1b' {
                    Scan::Esc
                } else {
                    if c == '\t' {
                        out.push(' ');
                        kept += 1;
                    } else if !c.is_control() && !is_bidi_control(c) {
                        out.push(c);
                        kept += 1;
                    }
                    Scan::Text
                }
            }
        };
        if kept >= MAX_LINE_CHARS {
            truncated = true;
            break;
        }
    }

    for s in secrets {
        if !s.is_empty() && out.contains(s) {
            out = out.replace(s, REDACTED);
        }
    }
    if truncated {
        out.push_str(" ...[truncated]");
    }
    out
}

fn is_bidi_control(c: char) -> bool {
    matches!(c, '\u{061C}' | '\u{200E}' | '\u{200F}')
        || ('\u{202A}'..='\u{202E}').contains(&c)
        || ('\u{2066}'..='\u{2069}').contains(&c)
}

#[cfg(test)]
mod tests {
    use super::sanitize_tool_line;

    #[test]
    fn strips_color_and_title_sequences() {
        let input = "avrdude: \u{1b}[32mwriting\u{1b}[0m flash \u{1b}]0;title\u{7}done";
        assert_eq!(sanitize_tool_line(input, &[]), "avrdude: writing flash done");
    }

    #[test]
    fn strips_st_terminated_payloads() {
        assert_eq!(sanitize_tool_line("a\u{1b}Ppayload\u{1b}\\b", &[]), "ab");
    }

    #[test]
    fn redacts_secret_values() {
        let got = sanitize_tool_line("connecting with password hunter2\r", &["hunter2", ""]);
        assert_eq!(got, "connecting with password ****");
    }

    #[test]
    fn drops_controls_and_bidi_marks() {
        assert_eq!(sanitize_tool_line("a\tb\nc\u{202e}x", &[]), "a bcx");
    }

    #[test]
    fn truncates_long_lines() {
        let long = "x".repeat(5000);
        let got = sanitize_tool_line(&long, &[]);
        assert!(got.ends_with("...[truncated]"));
        assert!(got.len() < 2100);
    }
}
