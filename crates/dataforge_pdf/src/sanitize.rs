/// Pictographs that the built-in and bundled fonts cannot draw, with their
/// plain-text stand-ins. The variation-selector form must come first.
const PICTOGRAPHS: &[(&str, &str)] = &[
    ("\u{1F4CA}", "RECORDS"),
    ("\u{1F4C1}", "FILE"),
    ("\u{1F3F7}\u{FE0F}", "COLUMNS"),
    ("\u{1F3F7}", "COLUMNS"),
    ("\u{1F4C4}", "PAGE"),
    ("\u{1F504}", "AUTO"),
];

/// Make text safe for the direct PDF layout: control characters other than
/// newline and tab are dropped, and known pictographs become words.
pub fn sanitize(text: &str) -> String {
    let mut out: String = text
        .chars()
        .filter(|c| !c.is_control() || matches!(c, '\n' | '\t'))
        .collect();
    for (symbol, word) in PICTOGRAPHS {
        if out.contains(symbol) {
            out = out.replace(symbol, word);
        }
    }
    out
}
