/// Replaces `{key}` placeholders in `template` with the given values.
/// Unknown placeholders and other braces are left untouched. Substituted values
/// are copied verbatim and never scanned for placeholders themselves.
pub fn fill_template(template: &str, pairs: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let tail = &rest[open..];

        let value = tail[1..].find('}').and_then(|close| {
            let key = &tail[1..close + 1];
            pairs
                .iter()
                .find(|(k, _)| *k == key)
                .map(|(_, v)| (*v, close + 2))
        });

        match value {
            Some((value, consumed)) => {
                out.push_str(value);
                rest = &tail[consumed..];
            }
            None => {
                out.push('{');
                rest = &tail[1..];
            }
        }
    }

    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fills_known_placeholders_only() {
        let filled = fill_template(
            "Material: {document} / hint: {hint} / {\"json\": 1}",
            &[("document", "x^2 = 4"), ("hint", "none")],
        );
        assert_eq!(filled, "Material: x^2 = 4 / hint: none / {\"json\": 1}");
    }

    #[test]
    fn substituted_values_are_not_rescanned() {
        let filled = fill_template(
            "Study material:\n{document}\n\nStudent request: {hint}",
            &[("document", "Set notation: S = {hint} is a literal"), ("hint", "none")],
        );
        assert_eq!(
            filled,
            "Study material:\nSet notation: S = {hint} is a literal\n\nStudent request: none"
        );
    }

    #[test]
    fn repeated_and_unclosed_braces() {
        assert_eq!(
            fill_template("{a}{a} {{a}} {b", &[("a", "1")]),
            "11 {1} {b"
        );
        assert_eq!(fill_template("", &[("a", "1")]), "");
    }
}
