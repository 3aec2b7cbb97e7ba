//! Text encoding of the preview-port list.
//!
//! `get_preview_ports` has a single string return value, so the variable
//! length list of `(port, serve, type)` triples is flattened into text:
//!
//! ```text
//! [(3003, 1, 6), (3004, 2, 5)]
//! []
//! ```
//!
//! Each triple is three decimal int32 values in parentheses separated by
//! `", "`; triples are separated by `", "` and the whole list is wrapped in
//! square brackets. The decoder ignores whitespace and also accepts the
//! typed empty form `@a(iii) []` emitted by older controllers.

use crate::error::SwitchError;
use crate::protocol::types::PreviewPort;

const TYPED_EMPTY_PREFIX: &str = "@a(iii)";

pub fn format_preview_ports(ports: &[PreviewPort]) -> String {
    let items: Vec<String> = ports
        .iter()
        .map(|p| format!("({}, {}, {})", p.port, p.serve, p.case))
        .collect();
    format!("[{}]", items.join(", "))
}

pub fn parse_preview_ports(text: &str) -> Result<Vec<PreviewPort>, SwitchError> {
    let malformed = |why: &str| SwitchError::Encoding(format!("preview ports {why}: {text:?}"));

    let compact: String = text
        .trim()
        .trim_start_matches(TYPED_EMPTY_PREFIX)
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect();

    let inner = compact
        .strip_prefix('[')
        .and_then(|rest| rest.strip_suffix(']'))
        .ok_or_else(|| malformed("missing brackets"))?;
    if inner.is_empty() {
        return Ok(Vec::new());
    }

    let body = inner
        .strip_prefix('(')
        .and_then(|rest| rest.strip_suffix(')'))
        .ok_or_else(|| malformed("missing parentheses"))?;

    body.split("),(")
        .map(|triple| {
            let fields: Vec<i32> = triple
                .split(',')
                .map(|n| n.parse::<i32>().map_err(|_| malformed("bad integer")))
                .collect::<Result<_, _>>()?;
            match fields[..] {
                [port, serve, case] => Ok(PreviewPort::new(port, serve, case)),
                _ => Err(malformed("expected 3-tuples")),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_list() {
        assert_eq!(format_preview_ports(&[]), "[]");
        assert!(parse_preview_ports("[]").unwrap().is_empty());
        assert!(parse_preview_ports("@a(iii) []").unwrap().is_empty());
    }

    #[test]
    fn two_ports_keep_order() {
        let ports = vec![PreviewPort::new(9001, 1, 2), PreviewPort::new(9002, 2, 7)];
        let text = format_preview_ports(&ports);
        assert_eq!(text, "[(9001, 1, 2), (9002, 2, 7)]");
        assert_eq!(parse_preview_ports(&text).unwrap(), ports);
    }

    #[test]
    fn tolerates_whitespace_and_negatives() {
        let parsed = parse_preview_ports("  [ (1,-1, 0) ,(2 , 2,3)]\n").unwrap();
        assert_eq!(
            parsed,
            vec![PreviewPort::new(1, -1, 0), PreviewPort::new(2, 2, 3)]
        );
    }

    #[test]
    fn rejects_malformed_text() {
        assert!(parse_preview_ports("").is_err());
        assert!(parse_preview_ports("(1, 2, 3)").is_err());
        assert!(parse_preview_ports("[(1, 2)]").is_err());
        assert!(parse_preview_ports("[(1, 2, 3, 4)]").is_err());
        assert!(parse_preview_ports("[(1, x, 3)]").is_err());
        assert!(parse_preview_ports("[1, 2, 3]").is_err());
    }
}
