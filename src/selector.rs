use thiserror::Error;

use crate::targets::Target;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TargetSelector {
    Index(usize),
    Id(String),
}

#[derive(Error, Debug)]
pub enum SelectorError {
    #[error("invalid selector: {0}")]
    InvalidSelector(String),

    #[error("index out of range: {index} (have {len})")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("no target matched: {selector}")]
    NoMatch { selector: String },
}

pub fn parse_selector(s: &str) -> Result<TargetSelector, SelectorError> {
    let s = s.trim();
    if s.is_empty() {
        return Err(SelectorError::InvalidSelector("empty".to_string()));
    }

    if let Some(rest) = s.strip_prefix("index:") {
        let rest = rest.trim();
        let idx: usize = rest
            .parse()
            .map_err(|_| SelectorError::InvalidSelector(format!("invalid index: {rest}")))?;
        return Ok(TargetSelector::Index(idx));
    }

    if s.starts_with("serial:") {
        return Ok(TargetSelector::Id(s.to_string()));
    }

    // Bare digits => treat as list index.
    if s.chars().all(|c| c.is_ascii_digit()) {
        let idx: usize = s
            .parse()
            .map_err(|_| SelectorError::InvalidSelector(format!("invalid index: {s}")))?;
        return Ok(TargetSelector::Index(idx));
    }

    // Bare selector => treat as serial port name.
    Ok(TargetSelector::Id(format!("serial:{s}")))
}

pub fn resolve_one(selector: &TargetSelector, targets: &[Target]) -> Result<usize, SelectorError> {
    match selector {
        TargetSelector::Index(i) => {
            if *i >= targets.len() {
                return Err(SelectorError::IndexOutOfRange {
                    index: *i,
                    len: targets.len(),
                });
            }
            Ok(*i)
        }
        TargetSelector::Id(id) => targets
            .iter()
            .position(|t| t.id() == *id)
            .ok_or_else(|| SelectorError::NoMatch {
                selector: id.clone(),
            }),
    }
}
