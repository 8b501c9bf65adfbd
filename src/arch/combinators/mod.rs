mod pipe;
mod split;

pub use pipe::{Pipe, PipeConfig, pipe};
pub use split::{Split, SplitConfig, split};

use super::transform::{History, Record, Trace, Uniform, parse_state};
use crate::{NetErr, Result};

/// Splits the serialized state of a combinator into one entry per child.
///
/// # Returns
/// `None` for every child when there is no state, or an error if the number of entries differs
/// from `count`.
fn child_states(serialized: Option<&str>, count: usize) -> Result<Vec<Option<String>>> {
    match parse_state::<Vec<String>>(serialized)? {
        None => Ok(vec![None; count]),
        Some(states) if states.len() != count => Err(NetErr::ChildCountMismatch {
            got: states.len(),
            expected: count,
        }),
        Some(states) => Ok(states.into_iter().map(Some).collect()),
    }
}

fn serialize_children(children: &[Box<dyn Uniform>]) -> Result<String> {
    let states = children
        .iter()
        .map(|child| child.serialize())
        .collect::<Result<Vec<_>>>()?;

    Ok(serde_json::to_string(&states)?)
}

/// Opens a combinator trace, checking that it holds one trace per child.
fn open_trace(trace: Trace, count: usize) -> Result<(History, u64, Vec<Trace>)> {
    let (history, record) = trace.into_parts();
    match record {
        Record::Nested { id, children } if children.len() == count => Ok((history, id, children)),
        _ => Err(NetErr::ProtocolViolation {
            what: "trace was not produced by this combinator",
        }),
    }
}

/// Fails unless a child handed back the history it was issued.
fn expect_history(history: &History, id: u64, child: usize) -> Result<()> {
    if !history.is(id, child) {
        return Err(NetErr::ProtocolViolation {
            what: "child handed back a history from another invocation",
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use ndarray::array;

    use super::*;
    use crate::ErrKind;

    #[test]
    fn missing_state_gives_one_empty_slot_per_child() {
        assert_eq!(child_states(None, 2).unwrap(), vec![None, None]);
        assert_eq!(
            child_states(Some(r#"["[1.0]","null"]"#), 2).unwrap(),
            vec![Some("[1.0]".to_string()), Some("null".to_string())]
        );
    }

    #[test]
    fn child_count_is_checked() {
        let err = child_states(Some(r#"["null"]"#), 3).unwrap_err();
        assert_eq!(err.kind(), ErrKind::Configuration);
        assert!(matches!(err, NetErr::ChildCountMismatch { got: 1, expected: 3 }));
    }

    #[test]
    fn foreign_traces_are_rejected() {
        let trace = Trace::new(
            History::issue(1, 0),
            Record::Sample {
                input: array![1.],
                output: array![1.],
            },
        );
        let err = open_trace(trace, 1).unwrap_err();
        assert_eq!(err.kind(), ErrKind::ProtocolViolation);
    }
}
