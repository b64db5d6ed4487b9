use std::error::Error;
use std::fmt::{self, Display, Formatter};

/// An accumulating error collector.
///
/// Validation code pushes every problem it finds instead of stopping at the
/// first one. Collectors nest: a child collector is folded into its parent
/// with [`Errs::merge`], which prefixes each message with the child's prefix
/// so every line stays traceable to the declaration it came from.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Errs {
    prefix: String,
    msgs: Vec<String>,
}

impl Errs {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            msgs: Vec::new(),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn messages(&self) -> &[String] {
        &self.msgs
    }

    pub fn push(&mut self, msg: impl Into<String>) {
        self.msgs.push(msg.into());
    }

    pub fn is_empty(&self) -> bool {
        self.msgs.is_empty()
    }

    pub fn len(&self) -> usize {
        self.msgs.len()
    }

    /// Fold `other` into this collector, prefixing each of its messages.
    pub fn merge(&mut self, other: Errs) {
        for msg in other.msgs {
            if other.prefix.is_empty() {
                self.msgs.push(msg);
            } else {
                self.msgs.push(format!("{}: {}", other.prefix, msg));
            }
        }
    }

    /// Return `Ok(())` when nothing was collected.
    pub fn into_result(self) -> Result<(), Errs> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

impl Display for Errs {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}:", self.prefix)?;
        for msg in &self.msgs {
            write!(f, "\n{msg}")?;
        }
        Ok(())
    }
}

impl Error for Errs {}

#[cfg(test)]
mod tests {
    use super::Errs;

    #[test]
    fn merge_prefixes_child_messages() {
        let mut parent = Errs::new("compile");
        let mut child = Errs::new("bond:bond0");
        child.push("mode: fast: Not in valid set");
        child.push("min-links: 0 out of range 1:127");
        parent.merge(child);

        assert_eq!(
            parent.messages(),
            &[
                "bond:bond0: mode: fast: Not in valid set".to_string(),
                "bond:bond0: min-links: 0 out of range 1:127".to_string(),
            ]
        );
    }

    #[test]
    fn empty_collector_is_ok() {
        assert!(Errs::new("x").into_result().is_ok());
        let mut errs = Errs::new("x");
        errs.merge(Errs::new("child"));
        assert!(errs.into_result().is_ok());
    }

    #[test]
    fn display_lists_one_message_per_line() {
        let mut errs = Errs::new("layout");
        errs.push("first");
        errs.push("second");
        assert_eq!(errs.to_string(), "layout:\nfirst\nsecond");
    }
}
