//! Call stack tracking.
//!
//! `CallStack` enforces the configured call depth and captures backtraces
//! for errors that leave a function.

use cinder_ir::LocationRange;

use crate::errors::{call_stack_limit_exceeded, BacktraceFrame, EvalBacktrace, EvalError};

/// A single frame in the live call stack.
#[derive(Clone, Debug)]
pub struct CallFrame {
    /// Function or method name, qualified with the composite type for methods.
    pub name: String,
    /// Where the call was made.
    pub call_site: Option<LocationRange>,
}

#[derive(Clone, Debug)]
pub struct CallStack {
    frames: Vec<CallFrame>,
    max_depth: usize,
}

impl CallStack {
    pub fn new(max_depth: usize) -> Self {
        Self {
            frames: Vec::new(),
            max_depth,
        }
    }

    /// Push a call frame, checking the depth limit.
    ///
    /// The frame is not pushed when the limit is exceeded.
    pub fn push(&mut self, frame: CallFrame) -> Result<(), EvalError> {
        if self.frames.len() >= self.max_depth {
            return Err(call_stack_limit_exceeded(self.max_depth));
        }
        self.frames.push(frame);
        Ok(())
    }

    pub fn pop(&mut self) {
        debug_assert!(
            !self.frames.is_empty(),
            "CallStack::pop() called on empty stack"
        );
        self.frames.pop();
    }

    #[inline]
    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Truncate back to `depth` frames, after a recovered panic.
    pub fn truncate(&mut self, depth: usize) {
        self.frames.truncate(depth);
    }

    /// Snapshot of the stack, most recent call first.
    pub fn capture(&self) -> EvalBacktrace {
        EvalBacktrace::new(
            self.frames
                .iter()
                .rev()
                .map(|frame| BacktraceFrame {
                    name: frame.name.clone(),
                    call_site: frame.call_site.clone(),
                })
                .collect(),
        )
    }

    /// Attach a backtrace unless the error already carries one from a deeper frame.
    pub fn attach_backtrace(&self, err: EvalError) -> EvalError {
        if self.frames.is_empty() || err.backtrace.is_some() {
            return err;
        }
        err.with_backtrace(self.capture())
    }
}

#[cfg(test)]
#[expect(clippy::unwrap_used, reason = "Tests use unwrap for brevity")]
mod tests {
    use super::*;
    use crate::errors::EvalErrorKind;
    use pretty_assertions::assert_eq;

    fn frame(name: &str) -> CallFrame {
        CallFrame {
            name: name.into(),
            call_site: None,
        }
    }

    #[test]
    fn test_depth_limit() {
        let mut stack = CallStack::new(2);
        stack.push(frame("a")).unwrap();
        stack.push(frame("b")).unwrap();
        let err = stack.push(frame("c")).unwrap_err();
        assert_eq!(err.kind, EvalErrorKind::CallStackLimitExceeded { limit: 2 });
        assert_eq!(stack.depth(), 2);
    }

    #[test]
    fn test_capture_is_most_recent_first() {
        let mut stack = CallStack::new(8);
        stack.push(frame("outer")).unwrap();
        stack.push(frame("inner")).unwrap();
        let names: Vec<_> = stack
            .capture()
            .frames()
            .iter()
            .map(|f| f.name.clone())
            .collect();
        assert_eq!(names, vec!["inner".to_string(), "outer".to_string()]);
    }

    #[test]
    fn test_attach_keeps_deepest_backtrace() {
        let mut stack = CallStack::new(8);
        stack.push(frame("outer")).unwrap();
        stack.push(frame("inner")).unwrap();
        let err = stack.attach_backtrace(crate::errors::force_nil());
        stack.pop();
        let err = stack.attach_backtrace(err);
        assert_eq!(err.backtrace.map(|b| b.len()), Some(2));
    }
}
