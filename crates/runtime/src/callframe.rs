//! Two interchangeable argument-passing conventions for method calls.
//!
//! Frame-based half grounded on `examples/original_source/src/neonucleus.h`'s
//! `nn_resetCall`/`nn_addArgument`/`nn_return`/`nn_getArgument`/`nn_getReturn`.
//! Stack-based half grounded on the teacher's
//! `crates/vm/src/evaluation_stack.rs` (`EvaluationStack` push/pop/peek) and
//! the reference rewrite's stack primitives
//! (`nn_pushnull`/`nn_pushbool`/.../`nn_pop`/`nn_dupe`).

use nn_core::{Exit, NnResult, Value};

/// Frame-based argument/return slots, each capped at `max_args`/`max_rets`.
///
/// `addArgument` and `return` silently truncate past the cap rather than
/// erroring, matching the reference implementation's own discipline (the
/// legacy C call frame never signaled truncation either).
pub struct CallFrame {
    args: Vec<Value>,
    rets: Vec<Value>,
    max_args: usize,
    max_rets: usize,
    stack: Vec<Value>,
    max_stack: usize,
}

impl CallFrame {
    pub fn new(max_args: usize, max_rets: usize, max_stack: usize) -> Self {
        CallFrame {
            args: Vec::new(),
            rets: Vec::new(),
            max_args,
            max_rets,
            stack: Vec::new(),
            max_stack,
        }
    }

    /// Drops all current arguments and returns, resetting both counts to
    /// zero, as `nn_resetCall` does.
    pub fn reset_call(&mut self) {
        self.args.clear();
        self.rets.clear();
    }

    /// Appends an argument, silently truncating at `max_args`.
    pub fn add_argument(&mut self, value: Value) {
        if self.args.len() < self.max_args {
            self.args.push(value);
        }
    }

    /// Appends a return value, silently truncating at `max_rets`.
    pub fn push_return(&mut self, value: Value) {
        if self.rets.len() < self.max_rets {
            self.rets.push(value);
        }
    }

    /// Out-of-range index returns nil, never panics.
    pub fn get_argument(&self, index: usize) -> Value {
        self.args.get(index).cloned().unwrap_or(Value::Nil)
    }

    /// Out-of-range index returns nil, never panics.
    pub fn get_return(&self, index: usize) -> Value {
        self.rets.get(index).cloned().unwrap_or(Value::Nil)
    }

    pub fn argument_count(&self) -> usize {
        self.args.len()
    }

    pub fn return_count(&self) -> usize {
        self.rets.len()
    }

    pub fn arguments(&self) -> &[Value] {
        &self.args
    }

    pub fn returns(&self) -> &[Value] {
        &self.rets
    }

    /// Replaces the argument list wholesale (used when a signal's values are
    /// transferred onto the frame by `popSignal`).
    pub fn set_arguments(&mut self, values: Vec<Value>) {
        self.args = values;
    }

    /// Drops the caller's arguments while leaving the callee's returns
    /// intact, leaving the frame holding only the returns as §4.3 requires
    /// after a successful CALL.
    pub fn clear_arguments(&mut self) {
        self.args.clear();
    }

    // --- legacy stack-based convention ---

    pub fn stack_len(&self) -> usize {
        self.stack.len()
    }

    pub fn check_stack(&self, additional: usize) -> NnResult<()> {
        if self.stack.len() + additional > self.max_stack {
            Err(Exit::NoStack)
        } else {
            Ok(())
        }
    }

    pub fn push(&mut self, value: Value) -> NnResult<()> {
        self.check_stack(1)?;
        self.stack.push(value);
        Ok(())
    }

    pub fn pop(&mut self) -> NnResult<Value> {
        self.stack.pop().ok_or(Exit::BelowStack)
    }

    /// Pops and discards `n` values.
    pub fn popn(&mut self, n: usize) -> NnResult<()> {
        if self.stack.len() < n {
            return Err(Exit::BelowStack);
        }
        self.stack.truncate(self.stack.len() - n);
        Ok(())
    }

    pub fn peek(&self, depth_from_top: usize) -> NnResult<&Value> {
        let len = self.stack.len();
        if depth_from_top >= len {
            return Err(Exit::BelowStack);
        }
        Ok(&self.stack[len - 1 - depth_from_top])
    }

    /// Duplicates the value `depth_from_top` slots below the top, pushing
    /// the copy onto the top of the stack.
    pub fn dupe(&mut self, depth_from_top: usize) -> NnResult<()> {
        let value = self.peek(depth_from_top)?.clone();
        self.push(value)
    }

    pub fn clear_stack(&mut self) {
        self.stack.clear();
    }

    /// Treats the top `n` values as the arguments to a call: copies them
    /// (bottom to top) into the frame-based argument slots without removing
    /// them from the stack, matching the "args assumed to be the whole
    /// stack" convention used by the legacy protocol's `nn_call`.
    pub fn args_from_stack_top(&mut self, n: usize) -> NnResult<()> {
        if self.stack.len() < n {
            return Err(Exit::BelowStack);
        }
        let start = self.stack.len() - n;
        self.args = self.stack[start..].to_vec();
        Ok(())
    }

    /// After a call, trims the stack down to exactly `return_count` values,
    /// taken from the top, discarding everything below the return window.
    pub fn rewrite_stack_with_returns(&mut self, below: usize, return_count: usize) -> NnResult<()> {
        if self.stack.len() < below {
            return Err(Exit::BelowStack);
        }
        let returns: Vec<Value> = self.rets.iter().take(return_count).cloned().collect();
        self.stack.truncate(self.stack.len() - below);
        self.stack.extend(returns);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_arguments_round_trip() {
        let mut frame = CallFrame::new(32, 32, 256);
        frame.add_argument(Value::int(1));
        frame.add_argument(Value::int(2));
        assert_eq!(frame.argument_count(), 2);
        assert_eq!(frame.get_argument(0).to_int(), 1);
        assert_eq!(frame.get_argument(5).to_int(), 0); // nil -> 0
    }

    #[test]
    fn frame_truncates_past_cap_silently() {
        let mut frame = CallFrame::new(1, 1, 256);
        frame.add_argument(Value::int(1));
        frame.add_argument(Value::int(2));
        assert_eq!(frame.argument_count(), 1);
    }

    #[test]
    fn reset_clears_both() {
        let mut frame = CallFrame::new(32, 32, 256);
        frame.add_argument(Value::int(1));
        frame.push_return(Value::int(2));
        frame.reset_call();
        assert_eq!(frame.argument_count(), 0);
        assert_eq!(frame.return_count(), 0);
    }

    #[test]
    fn stack_overflow_and_underflow() {
        let mut frame = CallFrame::new(32, 32, 1);
        frame.push(Value::int(1)).unwrap();
        assert_eq!(frame.push(Value::int(2)), Err(Exit::NoStack));
        frame.pop().unwrap();
        assert_eq!(frame.pop(), Err(Exit::BelowStack));
    }

    #[test]
    fn dupe_copies_without_removing() {
        let mut frame = CallFrame::new(32, 32, 256);
        frame.push(Value::int(7)).unwrap();
        frame.dupe(0).unwrap();
        assert_eq!(frame.stack_len(), 2);
        assert_eq!(frame.pop().unwrap().to_int(), 7);
        assert_eq!(frame.pop().unwrap().to_int(), 7);
    }
}
