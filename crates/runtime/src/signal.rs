//! Bounded FIFO of Signals pushed by peripherals/architectures and popped
//! by the guest.
//!
//! Grounded on `examples/original_source/src/computer.c`'s
//! `nn_pushSignal`/`nn_popSignal`/`nn_fetchSignalValue`.

use nn_core::value::measure_packet_size;
use nn_core::{Exit, NnResult, Value};

/// A single queued signal: the first value by convention names the event.
#[derive(Debug, Clone)]
pub struct Signal {
    values: Vec<Value>,
}

impl Signal {
    pub fn values(&self) -> &[Value] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// A per-computer bounded FIFO of [`Signal`]s.
pub struct SignalQueue {
    queue: Vec<Signal>,
    max_signals: usize,
    max_signal_vals: usize,
    max_signal_size: usize,
}

impl SignalQueue {
    pub fn new(max_signals: usize, max_signal_vals: usize, max_signal_size: usize) -> Self {
        SignalQueue {
            queue: Vec::new(),
            max_signals,
            max_signal_vals,
            max_signal_size,
        }
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.queue.len() >= self.max_signals
    }

    /// Pushes a new signal. The caller is expected to have already checked
    /// that the owning Computer is RUNNING — a non-running computer simply
    /// drops the values and reports success, since signals only exist while
    /// running; that check lives in `Computer::push_signal`, not here, so
    /// this type stays usable standalone in tests.
    pub fn push(&mut self, values: Vec<Value>) -> NnResult<()> {
        if values.len() > self.max_signal_vals {
            return Err(Exit::Limit);
        }
        if self.queue.len() >= self.max_signals {
            return Err(Exit::Limit);
        }
        let size = measure_packet_size(&values).ok_or(Exit::Limit)?;
        if size > self.max_signal_size {
            return Err(Exit::Limit);
        }
        let retained: Vec<Value> = values.iter().map(Value::retain).collect();
        self.queue.push(Signal { values: retained });
        Ok(())
    }

    /// Pops the head signal, returning its values in order.
    pub fn pop(&mut self) -> NnResult<Vec<Value>> {
        if self.queue.is_empty() {
            return Err(Exit::BadState);
        }
        let signal = self.queue.remove(0);
        Ok(signal.values)
    }

    pub fn peek(&self) -> Option<&Signal> {
        self.queue.first()
    }

    pub fn clear(&mut self) {
        self.queue.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_then_pop_preserves_order_and_count() {
        let mut q = SignalQueue::new(32, 32, 8192);
        q.push(vec![Value::cstr("hello"), Value::int(42)]).unwrap();
        assert_eq!(q.len(), 1);
        let popped = q.pop().unwrap();
        assert_eq!(popped.len(), 2);
        assert_eq!(popped[1].to_int(), 42);
        assert_eq!(q.len(), 0);
    }

    #[test]
    fn pop_on_empty_is_badstate() {
        let mut q = SignalQueue::new(32, 32, 8192);
        assert_eq!(q.pop(), Err(Exit::BadState));
    }

    #[test]
    fn queue_full_rejects_with_limit() {
        let mut q = SignalQueue::new(1, 32, 8192);
        q.push(vec![Value::int(1)]).unwrap();
        assert_eq!(q.push(vec![Value::int(2)]), Err(Exit::Limit));
    }

    #[test]
    fn oversized_packet_rejected_without_leaking() {
        let mut q = SignalQueue::new(32, 1000, 8192);
        let values: Vec<Value> = (0..1000).map(|_| Value::string("xxxxxxxxxxxx")).collect();
        let result = q.push(values);
        assert_eq!(result, Err(Exit::Limit));
        assert_eq!(q.len(), 0);
    }

    #[test]
    fn fifo_order_across_multiple_signals() {
        let mut q = SignalQueue::new(32, 32, 8192);
        q.push(vec![Value::int(1)]).unwrap();
        q.push(vec![Value::int(2)]).unwrap();
        assert_eq!(q.pop().unwrap()[0].to_int(), 1);
        assert_eq!(q.pop().unwrap()[0].to_int(), 2);
    }
}
