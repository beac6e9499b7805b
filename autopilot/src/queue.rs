//! Instruction queue
//!
//! The route is stored reversed so the next instruction is always popped
//! from the end of the vector.

use crate::instructions::{Instruction, Route};

#[derive(Debug, Clone, Default)]
pub struct InstructionQueue {
    pending: Vec<Instruction>,
}

impl InstructionQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace whatever is queued with a new route, keeping client order
    pub fn load(&mut self, route: Route) {
        let mut pending = route.into_instructions();
        pending.reverse();
        self.pending = pending;
    }

    /// Next instruction in client order, or `None` once the route is used up
    pub fn next(&mut self) -> Option<Instruction> {
        self.pending.pop()
    }

    pub fn clear(&mut self) {
        self.pending.clear();
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pops_in_client_order() {
        let route = Route::new(vec![
            Instruction::forward(5.0),
            Instruction::left(90.0),
            Instruction::descend(2.0),
            Instruction::right(45.0),
        ]);
        let expected = route.instructions().to_vec();

        let mut queue = InstructionQueue::new();
        queue.load(route);
        assert_eq!(queue.len(), 4);

        let popped: Vec<_> = std::iter::from_fn(|| queue.next()).collect();
        assert_eq!(popped, expected);
        assert!(queue.is_empty());
        assert_eq!(queue.next(), None);
    }

    #[test]
    fn test_load_replaces_pending_route() {
        let mut queue = InstructionQueue::new();
        queue.load(Route::new(vec![Instruction::forward(1.0), Instruction::forward(2.0)]));
        assert_eq!(queue.next(), Some(Instruction::forward(1.0)));

        queue.load(Route::new(vec![Instruction::ascend(3.0)]));
        assert_eq!(queue.next(), Some(Instruction::ascend(3.0)));
        assert_eq!(queue.next(), None);
    }

    #[test]
    fn test_clear() {
        let mut queue = InstructionQueue::new();
        queue.load(Route::new(vec![Instruction::left(10.0)]));
        queue.clear();
        assert!(queue.is_empty());
        assert_eq!(queue.next(), None);
    }
}
