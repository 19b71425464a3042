//! Operand stack, register arithmetic and jump resolution.

use super::*;
use gatevm_core::decode::RegPair;

/// Operand stack capacity.
pub const STACK_SIZE: usize = 512;

/// Fixed-capacity stack of 16-bit slots.
#[derive(Debug, Clone)]
pub struct OperandStack {
    slots: [i16; STACK_SIZE],
    depth: usize,
}

impl Default for OperandStack {
    fn default() -> Self {
        Self::new()
    }
}

impl OperandStack {
    pub fn new() -> Self {
        Self {
            slots: [0; STACK_SIZE],
            depth: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.depth
    }

    pub fn is_empty(&self) -> bool {
        self.depth == 0
    }

    pub fn is_full(&self) -> bool {
        self.depth == STACK_SIZE
    }

    pub fn push(&mut self, value: i16) -> Result<(), VmError> {
        if self.is_full() {
            return Err(VmError::StackOverflow);
        }
        self.slots[self.depth] = value;
        self.depth += 1;
        Ok(())
    }

    pub fn pop(&mut self) -> Result<i16, VmError> {
        if self.is_empty() {
            return Err(VmError::StackUnderflow);
        }
        self.depth -= 1;
        Ok(self.slots[self.depth])
    }
}

impl Machine {
    pub(crate) fn add_rr(&mut self, pair: RegPair) {
        let (d, s) = (pair.dst as usize, pair.src as usize);
        self.registers[d] = self.registers[d].wrapping_add(self.registers[s]);
    }

    pub(crate) fn sub_rr(&mut self, pair: RegPair) {
        let (d, s) = (pair.dst as usize, pair.src as usize);
        self.registers[d] = self.registers[d].wrapping_sub(self.registers[s]);
    }

    /// Jump relative to the current `ip`, which already points past the operand.
    /// The target must land in `[0, len]`.
    pub(crate) fn jump(&mut self, offset: i16, len: usize) -> Result<(), VmError> {
        let target = self.ip as i64 + offset as i64;
        if target < 0 || target > len as i64 {
            return Err(VmError::JumpOutOfBounds { target, len });
        }
        self.ip = target as usize;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stack_overflows_at_capacity() {
        let mut stack = OperandStack::new();
        for i in 0..STACK_SIZE {
            stack.push(i as i16).expect("room left");
        }
        assert!(stack.is_full());
        assert_eq!(stack.push(5), Err(VmError::StackOverflow));
        assert_eq!(stack.len(), STACK_SIZE);
    }

    #[test]
    fn stack_underflows_when_empty() {
        let mut stack = OperandStack::new();
        assert_eq!(stack.pop(), Err(VmError::StackUnderflow));
    }

    #[test]
    fn stack_is_lifo() {
        let mut stack = OperandStack::new();
        stack.push(1).unwrap();
        stack.push(-2).unwrap();
        assert_eq!(stack.pop(), Ok(-2));
        assert_eq!(stack.pop(), Ok(1));
        assert!(stack.is_empty());
    }

    #[test]
    fn add_wraps_at_i8_max() {
        let mut vm = Machine::new();
        vm.registers = [127, 1, 0, 0];
        vm.add_rr(RegPair { dst: 0, src: 1 });
        assert_eq!(vm.registers[0], -128);
    }

    #[test]
    fn sub_wraps_at_i8_min() {
        let mut vm = Machine::new();
        vm.registers = [-128, 1, 0, 0];
        vm.sub_rr(RegPair { dst: 0, src: 1 });
        assert_eq!(vm.registers[0], 127);
    }

    #[test]
    fn jump_bounds_are_inclusive_of_len() {
        let mut vm = Machine::new();
        vm.ip = 3;
        assert!(vm.jump(2, 5).is_ok());
        assert_eq!(vm.ip, 5);
        assert!(vm.jump(-5, 5).is_ok());
        assert_eq!(vm.ip, 0);
        assert_eq!(
            vm.jump(-1, 5),
            Err(VmError::JumpOutOfBounds { target: -1, len: 5 })
        );
        assert_eq!(vm.ip, 0);
    }
}
