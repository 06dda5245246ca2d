// This file is derived from ttf-parser, licenced under Apache-2.0.
// https://github.com/RazrFalcon/ttf-parser/blob/439aaaebd50eb8aed66302e3c1b51fae047f85b2/src/tables/cff/argstack.rs

use std::fmt::Debug;

use crate::cff::CFFError;

/// Storage for the CFF operand stack with processing CharStrings.
pub struct ArgumentsStack<T>
where
    T: Debug,
{
    data: Vec<T>,
    max_len: usize,
}

impl<T> ArgumentsStack<T>
where
    T: Clone + Debug,
{
    pub fn new(max_len: usize) -> Self {
        ArgumentsStack {
            data: Vec::with_capacity(max_len),
            max_len,
        }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn max_len(&self) -> usize {
        self.max_len
    }

    pub fn push(&mut self, n: T) -> Result<(), CFFError> {
        if self.data.len() == self.max_len {
            Err(CFFError::ArgumentsStackLimitReached)
        } else {
            self.data.push(n);
            Ok(())
        }
    }

    pub fn at(&self, index: usize) -> Result<&T, CFFError> {
        self.data.get(index).ok_or(CFFError::StackUnderflow)
    }

    pub fn pop(&mut self) -> Result<T, CFFError> {
        self.data.pop().ok_or(CFFError::StackUnderflow)
    }

    /// Remove the bottom `n` values from the stack.
    pub fn remove_bottom(&mut self, n: usize) -> Result<Vec<T>, CFFError> {
        if n > self.data.len() {
            return Err(CFFError::StackUnderflow);
        }
        Ok(self.data.drain(..n).collect())
    }

    /// pop n values from the stack, bottom-most first
    pub fn pop_n(&mut self, n: usize) -> Result<Vec<T>, CFFError> {
        let len = self.data.len();
        if n > len {
            return Err(CFFError::StackUnderflow);
        }
        Ok(self.data.split_off(len - n))
    }

    pub fn pop_all(&mut self) -> Vec<T> {
        std::mem::take(&mut self.data)
    }

    pub fn all(&self) -> &[T] {
        &self.data
    }

    pub(crate) fn all_mut(&mut self) -> &mut [T] {
        &mut self.data
    }

    pub fn clear(&mut self) {
        self.data.clear();
    }
}

impl<T: Debug> Debug for ArgumentsStack<T> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_list().entries(&self.data).finish()
    }
}
