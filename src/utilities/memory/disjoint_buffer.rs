use std::marker::PhantomData;

/// Mutable view over a slice that multiple workers may write through at the same time.
///
/// The buffer performs no synchronization. Callers partition the index space so that no index is touched by
/// more than one worker between two synchronization points; the solver's phase partition is such a guarantee.
pub struct DisjointBuffer<'a, T> {
    pointer: *mut T,
    len: usize,
    _marker: PhantomData<&'a mut [T]>,
}

unsafe impl<T: Send> Send for DisjointBuffer<'_, T> {}
unsafe impl<T: Send> Sync for DisjointBuffer<'_, T> {}

impl<'a, T> DisjointBuffer<'a, T> {
    pub fn new(slice: &'a mut [T]) -> Self {
        Self {
            pointer: slice.as_mut_ptr(),
            len: slice.len(),
            _marker: PhantomData,
        }
    }

    #[inline(always)]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Gets a mutable reference to an element.
    ///
    /// # Safety
    /// No other reference to the same index may be alive while the returned reference is in use.
    #[inline(always)]
    #[allow(clippy::mut_from_ref)]
    pub unsafe fn get_mut(&self, index: usize) -> &mut T {
        assert!(index < self.len, "index {index} out of range for buffer of length {}", self.len);
        &mut *self.pointer.add(index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utilities::thread_dispatcher::{for_each_job, SimpleThreadDispatcher};

    #[test]
    fn disjoint_writes_from_workers() {
        let mut values = vec![0u32; 64];
        {
            let buffer = DisjointBuffer::new(&mut values);
            let dispatcher = SimpleThreadDispatcher::new(4);
            for_each_job(Some(&dispatcher), 64, &|job_index| {
                // SAFETY: every job index is handed out once.
                unsafe { *buffer.get_mut(job_index) = job_index as u32 * 2 };
            });
        }
        assert!(values.iter().enumerate().all(|(i, &v)| v == i as u32 * 2));
    }
}
