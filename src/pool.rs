use std::{
    ops::{Deref, DerefMut},
    sync::{Mutex, PoisonError},
};

use crate::value::Value;

/// Slots a row's raw column values are scanned into.
#[derive(Debug, Default)]
pub struct ScanBuffer {
    values: Vec<Value>,
}

impl ScanBuffer {
    fn resize(&mut self, len: usize) {
        self.values.resize(len, Value::Null);
    }

    fn clear(&mut self) {
        self.values.clear();
    }

    pub fn capacity(&self) -> usize {
        self.values.capacity()
    }
}

impl Deref for ScanBuffer {
    type Target = [Value];

    fn deref(&self) -> &Self::Target {
        &self.values
    }
}

impl DerefMut for ScanBuffer {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.values
    }
}

/// Reusable scan buffers shared by concurrent scans.
#[derive(Debug)]
pub struct ScanBufferPool {
    free: Mutex<Vec<ScanBuffer>>,
    capacity: usize,
}

impl Default for ScanBufferPool {
    fn default() -> Self {
        Self::new(32)
    }
}

impl ScanBufferPool {
    /// A pool that keeps at most `capacity` idle buffers.
    pub fn new(capacity: usize) -> Self {
        Self {
            free: Mutex::new(Vec::with_capacity(capacity)),
            capacity,
        }
    }

    /// Checks out a buffer of exactly `len` null slots.
    ///
    /// The buffer goes back to the pool when the guard drops, on every exit path.
    pub fn acquire(&self, len: usize) -> PooledBuffer<'_> {
        let mut buffer = {
            let mut free = self.free.lock().unwrap_or_else(PoisonError::into_inner);
            free.pop().unwrap_or_default()
        };
        buffer.resize(len);
        PooledBuffer {
            pool: self,
            buffer,
        }
    }

    fn release(&self, mut buffer: ScanBuffer) {
        // drop row values so idle buffers pin nothing
        buffer.clear();
        let mut free = self.free.lock().unwrap_or_else(PoisonError::into_inner);
        if free.len() < self.capacity {
            free.push(buffer);
        }
    }

    /// The most idle buffers kept around.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn idle(&self) -> usize {
        self.free.lock().unwrap_or_else(PoisonError::into_inner).len()
    }
}

/// A checked out [`ScanBuffer`].
#[derive(Debug)]
pub struct PooledBuffer<'p> {
    pool: &'p ScanBufferPool,
    buffer: ScanBuffer,
}

impl Deref for PooledBuffer<'_> {
    type Target = ScanBuffer;

    fn deref(&self) -> &Self::Target {
        &self.buffer
    }
}

impl DerefMut for PooledBuffer<'_> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.buffer
    }
}

impl Drop for PooledBuffer<'_> {
    fn drop(&mut self) {
        self.pool.release(std::mem::take(&mut self.buffer));
    }
}

#[cfg(test)]
mod tests {
    use std::thread;

    use super::*;

    #[test]
    fn test_acquire_sizes_buffer() {
        let pool = ScanBufferPool::new(4);
        let buffer = pool.acquire(3);
        assert_eq!(3, buffer.len());
        assert!(buffer.iter().all(Value::is_null));
    }

    #[test]
    fn test_release_clears_and_reuses() {
        let pool = ScanBufferPool::new(4);
        {
            let mut buffer = pool.acquire(2);
            buffer[0] = Value::String("secret".into());
            buffer[1] = Value::I64(1);
        }
        assert_eq!(1, pool.idle());

        let buffer = pool.acquire(5);
        assert_eq!(0, pool.idle());
        assert_eq!(5, buffer.len());
        assert!(buffer.iter().all(Value::is_null));
    }

    #[test]
    fn test_pool_is_bounded() {
        let pool = ScanBufferPool::new(1);
        let a = pool.acquire(1);
        let b = pool.acquire(1);
        drop(a);
        drop(b);
        assert_eq!(1, pool.idle());
    }

    #[test]
    fn test_concurrent_acquire_and_release() {
        let pool = ScanBufferPool::new(3);
        thread::scope(|scope| {
            for worker in 0..8usize {
                let pool = &pool;
                scope.spawn(move || {
                    for round in 0..50 {
                        let len = 1 + (worker + round) % 6;
                        let mut buffer = pool.acquire(len);
                        assert_eq!(len, buffer.len());
                        assert!(buffer.iter().all(Value::is_null));
                        buffer[0] = Value::I64(worker as i64);
                    }
                });
            }
        });
        let idle = pool.idle();
        assert!((1..=3).contains(&idle), "idle buffers: {idle}");
    }
}
