//! Share a store between threads.
//!
//! Stores are single-writer. [Shared] wraps any [Append] implementor in a mutex so that every
//! append lands whole: concurrent writers never interleave within a single call.

use crate::{array::ByteArray, memory::MemorySink, sink::Sink, Error};
use std::{
    io,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

/// A store that bytes can be appended to.
pub trait Append {
    /// Appends every byte of `bytes`, or none of them.
    fn append(&mut self, bytes: &[u8]) -> Result<(), Error>;

    /// Returns the number of bytes stored.
    fn len(&self) -> u64;

    /// Returns whether the store is empty.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Removes every byte.
    fn clear(&mut self);
}

impl Append for Sink {
    fn append(&mut self, bytes: &[u8]) -> Result<(), Error> {
        self.extend_from_slice(bytes)
    }

    fn len(&self) -> u64 {
        Sink::len(self)
    }

    fn clear(&mut self) {
        Sink::clear(self)
    }
}

impl Append for MemorySink {
    fn append(&mut self, bytes: &[u8]) -> Result<(), Error> {
        self.extend_from_slice(bytes);
        Ok(())
    }

    fn len(&self) -> u64 {
        MemorySink::len(self)
    }

    fn clear(&mut self) {
        MemorySink::clear(self)
    }
}

impl Append for ByteArray {
    fn append(&mut self, bytes: &[u8]) -> Result<(), Error> {
        self.extend_from_slice(bytes);
        Ok(())
    }

    fn len(&self) -> u64 {
        ByteArray::len(self)
    }

    fn clear(&mut self) {
        ByteArray::clear(self)
    }
}

/// A cloneable, thread-safe handle to a store.
#[derive(Debug, Default)]
pub struct Shared<A> {
    inner: Arc<Mutex<A>>,
}

impl<A> Clone for Shared<A> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<A: Append> Shared<A> {
    /// Wraps `store`.
    pub fn new(store: A) -> Self {
        Self {
            inner: Arc::new(Mutex::new(store)),
        }
    }

    // A panic while holding the lock cannot leave a store half-appended, so poisoning is ignored.
    fn lock(&self) -> MutexGuard<'_, A> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Appends every byte of `bytes` atomically with respect to other handles.
    pub fn append(&self, bytes: &[u8]) -> Result<(), Error> {
        self.lock().append(bytes)
    }

    /// Returns the number of bytes stored.
    pub fn len(&self) -> u64 {
        self.lock().len()
    }

    /// Returns whether the store is empty.
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Removes every byte.
    pub fn clear(&self) {
        self.lock().clear()
    }

    /// Runs `f` with exclusive access to the store.
    pub fn with<R>(&self, f: impl FnOnce(&mut A) -> R) -> R {
        f(&mut *self.lock())
    }

    /// Returns the store if this is the last handle, or the handle back otherwise.
    pub fn try_unwrap(self) -> Result<A, Self> {
        match Arc::try_unwrap(self.inner) {
            Ok(mutex) => Ok(mutex.into_inner().unwrap_or_else(PoisonError::into_inner)),
            Err(inner) => Err(Self { inner }),
        }
    }
}

impl<A: Append> io::Write for Shared<A> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.append(buf)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<A: Append> io::Write for &Shared<A> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.append(buf)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
