use tracing::warn;

use crate::error::LedgerResult;
use crate::traits::LedgerIterator;

/// Scope guard around a ledger iterator.
///
/// Yields `LedgerResult<T>` items and closes the underlying iterator when it
/// is dropped, so early returns and `?` on an iteration error still release
/// the ledger-side resource. Use [`IteratorGuard::close`] to observe a close
/// failure instead of only logging it.
pub struct IteratorGuard<'a, T> {
    inner: Box<dyn LedgerIterator<Item = T> + 'a>,
    closed: bool,
}

impl<'a, T> IteratorGuard<'a, T> {
    pub fn new(inner: Box<dyn LedgerIterator<Item = T> + 'a>) -> Self {
        Self {
            inner,
            closed: false,
        }
    }

    /// Close now and report the outcome.
    pub fn close(mut self) -> LedgerResult<()> {
        self.closed = true;
        self.inner.close()
    }

    /// Drain every remaining entry, then close.
    pub fn drain(mut self) -> LedgerResult<Vec<T>> {
        let mut out = Vec::new();
        for item in self.by_ref() {
            out.push(item?);
        }
        self.close()?;
        Ok(out)
    }
}

impl<T> Iterator for IteratorGuard<'_, T> {
    type Item = LedgerResult<T>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.closed {
            return None;
        }
        self.inner.next_entry().transpose()
    }
}

impl<T> Drop for IteratorGuard<'_, T> {
    fn drop(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        if let Err(e) = self.inner.close() {
            warn!(error = %e, "failed to close ledger iterator");
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;
    use std::rc::Rc;

    use super::*;
    use crate::error::{LedgerError, LedgerOp};

    struct Counting {
        items: Vec<LedgerResult<u32>>,
        closes: Rc<Cell<u32>>,
    }

    impl LedgerIterator for Counting {
        type Item = u32;

        fn next_entry(&mut self) -> LedgerResult<Option<u32>> {
            if self.items.is_empty() {
                return Ok(None);
            }
            self.items.remove(0).map(Some)
        }

        fn close(&mut self) -> LedgerResult<()> {
            self.closes.set(self.closes.get() + 1);
            Ok(())
        }
    }

    fn guard(items: Vec<LedgerResult<u32>>, closes: &Rc<Cell<u32>>) -> IteratorGuard<'static, u32> {
        IteratorGuard::new(Box::new(Counting {
            items,
            closes: Rc::clone(closes),
        }))
    }

    #[test]
    fn drain_collects_and_closes_once() {
        let closes = Rc::new(Cell::new(0));
        let items = guard(vec![Ok(1), Ok(2)], &closes).drain().unwrap();
        assert_eq!(items, vec![1, 2]);
        assert_eq!(closes.get(), 1);
    }

    #[test]
    fn drop_closes_abandoned_iterator() {
        let closes = Rc::new(Cell::new(0));
        {
            let mut it = guard(vec![Ok(1), Ok(2)], &closes);
            assert_eq!(it.next(), Some(Ok(1)));
        }
        assert_eq!(closes.get(), 1);
    }

    #[test]
    fn error_path_still_closes() {
        let closes = Rc::new(Cell::new(0));
        let failing = vec![Ok(1), Err(LedgerError::backend(LedgerOp::HistoryNext, "boom"))];
        assert!(guard(failing, &closes).drain().is_err());
        assert_eq!(closes.get(), 1);
    }

    #[test]
    fn explicit_close_is_not_repeated_on_drop() {
        let closes = Rc::new(Cell::new(0));
        guard(vec![Ok(1)], &closes).close().unwrap();
        assert_eq!(closes.get(), 1);
    }
}
