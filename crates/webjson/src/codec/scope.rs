use std::cell::RefCell;
use std::marker::PhantomData;

use super::Codec;

thread_local! {
    static ACTIVE: RefCell<Vec<Codec>> = const { RefCell::new(Vec::new()) };
}

/// RAII guard that keeps a codec installed as the thread's active codec.
///
/// Guards nest: an adapter that calls back into its codec pushes another
/// entry, popped when that call returns.
pub(crate) struct ScopeGuard {
    // Must be dropped on the thread that created it.
    _not_send: PhantomData<*const ()>,
}

pub(crate) fn enter(codec: &Codec) -> ScopeGuard {
    ACTIVE.with(|stack| stack.borrow_mut().push(codec.clone()));
    ScopeGuard {
        _not_send: PhantomData,
    }
}

impl Drop for ScopeGuard {
    fn drop(&mut self) {
        ACTIVE.with(|stack| {
            stack.borrow_mut().pop();
        });
    }
}

/// The innermost active codec on this thread, if any.
pub(crate) fn current() -> Option<Codec> {
    ACTIVE.with(|stack| stack.borrow().last().cloned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_guards_nest_and_unwind() {
        assert!(current().is_none());

        let outer = Codec::plain();
        let inner = Codec::plain();
        {
            let _a = enter(&outer);
            assert!(Arc::ptr_eq(&current().unwrap().inner, &outer.inner));
            {
                let _b = enter(&inner);
                assert!(Arc::ptr_eq(&current().unwrap().inner, &inner.inner));
            }
            assert!(Arc::ptr_eq(&current().unwrap().inner, &outer.inner));
        }
        assert!(current().is_none());
    }

    #[test]
    fn test_scope_is_per_thread() {
        let codec = Codec::plain();
        let _guard = enter(&codec);
        let seen_elsewhere = std::thread::spawn(|| current().is_some()).join().unwrap();
        assert!(!seen_elsewhere);
        assert!(current().is_some());
    }
}
