use core::fmt;
use std::ops::Deref;
use std::rc::Rc;

/// Shared ownership of anything that crosses the host/script boundary (values, engines, run
/// contexts). Cloning a handle shares the object, the last handle to go away frees it. The
/// inner pointer is never handed out.
pub struct Handle<T: ?Sized> {
    inner: Rc<T>,
}

impl<T> Handle<T> {
    pub fn new(value: T) -> Self {
        Self { inner: Rc::new(value) }
    }
}

impl<T: ?Sized> Handle<T> {
    /// True when both handles point at the same object.
    pub fn ptr_eq(this: &Self, other: &Self) -> bool {
        std::ptr::addr_eq(Rc::as_ptr(&this.inner), Rc::as_ptr(&other.inner))
    }

    /// Number of handles currently sharing the object.
    pub fn share_count(this: &Self) -> usize {
        Rc::strong_count(&this.inner)
    }
}

impl<T: ?Sized> Clone for Handle<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T: ?Sized> Deref for Handle<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.inner
    }
}

impl<T: ?Sized + fmt::Debug> fmt::Debug for Handle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&*self.inner, f)
    }
}

impl<T: ?Sized + fmt::Display> fmt::Display for Handle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&*self.inner, f)
    }
}

#[cfg(test)]
mod tests {
    use super::Handle;

    #[test]
    fn clone_shares_and_drop_releases() {
        let a = Handle::new(String::from("shared"));
        assert_eq!(Handle::share_count(&a), 1);

        let b = Handle::clone(&a);
        assert_eq!(Handle::share_count(&a), 2);
        assert!(Handle::ptr_eq(&a, &b));

        drop(b);
        assert_eq!(Handle::share_count(&a), 1);
    }

    #[test]
    fn distinct_objects_are_not_identical() {
        let a = Handle::new(1);
        let b = Handle::new(1);
        assert!(!Handle::ptr_eq(&a, &b));
        assert_eq!(*a, *b);
    }
}
