//! Writer trait for log output destinations

use std::sync::Arc;
use std::time::Duration;

/// A log sink.
///
/// `write` is fire-and-forget: backends swallow I/O failures so that logging
/// never fails the caller. Every method takes `&self`; implementations use
/// interior mutability so one writer can be shared by several loggers and the
/// crash-flush registry through an `Arc<dyn Writer>`.
///
/// The bytes of a single `write` call are delivered contiguously. No ordering
/// is promised between concurrent callers beyond that.
///
/// The `*_on_crash` variants run from the panic hook, possibly on a thread
/// that faulted while holding this writer's lock. Writers that lock must
/// give up after `wait` and return `false` instead of blocking.
pub trait Writer: Send + Sync {
    fn write(&self, data: &[u8]);

    fn flush(&self) {}

    fn name(&self) -> &str;

    fn write_on_crash(&self, data: &[u8], _wait: Duration) -> bool {
        self.write(data);
        true
    }

    fn flush_on_crash(&self, _wait: Duration) -> bool {
        self.flush();
        true
    }
}

impl<W: Writer + ?Sized> Writer for Arc<W> {
    fn write(&self, data: &[u8]) {
        (**self).write(data);
    }

    fn flush(&self) {
        (**self).flush();
    }

    fn name(&self) -> &str {
        (**self).name()
    }

    fn write_on_crash(&self, data: &[u8], wait: Duration) -> bool {
        (**self).write_on_crash(data, wait)
    }

    fn flush_on_crash(&self, wait: Duration) -> bool {
        (**self).flush_on_crash(wait)
    }
}

impl<W: Writer + ?Sized> Writer for Box<W> {
    fn write(&self, data: &[u8]) {
        (**self).write(data);
    }

    fn flush(&self) {
        (**self).flush();
    }

    fn name(&self) -> &str {
        (**self).name()
    }

    fn write_on_crash(&self, data: &[u8], wait: Duration) -> bool {
        (**self).write_on_crash(data, wait)
    }

    fn flush_on_crash(&self, wait: Duration) -> bool {
        (**self).flush_on_crash(wait)
    }
}

/// Identity of a shared writer, independent of the vtable the `Arc` carries
#[inline]
pub(crate) fn same_writer(a: &Arc<dyn Writer>, b: &Arc<dyn Writer>) -> bool {
    std::ptr::eq(
        Arc::as_ptr(a) as *const (),
        Arc::as_ptr(b) as *const (),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::writers::MemoryWriter;

    #[test]
    fn test_arc_forwarding() {
        let inner = Arc::new(MemoryWriter::new());
        let shared: Arc<dyn Writer> = inner.clone();

        shared.write(b"abc");
        shared.flush();

        assert_eq!(inner.contents(), b"abc");
        assert_eq!(inner.flush_count(), 1);
        assert_eq!(shared.name(), "memory");
    }

    #[test]
    fn test_crash_methods_default_to_plain_calls() {
        let inner = Arc::new(MemoryWriter::new());
        let shared: Arc<dyn Writer> = inner.clone();
        let wait = Duration::from_millis(10);

        assert!(shared.write_on_crash(b"late", wait));
        assert!(shared.flush_on_crash(wait));

        assert_eq!(inner.contents(), b"late");
        assert_eq!(inner.flush_count(), 1);
    }

    #[test]
    fn test_same_writer() {
        let a: Arc<dyn Writer> = Arc::new(MemoryWriter::new());
        let b: Arc<dyn Writer> = Arc::new(MemoryWriter::new());
        let a2 = Arc::clone(&a);

        assert!(same_writer(&a, &a2));
        assert!(!same_writer(&a, &b));
    }
}
