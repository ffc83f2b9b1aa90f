use core::cell::RefCell;
use core::future::poll_fn;
use core::task::{Context, Poll};

use embassy_sync::blocking_mutex::{Mutex, raw::RawMutex};
use embassy_sync::waitqueue::WakerRegistration;

use super::DynamicOutStream;

/// Linear buffer for bytes to transmit
///
/// The session stages bytes at the back and publishes them with `flush`. The driver pops
/// published bytes from the front. The buffer resets to empty once everything is popped.
pub struct OutStreamBuf<M: RawMutex, const N: usize> {
    state: Mutex<M, RefCell<State<N>>>,
}

struct State<const N: usize> {
    data: [u8; N],
    popped: usize,
    flushed: usize,
    staged: usize,
    reader: WakerRegistration,
    empty: WakerRegistration,
}

impl<M: RawMutex, const N: usize> OutStreamBuf<M, N> {
    pub const fn new() -> Self {
        Self {
            state: Mutex::new(RefCell::new(State {
                data: [0; N],
                popped: 0,
                flushed: 0,
                staged: 0,
                reader: WakerRegistration::new(),
                empty: WakerRegistration::new(),
            })),
        }
    }

    /// Copies published bytes into `buf`. Pending while there is nothing to send.
    pub(crate) fn poll_pop(&self, cx: &mut Context<'_>, buf: &mut [u8]) -> Poll<usize> {
        self.state.lock(|state| {
            let mut state = state.borrow_mut();
            if buf.is_empty() {
                return Poll::Ready(0);
            }
            if state.popped == state.flushed {
                state.reader.register(cx.waker());
                return Poll::Pending;
            }

            let count = buf.len().min(state.flushed - state.popped);
            let start = state.popped;
            buf[..count].copy_from_slice(&state.data[start..start + count]);
            state.popped += count;

            if state.popped == state.staged {
                state.popped = 0;
                state.flushed = 0;
                state.staged = 0;
                state.empty.wake();
            }
            Poll::Ready(count)
        })
    }
}

impl<M: RawMutex, const N: usize> Default for OutStreamBuf<M, N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<M: RawMutex, const N: usize> DynamicOutStream for OutStreamBuf<M, N> {
    fn stage(&self, f: &mut dyn FnMut(&mut [u8]) -> usize) -> usize {
        self.state.lock(|state| {
            let mut state = state.borrow_mut();
            let start = state.staged;
            let count = f(&mut state.data[start..]);
            assert!(count <= N - start, "staged more bytes than available");
            state.staged += count;
            count
        })
    }

    fn flush(&self) {
        self.state.lock(|state| {
            let mut state = state.borrow_mut();
            if state.flushed != state.staged {
                state.flushed = state.staged;
                state.reader.wake();
            }
        })
    }

    fn clear(&self) {
        self.state.lock(|state| {
            let mut state = state.borrow_mut();
            state.staged = state.flushed;
        })
    }

    fn size(&self) -> usize {
        self.state.lock(|state| {
            let state = state.borrow();
            state.staged - state.popped
        })
    }

    fn full_capacity(&self) -> usize {
        N
    }

    fn available_capacity(&self) -> usize {
        self.state.lock(|state| N - state.borrow().staged)
    }

    fn poll_empty(&self, cx: &mut Context<'_>) -> Poll<()> {
        self.state.lock(|state| {
            let mut state = state.borrow_mut();
            if state.staged == 0 {
                Poll::Ready(())
            } else {
                state.empty.register(cx.waker());
                Poll::Pending
            }
        })
    }
}

/// Session-side handle of an output stream buffer
#[derive(Clone, Copy)]
pub struct OutStream<'a>(&'a (dyn DynamicOutStream + Sync));

impl<'a> OutStream<'a> {
    pub(crate) fn new(buffer: &'a (dyn DynamicOutStream + Sync)) -> Self {
        Self(buffer)
    }

    /// Appends bytes at the back.
    ///
    /// `f` receives the free tail of the buffer and returns the number of bytes it wrote.
    /// The bytes stay invisible to the driver until `flush`.
    pub fn stage(&self, f: impl FnOnce(&mut [u8]) -> usize) -> usize {
        let mut f = Some(f);
        self.0.stage(&mut |buf| f.take().map_or(0, |f| f(buf)))
    }

    /// Publishes staged bytes to the driver.
    pub fn flush(&self) {
        self.0.flush();
    }

    /// Discards staged bytes that were not flushed.
    pub fn clear(&self) {
        self.0.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.size() == 0
    }

    /// Number of bytes that are staged or not popped yet
    pub fn size(&self) -> usize {
        self.0.size()
    }

    pub fn full_capacity(&self) -> usize {
        self.0.full_capacity()
    }

    pub fn available_capacity(&self) -> usize {
        self.0.available_capacity()
    }

    /// Asynchronously waits until the driver has popped all bytes.
    pub async fn wait_empty(&self) {
        poll_fn(|cx| self.0.poll_empty(cx)).await
    }
}

#[cfg(test)]
mod tests {
    use core::pin::pin;

    use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
    use futures_test::task::{new_count_waker, noop_context};

    use super::*;

    type Buffer<const N: usize> = OutStreamBuf<CriticalSectionRawMutex, N>;

    fn stage_bytes(stream: OutStream<'_>, bytes: &[u8]) -> usize {
        stream.stage(|buf| {
            let count = bytes.len().min(buf.len());
            buf[..count].copy_from_slice(&bytes[..count]);
            count
        })
    }

    #[test]
    fn test_staged_bytes_hidden_until_flush() {
        let buffer = Buffer::<8>::new();
        let stream = OutStream::new(&buffer);
        let (waker, count) = new_count_waker();
        let mut cx = Context::from_waker(&waker);
        let mut buf = [0u8; 8];

        assert_eq!(buffer.poll_pop(&mut cx, &mut buf), Poll::Pending);
        assert_eq!(stage_bytes(stream, &[1, 2, 3]), 3);
        assert_eq!(stream.size(), 3);
        assert_eq!(stream.available_capacity(), 5);
        assert_eq!(buffer.poll_pop(&mut cx, &mut buf), Poll::Pending);
        assert_eq!(count.get(), 0);

        stream.flush();
        assert_eq!(count.get(), 1);
        assert_eq!(buffer.poll_pop(&mut cx, &mut buf), Poll::Ready(3));
        assert_eq!(&buf[..3], &[1, 2, 3]);
        assert!(stream.is_empty());
        assert_eq!(stream.available_capacity(), 8);
    }

    #[test]
    fn test_partial_pop() {
        let buffer = Buffer::<8>::new();
        let stream = OutStream::new(&buffer);
        let mut cx = noop_context();
        let mut buf = [0u8; 2];

        stage_bytes(stream, &[1, 2, 3]);
        stream.flush();
        assert_eq!(buffer.poll_pop(&mut cx, &mut buf), Poll::Ready(2));
        assert_eq!(buf, [1, 2]);
        assert_eq!(stream.size(), 1);
        assert_eq!(buffer.poll_pop(&mut cx, &mut buf), Poll::Ready(1));
        assert_eq!(buf[0], 3);
        assert!(stream.is_empty());
    }

    #[test]
    fn test_clear_keeps_flushed() {
        let buffer = Buffer::<8>::new();
        let stream = OutStream::new(&buffer);
        let mut cx = noop_context();
        let mut buf = [0u8; 8];

        stage_bytes(stream, &[1]);
        stream.flush();
        stage_bytes(stream, &[2, 3]);
        stream.clear();
        assert_eq!(stream.size(), 1);
        assert_eq!(buffer.poll_pop(&mut cx, &mut buf), Poll::Ready(1));
        assert!(stream.is_empty());
    }

    #[test]
    fn test_stage_overflow_rejected() {
        let buffer = Buffer::<4>::new();
        let stream = OutStream::new(&buffer);
        assert_eq!(stage_bytes(stream, &[1, 2, 3, 4, 5]), 4);
        assert_eq!(stage_bytes(stream, &[6]), 0);
        assert_eq!(stream.available_capacity(), 0);
    }

    #[test]
    fn test_wait_empty() {
        let buffer = Buffer::<8>::new();
        let stream = OutStream::new(&buffer);
        let (waker, count) = new_count_waker();
        let mut cx = Context::from_waker(&waker);
        let mut buf = [0u8; 8];

        let mut wait = pin!(stream.wait_empty());
        assert_eq!(wait.as_mut().poll(&mut cx), Poll::Ready(()));

        stage_bytes(stream, &[1, 2]);
        stream.flush();
        let mut wait = pin!(stream.wait_empty());
        assert_eq!(wait.as_mut().poll(&mut cx), Poll::Pending);

        assert_eq!(buffer.poll_pop(&mut noop_context(), &mut buf), Poll::Ready(2));
        assert_eq!(count.get(), 1);
        assert_eq!(wait.as_mut().poll(&mut cx), Poll::Ready(()));
    }
}
