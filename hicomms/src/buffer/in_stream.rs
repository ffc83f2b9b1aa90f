use core::cell::RefCell;
use core::future::poll_fn;
use core::task::{Context, Poll};

use embassy_sync::blocking_mutex::{Mutex, raw::RawMutex};
use embassy_sync::waitqueue::WakerRegistration;

use super::{DynamicInStream, StreamError};
use crate::link::DeviceError;

/// Circular buffer for received bytes
///
/// While aborted, the buffer discards pushed bytes and reports `StreamError::Aborted` to
/// waiters.
pub struct InStreamBuf<M: RawMutex, const N: usize> {
    state: Mutex<M, RefCell<State<N>>>,
}

struct State<const N: usize> {
    data: [u8; N],
    head: usize,
    len: usize,
    aborted: bool,
    error: Option<DeviceError>,
    reader: WakerRegistration,
    writer: WakerRegistration,
}

impl<const N: usize> State<N> {
    fn push(&mut self, bytes: &[u8]) -> usize {
        let count = bytes.len().min(N - self.len);
        let tail = (self.head + self.len) % N;
        let first = count.min(N - tail);
        self.data[tail..tail + first].copy_from_slice(&bytes[..first]);
        self.data[..count - first].copy_from_slice(&bytes[first..count]);
        self.len += count;
        count
    }

    fn make_contiguous(&mut self) -> &[u8] {
        if self.head + self.len > N {
            self.data.rotate_left(self.head);
            self.head = 0;
        }
        &self.data[self.head..self.head + self.len]
    }

    fn reset(&mut self) {
        self.head = 0;
        self.len = 0;
    }
}

impl<M: RawMutex, const N: usize> InStreamBuf<M, N> {
    pub const fn new() -> Self {
        Self {
            state: Mutex::new(RefCell::new(State {
                data: [0; N],
                head: 0,
                len: 0,
                aborted: false,
                error: None,
                reader: WakerRegistration::new(),
                writer: WakerRegistration::new(),
            })),
        }
    }

    /// Copies as many leading bytes as fit. Pending while the buffer is full.
    pub(crate) fn poll_push(&self, cx: &mut Context<'_>, bytes: &[u8]) -> Poll<usize> {
        self.state.lock(|state| {
            let mut state = state.borrow_mut();
            if state.aborted || bytes.is_empty() {
                return Poll::Ready(bytes.len());
            }
            if state.len == N {
                state.writer.register(cx.waker());
                return Poll::Pending;
            }
            let count = state.push(bytes);
            state.reader.wake();
            Poll::Ready(count)
        })
    }

    pub(crate) fn push_error(&self, error: DeviceError) {
        if error == DeviceError::Aborted {
            self.abort_stream();
            return;
        }
        self.state.lock(|state| {
            let mut state = state.borrow_mut();
            if !state.aborted {
                state.error = Some(error);
                state.reader.wake();
            }
        });
    }

    fn abort_stream(&self) {
        self.state.lock(|state| {
            let mut state = state.borrow_mut();
            state.aborted = true;
            state.error = None;
            state.reset();
            state.reader.wake();
            state.writer.wake();
        });
    }
}

impl<M: RawMutex, const N: usize> Default for InStreamBuf<M, N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<M: RawMutex, const N: usize> DynamicInStream for InStreamBuf<M, N> {
    fn poll_data_available(
        &self,
        cx: &mut Context<'_>,
        len: usize,
    ) -> Poll<Result<(), StreamError>> {
        self.state.lock(|state| {
            let mut state = state.borrow_mut();
            if state.aborted {
                return Poll::Ready(Err(StreamError::Aborted));
            }
            if let Some(error) = state.error.take() {
                return Poll::Ready(Err(StreamError::Device(error)));
            }
            if state.len >= len {
                return Poll::Ready(Ok(()));
            }
            state.reader.register(cx.waker());
            Poll::Pending
        })
    }

    fn read(&self, f: &mut dyn FnMut(&[u8])) {
        self.state.lock(|state| {
            let mut state = state.borrow_mut();
            f(state.make_contiguous());
        })
    }

    fn consume(&self, len: usize) {
        self.state.lock(|state| {
            let mut state = state.borrow_mut();
            assert!(len <= state.len, "consuming more bytes than buffered");
            state.len -= len;
            state.head = if state.len == 0 {
                0
            } else {
                (state.head + len) % N
            };
            if len > 0 {
                state.writer.wake();
            }
        })
    }

    fn size(&self) -> usize {
        self.state.lock(|state| state.borrow().len)
    }

    fn full_capacity(&self) -> usize {
        N
    }

    fn abort(&self) {
        self.abort_stream();
    }

    fn restart(&self) {
        self.state.lock(|state| {
            let mut state = state.borrow_mut();
            if state.aborted {
                state.aborted = false;
                state.reader.wake();
            }
        })
    }

    fn poll_restarted(&self, cx: &mut Context<'_>) -> Poll<()> {
        self.state.lock(|state| {
            let mut state = state.borrow_mut();
            if state.aborted {
                state.reader.register(cx.waker());
                Poll::Pending
            } else {
                Poll::Ready(())
            }
        })
    }
}

/// Session-side handle of an input stream buffer
#[derive(Clone, Copy)]
pub struct InStream<'a>(&'a (dyn DynamicInStream + Sync));

impl<'a> InStream<'a> {
    pub(crate) fn new(buffer: &'a (dyn DynamicInStream + Sync)) -> Self {
        Self(buffer)
    }

    /// Asynchronously waits until at least `len` bytes are buffered.
    ///
    /// Fails immediately while the stream is aborted. A device error is reported once.
    /// `len` must not exceed `full_capacity`.
    pub async fn wait_data_available(&self, len: usize) -> Result<(), StreamError> {
        debug_assert!(len <= self.full_capacity());
        poll_fn(|cx| self.0.poll_data_available(cx, len)).await
    }

    /// Runs `f` over all buffered bytes as a single slice.
    ///
    /// The buffer stays locked while `f` runs.
    pub fn read<R>(&self, f: impl FnOnce(&[u8]) -> R) -> R {
        let mut f = Some(f);
        let mut result = None;
        self.0.read(&mut |bytes| {
            if let Some(f) = f.take() {
                result = Some(f(bytes));
            }
        });
        unwrap!(result)
    }

    /// Releases `len` leading bytes. Panics if fewer bytes are buffered.
    pub fn consume(&self, len: usize) {
        self.0.consume(len);
    }

    pub fn size(&self) -> usize {
        self.0.size()
    }

    pub fn is_empty(&self) -> bool {
        self.size() == 0
    }

    pub fn full_capacity(&self) -> usize {
        self.0.full_capacity()
    }

    pub fn available_capacity(&self) -> usize {
        self.full_capacity() - self.size()
    }

    /// Drops buffered bytes and stops reception until `restart`.
    pub fn abort(&self) {
        self.0.abort();
    }

    pub fn restart(&self) {
        self.0.restart();
    }

    /// Asynchronously waits until the stream is not aborted.
    pub async fn wait_restarted(&self) {
        poll_fn(|cx| self.0.poll_restarted(cx)).await
    }
}

#[cfg(test)]
mod tests {
    extern crate std;

    use core::pin::pin;

    use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
    use futures_test::task::{new_count_waker, noop_context};

    use super::*;

    type Buffer<const N: usize> = InStreamBuf<CriticalSectionRawMutex, N>;

    fn push_all<const N: usize>(buffer: &Buffer<N>, bytes: &[u8]) -> usize {
        match buffer.poll_push(&mut noop_context(), bytes) {
            Poll::Ready(count) => count,
            Poll::Pending => 0,
        }
    }

    fn contents(stream: InStream<'_>) -> std::vec::Vec<u8> {
        stream.read(|bytes| bytes.to_vec())
    }

    #[test]
    fn test_push_until_full() {
        let buffer = Buffer::<4>::new();
        let stream = InStream::new(&buffer);

        assert_eq!(push_all(&buffer, &[1, 2, 3]), 3);
        assert_eq!(push_all(&buffer, &[4, 5, 6]), 1);
        assert_eq!(push_all(&buffer, &[5]), 0);
        assert_eq!(stream.size(), 4);
        assert_eq!(stream.available_capacity(), 0);
        assert_eq!(contents(stream), [1, 2, 3, 4]);
    }

    #[test]
    fn test_wrapped_read_is_contiguous() {
        let buffer = Buffer::<5>::new();
        let stream = InStream::new(&buffer);

        push_all(&buffer, &[1, 2, 3, 4]);
        stream.consume(3);
        assert_eq!(push_all(&buffer, &[5, 6, 7]), 3);
        assert_eq!(contents(stream), [4, 5, 6, 7]);

        stream.consume(2);
        assert_eq!(push_all(&buffer, &[8, 9, 10]), 3);
        assert_eq!(contents(stream), [6, 7, 8, 9, 10]);
    }

    #[test]
    #[should_panic]
    fn test_over_consume() {
        let buffer = Buffer::<4>::new();
        let stream = InStream::new(&buffer);
        push_all(&buffer, &[1]);
        stream.consume(2);
    }

    #[test]
    fn test_full_buffer_wakes_writer() {
        let buffer = Buffer::<2>::new();
        let stream = InStream::new(&buffer);
        let (waker, count) = new_count_waker();
        let mut cx = Context::from_waker(&waker);

        assert_eq!(buffer.poll_push(&mut cx, &[1, 2]), Poll::Ready(2));
        assert_eq!(buffer.poll_push(&mut cx, &[3]), Poll::Pending);
        assert_eq!(count.get(), 0);

        stream.consume(1);
        assert_eq!(count.get(), 1);
        assert_eq!(buffer.poll_push(&mut cx, &[3]), Poll::Ready(1));
        assert_eq!(contents(stream), [2, 3]);
    }

    #[test]
    fn test_wait_data_available() {
        let buffer = Buffer::<8>::new();
        let stream = InStream::new(&buffer);
        let (waker, count) = new_count_waker();
        let mut cx = Context::from_waker(&waker);

        let mut wait = pin!(stream.wait_data_available(3));
        assert_eq!(wait.as_mut().poll(&mut cx), Poll::Pending);

        push_all(&buffer, &[1, 2]);
        assert_eq!(count.get(), 1);
        assert_eq!(wait.as_mut().poll(&mut cx), Poll::Pending);

        push_all(&buffer, &[3]);
        assert_eq!(count.get(), 2);
        assert_eq!(wait.as_mut().poll(&mut cx), Poll::Ready(Ok(())));
    }

    #[test]
    fn test_device_error_reported_once() {
        let buffer = Buffer::<8>::new();
        let stream = InStream::new(&buffer);
        let mut cx = noop_context();

        push_all(&buffer, &[1, 2, 3]);
        buffer.push_error(DeviceError::Framing);

        let mut wait = pin!(stream.wait_data_available(1));
        assert_eq!(
            wait.as_mut().poll(&mut cx),
            Poll::Ready(Err(StreamError::Device(DeviceError::Framing)))
        );
        let mut wait = pin!(stream.wait_data_available(1));
        assert_eq!(wait.as_mut().poll(&mut cx), Poll::Ready(Ok(())));
        assert_eq!(stream.size(), 3);
    }

    #[test]
    fn test_abort_and_restart() {
        let buffer = Buffer::<8>::new();
        let stream = InStream::new(&buffer);
        let (waker, count) = new_count_waker();
        let mut cx = Context::from_waker(&waker);

        push_all(&buffer, &[1, 2, 3]);
        buffer.push_error(DeviceError::Aborted);
        assert!(stream.is_empty());

        // Bytes are discarded while aborted
        assert_eq!(push_all(&buffer, &[4, 5]), 2);
        assert!(stream.is_empty());

        let mut wait = pin!(stream.wait_data_available(1));
        assert_eq!(
            wait.as_mut().poll(&mut cx),
            Poll::Ready(Err(StreamError::Aborted))
        );

        let mut restarted = pin!(stream.wait_restarted());
        assert_eq!(restarted.as_mut().poll(&mut cx), Poll::Pending);
        stream.restart();
        assert_eq!(count.get(), 1);
        assert_eq!(restarted.as_mut().poll(&mut cx), Poll::Ready(()));

        assert_eq!(push_all(&buffer, &[6]), 1);
        assert_eq!(contents(stream), [6]);
    }

    #[test]
    fn test_abort_releases_blocked_writer() {
        let buffer = Buffer::<1>::new();
        let stream = InStream::new(&buffer);
        let (waker, count) = new_count_waker();
        let mut cx = Context::from_waker(&waker);

        assert_eq!(buffer.poll_push(&mut cx, &[1, 2]), Poll::Ready(1));
        assert_eq!(buffer.poll_push(&mut cx, &[2]), Poll::Pending);
        stream.abort();
        assert_eq!(count.get(), 1);
        assert_eq!(buffer.poll_push(&mut cx, &[2]), Poll::Ready(1));
    }
}
