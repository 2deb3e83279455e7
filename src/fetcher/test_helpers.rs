//! Instrumented in-memory store for exercising the fetcher in tests.

use std::io;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::task::{Context, Poll};
use std::time::Duration;

use futures::stream::{self, StreamExt};
use tokio::io::{AsyncRead, AsyncReadExt, ReadBuf};

use crate::error::StoreError;
use crate::store::{ObjectListing, ObjectReader, ObjectStore};
use crate::types::ObjectId;

/// Fault injected into one object
#[derive(Clone, Copy, Debug)]
pub(crate) enum Fault {
    /// `open` fails after the delay
    Open,
    /// The reader yields the content, then fails
    MidRead,
    /// The reader never produces data
    StallRead,
    /// `open` panics after the delay
    Panic,
}

/// One object served by [`MockStore`]
#[derive(Clone, Debug)]
pub(crate) struct MockObject {
    name: String,
    content: Vec<u8>,
    delay: Duration,
    fault: Option<Fault>,
}

impl MockObject {
    pub(crate) fn text(name: &str, content: &str) -> Self {
        Self::bytes(name, content.as_bytes())
    }

    pub(crate) fn bytes(name: &str, content: &[u8]) -> Self {
        Self {
            name: name.to_string(),
            content: content.to_vec(),
            delay: Duration::ZERO,
            fault: None,
        }
    }

    /// Delay before `open` returns
    pub(crate) fn delayed(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub(crate) fn failing(mut self, fault: Fault) -> Self {
        self.fault = Some(fault);
        self
    }
}

/// Resource counters observed by the leak-freedom assertions
#[derive(Debug, Default)]
pub(crate) struct Counters {
    pub(crate) open_calls: AtomicUsize,
    pub(crate) pending_opens: AtomicUsize,
    pub(crate) open_readers: AtomicUsize,
    pub(crate) completed_reads: AtomicUsize,
}

impl Counters {
    pub(crate) fn open_calls(&self) -> usize {
        self.open_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn pending_opens(&self) -> usize {
        self.pending_opens.load(Ordering::SeqCst)
    }

    pub(crate) fn open_readers(&self) -> usize {
        self.open_readers.load(Ordering::SeqCst)
    }

    pub(crate) fn completed_reads(&self) -> usize {
        self.completed_reads.load(Ordering::SeqCst)
    }

    /// Nothing is open or being opened
    pub(crate) fn assert_released(&self) {
        assert_eq!(self.pending_opens(), 0, "an open is still pending");
        assert_eq!(self.open_readers(), 0, "a reader is still alive");
    }
}

/// In-memory [`ObjectStore`] with per-object delays and faults
pub(crate) struct MockStore {
    objects: Vec<MockObject>,
    listing: Vec<String>,
    fail_listing_after: Option<usize>,
    counters: Arc<Counters>,
}

impl MockStore {
    /// Store whose listing is the objects' names in the given order
    pub(crate) fn new(objects: Vec<MockObject>) -> Self {
        let listing = objects.iter().map(|o| o.name.clone()).collect();
        Self {
            objects,
            listing,
            fail_listing_after: None,
            counters: Arc::new(Counters::default()),
        }
    }

    /// Override the names the listing yields
    pub(crate) fn with_listing(mut self, names: &[&str]) -> Self {
        self.listing = names.iter().map(|n| n.to_string()).collect();
        self
    }

    /// Make the listing fail after yielding `count` names
    pub(crate) fn with_listing_failure_after(mut self, count: usize) -> Self {
        self.fail_listing_after = Some(count);
        self
    }

    pub(crate) fn counters(&self) -> Arc<Counters> {
        Arc::clone(&self.counters)
    }

    pub(crate) fn into_shared(self) -> (Arc<dyn ObjectStore>, Arc<Counters>) {
        let counters = self.counters();
        (Arc::new(self), counters)
    }
}

#[async_trait::async_trait]
impl ObjectStore for MockStore {
    fn list<'a>(&'a self, _container: &'a str, prefix: &'a str) -> ObjectListing<'a> {
        let mut items: Vec<Result<ObjectId, StoreError>> = self
            .listing
            .iter()
            .filter(|name| name.starts_with(prefix))
            .map(|name| Ok(ObjectId::from(name.as_str())))
            .collect();

        if let Some(count) = self.fail_listing_after {
            items.truncate(count);
            items.push(Err(StoreError::Status {
                status: 503,
                message: "injected listing failure".to_string(),
            }));
        }

        stream::iter(items).boxed()
    }

    async fn open(&self, _container: &str, object: &ObjectId) -> Result<ObjectReader, StoreError> {
        self.counters.open_calls.fetch_add(1, Ordering::SeqCst);
        let _pending = PendingOpen::new(Arc::clone(&self.counters));

        let entry = self
            .objects
            .iter()
            .find(|o| o.name == object.as_str())
            .ok_or_else(|| StoreError::ObjectNotFound(object.to_string()))?;

        tokio::time::sleep(entry.delay).await;

        let inner: ObjectReader = match entry.fault {
            None => Box::new(io::Cursor::new(entry.content.clone())),
            Some(Fault::Open) => {
                return Err(StoreError::Status {
                    status: 500,
                    message: format!("injected open failure for {object}"),
                });
            }
            Some(Fault::MidRead) => {
                Box::new(io::Cursor::new(entry.content.clone()).chain(FailingReader))
            }
            Some(Fault::StallRead) => Box::new(StalledReader),
            Some(Fault::Panic) => panic!("injected panic opening {object}"),
        };

        Ok(Box::new(TrackedReader::new(inner, Arc::clone(&self.counters))))
    }
}

/// Counts an `open` call that has not yet returned
struct PendingOpen(Arc<Counters>);

impl PendingOpen {
    fn new(counters: Arc<Counters>) -> Self {
        counters.pending_opens.fetch_add(1, Ordering::SeqCst);
        Self(counters)
    }
}

impl Drop for PendingOpen {
    fn drop(&mut self) {
        self.0.pending_opens.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Reader wrapper that counts live readers and reads that reached EOF
struct TrackedReader {
    inner: ObjectReader,
    counters: Arc<Counters>,
    finished: bool,
}

impl TrackedReader {
    fn new(inner: ObjectReader, counters: Arc<Counters>) -> Self {
        counters.open_readers.fetch_add(1, Ordering::SeqCst);
        Self {
            inner,
            counters,
            finished: false,
        }
    }
}

impl AsyncRead for TrackedReader {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let this = self.get_mut();
        let before = buf.filled().len();
        let poll = Pin::new(&mut this.inner).poll_read(cx, buf);

        if let Poll::Ready(Ok(())) = poll {
            let eof = buf.filled().len() == before && buf.remaining() > 0;
            if eof && !this.finished {
                this.finished = true;
                this.counters.completed_reads.fetch_add(1, Ordering::SeqCst);
            }
        }
        poll
    }
}

impl Drop for TrackedReader {
    fn drop(&mut self) {
        self.counters.open_readers.fetch_sub(1, Ordering::SeqCst);
    }
}

struct FailingReader;

impl AsyncRead for FailingReader {
    fn poll_read(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        _buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        Poll::Ready(Err(io::Error::new(
            io::ErrorKind::ConnectionReset,
            "injected read failure",
        )))
    }
}

struct StalledReader;

impl AsyncRead for StalledReader {
    fn poll_read(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        _buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        Poll::Pending
    }
}
