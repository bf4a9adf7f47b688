//! The seekable read channel over one remote object.

use std::mem;
use std::sync::Arc;

use bytes::{Bytes, BytesMut};
use futures_util::StreamExt;

use crate::core::{footer_start, plan_range, BackoffSequencer, ByteRange, FooterCache};
use crate::data::{Fadvise, ObjectHandle, ObjectMetadata, ReadOptions, SIZE_UNKNOWN};
use crate::effects::metadata::resolve_metadata;
use crate::effects::retry::run_with_backoff;
use crate::effects::transport::{BoxByteStream, RangeBody, StorageTransport};
use crate::error::{ReadError, Result};
use crate::stats::{ChannelStats, NoopStats};

/// Seekable reader over one remote object.
///
/// The channel keeps at most one upstream content stream and at most one
/// cached footer segment alive. It is a caller-serialised resource: one
/// in-flight operation at a time, no concurrent use.
///
/// # Examples
///
/// ```no_run
/// use std::sync::Arc;
/// use blobseek::{HttpTransport, ObjectHandle, ReadChannel, ReadOptions};
///
/// # async fn example() -> blobseek::Result<()> {
/// let transport = Arc::new(HttpTransport::new("https://storage.example.com/storage/v1")?);
/// let handle = ObjectHandle::new("warehouse", "events/day.parquet");
/// let mut channel = ReadChannel::open(transport, handle, ReadOptions::default()).await?;
///
/// let mut buf = vec![0u8; 64 * 1024];
/// let size = channel.size().await?;
/// channel.seek(size - 8).await?;
/// let n = channel.read(&mut buf).await?;
/// # let _ = n;
/// # Ok(())
/// # }
/// ```
pub struct ReadChannel {
    transport: Arc<dyn StorageTransport>,
    handle: ObjectHandle,
    options: ReadOptions,
    stats: Arc<dyn ChannelStats>,

    metadata: Option<ObjectMetadata>,
    /// Decoded object size; [`SIZE_UNKNOWN`] for gzip until fully drained.
    size: u64,
    gzip_encoded: bool,

    position: u64,
    random_access: bool,
    stream: Option<ContentStream>,
    footer: Option<FooterCache>,
    footer_fetched: bool,
    closed: bool,
}

/// The live upstream stream plus its bookkeeping.
struct ContentStream {
    body: BoxByteStream,
    /// Chunk remainder not yet handed to the caller.
    leftover: Bytes,
    /// Object offset of the next byte the stream will yield.
    next_offset: u64,
    /// Exclusive upper bound; [`SIZE_UNKNOWN`] when open-ended.
    end: u64,
}

impl ContentStream {
    /// Next non-empty chunk, consulting the leftover buffer first. Ok(None)
    /// means the upstream is exhausted.
    async fn next_chunk(&mut self) -> Result<Option<Bytes>> {
        if !self.leftover.is_empty() {
            return Ok(Some(mem::take(&mut self.leftover)));
        }
        loop {
            match self.body.next().await {
                Some(Ok(chunk)) if chunk.is_empty() => continue,
                Some(Ok(chunk)) => return Ok(Some(chunk)),
                Some(Err(error)) => return Err(error),
                None => return Ok(None),
            }
        }
    }

    fn unread(&mut self, bytes: Bytes) {
        debug_assert!(self.leftover.is_empty());
        self.leftover = bytes;
    }
}

impl ReadChannel {
    /// Open a channel for `handle`. With `fast_fail_on_not_found` set (the
    /// default) metadata is resolved here, so a missing object or a pinned
    /// generation mismatch fails immediately; otherwise resolution happens
    /// on the first size-dependent operation.
    pub async fn open(
        transport: Arc<dyn StorageTransport>,
        handle: ObjectHandle,
        options: ReadOptions,
    ) -> Result<Self> {
        options.validate()?;
        let stats = options
            .stats
            .clone()
            .unwrap_or_else(|| Arc::new(NoopStats));
        let random_access = options.fadvise == Fadvise::Random;
        let mut channel = Self {
            transport,
            handle,
            options,
            stats,
            metadata: None,
            size: 0,
            gzip_encoded: false,
            position: 0,
            random_access,
            stream: None,
            footer: None,
            footer_fetched: false,
            closed: false,
        };
        if channel.options.fast_fail_on_not_found {
            channel.ensure_metadata().await?;
        }
        Ok(channel)
    }

    /// Decoded size of the object, resolving metadata if still deferred.
    ///
    /// For gzip encoded objects the size is unknown until the object has
    /// been read to the end; [`SIZE_UNKNOWN`] is reported until then.
    pub async fn size(&mut self) -> Result<u64> {
        self.ensure_open()?;
        self.ensure_metadata().await?;
        Ok(self.size)
    }

    /// Position of the next read, in bytes from the start of the object.
    pub fn position(&self) -> Result<u64> {
        self.ensure_open()?;
        Ok(self.position)
    }

    /// The resolved content generation, once metadata is available.
    pub fn generation(&self) -> Option<i64> {
        self.metadata.as_ref().map(|metadata| metadata.generation)
    }

    /// Whether the channel has settled on bounded range requests.
    pub fn random_access(&self) -> bool {
        self.random_access
    }

    /// Move the read position.
    ///
    /// Seeking never issues a request. A short forward seek is served by
    /// draining the live stream; anything else drops the stream and lets the
    /// next read reopen it. Seeking past end of object is permitted and
    /// surfaces as end-of-file on the next read.
    pub async fn seek(&mut self, new_position: u64) -> Result<()> {
        self.ensure_open()?;
        if new_position == self.position {
            return Ok(());
        }
        if self.gzip_encoded && new_position != 0 {
            return Err(ReadError::InvalidArgument(format!(
                "gzip encoded objects are read sequentially; cannot seek from {} to {}",
                self.position, new_position
            )));
        }
        self.stats.record_seek();

        let retain_stream = match &self.stream {
            Some(stream) => {
                new_position > self.position
                    && new_position - self.position <= self.options.inplace_seek_limit
                    && new_position < stream.end
            }
            None => false,
        };
        if retain_stream && self.skip_in_place(new_position).await {
            return Ok(());
        }

        self.maybe_degrade_to_random(new_position);
        self.invalidate_stream("seek");
        self.position = new_position;
        Ok(())
    }

    /// Read up to `dst.len()` bytes at the current position, advancing it by
    /// the number of bytes delivered. Returns 0 only for an empty `dst` or
    /// at end of object. Transient upstream failures are absorbed by
    /// reopening the stream; bytes already delivered are never replayed.
    pub async fn read(&mut self, dst: &mut [u8]) -> Result<usize> {
        self.ensure_open()?;
        if dst.is_empty() {
            return Ok(0);
        }
        self.ensure_metadata().await?;

        let mut written = 0;
        // Fresh retry budget per call, discarded whenever progress is made.
        let mut retry: Option<BackoffSequencer> = None;
        while written < dst.len() && !self.at_end() {
            if let Err(error) = self.prefetch_footer_if_needed().await {
                return self.partial_or_err(written, error);
            }
            if let Some(count) = self.read_from_footer(&mut dst[written..]) {
                written += count;
                retry = None;
                continue;
            }

            if self.stream_needs_reopen() {
                self.invalidate_stream("position moved");
            }
            if self.stream.is_none() {
                let hint = (dst.len() - written) as u64;
                if let Err(error) = self.open_stream(hint).await {
                    return self.partial_or_err(written, error);
                }
            }

            match self.read_from_stream(&mut dst[written..]).await {
                Ok(count) if count > 0 => {
                    written += count;
                    retry = None;
                }
                Ok(_) => {
                    // Upstream exhausted: decide between end of object, the
                    // planned end of a bounded range, and a truncation.
                    if self.gzip_encoded {
                        tracing::debug!(size = self.position, "gzip stream drained");
                        self.size = self.position;
                        self.invalidate_stream("gzip end of stream");
                        break;
                    }
                    let clean = self
                        .stream
                        .as_ref()
                        .is_some_and(|stream| stream.next_offset >= stream.end);
                    self.invalidate_stream("end of stream");
                    if !clean {
                        let error = ReadError::Transient(format!(
                            "stream ended at byte {} before requested range was served",
                            self.position
                        ));
                        if let Err(error) = self.backoff_midstream(&mut retry, error).await {
                            return self.partial_or_err(written, error);
                        }
                    }
                }
                Err(error) if error.is_transient() => {
                    self.invalidate_stream("transient stream failure");
                    if let Err(error) = self.backoff_midstream(&mut retry, error).await {
                        return self.partial_or_err(written, error);
                    }
                }
                Err(error) => {
                    self.invalidate_stream("stream failure");
                    return self.partial_or_err(written, error);
                }
            }
        }

        if written > 0 {
            self.stats.record_bytes_read(written as u64);
        }
        Ok(written)
    }

    /// Release the upstream stream and the footer buffer. Further calls on
    /// the channel fail with [`ReadError::ChannelClosed`]; closing twice is
    /// harmless.
    pub fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        self.stream = None;
        self.footer = None;
        tracing::debug!(object = %self.handle, "closed read channel");
    }

    fn ensure_open(&self) -> Result<()> {
        if self.closed {
            Err(ReadError::ChannelClosed)
        } else {
            Ok(())
        }
    }

    async fn ensure_metadata(&mut self) -> Result<()> {
        if self.metadata.is_some() {
            return Ok(());
        }
        let metadata =
            resolve_metadata(&self.transport, &self.handle, &self.options, self.stats.as_ref())
                .await
                .inspect_err(|_| self.stats.record_error())?;

        self.gzip_encoded = metadata.is_gzip_encoded();
        if self.gzip_encoded {
            self.size = SIZE_UNKNOWN;
            if self.random_access {
                tracing::warn!(object = %self.handle, "gzip content forces sequential reads");
                self.random_access = false;
            }
        } else {
            self.size = metadata.size;
        }
        tracing::debug!(
            object = %self.handle,
            size = metadata.size,
            generation = metadata.generation,
            "resolved object metadata"
        );
        self.metadata = Some(metadata);
        Ok(())
    }

    fn at_end(&self) -> bool {
        self.size != SIZE_UNKNOWN && self.position >= self.size
    }

    /// Whether the live stream can no longer serve the current position.
    fn stream_needs_reopen(&self) -> bool {
        self.stream
            .as_ref()
            .is_some_and(|stream| stream.next_offset != self.position)
    }

    fn maybe_degrade_to_random(&mut self, new_position: u64) {
        if self.options.fadvise != Fadvise::Auto || self.random_access || self.gzip_encoded {
            return;
        }
        let backward = new_position < self.position;
        let long_forward = new_position > self.position
            && new_position - self.position > self.options.inplace_seek_limit;
        if backward || long_forward {
            self.random_access = true;
            tracing::debug!(
                from = self.position,
                to = new_position,
                "switching to random access"
            );
        }
    }

    fn invalidate_stream(&mut self, why: &str) {
        if self.stream.take().is_some() {
            tracing::trace!(position = self.position, "dropping content stream: {why}");
        }
    }

    /// Drain the live stream up to `target`. On upstream trouble the stream
    /// is dropped and the next read reopens at the target; either way the
    /// seek lands.
    async fn skip_in_place(&mut self, target: u64) -> bool {
        while self.position < target {
            let Some(stream) = self.stream.as_mut() else {
                return false;
            };
            match stream.next_chunk().await {
                Ok(Some(mut chunk)) => {
                    let take = chunk.len().min((target - self.position) as usize);
                    let rest = chunk.split_off(take);
                    stream.next_offset += take as u64;
                    self.position += take as u64;
                    if !rest.is_empty() {
                        stream.unread(rest);
                    }
                }
                Ok(None) => {
                    tracing::warn!(to = target, "stream ended while skipping forward");
                    self.invalidate_stream("skip hit end of stream");
                    self.position = target;
                }
                Err(error) => {
                    tracing::warn!(%error, to = target, "skip failed, dropping stream");
                    self.invalidate_stream("skip failure");
                    self.position = target;
                }
            }
        }
        tracing::trace!(position = self.position, "seek served in place");
        true
    }

    /// Fetch the footer region with a dedicated ranged request the first
    /// time a read lands in it. Channels hinted sequential never prefetch.
    async fn prefetch_footer_if_needed(&mut self) -> Result<()> {
        if self.footer_fetched
            || self.gzip_encoded
            || self.options.fadvise == Fadvise::Sequential
            || self.size == 0
            || self.size == SIZE_UNKNOWN
        {
            return Ok(());
        }
        let start = footer_start(self.size, self.options.min_range_request_size);
        if self.position < start {
            return Ok(());
        }

        let range = ByteRange::bounded(start, self.size - 1);
        let expected = (self.size - start) as usize;
        let generation = self.generation();
        let transport = Arc::clone(&self.transport);
        let handle = self.handle.clone();
        let bytes = run_with_backoff(
            &self.options.backoff,
            self.stats.as_ref(),
            "footer prefetch",
            || {
                let transport = Arc::clone(&transport);
                let handle = handle.clone();
                async move {
                    let mut body = transport.open_range(&handle, range, generation).await?;
                    align_body(&mut body, range.first).await?;
                    collect_exact(&mut body.stream, expected).await
                }
            },
        )
        .await?;

        tracing::debug!(start, len = expected, "prefetched object footer");
        self.stats.record_footer_prefetch();
        self.footer = Some(FooterCache::new(start, bytes));
        self.footer_fetched = true;
        Ok(())
    }

    /// Serve the current position from the cached footer if it is covered.
    /// A live stream is dropped first: once reads come from the cache the
    /// stream no longer lines up with the position.
    fn read_from_footer(&mut self, dst: &mut [u8]) -> Option<usize> {
        let hit = self
            .footer
            .as_ref()
            .is_some_and(|footer| footer.contains(self.position));
        if !hit {
            return None;
        }
        self.invalidate_stream("serving from footer");
        let footer = self.footer.as_ref()?;
        let count = footer.copy_to(self.position, dst);
        self.position += count as u64;
        tracing::trace!(count, "read served from footer cache");
        Some(count)
    }

    /// Open the upstream stream at the current position, retrying transient
    /// failures. Gzip objects always stream from the beginning, draining up
    /// to the position, because decoded offsets cannot be requested.
    async fn open_stream(&mut self, buffer_hint: u64) -> Result<()> {
        let (range, end) = if self.gzip_encoded {
            (ByteRange::unbounded(0), SIZE_UNKNOWN)
        } else {
            let range = plan_range(
                self.position,
                self.size,
                self.random_access,
                self.options.min_range_request_size,
                buffer_hint,
                self.footer.as_ref().map(FooterCache::start),
            );
            (range, range.end(self.size))
        };

        let target = self.position;
        let generation = self.generation();
        let transport = Arc::clone(&self.transport);
        let handle = self.handle.clone();
        let body = run_with_backoff(
            &self.options.backoff,
            self.stats.as_ref(),
            "content open",
            || {
                let transport = Arc::clone(&transport);
                let handle = handle.clone();
                async move {
                    let mut body = transport.open_range(&handle, range, generation).await?;
                    align_body(&mut body, target).await?;
                    Ok(body)
                }
            },
        )
        .await?;

        self.stats.record_stream_open();
        tracing::debug!(
            range = %range,
            random_access = self.random_access,
            "opened content stream"
        );
        self.stream = Some(ContentStream {
            body: body.stream,
            leftover: Bytes::new(),
            next_offset: target,
            end,
        });
        Ok(())
    }

    /// Copy stream bytes into `dst`, never past the planned end of the
    /// range. Returns 0 when the upstream is exhausted.
    async fn read_from_stream(&mut self, dst: &mut [u8]) -> Result<usize> {
        let Some(stream) = self.stream.as_mut() else {
            return Ok(0);
        };
        let remaining = if stream.end == SIZE_UNKNOWN {
            u64::MAX
        } else {
            stream.end.saturating_sub(stream.next_offset)
        };
        if remaining == 0 {
            return Ok(0);
        }

        match stream.next_chunk().await? {
            None => Ok(0),
            Some(chunk) => {
                let take = chunk
                    .len()
                    .min(dst.len())
                    .min(usize::try_from(remaining).unwrap_or(usize::MAX));
                dst[..take].copy_from_slice(&chunk[..take]);
                if chunk.len() > take {
                    stream.unread(chunk.slice(take..));
                }
                stream.next_offset += take as u64;
                self.position += take as u64;
                Ok(take)
            }
        }
    }

    /// Sleep out one step of the per-read retry budget, surfacing the error
    /// once the budget is spent.
    async fn backoff_midstream(
        &mut self,
        retry: &mut Option<BackoffSequencer>,
        error: ReadError,
    ) -> Result<()> {
        let sequencer =
            retry.get_or_insert_with(|| BackoffSequencer::new(self.options.backoff));
        match sequencer.next_delay() {
            Some(delay) => {
                self.stats.record_retry();
                tracing::warn!(%error, ?delay, "retrying read after stream failure");
                tokio::time::sleep(delay).await;
                Ok(())
            }
            None => Err(error),
        }
    }

    /// Partial reads win over errors: the bytes are already in the caller's
    /// buffer, so report them and let the next call surface the failure.
    fn partial_or_err(&self, written: usize, error: ReadError) -> Result<usize> {
        if written > 0 {
            tracing::warn!(%error, written, "returning short read ahead of error");
            self.stats.record_bytes_read(written as u64);
            Ok(written)
        } else {
            self.stats.record_error();
            Err(error)
        }
    }
}

/// Line the response body up with `target`: drain the gap when the server
/// started early (an ignored range starts at byte zero), fail transiently
/// when it started late.
async fn align_body(body: &mut RangeBody, target: u64) -> Result<()> {
    if body.first_byte > target {
        return Err(ReadError::Transient(format!(
            "response starts at byte {} past requested offset {}",
            body.first_byte, target
        )));
    }
    let mut gap = target - body.first_byte;
    while gap > 0 {
        match body.stream.next().await {
            Some(Ok(chunk)) => {
                let chunk_len = chunk.len() as u64;
                if chunk_len > gap {
                    // This chunk straddles the target; put the tail back.
                    let keep = chunk.slice(gap as usize..);
                    let stream =
                        mem::replace(&mut body.stream, Box::pin(futures_util::stream::empty()));
                    body.stream =
                        Box::pin(futures_util::stream::iter([Ok(keep)]).chain(stream));
                    return Ok(());
                }
                gap -= chunk_len;
            }
            Some(Err(error)) => return Err(error),
            None => {
                return Err(ReadError::Transient(format!(
                    "stream ended {gap} bytes short of requested offset {target}"
                )))
            }
        }
    }
    Ok(())
}

/// Read exactly `expected` bytes out of a bounded response stream.
async fn collect_exact(stream: &mut BoxByteStream, expected: usize) -> Result<Bytes> {
    let mut buffer = BytesMut::with_capacity(expected);
    while buffer.len() < expected {
        match stream.next().await {
            Some(Ok(chunk)) => {
                let want = expected - buffer.len();
                buffer.extend_from_slice(&chunk[..chunk.len().min(want)]);
            }
            Some(Err(error)) => return Err(error),
            None => {
                return Err(ReadError::Transient(format!(
                    "stream ended after {} of {expected} bytes",
                    buffer.len()
                )))
            }
        }
    }
    Ok(buffer.freeze())
}
