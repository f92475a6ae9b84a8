//! Stream backend over a borrowed writer.

use std::fmt;
use std::io::{self, Write};
use std::sync::{Arc, Mutex};

use crate::policy::{LogBackend, PolicyCtor, PolicyFactory, PolicyTag};
use crate::LogError;

pub const STDIO_TAG: PolicyTag = "stdio";

/// A stream shared with its owner. The backend holds a reference and never
/// closes it.
pub type SharedStream = Arc<Mutex<dyn Write + Send>>;

/// Construction data for the stdio backend.
#[derive(Clone)]
pub struct StdioCtor {
    pub stream: SharedStream,
}

impl StdioCtor {
    pub fn new(stream: SharedStream) -> Self {
        Self { stream }
    }

    pub fn stdout() -> Self {
        Self::new(Arc::new(Mutex::new(io::stdout())))
    }

    pub fn stderr() -> Self {
        Self::new(Arc::new(Mutex::new(io::stderr())))
    }
}

impl fmt::Debug for StdioCtor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StdioCtor").finish_non_exhaustive()
    }
}

pub struct StdioBackend {
    stream: SharedStream,
}

impl StdioBackend {
    pub fn new(ctor: StdioCtor) -> Self {
        Self { stream: ctor.stream }
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, dyn Write + Send + 'static>, LogError> {
        self.stream
            .lock()
            .map_err(|_| LogError::Io(io::Error::new(io::ErrorKind::Other, "stream lock poisoned")))
    }
}

impl LogBackend for StdioBackend {
    /// Write the whole buffer, retrying partial writes.
    ///
    /// The stream may accept fewer bytes per call (a `LineWriter` stops at
    /// the last newline). Only a stream that stops accepting bytes, or
    /// fails, leaves a shortfall.
    fn write(&mut self, buffer: &[u8]) -> Result<(), LogError> {
        let mut stream = self.lock()?;
        let mut written = 0;
        while written < buffer.len() {
            match stream.write(&buffer[written..]) {
                Ok(0) => break,
                Ok(n) => written += n,
                Err(err) if err.kind() == io::ErrorKind::Interrupted => {}
                Err(_) => break,
            }
        }

        if written != buffer.len() {
            return Err(LogError::WriteShortfall {
                requested: buffer.len(),
                written,
            });
        }
        Ok(())
    }

    fn flush(&mut self) -> Result<(), LogError> {
        self.lock()?.flush()?;
        Ok(())
    }
}

pub struct StdioFactory;

impl PolicyFactory for StdioFactory {
    fn tag(&self) -> PolicyTag {
        STDIO_TAG
    }

    fn create(&self, ctor: PolicyCtor) -> Result<Box<dyn LogBackend>, LogError> {
        let ctor = ctor
            .downcast::<StdioCtor>()
            .map_err(|_| LogError::InvalidCtor(STDIO_TAG))?;
        Ok(Box::new(StdioBackend::new(*ctor)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::PolicyRegistry;

    /// Accepts at most `limit` bytes per write call and `capacity` bytes in
    /// total; once full, writes return `Ok(0)`.
    struct Throttled {
        data: Vec<u8>,
        limit: usize,
        capacity: usize,
        interrupts: usize,
        flushes: usize,
    }

    impl Write for Throttled {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            if self.interrupts > 0 {
                self.interrupts -= 1;
                return Err(io::ErrorKind::Interrupted.into());
            }
            let room = self.capacity - self.data.len();
            let n = buf.len().min(self.limit).min(room);
            self.data.extend_from_slice(&buf[..n]);
            Ok(n)
        }

        fn flush(&mut self) -> io::Result<()> {
            self.flushes += 1;
            Ok(())
        }
    }

    fn throttled(limit: usize, capacity: usize) -> Arc<Mutex<Throttled>> {
        Arc::new(Mutex::new(Throttled {
            data: Vec::new(),
            limit,
            capacity,
            interrupts: 0,
            flushes: 0,
        }))
    }

    fn policy_over(stream: SharedStream) -> crate::LogPolicy {
        PolicyRegistry::with_defaults()
            .create(STDIO_TAG, Box::new(StdioCtor::new(stream)))
            .expect("create")
    }

    #[test]
    fn writes_all_bytes() {
        let stream = throttled(usize::MAX, usize::MAX);
        let mut policy = policy_over(stream.clone());

        policy.write(b"0123456789").expect("write");
        policy.flush().expect("flush");

        let inner = stream.lock().unwrap();
        assert_eq!(inner.data, b"0123456789");
        assert_eq!(inner.flushes, 1);
    }

    #[test]
    fn partial_writes_are_retried() {
        let stream = throttled(3, usize::MAX);
        stream.lock().unwrap().interrupts = 2;
        let mut policy = policy_over(stream.clone());

        policy.write(b"0123456789").expect("write");

        assert_eq!(stream.lock().unwrap().data, b"0123456789");
    }

    #[test]
    fn line_buffered_stream_takes_long_records() {
        let stream = Arc::new(Mutex::new(io::LineWriter::new(Vec::new())));
        let mut policy = policy_over(stream.clone());

        let mut record = b"header\n".to_vec();
        record.extend(std::iter::repeat(b'x').take(2000));
        policy.write(&record).expect("write");
        policy.flush().expect("flush");

        assert_eq!(stream.lock().unwrap().get_ref().as_slice(), record.as_slice());
    }

    #[test]
    fn full_stream_is_a_shortfall() {
        let stream = throttled(3, 4);
        let mut policy = policy_over(stream.clone());

        let err = policy.write(b"0123456789").expect_err("expected shortfall");
        assert!(matches!(
            err,
            LogError::WriteShortfall {
                requested: 10,
                written: 4
            }
        ));
        assert_eq!(stream.lock().unwrap().data, b"0123");
    }

    #[test]
    fn destroy_leaves_stream_usable() {
        let stream = throttled(usize::MAX, usize::MAX);
        let mut policy = policy_over(stream.clone());

        policy.destroy();
        policy.destroy();

        assert_eq!(Arc::strong_count(&stream), 1);
        stream.lock().unwrap().write_all(b"still open").expect("write");
    }
}
