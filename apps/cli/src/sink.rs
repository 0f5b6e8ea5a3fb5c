//! 把接收到的字节写到任意 `Write`（通常是 stdout）

use pcanlink_driver::ByteSink;
use std::io::Write;
use tracing::warn;

/// 基于 `Write` 的上层消费者
///
/// 写入失败时返回 0，由会话记录拒收并丢弃这些字节。
pub struct WriteSink<W: Write> {
    out: W,
}

impl<W: Write> WriteSink<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }
}

impl<W: Write> ByteSink for WriteSink<W> {
    fn deliver(&mut self, bytes: &[u8]) -> usize {
        match self.out.write_all(bytes).and_then(|()| self.out.flush()) {
            Ok(()) => bytes.len(),
            Err(e) => {
                warn!("Output write failed: {}", e);
                0
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    struct Broken;

    impl Write for Broken {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "closed"))
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_delivers_all_bytes() {
        let mut sink = WriteSink::new(Vec::new());
        assert_eq!(sink.deliver(b"abc"), 3);
        assert_eq!(sink.deliver(b"de"), 2);
        assert_eq!(sink.out, b"abcde");
    }

    #[test]
    fn test_write_error_rejects() {
        let mut sink = WriteSink::new(Broken);
        assert_eq!(sink.deliver(b"abc"), 0);
    }
}
