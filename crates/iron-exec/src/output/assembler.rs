/// Bounded line buffer owned by one stream-forwarding task.
///
/// Bytes are accumulated until a newline or until `max` bytes are buffered, whichever
/// comes first. A trailing `\r` is dropped. [`LineAssembler::finish`] flushes whatever
/// partial line is left when the stream closes.
#[derive(Debug)]
pub struct LineAssembler {
    buf: Vec<u8>,
    max: usize,
    // The previous line was cut at `max`; a newline right after it closes nothing.
    split: bool,
}

impl LineAssembler {
    pub fn new(max: usize) -> Self {
        let max = max.max(1);
        Self {
            buf: Vec::with_capacity(max.min(8192)),
            max,
            split: false,
        }
    }

    /// Feed a chunk, calling `emit` for every completed line.
    pub fn push(&mut self, chunk: &[u8], mut emit: impl FnMut(&str)) {
        for &b in chunk {
            if b == b'\n' {
                if self.buf.is_empty() && self.split {
                    self.split = false;
                    continue;
                }
                self.flush(&mut emit);
                self.split = false;
                continue;
            }
            self.buf.push(b);
            if self.buf.len() >= self.max {
                self.flush(&mut emit);
                self.split = true;
            }
        }
    }

    /// Flush the trailing partial line, if any.
    pub fn finish(&mut self, mut emit: impl FnMut(&str)) {
        if !self.buf.is_empty() {
            self.flush(&mut emit);
        }
        self.split = false;
    }

    /// Bytes currently buffered.
    pub fn pending(&self) -> usize {
        self.buf.len()
    }

    fn flush(&mut self, emit: &mut impl FnMut(&str)) {
        if self.buf.last() == Some(&b'\r') {
            self.buf.pop();
        }
        emit(&String::from_utf8_lossy(&self.buf));
        self.buf.clear();
    }
}
