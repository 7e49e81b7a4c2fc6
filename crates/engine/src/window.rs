// Compressed byte window: not-yet-decoded input, compacted as frames are consumed

/// Fixed-capacity linear buffer of compressed bytes.
///
/// Bytes are appended at the end and consumed from the front; consumption shifts
/// the remainder down so the decoder always sees one contiguous slice.
pub struct CompressedByteWindow {
    buffer: Vec<u8>,
    len: usize,
}

impl CompressedByteWindow {
    pub fn new(capacity: usize) -> Self {
        Self {
            buffer: vec![0; capacity],
            len: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn capacity(&self) -> usize {
        self.buffer.len()
    }

    pub fn free_space(&self) -> usize {
        self.buffer.len() - self.len
    }

    /// Buffered bytes, oldest first
    pub fn as_slice(&self) -> &[u8] {
        &self.buffer[..self.len]
    }

    /// Unused tail to read new bytes into; follow with `commit`
    pub fn spare_mut(&mut self) -> &mut [u8] {
        &mut self.buffer[self.len..]
    }

    /// Mark `n` bytes of the spare tail as filled
    pub fn commit(&mut self, n: usize) {
        self.len += n.min(self.free_space());
    }

    /// Discard `n` bytes from the front. Returns how many were discarded.
    pub fn consume(&mut self, n: usize) -> usize {
        let n = n.min(self.len);
        if n == 0 {
            return 0;
        }
        self.buffer.copy_within(n..self.len, 0);
        self.len -= n;
        n
    }

    /// Lossy recovery: throw away up to `n` of the oldest bytes
    pub fn drop_oldest(&mut self, n: usize) -> usize {
        self.consume(n)
    }

    pub fn clear(&mut self) {
        self.len = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fill(window: &mut CompressedByteWindow, data: &[u8]) {
        let spare = window.spare_mut();
        let n = data.len().min(spare.len());
        spare[..n].copy_from_slice(&data[..n]);
        window.commit(n);
    }

    #[test]
    fn consume_compacts_remainder_to_front() {
        let mut window = CompressedByteWindow::new(8);
        fill(&mut window, &[1, 2, 3, 4, 5]);
        assert_eq!(window.consume(2), 2);
        assert_eq!(window.as_slice(), &[3, 4, 5]);
        assert_eq!(window.free_space(), 5);

        fill(&mut window, &[6, 7]);
        assert_eq!(window.as_slice(), &[3, 4, 5, 6, 7]);
    }

    #[test]
    fn zero_consume_leaves_window_untouched() {
        let mut window = CompressedByteWindow::new(8);
        fill(&mut window, &[9, 8, 7]);
        assert_eq!(window.consume(0), 0);
        assert_eq!(window.as_slice(), &[9, 8, 7]);
    }

    #[test]
    fn never_exceeds_capacity() {
        let mut window = CompressedByteWindow::new(4);
        fill(&mut window, &[1; 10]);
        assert_eq!(window.len(), 4);
        assert!(window.spare_mut().is_empty());
        window.commit(3);
        assert_eq!(window.len(), 4);
    }

    #[test]
    fn drop_oldest_is_bounded_by_content() {
        let mut window = CompressedByteWindow::new(16);
        fill(&mut window, &[1, 2, 3, 4, 5, 6]);
        assert_eq!(window.drop_oldest(4), 4);
        assert_eq!(window.as_slice(), &[5, 6]);
        assert_eq!(window.drop_oldest(100), 2);
        assert!(window.is_empty());

        window.clear();
        assert_eq!(window.capacity(), 16);
    }
}
