//! Byte-range partitioning for chunked uploads.

/// One chunk of a file, as inclusive byte offsets `[min, max]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteRange {
    /// Offset of the first byte in the range.
    pub min: u64,
    /// Offset of the last byte in the range (inclusive).
    pub max: u64,
}

impl ByteRange {
    /// Creates a range covering `[min, max]`.
    pub fn new(min: u64, max: u64) -> Self {
        debug_assert!(min <= max, "byte range must not be empty");
        Self { min, max }
    }

    /// Number of bytes the range covers.
    pub fn size(&self) -> u64 {
        self.max - self.min + 1
    }

    /// Renders the `Content-Range` header value for a file of `total` bytes.
    pub fn content_range(&self, total: u64) -> String {
        format!("bytes {}-{}/{}", self.min, self.max, total)
    }
}

/// Partitions `[0, total_size)` into consecutive ranges of `range_size`
/// bytes, the last one shorter if the size is not an exact multiple.
///
/// The result covers the file exactly once, in strictly increasing
/// offset order, and is deterministic for a given `(total_size,
/// range_size)` pair.
pub fn range_plan(total_size: u64, range_size: u64) -> Vec<ByteRange> {
    assert!(range_size > 0, "range size must be non-zero");

    let mut ranges = Vec::with_capacity(total_size.div_ceil(range_size) as usize);
    let mut offset = 0;
    while offset < total_size {
        let end = (offset + range_size).min(total_size);
        ranges.push(ByteRange::new(offset, end - 1));
        offset = end;
    }
    ranges
}
