/// A fixed-length run of RGB pixels, stored as a flat byte buffer.
///
/// The length is fixed at creation; the only way it changes is an
/// explicit rebuild when a virtual's segment list is remapped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelBuffer {
    data: Vec<u8>,
}

impl PixelBuffer {
    /// All-black buffer of `pixel_count` pixels.
    pub fn blank(pixel_count: usize) -> Self {
        Self {
            data: vec![0; pixel_count * 3],
        }
    }

    pub fn from_bytes(data: Vec<u8>) -> Self {
        debug_assert!(data.len() % 3 == 0);
        Self { data }
    }

    pub fn pixel_count(&self) -> usize {
        self.data.len() / 3
    }

    pub fn pixel(&self, index: usize) -> [u8; 3] {
        let i = index * 3;
        [self.data[i], self.data[i + 1], self.data[i + 2]]
    }

    pub fn set_pixel(&mut self, index: usize, rgb: [u8; 3]) {
        let i = index * 3;
        self.data[i..i + 3].copy_from_slice(&rgb);
    }

    pub fn fill(&mut self, rgb: [u8; 3]) {
        for pixel in self.data.chunks_mut(3) {
            pixel.copy_from_slice(&rgb);
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn as_bytes_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    /// A contiguous run of `len` pixels starting at pixel `start`,
    /// optionally reversed pixel-wise (channels within a pixel keep
    /// their order).
    pub fn run(&self, start: usize, len: usize, reversed: bool) -> Vec<u8> {
        let slice = &self.data[start * 3..(start + len) * 3];
        if !reversed {
            return slice.to_vec();
        }
        let mut out = Vec::with_capacity(slice.len());
        for pixel in slice.chunks(3).rev() {
            out.extend_from_slice(pixel);
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_is_black() {
        let buf = PixelBuffer::blank(4);
        assert_eq!(buf.pixel_count(), 4);
        assert!(buf.as_bytes().iter().all(|&b| b == 0));
    }

    #[test]
    fn run_reversed_keeps_channel_order() {
        let mut buf = PixelBuffer::blank(3);
        buf.set_pixel(0, [1, 2, 3]);
        buf.set_pixel(1, [4, 5, 6]);
        buf.set_pixel(2, [7, 8, 9]);
        assert_eq!(buf.run(0, 3, true), vec![7, 8, 9, 4, 5, 6, 1, 2, 3]);
        assert_eq!(buf.run(1, 2, false), vec![4, 5, 6, 7, 8, 9]);
    }
}
