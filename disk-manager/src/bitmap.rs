/// One bit per block; a set bit marks the block as allocated.
#[derive(Debug, Clone)]
pub struct Bitmap {
    bitmap: Vec<u8>,
    len: usize,
}

impl Bitmap {
    pub fn size(len: usize) -> usize {
        len / 8 + if len % 8 == 0 { 0 } else { 1 }
    }

    pub fn new(len: usize) -> Bitmap {
        Bitmap {
            bitmap: vec![0; Self::size(len)],
            len,
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn is_set(&self, bit: usize) -> bool {
        bit < self.len && self.bitmap[bit / 8] & (1 << (bit % 8)) != 0
    }

    /// Sets and returns the lowest clear bit.
    pub fn allocate(&mut self) -> Option<usize> {
        for i in 0..self.bitmap.len() {
            if self.bitmap[i] == u8::MAX {
                continue;
            }
            for j in 0..8 {
                let bit = i * 8 + j;
                if bit >= self.len {
                    return None;
                }
                if self.bitmap[i] & (1 << j) == 0 {
                    self.bitmap[i] |= 1 << j;
                    return Some(bit);
                }
            }
        }
        None
    }

    pub fn deallocate(&mut self, bit: usize) {
        self.bitmap[bit / 8] &= !(1 << (bit % 8));
    }

    pub fn count_set(&self) -> usize {
        self.bitmap.iter().map(|b| b.count_ones() as usize).sum()
    }
}
