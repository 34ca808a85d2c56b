const NUM_BITS: u32 = u64::BITS;

/// Occupancy map of a 64-way branch node.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct Bitmap(u64);

impl Bitmap {
    pub const fn new() -> Self {
        Bitmap(0)
    }

    pub fn get(&self, i: u8) -> bool {
        self.0 & (1 << i) != 0
    }

    pub fn set(&self, i: u8) -> Self {
        Bitmap(self.0 | (1 << i))
    }

    pub fn unset(&self, i: u8) -> Self {
        Bitmap(self.0 & !(1 << i))
    }

    pub fn size(&self) -> usize {
        self.0.count_ones() as usize
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    /// Returns a position of the `i`th bit in a dense array of children.
    pub fn index(&self, i: u8) -> usize {
        (self.0 & ((1 << i) - 1)).count_ones() as usize
    }

    pub fn iter(&self) -> Bits {
        Bits(self.0)
    }
}

/// Set bits of a bitmap in ascending order.
#[derive(Clone, Debug)]
pub struct Bits(u64);

impl Iterator for Bits {
    type Item = u8;

    fn next(&mut self) -> Option<u8> {
        if self.0 == 0 {
            return None;
        }

        let i = self.0.trailing_zeros();
        self.0 &= self.0 - 1;

        debug_assert!(i < NUM_BITS);
        Some(i as u8)
    }
}

/// Occupancy map of a 256-way node indexed by bytes.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct ByteBitmap([Bitmap; 4]);

impl ByteBitmap {
    pub const fn new() -> Self {
        ByteBitmap([Bitmap::new(); 4])
    }

    fn split(byte: u8) -> (usize, u8) {
        ((byte >> 6) as usize, byte & 63)
    }

    pub fn get(&self, byte: u8) -> bool {
        let (word, bit) = Self::split(byte);
        self.0[word].get(bit)
    }

    pub fn set(&self, byte: u8) -> Self {
        let (word, bit) = Self::split(byte);
        let mut words = self.0;
        words[word] = words[word].set(bit);
        ByteBitmap(words)
    }

    pub fn unset(&self, byte: u8) -> Self {
        let (word, bit) = Self::split(byte);
        let mut words = self.0;
        words[word] = words[word].unset(bit);
        ByteBitmap(words)
    }

    pub fn size(&self) -> usize {
        self.0.iter().map(Bitmap::size).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.0.iter().all(Bitmap::is_empty)
    }

    pub fn index(&self, byte: u8) -> usize {
        let (word, bit) = Self::split(byte);

        self.0[..word].iter().map(Bitmap::size).sum::<usize>() + self.0[word].index(bit)
    }

    pub fn iter(&self) -> impl Iterator<Item = u8> + '_ {
        self.0
            .iter()
            .enumerate()
            .flat_map(|(word, bitmap)| bitmap.iter().map(move |bit| ((word as u8) << 6) | bit))
    }
}
