//! Ordering tables and the primitive arena
//!
//! A primitive lives in the arena as one tag word followed by its GP0 payload.
//! The tag holds the payload length in the top 8 bits and the arena offset of
//! the next primitive in the low 24 bits. Each ordering-table slot is the head
//! of such a chain; [`END_OF_CHAIN`] terminates it.

use crate::gpu::Primitive;

/// Next-pointer value that ends a chain
pub const END_OF_CHAIN: u32 = 0x00ff_ffff;

fn tag(len: usize, next: u32) -> u32 {
    (len as u32) << 24 | (next & END_OF_CHAIN)
}

/// Linear bump allocator holding tagged primitive packets for one frame
pub struct PrimitiveArena {
    words: Vec<u32>,
    cursor: usize,
}

impl PrimitiveArena {
    pub fn with_capacity_bytes(bytes: usize) -> Self {
        Self {
            words: vec![0; bytes / 4],
            cursor: 0,
        }
    }

    pub fn capacity_bytes(&self) -> usize {
        self.words.len() * 4
    }

    pub fn used_bytes(&self) -> usize {
        self.cursor * 4
    }

    pub fn reset(&mut self) {
        self.cursor = 0;
    }

    /// Append a primitive behind an unlinked tag; `None` when the arena is full
    pub fn push<P: Primitive>(&mut self, prim: &P) -> Option<u32> {
        let end = self.cursor + 1 + P::WORDS;
        if end > self.words.len() || self.cursor as u32 >= END_OF_CHAIN {
            return None;
        }
        let offset = self.cursor;
        self.words[offset] = tag(P::WORDS, END_OF_CHAIN);
        prim.write(&mut self.words[offset + 1..end]);
        self.cursor = end;
        Some(offset as u32)
    }

    fn next(&self, offset: u32) -> u32 {
        self.words[offset as usize] & END_OF_CHAIN
    }

    fn set_next(&mut self, offset: u32, next: u32) {
        let word = &mut self.words[offset as usize];
        *word = (*word & !END_OF_CHAIN) | (next & END_OF_CHAIN);
    }

    /// GP0 payload of the primitive at `offset`
    pub fn packet(&self, offset: u32) -> &[u32] {
        let start = offset as usize;
        let len = (self.words[start] >> 24) as usize;
        &self.words[start + 1..start + 1 + len]
    }
}

/// Depth-indexed chain heads
pub struct OrderingTable {
    heads: Vec<u32>,
}

impl OrderingTable {
    pub fn new(len: usize) -> Self {
        Self {
            heads: vec![END_OF_CHAIN; len],
        }
    }

    pub fn len(&self) -> usize {
        self.heads.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heads.iter().all(|&head| head == END_OF_CHAIN)
    }

    pub fn clear(&mut self) {
        self.heads.fill(END_OF_CHAIN);
    }

    /// Bucket for a depth; wraps modulo the table length, negatives included
    pub fn slot(&self, depth: i32) -> usize {
        depth.rem_euclid(self.heads.len() as i32) as usize
    }

    /// Link an arena primitive at the head of the bucket for `depth`
    pub fn link(&mut self, arena: &mut PrimitiveArena, depth: i32, offset: u32) {
        let slot = self.slot(depth);
        arena.set_next(offset, self.heads[slot]);
        self.heads[slot] = offset;
    }

    /// Primitives of one bucket, most recently linked first
    pub fn bucket<'a>(&'a self, arena: &'a PrimitiveArena, slot: usize) -> Chain<'a> {
        Chain {
            heads: &self.heads[slot..=slot],
            arena,
            cursor: END_OF_CHAIN,
        }
    }

    /// Every primitive in submission order: buckets from the highest index down
    pub fn chain<'a>(&'a self, arena: &'a PrimitiveArena) -> Chain<'a> {
        Chain {
            heads: &self.heads,
            arena,
            cursor: END_OF_CHAIN,
        }
    }
}

/// Walks buckets from the last head towards the first
pub struct Chain<'a> {
    heads: &'a [u32],
    arena: &'a PrimitiveArena,
    cursor: u32,
}

impl<'a> Iterator for Chain<'a> {
    type Item = &'a [u32];

    fn next(&mut self) -> Option<Self::Item> {
        while self.cursor == END_OF_CHAIN {
            let heads = self.heads;
            let (&head, rest) = heads.split_last()?;
            self.heads = rest;
            self.cursor = head;
        }
        let offset = self.cursor;
        self.cursor = self.arena.next(offset);
        Some(self.arena.packet(offset))
    }
}
