/*!
 * Shared page cursor.
 *
 * Every worker draws its next offset from the same allocator. The cursor
 * starts one step below zero so the first allocation is offset 0.
 */

use parking_lot::Mutex;

/// Hands out page offsets `0, step, 2*step, ...`, each exactly once
#[derive(Debug)]
pub struct OffsetAllocator {
    cursor: Mutex<Cursor>,
    step: i64,
}

#[derive(Debug)]
struct Cursor {
    next: i64,
    issued: u64,
}

impl OffsetAllocator {
    pub fn new(step: i64) -> Self {
        Self {
            cursor: Mutex::new(Cursor { next: -step, issued: 0 }),
            step,
        }
    }

    /// Reserve the next page offset
    pub fn allocate(&self) -> i64 {
        let mut cursor = self.cursor.lock();
        cursor.next += self.step;
        cursor.issued += 1;
        cursor.next
    }

    /// How many offsets have been handed out so far
    pub fn issued(&self) -> u64 {
        self.cursor.lock().issued
    }

    pub fn step(&self) -> i64 {
        self.step
    }
}
