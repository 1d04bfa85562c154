// Swiss-table hash part of LuaTable
//
// Open addressing over 16-slot groups with a parallel control-byte array:
// one byte per slot holding EMPTY, DELETED, or the low 7 bits of the key
// hash (h2). A whole group is screened with one 16-byte compare before any
// key is touched, so misses rarely read slot memory at all.
use crate::lua_value::LuaValue;

pub const GROUP_WIDTH: usize = 16;

const CTRL_EMPTY: u8 = 0x80;
const CTRL_DELETED: u8 = 0xFE;

const MIN_CAPACITY: usize = 16;

#[inline(always)]
fn h1(hash: u64, num_groups: usize) -> usize {
    // num_groups is a power of two
    ((hash >> 7) as usize) & (num_groups - 1)
}

#[inline(always)]
fn h2(hash: u64) -> u8 {
    (hash & 0x7f) as u8
}

/// Bitmask of slots within one group whose control byte equals `byte`.
#[cfg(target_arch = "x86_64")]
#[inline(always)]
fn group_match(ctrl: &[u8], byte: u8) -> u16 {
    use std::arch::x86_64::{_mm_cmpeq_epi8, _mm_loadu_si128, _mm_movemask_epi8, _mm_set1_epi8};
    debug_assert!(ctrl.len() >= GROUP_WIDTH);
    // SSE2 is part of the x86_64 baseline
    unsafe {
        let group = _mm_loadu_si128(ctrl.as_ptr() as *const _);
        let cmp = _mm_cmpeq_epi8(group, _mm_set1_epi8(byte as i8));
        _mm_movemask_epi8(cmp) as u16
    }
}

#[cfg(not(target_arch = "x86_64"))]
#[inline(always)]
fn group_match(ctrl: &[u8], byte: u8) -> u16 {
    let mut mask = 0u16;
    for i in 0..GROUP_WIDTH {
        if ctrl[i] == byte {
            mask |= 1 << i;
        }
    }
    mask
}

/// Bitmask of EMPTY or DELETED slots (control high bit set).
#[cfg(target_arch = "x86_64")]
#[inline(always)]
fn group_match_available(ctrl: &[u8]) -> u16 {
    use std::arch::x86_64::{_mm_loadu_si128, _mm_movemask_epi8};
    debug_assert!(ctrl.len() >= GROUP_WIDTH);
    unsafe {
        let group = _mm_loadu_si128(ctrl.as_ptr() as *const _);
        _mm_movemask_epi8(group) as u16
    }
}

#[cfg(not(target_arch = "x86_64"))]
#[inline(always)]
fn group_match_available(ctrl: &[u8]) -> u16 {
    let mut mask = 0u16;
    for i in 0..GROUP_WIDTH {
        if ctrl[i] & 0x80 != 0 {
            mask |= 1 << i;
        }
    }
    mask
}

#[derive(Debug, Clone, Default)]
struct Slot {
    key: LuaValue,
    value: LuaValue,
}

/// Hash storage for non-array keys. Keys arrive pre-normalized (exact-integer
/// floats already folded to integers, nil already rejected).
#[derive(Debug, Clone, Default)]
pub struct HashPart {
    ctrl: Box<[u8]>,
    slots: Box<[Slot]>,
    num_groups: usize,
    /// Live entries
    count: usize,
    /// Live entries plus tombstones; drives the load-factor check
    used: usize,
}

impl HashPart {
    pub fn new(capacity_hint: usize) -> Self {
        if capacity_hint == 0 {
            return HashPart::default();
        }
        let mut part = HashPart::default();
        part.rebuild(capacity_for(capacity_hint));
        part
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.count
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.num_groups * GROUP_WIDTH
    }

    /// Index of the live slot holding `key`, if present.
    pub fn find(&self, key: &LuaValue) -> Option<usize> {
        if self.num_groups == 0 {
            return None;
        }
        let hash = key.hash_value();
        let tag = h2(hash);
        let mut group = h1(hash, self.num_groups);
        // Terminates: the table always keeps at least one EMPTY slot
        loop {
            let base = group * GROUP_WIDTH;
            let ctrl = &self.ctrl[base..base + GROUP_WIDTH];
            let mut candidates = group_match(ctrl, tag);
            while candidates != 0 {
                let offset = candidates.trailing_zeros() as usize;
                let index = base + offset;
                if self.slots[index].key == *key {
                    return Some(index);
                }
                candidates &= candidates - 1;
            }
            if group_match(ctrl, CTRL_EMPTY) != 0 {
                return None;
            }
            group = (group + 1) & (self.num_groups - 1);
        }
    }

    pub fn get(&self, key: &LuaValue) -> Option<&LuaValue> {
        self.find(key).map(|i| &self.slots[i].value)
    }

    /// Insert or overwrite. The table never stores nil values; callers route
    /// nil through `remove`.
    pub fn insert(&mut self, key: LuaValue, value: LuaValue) {
        debug_assert!(!key.is_nil() && !value.is_nil());
        if self.needs_rehash() {
            self.rebuild(capacity_for(self.count + 1));
        }
        let index = self.find_or_reserve(&key);
        if self.ctrl[index] & 0x80 != 0 {
            // Fresh slot (was EMPTY or DELETED)
            if self.ctrl[index] == CTRL_EMPTY {
                self.used += 1;
            }
            self.count += 1;
            self.ctrl[index] = h2(key.hash_value());
            self.slots[index].key = key;
        }
        self.slots[index].value = value;
    }

    /// Slot for `key`, inserting a nil-valued placeholder when absent. The
    /// caller writes the value through the returned reference.
    pub fn slot_value_mut(&mut self, key: &LuaValue) -> &mut LuaValue {
        if self.needs_rehash() {
            self.rebuild(capacity_for(self.count + 1));
        }
        let index = self.find_or_reserve(key);
        if self.ctrl[index] & 0x80 != 0 {
            if self.ctrl[index] == CTRL_EMPTY {
                self.used += 1;
            }
            self.count += 1;
            self.ctrl[index] = h2(key.hash_value());
            self.slots[index].key = key.clone();
            self.slots[index].value = LuaValue::Nil;
        }
        &mut self.slots[index].value
    }

    /// Delete `key`, leaving a tombstone so longer probe chains stay intact.
    pub fn remove(&mut self, key: &LuaValue) -> Option<LuaValue> {
        let index = self.find(key)?;
        self.ctrl[index] = CTRL_DELETED;
        self.count -= 1;
        let slot = &mut self.slots[index];
        slot.key = LuaValue::Nil;
        Some(std::mem::take(&mut slot.value))
    }

    /// First live slot at or after `start`, for iteration.
    pub fn next_live(&self, start: usize) -> Option<usize> {
        (start..self.capacity()).find(|&i| self.ctrl[i] & 0x80 == 0)
    }

    #[inline]
    pub fn entry_at(&self, index: usize) -> (&LuaValue, &LuaValue) {
        debug_assert!(self.ctrl[index] & 0x80 == 0);
        let slot = &self.slots[index];
        (&slot.key, &slot.value)
    }

    /// Move integer keys in `[lo, hi]` out of the hash part, handing each to
    /// `sink`. Used when the array part grows over keys that previously
    /// overflowed into the hash.
    pub fn take_int_keys_in(&mut self, lo: i64, hi: i64, mut sink: impl FnMut(i64, LuaValue)) {
        for index in 0..self.capacity() {
            if self.ctrl[index] & 0x80 != 0 {
                continue;
            }
            if let LuaValue::Integer(i) = self.slots[index].key {
                if i >= lo && i <= hi {
                    self.ctrl[index] = CTRL_DELETED;
                    self.count -= 1;
                    let slot = &mut self.slots[index];
                    slot.key = LuaValue::Nil;
                    sink(i, std::mem::take(&mut slot.value));
                }
            }
        }
    }

    // 7/8 load factor over live entries plus tombstones
    #[inline]
    fn needs_rehash(&self) -> bool {
        let cap = self.capacity();
        cap == 0 || self.used + 1 > cap / 8 * 7
    }

    /// Matching live slot if the key exists, otherwise the first available
    /// slot along the probe chain.
    fn find_or_reserve(&self, key: &LuaValue) -> usize {
        let hash = key.hash_value();
        let tag = h2(hash);
        let mut group = h1(hash, self.num_groups);
        let mut first_available: Option<usize> = None;
        loop {
            let base = group * GROUP_WIDTH;
            let ctrl = &self.ctrl[base..base + GROUP_WIDTH];
            let mut candidates = group_match(ctrl, tag);
            while candidates != 0 {
                let offset = candidates.trailing_zeros() as usize;
                let index = base + offset;
                if self.slots[index].key == *key {
                    return index;
                }
                candidates &= candidates - 1;
            }
            if first_available.is_none() {
                let available = group_match_available(ctrl);
                if available != 0 {
                    first_available = Some(base + available.trailing_zeros() as usize);
                }
            }
            if group_match(ctrl, CTRL_EMPTY) != 0 {
                // Key is definitively absent; load factor guarantees a slot
                return first_available.unwrap_or(base);
            }
            group = (group + 1) & (self.num_groups - 1);
        }
    }

    /// Reallocate at `new_capacity` slots and reinsert every live entry.
    /// Tombstones are dropped in the process.
    fn rebuild(&mut self, new_capacity: usize) {
        debug_assert!(new_capacity.is_power_of_two() && new_capacity >= MIN_CAPACITY);
        let old_ctrl = std::mem::replace(
            &mut self.ctrl,
            vec![CTRL_EMPTY; new_capacity].into_boxed_slice(),
        );
        let old_slots = std::mem::replace(
            &mut self.slots,
            vec![Slot::default(); new_capacity].into_boxed_slice(),
        );
        self.num_groups = new_capacity / GROUP_WIDTH;
        self.count = 0;
        self.used = 0;
        for (ctrl, slot) in old_ctrl.iter().zip(old_slots.into_vec()) {
            // Slots acquired for write intent but left nil read as absent;
            // rehash is where they are actually dropped
            if ctrl & 0x80 == 0 && !slot.value.is_nil() {
                self.insert(slot.key, slot.value);
            }
        }
    }
}

/// Smallest power-of-two capacity that holds `entries` under the 7/8 load
/// factor, at least one full group.
fn capacity_for(entries: usize) -> usize {
    let needed = entries + entries.div_ceil(7);
    needed.next_power_of_two().max(MIN_CAPACITY)
}
