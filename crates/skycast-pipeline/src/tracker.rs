//! Carousel / file tracker: per-file reassembly state.
//!
//! One [`FileAssembly`] per (carousel, file) key currently in flight.
//! Announcements create or update assemblies; blocks fill them; completion
//! is tested after every insertion, first on the fast path (all systematic
//! blocks present) and then through the LDPC decoder once enough coded
//! blocks have arrived.

use std::collections::{HashMap, VecDeque};
use std::time::Instant;

use skycast_core::{AssemblyKey, CompletedFile, Counters, ReceiverConfig};
use skycast_fec::{decode, FecError, LdpcCode};
use skycast_wire::{AnnouncementRecord, BlockRecord};

/// Reassembly state for one announced file.
#[derive(Debug)]
struct FileAssembly {
    announcement: AnnouncementRecord,
    /// Received payloads over both ranges: `0..K` systematic, `K..N` parity.
    blocks: Vec<Option<Vec<u8>>>,
    received: usize,
    /// Logical LRU clock value of the last touch.
    touched: u64,
    last_activity: Instant,
}

impl FileAssembly {
    fn new(announcement: AnnouncementRecord, touched: u64) -> Self {
        let total = usize::from(announcement.total_blocks);
        Self {
            announcement,
            blocks: vec![None; total],
            received: 0,
            touched,
            last_activity: Instant::now(),
        }
    }

    /// Whether a repeated announcement describes the same transmission.
    /// The code parameters take part: parity blocks stored under a
    /// different matrix would corrupt recovery.
    fn compatible(&self, other: &AnnouncementRecord) -> bool {
        let a = &self.announcement;
        a.total_blocks == other.total_blocks
            && a.sys_blocks == other.sys_blocks
            && a.block_size == other.block_size
            && a.file_len == other.file_len
            && a.n1 == other.n1
            && a.seed == other.seed
    }

    fn missing_systematic(&self) -> usize {
        self.blocks[..usize::from(self.announcement.sys_blocks)]
            .iter()
            .filter(|b| b.is_none())
            .count()
    }
}

/// The central reassembler: a flat map of assemblies plus a bounded FIFO
/// of orphan blocks waiting for their announcement.
pub struct FileTracker {
    assemblies: HashMap<AssemblyKey, FileAssembly>,
    orphans: VecDeque<BlockRecord>,
    config: ReceiverConfig,
    counters: Counters,
    clock: u64,
}

impl FileTracker {
    /// Create an empty tracker.
    #[must_use]
    pub fn new(config: ReceiverConfig, counters: Counters) -> Self {
        Self {
            assemblies: HashMap::new(),
            orphans: VecDeque::new(),
            config,
            counters,
            clock: 0,
        }
    }

    /// Number of assemblies currently in flight.
    #[must_use]
    pub fn assembly_count(&self) -> usize {
        self.assemblies.len()
    }

    /// Number of buffered orphan blocks.
    #[must_use]
    pub fn orphan_count(&self) -> usize {
        self.orphans.len()
    }

    /// Admit an announcement: create the assembly, update a compatible
    /// one, or reset on an incompatible re-announcement. Buffered orphans
    /// for the key are admitted afterwards, which can complete the file.
    pub fn on_announcement(&mut self, announcement: AnnouncementRecord) -> Option<CompletedFile> {
        let key = AssemblyKey::new(announcement.carousel_id, announcement.file_id);
        self.clock += 1;

        match self.assemblies.get_mut(&key) {
            Some(assembly) if assembly.compatible(&announcement) => {
                assembly.announcement = announcement;
                assembly.touched = self.clock;
                assembly.last_activity = Instant::now();
            }
            Some(assembly) => {
                tracing::info!(
                    %key,
                    name = %announcement.name,
                    "incompatible re-announcement, starting new generation"
                );
                *assembly = FileAssembly::new(announcement, self.clock);
            }
            None => {
                self.evict_for_room();
                tracing::info!(
                    %key,
                    name = %announcement.name,
                    size = announcement.file_len,
                    blocks = announcement.total_blocks,
                    "new file announced"
                );
                self.assemblies
                    .insert(key, FileAssembly::new(announcement, self.clock));
            }
        }

        self.admit_orphans(key)
    }

    /// Admit a block: verify its inner CRC, then store it in its assembly
    /// or buffer it as an orphan. Returns the completed file when this
    /// block finishes the assembly.
    pub fn on_block(&mut self, block: BlockRecord) -> Option<CompletedFile> {
        if !block.crc_ok() {
            self.counters.bad_block_crc();
            tracing::debug!(
                carousel = block.carousel_id,
                file = block.file_id,
                index = block.block_index,
                "bad block crc"
            );
            return None;
        }
        let key = AssemblyKey::new(block.carousel_id, block.file_id);
        if !self.assemblies.contains_key(&key) {
            self.buffer_orphan(block);
            return None;
        }
        self.clock += 1;
        self.admit(key, block)
    }

    /// Discard assemblies idle longer than the configured TTL.
    pub fn prune(&mut self, now: Instant) {
        let Some(ttl) = self.config.assembly_ttl else {
            return;
        };
        let expired: Vec<AssemblyKey> = self
            .assemblies
            .iter()
            .filter(|(_, assembly)| now.duration_since(assembly.last_activity) >= ttl)
            .map(|(key, _)| *key)
            .collect();
        for key in expired {
            self.assemblies.remove(&key);
            self.counters.assemblies_expired();
            tracing::info!(%key, "assembly expired");
        }
    }

    fn evict_for_room(&mut self) {
        while self.assemblies.len() >= self.config.max_assemblies {
            let Some(oldest) = self
                .assemblies
                .iter()
                .min_by_key(|(_, assembly)| assembly.touched)
                .map(|(key, _)| *key)
            else {
                return;
            };
            self.assemblies.remove(&oldest);
            self.counters.assemblies_evicted();
            tracing::warn!(key = %oldest, "tracker full, evicting least-recently-touched");
        }
    }

    fn buffer_orphan(&mut self, block: BlockRecord) {
        if self.config.orphan_capacity == 0 {
            self.counters.orphans_dropped();
            return;
        }
        if self.orphans.len() >= self.config.orphan_capacity {
            self.orphans.pop_front();
            self.counters.orphans_dropped();
        }
        self.orphans.push_back(block);
        self.counters.orphans_buffered();
    }

    fn admit_orphans(&mut self, key: AssemblyKey) -> Option<CompletedFile> {
        let matching: Vec<BlockRecord> = {
            let mut matching = Vec::new();
            let mut kept = VecDeque::with_capacity(self.orphans.len());
            while let Some(orphan) = self.orphans.pop_front() {
                if AssemblyKey::new(orphan.carousel_id, orphan.file_id) == key {
                    matching.push(orphan);
                } else {
                    kept.push_back(orphan);
                }
            }
            self.orphans = kept;
            matching
        };

        let mut completed = None;
        for block in matching {
            if completed.is_some() {
                // The file already emitted; late orphans for it are spent.
                self.counters.orphans_dropped();
                continue;
            }
            self.counters.orphans_admitted();
            completed = self.admit(key, block);
        }
        completed
    }

    fn admit(&mut self, key: AssemblyKey, block: BlockRecord) -> Option<CompletedFile> {
        let assembly = self.assemblies.get_mut(&key)?;
        let announcement = &assembly.announcement;

        let index = usize::from(block.block_index);
        if index >= usize::from(announcement.total_blocks) {
            self.counters.malformed_records();
            tracing::debug!(%key, index, "block index out of range");
            return None;
        }
        let expected = if block.block_index < announcement.sys_blocks {
            announcement.systematic_len(block.block_index)
        } else {
            usize::from(announcement.block_size)
        };
        if block.payload.len() != expected {
            self.counters.malformed_records();
            tracing::debug!(
                %key,
                index,
                expected,
                got = block.payload.len(),
                "block length mismatch"
            );
            return None;
        }

        assembly.touched = self.clock;
        assembly.last_activity = Instant::now();

        match &assembly.blocks[index] {
            Some(existing) if *existing == block.payload => {
                self.counters.duplicate_blocks();
                return None;
            }
            Some(_) => {
                // Same index, different payload: the corruption slipped
                // below the CRC. Last write wins.
                self.counters.conflicting_blocks();
                tracing::warn!(%key, index, "conflicting block payload, keeping newer");
                assembly.blocks[index] = Some(block.payload);
            }
            None => {
                assembly.blocks[index] = Some(block.payload);
                assembly.received += 1;
                tracing::info!(
                    %key,
                    received = assembly.received,
                    total = assembly.announcement.total_blocks,
                    "block received"
                );
            }
        }

        self.try_complete(key)
    }

    fn try_complete(&mut self, key: AssemblyKey) -> Option<CompletedFile> {
        let assembly = self.assemblies.get_mut(&key)?;
        let announcement = assembly.announcement.clone();
        let k = usize::from(announcement.sys_blocks);

        if assembly.missing_systematic() > 0 {
            if assembly.received < k || announcement.parity_blocks() == 0 {
                return None;
            }
            let code = match LdpcCode::new(
                announcement.sys_blocks,
                announcement.total_blocks,
                announcement.n1,
                announcement.seed,
            ) {
                Ok(code) => code,
                Err(err) => {
                    tracing::error!(%key, error = %err, "announced code is unusable");
                    return None;
                }
            };
            let (systematic, parity) = assembly.blocks.split_at_mut(k);
            match decode(
                &code,
                usize::from(announcement.block_size),
                u64::from(announcement.file_len),
                systematic,
                parity,
            ) {
                Ok(recovered) => {
                    self.counters.fec_recoveries();
                    tracing::info!(%key, recovered, "fec recovered missing blocks");
                }
                Err(FecError::Insufficient { missing }) => {
                    tracing::debug!(%key, missing, "fec stalled, waiting for more blocks");
                    return None;
                }
                Err(err) => {
                    tracing::error!(%key, error = %err, "fec decode failed");
                    return None;
                }
            }
        }

        let assembly = self.assemblies.remove(&key)?;
        let mut bytes = Vec::with_capacity(announcement.file_len as usize);
        for block in assembly.blocks.into_iter().take(k) {
            if let Some(block) = block {
                bytes.extend_from_slice(&block);
            }
        }
        bytes.truncate(announcement.file_len as usize);
        Some(CompletedFile {
            key,
            name: announcement.name,
            bytes,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use skycast_wire::block_crc;

    use super::*;

    fn announcement(total: u16, sys: u16) -> AnnouncementRecord {
        AnnouncementRecord {
            carousel_id: 1,
            file_id: 7,
            total_blocks: total,
            block_size: 100,
            file_len: u32::from(sys) * 100,
            name: "data/file.bin".to_owned(),
            signature: Vec::new(),
            sys_blocks: sys,
            n1: 1,
            seed: 1,
        }
    }

    fn block(index: u16, payload: Vec<u8>) -> BlockRecord {
        BlockRecord {
            carousel_id: 1,
            file_id: 7,
            block_index: index,
            crc: block_crc(index, &payload),
            payload,
        }
    }

    fn content(index: u16) -> Vec<u8> {
        vec![(index as u8 + 1) * 0x11; 100]
    }

    fn tracker() -> (FileTracker, Counters) {
        let counters = Counters::default();
        (
            FileTracker::new(ReceiverConfig::default(), counters.clone()),
            counters,
        )
    }

    fn expected_file() -> Vec<u8> {
        let mut bytes = Vec::new();
        for i in 0..4 {
            bytes.extend(content(i));
        }
        bytes
    }

    #[test]
    fn happy_path_in_order() {
        let (mut tracker, _) = tracker();
        assert!(tracker.on_announcement(announcement(4, 4)).is_none());
        for i in 0..3 {
            assert!(tracker.on_block(block(i, content(i))).is_none());
        }
        let file = tracker.on_block(block(3, content(3))).unwrap();
        assert_eq!(file.name, "data/file.bin");
        assert_eq!(file.bytes, expected_file());
        assert_eq!(tracker.assembly_count(), 0);
    }

    #[test]
    fn out_of_order_with_duplicate() {
        let (mut tracker, counters) = tracker();
        tracker.on_announcement(announcement(4, 4));
        let order = [2u16, 0, 2, 3, 1];
        let mut completed = None;
        for &i in &order {
            completed = tracker.on_block(block(i, content(i)));
        }
        assert_eq!(completed.unwrap().bytes, expected_file());
        assert_eq!(counters.snapshot().duplicate_blocks, 1);
    }

    #[test]
    fn bad_crc_block_never_enters() {
        let (mut tracker, counters) = tracker();
        tracker.on_announcement(announcement(4, 4));
        for i in [0u16, 2, 3] {
            tracker.on_block(block(i, content(i)));
        }
        let mut corrupted = block(1, content(1));
        corrupted.crc ^= 0xFF;
        assert!(tracker.on_block(corrupted).is_none());
        assert_eq!(counters.snapshot().bad_block_crc, 1);

        let file = tracker.on_block(block(1, content(1))).unwrap();
        assert_eq!(file.bytes, expected_file());
    }

    #[test]
    fn announcement_after_blocks_admits_orphans() {
        let (mut tracker, counters) = tracker();
        for i in 0..4 {
            assert!(tracker.on_block(block(i, content(i))).is_none());
        }
        assert_eq!(tracker.orphan_count(), 4);
        assert_eq!(counters.snapshot().orphans_buffered, 4);

        let file = tracker.on_announcement(announcement(4, 4)).unwrap();
        assert_eq!(file.bytes, expected_file());
        assert_eq!(counters.snapshot().orphans_admitted, 4);
        assert_eq!(tracker.orphan_count(), 0);
    }

    #[test]
    fn orphan_buffer_drops_oldest_on_overflow() {
        let counters = Counters::default();
        let config = ReceiverConfig {
            orphan_capacity: 2,
            ..ReceiverConfig::default()
        };
        let mut tracker = FileTracker::new(config, counters.clone());
        for i in 0..3 {
            tracker.on_block(block(i, content(i)));
        }
        assert_eq!(tracker.orphan_count(), 2);
        assert_eq!(counters.snapshot().orphans_dropped, 1);
    }

    #[test]
    fn fec_path_recovers_missing_blocks() {
        // Code (k=4, n=6, n1=1, seed=1): parity rows {1,2} and {0,3}.
        let (mut tracker, counters) = tracker();
        tracker.on_announcement(announcement(6, 4));
        tracker.on_block(block(0, content(0)));
        tracker.on_block(block(2, content(2)));
        // 0x22 ^ 0x33 = 0x11 and 0x11 ^ 0x44 = 0x55.
        assert!(tracker.on_block(block(4, vec![0x11; 100])).is_none());
        let file = tracker.on_block(block(5, vec![0x55; 100])).unwrap();
        assert_eq!(file.bytes, expected_file());
        assert_eq!(counters.snapshot().fec_recoveries, 1);
    }

    #[test]
    fn truncation_to_announced_length() {
        let (mut tracker, _) = tracker();
        let mut a = announcement(4, 4);
        a.file_len = 350;
        tracker.on_announcement(a);
        for i in 0..3 {
            tracker.on_block(block(i, content(i)));
        }
        let file = tracker
            .on_block(block(3, vec![0x44; 50]))
            .expect("terminal block completes the file");
        assert_eq!(file.bytes.len(), 350);
        assert_eq!(&file.bytes[300..], &[0x44; 50][..]);
    }

    #[test]
    fn conflicting_payload_last_write_wins() {
        let (mut tracker, counters) = tracker();
        tracker.on_announcement(announcement(4, 4));
        tracker.on_block(block(0, content(0)));
        tracker.on_block(block(0, vec![0x99; 100]));
        assert_eq!(counters.snapshot().conflicting_blocks, 1);

        for i in 1..4 {
            tracker.on_block(block(i, content(i)));
        }
        let file = tracker.on_block(block(3, content(3)));
        // Block 3 was already stored; the file completed one insert earlier.
        assert!(file.is_none());
    }

    #[test]
    fn conflicting_payload_appears_in_output() {
        let (mut tracker, _) = tracker();
        tracker.on_announcement(announcement(4, 4));
        tracker.on_block(block(0, content(0)));
        tracker.on_block(block(0, vec![0x99; 100]));
        for i in 1..3 {
            tracker.on_block(block(i, content(i)));
        }
        let file = tracker.on_block(block(3, content(3))).unwrap();
        assert_eq!(&file.bytes[..100], &[0x99; 100][..]);
    }

    #[test]
    fn compatible_reannouncement_keeps_blocks() {
        let (mut tracker, _) = tracker();
        tracker.on_announcement(announcement(4, 4));
        tracker.on_block(block(0, content(0)));
        tracker.on_block(block(1, content(1)));

        let mut again = announcement(4, 4);
        again.name = "data/renamed.bin".to_owned();
        assert!(tracker.on_announcement(again).is_none());

        tracker.on_block(block(2, content(2)));
        let file = tracker.on_block(block(3, content(3))).unwrap();
        assert_eq!(file.name, "data/renamed.bin");
        assert_eq!(file.bytes, expected_file());
    }

    #[test]
    fn incompatible_reannouncement_resets() {
        let (mut tracker, _) = tracker();
        tracker.on_announcement(announcement(4, 4));
        tracker.on_block(block(0, content(0)));

        let mut changed = announcement(4, 4);
        changed.block_size = 50;
        changed.sys_blocks = 8;
        changed.total_blocks = 8;
        tracker.on_announcement(changed);

        // The old block is gone; eight new 50-byte blocks are needed.
        for i in 0..7 {
            assert!(tracker.on_block(block(i, vec![i as u8; 50])).is_none());
        }
        let file = tracker.on_block(block(7, vec![7; 50])).unwrap();
        assert_eq!(file.bytes.len(), 400);
    }

    #[test]
    fn lru_eviction_respects_cap() {
        let counters = Counters::default();
        let config = ReceiverConfig {
            max_assemblies: 2,
            ..ReceiverConfig::default()
        };
        let mut tracker = FileTracker::new(config, counters.clone());

        for file_id in [10u32, 11, 12] {
            let mut a = announcement(4, 4);
            a.file_id = file_id;
            tracker.on_announcement(a);
        }
        assert_eq!(tracker.assembly_count(), 2);
        assert_eq!(counters.snapshot().assemblies_evicted, 1);

        // The first announcement was the least recently touched: its
        // blocks now arrive as orphans.
        let mut orphan = block(0, content(0));
        orphan.file_id = 10;
        tracker.on_block(orphan);
        assert_eq!(tracker.orphan_count(), 1);
    }

    #[test]
    fn ttl_prune_expires_idle_assemblies() {
        let counters = Counters::default();
        let config = ReceiverConfig {
            assembly_ttl: Some(Duration::from_secs(5)),
            ..ReceiverConfig::default()
        };
        let mut tracker = FileTracker::new(config, counters.clone());
        tracker.on_announcement(announcement(4, 4));

        tracker.prune(Instant::now());
        assert_eq!(tracker.assembly_count(), 1);

        tracker.prune(Instant::now() + Duration::from_secs(10));
        assert_eq!(tracker.assembly_count(), 0);
        assert_eq!(counters.snapshot().assemblies_expired, 1);
    }

    #[test]
    fn out_of_range_index_is_malformed() {
        let (mut tracker, counters) = tracker();
        tracker.on_announcement(announcement(4, 4));
        tracker.on_block(block(4, content(0)));
        assert_eq!(counters.snapshot().malformed_records, 1);
    }

    #[test]
    fn wrong_block_length_is_malformed() {
        let (mut tracker, counters) = tracker();
        tracker.on_announcement(announcement(4, 4));
        tracker.on_block(block(0, vec![0x11; 99]));
        assert_eq!(counters.snapshot().malformed_records, 1);
    }

    #[test]
    fn at_most_one_emission_per_key() {
        let (mut tracker, _) = tracker();
        tracker.on_announcement(announcement(4, 4));
        for i in 0..3 {
            tracker.on_block(block(i, content(i)));
        }
        assert!(tracker.on_block(block(3, content(3))).is_some());

        // The assembly is retired; replayed carousel rounds buffer as
        // orphans instead of emitting again.
        assert!(tracker.on_block(block(0, content(0))).is_none());
        assert_eq!(tracker.assembly_count(), 0);
    }
}
