use std::sync::atomic::{AtomicU32, Ordering};

lazy_static! {
    static ref STATS: Stats = Stats::new();
}

#[derive(Serialize, Debug)]
pub struct Stats {
    restored: AtomicU32,
    missing: AtomicU32,
}

#[derive(Serialize, Debug)]
pub struct LoadedStats {
    /// lookups that found pending input
    pub restored: u32,
    /// lookups that found nothing, or nothing readable
    pub missing: u32,
}

impl Stats {
    fn new() -> Stats {
        Stats {
            restored: AtomicU32::new(0u32),
            missing: AtomicU32::new(0u32),
        }
    }

    pub(crate) fn restored() {
        STATS.restored.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn missing() {
        STATS.missing.fetch_add(1, Ordering::Relaxed);
    }

    pub fn load() -> LoadedStats {
        LoadedStats {
            restored: STATS.restored.load(Ordering::Relaxed),
            missing: STATS.missing.load(Ordering::Relaxed),
        }
    }
}
