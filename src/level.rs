//! Level definitions: target score, time limit and how many meerkats pop up.

/// Built-in levels: (target score, time limit in seconds, meerkats).
const LEVELS: [(u32, u32, u32); 10] = [
    (10, 30, 1),
    (15, 30, 2),
    (20, 30, 2),
    (25, 30, 3),
    (30, 30, 3),
    (35, 30, 4),
    (40, 30, 4),
    (50, 40, 5),
    (60, 40, 6),
    (75, 45, 8),
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Level {
    /// 1-based position in the built-in table; 0 for a custom level.
    pub number: u32,
    pub target_score: u32,
    pub time_limit_secs: u32,
    pub actor_count: u32,
}

impl Level {
    pub fn count() -> u32 {
        LEVELS.len() as u32
    }

    /// Built-in level `number` (1-based).
    pub fn builtin(number: u32) -> Option<Self> {
        let idx = usize::try_from(number.checked_sub(1)?).ok()?;
        LEVELS.get(idx).map(|&(target_score, time_limit_secs, actor_count)| Self {
            number,
            target_score,
            time_limit_secs,
            actor_count,
        })
    }

    pub fn custom(target_score: u32, time_limit_secs: u32, actor_count: u32) -> Self {
        Self {
            number: 0,
            target_score,
            time_limit_secs,
            actor_count,
        }
    }

    pub fn is_custom(&self) -> bool {
        self.number == 0
    }

    pub fn time_limit_ms(&self) -> u64 {
        u64::from(self.time_limit_secs) * 1000
    }

    pub fn next(&self) -> Option<Self> {
        if self.is_custom() {
            return None;
        }
        Self::builtin(self.number + 1)
    }

    pub fn previous(&self) -> Option<Self> {
        if self.is_custom() {
            return None;
        }
        Self::builtin(self.number.checked_sub(1)?)
    }

    pub fn title(&self) -> String {
        if self.is_custom() {
            "Custom level".to_string()
        } else {
            format!("Level {}", self.number)
        }
    }
}

/// Outcome handed back to the host when a level ends.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LevelResult {
    pub level: Level,
    pub score: u32,
    /// Meerkats that went back down without being hit.
    pub misses: u32,
}

impl LevelResult {
    pub fn passed(&self) -> bool {
        self.score >= self.level.target_score
    }
}
