use std::fmt;

use serde::Serialize;
use utils::DataType;

#[derive(Serialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct KindStats {
    pub assigned: usize,
    pub succeeded: usize,
    pub failed: usize,
}

/// Totals for one invocation, printed at the end of the run.
#[derive(Serialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct RunStats {
    pub ogg: KindStats,
    pub wem: KindStats,
    pub wsp: KindStats,
    pub bnk: KindStats,
    /// Inputs whose type could not be determined.
    pub unknown: usize,
    pub headers_rebuilt: usize,
    pub headers_copied: usize,
    pub extracted: usize,
    pub converted: usize,
    /// Archive items that failed while their archive as a whole was read.
    pub item_failures: usize,
}

impl RunStats {
    pub fn kind_mut(&mut self, kind: DataType) -> &mut KindStats {
        match kind {
            DataType::Ogg => &mut self.ogg,
            DataType::Wem => &mut self.wem,
            DataType::Wsp => &mut self.wsp,
            DataType::Bnk => &mut self.bnk,
        }
    }

    pub fn assign(&mut self, kind: DataType) {
        self.kind_mut(kind).assigned += 1;
    }

    pub fn record(&mut self, kind: DataType, ok: bool) {
        let stats = self.kind_mut(kind);
        if ok {
            stats.succeeded += 1;
        } else {
            stats.failed += 1;
        }
    }

    pub fn failed(&self) -> usize {
        [self.ogg, self.wem, self.wsp, self.bnk]
            .iter()
            .map(|k| k.failed)
            .sum::<usize>()
            + self.unknown
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

impl fmt::Display for RunStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (name, kind) in [("ogg", self.ogg), ("wem", self.wem), ("wsp", self.wsp), ("bnk", self.bnk)] {
            if kind.assigned == 0 {
                continue;
            }
            writeln!(
                f,
                "{name}: {} assigned, {} succeeded, {} failed",
                kind.assigned, kind.succeeded, kind.failed
            )?;
        }
        if self.unknown > 0 {
            writeln!(f, "unknown type: {}", self.unknown)?;
        }
        writeln!(
            f,
            "headers: {} rebuilt, {} copied",
            self.headers_rebuilt, self.headers_copied
        )?;
        write!(
            f,
            "archive items: {} extracted, {} converted, {} failed",
            self.extracted, self.converted, self.item_failures
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_and_failed() {
        let mut stats = RunStats::default();
        stats.assign(DataType::Wem);
        stats.assign(DataType::Wem);
        stats.record(DataType::Wem, true);
        stats.record(DataType::Wem, false);
        stats.unknown = 1;
        assert_eq!(stats.wem.assigned, 2);
        assert_eq!(stats.wem.succeeded, 1);
        assert_eq!(stats.failed(), 2);
    }

    #[test]
    fn test_text_skips_unused_kinds() {
        let mut stats = RunStats::default();
        stats.assign(DataType::Ogg);
        stats.record(DataType::Ogg, true);
        let text = stats.to_string();
        assert!(text.starts_with("ogg: 1 assigned, 1 succeeded, 0 failed"));
        assert!(!text.contains("wem:"));
    }

    #[test]
    fn test_json_fields() {
        let mut stats = RunStats::default();
        stats.converted = 3;
        let json: serde_json::Value = serde_json::from_str(&stats.to_json().unwrap()).unwrap();
        assert_eq!(json["converted"], 3);
        assert_eq!(json["bnk"]["assigned"], 0);
    }
}
