use serde::{Deserialize, Serialize};

const MIB: u64 = 1024 * 1024;
const GIB: u64 = 1024 * MIB;

/// Size limit applied to `keep` values with no matching tier.
pub const DEFAULT_MAX_BYTES: u64 = 500 * MIB;

/// One row of the plan tier table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SizeTier {
    /// The model `keep` value this row applies to.
    pub keep: u32,
    /// Maximum accepted upload size in bytes.
    pub max_bytes: u64,
}

/// Maps a model's `keep` value to its upload size ceiling.
///
/// `keep` is also the number of committed versions retained per slot; that
/// half of the policy needs no table and is read straight off the model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetentionPolicy {
    tiers: Vec<SizeTier>,
    default_max_bytes: u64,
}

impl Default for RetentionPolicy {
    fn default() -> Self {
        Self {
            tiers: vec![
                SizeTier {
                    keep: 10,
                    max_bytes: 500 * MIB,
                },
                SizeTier {
                    keep: 100,
                    max_bytes: GIB,
                },
                SizeTier {
                    keep: 1000,
                    max_bytes: 2 * GIB,
                },
                SizeTier {
                    keep: 10_000,
                    max_bytes: 4 * GIB,
                },
            ],
            default_max_bytes: DEFAULT_MAX_BYTES,
        }
    }
}

impl RetentionPolicy {
    /// Build a policy from an explicit tier table.
    pub fn new(tiers: Vec<SizeTier>, default_max_bytes: u64) -> Self {
        Self {
            tiers,
            default_max_bytes,
        }
    }

    /// Maximum upload size for a model with the given `keep` value.
    #[must_use]
    pub fn max_bytes(&self, keep: u32) -> u64 {
        self.tiers
            .iter()
            .find(|t| t.keep == keep)
            .map_or(self.default_max_bytes, |t| t.max_bytes)
    }

    /// The tier table, in lookup order.
    pub fn tiers(&self) -> &[SizeTier] {
        &self.tiers
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_tier_values() {
        let policy = RetentionPolicy::default();
        assert_eq!(policy.max_bytes(10), 524_288_000);
        assert_eq!(policy.max_bytes(100), 1_073_741_824);
        assert_eq!(policy.max_bytes(1000), 2_147_483_648);
        assert_eq!(policy.max_bytes(10_000), 4_294_967_296);
    }

    #[test]
    fn unknown_keep_defaults_to_500mb() {
        let policy = RetentionPolicy::default();
        assert_eq!(policy.max_bytes(0), 500 * MIB);
        assert_eq!(policy.max_bytes(7), 500 * MIB);
        assert_eq!(policy.max_bytes(99_999), 500 * MIB);
    }

    #[test]
    fn custom_table() {
        let policy = RetentionPolicy::new(
            vec![SizeTier {
                keep: 3,
                max_bytes: 16,
            }],
            8,
        );
        assert_eq!(policy.max_bytes(3), 16);
        assert_eq!(policy.max_bytes(10), 8);
        assert_eq!(policy.tiers().len(), 1);
    }
}
