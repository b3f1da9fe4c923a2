use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// One hourly download bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HourlyDownloads {
    /// Start of the hour this bucket covers.
    pub hour: DateTime<Utc>,
    pub downloads: u64,
}

/// Aggregated download counters for a file or a model.
///
/// Windows are trailing and relative to the aggregation time: `hour` is the
/// last hour, `day` the last 24 hours, and so on. Absent entries hydrate to
/// [`DownloadCounts::default`] (all zero).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct DownloadCounts {
    pub hour: u64,
    pub day: u64,
    pub week: u64,
    pub month: u64,
    pub all: u64,
}

impl DownloadCounts {
    /// Aggregate hourly buckets into trailing windows ending at `now`.
    pub fn from_buckets<I>(buckets: I, now: DateTime<Utc>) -> Self
    where
        I: IntoIterator<Item = HourlyDownloads>,
    {
        let mut counts = Self::default();
        for bucket in buckets {
            counts.add(bucket, now);
        }
        counts
    }

    /// Fold a single bucket into the counters.
    pub fn add(&mut self, bucket: HourlyDownloads, now: DateTime<Utc>) {
        let age = now - bucket.hour;
        let n = bucket.downloads;
        self.all += n;
        if age < Duration::days(30) {
            self.month += n;
        }
        if age < Duration::days(7) {
            self.week += n;
        }
        if age < Duration::days(1) {
            self.day += n;
        }
        if age < Duration::hours(1) {
            self.hour += n;
        }
    }

    /// Sum two sets of counters (used for model-level aggregates).
    #[must_use]
    pub fn merge(self, other: Self) -> Self {
        Self {
            hour: self.hour + other.hour,
            day: self.day + other.day,
            week: self.week + other.week,
            month: self.month + other.month,
            all: self.all + other.all,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn buckets_fall_into_trailing_windows() {
        let now = Utc::now();
        let buckets = [
            HourlyDownloads {
                hour: now - Duration::minutes(10),
                downloads: 1,
            },
            HourlyDownloads {
                hour: now - Duration::hours(5),
                downloads: 2,
            },
            HourlyDownloads {
                hour: now - Duration::days(3),
                downloads: 4,
            },
            HourlyDownloads {
                hour: now - Duration::days(20),
                downloads: 8,
            },
            HourlyDownloads {
                hour: now - Duration::days(400),
                downloads: 16,
            },
        ];
        let counts = DownloadCounts::from_buckets(buckets, now);
        assert_eq!(
            counts,
            DownloadCounts {
                hour: 1,
                day: 3,
                week: 7,
                month: 15,
                all: 31,
            }
        );
    }

    #[test]
    fn empty_is_zero() {
        assert_eq!(
            DownloadCounts::from_buckets([], Utc::now()),
            DownloadCounts::default()
        );
    }

    #[test]
    fn merge_adds_fields() {
        let a = DownloadCounts {
            hour: 1,
            day: 2,
            week: 3,
            month: 4,
            all: 5,
        };
        let merged = a.merge(a);
        assert_eq!(merged.all, 10);
        assert_eq!(merged.hour, 2);
    }
}
