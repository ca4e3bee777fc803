//! Deterministic synthetic fix traces for tests and benchmarks.
//!
//! Builders here produce chronological [`PositionFix`] sequences without any
//! randomness, so every derived stay point, cluster, and profile is exactly
//! reproducible run to run.

use chrono::{DateTime, Duration, FixedOffset};
use pol_common::{PositionFix, SubjectId};

/// Meters per degree of latitude (and of longitude at the equator).
const M_PER_DEG: f64 = 111_195.0;

/// Chronological fix-trace builder.
///
/// The builder keeps a time cursor and a position; dwell and travel segments
/// append fixes and advance both.
pub struct TraceBuilder {
    subject: SubjectId,
    cursor: DateTime<FixedOffset>,
    position: (f64, f64),
    fixes: Vec<PositionFix>,
}

impl TraceBuilder {
    /// Starts a trace for one subject at an RFC 3339 instant.
    pub fn new(subject: &str, start: &str) -> Self {
        TraceBuilder {
            subject: SubjectId::from(subject),
            cursor: DateTime::parse_from_rfc3339(start).expect("valid RFC 3339 start"),
            position: (0.0, 0.0),
            fixes: Vec::new(),
        }
    }

    /// Emits `n_fixes` fixes at exactly (lat, lon), `minutes_apart` apart.
    ///
    /// The first fix lands on the current cursor; the cursor ends one
    /// interval past the last fix.
    pub fn dwell_at(mut self, lat: f64, lon: f64, n_fixes: usize, minutes_apart: f64) -> Self {
        self.position = (lat, lon);
        for _ in 0..n_fixes {
            self.push_fix(lat, lon);
            self.advance(minutes_apart);
        }
        self
    }

    /// Emits `n_fixes` fixes interpolating from the current position to
    /// (lat, lon), ending exactly on the target.
    pub fn travel_to(mut self, lat: f64, lon: f64, n_fixes: usize, minutes_apart: f64) -> Self {
        let (from_lat, from_lon) = self.position;
        for i in 1..=n_fixes {
            let frac = i as f64 / n_fixes as f64;
            let cur_lat = from_lat + (lat - from_lat) * frac;
            let cur_lon = from_lon + (lon - from_lon) * frac;
            self.push_fix(cur_lat, cur_lon);
            self.advance(minutes_apart);
        }
        self.position = (lat, lon);
        self
    }

    /// Advances the cursor without emitting fixes.
    pub fn gap(mut self, minutes: f64) -> Self {
        self.advance(minutes);
        self
    }

    /// Moves the cursor to a later RFC 3339 instant without emitting fixes.
    pub fn at(mut self, instant: &str) -> Self {
        self.cursor = DateTime::parse_from_rfc3339(instant).expect("valid RFC 3339 instant");
        self
    }

    /// The accumulated chronological trace.
    pub fn build(self) -> Vec<PositionFix> {
        self.fixes
    }

    fn push_fix(&mut self, lat: f64, lon: f64) {
        self.fixes.push(PositionFix {
            subject_id: self.subject.clone(),
            lat,
            lon,
            timestamp: self.cursor,
        });
    }

    fn advance(&mut self, minutes: f64) {
        self.cursor += Duration::seconds((minutes * 60.0).round() as i64);
    }
}

/// Offsets a coordinate by meters, returning degrees. Longitude offsets are
/// exact only near the equator; tests pin latitudes where that is fine.
pub fn offset_m(lat: f64, lon: f64, north_m: f64, east_m: f64) -> (f64, f64) {
    (
        lat + north_m / M_PER_DEG,
        lon + east_m / (M_PER_DEG * lat.to_radians().cos()),
    )
}

/// A week of regular life: overnight home dwells, weekday hours at work,
/// plus one Saturday cafe visit. Home sits at (52.0, 4.0), work ~2 km east,
/// the cafe ~1 km north. The trace starts Monday 2025-03-03 and stays in
/// +00:00.
///
/// Each home dwell runs 20:00 through 06:30 the next morning, so bed-down
/// identification sees a date change. The single cafe visit stays below any
/// clustering minimum and should come out as noise.
pub fn routine_week(subject: &str) -> Vec<PositionFix> {
    let home = (52.0, 4.0);
    let work = offset_m(home.0, home.1, 0.0, 2_000.0);
    let cafe = offset_m(home.0, home.1, 1_000.0, 0.0);

    let mut builder = TraceBuilder::new(subject, "2025-03-03T00:00:00+00:00");
    for day in 0..7 {
        let date = format!("2025-03-{:02}", 3 + day);
        if day < 5 {
            // Workday, 09:00 to 17:00.
            builder = builder
                .at(&format!("{date}T09:00:00+00:00"))
                .dwell_at(work.0, work.1, 17, 30.0);
        } else if day == 5 {
            // Saturday cafe hour.
            builder = builder
                .at(&format!("{date}T11:00:00+00:00"))
                .dwell_at(cafe.0, cafe.1, 5, 15.0);
        }
        // Overnight at home, 20:00 to 06:30 the next morning.
        builder = builder
            .at(&format!("{date}T20:00:00+00:00"))
            .dwell_at(home.0, home.1, 22, 30.0);
    }
    builder.build()
}
