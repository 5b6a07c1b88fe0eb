use std::collections::HashMap;

/// Hand-calibrated profile of how crowd-reported queue length tracks the
/// actual maximum waiting time across an operating weekend.
///
/// Keys are whole hours since the Friday opening (Friday 22:00 -> 22,
/// Saturday 14:00 -> 38, Sunday midnight -> 48); values are relative
/// intensities in (0, 1]. A report at hour T divided by the intensity at T
/// approximates the peak waiting time of that night. Hours without an
/// entry pass through unscaled.
///
/// Static, read-only data; safe to share across any number of concurrent
/// lookups.
#[derive(Debug, Clone)]
pub struct ReferenceCurve {
    intensities: HashMap<u32, f64>,
}

impl ReferenceCurve {
    /// The default weekend profile: low Friday evening, climbing through
    /// Saturday, peaking Saturday night into Sunday morning, tapering
    /// through Sunday and the early Monday spill-over.
    pub fn new() -> Self {
        let table: &[(u32, f64)] = &[
            // Friday evening
            (22, 0.3),
            (23, 0.4),
            // Saturday early morning
            (24, 0.5),
            (25, 0.6),
            (26, 0.7),
            (27, 0.7),
            (28, 0.6),
            (29, 0.5),
            // Saturday afternoon reopening build-up
            (36, 0.3),
            (37, 0.3),
            (38, 0.4),
            (39, 0.4),
            (40, 0.5),
            (41, 0.5),
            (42, 0.6),
            (43, 0.6),
            (44, 0.7),
            (45, 0.7),
            // Saturday night into Sunday morning, the peak
            (46, 0.8),
            (47, 0.9),
            (48, 1.0),
            (49, 1.0),
            (50, 0.95),
            (51, 0.9),
            (52, 0.8),
            (53, 0.7),
            // Sunday daytime and evening
            (60, 0.5),
            (61, 0.5),
            (62, 0.5),
            (63, 0.5),
            (64, 0.6),
            (65, 0.6),
            (66, 0.6),
            (67, 0.6),
            (68, 0.6),
            (69, 0.5),
            (70, 0.5),
            (71, 0.5),
            // Monday morning spill-over
            (72, 0.6),
            (73, 0.5),
            (74, 0.5),
            (75, 0.4),
            (76, 0.4),
            (77, 0.4),
        ];

        Self {
            intensities: table.iter().copied().collect(),
        }
    }

    /// Build a curve from an explicit table
    pub fn from_table(table: impl IntoIterator<Item = (u32, f64)>) -> Self {
        Self {
            intensities: table.into_iter().collect(),
        }
    }

    /// Relative intensity at the given hours-since-opening, if calibrated
    pub fn intensity(&self, hours_since_opening: u32) -> Option<f64> {
        self.intensities.get(&hours_since_opening).copied()
    }

    pub fn len(&self) -> usize {
        self.intensities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.intensities.is_empty()
    }
}

impl Default for ReferenceCurve {
    fn default() -> Self {
        Self::new()
    }
}
